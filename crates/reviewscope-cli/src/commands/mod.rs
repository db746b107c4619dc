pub mod collect;
pub mod collect_ui;
pub mod config;
pub mod prompts;
