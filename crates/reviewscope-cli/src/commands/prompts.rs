use crate::output::Output;
use color_eyre::Result;
use dialoguer::{Confirm, Input};
use review_core::normalize_app_id;

/// Ask for the app id until it validates
pub fn prompt_app_id(output: &Output) -> Result<String> {
    loop {
        let input = Input::<String>::new()
            .with_prompt("App Store app id (e.g. 389801252)")
            .interact_text()
            .map_err(|e| color_eyre::eyre::eyre!("Failed to read input: {}", e))?;

        match normalize_app_id(&input) {
            Ok(app_id) => return Ok(app_id),
            Err(e) => output.error(format!("{}. Please try again.", e)),
        }
    }
}

/// Prompt for yes/no with optional default
pub fn prompt_yes_no(prompt: &str, default: Option<bool>) -> Result<bool> {
    let mut confirm_builder = Confirm::new().with_prompt(prompt);

    if let Some(default_value) = default {
        confirm_builder = confirm_builder.default(default_value);
    }

    confirm_builder
        .interact()
        .map_err(|e| color_eyre::eyre::eyre!("Failed to read confirmation: {}", e))
}
