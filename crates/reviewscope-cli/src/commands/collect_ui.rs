use comfy_table::{Cell, Color, Table};
use indicatif::{ProgressBar, ProgressStyle};
use review_models::{CanonicalReview, SourceKind};
use std::io::IsTerminal;
use std::time::Duration;

const PREVIEW_ROWS: usize = 10;
const PREVIEW_TEXT_CHARS: usize = 60;

/// Spinner with running counts. Falls back to structured logging when the
/// terminal is not interactive.
pub struct CollectUI {
    spinner: ProgressBar,
    interactive: bool,
}

impl CollectUI {
    pub fn new(enabled: bool) -> Self {
        let interactive = enabled && is_interactive();

        let spinner = if interactive {
            let spinner = ProgressBar::new_spinner();
            if let Ok(style) = ProgressStyle::default_spinner()
                .template("{spinner:.green} [{elapsed_precise}] {msg}")
            {
                spinner.set_style(style.tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"));
            }
            spinner.enable_steady_tick(Duration::from_millis(100));
            spinner.set_message("Starting collection...");
            spinner
        } else {
            ProgressBar::hidden()
        };

        Self { spinner, interactive }
    }

    /// Callback for the run journal's progress hook
    pub fn progress_callback(&self) -> impl Fn(SourceKind, usize, usize) + Send + Sync + 'static {
        let spinner = self.spinner.clone();
        let interactive = self.interactive;
        move |source, collected, target| {
            if interactive {
                spinner.set_message(format!("{}: {}/{} reviews", source, collected, target));
            } else {
                tracing::info!(operation = "progress", source = %source, collected = collected, target = target, "Collection progress");
            }
        }
    }

    pub fn finish(&self, message: impl Into<String>) {
        if self.interactive {
            self.spinner.finish_with_message(message.into());
        }
    }

    pub fn abandon(&self) {
        if self.interactive {
            self.spinner.finish_and_clear();
        }
    }
}

pub fn is_interactive() -> bool {
    std::io::stdout().is_terminal() && std::io::stderr().is_terminal()
}

/// First reviews as a table for the terminal
pub fn preview_table(reviews: &[CanonicalReview]) -> Table {
    let mut table = Table::new();
    table.set_header(vec![
        Cell::new("#").fg(Color::Cyan),
        Cell::new("User").fg(Color::Cyan),
        Cell::new("Rating").fg(Color::Cyan),
        Cell::new("Date").fg(Color::Cyan),
        Cell::new("Review").fg(Color::Cyan),
    ]);

    for (index, review) in reviews.iter().take(PREVIEW_ROWS).enumerate() {
        let rating = review
            .rating
            .map(|r| "★".repeat(r as usize))
            .unwrap_or_else(|| "-".to_string());
        let date = review
            .date
            .as_deref()
            .map(|d| d.chars().take(10).collect::<String>())
            .unwrap_or_else(|| "-".to_string());
        let body = if review.title.is_empty() {
            review.text.clone()
        } else if review.text.is_empty() {
            review.title.clone()
        } else {
            format!("{}: {}", review.title, review.text)
        };

        table.add_row(vec![
            Cell::new(index + 1),
            Cell::new(&review.user_name),
            Cell::new(rating),
            Cell::new(date),
            Cell::new(truncate_chars(&body, PREVIEW_TEXT_CHARS)),
        ]);
    }

    table.load_preset(comfy_table::presets::UTF8_FULL);
    table.apply_modifier(comfy_table::modifiers::UTF8_ROUND_CORNERS);
    table
}

fn truncate_chars(text: &str, max: usize) -> String {
    let flattened = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if flattened.chars().count() <= max {
        flattened
    } else {
        let mut out: String = flattened.chars().take(max.saturating_sub(1)).collect();
        out.push('…');
        out
    }
}
