use crate::error::ExportError;
use crate::journal::RunEvent;
use chrono::{SecondsFormat, Utc};
use review_models::{CanonicalReview, CollectionResult};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Files produced by one export
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportReport {
    pub csv_path: PathBuf,
    pub rows: usize,
    pub error_log: Option<PathBuf>,
}

pub struct CsvExporter {
    output_dir: PathBuf,
}

impl CsvExporter {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    pub fn csv_path(&self, app_id: &str) -> PathBuf {
        self.output_dir.join(format!("app_{}_reviews.csv", app_id))
    }

    pub fn error_log_path(&self, app_id: &str) -> PathBuf {
        self.output_dir.join(format!("app_{}_reviews_error.log", app_id))
    }

    /// Write the CSV and, for blocked runs, the error log
    pub fn export(&self, result: &CollectionResult, events: &[RunEvent]) -> Result<ExportReport, ExportError> {
        fs::create_dir_all(&self.output_dir).map_err(|e| ExportError::io(&self.output_dir, e))?;

        let csv_path = self.csv_path(&result.app_id);
        let file = File::create(&csv_path).map_err(|e| ExportError::io(&csv_path, e))?;
        write_csv(BufWriter::new(file), &result.reviews).map_err(|e| match e {
            ExportError::Io { source, .. } => ExportError::io(&csv_path, source),
            other => other,
        })?;
        info!(path = %csv_path.display(), rows = result.reviews.len(), "Reviews exported");

        let error_log = if result.blocked {
            let path = self.error_log_path(&result.app_id);
            write_error_log(&path, result, events)?;
            warn!(path = %path.display(), "Run was blocked, error log written");
            Some(path)
        } else {
            None
        };

        Ok(ExportReport {
            csv_path,
            rows: result.reviews.len(),
            error_log,
        })
    }
}

/// BOM, explicit header row, one record per review. The header is written
/// even when there are no reviews.
pub fn write_csv<W: Write>(mut writer: W, reviews: &[CanonicalReview]) -> Result<(), ExportError> {
    writer
        .write_all(UTF8_BOM)
        .map_err(|e| ExportError::io("<csv>", e))?;

    let mut csv_writer = csv::WriterBuilder::new().has_headers(false).from_writer(writer);
    csv_writer.write_record(CanonicalReview::COLUMNS)?;
    for review in reviews {
        csv_writer.serialize(review)?;
    }
    csv_writer.flush().map_err(|e| ExportError::io("<csv>", e))?;
    Ok(())
}

fn write_error_log(path: &Path, result: &CollectionResult, events: &[RunEvent]) -> Result<(), ExportError> {
    let mut lines: Vec<String> = events.iter().map(RunEvent::log_line).collect();
    lines.push(format!(
        "[{}] Blocked: {}. {} reviews collected before stopping",
        Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
        result.block_reason.as_deref().unwrap_or("block detected"),
        result.reviews_collected()
    ));

    let mut content = lines.join("\n");
    content.push('\n');
    fs::write(path, content).map_err(|e| ExportError::io(path, e))
}
