use chrono::{DateTime, SecondsFormat, Utc};
use review_models::SourceKind;
use review_sources::{EventLevel, RunSink};
use std::sync::Mutex;
use tracing::{error, info, warn};

type ProgressFn = Box<dyn Fn(SourceKind, usize, usize) + Send + Sync>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunEvent {
    pub timestamp: DateTime<Utc>,
    pub level: EventLevel,
    pub source: Option<SourceKind>,
    pub message: String,
}

impl RunEvent {
    /// `[2024-03-05T10:31:12Z] feed: message`
    pub fn log_line(&self) -> String {
        let timestamp = self.timestamp.to_rfc3339_opts(SecondsFormat::Secs, true);
        match self.source {
            Some(source) => format!("[{}] {}: {}", timestamp, source, self.message),
            None => format!("[{}] {}", timestamp, self.message),
        }
    }
}

/// Event sink for a single collection run. Keeps every event in memory for
/// the error log and mirrors it to tracing.
pub struct RunJournal {
    events: Mutex<Vec<RunEvent>>,
    on_progress: Option<ProgressFn>,
}

impl RunJournal {
    pub fn new() -> Self {
        Self {
            events: Mutex::new(Vec::new()),
            on_progress: None,
        }
    }

    pub fn with_progress<F>(mut self, callback: F) -> Self
    where
        F: Fn(SourceKind, usize, usize) + Send + Sync + 'static,
    {
        self.on_progress = Some(Box::new(callback));
        self
    }

    pub fn events(&self) -> Vec<RunEvent> {
        self.events.lock().unwrap_or_else(|poisoned| poisoned.into_inner()).clone()
    }
}

impl Default for RunJournal {
    fn default() -> Self {
        Self::new()
    }
}

impl RunSink for RunJournal {
    fn record(&self, level: EventLevel, source: Option<SourceKind>, message: &str) {
        let source_name = source.map(|s| s.as_str()).unwrap_or("run");
        match level {
            EventLevel::Info => info!(source = source_name, "{}", message),
            EventLevel::Warn => warn!(source = source_name, "{}", message),
            EventLevel::Error => error!(source = source_name, "{}", message),
        }

        let event = RunEvent {
            timestamp: Utc::now(),
            level,
            source,
            message: message.to_string(),
        };
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(event);
    }

    fn progress(&self, source: SourceKind, collected: usize, target: usize) {
        if let Some(callback) = &self.on_progress {
            callback(source, collected, target);
        }
    }
}
