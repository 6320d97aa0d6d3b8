use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_core::{Event, Level, Subscriber};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

const DEFAULT_MAX_LOG_ENTRIES: usize = 500;
const DEFAULT_LOG_FILTER: &str = "info";

#[derive(Clone, Debug, Serialize)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub level: String,
    pub target: String,
    pub message: String,
}

/// Daily rotating log files under one directory.
pub struct FileLogger {
    log_directory: PathBuf,
}

impl FileLogger {
    pub fn new(log_directory: PathBuf) -> Self {
        Self { log_directory }
    }

    pub fn setup_file_logging(&self) -> std::io::Result<(NonBlocking, WorkerGuard)> {
        std::fs::create_dir_all(&self.log_directory)?;

        let file_appender = RollingFileAppender::new(
            Rotation::DAILY,
            &self.log_directory,
            "slack_status_push",
        );

        Ok(tracing_appender::non_blocking(file_appender))
    }
}

/// Bounded in-memory buffer of the most recent log events.
#[derive(Clone)]
pub struct LogBuffer {
    entries: Arc<Mutex<VecDeque<LogEntry>>>,
    max_entries: usize,
}

impl LogBuffer {
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: Arc::new(Mutex::new(VecDeque::with_capacity(max_entries))),
            max_entries,
        }
    }

    pub fn push(&self, entry: LogEntry) {
        if let Ok(mut entries) = self.entries.lock() {
            while entries.len() >= self.max_entries {
                entries.pop_front();
            }
            entries.push_back(entry);
        }
    }

    /// Most recent entries, oldest first.
    pub fn recent(&self, limit: usize) -> Vec<LogEntry> {
        match self.entries.lock() {
            Ok(entries) => {
                let skip = entries.len().saturating_sub(limit);
                entries.iter().skip(skip).cloned().collect()
            }
            Err(_) => Vec::new(),
        }
    }

    /// Most recent entries at `level`, oldest first.
    pub fn by_level(&self, level: Level, limit: usize) -> Vec<LogEntry> {
        let level = level.to_string();
        match self.entries.lock() {
            Ok(entries) => {
                let mut matching: Vec<LogEntry> = entries
                    .iter()
                    .rev()
                    .filter(|entry| entry.level == level)
                    .take(limit)
                    .cloned()
                    .collect();
                matching.reverse();
                matching
            }
            Err(_) => Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for LogBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_LOG_ENTRIES)
    }
}

/// Helper to extract the message and structured fields of an event
#[derive(Default)]
struct LogEntryVisitor {
    message: String,
    fields: Vec<String>,
}

impl tracing::field::Visit for LogEntryVisitor {
    fn record_str(&mut self, field: &tracing_core::Field, value: &str) {
        if field.name() == "message" {
            self.message = value.to_string();
        } else {
            self.fields.push(format!("{}={}", field.name(), value));
        }
    }

    fn record_debug(&mut self, field: &tracing_core::Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            self.message = format!("{:?}", value);
        } else {
            self.fields.push(format!("{}={:?}", field.name(), value));
        }
    }
}

impl LogEntryVisitor {
    fn into_message(self) -> String {
        if self.fields.is_empty() {
            self.message
        } else {
            format!("{} {}", self.message, self.fields.join(" "))
        }
    }
}

/// Tracing layer feeding a [`LogBuffer`].
#[derive(Clone, Default)]
pub struct LogBufferLayer {
    buffer: LogBuffer,
}

impl LogBufferLayer {
    pub fn new(buffer: LogBuffer) -> Self {
        Self { buffer }
    }

    pub fn buffer(&self) -> LogBuffer {
        self.buffer.clone()
    }
}

impl<S: Subscriber> Layer<S> for LogBufferLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: tracing_subscriber::layer::Context<'_, S>) {
        let mut visitor = LogEntryVisitor::default();
        event.record(&mut visitor);

        let metadata = event.metadata();
        self.buffer.push(LogEntry {
            timestamp: Utc::now(),
            level: metadata.level().to_string(),
            target: metadata.target().to_string(),
            message: visitor.into_message(),
        });
    }
}

/// Install the global subscriber: console output, the in-memory buffer and,
/// when a file logger is given, a rolling log file. The returned guard must
/// be kept alive for file output to be flushed.
pub fn setup_logging(file_logger: Option<&FileLogger>) -> (LogBuffer, Option<WorkerGuard>) {
    let buffer_layer = LogBufferLayer::default();
    let buffer = buffer_layer.buffer();

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    let (file_layer, guard) = match file_logger.map(FileLogger::setup_file_logging) {
        Some(Ok((writer, guard))) => (
            Some(
                tracing_subscriber::fmt::layer()
                    .with_writer(writer)
                    .with_ansi(false),
            ),
            Some(guard),
        ),
        Some(Err(e)) => {
            eprintln!("Failed to set up file logging: {}", e);
            (None, None)
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(buffer_layer)
        .with(tracing_subscriber::fmt::layer())
        .with(file_layer)
        .init();

    (buffer, guard)
}
