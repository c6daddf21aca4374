//! Structured batch events and their presentation.
//!
//! The runner, exporter and connection provider describe what happened as
//! `BatchEvent`s. A `Reporter` decides how to present them: the console
//! reporter prints banners to stdout and mirrors each event into `tracing`
//! (progress at debug, so the default filter only repeats problems), the
//! recording reporter keeps them for assertions.

use std::io::{self, Write};
use std::path::PathBuf;

use tracing::{debug, error, warn};

/// Severity of a batch event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventLevel {
    /// Progress information.
    Info,
    /// Something completed as intended.
    Success,
    /// A query unit produced nothing usable; the batch goes on.
    Warning,
    /// An operation failed; the batch goes on.
    Failure,
}

impl EventLevel {
    /// Console marker for this level.
    pub fn icon(&self) -> &'static str {
        match self {
            Self::Info => "▶",
            Self::Success => "✅",
            Self::Warning => "⚠️",
            Self::Failure => "❌",
        }
    }
}

/// Which batch produced the events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchMode {
    /// Console report with row counts and samples.
    Run,
    /// One CSV artifact per query unit.
    Export,
}

/// Per-batch counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    /// Query units read and executed (or attempted).
    pub processed: usize,
    /// Units that returned at least one row.
    pub succeeded: usize,
    /// Units that executed but returned no rows.
    pub empty: usize,
    /// Units whose connection or execution failed.
    pub failed: usize,
    /// CSV artifacts written.
    pub exported: usize,
}

/// Something that happened while processing a batch.
#[derive(Debug, Clone, PartialEq)]
pub enum BatchEvent {
    /// SQL files were discovered and the batch is starting.
    BatchStarted {
        mode: BatchMode,
        directory: PathBuf,
        unit_count: usize,
    },
    /// A query unit is about to be executed.
    UnitStarted { mode: BatchMode, file: String },
    /// A database session was opened.
    Connected { target: String },
    /// A database session could not be opened.
    ConnectionFailed { target: String, cause: String },
    /// The query failed on the server.
    QueryFailed { file: String, cause: String },
    /// The query returned rows.
    RowsReturned { file: String, row_count: usize },
    /// The first rows of a result, already formatted.
    SampleRows { file: String, rows: Vec<String> },
    /// Nothing came back for this unit (failure or zero rows).
    NoResults { mode: BatchMode, file: String },
    /// A CSV artifact was written.
    Exported {
        file: String,
        path: PathBuf,
        row_count: usize,
    },
    /// All units were processed.
    BatchFinished { mode: BatchMode, summary: BatchSummary },
}

impl BatchEvent {
    /// Returns the severity of the event.
    pub fn level(&self) -> EventLevel {
        match self {
            Self::BatchStarted { .. } | Self::UnitStarted { .. } | Self::SampleRows { .. } => {
                EventLevel::Info
            }
            Self::Connected { .. } | Self::RowsReturned { .. } | Self::Exported { .. } => {
                EventLevel::Success
            }
            Self::NoResults { .. } => EventLevel::Warning,
            Self::ConnectionFailed { .. } | Self::QueryFailed { .. } => EventLevel::Failure,
            Self::BatchFinished { summary, .. } => {
                if summary.failed > 0 {
                    EventLevel::Warning
                } else {
                    EventLevel::Success
                }
            }
        }
    }

    /// Returns the SQL file the event concerns, if any.
    pub fn file(&self) -> Option<&str> {
        match self {
            Self::UnitStarted { file, .. }
            | Self::QueryFailed { file, .. }
            | Self::RowsReturned { file, .. }
            | Self::SampleRows { file, .. }
            | Self::NoResults { file, .. }
            | Self::Exported { file, .. } => Some(file),
            _ => None,
        }
    }

    /// Returns a one-line, human-readable description.
    pub fn message(&self) -> String {
        match self {
            Self::BatchStarted {
                directory,
                unit_count,
                ..
            } => format!("Found {unit_count} SQL file(s) in {}", directory.display()),
            Self::UnitStarted {
                mode: BatchMode::Run,
                file,
            } => format!("Running query: {file}"),
            Self::UnitStarted {
                mode: BatchMode::Export,
                file,
            } => format!("Processing {file}"),
            Self::Connected { target } => format!("Connected to PostgreSQL ({target})"),
            Self::ConnectionFailed { target, cause } => {
                format!("Failed to connect to PostgreSQL ({target}): {cause}")
            }
            Self::QueryFailed { cause, .. } => format!("Query failed: {cause}"),
            Self::RowsReturned { row_count, .. } => format!("Rows returned: {row_count}"),
            Self::SampleRows { rows, .. } => format!("Sample rows: {}", rows.len()),
            Self::NoResults {
                mode: BatchMode::Run,
                ..
            } => "No results or query failed".to_string(),
            Self::NoResults {
                mode: BatchMode::Export,
                ..
            } => "No data to export".to_string(),
            Self::Exported {
                path, row_count, ..
            } => format!("Exported: {} ({row_count} rows)", path.display()),
            Self::BatchFinished { summary, .. } => format!(
                "Done: {} processed, {} with rows, {} empty, {} failed, {} exported",
                summary.processed,
                summary.succeeded,
                summary.empty,
                summary.failed,
                summary.exported
            ),
        }
    }
}

/// Receives batch events.
pub trait Reporter: Send {
    /// Handles one event.
    fn report(&mut self, event: BatchEvent);
}

/// Prints banners to a writer (stdout by default) and logs every event.
pub struct ConsoleReporter<W: Write + Send = io::Stdout> {
    out: W,
}

impl ConsoleReporter {
    /// Creates a reporter printing to stdout.
    pub fn stdout() -> Self {
        Self { out: io::stdout() }
    }
}

impl<W: Write + Send> ConsoleReporter<W> {
    /// Creates a reporter printing to the given writer.
    pub fn new(out: W) -> Self {
        Self { out }
    }

    /// Consumes the reporter, returning the writer.
    pub fn into_inner(self) -> W {
        self.out
    }

    fn render(&mut self, event: &BatchEvent) -> io::Result<()> {
        let icon = event.level().icon();
        match event {
            BatchEvent::UnitStarted {
                mode: BatchMode::Run,
                ..
            } => {
                let rule = "=".repeat(60);
                writeln!(self.out, "\n{rule}")?;
                writeln!(self.out, "{icon} {}", event.message())?;
                writeln!(self.out, "{rule}")
            }
            BatchEvent::UnitStarted { .. } => writeln!(self.out, "\n{icon} {}", event.message()),
            BatchEvent::SampleRows { rows, .. } => {
                writeln!(self.out, "🔹 Sample rows:")?;
                for row in rows {
                    writeln!(self.out, "{row}")?;
                }
                Ok(())
            }
            BatchEvent::Exported { .. } => writeln!(self.out, "📁 {}", event.message()),
            BatchEvent::BatchFinished { .. } => {
                writeln!(self.out, "\n{icon} {}", event.message())
            }
            _ => writeln!(self.out, "{icon} {}", event.message()),
        }
    }
}

impl<W: Write + Send> Reporter for ConsoleReporter<W> {
    fn report(&mut self, event: BatchEvent) {
        log_event(&event);
        if let Err(e) = self.render(&event) {
            warn!("Could not write report line: {e}");
        }
    }
}

/// Keeps every event in memory.
#[derive(Debug, Default)]
pub struct RecordingReporter {
    events: Vec<BatchEvent>,
}

impl RecordingReporter {
    /// Creates an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the recorded events in order.
    pub fn events(&self) -> &[BatchEvent] {
        &self.events
    }

    /// Returns the events concerning one SQL file.
    pub fn events_for(&self, file: &str) -> Vec<&BatchEvent> {
        self.events
            .iter()
            .filter(|e| e.file() == Some(file))
            .collect()
    }
}

impl Reporter for RecordingReporter {
    fn report(&mut self, event: BatchEvent) {
        self.events.push(event);
    }
}

fn log_event(event: &BatchEvent) {
    let file = event.file().unwrap_or("-");
    let message = event.message();
    match event.level() {
        EventLevel::Info | EventLevel::Success => debug!(file = %file, "{message}"),
        EventLevel::Warning => warn!(file = %file, "{message}"),
        EventLevel::Failure => error!(file = %file, "{message}"),
    }
}
