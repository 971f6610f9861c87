//! Narrative log sink.
//!
//! A `LogBook` keeps timestamped lines in memory and saves/loads them through a
//! `LogFormat`: tree markup (`XmlFormat`) or structured records (`JsonFormat`).
//! Timestamps are kept at whole-second precision so a save/load round trip
//! restores identical entries.

use std::fmt;
use std::marker::PhantomData;
use std::path::Path;
use std::str::FromStr;

use chrono::{DateTime, Local, SubsecRound, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

mod json;
mod xml;

pub use json::JsonFormat;
pub use xml::XmlFormat;

/// One narrated line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub message: String,
}

impl LogEntry {
    pub fn new(timestamp: DateTime<Utc>, message: impl Into<String>) -> Self {
        Self {
            timestamp: timestamp.trunc_subsecs(0),
            message: message.into(),
        }
    }

    /// `[HH:MM:SS] message`, on the local wall clock.
    pub fn render(&self) -> String {
        self.render_in(&Local)
    }

    /// `[HH:MM:SS] message` in the given zone. Files always store UTC.
    pub fn render_in<Tz>(&self, zone: &Tz) -> String
    where
        Tz: TimeZone,
        Tz::Offset: fmt::Display,
    {
        let local = self.timestamp.with_timezone(zone);
        format!("[{}] {}", local.format("%H:%M:%S"), self.message)
    }
}

#[derive(Debug, Error)]
pub enum LogSinkError {
    #[error("log file io failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed json log: {0}")]
    Json(#[from] serde_json::Error),

    #[error("malformed xml log: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("invalid log timestamp: {0}")]
    Timestamp(String),

    #[error("malformed log entry: {0}")]
    Malformed(String),
}

/// On-disk rendering of a sequence of entries.
pub trait LogFormat: Send + Sync + 'static {
    const EXTENSION: &'static str;

    fn encode(entries: &[LogEntry]) -> Result<String, LogSinkError>;

    fn decode(text: &str) -> Result<Vec<LogEntry>, LogSinkError>;
}

/// The log sink collaborator.
pub trait LogSink: Send {
    fn log(&mut self, message: &str);

    fn entries(&self) -> &[LogEntry];

    /// Rendered lines in logging order.
    fn logs(&self) -> Vec<String> {
        self.entries().iter().map(LogEntry::render).collect()
    }

    fn save_to_file(&self, path: &Path) -> Result<(), LogSinkError>;

    /// Replace the current entries with the file's content.
    fn load_from_file(&mut self, path: &Path) -> Result<(), LogSinkError>;

    fn clear(&mut self);
}

/// In-memory log with a pluggable file format.
pub struct LogBook<F> {
    entries: Vec<LogEntry>,
    _format: PhantomData<F>,
}

pub type XmlLogBook = LogBook<XmlFormat>;
pub type JsonLogBook = LogBook<JsonFormat>;

impl<F: LogFormat> LogBook<F> {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            _format: PhantomData,
        }
    }

    /// Append an entry with an explicit timestamp.
    pub fn push(&mut self, entry: LogEntry) {
        self.entries.push(entry);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<F: LogFormat> Default for LogBook<F> {
    fn default() -> Self {
        Self::new()
    }
}

impl<F> fmt::Debug for LogBook<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LogBook")
            .field("entries", &self.entries.len())
            .finish()
    }
}

impl<F: LogFormat> LogSink for LogBook<F> {
    fn log(&mut self, message: &str) {
        self.entries.push(LogEntry::new(Utc::now(), message));
    }

    fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    fn save_to_file(&self, path: &Path) -> Result<(), LogSinkError> {
        let text = F::encode(&self.entries)?;
        std::fs::write(path, text)?;
        tracing::debug!(path = %path.display(), entries = self.entries.len(), "log saved");
        Ok(())
    }

    fn load_from_file(&mut self, path: &Path) -> Result<(), LogSinkError> {
        let text = std::fs::read_to_string(path)?;
        self.entries = F::decode(&text)?;
        tracing::debug!(path = %path.display(), entries = self.entries.len(), "log loaded");
        Ok(())
    }

    fn clear(&mut self) {
        self.entries.clear();
    }
}

/// Which file format a sink uses.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub enum LogFormatKind {
    #[default]
    Xml,
    Json,
}

impl LogFormatKind {
    pub fn extension(self) -> &'static str {
        match self {
            LogFormatKind::Xml => XmlFormat::EXTENSION,
            LogFormatKind::Json => JsonFormat::EXTENSION,
        }
    }

    /// Empty sink of this format.
    pub fn open_sink(self) -> Box<dyn LogSink> {
        match self {
            LogFormatKind::Xml => Box::new(XmlLogBook::new()),
            LogFormatKind::Json => Box::new(JsonLogBook::new()),
        }
    }
}

impl FromStr for LogFormatKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "xml" => Ok(LogFormatKind::Xml),
            "json" => Ok(LogFormatKind::Json),
            other => Err(format!("unsupported log format '{other}' (expected xml or json)")),
        }
    }
}

impl fmt::Display for LogFormatKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}
