//! Structured-record rendering: `{"Logs":[{"Timestamp": ..., "Message": ...}]}`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{LogEntry, LogFormat, LogSinkError};

#[derive(Debug, Serialize, Deserialize)]
struct JsonLog {
    #[serde(rename = "Logs")]
    logs: Vec<JsonEntry>,
}

#[derive(Debug, Serialize, Deserialize)]
struct JsonEntry {
    #[serde(rename = "Timestamp")]
    timestamp: DateTime<Utc>,
    #[serde(rename = "Message")]
    message: String,
}

/// Pretty-printed JSON with RFC 3339 timestamps.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonFormat;

impl LogFormat for JsonFormat {
    const EXTENSION: &'static str = "json";

    fn encode(entries: &[LogEntry]) -> Result<String, LogSinkError> {
        let doc = JsonLog {
            logs: entries
                .iter()
                .map(|e| JsonEntry {
                    timestamp: e.timestamp,
                    message: e.message.clone(),
                })
                .collect(),
        };
        Ok(serde_json::to_string_pretty(&doc)?)
    }

    fn decode(text: &str) -> Result<Vec<LogEntry>, LogSinkError> {
        let doc: JsonLog = serde_json::from_str(text)?;
        Ok(doc
            .logs
            .into_iter()
            .map(|e| LogEntry::new(e.timestamp, e.message))
            .collect())
    }
}
