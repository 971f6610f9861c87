//! Tree-markup rendering.
//!
//! ```xml
//! <?xml version="1.0" encoding="utf-8" standalone="yes"?>
//! <Logs>
//!   <LogEntry>
//!     <Timestamp>2024-05-17 09:00:01</Timestamp>
//!     <Message>🐾 Rex joined enclosure 'Enclosure A'</Message>
//!   </LogEntry>
//! </Logs>
//! ```
//!
//! Message text is kept verbatim, leading whitespace included, so the reader
//! never trims text nodes.

use chrono::NaiveDateTime;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};

use super::{LogEntry, LogFormat, LogSinkError};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Clone, Copy, Default)]
pub struct XmlFormat;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Timestamp,
    Message,
}

impl LogFormat for XmlFormat {
    const EXTENSION: &'static str = "xml";

    fn encode(entries: &[LogEntry]) -> Result<String, LogSinkError> {
        let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
        writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), Some("yes"))))?;
        writer.write_event(Event::Start(BytesStart::new("Logs")))?;

        for entry in entries {
            let timestamp = entry.timestamp.format(TIMESTAMP_FORMAT).to_string();
            writer.write_event(Event::Start(BytesStart::new("LogEntry")))?;
            writer
                .create_element("Timestamp")
                .write_text_content(BytesText::new(&timestamp))?;
            writer
                .create_element("Message")
                .write_text_content(BytesText::new(&entry.message))?;
            writer.write_event(Event::End(BytesEnd::new("LogEntry")))?;
        }

        writer.write_event(Event::End(BytesEnd::new("Logs")))?;
        String::from_utf8(writer.into_inner())
            .map_err(|e| LogSinkError::Malformed(format!("non utf-8 output: {e}")))
    }

    fn decode(text: &str) -> Result<Vec<LogEntry>, LogSinkError> {
        let mut reader = Reader::from_str(text);
        let mut entries = Vec::new();

        let mut field: Option<Field> = None;
        let mut buf = String::new();
        let mut timestamp: Option<String> = None;
        let mut message: Option<String> = None;

        loop {
            match reader.read_event()? {
                Event::Start(e) => match e.name().as_ref() {
                    b"LogEntry" => {
                        timestamp = None;
                        message = None;
                    }
                    b"Timestamp" => {
                        field = Some(Field::Timestamp);
                        buf.clear();
                    }
                    b"Message" => {
                        field = Some(Field::Message);
                        buf.clear();
                    }
                    _ => {}
                },
                Event::Empty(e) => match e.name().as_ref() {
                    b"Timestamp" => timestamp = Some(String::new()),
                    b"Message" => message = Some(String::new()),
                    _ => {}
                },
                Event::Text(t) if field.is_some() => buf.push_str(&t.unescape()?),
                Event::CData(c) if field.is_some() => {
                    buf.push_str(&String::from_utf8_lossy(&c.into_inner()));
                }
                Event::End(e) => match e.name().as_ref() {
                    b"Timestamp" => {
                        timestamp = Some(std::mem::take(&mut buf));
                        field = None;
                    }
                    b"Message" => {
                        message = Some(std::mem::take(&mut buf));
                        field = None;
                    }
                    b"LogEntry" => {
                        let raw = timestamp
                            .take()
                            .ok_or_else(|| LogSinkError::Timestamp("missing".to_string()))?;
                        let message = message
                            .take()
                            .ok_or_else(|| LogSinkError::Malformed("LogEntry without Message".to_string()))?;
                        entries.push(LogEntry::new(parse_timestamp(&raw)?, message));
                    }
                    _ => {}
                },
                Event::Eof => break,
                _ => {}
            }
        }

        Ok(entries)
    }
}

fn parse_timestamp(raw: &str) -> Result<chrono::DateTime<chrono::Utc>, LogSinkError> {
    NaiveDateTime::parse_from_str(raw.trim(), TIMESTAMP_FORMAT)
        .map(|naive| naive.and_utc())
        .map_err(|e| LogSinkError::Timestamp(format!("'{raw}': {e}")))
}
