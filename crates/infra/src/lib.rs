//! Infrastructure layer: SQLite persistence, narrative log files, configuration.

pub mod config;
pub mod logbook;
pub mod persistence;
pub mod store;

pub use config::{ConfigError, ZooConfig};
pub use logbook::{
    JsonFormat, JsonLogBook, LogBook, LogEntry, LogFormat, LogFormatKind, LogSink, LogSinkError, XmlFormat, XmlLogBook,
};
pub use persistence::{load_zoo, save_zoo};
pub use store::{AnimalRepository, EnclosureRecord, SqliteAnimalRepository, StoreError, StoreResult};
