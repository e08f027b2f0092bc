//! table-import - Bulk-load delimited text or JSON lines into a relational table
//!
//! Column names come from a header row or an explicit list and are sanitized
//! into identifiers, the destination table is created when missing, and every
//! record is inserted inside a single transaction. Bad records either abort
//! the run or are skipped and written to a diagnostic stream.

pub mod columns;
pub mod config;
pub mod driver;
pub mod error;
pub mod importer;
pub mod pipeline;
pub mod provision;
pub mod sanitize;
pub mod sink;
pub mod source;

pub use config::{Backend, ConnectionConfig, ImportOptions, JsonDataType};
pub use driver::Tally;
pub use error::{ErrorKind, ImportError, Result};
pub use pipeline::{import_csv, import_json, ImportSummary};
pub use sanitize::{PlaceholderGenerator, RandomPlaceholders, SequentialPlaceholders};
pub use sink::{connect, PostgresSink, Sink, SqliteSink};
