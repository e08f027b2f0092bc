//! Sink module - Destination stores accepting table creation and row inserts
//!
//! The import pipeline only needs a handful of operations from a store, so
//! backends implement the small `Sink` trait:
//! - SQLite via rusqlite (schemas map to attached databases)
//! - PostgreSQL via sqlx, driven synchronously

pub mod postgres;
pub mod sqlite;

pub use postgres::PostgresSink;
pub use sqlite::SqliteSink;

use crate::config::{Backend, ConnectionConfig};
use crate::error::{ImportError, Result};
use thiserror::Error;
use tracing::{debug, info};

/// Error raised by a sink backend; callers classify it
#[derive(Error, Debug)]
#[error("{0}")]
pub struct SinkError(pub String);

impl From<rusqlite::Error> for SinkError {
    fn from(err: rusqlite::Error) -> Self {
        SinkError(err.to_string())
    }
}

impl From<sqlx::Error> for SinkError {
    fn from(err: sqlx::Error) -> Self {
        SinkError(err.to_string())
    }
}

impl From<std::io::Error> for SinkError {
    fn from(err: std::io::Error) -> Self {
        SinkError(err.to_string())
    }
}

pub type SinkResult<T> = std::result::Result<T, SinkError>;

/// Destination store operations used by the import pipeline
pub trait Sink {
    /// Create `schema`; may fail when it already exists
    fn try_create_schema(&mut self, schema: &str) -> SinkResult<()>;

    /// Execute a statement without parameters
    fn execute(&mut self, statement: &str) -> SinkResult<()>;

    /// Open the transaction that subsequent inserts run in
    fn begin(&mut self) -> SinkResult<()>;

    /// Execute a parameterized insert with text values
    ///
    /// A failed insert must leave the open transaction usable.
    fn insert(&mut self, statement: &str, values: &[String]) -> SinkResult<()>;

    fn commit(&mut self) -> SinkResult<()>;

    fn rollback(&mut self) -> SinkResult<()>;

    /// Bind placeholder for the 1-based parameter `position`
    fn placeholder(&self, position: usize) -> String;

    /// Placeholder for a text value stored into a column of `sql_type`
    fn typed_placeholder(&self, position: usize, _sql_type: &str) -> String {
        self.placeholder(position)
    }
}

/// Open the configured sink, check it answers, and try to create `schema`.
///
/// Schema creation is best effort: its failure is logged and ignored, and a
/// schema that truly does not exist surfaces later when the table is created.
pub fn connect(config: &ConnectionConfig, schema: &str) -> Result<Box<dyn Sink>> {
    info!("Connecting to {}", config);

    let mut sink: Box<dyn Sink> = match config.backend {
        Backend::Sqlite => Box::new(
            SqliteSink::open(&config.dbname).map_err(|e| ImportError::Connection(e.to_string()))?,
        ),
        Backend::Postgres => Box::new(
            PostgresSink::connect(config).map_err(|e| ImportError::Connection(e.to_string()))?,
        ),
    };

    if let Err(e) = sink.try_create_schema(schema) {
        debug!("Ignoring failure to create schema {}: {}", schema, e);
    }

    Ok(sink)
}
