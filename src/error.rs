use std::fmt;
use thiserror::Error;

/// Coarse classification of an import failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    DelimiterMismatch,
    SourceRead,
    Insert,
    Provision,
    Connection,
    Config,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::DelimiterMismatch => "delimiter mismatch",
            ErrorKind::SourceRead => "source read error",
            ErrorKind::Insert => "insert error",
            ErrorKind::Provision => "provision error",
            ErrorKind::Connection => "connection error",
            ErrorKind::Config => "configuration error",
        };
        f.write_str(name)
    }
}

#[derive(Error, Debug)]
pub enum ImportError {
    #[error("Please specify the correct delimiter with -d. Header column contains a delimiter character: {column}")]
    DelimiterMismatch { column: String },

    #[error("Source read error: {0}")]
    SourceRead(String),

    #[error("Insert error: {0}")]
    Insert(String),

    #[error("Couldn't create table with command: {statement}  Error: {message}")]
    Provision { statement: String, message: String },

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Error copying to table at line {line}: {cause} (line content: {content:?})")]
    Row {
        line: usize,
        content: String,
        #[source]
        cause: Box<ImportError>,
    },
}

impl ImportError {
    /// Kind of the underlying failure; `Row` reports the kind of its cause.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ImportError::DelimiterMismatch { .. } => ErrorKind::DelimiterMismatch,
            ImportError::SourceRead(_) => ErrorKind::SourceRead,
            ImportError::Insert(_) => ErrorKind::Insert,
            ImportError::Provision { .. } => ErrorKind::Provision,
            ImportError::Connection(_) => ErrorKind::Connection,
            ImportError::Config(_) => ErrorKind::Config,
            ImportError::Row { cause, .. } => cause.kind(),
        }
    }

    /// 1-based input line of an aborted row, if this error came from the row loop
    pub fn line(&self) -> Option<usize> {
        match self {
            ImportError::Row { line, .. } => Some(*line),
            _ => None,
        }
    }
}

impl From<csv::Error> for ImportError {
    fn from(err: csv::Error) -> Self {
        ImportError::SourceRead(err.to_string())
    }
}

impl From<std::io::Error> for ImportError {
    fn from(err: std::io::Error) -> Self {
        ImportError::SourceRead(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ImportError>;
