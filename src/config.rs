//! Configuration - Connection settings and per-run import options

use crate::error::{ImportError, Result};
use crate::sanitize::{sanitize_identifier, PlaceholderGenerator};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use sqlx::postgres::{PgConnectOptions, PgSslMode};
use std::fmt;
use std::path::Path;

/// Schema used when none is configured
pub const DEFAULT_SCHEMA: &str = "import";

/// Column name of JSON imports
pub const JSON_COLUMN: &str = "data";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    Postgres,
    Sqlite,
}

/// Where to connect
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionConfig {
    pub backend: Backend,
    pub host: String,
    pub port: u16,
    pub user: String,
    #[serde(skip_serializing, default)]
    pub password: String,
    /// Database name, or the database file for SQLite
    pub dbname: String,
    pub ssl: bool,
}

impl ConnectionConfig {
    pub fn postgres(
        host: impl Into<String>,
        port: u16,
        user: impl Into<String>,
        password: impl Into<String>,
        dbname: impl Into<String>,
        ssl: bool,
    ) -> Self {
        Self {
            backend: Backend::Postgres,
            host: host.into(),
            port,
            user: user.into(),
            password: password.into(),
            dbname: dbname.into(),
            ssl,
        }
    }

    pub fn sqlite(path: impl Into<String>) -> Self {
        Self {
            backend: Backend::Sqlite,
            host: String::new(),
            port: 0,
            user: String::new(),
            password: String::new(),
            dbname: path.into(),
            ssl: false,
        }
    }

    /// libpq style connection string
    fn dsn(&self, password: &str) -> String {
        let other_params = if self.ssl {
            "sslmode=require connect_timeout=5"
        } else {
            "sslmode=disable connect_timeout=5"
        };
        format!(
            "user={} dbname={} password='{}' host={} port={} {}",
            self.user, self.dbname, password, self.host, self.port, other_params
        )
    }

    pub fn pg_connect_options(&self) -> PgConnectOptions {
        PgConnectOptions::new()
            .host(&self.host)
            .port(self.port)
            .username(&self.user)
            .password(&self.password)
            .database(&self.dbname)
            .ssl_mode(if self.ssl {
                PgSslMode::Require
            } else {
                PgSslMode::Disable
            })
    }
}

impl fmt::Display for ConnectionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.backend {
            Backend::Sqlite => write!(f, "sqlite database {}", self.dbname),
            Backend::Postgres => f.write_str(&self.dsn("***")),
        }
    }
}

/// JSON column type for JSON imports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum JsonDataType {
    #[default]
    Json,
    Jsonb,
}

impl JsonDataType {
    pub fn as_sql(&self) -> &'static str {
        match self {
            JsonDataType::Json => "JSON",
            JsonDataType::Jsonb => "JSONB",
        }
    }
}

/// Options for one import run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportOptions {
    pub schema: String,
    pub table: String,
    /// Count and skip bad records instead of aborting
    pub ignore_errors: bool,
    /// With explicit `fields`, discard the first record
    pub skip_header: bool,
    /// Explicit comma-separated column list
    pub fields: Option<String>,
    pub delimiter: u8,
}

impl ImportOptions {
    pub fn new(schema: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            schema: schema.into(),
            table: table.into(),
            ignore_errors: false,
            skip_header: false,
            fields: None,
            delimiter: b',',
        }
    }

    pub fn qualified_table(&self) -> String {
        format!("{}.{}", self.schema, self.table)
    }
}

/// Parse a single-byte delimiter; `\t` and `tab` mean a tab
pub fn parse_delimiter(value: &str) -> Result<u8> {
    match value {
        "\\t" | "tab" => return Ok(b'\t'),
        _ => {}
    }

    let mut chars = value.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) if c.is_ascii() => Ok(c as u8),
        _ => Err(ImportError::Config(format!(
            "delimiter must be a single ASCII character, got {:?}",
            value
        ))),
    }
}

/// Table name derived from an input file, e.g. `Sales Q1.csv` -> `sales_q1`
pub fn table_name_from_path(path: &Path, placeholders: &mut dyn PlaceholderGenerator) -> Option<String> {
    let stem = path.file_stem()?.to_string_lossy();
    Some(sanitize_identifier(&stem, placeholders))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::sanitize::SequentialPlaceholders;

    #[test]
    fn test_connection_string() {
        let config = ConnectionConfig::postgres("localhost", 5432, "postgres", "secret", "postgres", false);
        assert_eq!(
            config.dsn(&config.password),
            "user=postgres dbname=postgres password='secret' host=localhost port=5432 sslmode=disable connect_timeout=5"
        );

        let config = ConnectionConfig { ssl: true, ..config };
        assert!(config.to_string().ends_with("sslmode=require connect_timeout=5"));
    }

    #[test]
    fn test_display_hides_password() {
        let config = ConnectionConfig::postgres("db", 5432, "u", "secret", "d", true);
        let shown = config.to_string();
        assert!(!shown.contains("secret"));
        assert!(shown.contains("password='***'"));
    }

    #[test]
    fn test_parse_delimiter() {
        assert_eq!(parse_delimiter(",").unwrap(), b',');
        assert_eq!(parse_delimiter(";").unwrap(), b';');
        assert_eq!(parse_delimiter("\\t").unwrap(), b'\t');
        assert_eq!(parse_delimiter("\t").unwrap(), b'\t');
        assert_eq!(parse_delimiter("").unwrap_err().kind(), ErrorKind::Config);
        assert_eq!(parse_delimiter(",,").unwrap_err().kind(), ErrorKind::Config);
        assert_eq!(parse_delimiter("§").unwrap_err().kind(), ErrorKind::Config);
    }

    #[test]
    fn test_table_name_from_path() {
        let mut placeholders = SequentialPlaceholders::default();
        assert_eq!(
            table_name_from_path(Path::new("/data/Sales Q1.csv"), &mut placeholders).as_deref(),
            Some("sales_q1")
        );
        assert_eq!(
            table_name_from_path(Path::new("2024-orders.json"), &mut placeholders).as_deref(),
            Some("_2024_orders")
        );
    }
}
