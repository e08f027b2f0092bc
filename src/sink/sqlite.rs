//! SQLite sink backed by rusqlite
//!
//! SQLite has no `CREATE SCHEMA`; a schema is an attached database instead.
//! For a file-backed connection the schema lives next to the main file as
//! `<schema>.db`; an in-memory connection attaches an in-memory database.

use super::{Sink, SinkError, SinkResult};
use rusqlite::{params, params_from_iter, Connection};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

const IN_MEMORY: &str = ":memory:";

pub struct SqliteSink {
    conn: Connection,
    /// Directory for attached schema files, `None` when in memory
    schema_dir: Option<PathBuf>,
}

impl SqliteSink {
    /// Open (or create) a database file; `:memory:` opens an in-memory database
    pub fn open(path: impl AsRef<Path>) -> SinkResult<Self> {
        let path = path.as_ref();
        if path == Path::new(IN_MEMORY) {
            return Self::open_in_memory();
        }

        let conn = Connection::open(path)?;
        conn.query_row("SELECT 1", [], |_| Ok(()))?;

        let schema_dir = path
            .parent()
            .map(|p| p.to_path_buf())
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| PathBuf::from("."));

        Ok(Self {
            conn,
            schema_dir: Some(schema_dir),
        })
    }

    pub fn open_in_memory() -> SinkResult<Self> {
        Ok(Self {
            conn: Connection::open_in_memory()?,
            schema_dir: None,
        })
    }

    /// Underlying connection, for reading back imported data
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    fn is_attached(&self, schema: &str) -> SinkResult<bool> {
        let mut stmt = self.conn.prepare("PRAGMA database_list")?;
        let names = stmt
            .query_map([], |row| row.get::<_, String>(1))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(names.iter().any(|n| n.eq_ignore_ascii_case(schema)))
    }
}

impl Sink for SqliteSink {
    fn try_create_schema(&mut self, schema: &str) -> SinkResult<()> {
        if self.is_attached(schema)? {
            return Err(SinkError(format!("schema {} already exists", schema)));
        }

        let file = match &self.schema_dir {
            Some(dir) => dir.join(format!("{}.db", schema)).to_string_lossy().into_owned(),
            None => IN_MEMORY.to_string(),
        };

        self.conn.execute(
            &format!("ATTACH DATABASE ?1 AS \"{}\"", schema.replace('"', "\"\"")),
            params![file],
        )?;
        info!("Attached schema {} ({})", schema, file);
        Ok(())
    }

    fn execute(&mut self, statement: &str) -> SinkResult<()> {
        debug!("Executing: {}", statement);
        self.conn.execute_batch(statement)?;
        Ok(())
    }

    fn begin(&mut self) -> SinkResult<()> {
        self.conn.execute_batch("BEGIN")?;
        Ok(())
    }

    fn insert(&mut self, statement: &str, values: &[String]) -> SinkResult<()> {
        let mut stmt = self.conn.prepare_cached(statement)?;
        stmt.execute(params_from_iter(values.iter()))?;
        Ok(())
    }

    fn commit(&mut self) -> SinkResult<()> {
        self.conn.execute_batch("COMMIT")?;
        Ok(())
    }

    fn rollback(&mut self) -> SinkResult<()> {
        self.conn.execute_batch("ROLLBACK")?;
        Ok(())
    }

    fn placeholder(&self, position: usize) -> String {
        format!("?{}", position)
    }
}
