//! Row Importer - The transactional insert stream of one import run
//!
//! A `RowImporter` is the import session: it opens a transaction on the sink,
//! runs one insert per row inside it and ends exactly once. `commit` consumes
//! the session; a session dropped without committing is rolled back.
//! There are no intermediate commits, however large the input.

use crate::error::{ImportError, Result};
use crate::sink::Sink;
use tracing::{debug, info, warn};

pub struct RowImporter<'a> {
    sink: &'a mut dyn Sink,
    qualified_table: String,
    insert_statement: String,
    column_count: usize,
    finished: bool,
}

/// `INSERT INTO <schema>.<table> (<cols>) VALUES (<placeholders>)`
///
/// With `column_type`, placeholders are typed for sinks that need a cast from text.
pub fn insert_statement(
    sink: &dyn Sink,
    schema: &str,
    table: &str,
    columns: &[String],
    column_type: Option<&str>,
) -> String {
    let placeholders = (1..=columns.len())
        .map(|i| match column_type {
            Some(sql_type) => sink.typed_placeholder(i, sql_type),
            None => sink.placeholder(i),
        })
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "INSERT INTO {}.{} ({}) VALUES ({})",
        schema,
        table,
        columns.join(", "),
        placeholders
    )
}

impl<'a> RowImporter<'a> {
    /// Open a transaction for inserting into `<schema>.<table>`
    pub fn begin(sink: &'a mut dyn Sink, schema: &str, table: &str, columns: &[String]) -> Result<Self> {
        Self::begin_typed(sink, schema, table, columns, None)
    }

    /// Like `begin`, for columns that are not plain text
    pub fn begin_typed(
        sink: &'a mut dyn Sink,
        schema: &str,
        table: &str,
        columns: &[String],
        column_type: Option<&str>,
    ) -> Result<Self> {
        let insert_statement = insert_statement(&*sink, schema, table, columns, column_type);

        sink.begin()
            .map_err(|e| ImportError::Insert(format!("couldn't begin transaction: {}", e)))?;

        debug!("Import session open: {}", insert_statement);

        Ok(Self {
            sink,
            qualified_table: format!("{}.{}", schema, table),
            insert_statement,
            column_count: columns.len(),
            finished: false,
        })
    }

    /// Insert one row; a failure leaves the transaction open for the caller to decide
    pub fn add_row(&mut self, values: &[String]) -> Result<()> {
        if values.len() != self.column_count {
            return Err(ImportError::Insert(format!(
                "expected {} values, got {}",
                self.column_count,
                values.len()
            )));
        }

        self.sink
            .insert(&self.insert_statement, values)
            .map_err(|e| ImportError::Insert(e.to_string()))
    }

    pub fn commit(mut self) -> Result<()> {
        self.sink
            .commit()
            .map_err(|e| ImportError::Insert(format!("couldn't commit import into {}: {}", self.qualified_table, e)))?;
        self.finished = true;
        info!("Committed import into {}", self.qualified_table);
        Ok(())
    }

    pub fn rollback(mut self) -> Result<()> {
        self.finished = true;
        self.sink
            .rollback()
            .map_err(|e| ImportError::Insert(format!("couldn't roll back import into {}: {}", self.qualified_table, e)))?;
        info!("Rolled back import into {}", self.qualified_table);
        Ok(())
    }
}

impl Drop for RowImporter<'_> {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        if let Err(e) = self.sink.rollback() {
            warn!("Rollback of unfinished import into {} failed: {}", self.qualified_table, e);
        }
    }
}
