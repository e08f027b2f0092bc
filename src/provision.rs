//! Table Provisioner - Creates the destination table when it is missing
//!
//! Existing tables are left alone: no column reconciliation happens, so a
//! table with a different shape only shows up as insert errors later.

use crate::error::{ImportError, Result};
use crate::sink::Sink;
use tracing::info;

/// The `CREATE TABLE IF NOT EXISTS` statement that was executed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateTable {
    pub statement: String,
}

/// Build the statement for a table of TEXT columns
pub fn create_table_statement(schema: &str, table: &str, columns: &[String]) -> String {
    let column_definitions = columns
        .iter()
        .map(|col| format!("{} TEXT", col))
        .collect::<Vec<_>>()
        .join(", ");
    format!("CREATE TABLE IF NOT EXISTS {}.{} ({})", schema, table, column_definitions)
}

/// Build the statement for a table with a single JSON/JSONB column
pub fn create_json_table_statement(schema: &str, table: &str, column: &str, data_type: &str) -> String {
    format!("CREATE TABLE IF NOT EXISTS {}.{} ({} {})", schema, table, column, data_type)
}

/// Create `<schema>.<table>` with one TEXT column per name, if absent
pub fn ensure_table(sink: &mut dyn Sink, schema: &str, table: &str, columns: &[String]) -> Result<CreateTable> {
    run_create(sink, create_table_statement(schema, table, columns))
}

/// Create `<schema>.<table>` with a single JSON column, if absent
pub fn ensure_json_table(
    sink: &mut dyn Sink,
    schema: &str,
    table: &str,
    column: &str,
    data_type: &str,
) -> Result<CreateTable> {
    run_create(sink, create_json_table_statement(schema, table, column, data_type))
}

fn run_create(sink: &mut dyn Sink, statement: String) -> Result<CreateTable> {
    sink.execute(&statement).map_err(|e| ImportError::Provision {
        statement: statement.clone(),
        message: e.to_string(),
    })?;

    info!("Ensured table: {}", statement);
    Ok(CreateTable { statement })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::sink::SqliteSink;

    fn columns(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_create_table_statement() {
        assert_eq!(
            create_table_statement("import", "people", &columns(&["id", "name"])),
            "CREATE TABLE IF NOT EXISTS import.people (id TEXT, name TEXT)"
        );
        assert_eq!(
            create_json_table_statement("import", "events", "data", "JSONB"),
            "CREATE TABLE IF NOT EXISTS import.events (data JSONB)"
        );
    }

    #[test]
    fn test_ensure_table_twice_keeps_data() {
        let mut sink = SqliteSink::open_in_memory().unwrap();
        let cols = columns(&["id", "name"]);

        ensure_table(&mut sink, "main", "people", &cols).unwrap();
        sink.execute("INSERT INTO main.people (id, name) VALUES ('1', 'Alice')").unwrap();
        ensure_table(&mut sink, "main", "people", &cols).unwrap();

        let count: i64 = sink
            .connection()
            .query_row("SELECT COUNT(*) FROM main.people", [], |r| r.get(0))
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn test_missing_schema_is_provision_error() {
        let mut sink = SqliteSink::open_in_memory().unwrap();
        let err = ensure_table(&mut sink, "nowhere", "people", &columns(&["id"])).unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Provision);
        assert!(err.to_string().contains("CREATE TABLE IF NOT EXISTS nowhere.people"));
    }
}
