//! Import Pipeline - Wires resolver, provisioner, importer and driver together
//!
//! 1. resolve the column set (CSV) or use the single JSON column
//! 2. create the table if it is missing
//! 3. open the import session and stream every record into it
//! 4. commit, or roll back and report the failing line

use crate::columns::resolve_columns;
use crate::config::{ImportOptions, JsonDataType, JSON_COLUMN};
use crate::driver::{copy_rows, Tally};
use crate::error::{ImportError, Result};
use crate::importer::RowImporter;
use crate::provision::{ensure_json_table, ensure_table};
use crate::sanitize::PlaceholderGenerator;
use crate::sink::Sink;
use crate::source::{CsvSource, JsonLinesSource, RecordSource};
use serde::{Deserialize, Serialize};
use std::io::{BufRead, Read, Write};
use tracing::{info, warn};

/// Result of a committed import
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportSummary {
    pub schema: String,
    pub table: String,
    pub tally: Tally,
}

impl ImportSummary {
    pub fn report(&self) -> String {
        format!("{} rows imported into {}.{}", self.tally.succeeded, self.schema, self.table)
    }

    /// Note about skipped rows, if there were any
    pub fn skipped_report(&self) -> Option<String> {
        (self.tally.failed > 0).then(|| {
            format!(
                "{} rows could not be imported into {}.{} and have been written to stderr.",
                self.tally.failed, self.schema, self.table
            )
        })
    }
}

/// Import delimited text into `<schema>.<table>`, one TEXT column per field
pub fn import_csv<R, W>(
    input: R,
    sink: &mut dyn Sink,
    options: &ImportOptions,
    placeholders: &mut dyn PlaceholderGenerator,
    diagnostics: &mut W,
) -> Result<ImportSummary>
where
    R: Read,
    W: Write + ?Sized,
{
    let mut source = CsvSource::new(input, options.delimiter);

    let resolved = resolve_columns(&mut source, options.skip_header, options.fields.as_deref(), placeholders)?;
    source.expect_fields(resolved.columns.len());

    ensure_table(sink, &options.schema, &options.table, &resolved.columns)?;

    let importer = RowImporter::begin(sink, &options.schema, &options.table, &resolved.columns)?;
    let header_lines = usize::from(resolved.header_consumed);

    run_session(&mut source, importer, options, header_lines, diagnostics)
}

/// Import one JSON document per line into a single JSON/JSONB column
pub fn import_json<R, W>(
    input: R,
    sink: &mut dyn Sink,
    options: &ImportOptions,
    data_type: JsonDataType,
    diagnostics: &mut W,
) -> Result<ImportSummary>
where
    R: BufRead,
    W: Write + ?Sized,
{
    let mut source = JsonLinesSource::new(input);
    let columns = vec![JSON_COLUMN.to_string()];

    ensure_json_table(sink, &options.schema, &options.table, JSON_COLUMN, data_type.as_sql())?;

    let importer = RowImporter::begin_typed(
        sink,
        &options.schema,
        &options.table,
        &columns,
        Some(data_type.as_sql()),
    )?;

    run_session(&mut source, importer, options, 0, diagnostics)
}

fn run_session<S, W>(
    source: &mut S,
    mut importer: RowImporter<'_>,
    options: &ImportOptions,
    header_lines: usize,
    diagnostics: &mut W,
) -> Result<ImportSummary>
where
    S: RecordSource + ?Sized,
    W: Write + ?Sized,
{
    match copy_rows(source, &mut importer, options.ignore_errors, options.delimiter, diagnostics) {
        Ok(tally) => {
            importer.commit()?;

            let summary = ImportSummary {
                schema: options.schema.clone(),
                table: options.table.clone(),
                tally,
            };
            info!("{}", summary.report());
            if let Some(skipped) = summary.skipped_report() {
                warn!("{}", skipped);
            }
            Ok(summary)
        }
        Err(aborted) => {
            let line = aborted.tally.processed() + header_lines + source.skipped_lines();
            warn!(
                "Import into {} aborted at line {} ({})",
                options.qualified_table(),
                line,
                aborted.cause.kind()
            );

            if let Err(e) = importer.rollback() {
                warn!("{}", e);
            }

            Err(ImportError::Row {
                line,
                content: aborted.content,
                cause: Box::new(aborted.cause),
            })
        }
    }
}
