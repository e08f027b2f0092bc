//! Streaming Driver - Moves records from a source into an import session
//!
//! Records are read, inserted and counted one at a time. A record that fails
//! to decode or insert either aborts the run or, in error-tolerant mode, is
//! written to the diagnostic stream and skipped. Nothing is retried.

use crate::error::ImportError;
use crate::importer::RowImporter;
use crate::source::RecordSource;
use serde::{Deserialize, Serialize};
use std::io::Write;
use tracing::{debug, warn};

/// Outcome counters of one run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tally {
    pub succeeded: usize,
    pub failed: usize,
}

impl Tally {
    pub fn processed(&self) -> usize {
        self.succeeded + self.failed
    }
}

/// A run stopped at a record it could not handle
#[derive(Debug)]
pub struct Aborted {
    /// Counts up to and including the offending record
    pub tally: Tally,
    /// Offending line content
    pub content: String,
    pub cause: ImportError,
}

/// Copy every remaining record of `source` into `importer`
pub fn copy_rows<S, W>(
    source: &mut S,
    importer: &mut RowImporter<'_>,
    ignore_errors: bool,
    delimiter: u8,
    diagnostics: &mut W,
) -> Result<Tally, Aborted>
where
    S: RecordSource + ?Sized,
    W: Write + ?Sized,
{
    let mut tally = Tally::default();
    let delimiter = (delimiter as char).to_string();

    loop {
        let (content, cause) = match source.next_record() {
            Ok(None) => break,
            Ok(Some(record)) => match importer.add_row(&record) {
                Ok(()) => {
                    tally.succeeded += 1;
                    continue;
                }
                Err(e) => (record.join(delimiter.as_str()), e),
            },
            Err(failure) => (failure.line, failure.error),
        };

        tally.failed += 1;

        if !ignore_errors {
            return Err(Aborted { tally, content, cause });
        }

        warn!("Skipping record {}: {}", tally.processed(), cause);
        if let Err(e) = writeln!(diagnostics, "{}", content) {
            warn!("Couldn't write skipped record to diagnostics: {}", e);
        }
    }

    debug!("Copied {} rows, {} failed", tally.succeeded, tally.failed);
    Ok(tally)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::provision::ensure_table;
    use crate::sink::{Sink, SqliteSink};
    use crate::source::CsvSource;

    fn setup() -> (SqliteSink, Vec<String>) {
        let mut sink = SqliteSink::open_in_memory().unwrap();
        let columns = vec!["id".to_string(), "name".to_string()];
        ensure_table(&mut sink, "main", "people", &columns).unwrap();
        (sink, columns)
    }

    fn source(input: &'static str) -> CsvSource<&'static [u8]> {
        let mut source = CsvSource::new(input.as_bytes(), b',');
        source.expect_fields(2);
        source
    }

    #[test]
    fn test_all_rows_copied() {
        let (mut sink, columns) = setup();
        let mut importer = RowImporter::begin(&mut sink, "main", "people", &columns).unwrap();
        let mut diagnostics = Vec::new();

        let tally = copy_rows(&mut source("1,Alice\n2,Bob\n3,Carol\n"), &mut importer, false, b',', &mut diagnostics)
            .unwrap();

        assert_eq!(tally, Tally { succeeded: 3, failed: 0 });
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn test_bad_record_aborts_immediately() {
        let (mut sink, columns) = setup();
        let mut importer = RowImporter::begin(&mut sink, "main", "people", &columns).unwrap();
        let mut diagnostics = Vec::new();
        let mut input = source("1,Alice\n2,Bob,extra\n3,Carol\n");

        let aborted = copy_rows(&mut input, &mut importer, false, b',', &mut diagnostics).unwrap_err();

        assert_eq!(aborted.tally, Tally { succeeded: 1, failed: 1 });
        assert_eq!(aborted.content, "2,Bob,extra");
        assert_eq!(aborted.cause.kind(), ErrorKind::SourceRead);
        assert!(diagnostics.is_empty());
        // nothing after the bad record was read
        assert_eq!(input.next_record().unwrap().unwrap(), vec!["3", "Carol"]);
    }

    #[test]
    fn test_ignore_errors_skips_and_reports() {
        let (mut sink, columns) = setup();
        let mut importer = RowImporter::begin(&mut sink, "main", "people", &columns).unwrap();
        let mut diagnostics = Vec::new();

        let tally = copy_rows(
            &mut source("1,Alice\n2,Bob,extra\n3,Carol\n4\n"),
            &mut importer,
            true,
            b',',
            &mut diagnostics,
        )
        .unwrap();

        assert_eq!(tally, Tally { succeeded: 2, failed: 2 });
        assert_eq!(String::from_utf8(diagnostics).unwrap(), "2,Bob,extra\n4\n");
    }

    #[test]
    fn test_insert_failure_is_counted() {
        let mut sink = SqliteSink::open_in_memory().unwrap();
        sink.execute("CREATE TABLE main.people (id TEXT UNIQUE, name TEXT)").unwrap();
        let columns = vec!["id".to_string(), "name".to_string()];
        let mut importer = RowImporter::begin(&mut sink, "main", "people", &columns).unwrap();
        let mut diagnostics = Vec::new();

        let aborted = copy_rows(
            &mut source("1,Alice\n1,Again\n"),
            &mut importer,
            false,
            b',',
            &mut diagnostics,
        )
        .unwrap_err();

        assert_eq!(aborted.tally, Tally { succeeded: 1, failed: 1 });
        assert_eq!(aborted.content, "1,Again");
        assert_eq!(aborted.cause.kind(), ErrorKind::Insert);
    }
}
