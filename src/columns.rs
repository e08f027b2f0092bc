//! Column Resolver - Determines the column set of an import run
//!
//! Columns come either from the first record of the source or from an
//! explicit comma-separated list. Names that still contain a delimiter-like
//! character almost always mean the wrong delimiter was configured, so those
//! are rejected before anything touches the sink.

use crate::error::{ImportError, Result};
use crate::sanitize::{sanitize_identifier, PlaceholderGenerator};
use crate::source::RecordSource;
use tracing::debug;

/// Characters that signal a header was split with the wrong delimiter.
///
/// Comma is always included, even when it is not the active delimiter.
pub const DELIMITER_CHARS: &[char] = &[';', ',', '|', '\t', '^', '~'];

/// Resolved column set plus whether a header line was consumed from the source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedColumns {
    pub columns: Vec<String>,
    pub header_consumed: bool,
}

pub fn contains_delimiter(column: &str) -> bool {
    column.contains(DELIMITER_CHARS)
}

/// Resolve the column set from a header record or from `fields`
pub fn resolve_columns<S: RecordSource + ?Sized>(
    source: &mut S,
    skip_header: bool,
    fields: Option<&str>,
    placeholders: &mut dyn PlaceholderGenerator,
) -> Result<ResolvedColumns> {
    let (raw_columns, header_consumed) = match fields.filter(|f| !f.is_empty()) {
        Some(fields) => {
            if skip_header {
                // Discarded whatever it contains
                let _ = source.next_record();
            }
            (fields.split(',').map(str::to_string).collect::<Vec<_>>(), skip_header)
        }
        None => {
            let header = source
                .next_record()
                .map_err(|failure| failure.error)?
                .ok_or_else(|| ImportError::SourceRead("no header record: input is empty".to_string()))?;
            (header, true)
        }
    };

    if let Some(column) = raw_columns.iter().find(|c| contains_delimiter(c)) {
        return Err(ImportError::DelimiterMismatch {
            column: column.clone(),
        });
    }

    let columns = raw_columns
        .iter()
        .map(|c| sanitize_identifier(c, placeholders))
        .collect::<Vec<_>>();

    debug!("Resolved columns: {:?}", columns);

    Ok(ResolvedColumns {
        columns,
        header_consumed,
    })
}
