//! Partition Codec
//!
//! Delimited-text image of one partition.
//!
//! ## File Format
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │ Header record                                           │
//! │   RowKey,<col1>,<col2>,...      (cols in lexical order) │
//! ├─────────────────────────────────────────────────────────┤
//! │ Data records (one per row)                              │
//! │   <rowkey>,<value1>,<value2>,...                        │
//! │   ... absent cells are written as empty fields ...      │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! - UTF-8 text, `,` between fields, `\n` after each record (`\r\n` accepted).
//! - A field containing `,`, `"`, `\r` or `\n` is wrapped in `"` with embedded
//!   quotes doubled.
//! - The header is the schema union of the rows being written, recomputed on
//!   every encode.
//! - Empty fields decode as absent cells.

mod reader;
mod writer;

use std::collections::{BTreeMap, BTreeSet};

pub use reader::{decode, RecordReader};
pub use writer::{encode, RecordWriter};

use crate::row::Row;

// =============================================================================
// Shared Constants (used by reader and writer)
// =============================================================================

/// Name of the leading key column in every header
pub const ROW_KEY_COLUMN: &str = "RowKey";

/// Field delimiter
pub(crate) const DELIMITER: char = ',';

/// Quote character
pub(crate) const QUOTE: char = '"';

/// Record separator emitted by the writer
pub(crate) const RECORD_SEPARATOR: char = '\n';

/// In-memory partition: row key → row, in ordinal row-key order
pub type Partition = BTreeMap<String, Row>;

/// Header for a set of rows: `RowKey` followed by the sorted union of every
/// cell name
pub fn schema<'a, I>(rows: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a Row>,
{
    let columns: BTreeSet<&str> = rows.into_iter().flat_map(Row::cell_names).collect();

    std::iter::once(ROW_KEY_COLUMN)
        .chain(columns)
        .map(str::to_string)
        .collect()
}
