//! Row Operations
//!
//! Batch semantics applied to one in-memory partition. Nothing here touches
//! the filesystem: the engine loads a partition, applies one of these, and
//! rewrites the result.
//!
//! Every operation validates the whole group before changing `existing`, so a
//! failed operation leaves the partition exactly as it was loaded.

use std::collections::{BTreeMap, HashSet};

use crate::error::{Result, TableError};
use crate::row::{Row, RowId};
use crate::storage::Partition;

/// Write operations that share the grouped read-modify-write path
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mutation {
    /// Fail on any duplicate row key (in the input or in the partition)
    Insert,
    /// Fail on duplicate row keys in the input; otherwise replace whole rows
    InsertOrReplace,
    /// Cell-level overlay onto existing rows; absent rows are inserted
    Merge,
}

impl Mutation {
    pub fn name(&self) -> &'static str {
        match self {
            Mutation::Insert => "insert",
            Mutation::InsertOrReplace => "insert_or_replace",
            Mutation::Merge => "merge",
        }
    }

    /// Apply this mutation to one partition's rows
    pub fn apply(&self, existing: &mut Partition, rows: Vec<Row>) -> Result<()> {
        match self {
            Mutation::Insert => insert(existing, rows),
            Mutation::InsertOrReplace => insert_or_replace(existing, rows),
            Mutation::Merge => {
                merge(existing, rows);
                Ok(())
            }
        }
    }
}

/// Add rows; any row key already present, in the input or in `existing`,
/// fails the whole group
pub fn insert(existing: &mut Partition, rows: Vec<Row>) -> Result<()> {
    ensure_distinct(&rows)?;

    if let Some(row) = rows.iter().find(|r| existing.contains_key(r.row_key())) {
        return Err(duplicate(row));
    }

    for row in rows {
        existing.insert(row.row_key().to_string(), row);
    }
    Ok(())
}

/// Add or replace whole rows; only duplicates within the input fail
pub fn insert_or_replace(existing: &mut Partition, rows: Vec<Row>) -> Result<()> {
    ensure_distinct(&rows)?;

    for row in rows {
        existing.insert(row.row_key().to_string(), row);
    }
    Ok(())
}

/// Overlay the named cells of each input row onto the existing row, or insert
/// the row if its key is new
///
/// Input rows are applied in order, so a repeated row key overlays twice.
pub fn merge(existing: &mut Partition, rows: Vec<Row>) {
    for row in rows {
        match existing.get_mut(row.row_key()) {
            Some(current) => {
                tracing::trace!(row_key = row.row_key(), cells = row.len(), "merge overlay");
                current.overlay(row);
            }
            None => {
                existing.insert(row.row_key().to_string(), row);
            }
        }
    }
}

/// Remove the named rows; keys not present are ignored
pub fn delete<'a, I>(existing: &mut Partition, row_keys: I)
where
    I: IntoIterator<Item = &'a str>,
{
    for row_key in row_keys {
        if existing.remove(row_key).is_none() {
            tracing::trace!(row_key, "delete of absent row ignored");
        }
    }
}

/// Split rows into per-partition groups, in partition-key order, keeping the
/// input order inside each group
pub fn group_rows(rows: Vec<Row>) -> BTreeMap<String, Vec<Row>> {
    let mut groups: BTreeMap<String, Vec<Row>> = BTreeMap::new();
    for row in rows {
        groups
            .entry(row.partition_key().to_string())
            .or_default()
            .push(row);
    }
    groups
}

/// Split row ids into per-partition groups of row keys
pub fn group_ids(ids: Vec<RowId>) -> BTreeMap<String, Vec<String>> {
    let mut groups: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for id in ids {
        groups.entry(id.partition_key).or_default().push(id.row_key);
    }
    groups
}

fn ensure_distinct(rows: &[Row]) -> Result<()> {
    let mut seen = HashSet::with_capacity(rows.len());
    match rows.iter().find(|r| !seen.insert(r.row_key())) {
        Some(row) => Err(duplicate(row)),
        None => Ok(()),
    }
}

fn duplicate(row: &Row) -> TableError {
    TableError::DuplicateKey {
        partition_key: row.partition_key().to_string(),
        row_key: row.row_key().to_string(),
    }
}
