//! Engine Module
//!
//! The table engine: the public table-storage contract over the partition
//! store.
//!
//! ## Responsibilities
//! - Validate every request before any I/O
//! - Group batch input by partition key
//! - Run one locked read-modify-write cycle per partition group
//! - Report per-partition failures without aborting sibling groups

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use crate::config::Config;
use crate::error::{PartitionFailure, Result, TableError};
use crate::lock::{NoPartitionLock, PartitionLock};
use crate::mutation::{self, Mutation};
use crate::row::{Row, RowId};
use crate::storage::{Partition, PartitionStore, ROW_KEY_COLUMN};

/// Table-storage contract consumed by the surrounding storage facade
pub trait TableStorage {
    /// Whether rows carry version tokens checked on write
    fn supports_optimistic_concurrency(&self) -> bool;

    /// Names of all tables
    fn list_table_names(&self) -> Result<Vec<String>>;

    /// Delete an entire table; no error if it does not exist
    fn delete_table(&self, table: &str) -> Result<()>;

    /// All rows of a partition; empty if the table or partition is absent
    fn get_rows(&self, table: &str, partition_key: &str) -> Result<Vec<Row>>;

    /// A single row, or `None` if absent
    fn get_row(&self, table: &str, partition_key: &str, row_key: &str) -> Result<Option<Row>>;

    /// Insert rows; duplicate row keys fail their partition group
    fn insert(&self, table: &str, rows: Vec<Row>) -> Result<()>;

    /// Insert rows, replacing existing rows with the same key
    fn insert_or_replace(&self, table: &str, rows: Vec<Row>) -> Result<()>;

    /// Cell-level merge of rows into existing rows
    fn merge(&self, table: &str, rows: Vec<Row>) -> Result<()>;

    /// Delete rows by id; absent rows are ignored
    fn delete(&self, table: &str, row_ids: Vec<RowId>) -> Result<()>;

    /// Version-checked update
    fn update(&self, table: &str, rows: Vec<Row>) -> Result<()>;
}

/// File-backed table engine
///
/// ## Concurrency Model
///
/// - Operations are synchronous file I/O; there is no background work
/// - Each partition group of a write is one read-modify-write cycle held under
///   the configured `PartitionLock` (none by default, so concurrent writers to
///   one partition race and the later rewrite wins)
/// - Groups of one call run in partition-key order, each committed or failed
///   independently
pub struct TableEngine {
    /// Engine configuration
    config: Config,

    /// On-disk partition storage
    store: PartitionStore,

    /// Per-partition mutual exclusion hook
    lock: Arc<dyn PartitionLock>,
}

impl TableEngine {
    /// This engine never offers optimistic concurrency
    pub const SUPPORTS_OPTIMISTIC_CONCURRENCY: bool = false;

    /// Open an engine with the given config and no partition locking
    pub fn open(config: Config) -> Self {
        Self::with_lock(config, Arc::new(NoPartitionLock))
    }

    /// Open with a path (convenience method)
    ///
    /// Uses default config with the specified root directory
    pub fn open_path(path: &Path) -> Self {
        Self::open(Config::builder().root_dir(path).build())
    }

    /// Open an engine that serializes partition rewrites through `lock`
    pub fn with_lock(config: Config, lock: Arc<dyn PartitionLock>) -> Self {
        let store = PartitionStore::new(&config);
        Self {
            config,
            store,
            lock,
        }
    }

    /// Logical partition keys of a table (empty if the table is absent)
    pub fn list_partitions(&self, table: &str) -> Result<Vec<String>> {
        validate_table(table)?;
        self.store.list_partitions(table)
    }

    /// Every row of a table, partition by partition
    pub fn get_all_rows(&self, table: &str) -> Result<Vec<Row>> {
        validate_table(table)?;

        let mut rows = Vec::new();
        for partition_key in self.store.list_partitions(table)? {
            if let Some(partition) = self.store.read_partition(table, &partition_key, None)? {
                rows.extend(partition.into_values());
            }
        }
        Ok(rows)
    }

    /// Remove temp files older than `older_than` left by interrupted rewrites
    ///
    /// Rewrites in flight are younger than any sensible threshold; with
    /// `Duration::ZERO` only call this while no writer is active.
    pub fn sweep_temp_files(&self, table: &str, older_than: Duration) -> Result<usize> {
        validate_table(table)?;
        self.store.sweep_temp_files(table, older_than)
    }

    // =========================================================================
    // Write Path
    // =========================================================================

    fn write_rows(&self, table: &str, rows: Vec<Row>, mutation: Mutation) -> Result<()> {
        validate_table(table)?;
        for row in &rows {
            validate_row(row)?;
        }

        let groups = mutation::group_rows(rows);
        tracing::debug!(
            table,
            op = mutation.name(),
            partitions = groups.len(),
            "applying batch"
        );

        self.for_each_group(table, groups, |existing, group| {
            mutation.apply(existing, group)
        })
    }

    /// Run `apply` as one locked read-modify-write per partition group
    fn for_each_group<T, F>(
        &self,
        table: &str,
        groups: BTreeMap<String, T>,
        mut apply: F,
    ) -> Result<()>
    where
        F: FnMut(&mut Partition, T) -> Result<()>,
    {
        let partitions = groups.len();
        let mut failures = Vec::new();

        for (partition_key, group) in groups {
            let outcome = {
                let _guard = self.lock.lock(table, &partition_key);
                self.store
                    .read_partition(table, &partition_key, None)
                    .and_then(|existing| {
                        let mut existing = existing.unwrap_or_default();
                        apply(&mut existing, group)?;
                        self.store
                            .write_partition(table, &partition_key, existing.values())
                    })
            };

            if let Err(error) = outcome {
                tracing::warn!(table, partition_key = %partition_key, %error, "partition group failed");
                failures.push(PartitionFailure {
                    partition_key,
                    error,
                });
            }
        }

        match failures.len() {
            0 => Ok(()),
            1 if partitions == 1 => Err(failures.remove(0).error),
            _ => Err(TableError::Batch {
                partitions,
                failures,
            }),
        }
    }

    // =========================================================================
    // Accessors (for testing and debugging)
    // =========================================================================

    /// Get the root directory path
    pub fn root_dir(&self) -> &Path {
        self.store.root_dir()
    }

    /// Get the partition store
    pub fn store(&self) -> &PartitionStore {
        &self.store
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }
}

impl TableStorage for TableEngine {
    fn supports_optimistic_concurrency(&self) -> bool {
        Self::SUPPORTS_OPTIMISTIC_CONCURRENCY
    }

    fn list_table_names(&self) -> Result<Vec<String>> {
        self.store.list_tables()
    }

    fn delete_table(&self, table: &str) -> Result<()> {
        validate_table(table)?;
        self.store.delete_table(table)
    }

    fn get_rows(&self, table: &str, partition_key: &str) -> Result<Vec<Row>> {
        validate_table(table)?;
        validate_key("partition key", partition_key)?;

        Ok(self
            .store
            .read_partition(table, partition_key, None)?
            .map(|partition| partition.into_values().collect())
            .unwrap_or_default())
    }

    fn get_row(&self, table: &str, partition_key: &str, row_key: &str) -> Result<Option<Row>> {
        validate_table(table)?;
        validate_key("partition key", partition_key)?;
        validate_key("row key", row_key)?;

        Ok(self
            .store
            .read_partition(table, partition_key, Some(row_key))?
            .and_then(|mut partition| partition.remove(row_key)))
    }

    fn insert(&self, table: &str, rows: Vec<Row>) -> Result<()> {
        self.write_rows(table, rows, Mutation::Insert)
    }

    fn insert_or_replace(&self, table: &str, rows: Vec<Row>) -> Result<()> {
        self.write_rows(table, rows, Mutation::InsertOrReplace)
    }

    fn merge(&self, table: &str, rows: Vec<Row>) -> Result<()> {
        self.write_rows(table, rows, Mutation::Merge)
    }

    fn delete(&self, table: &str, row_ids: Vec<RowId>) -> Result<()> {
        validate_table(table)?;
        for id in &row_ids {
            validate_key("partition key", &id.partition_key)?;
            validate_key("row key", &id.row_key)?;
        }

        let groups = mutation::group_ids(row_ids);
        tracing::debug!(table, op = "delete", partitions = groups.len(), "applying batch");

        self.for_each_group(table, groups, |existing, row_keys| {
            mutation::delete(existing, row_keys.iter().map(String::as_str));
            Ok(())
        })
    }

    fn update(&self, _table: &str, _rows: Vec<Row>) -> Result<()> {
        Err(TableError::Unsupported(
            "update requires optimistic concurrency, which this engine does not provide",
        ))
    }
}

// =============================================================================
// Validation
// =============================================================================

fn validate_table(table: &str) -> Result<()> {
    validate_key("table name", table)
}

fn validate_key(what: &str, value: &str) -> Result<()> {
    if value.is_empty() {
        return Err(TableError::InvalidArgument(format!("{} must not be empty", what)));
    }
    Ok(())
}

fn validate_row(row: &Row) -> Result<()> {
    validate_key("partition key", row.partition_key())?;
    validate_key("row key", row.row_key())?;

    for name in row.cell_names() {
        if name.is_empty() {
            return Err(TableError::InvalidArgument(format!(
                "row '{}' has a cell with an empty name",
                row.row_key()
            )));
        }
        if name == ROW_KEY_COLUMN {
            return Err(TableError::InvalidArgument(format!(
                "row '{}' has a cell named {}, which is reserved for the row key",
                row.row_key(),
                ROW_KEY_COLUMN
            )));
        }
    }
    Ok(())
}
