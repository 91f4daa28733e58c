//! Partition Store
//!
//! Owns the on-disk layout and performs whole-partition reads and rewrites.
//!
//! ## Responsibilities
//! - Resolve table directories and partition files via the name sanitizer
//! - Read a partition file through the codec
//! - Rewrite a partition atomically (temp file + rename)
//! - Enumerate tables and partitions, delete tables
//! - Keep name files for tables and partitions stored under digest stems
//! - Sweep temp files left behind by interrupted rewrites

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, SystemTime};

use crate::config::Config;
use crate::error::Result;
use crate::row::Row;

use super::codec::{self, Partition};
use super::naming::{self, EntryName};

/// Filesystem-backed partition storage
///
/// ## Concurrency:
/// - Holds no mutable state; every method takes `&self`
/// - A rewrite replaces the partition file with a single rename, so readers
///   see either the old or the new image, never a partial one
/// - Concurrent rewrites of the same partition race (last rename wins);
///   callers serialize them with a `PartitionLock`
pub struct PartitionStore {
    /// Directory holding all table directories
    root_dir: PathBuf,

    /// fsync temp files before renaming them into place
    sync_writes: bool,
}

impl PartitionStore {
    /// Create a store rooted at `config.root_dir`
    ///
    /// The root directory is created lazily on first write.
    pub fn new(config: &Config) -> Self {
        Self {
            root_dir: config.root_dir.clone(),
            sync_writes: config.sync_writes,
        }
    }

    /// Read a partition
    ///
    /// Returns:
    /// - `Ok(None)`: table directory or partition file does not exist
    /// - `Ok(Some(rows))`: decoded partition
    pub fn read_partition(
        &self,
        table: &str,
        partition_key: &str,
        stop_at_row_key: Option<&str>,
    ) -> Result<Option<Partition>> {
        let path = self.partition_path(table, partition_key);

        let data = match fs::read(&path) {
            Ok(data) => data,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::trace!(table, partition_key, "partition absent");
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };

        let partition = codec::decode(&data, partition_key, stop_at_row_key)?;
        tracing::debug!(
            table,
            partition_key,
            bytes = data.len(),
            rows = partition.as_ref().map_or(0, |p| p.len()),
            "read partition"
        );
        Ok(partition)
    }

    /// Persist the full final state of a partition
    ///
    /// Zero rows removes the partition file instead of writing one.
    pub fn write_partition<'a, I>(&self, table: &str, partition_key: &str, rows: I) -> Result<()>
    where
        I: IntoIterator<Item = &'a Row>,
    {
        let rows: Vec<&Row> = rows.into_iter().collect();
        let path = self.partition_path(table, partition_key);

        if rows.is_empty() {
            return self.remove_partition_file(table, partition_key, &path);
        }

        self.ensure_table_dir(table)?;
        if naming::is_digest_stem(&naming::stem(partition_key)) {
            let name_path = self
                .table_dir(table)
                .join(naming::partition_name_file(partition_key));
            self.ensure_name_file(&name_path, partition_key)?;
        }

        let image = codec::encode(rows.iter().copied());
        self.replace_file(&path, &image)?;

        tracing::debug!(
            table,
            partition_key,
            rows = rows.len(),
            bytes = image.len(),
            "rewrote partition"
        );
        Ok(())
    }

    /// Remove a table directory and everything in it (no-op if absent)
    pub fn delete_table(&self, table: &str) -> Result<()> {
        let dir = self.table_dir(table);
        match fs::remove_dir_all(&dir) {
            Ok(()) => {
                tracing::info!(table, "deleted table");
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Logical names of all tables, sorted
    pub fn list_tables(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();

        for path in list_dir(&self.root_dir)? {
            if !path.is_dir() {
                continue;
            }
            match naming::parse_table_dir_name(&path) {
                Some(EntryName::Logical(name)) => names.push(name),
                Some(EntryName::Digest(_)) => {
                    let name_path = path.join(naming::TABLE_NAME_FILE);
                    if let Some(name) = read_name_file(&name_path, &path, naming::table_dir_name)? {
                        names.push(name);
                    }
                }
                None if path.to_string_lossy().ends_with(naming::TABLE_SUFFIX) => {
                    tracing::warn!(path = %path.display(), "skipping undecodable table directory");
                }
                None => {}
            }
        }

        names.sort();
        Ok(names)
    }

    /// Logical partition keys of a table, sorted (empty if the table is absent)
    pub fn list_partitions(&self, table: &str) -> Result<Vec<String>> {
        let mut keys = Vec::new();

        for path in list_dir(&self.table_dir(table))? {
            if !path.is_file() {
                continue;
            }
            match naming::parse_partition_file_name(&path) {
                Some(EntryName::Logical(key)) => keys.push(key),
                Some(EntryName::Digest(stem)) => {
                    let name_path = path.with_file_name(format!("{}{}", stem, naming::NAME_SUFFIX));
                    if let Some(key) = read_name_file(&name_path, &path, naming::partition_file_name)? {
                        keys.push(key);
                    }
                }
                None if path.to_string_lossy().ends_with(naming::PARTITION_SUFFIX) => {
                    tracing::warn!(path = %path.display(), "skipping undecodable partition file");
                }
                None => {}
            }
        }

        keys.sort();
        Ok(keys)
    }

    /// Remove temp files in a table directory older than `older_than`
    ///
    /// A crash between writing a temp file and renaming it leaves the temp
    /// file behind. Returns the number of files removed.
    pub fn sweep_temp_files(&self, table: &str, older_than: Duration) -> Result<usize> {
        let now = SystemTime::now();
        let mut removed = 0;

        for path in list_dir(&self.table_dir(table))? {
            if !path.is_file() || !path.to_string_lossy().ends_with(naming::TEMP_SUFFIX) {
                continue;
            }
            let modified = match fs::metadata(&path).and_then(|m| m.modified()) {
                Ok(modified) => modified,
                Err(e) if e.kind() == io::ErrorKind::NotFound => continue,
                Err(e) => return Err(e.into()),
            };
            let age = now.duration_since(modified).unwrap_or(Duration::ZERO);
            if age < older_than {
                continue;
            }
            match fs::remove_file(&path) {
                Ok(()) => removed += 1,
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }

        if removed > 0 {
            tracing::info!(table, removed, "swept stale temp files");
        }
        Ok(removed)
    }

    /// Get the root directory path
    pub fn root_dir(&self) -> &Path {
        &self.root_dir
    }

    /// Directory of a table
    pub fn table_dir(&self, table: &str) -> PathBuf {
        self.root_dir.join(naming::table_dir_name(table))
    }

    /// File of a partition
    pub fn partition_path(&self, table: &str, partition_key: &str) -> PathBuf {
        self.table_dir(table)
            .join(naming::partition_file_name(partition_key))
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    fn ensure_table_dir(&self, table: &str) -> Result<()> {
        let dir = self.table_dir(table);
        if !dir.is_dir() {
            fs::create_dir_all(&dir)?;
            tracing::info!(table, path = %dir.display(), "created table");
        }
        if naming::is_digest_stem(&naming::stem(table)) {
            self.ensure_name_file(&dir.join(naming::TABLE_NAME_FILE), table)?;
        }
        Ok(())
    }

    fn ensure_name_file(&self, path: &Path, name: &str) -> Result<()> {
        if path.is_file() {
            return Ok(());
        }
        self.replace_file(path, name.as_bytes())
    }

    /// Write `data` to a temp file, then rename it over `path`
    fn replace_file(&self, path: &Path, data: &[u8]) -> Result<()> {
        let tmp_path = temp_path(path);
        let written = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&tmp_path)
            .and_then(|mut file| {
                file.write_all(data)?;
                if self.sync_writes {
                    file.sync_all()?;
                }
                Ok(())
            })
            .and_then(|()| fs::rename(&tmp_path, path));

        if let Err(e) = written {
            let _ = fs::remove_file(&tmp_path);
            return Err(e.into());
        }
        Ok(())
    }

    fn remove_partition_file(&self, table: &str, partition_key: &str, path: &Path) -> Result<()> {
        match fs::remove_file(path) {
            Ok(()) => tracing::debug!(table, partition_key, "removed empty partition"),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }

        if naming::is_digest_stem(&naming::stem(partition_key)) {
            let name_path = self
                .table_dir(table)
                .join(naming::partition_name_file(partition_key));
            match fs::remove_file(name_path) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }
}

/// Logical name stored for a digest-named entry
///
/// Skips (with a warning) entries whose name file is missing or names
/// something that would not be stored at `entry`.
fn read_name_file(
    name_path: &Path,
    entry: &Path,
    physical_name: fn(&str) -> String,
) -> Result<Option<String>> {
    let name = match fs::read_to_string(name_path) {
        Ok(name) => name,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            tracing::warn!(path = %entry.display(), "skipping digest entry without a name file");
            return Ok(None);
        }
        Err(e) if e.kind() == io::ErrorKind::InvalidData => {
            tracing::warn!(path = %name_path.display(), "skipping non-UTF-8 name file");
            return Ok(None);
        }
        Err(e) => return Err(e.into()),
    };

    let matches = entry
        .file_name()
        .and_then(|f| f.to_str())
        .is_some_and(|f| f == physical_name(&name));
    if !matches {
        tracing::warn!(path = %name_path.display(), "skipping name file that does not match its entry");
        return Ok(None);
    }
    Ok(Some(name))
}

/// Sequence for temp file names (atomic, lock-free)
static NEXT_TEMP_ID: AtomicU64 = AtomicU64::new(1);

/// "eu.partition.csv" → "eu.partition.csv.<pid>-<seq>.tmp"
///
/// Unique per write, so racing writers never share a temp file.
fn temp_path(path: &Path) -> PathBuf {
    let seq = NEXT_TEMP_ID.fetch_add(1, Ordering::Relaxed);
    let mut name = path.as_os_str().to_os_string();
    name.push(format!(".{}-{}{}", std::process::id(), seq, naming::TEMP_SUFFIX));
    PathBuf::from(name)
}

/// Entries of a directory; empty if it does not exist
fn list_dir(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };

    let mut paths = Vec::new();
    for entry in entries {
        paths.push(entry?.path());
    }
    Ok(paths)
}
