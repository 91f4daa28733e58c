//! Configuration for fstable
//!
//! Centralized configuration with sensible defaults.

use std::path::PathBuf;

/// Main configuration for a table store instance
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Storage Configuration
    // -------------------------------------------------------------------------
    /// Root directory holding every table
    /// Internal structure:
    ///   {root_dir}/
    ///     ├── Orders.table/                 (one directory per table)
    ///     │     ├── eu.partition.csv        (one file per partition)
    ///     │     └── us.partition.csv
    ///     └── Customers.table/
    pub root_dir: PathBuf,

    // -------------------------------------------------------------------------
    // Durability Configuration
    // -------------------------------------------------------------------------
    /// fsync each rewritten partition before it replaces the old file
    pub sync_writes: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            root_dir: PathBuf::from("./fstable_data"),
            sync_writes: true,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the root directory (parent of all table directories)
    pub fn root_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.root_dir = path.into();
        self
    }

    /// Enable or disable fsync on every partition rewrite
    pub fn sync_writes(mut self, enabled: bool) -> Self {
        self.config.sync_writes = enabled;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
