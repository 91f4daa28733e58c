//! Storage Module
//!
//! Persistent storage layer: one directory per table, one delimited-text file
//! per partition.
//!
//! ## Responsibilities
//! - Map logical names to safe file-system names
//! - Encode/decode partitions (dynamic column set)
//! - Whole-partition read and atomic rewrite
//!
//! ## On-Disk Layout
//! ```text
//! {root_dir}/
//!   ├── <sanitized table>.table/
//!   │     ├── <sanitized partition key>.partition.csv
//!   │     └── ...
//!   └── ...
//! ```

pub mod codec;
pub mod naming;
mod store;

pub use codec::{Partition, ROW_KEY_COLUMN};
pub use store::PartitionStore;
