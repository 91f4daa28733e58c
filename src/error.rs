//! Error types for fstable
//!
//! Provides a unified error type for all operations.
//!
//! "Not found" is never an error here: missing tables, partitions and rows
//! come back as empty sequences or `None`.

use thiserror::Error;

/// Result type alias using TableError
pub type Result<T> = std::result::Result<T, TableError>;

/// Unified error type for fstable operations
#[derive(Debug, Error)]
pub enum TableError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Request Errors (raised before any I/O)
    // -------------------------------------------------------------------------
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Duplicate key: row '{row_key}' in partition '{partition_key}'")]
    DuplicateKey {
        partition_key: String,
        row_key: String,
    },

    #[error("Unsupported operation: {0}")]
    Unsupported(&'static str),

    // -------------------------------------------------------------------------
    // Partition File Errors
    // -------------------------------------------------------------------------
    #[error("Format error: {0}")]
    Format(String),

    // -------------------------------------------------------------------------
    // Batch Errors
    // -------------------------------------------------------------------------
    /// Some partition groups of a multi-partition call failed.
    /// Groups not listed here were committed.
    #[error("{} of {partitions} partition(s) failed: {}", .failures.len(), summarize(.failures))]
    Batch {
        partitions: usize,
        failures: Vec<PartitionFailure>,
    },

    // -------------------------------------------------------------------------
    // Async Facade Errors
    // -------------------------------------------------------------------------
    #[error("Background task failed: {0}")]
    Task(String),
}

/// A failed partition group inside a batch call
#[derive(Debug)]
pub struct PartitionFailure {
    pub partition_key: String,
    pub error: TableError,
}

impl TableError {
    /// True for a duplicate key, including inside a batch failure
    pub fn is_duplicate_key(&self) -> bool {
        self.any(|e| matches!(e, TableError::DuplicateKey { .. }))
    }

    /// True when the operation is not offered by this engine
    pub fn is_unsupported(&self) -> bool {
        self.any(|e| matches!(e, TableError::Unsupported(_)))
    }

    pub fn is_invalid_argument(&self) -> bool {
        self.any(|e| matches!(e, TableError::InvalidArgument(_)))
    }

    pub fn is_format(&self) -> bool {
        self.any(|e| matches!(e, TableError::Format(_)))
    }

    fn any(&self, pred: impl Fn(&TableError) -> bool + Copy) -> bool {
        match self {
            TableError::Batch { failures, .. } => failures.iter().any(|f| f.error.any(pred)),
            other => pred(other),
        }
    }
}

fn summarize(failures: &[PartitionFailure]) -> String {
    failures
        .iter()
        .map(|f| format!("[{}] {}", f.partition_key, f.error))
        .collect::<Vec<_>>()
        .join("; ")
}
