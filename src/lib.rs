//! # fstable
//!
//! A partitioned key-row table store kept in delimited-text files:
//! - Partition key + row key addressing
//! - One directory per table, one file per partition
//! - Dynamic per-partition schema (union of all cell names)
//! - Insert / insert-or-replace / merge / delete batches with duplicate-key
//!   detection per partition
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                 TableEngine (TableStorage)                   │
//! │          validation · grouping by partition key              │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │  one read-modify-write per partition
//!          ┌────────────┴────────────┐
//!          │                         │
//!          ▼                         ▼
//!   ┌─────────────┐          ┌─────────────┐
//!   │  Mutations  │          │PartitionLock│
//!   │ (in memory) │          │   (hook)    │
//!   └──────┬──────┘          └─────────────┘
//!          │
//!          ▼
//!   ┌─────────────┐   ┌─────────────┐   ┌─────────────┐
//!   │  Partition  │──▶│    Codec    │   │    Name     │
//!   │    Store    │──▶│ (delimited) │   │  Sanitizer  │
//!   └─────────────┘   └─────────────┘   └─────────────┘
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use fstable::{Config, Row, TableEngine, TableStorage};
//!
//! let engine = TableEngine::open(Config::builder().root_dir("./data").build());
//! engine.insert("Orders", vec![Row::new("eu", "1").with("Total", 12.5)])?;
//! let rows = engine.get_rows("Orders", "eu")?;
//! assert_eq!(rows[0].text("Total").as_deref(), Some("12.5"));
//! # Ok::<(), fstable::TableError>(())
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod row;
pub mod storage;
pub mod mutation;
pub mod lock;
pub mod engine;

#[cfg(feature = "tokio")]
pub mod async_engine;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{PartitionFailure, Result, TableError};
pub use config::Config;
pub use row::{CellKind, CellValue, Row, RowId};
pub use lock::{LocalPartitionLock, NoPartitionLock, PartitionGuard, PartitionLock};
pub use engine::{TableEngine, TableStorage};

#[cfg(feature = "tokio")]
pub use async_engine::AsyncTableEngine;

// =============================================================================
// Version Info
// =============================================================================

/// Current version of fstable
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
