//! Row Model
//!
//! Rows, row identities and typed cell values.
//!
//! ## Cell typing
//! A cell carries a scalar kind only until it is written. Persistence stores
//! the canonical text form, so every re-read cell is `CellValue::Text`.
//! `Row::to_canonical()` produces exactly the row a re-read would yield.
//!
//! Rows serialize with serde (the CLI prints them as JSON lines); a cell
//! serializes as `{"kind": ..., "value": ...}`.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// Scalar kind of a cell value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellKind {
    Text,
    Number,
    Boolean,
    Date,
}

/// A single cell value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum CellValue {
    Text(String),
    Number(f64),
    Boolean(bool),
    Date(DateTime<Utc>),
}

impl CellValue {
    /// The scalar kind of this value
    pub fn kind(&self) -> CellKind {
        match self {
            CellValue::Text(_) => CellKind::Text,
            CellValue::Number(_) => CellKind::Number,
            CellValue::Boolean(_) => CellKind::Boolean,
            CellValue::Date(_) => CellKind::Date,
        }
    }

    /// Canonical text form, the representation that gets persisted
    ///
    /// - Number: Rust float display (`42.0` → `"42"`, `0.5` → `"0.5"`)
    /// - Boolean: `"true"` / `"false"`
    /// - Date: RFC 3339 in UTC with a `Z` suffix
    pub fn to_canonical(&self) -> String {
        match self {
            CellValue::Text(s) => s.clone(),
            CellValue::Number(n) => n.to_string(),
            CellValue::Boolean(b) => b.to_string(),
            CellValue::Date(d) => d.to_rfc3339_opts(SecondsFormat::AutoSi, true),
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_canonical())
    }
}

impl From<String> for CellValue {
    fn from(value: String) -> Self {
        CellValue::Text(value)
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        CellValue::Text(value.to_string())
    }
}

impl From<f64> for CellValue {
    fn from(value: f64) -> Self {
        CellValue::Number(value)
    }
}

impl From<i32> for CellValue {
    fn from(value: i32) -> Self {
        CellValue::Number(value as f64)
    }
}

impl From<bool> for CellValue {
    fn from(value: bool) -> Self {
        CellValue::Boolean(value)
    }
}

impl From<DateTime<Utc>> for CellValue {
    fn from(value: DateTime<Utc>) -> Self {
        CellValue::Date(value)
    }
}

// =============================================================================
// Row Identity
// =============================================================================

/// (partition key, row key) pair identifying a row
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RowId {
    pub partition_key: String,
    pub row_key: String,
}

impl RowId {
    pub fn new(partition_key: impl Into<String>, row_key: impl Into<String>) -> Self {
        Self {
            partition_key: partition_key.into(),
            row_key: row_key.into(),
        }
    }
}

// =============================================================================
// Row
// =============================================================================

/// A row: named cells addressed by (partition key, row key)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Row {
    partition_key: String,
    row_key: String,
    cells: BTreeMap<String, CellValue>,
}

impl Row {
    /// Create a row with no cells
    pub fn new(partition_key: impl Into<String>, row_key: impl Into<String>) -> Self {
        Self {
            partition_key: partition_key.into(),
            row_key: row_key.into(),
            cells: BTreeMap::new(),
        }
    }

    /// Builder-style cell setter
    pub fn with(mut self, name: impl Into<String>, value: impl Into<CellValue>) -> Self {
        self.set(name, value);
        self
    }

    /// Set a cell, returning the previous value
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<CellValue>) -> Option<CellValue> {
        self.cells.insert(name.into(), value.into())
    }

    pub fn get(&self, name: &str) -> Option<&CellValue> {
        self.cells.get(name)
    }

    /// Text of a cell in its persisted (canonical) form
    pub fn text(&self, name: &str) -> Option<String> {
        self.cells.get(name).map(CellValue::to_canonical)
    }

    pub fn partition_key(&self) -> &str {
        &self.partition_key
    }

    pub fn row_key(&self) -> &str {
        &self.row_key
    }

    pub fn id(&self) -> RowId {
        RowId::new(self.partition_key.clone(), self.row_key.clone())
    }

    /// Cells in lexical name order
    pub fn cells(&self) -> &BTreeMap<String, CellValue> {
        &self.cells
    }

    pub fn cell_names(&self) -> impl Iterator<Item = &str> {
        self.cells.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// The row as it reads back after persistence: text cells only,
    /// empty cells dropped
    pub fn to_canonical(&self) -> Row {
        let cells = self
            .cells
            .iter()
            .map(|(name, value)| (name.clone(), value.to_canonical()))
            .filter(|(_, text)| !text.is_empty())
            .map(|(name, text)| (name, CellValue::Text(text)))
            .collect();

        Row {
            partition_key: self.partition_key.clone(),
            row_key: self.row_key.clone(),
            cells,
        }
    }

    /// Overlay the cells of `other` onto this row; cells `other` does not
    /// name are left untouched
    pub(crate) fn overlay(&mut self, other: Row) {
        self.cells.extend(other.cells);
    }
}
