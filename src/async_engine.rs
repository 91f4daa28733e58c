//! Async Facade
//!
//! Exposes the table engine through async operations for callers running on
//! a tokio runtime. Each operation runs the synchronous engine call on
//! `spawn_blocking`, so the caller only suspends around file I/O.

use std::sync::Arc;

use tokio::task;

use crate::engine::{TableEngine, TableStorage};
use crate::error::{Result, TableError};
use crate::row::{Row, RowId};

/// Async wrapper around a shared `TableEngine`
#[derive(Clone)]
pub struct AsyncTableEngine {
    inner: Arc<TableEngine>,
}

impl AsyncTableEngine {
    pub fn new(engine: TableEngine) -> Self {
        Self::from_shared(Arc::new(engine))
    }

    pub fn from_shared(engine: Arc<TableEngine>) -> Self {
        Self { inner: engine }
    }

    /// The wrapped engine
    pub fn engine(&self) -> &Arc<TableEngine> {
        &self.inner
    }

    pub fn supports_optimistic_concurrency(&self) -> bool {
        TableEngine::SUPPORTS_OPTIMISTIC_CONCURRENCY
    }

    pub async fn list_table_names(&self) -> Result<Vec<String>> {
        self.run(|engine| engine.list_table_names()).await
    }

    pub async fn delete_table(&self, table: impl Into<String>) -> Result<()> {
        let table = table.into();
        self.run(move |engine| engine.delete_table(&table)).await
    }

    pub async fn get_rows(
        &self,
        table: impl Into<String>,
        partition_key: impl Into<String>,
    ) -> Result<Vec<Row>> {
        let (table, partition_key) = (table.into(), partition_key.into());
        self.run(move |engine| engine.get_rows(&table, &partition_key))
            .await
    }

    pub async fn get_row(
        &self,
        table: impl Into<String>,
        partition_key: impl Into<String>,
        row_key: impl Into<String>,
    ) -> Result<Option<Row>> {
        let (table, partition_key, row_key) = (table.into(), partition_key.into(), row_key.into());
        self.run(move |engine| engine.get_row(&table, &partition_key, &row_key))
            .await
    }

    pub async fn list_partitions(&self, table: impl Into<String>) -> Result<Vec<String>> {
        let table = table.into();
        self.run(move |engine| engine.list_partitions(&table)).await
    }

    pub async fn get_all_rows(&self, table: impl Into<String>) -> Result<Vec<Row>> {
        let table = table.into();
        self.run(move |engine| engine.get_all_rows(&table)).await
    }

    pub async fn insert(&self, table: impl Into<String>, rows: Vec<Row>) -> Result<()> {
        let table = table.into();
        self.run(move |engine| engine.insert(&table, rows)).await
    }

    pub async fn insert_or_replace(&self, table: impl Into<String>, rows: Vec<Row>) -> Result<()> {
        let table = table.into();
        self.run(move |engine| engine.insert_or_replace(&table, rows))
            .await
    }

    pub async fn merge(&self, table: impl Into<String>, rows: Vec<Row>) -> Result<()> {
        let table = table.into();
        self.run(move |engine| engine.merge(&table, rows)).await
    }

    pub async fn delete(&self, table: impl Into<String>, row_ids: Vec<RowId>) -> Result<()> {
        let table = table.into();
        self.run(move |engine| engine.delete(&table, row_ids)).await
    }

    /// Always fails with `Unsupported`, without leaving the calling task
    pub async fn update(&self, table: impl Into<String>, rows: Vec<Row>) -> Result<()> {
        self.inner.update(&table.into(), rows)
    }

    async fn run<T, F>(&self, op: F) -> Result<T>
    where
        F: FnOnce(&TableEngine) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let engine = Arc::clone(&self.inner);
        task::spawn_blocking(move || op(&engine))
            .await
            .map_err(|e| TableError::Task(e.to_string()))?
    }
}
