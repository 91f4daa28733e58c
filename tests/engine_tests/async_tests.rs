//! Async Facade Tests
//!
//! Runs only with `--features tokio`.

use std::sync::Arc;

use fstable::{
    AsyncTableEngine, Config, LocalPartitionLock, Row, RowId, TableEngine, TableError,
};
use tempfile::TempDir;

fn setup_async_engine() -> (TempDir, AsyncTableEngine) {
    let temp_dir = TempDir::new().unwrap();
    let config = Config::builder()
        .root_dir(temp_dir.path())
        .sync_writes(false)
        .build();
    let engine = TableEngine::with_lock(config, Arc::new(LocalPartitionLock::new()));
    (temp_dir, AsyncTableEngine::new(engine))
}

#[tokio::test]
async fn test_async_insert_get_delete() {
    let (_temp, engine) = setup_async_engine();

    engine
        .insert("Orders", vec![Row::new("eu", "1").with("Qty", 3)])
        .await
        .unwrap();

    let row = engine.get_row("Orders", "eu", "1").await.unwrap().unwrap();
    assert_eq!(row.text("Qty").as_deref(), Some("3"));
    assert_eq!(engine.list_table_names().await.unwrap(), vec!["Orders"]);
    assert_eq!(engine.list_partitions("Orders").await.unwrap(), vec!["eu"]);

    engine
        .delete("Orders", vec![RowId::new("eu", "1")])
        .await
        .unwrap();
    assert!(engine.get_rows("Orders", "eu").await.unwrap().is_empty());

    engine.delete_table("Orders").await.unwrap();
    assert!(engine.list_table_names().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_async_errors_pass_through() {
    let (_temp, engine) = setup_async_engine();
    engine.insert("T", vec![Row::new("p", "a")]).await.unwrap();

    let dup = engine.insert("T", vec![Row::new("p", "a")]).await.unwrap_err();
    assert!(matches!(dup, TableError::DuplicateKey { .. }));

    let unsupported = engine.update("T", vec![Row::new("p", "a")]).await.unwrap_err();
    assert!(unsupported.is_unsupported());
    assert!(!engine.supports_optimistic_concurrency());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_async_concurrent_merges_with_lock() {
    let (_temp, engine) = setup_async_engine();

    let tasks: Vec<_> = (0..16)
        .map(|i| {
            let engine = engine.clone();
            tokio::spawn(async move {
                engine
                    .merge("T", vec![Row::new("p", format!("r{}", i)).with("I", i)])
                    .await
            })
        })
        .collect();

    for task in tasks {
        task.await.unwrap().unwrap();
    }

    let rows = engine.get_all_rows("T").await.unwrap();
    assert_eq!(rows.len(), 16);

    engine
        .insert_or_replace("T", vec![Row::new("p", "r0").with("I", "replaced")])
        .await
        .unwrap();
    let row = engine.get_row("T", "p", "r0").await.unwrap().unwrap();
    assert_eq!(row.text("I").as_deref(), Some("replaced"));
}
