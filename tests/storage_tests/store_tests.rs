//! Tests for PartitionStore
//!
//! These tests verify:
//! - On-disk layout (table directories, partition files)
//! - Absent tables/partitions read as `None`
//! - Full rewrites and empty-partition removal
//! - Table and partition enumeration
//! - Table deletion

use std::fs;
use std::path::PathBuf;

use fstable::storage::{naming, PartitionStore};
use fstable::{Config, Row};
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn setup_temp_store() -> (TempDir, PartitionStore) {
    let temp_dir = TempDir::new().unwrap();
    let config = Config::builder().root_dir(temp_dir.path()).build();
    (temp_dir, PartitionStore::new(&config))
}

fn rows(partition_key: &str, keys: &[&str]) -> Vec<Row> {
    keys.iter()
        .map(|k| Row::new(partition_key, *k).with("V", format!("value-{}", k)))
        .collect()
}

// =============================================================================
// Layout Tests
// =============================================================================

#[test]
fn test_write_creates_table_dir_and_partition_file() {
    let (temp, store) = setup_temp_store();

    store.write_partition("Orders", "eu", &rows("eu", &["1"])).unwrap();

    let expected: PathBuf = temp.path().join("Orders.table").join("eu.partition.csv");
    assert!(expected.is_file());
    assert_eq!(store.partition_path("Orders", "eu"), expected);
    assert_eq!(fs::read_to_string(expected).unwrap(), "RowKey,V\n1,value-1\n");
}

#[test]
fn test_root_dir_created_lazily() {
    let temp = TempDir::new().unwrap();
    let root = temp.path().join("nested").join("root");
    let store = PartitionStore::new(&Config::builder().root_dir(&root).build());

    assert!(store.list_tables().unwrap().is_empty());
    assert!(!root.exists());

    store.write_partition("T", "p", &rows("p", &["1"])).unwrap();
    assert!(root.join("T.table").is_dir());
}

#[test]
fn test_sanitized_names_on_disk() {
    let (temp, store) = setup_temp_store();

    store
        .write_partition("a/b", "x y", &rows("x y", &["1"]))
        .unwrap();

    assert!(temp
        .path()
        .join("a%2Fb.table")
        .join("x%20y.partition.csv")
        .is_file());
    assert_eq!(store.list_tables().unwrap(), vec!["a/b"]);
    assert_eq!(store.list_partitions("a/b").unwrap(), vec!["x y"]);
}

// =============================================================================
// Read Tests
// =============================================================================

#[test]
fn test_read_absent_table_and_partition() {
    let (_temp, store) = setup_temp_store();

    assert!(store.read_partition("Nope", "p", None).unwrap().is_none());

    store.write_partition("T", "p", &rows("p", &["1"])).unwrap();
    assert!(store.read_partition("T", "other", None).unwrap().is_none());
}

#[test]
fn test_read_with_stop_row_key() {
    let (_temp, store) = setup_temp_store();
    store
        .write_partition("T", "p", &rows("p", &["a", "b", "c"]))
        .unwrap();

    let partial = store.read_partition("T", "p", Some("b")).unwrap().unwrap();

    assert!(partial.contains_key("b"));
    assert!(!partial.contains_key("c"));
}

#[test]
fn test_read_malformed_file_is_format_error() {
    let (_temp, store) = setup_temp_store();
    store.write_partition("T", "p", &rows("p", &["1"])).unwrap();

    fs::write(store.partition_path("T", "p"), "RowKey,V\n1,a,b\n").unwrap();

    let err = store.read_partition("T", "p", None).unwrap_err();
    assert!(err.is_format());
}

// =============================================================================
// Rewrite Tests
// =============================================================================

#[test]
fn test_rewrite_replaces_whole_file_and_shrinks_schema() {
    let (_temp, store) = setup_temp_store();
    let wide = vec![
        Row::new("p", "1").with("A", "x").with("B", "y"),
        Row::new("p", "2").with("C", "z"),
    ];
    store.write_partition("T", "p", &wide).unwrap();

    let narrow = vec![Row::new("p", "1").with("A", "x")];
    store.write_partition("T", "p", &narrow).unwrap();

    let content = fs::read_to_string(store.partition_path("T", "p")).unwrap();
    assert_eq!(content, "RowKey,A\n1,x\n");
}

#[test]
fn test_rewrite_leaves_no_temp_files() {
    let (_temp, store) = setup_temp_store();
    store.write_partition("T", "p", &rows("p", &["1"])).unwrap();
    store.write_partition("T", "p", &rows("p", &["1", "2"])).unwrap();

    let names: Vec<String> = fs::read_dir(store.table_dir("T"))
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec!["p.partition.csv"]);
}

#[test]
fn test_writing_no_rows_removes_partition_file() {
    let (_temp, store) = setup_temp_store();
    store.write_partition("T", "p", &rows("p", &["1"])).unwrap();

    store.write_partition("T", "p", &Vec::<Row>::new()).unwrap();

    assert!(!store.partition_path("T", "p").exists());
    assert!(store.read_partition("T", "p", None).unwrap().is_none());
    assert!(store.table_dir("T").is_dir());
    assert!(store.list_partitions("T").unwrap().is_empty());

    // Removing an already absent partition is fine and creates nothing
    store.write_partition("Fresh", "p", &Vec::<Row>::new()).unwrap();
    assert!(!store.table_dir("Fresh").exists());
}

// =============================================================================
// Enumeration and Deletion Tests
// =============================================================================

#[test]
fn test_list_tables_ignores_foreign_entries() {
    let (temp, store) = setup_temp_store();
    store.write_partition("B", "p", &rows("p", &["1"])).unwrap();
    store.write_partition("A", "p", &rows("p", &["1"])).unwrap();

    fs::create_dir(temp.path().join("not-a-table")).unwrap();
    fs::write(temp.path().join("file.table"), "").unwrap();
    fs::create_dir(temp.path().join("bad name.table")).unwrap();

    assert_eq!(store.list_tables().unwrap(), vec!["A", "B"]);
}

#[test]
fn test_list_partitions_sorted() {
    let (_temp, store) = setup_temp_store();
    for key in ["zulu", "alpha", "mike"] {
        store.write_partition("T", key, &rows(key, &["1"])).unwrap();
    }
    fs::write(store.table_dir("T").join("notes.txt"), "x").unwrap();

    assert_eq!(
        store.list_partitions("T").unwrap(),
        vec!["alpha", "mike", "zulu"]
    );
    assert!(store.list_partitions("Missing").unwrap().is_empty());
}

#[test]
fn test_delete_table_is_recursive_and_idempotent() {
    let (_temp, store) = setup_temp_store();
    store.write_partition("T", "p1", &rows("p1", &["1"])).unwrap();
    store.write_partition("T", "p2", &rows("p2", &["1"])).unwrap();

    store.delete_table("T").unwrap();
    assert!(!store.table_dir("T").exists());
    assert!(store.list_tables().unwrap().is_empty());

    store.delete_table("T").unwrap();
}

#[test]
fn test_long_partition_key_keeps_name_file() {
    let (_temp, store) = setup_temp_store();
    let key = "東".repeat(40);
    store.write_partition("T", &key, &rows(&key, &["1"])).unwrap();

    let name_file = store.table_dir("T").join(naming::partition_name_file(&key));
    assert_eq!(fs::read_to_string(&name_file).unwrap(), key);
    assert_eq!(store.list_partitions("T").unwrap(), vec![key.clone()]);

    store.write_partition("T", &key, &Vec::<Row>::new()).unwrap();
    assert!(!name_file.exists());
    assert!(store.list_partitions("T").unwrap().is_empty());
}

#[test]
fn test_digest_entry_without_name_file_is_skipped() {
    let (_temp, store) = setup_temp_store();
    let key = "東".repeat(40);
    store.write_partition("T", &key, &rows(&key, &["1"])).unwrap();
    store.write_partition("T", "plain", &rows("plain", &["1"])).unwrap();

    fs::remove_file(store.table_dir("T").join(naming::partition_name_file(&key))).unwrap();

    assert_eq!(store.list_partitions("T").unwrap(), vec!["plain"]);
    // The data itself is still addressable by its logical key
    assert_eq!(store.read_partition("T", &key, None).unwrap().unwrap().len(), 1);
}
