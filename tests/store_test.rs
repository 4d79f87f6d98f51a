mod common;

use pvd_search::error::SearchError;
use pvd_search::loader::{DataSource, load_table, load_tables};
use pvd_search::saving::{is_fresh, load_snapshot, save_snapshot};
use pvd_search::store::TableStore;
use std::fs;
use std::sync::Arc;
use std::thread;
use tempfile::tempdir;

fn csv_source(dir: &std::path::Path) -> DataSource {
    let (records, grades) = common::write_csv_pair(dir);
    DataSource::Csv { records, grades }
}

#[test]
fn test_load_csv_pair() {
    let dir = tempdir().unwrap();
    let tables = load_tables(&csv_source(dir.path())).unwrap();

    assert_eq!(tables, common::tables());
    println!("✓ CSV pair loads into the expected tables");
}

#[test]
fn test_load_workbook() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("pvd.xlsx");
    common::write_workbook(&path);

    let tables = load_tables(&DataSource::workbook(&path)).unwrap();
    assert_eq!(tables.records.columns(), common::records().columns());
    assert_eq!(tables.records, common::records());
    assert_eq!(tables.grades, common::grades());
    println!("✓ Workbook sheets 'raw' and '참조표2' load through calamine");
}

#[test]
fn test_missing_sheet_is_unavailable() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("pvd.xlsx");
    common::write_workbook(&path);

    let err = load_table(&path, "없는시트").unwrap_err();
    assert!(matches!(err, SearchError::DataUnavailable { .. }));
    assert!(err.is_fatal());
}

#[test]
fn test_missing_file_is_unavailable() {
    let dir = tempdir().unwrap();
    let store = TableStore::new(DataSource::workbook(dir.path().join("missing.xlsx")));

    assert!(matches!(
        store.load(),
        Err(SearchError::DataUnavailable { .. })
    ));
    assert!(!store.is_loaded());
    assert_eq!(store.load_count(), 0);
}

#[test]
fn test_unsupported_extension() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("data.json");
    fs::write(&path, "{}").unwrap();

    assert!(matches!(
        load_table(&path, "raw"),
        Err(SearchError::DataUnavailable { .. })
    ));
}

#[test]
fn test_load_is_memoized() {
    let dir = tempdir().unwrap();
    let store = TableStore::new(csv_source(dir.path()));

    let first = store.load().unwrap();
    let second = store.load().unwrap();
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(store.load_count(), 1);

    // removing the source after the first load changes nothing
    fs::remove_dir_all(dir.path()).unwrap();
    let third = store.load().unwrap();
    assert!(Arc::ptr_eq(&first, &third));
    assert_eq!(store.load_count(), 1);
}

#[test]
fn test_failed_load_is_retried() {
    let dir = tempdir().unwrap();
    let records = dir.path().join("raw.csv");
    let grades = dir.path().join("grades.csv");
    let store = TableStore::new(DataSource::Csv {
        records: records.clone(),
        grades: grades.clone(),
    });

    assert!(store.load().is_err());

    common::write_csv_pair(dir.path());
    assert!(store.load().is_ok());
    assert_eq!(store.load_count(), 1);
}

#[test]
fn test_concurrent_first_load_reads_once() {
    let dir = tempdir().unwrap();
    let store = Arc::new(TableStore::new(csv_source(dir.path())));

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let store = Arc::clone(&store);
            thread::spawn(move || store.load().unwrap())
        })
        .collect();
    let loaded: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    assert_eq!(store.load_count(), 1);
    for tables in &loaded {
        assert!(Arc::ptr_eq(tables, &loaded[0]));
    }
}

#[test]
fn test_preloaded_store() {
    let store = TableStore::preloaded(common::tables());
    assert!(store.is_loaded());
    assert_eq!(store.load().unwrap().records.len(), 4);
    assert_eq!(store.load_count(), 0);
}

#[test]
fn test_snapshot_round_trip_and_freshness() {
    let dir = tempdir().unwrap();
    let source = csv_source(dir.path());
    let snapshot = dir.path().join("tables.bin.gz");

    assert!(!is_fresh(&snapshot, &source.paths()));

    save_snapshot(&common::tables(), &snapshot).unwrap();
    assert!(is_fresh(&snapshot, &source.paths()));
    assert_eq!(load_snapshot(&snapshot).unwrap(), common::tables());

    // a source that cannot be read makes the snapshot stale
    assert!(!is_fresh(&snapshot, &[dir.path().join("gone.csv").as_path()]));
}

#[test]
fn test_store_writes_and_reuses_snapshot() {
    let dir = tempdir().unwrap();
    let source = csv_source(dir.path());
    let snapshot = dir.path().join("tables.bin.gz");

    let store = TableStore::new(source.clone()).with_snapshot(&snapshot);
    let parsed = store.load().unwrap();
    assert!(snapshot.exists());

    let cached = TableStore::new(source).with_snapshot(&snapshot);
    assert_eq!(*cached.load().unwrap(), *parsed);
}

#[test]
fn test_corrupt_snapshot_falls_back_to_source() {
    let dir = tempdir().unwrap();
    let source = csv_source(dir.path());
    let snapshot = dir.path().join("tables.bin.gz");
    fs::write(&snapshot, b"not a snapshot").unwrap();

    let store = TableStore::new(source).with_snapshot(&snapshot);
    assert_eq!(*store.load().unwrap(), common::tables());
    assert!(load_snapshot(&snapshot).is_ok());
}
