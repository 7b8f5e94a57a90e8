#![allow(dead_code)]

use csv::StringRecord;
use recstore::adapters::file_store::RecordStore;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

pub fn record(fields: &[&str]) -> StringRecord {
    StringRecord::from(fields.to_vec())
}

pub fn fields(record: &StringRecord) -> Vec<String> {
    record.iter().map(str::to_string).collect()
}

pub fn store_path(dir: &TempDir) -> PathBuf {
    dir.path().join("prices.csv")
}

pub fn empty_store() -> (TempDir, RecordStore) {
    let dir = TempDir::new().unwrap();
    let store = RecordStore::open(store_path(&dir)).unwrap();
    (dir, store)
}

pub fn store_with(content: &str) -> (TempDir, RecordStore) {
    let dir = TempDir::new().unwrap();
    let path = store_path(&dir);
    std::fs::write(&path, content).unwrap();
    let store = RecordStore::open(&path).unwrap();
    (dir, store)
}

pub fn read_file(path: &Path) -> String {
    std::fs::read_to_string(path).unwrap()
}

pub fn write_temp_ini(content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

pub const PRICES: &str = "date,open,high,low,close,volume\n\
    2024-01-15,100.0,110.0,90.0,105.0,50000\n\
    2024-01-16,105.0,115.0,100.0,110.0,60000\n\
    2024-01-17,110.0,120.0,105.0,115.0,55000\n";
