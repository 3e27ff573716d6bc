#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Mutex;

use once_cell::sync::Lazy;
use splitsies_core::{
    ledger::{Allocation, LedgerStore},
    storage::JsonStorage,
};
use tempfile::TempDir;

/// Holds TempDir guards so temporary folders live for the duration of the test run.
static TEST_DIRS: Lazy<Mutex<Vec<TempDir>>> = Lazy::new(|| Mutex::new(Vec::new()));

/// A fresh directory that outlives the calling test.
pub fn temp_home() -> PathBuf {
    let temp = TempDir::new().expect("create temp dir");
    let path = temp.path().to_path_buf();
    TEST_DIRS.lock().expect("lock temp dir registry").push(temp);
    path
}

pub fn json_storage(retention: usize) -> (JsonStorage, PathBuf) {
    let home = temp_home();
    let storage = JsonStorage::new(Some(home.clone()), "splitsies-people", Some(retention))
        .expect("create json storage backend");
    (storage, home)
}

/// Adds each `(name, description, amount)` with share weight 1.
pub fn store_with(entries: &[(&str, &str, f64)]) -> LedgerStore {
    let mut store = LedgerStore::new();
    for (name, description, amount) in entries {
        store
            .add_contribution(name, Some(description), Some(*amount), 1)
            .expect("seed contribution");
    }
    store
}

pub fn set_allocation(store: &mut LedgerStore, name: &str, allocation: Allocation) {
    let contributor = store.find_by_name(name).expect("known contributor").clone();
    store
        .edit_contributor(contributor.id, &contributor.name, allocation)
        .expect("update allocation");
}
