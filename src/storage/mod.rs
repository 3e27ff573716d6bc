//! Persistence adapters for ledger snapshots.
//!
//! Persistence never owns the ledger: a failed save is logged and the
//! in-memory store stays authoritative.

pub mod json_backend;
pub mod memory;

use tracing::{debug, warn};

use crate::errors::StorageError;
use crate::ledger::{LedgerSnapshot, LedgerStore};

pub type Result<T> = std::result::Result<T, StorageError>;

/// Load/save contract for a single stored snapshot.
pub trait PersistenceAdapter: Send + Sync {
    /// Returns the stored snapshot, or `None` if nothing was saved yet.
    fn load(&self) -> Result<Option<LedgerSnapshot>>;
    fn save(&self, snapshot: &LedgerSnapshot) -> Result<()>;
    fn clear(&self) -> Result<()>;
}

/// Loads the stored ledger, falling back to an empty one on any failure.
pub fn load_or_empty(adapter: &dyn PersistenceAdapter) -> LedgerStore {
    let snapshot = match adapter.load() {
        Ok(Some(snapshot)) => snapshot,
        Ok(None) => return LedgerStore::new(),
        Err(err) => {
            warn!(error = %err, "failed to load saved ledger, starting empty");
            return LedgerStore::new();
        }
    };
    match LedgerStore::from_snapshot(snapshot) {
        Ok(store) => {
            debug!(contributors = store.len(), "loaded saved ledger");
            store
        }
        Err(err) => {
            warn!(error = %err, "saved ledger is invalid, starting empty");
            LedgerStore::new()
        }
    }
}

/// Saves the store, logging failures. Returns whether the save succeeded.
pub fn persist(adapter: &dyn PersistenceAdapter, store: &LedgerStore) -> bool {
    let outcome = if store.is_empty() {
        adapter.clear()
    } else {
        adapter.save(&store.snapshot())
    };
    match outcome {
        Ok(()) => true,
        Err(err) => {
            warn!(error = %err, "failed to save ledger");
            false
        }
    }
}

pub use json_backend::JsonStorage;
pub use memory::MemoryStorage;
