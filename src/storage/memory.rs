use std::sync::{Mutex, MutexGuard};

use super::{PersistenceAdapter, Result};
use crate::errors::StorageError;
use crate::ledger::LedgerSnapshot;

/// Keeps the serialized snapshot in memory; used by tests and embedders.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    slot: Mutex<Option<String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raw stored JSON, if any. A poisoned slot reads as empty.
    pub fn raw(&self) -> Option<String> {
        self.slot().ok().and_then(|guard| guard.clone())
    }

    fn slot(&self) -> Result<MutexGuard<'_, Option<String>>> {
        self.slot.lock().map_err(|_| StorageError::Poisoned)
    }
}

impl PersistenceAdapter for MemoryStorage {
    fn load(&self) -> Result<Option<LedgerSnapshot>> {
        match self.slot()?.as_deref() {
            Some(data) => Ok(Some(serde_json::from_str(data)?)),
            None => Ok(None),
        }
    }

    fn save(&self, snapshot: &LedgerSnapshot) -> Result<()> {
        let data = serde_json::to_string(snapshot)?;
        *self.slot()? = Some(data);
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        *self.slot()? = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;

    use super::*;
    use crate::storage::persist;
    use crate::LedgerStore;

    #[test]
    fn poisoned_slot_reports_failures() {
        let storage = Arc::new(MemoryStorage::new());
        let holder = Arc::clone(&storage);
        let outcome = thread::spawn(move || {
            let _guard = holder.slot.lock().unwrap();
            panic!("writer crashed while holding the slot");
        })
        .join();
        assert!(outcome.is_err());

        let snapshot = LedgerSnapshot::new(Vec::new());
        assert!(matches!(storage.save(&snapshot), Err(StorageError::Poisoned)));
        assert!(matches!(storage.clear(), Err(StorageError::Poisoned)));
        assert!(matches!(storage.load(), Err(StorageError::Poisoned)));

        let mut store = LedgerStore::new();
        store
            .add_contribution("Sam", Some("Lunch"), Some(20.0), 1)
            .unwrap();
        assert!(!persist(storage.as_ref(), &store));
    }
}
