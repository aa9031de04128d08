//! In-memory record store

use std::collections::BTreeMap;

use doodad_core::{PersistError, PersistentId};
use doodad_engine::{DoodadRecord, PersistenceGateway};
use parking_lot::Mutex;

#[derive(Debug, Default)]
struct Inner {
    records: BTreeMap<PersistentId, DoodadRecord>,
    saves: u64,
    deletes: u64,
}

/// Thread-safe store keeping records in memory.
///
/// Counts every save and delete so callers can assert on write traffic.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records
    pub fn len(&self) -> usize {
        self.inner.lock().records.len()
    }

    /// Whether the store is empty
    pub fn is_empty(&self) -> bool {
        self.inner.lock().records.is_empty()
    }

    /// Saves issued so far
    pub fn save_count(&self) -> u64 {
        self.inner.lock().saves
    }

    /// Deletes issued so far
    pub fn delete_count(&self) -> u64 {
        self.inner.lock().deletes
    }

    /// Whether a record exists
    pub fn contains(&self, id: PersistentId) -> bool {
        self.inner.lock().records.contains_key(&id)
    }
}

impl PersistenceGateway for MemoryStore {
    fn save(&self, record: &DoodadRecord) -> Result<(), PersistError> {
        let mut inner = self.inner.lock();
        inner.saves += 1;
        inner.records.insert(record.id, record.clone());
        Ok(())
    }

    fn delete(&self, id: PersistentId) -> Result<(), PersistError> {
        let mut inner = self.inner.lock();
        inner.deletes += 1;
        inner.records.remove(&id);
        Ok(())
    }

    fn load(&self, id: PersistentId) -> Result<DoodadRecord, PersistError> {
        self.inner
            .lock()
            .records
            .get(&id)
            .cloned()
            .ok_or(PersistError::NotFound(id))
    }

    fn load_all(&self) -> Result<Vec<DoodadRecord>, PersistError> {
        Ok(self.inner.lock().records.values().cloned().collect())
    }

    fn max_id(&self) -> Result<PersistentId, PersistError> {
        Ok(self.inner.lock().records.keys().next_back().copied().unwrap_or(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use doodad_core::ObjectId;
    use doodad_engine::Doodad;

    fn record(id: PersistentId) -> DoodadRecord {
        let mut record = Doodad::without_template(ObjectId::new(1), 4).to_record();
        record.id = id;
        record
    }

    #[test]
    fn test_save_load_delete() {
        let store = MemoryStore::new();
        store.save(&record(2)).unwrap();
        store.save(&record(1)).unwrap();
        store.save(&record(2)).unwrap();

        assert_eq!(store.len(), 2);
        assert_eq!(store.save_count(), 3);
        assert_eq!(
            store.load_all().unwrap().iter().map(|r| r.id).collect::<Vec<_>>(),
            vec![1, 2]
        );

        store.delete(1).unwrap();
        store.delete(1).unwrap();
        assert_eq!(store.delete_count(), 2);
        assert!(matches!(store.load(1), Err(PersistError::NotFound(1))));
        assert!(store.contains(2));
    }
}
