//! In-memory cache store
//!
//! Same contract as the SQLite store, without durability. Clones share the
//! same contents, so a handle kept outside the guide observes (and can break)
//! what the guide writes. Reads and writes can be made to fail to exercise
//! the guide's recovery paths.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use super::{CacheStore, EntityKind, SettingsStore, StoreError};
use crate::model::{BedRecord, PlantRecord};

#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    inner: Arc<Mutex<Inner>>,
}

#[derive(Debug, Default)]
struct Inner {
    plants: Vec<PlantRecord>,
    beds: Vec<BedRecord>,
    favorites: Vec<String>,
    settings: HashMap<String, String>,
    fail_reads: bool,
    fail_writes: bool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent read fail
    pub fn set_fail_reads(&self, fail: bool) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.fail_reads = fail;
        }
    }

    /// Make every subsequent write fail
    pub fn set_fail_writes(&self, fail: bool) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.fail_writes = fail;
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, Inner>, StoreError> {
        self.inner
            .lock()
            .map_err(|_| StoreError::Unavailable("store lock poisoned".to_string()))
    }

    fn read(&self) -> Result<MutexGuard<'_, Inner>, StoreError> {
        let inner = self.lock()?;
        if inner.fail_reads {
            return Err(StoreError::Unavailable("reads disabled".to_string()));
        }
        Ok(inner)
    }

    fn write(&self) -> Result<MutexGuard<'_, Inner>, StoreError> {
        let inner = self.lock()?;
        if inner.fail_writes {
            return Err(StoreError::Unavailable("writes disabled".to_string()));
        }
        Ok(inner)
    }
}

/// Build a fresh row set. A repeated key replaces the earlier row in place.
fn replace_all<T: Clone, K: PartialEq>(incoming: &[T], key: impl Fn(&T) -> K) -> Vec<T> {
    let mut rows: Vec<T> = Vec::with_capacity(incoming.len());
    for item in incoming {
        match rows.iter_mut().find(|row| key(row) == key(item)) {
            Some(row) => *row = item.clone(),
            None => rows.push(item.clone()),
        }
    }
    rows
}

impl SettingsStore for MemoryStore {
    fn get_setting(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.read()?.settings.get(key).cloned())
    }

    fn put_setting(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        self.write()?
            .settings
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}

impl CacheStore for MemoryStore {
    fn load_plants(&self) -> Result<Vec<PlantRecord>, StoreError> {
        Ok(self.read()?.plants.clone())
    }

    fn load_beds(&self) -> Result<Vec<BedRecord>, StoreError> {
        Ok(self.read()?.beds.clone())
    }

    fn save_plants(&mut self, plants: &[PlantRecord]) -> Result<(), StoreError> {
        let mut inner = self.write()?;
        inner.plants = replace_all(plants, |p| p.recnum.clone());
        Ok(())
    }

    fn save_beds(&mut self, beds: &[BedRecord]) -> Result<(), StoreError> {
        let mut inner = self.write()?;
        inner.beds = replace_all(beds, |b| b.bed_id.clone());
        Ok(())
    }

    fn load_favorites(&self) -> Result<Vec<String>, StoreError> {
        Ok(self.read()?.favorites.clone())
    }

    fn add_favorite(&mut self, recnum: &str) -> Result<(), StoreError> {
        let mut inner = self.write()?;
        if !inner.favorites.iter().any(|f| f == recnum) {
            inner.favorites.push(recnum.to_string());
        }
        Ok(())
    }

    fn remove_favorite(&mut self, recnum: &str) -> Result<bool, StoreError> {
        let mut inner = self.write()?;
        match inner.favorites.iter().position(|f| f == recnum) {
            Some(index) => {
                inner.favorites.remove(index);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn count(&self, kind: EntityKind) -> Result<usize, StoreError> {
        let inner = self.read()?;
        Ok(match kind {
            EntityKind::Plant => inner.plants.len(),
            EntityKind::Bed => inner.beds.len(),
            EntityKind::Favourite => inner.favorites.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_save_replaces_previous_contents() {
        let mut store = MemoryStore::new();
        store
            .save_plants(&[PlantRecord::new("P1", "B1", "C"), PlantRecord::new("GONE", "B1", "C")])
            .unwrap();
        store.save_plants(&[PlantRecord::new("P1", "B2", "H")]).unwrap();

        let plants = store.load_plants().unwrap();
        assert_eq!(plants.len(), 1);
        assert_eq!(plants[0].recnum, "P1");
        assert_eq!(plants[0].bed, "B2");
    }

    #[test]
    fn test_repeated_key_keeps_first_position() {
        let mut store = MemoryStore::new();
        store
            .save_beds(&[
                BedRecord::new("B1", "Rose", 0.0, 0.0),
                BedRecord::new("B2", "Heather", 1.0, 1.0),
                BedRecord::new("B1", "Rose Garden", 0.0, 0.0),
            ])
            .unwrap();

        let beds = store.load_beds().unwrap();
        assert_eq!(beds.len(), 2);
        assert_eq!(beds[0].name, "Rose Garden");
        assert_eq!(beds[1].bed_id, "B2");
    }

    #[test]
    fn test_clones_share_contents() {
        let mut store = MemoryStore::new();
        let observer = store.clone();
        store.add_favorite("P1").unwrap();
        assert_eq!(observer.load_favorites().unwrap(), vec!["P1"]);
    }

    #[test]
    fn test_failing_writes_leave_data_untouched() {
        let mut store = MemoryStore::new();
        store.add_favorite("P1").unwrap();
        store.set_fail_writes(true);

        assert!(store.add_favorite("P2").is_err());
        assert!(store.remove_favorite("P1").is_err());
        assert_eq!(store.load_favorites().unwrap(), vec!["P1"]);
    }

    #[test]
    fn test_failing_reads() {
        let store = MemoryStore::new();
        store.set_fail_reads(true);
        assert!(store.load_beds().is_err());
        assert!(store.count(EntityKind::Bed).is_err());
    }
}
