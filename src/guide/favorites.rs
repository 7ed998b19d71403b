//! Favorites ledger
//!
//! Write-through set of favorited record numbers: the store is written
//! first and the in-memory set only changes once that write succeeded.

use std::collections::BTreeSet;

use tracing::{debug, warn};

use crate::store::{CacheStore, StoreError};

#[derive(Debug, Clone, Default)]
pub struct FavoritesLedger {
    recnums: BTreeSet<String>,
}

impl FavoritesLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ledger seeded from what the store already holds
    pub fn from_persisted(recnums: impl IntoIterator<Item = String>) -> Self {
        Self {
            recnums: recnums.into_iter().collect(),
        }
    }

    pub fn is_favorite(&self, recnum: &str) -> bool {
        self.recnums.contains(recnum)
    }

    pub fn len(&self) -> usize {
        self.recnums.len()
    }

    pub fn is_empty(&self) -> bool {
        self.recnums.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.recnums.iter().map(String::as_str)
    }

    pub fn add(&mut self, store: &mut dyn CacheStore, recnum: &str) -> Result<(), StoreError> {
        if let Err(e) = store.add_favorite(recnum) {
            warn!(recnum, error = %e, "Could not save favorite");
            return Err(e);
        }
        self.recnums.insert(recnum.to_string());
        debug!(recnum, "Favorite added");
        Ok(())
    }

    /// Delete the persisted favorite, then forget it.
    ///
    /// A record that had no persisted row is still dropped from memory so
    /// the set matches the store afterwards.
    pub fn remove(&mut self, store: &mut dyn CacheStore, recnum: &str) -> Result<(), StoreError> {
        match store.remove_favorite(recnum) {
            Ok(existed) => {
                if !existed {
                    debug!(recnum, "No persisted favorite to delete");
                }
                self.recnums.remove(recnum);
                Ok(())
            }
            Err(e) => {
                warn!(recnum, error = %e, "Could not delete favorite");
                Err(e)
            }
        }
    }
}
