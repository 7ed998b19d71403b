//! Typed access to durable settings

use serde::de::DeserializeOwned;
use serde::Serialize;

use super::{SettingsStore, StoreError};

/// Set once the first run has populated the cache
pub const SETTING_LAUNCHED_BEFORE: &str = "launched_before";

/// Serialized high-score list
pub const SETTING_SCORES: &str = "scores";

/// JSON-typed helpers over any settings store
pub trait SettingsExt: SettingsStore {
    fn get_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StoreError> {
        match self.get_setting(key)? {
            Some(raw) => serde_json::from_str(&raw)
                .map(Some)
                .map_err(|e| StoreError::Serialization(format!("{}: {}", key, e))),
            None => Ok(None),
        }
    }

    fn put_json<T: Serialize + ?Sized>(&mut self, key: &str, value: &T) -> Result<(), StoreError> {
        let raw = serde_json::to_string(value)
            .map_err(|e| StoreError::Serialization(format!("{}: {}", key, e)))?;
        self.put_setting(key, &raw)
    }

    /// Missing flags read as `false`
    fn get_flag(&self, key: &str) -> Result<bool, StoreError> {
        Ok(self.get_json::<bool>(key)?.unwrap_or(false))
    }

    fn set_flag(&mut self, key: &str, value: bool) -> Result<(), StoreError> {
        self.put_json(key, &value)
    }
}

impl<S: SettingsStore + ?Sized> SettingsExt for S {}
