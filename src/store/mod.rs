//! Local cache store
//!
//! Durable copies of the garden collections, the favorites set and the
//! process settings:
//! - SQLite-backed store for real use (sqlite.rs)
//! - In-memory store with fault injection (memory.rs)
//! - Typed settings helpers (settings.rs)
//!
//! Every write has committed before it returns. Reading a kind that was
//! never written yields an empty sequence.

pub mod memory;
pub mod settings;
pub mod sqlite;

use crate::model::{BedRecord, PlantRecord};

pub use memory::MemoryStore;
pub use settings::{SettingsExt, SETTING_LAUNCHED_BEFORE, SETTING_SCORES};
pub use sqlite::SqliteStore;

/// Entity kinds held by the cache
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Plant,
    Bed,
    Favourite,
}

impl EntityKind {
    pub fn table(&self) -> &'static str {
        match self {
            EntityKind::Plant => "plants",
            EntityKind::Bed => "beds",
            EntityKind::Favourite => "favourites",
        }
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EntityKind::Plant => write!(f, "Plant"),
            EntityKind::Bed => write!(f, "Bed"),
            EntityKind::Favourite => write!(f, "Favourite"),
        }
    }
}

/// Durable key/value settings
pub trait SettingsStore: Send {
    fn get_setting(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn put_setting(&mut self, key: &str, value: &str) -> Result<(), StoreError>;
}

/// Durable cache of garden data and favorites
pub trait CacheStore: SettingsStore {
    fn load_plants(&self) -> Result<Vec<PlantRecord>, StoreError>;
    fn load_beds(&self) -> Result<Vec<BedRecord>, StoreError>;

    /// Replace the stored collection with `plants`. Rows absent from the
    /// new set are dropped; a repeated identifier keeps the last record.
    fn save_plants(&mut self, plants: &[PlantRecord]) -> Result<(), StoreError>;
    fn save_beds(&mut self, beds: &[BedRecord]) -> Result<(), StoreError>;

    /// Favorite record numbers in the order they were added
    fn load_favorites(&self) -> Result<Vec<String>, StoreError>;
    fn add_favorite(&mut self, recnum: &str) -> Result<(), StoreError>;

    /// Delete the favorite row for `recnum`; `false` when none existed
    fn remove_favorite(&mut self, recnum: &str) -> Result<bool, StoreError>;

    /// Number of stored rows of a kind
    fn count(&self, kind: EntityKind) -> Result<usize, StoreError>;
}

/// Store errors
#[derive(Debug, Clone, thiserror::Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Corrupt {kind} row {id}: {reason}")]
    Corrupt {
        kind: EntityKind,
        id: String,
        reason: String,
    },

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("IO error: {0}")]
    Io(String),

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        StoreError::Database(e.to_string())
    }
}
