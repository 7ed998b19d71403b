//! SQLite-backed cache store
//!
//! Plants keep their open-ended botanical properties as a JSON column; the
//! fields the guide filters on are real columns. Rows load in insertion
//! order so section building stays deterministic across runs.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use rusqlite::{params, Connection, OptionalExtension};
use tracing::{debug, info};

use super::{CacheStore, EntityKind, SettingsStore, StoreError};
use crate::model::{BedRecord, PlantRecord};

pub struct SqliteStore {
    conn: Connection,
    db_path: Option<PathBuf>,
}

/// Plant as stored in the `plants` table
#[derive(Debug, Clone, PartialEq)]
pub struct StoredPlant {
    pub recnum: String,
    pub bed: String,
    pub accsta: String,
    pub latitude: Option<String>,
    pub longitude: Option<String>,
    pub properties_json: String,
}

impl StoredPlant {
    pub fn from_record(plant: &PlantRecord) -> Result<Self, StoreError> {
        let properties_json = serde_json::to_string(&plant.properties)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        Ok(Self {
            recnum: plant.recnum.clone(),
            bed: plant.bed.clone(),
            accsta: plant.accsta.clone(),
            latitude: plant.latitude.clone(),
            longitude: plant.longitude.clone(),
            properties_json,
        })
    }

    pub fn into_record(self) -> Result<PlantRecord, StoreError> {
        let properties: BTreeMap<String, String> = serde_json::from_str(&self.properties_json)
            .map_err(|e| StoreError::Corrupt {
                kind: EntityKind::Plant,
                id: self.recnum.clone(),
                reason: e.to_string(),
            })?;
        Ok(PlantRecord {
            recnum: self.recnum,
            bed: self.bed,
            accsta: self.accsta,
            latitude: self.latitude,
            longitude: self.longitude,
            properties,
        })
    }
}

impl SqliteStore {
    /// Open or create the cache database at `db_path`.
    pub fn open(db_path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| StoreError::Io(e.to_string()))?;
        }

        let conn = Connection::open(db_path)?;

        // Enable WAL mode for concurrent read access
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;

        let store = Self {
            conn,
            db_path: Some(db_path.to_path_buf()),
        };
        store.init_schema()?;

        info!(path = %db_path.display(), "Cache store initialized");
        Ok(store)
    }

    /// Non-durable store, used for scratch sessions
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let store = Self {
            conn: Connection::open_in_memory()?,
            db_path: None,
        };
        store.init_schema()?;
        Ok(store)
    }

    pub fn path(&self) -> Option<&Path> {
        self.db_path.as_deref()
    }

    fn init_schema(&self) -> Result<(), StoreError> {
        self.conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS plants (
                recnum      TEXT PRIMARY KEY,
                bed         TEXT NOT NULL,
                accsta      TEXT NOT NULL,
                latitude    TEXT,
                longitude   TEXT,
                properties  TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS beds (
                bed_id          TEXT PRIMARY KEY,
                name            TEXT NOT NULL,
                latitude        TEXT NOT NULL,
                longitude       TEXT NOT NULL,
                last_modified   TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS favourites (
                recnum      TEXT PRIMARY KEY,
                added_at    INTEGER NOT NULL DEFAULT (strftime('%s', 'now'))
            );
            CREATE TABLE IF NOT EXISTS settings (
                key     TEXT PRIMARY KEY,
                value   TEXT NOT NULL
            );",
        )?;
        Ok(())
    }
}

impl SettingsStore for SqliteStore {
    fn get_setting(&self, key: &str) -> Result<Option<String>, StoreError> {
        let value = self
            .conn
            .query_row("SELECT value FROM settings WHERE key = ?1", [key], |row| row.get(0))
            .optional()?;
        Ok(value)
    }

    fn put_setting(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        self.conn.execute(
            "INSERT INTO settings (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = ?2",
            params![key, value],
        )?;
        Ok(())
    }
}

impl CacheStore for SqliteStore {
    fn load_plants(&self) -> Result<Vec<PlantRecord>, StoreError> {
        let mut stmt = self.conn.prepare_cached(
            "SELECT recnum, bed, accsta, latitude, longitude, properties
             FROM plants ORDER BY rowid",
        )?;

        let rows = stmt.query_map([], |row| {
            Ok(StoredPlant {
                recnum: row.get(0)?,
                bed: row.get(1)?,
                accsta: row.get(2)?,
                latitude: row.get(3)?,
                longitude: row.get(4)?,
                properties_json: row.get(5)?,
            })
        })?;

        let mut plants = Vec::new();
        for row in rows {
            plants.push(row?.into_record()?);
        }
        Ok(plants)
    }

    fn load_beds(&self) -> Result<Vec<BedRecord>, StoreError> {
        let mut stmt = self.conn.prepare_cached(
            "SELECT bed_id, name, latitude, longitude, last_modified
             FROM beds ORDER BY rowid",
        )?;

        let beds = stmt
            .query_map([], |row| {
                Ok(BedRecord {
                    bed_id: row.get(0)?,
                    name: row.get(1)?,
                    latitude: row.get(2)?,
                    longitude: row.get(3)?,
                    last_modified: row.get(4)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(beds)
    }

    fn save_plants(&mut self, plants: &[PlantRecord]) -> Result<(), StoreError> {
        let tx = self.conn.transaction()?;
        tx.execute("DELETE FROM plants", [])?;
        {
            let mut stmt = tx.prepare_cached(
                "INSERT INTO plants (recnum, bed, accsta, latitude, longitude, properties)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                 ON CONFLICT(recnum) DO UPDATE SET
                    bed = ?2, accsta = ?3, latitude = ?4, longitude = ?5, properties = ?6",
            )?;
            for plant in plants {
                let stored = StoredPlant::from_record(plant)?;
                stmt.execute(params![
                    stored.recnum,
                    stored.bed,
                    stored.accsta,
                    stored.latitude,
                    stored.longitude,
                    stored.properties_json,
                ])?;
            }
        }
        tx.commit()?;
        debug!(count = plants.len(), "Saved plants");
        Ok(())
    }

    fn save_beds(&mut self, beds: &[BedRecord]) -> Result<(), StoreError> {
        let tx = self.conn.transaction()?;
        tx.execute("DELETE FROM beds", [])?;
        {
            let mut stmt = tx.prepare_cached(
                "INSERT INTO beds (bed_id, name, latitude, longitude, last_modified)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT(bed_id) DO UPDATE SET
                    name = ?2, latitude = ?3, longitude = ?4, last_modified = ?5",
            )?;
            for bed in beds {
                stmt.execute(params![
                    bed.bed_id,
                    bed.name,
                    bed.latitude,
                    bed.longitude,
                    bed.last_modified,
                ])?;
            }
        }
        tx.commit()?;
        debug!(count = beds.len(), "Saved beds");
        Ok(())
    }

    fn load_favorites(&self) -> Result<Vec<String>, StoreError> {
        let mut stmt = self
            .conn
            .prepare_cached("SELECT recnum FROM favourites ORDER BY rowid")?;
        let favorites = stmt
            .query_map([], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(favorites)
    }

    fn add_favorite(&mut self, recnum: &str) -> Result<(), StoreError> {
        self.conn.execute(
            "INSERT OR IGNORE INTO favourites (recnum) VALUES (?1)",
            [recnum],
        )?;
        Ok(())
    }

    fn remove_favorite(&mut self, recnum: &str) -> Result<bool, StoreError> {
        let deleted = self
            .conn
            .execute("DELETE FROM favourites WHERE recnum = ?1", [recnum])?;
        Ok(deleted > 0)
    }

    fn count(&self, kind: EntityKind) -> Result<usize, StoreError> {
        let sql = format!("SELECT COUNT(*) FROM {}", kind.table());
        let count: i64 = self.conn.query_row(&sql, [], |row| row.get(0))?;
        Ok(count as usize)
    }
}

impl std::fmt::Debug for SqliteStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteStore")
            .field("db_path", &self.db_path)
            .finish()
    }
}
