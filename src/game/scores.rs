//! Persisted high-score table

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::store::{SettingsExt, SettingsStore, StoreError, SETTING_SCORES};

/// Date format used when listing scores
pub const SCORE_DATE_FORMAT: &str = "%d/%m/%Y";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredScore {
    pub score: u32,
    pub date: DateTime<Utc>,
}

impl StoredScore {
    pub fn new(score: u32, date: DateTime<Utc>) -> Self {
        Self { score, date }
    }

    pub fn display_date(&self) -> String {
        self.date.format(SCORE_DATE_FORMAT).to_string()
    }
}

/// Top scores, highest first, kept in the settings store
pub struct HighScoreTable {
    store: Box<dyn SettingsStore>,
    cap: usize,
}

impl HighScoreTable {
    pub fn new(store: Box<dyn SettingsStore>, cap: usize) -> Self {
        Self { store, cap }
    }

    pub fn cap(&self) -> usize {
        self.cap
    }

    /// Scores sorted for display. Equal scores keep the order they were
    /// recorded in.
    pub fn list(&self) -> Result<Vec<StoredScore>, StoreError> {
        let mut scores: Vec<StoredScore> = self.store.get_json(SETTING_SCORES)?.unwrap_or_default();
        rank(&mut scores, self.cap);
        Ok(scores)
    }

    /// Insert a finished game's score.
    ///
    /// Returns whether the score made the table. Zero is never stored.
    pub fn record(&mut self, score: u32, date: DateTime<Utc>) -> Result<bool, StoreError> {
        if score == 0 {
            debug!("Zero score not recorded");
            return Ok(false);
        }

        let mut scores = match self.list() {
            Ok(scores) => scores,
            Err(StoreError::Serialization(reason)) => {
                warn!(%reason, "Stored high scores unreadable, starting a new table");
                Vec::new()
            }
            Err(e) => return Err(e),
        };
        let entry = StoredScore::new(score, date);
        scores.push(entry.clone());
        rank(&mut scores, self.cap);

        let kept = scores.contains(&entry);
        self.store.put_json(SETTING_SCORES, &scores)?;
        info!(score, kept, entries = scores.len(), "Score recorded");
        Ok(kept)
    }
}

fn rank(scores: &mut Vec<StoredScore>, cap: usize) {
    // sort_by is stable, ties stay in insertion order
    scores.sort_by(|a, b| b.score.cmp(&a.score));
    scores.truncate(cap);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use chrono::TimeZone;

    fn day(d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, d, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_sorted_descending_with_stable_ties() {
        let mut table = HighScoreTable::new(Box::new(MemoryStore::new()), 20);
        table.record(10, day(1)).unwrap();
        table.record(30, day(2)).unwrap();
        table.record(10, day(3)).unwrap();

        let scores = table.list().unwrap();
        let values: Vec<u32> = scores.iter().map(|s| s.score).collect();
        assert_eq!(values, vec![30, 10, 10]);
        assert_eq!(scores[1].date, day(1));
        assert_eq!(scores[2].date, day(3));
    }

    #[test]
    fn test_zero_never_stored() {
        let store = MemoryStore::new();
        let mut table = HighScoreTable::new(Box::new(store.clone()), 20);
        assert!(!table.record(0, day(1)).unwrap());
        assert!(store.get_setting(SETTING_SCORES).unwrap().is_none());
    }

    #[test]
    fn test_full_table_drops_lower_score() {
        let mut table = HighScoreTable::new(Box::new(MemoryStore::new()), 20);
        for i in 0..20 {
            table.record(20 + i, day(1)).unwrap();
        }

        assert!(!table.record(15, day(2)).unwrap());
        let scores = table.list().unwrap();
        assert_eq!(scores.len(), 20);
        assert!(scores.iter().all(|s| s.score >= 20));
        assert!(scores.windows(2).all(|w| w[0].score >= w[1].score));
    }

    #[test]
    fn test_display_date() {
        assert_eq!(StoredScore::new(5, day(7)).display_date(), "07/03/2024");
    }

    #[test]
    fn test_failed_write_reported() {
        let store = MemoryStore::new();
        let mut table = HighScoreTable::new(Box::new(store.clone()), 20);
        store.set_fail_writes(true);
        assert!(table.record(12, day(1)).is_err());
        store.set_fail_writes(false);
        assert!(table.list().unwrap().is_empty());
    }

    #[test]
    fn test_unreadable_table_replaced_on_next_record() {
        let mut store = MemoryStore::new();
        store.put_setting(SETTING_SCORES, "{garbage").unwrap();
        let mut table = HighScoreTable::new(Box::new(store.clone()), 20);
        assert!(table.list().is_err());

        assert!(table.record(15, day(1)).unwrap());
        assert_eq!(table.list().unwrap(), vec![StoredScore::new(15, day(1))]);

        assert!(table.record(40, day(2)).unwrap());
        let values: Vec<u32> = table.list().unwrap().iter().map(|s| s.score).collect();
        assert_eq!(values, vec![40, 15]);
    }
}
