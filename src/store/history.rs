use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::exam::ExamRecord;
use crate::store::json_store::KeyValueStore;
use crate::store::schema::{HISTORY_BACKUP_KEY, HISTORY_KEY, HistoryData, HistoryEntry};

/// Saved attempts, newest first, kept as one value in a key-value store.
///
/// Every operation reads the whole list and writes it back; there are no
/// partial updates. Unreadable stored data reads as an empty history, and is
/// copied aside before the next write replaces it.
pub struct HistoryStore<S: KeyValueStore> {
    backend: S,
}

impl<S: KeyValueStore> HistoryStore<S> {
    pub fn new(backend: S) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &S {
        &self.backend
    }

    /// Reads the history for display. Anything unreadable shows as empty.
    fn load(&self) -> HistoryData {
        match self.backend.get(HISTORY_KEY) {
            Ok(Some(raw)) => decode(&raw).unwrap_or_else(|reason| {
                warn!(reason = %reason, "history unreadable, showing it as empty");
                HistoryData::default()
            }),
            Ok(None) => HistoryData::default(),
            Err(err) => {
                warn!(error = %err, "history unreadable, showing it as empty");
                HistoryData::default()
            }
        }
    }

    /// Reads the history ahead of a write.
    ///
    /// A backend failure is an error, so a read hiccup never turns into an
    /// overwrite. A value that cannot be decoded is copied to
    /// [`HISTORY_BACKUP_KEY`] first and then replaced by an empty list.
    fn load_for_update(&mut self) -> Result<HistoryData> {
        let Some(raw) = self
            .backend
            .get(HISTORY_KEY)
            .context("reading history before writing it")?
        else {
            return Ok(HistoryData::default());
        };
        match decode(&raw) {
            Ok(data) => Ok(data),
            Err(reason) => {
                self.backend
                    .set(HISTORY_BACKUP_KEY, &raw)
                    .context("keeping a copy of unreadable history")?;
                warn!(
                    reason = %reason,
                    backup = HISTORY_BACKUP_KEY,
                    "history unreadable, copied aside and starting a new list"
                );
                Ok(HistoryData::default())
            }
        }
    }

    fn persist(&mut self, data: &HistoryData) -> Result<()> {
        let json = serde_json::to_string_pretty(data)?;
        self.backend.set(HISTORY_KEY, &json)
    }

    pub fn save(&mut self, record: ExamRecord) -> Result<i64> {
        self.save_at(record, Utc::now())
    }

    /// Prepends a new entry created at `created` and returns its id.
    ///
    /// Ids are creation timestamps in milliseconds, bumped past the newest
    /// stored id when two saves land in the same millisecond.
    pub fn save_at(&mut self, record: ExamRecord, created: DateTime<Utc>) -> Result<i64> {
        let mut data = self.load_for_update()?;
        let newest = data.entries.iter().map(|e| e.id).max();
        let id = match newest {
            Some(newest) if newest >= created.timestamp_millis() => newest + 1,
            _ => created.timestamp_millis(),
        };

        data.entries.insert(
            0,
            HistoryEntry {
                id,
                custom_title: None,
                record,
            },
        );
        self.persist(&data)?;
        debug!(id, entries = data.entries.len(), "history entry saved");
        Ok(id)
    }

    /// Sets the custom title of entry `id`. Returns false, changing nothing,
    /// when the id is unknown or the trimmed title is empty.
    pub fn rename(&mut self, id: i64, title: &str) -> Result<bool> {
        let title = title.trim();
        if title.is_empty() {
            return Ok(false);
        }
        let mut data = self.load_for_update()?;
        let Some(entry) = data.entries.iter_mut().find(|e| e.id == id) else {
            return Ok(false);
        };
        entry.custom_title = Some(title.to_string());
        self.persist(&data)?;
        Ok(true)
    }

    pub fn list(&self) -> Vec<HistoryEntry> {
        self.load().entries
    }

    pub fn get(&self, id: i64) -> Option<HistoryEntry> {
        self.load().entries.into_iter().find(|e| e.id == id)
    }

    /// Removes every entry. Cannot be undone.
    pub fn clear(&mut self) -> Result<()> {
        self.backend.delete(HISTORY_KEY)
    }
}

fn decode(raw: &str) -> Result<HistoryData, String> {
    match serde_json::from_str::<HistoryData>(raw) {
        Ok(data) if data.needs_reset() => Err(format!(
            "unknown schema version {}",
            data.schema_version
        )),
        Ok(data) => Ok(data),
        Err(err) => Err(format!("corrupt json: {err}")),
    }
}
