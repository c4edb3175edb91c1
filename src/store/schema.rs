use serde::{Deserialize, Serialize};

use crate::exam::ExamRecord;

const SCHEMA_VERSION: u32 = 1;

/// Key under which the whole history list is stored.
pub const HISTORY_KEY: &str = "exam_history";

/// Where an undecodable history value is copied before it is overwritten.
pub const HISTORY_BACKUP_KEY: &str = "exam_history.unreadable";

/// Title used when an entry has neither a custom title nor file names.
pub const FALLBACK_TITLE: &str = "Practice";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// Creation time in milliseconds since the Unix epoch.
    pub id: i64,
    #[serde(default)]
    pub custom_title: Option<String>,
    pub record: ExamRecord,
}

impl HistoryEntry {
    /// Custom title, else the source file names, else a fixed label.
    pub fn display_title(&self) -> String {
        if let Some(title) = self.custom_title.as_deref().filter(|t| !t.is_empty()) {
            return title.to_string();
        }
        let joined = self.record.filenames.join(", ");
        if joined.is_empty() {
            FALLBACK_TITLE.to_string()
        } else {
            joined
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HistoryData {
    pub schema_version: u32,
    /// Most recent first.
    pub entries: Vec<HistoryEntry>,
}

impl Default for HistoryData {
    fn default() -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            entries: Vec::new(),
        }
    }
}

impl HistoryData {
    /// Check if loaded data has a schema version this build cannot read.
    pub fn needs_reset(&self) -> bool {
        self.schema_version != SCHEMA_VERSION
    }
}
