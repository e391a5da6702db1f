use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// A persisted document: any JSON object, no fixed schema.
pub type StateDocument = Map<String, Value>;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum StoreKey {
    Progress,
    MoviesProgress,
    AlarmSettings,
}

impl StoreKey {
    pub const ALL: [StoreKey; 3] = [
        StoreKey::Progress,
        StoreKey::MoviesProgress,
        StoreKey::AlarmSettings,
    ];

    // File name under the data directory
    pub fn file_name(self) -> &'static str {
        match self {
            StoreKey::Progress => "progression.json",
            StoreKey::MoviesProgress => "movies_progress.json",
            StoreKey::AlarmSettings => "alarm.json",
        }
    }

    // Slot in the per-key lock table
    pub(crate) fn index(self) -> usize {
        match self {
            StoreKey::Progress => 0,
            StoreKey::MoviesProgress => 1,
            StoreKey::AlarmSettings => 2,
        }
    }

    /// Document returned by `Load` when nothing usable is on disk.
    pub fn default_document(self) -> StateDocument {
        match self {
            StoreKey::Progress | StoreKey::MoviesProgress => StateDocument::new(),
            StoreKey::AlarmSettings => AlarmSettings::default().into_document(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AlarmSettings {
    pub time: String, // "HH:MM"
    pub enabled: bool,
}

impl Default for AlarmSettings {
    fn default() -> Self {
        Self {
            time: "08:00".to_string(),
            enabled: false,
        }
    }
}

impl AlarmSettings {
    pub fn into_document(self) -> StateDocument {
        let mut doc = StateDocument::new();
        doc.insert("time".to_string(), Value::String(self.time));
        doc.insert("enabled".to_string(), Value::Bool(self.enabled));
        doc
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    pub status: String,
}

impl StatusResponse {
    pub fn ok() -> Self {
        Self {
            status: "ok".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PowerInput {
    pub on: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct PowerResponse {
    pub status: String,
    pub on: bool,
    pub device: Value, // raw reply from the plug
}
