use std::{
    fs,
    path::{Path, PathBuf},
    sync::{Arc, RwLock},
};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use log::warn;
use serde_json::{json, Value};

use crate::ledger::{Session, SessionLedger};
use crate::settings::Settings;

/// Everything the app persists, as held in memory.
#[derive(Debug, Clone, Default)]
pub struct AppData {
    pub ledger: SessionLedger,
    pub settings: Settings,
}

struct StoreInner {
    path: PathBuf,
    data: RwLock<AppData>,
}

/// Owner of the on-disk data document.
///
/// The document is a single JSON object `{ sessions, labels, settings }`.
/// Read failures fall back to an empty document (startup never fails on a
/// bad data file); write failures are logged and swallowed.
#[derive(Clone)]
pub struct DataStore {
    inner: Arc<StoreInner>,
}

impl DataStore {
    pub fn new(path: PathBuf) -> Self {
        let data = load_document(&path);
        Self {
            inner: Arc::new(StoreInner {
                path,
                data: RwLock::new(data),
            }),
        }
    }

    pub fn path(&self) -> &Path {
        &self.inner.path
    }

    pub fn settings(&self) -> Settings {
        self.inner.data.read().unwrap().settings.clone()
    }

    /// Apply an in-place settings edit and persist the document.
    pub fn update_settings(&self, edit: impl FnOnce(&mut Settings)) -> Settings {
        let mut guard = self.inner.data.write().unwrap();
        edit(&mut guard.settings);
        let updated = guard.settings.clone();
        self.persist(&guard);
        updated
    }

    /// Append a finished focus interval and persist. Returns the ledger
    /// index of the new record.
    pub fn add_session(&self, duration: u64, label: &str, ended_at: DateTime<Utc>) -> usize {
        let mut guard = self.inner.data.write().unwrap();
        let index = guard.ledger.add(duration, label, ended_at);
        self.persist(&guard);
        index
    }

    pub fn attach_notes(&self, index: usize, notes: &str) -> bool {
        let mut guard = self.inner.data.write().unwrap();
        let changed = guard.ledger.attach_notes(index, notes);
        if changed {
            self.persist(&guard);
        }
        changed
    }

    pub fn delete_session(&self, index: usize) -> bool {
        let mut guard = self.inner.data.write().unwrap();
        let deleted = guard.ledger.delete(index);
        if deleted {
            self.persist(&guard);
        }
        deleted
    }

    pub fn sessions(&self) -> Vec<Session> {
        self.inner.data.read().unwrap().ledger.sessions.clone()
    }

    pub fn matching_labels(&self, query: &str) -> Vec<String> {
        self.inner.data.read().unwrap().ledger.matching_labels(query)
    }

    /// The full document in wire shape, for the `load-data` request.
    pub fn document(&self) -> Value {
        let guard = self.inner.data.read().unwrap();
        document_value(&guard)
    }

    /// Replace the whole document, for the `save-data` request. The settings
    /// section goes through the usual defaults merge so a partial document
    /// cannot strip options.
    pub fn replace_document(&self, document: &Value) {
        let mut guard = self.inner.data.write().unwrap();
        *guard = parse_document(document);
        self.persist(&guard);
    }

    fn persist(&self, data: &AppData) {
        if let Err(err) = write_document(&self.inner.path, data) {
            warn!("failed to save data file: {err:#}");
        }
    }
}

fn document_value(data: &AppData) -> Value {
    json!({
        "sessions": data.ledger.sessions,
        "labels": data.ledger.labels,
        "settings": data.settings,
    })
}

fn parse_document(value: &Value) -> AppData {
    let sessions: Vec<Session> = value
        .get("sessions")
        .cloned()
        .map(|v| {
            serde_json::from_value(v).unwrap_or_else(|err| {
                warn!("sessions list did not deserialize, starting empty: {err}");
                Vec::new()
            })
        })
        .unwrap_or_default();
    let labels: Vec<String> = value
        .get("labels")
        .cloned()
        .map(|v| serde_json::from_value(v).unwrap_or_default())
        .unwrap_or_default();
    let settings = Settings::from_value(value.get("settings").unwrap_or(&Value::Null));

    AppData {
        ledger: SessionLedger { sessions, labels },
        settings,
    }
}

fn load_document(path: &Path) -> AppData {
    if !path.exists() {
        return AppData::default();
    }
    match read_document(path) {
        Ok(data) => data,
        Err(err) => {
            warn!("failed to load data file, starting empty: {err:#}");
            AppData::default()
        }
    }
}

fn read_document(path: &Path) -> Result<AppData> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let value: Value = serde_json::from_str(&contents)
        .with_context(|| format!("invalid JSON in {}", path.display()))?;
    Ok(parse_document(&value))
}

fn write_document(path: &Path, data: &AppData) -> Result<()> {
    let serialized = serde_json::to_string_pretty(&document_value(data))?;
    fs::write(path, serialized).with_context(|| format!("failed to write {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn store_at(dir: &tempfile::TempDir) -> DataStore {
        DataStore::new(dir.path().join("focusflow-data.json"))
    }

    #[test]
    fn missing_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_at(&dir);
        assert!(store.sessions().is_empty());
        assert!(store.settings().general.always_on_top);
    }

    #[test]
    fn corrupt_file_falls_back_to_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("focusflow-data.json");
        fs::write(&path, "{not json").unwrap();
        let store = DataStore::new(path);
        assert!(store.sessions().is_empty());
    }

    #[test]
    fn sessions_survive_reload() {
        let dir = tempfile::tempdir().unwrap();
        let ended = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        {
            let store = store_at(&dir);
            let idx = store.add_session(900, "writing", ended);
            assert!(store.attach_notes(idx, "draft done"));
        }
        let reloaded = store_at(&dir);
        let sessions = reloaded.sessions();
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].duration, 900);
        assert_eq!(sessions[0].label, "writing");
        assert_eq!(sessions[0].notes, "draft done");
        assert_eq!(reloaded.matching_labels("writ"), vec!["writing"]);
    }

    #[test]
    fn settings_edits_persist() {
        let dir = tempfile::tempdir().unwrap();
        {
            let store = store_at(&dir);
            store.update_settings(|s| {
                s.timer.break_timer.enabled = true;
                s.timer.break_timer.break_minutes = 5;
            });
        }
        let reloaded = store_at(&dir);
        assert!(reloaded.settings().timer.break_timer.enabled);
        assert_eq!(reloaded.settings().timer.break_timer.break_minutes, 5);
    }

    #[test]
    fn replace_document_merges_settings_against_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_at(&dir);
        store.replace_document(&serde_json::json!({
            "sessions": [],
            "labels": ["reading"],
            "settings": { "appearance": { "theme": "light" } },
        }));
        let settings = store.settings();
        assert_eq!(settings.appearance.theme, "light");
        // Untouched sections keep their defaults.
        assert_eq!(settings.timer.break_timer.break_minutes, 15);
        assert_eq!(store.matching_labels(""), vec!["reading"]);
    }
}
