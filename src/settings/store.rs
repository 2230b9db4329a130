// store.rs: pluggable persistence for the settings record (flat JSON object)

use crate::settings::model::Settings;
use serde_json::{Map, Value};
use std::cell::RefCell;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::PathBuf;
use std::rc::Rc;
use thiserror::Error;

pub type SettingsRecord = Map<String, Value>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("settings I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("settings record is not valid JSON: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("settings record is not a JSON object")]
    NotAnObject,
}

/// Opaque key/value storage for the settings record. Implementations only
/// promise get-all/put-all; merge semantics live in `Settings::from_record`.
pub trait SettingsStore {
    fn load(&self) -> Result<SettingsRecord, StoreError>;
    fn save(&self, record: &SettingsRecord) -> Result<(), StoreError>;
}

impl<S: SettingsStore + ?Sized> SettingsStore for Rc<S> {
    fn load(&self) -> Result<SettingsRecord, StoreError> {
        (**self).load()
    }
    fn save(&self, record: &SettingsRecord) -> Result<(), StoreError> {
        (**self).save(record)
    }
}

/// Load and defaults-merge, degrading to defaults when the store fails.
pub fn load_settings(store: &dyn SettingsStore) -> Settings {
    match store.load() {
        Ok(record) => Settings::from_record(&record),
        Err(e) => {
            tracing::warn!(error = %e, "failed to load settings, using defaults");
            Settings::default()
        }
    }
}

/// Keeps the record in memory. Used when no settings path is configured.
#[derive(Debug, Default)]
pub struct MemoryStore {
    record: RefCell<SettingsRecord>,
}

impl SettingsStore for MemoryStore {
    fn load(&self) -> Result<SettingsRecord, StoreError> {
        Ok(self.record.borrow().clone())
    }

    fn save(&self, record: &SettingsRecord) -> Result<(), StoreError> {
        *self.record.borrow_mut() = record.clone();
        Ok(())
    }
}

/// JSON file on disk; a missing file reads as an empty record.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }
}

impl SettingsStore for JsonFileStore {
    fn load(&self) -> Result<SettingsRecord, StoreError> {
        if !self.path.exists() {
            return Ok(SettingsRecord::new());
        }
        let file = File::open(&self.path)?;
        let reader = BufReader::new(file);
        let value: Value = serde_json::from_reader(reader)?;
        match value {
            Value::Object(map) => Ok(map),
            _ => Err(StoreError::NotAnObject),
        }
    }

    fn save(&self, record: &SettingsRecord) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let file = File::create(&self.path)?;
        let writer = BufWriter::new(file);
        serde_json::to_writer_pretty(writer, record)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_record() -> SettingsRecord {
        let mut record = SettingsRecord::new();
        record.insert("colorA".to_string(), Value::String("#123456".to_string()));
        record.insert("textScale".to_string(), Value::from(130));
        record
    }

    #[test]
    fn test_memory_store_round_trip() {
        let store = MemoryStore::default();
        assert!(store.load().unwrap().is_empty());
        store.save(&sample_record()).unwrap();
        assert_eq!(store.load().unwrap(), sample_record());
    }

    #[test]
    fn test_file_store_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("settings.json"));
        assert!(store.load().unwrap().is_empty());
    }

    #[test]
    fn test_file_store_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("settings.json"));
        store.save(&sample_record()).unwrap();
        assert_eq!(store.load().unwrap(), sample_record());
    }

    #[test]
    fn test_file_store_rejects_non_object() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "[1, 2, 3]").unwrap();
        let store = JsonFileStore::new(path);
        assert!(store.load().is_err());
    }

    #[test]
    fn test_file_store_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("nested/deep/settings.json"));
        store.save(&sample_record()).unwrap();
        assert_eq!(store.load().unwrap(), sample_record());
    }

    #[test]
    fn test_load_settings_merges_and_degrades() {
        let store = MemoryStore::default();
        store.save(&sample_record()).unwrap();
        let settings = load_settings(&store);
        assert_eq!(settings.color_a.as_str(), "#123456");
        assert_eq!(settings.text_scale, 130);
        assert_eq!(settings.color_b.as_str(), "#0000FF");

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "not json at all").unwrap();
        let settings = load_settings(&JsonFileStore::new(path));
        assert_eq!(settings, Settings::default());
    }
}
