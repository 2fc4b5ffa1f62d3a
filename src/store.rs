/*
 * This file is part of Buttonparts.
 *
 * Copyright (C) 2025 Buttonparts contributors
 *
 * Buttonparts is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * Buttonparts is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with Buttonparts. If not, see <https://www.gnu.org/licenses/>.
 */

//! User preference storage
//!
//! The sync pass only reads from the store. Writes come from the settings
//! layer (here: the `set` command).

use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{PartsError, Result};
use crate::registry::PrefValue;

/// Key-value access to persisted user choices
pub trait PreferenceStore: Send + Sync {
    /// Stored value for `key`, or `None` if the user never changed it
    fn user_value(&self, key: &str) -> Option<PrefValue>;

    /// Stored value list for multi-value preferences
    fn user_values(&self, key: &str) -> Option<Vec<PrefValue>>;

    fn set_user_value(&self, key: &str, value: PrefValue) -> Result<()>;
}

/// On-disk layout of the preferences file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoredPreferences {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default)]
    pub values: HashMap<String, PrefValue>,
    #[serde(default)]
    pub value_sets: HashMap<String, Vec<PrefValue>>,
}

fn default_version() -> u32 {
    1
}

/// Preferences persisted as pretty-printed JSON
pub struct JsonPreferenceStore {
    path: PathBuf,
    data: RwLock<StoredPreferences>,
}

impl JsonPreferenceStore {
    /// Open the store at `path`. A missing file is an empty store.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let data = if path.exists() {
            let contents = fs::read_to_string(&path)?;
            let data: StoredPreferences = serde_json::from_str(&contents)?;
            info!("Loaded {} preference(s) from {:?}", data.values.len(), path);
            data
        } else {
            debug!("No preferences file at {:?}, starting empty", path);
            StoredPreferences {
                version: default_version(),
                ..Default::default()
            }
        };

        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn save(&self, data: &StoredPreferences) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(data)?;

        // Write to a sibling temp file, then rename over the original
        let temp_path = self.path.with_extension("json.tmp");
        let mut file = fs::File::create(&temp_path)
            .map_err(|e| PartsError::config(format!("create {:?}: {}", temp_path, e)))?;
        file.write_all(json.as_bytes())?;
        file.sync_all()?;
        drop(file);
        fs::rename(&temp_path, &self.path)?;

        debug!("Saved preferences to {:?}", self.path);
        Ok(())
    }
}

impl PreferenceStore for JsonPreferenceStore {
    fn user_value(&self, key: &str) -> Option<PrefValue> {
        self.data.read().values.get(key).cloned()
    }

    fn user_values(&self, key: &str) -> Option<Vec<PrefValue>> {
        self.data.read().value_sets.get(key).cloned()
    }

    fn set_user_value(&self, key: &str, value: PrefValue) -> Result<()> {
        let mut data = self.data.write();
        data.values.insert(key.to_string(), value);
        self.save(&data)
    }
}

/// Volatile store, used when no preferences file is configured
#[derive(Debug, Default)]
pub struct MemoryPreferenceStore {
    data: RwLock<StoredPreferences>,
}

impl MemoryPreferenceStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_value(self, key: &str, value: PrefValue) -> Self {
        self.data.write().values.insert(key.to_string(), value);
        self
    }

    pub fn with_values(self, key: &str, values: Vec<PrefValue>) -> Self {
        self.data.write().value_sets.insert(key.to_string(), values);
        self
    }
}

impl PreferenceStore for MemoryPreferenceStore {
    fn user_value(&self, key: &str) -> Option<PrefValue> {
        self.data.read().values.get(key).cloned()
    }

    fn user_values(&self, key: &str) -> Option<Vec<PrefValue>> {
        self.data.read().value_sets.get(key).cloned()
    }

    fn set_user_value(&self, key: &str, value: PrefValue) -> Result<()> {
        self.data.write().values.insert(key.to_string(), value);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_is_empty_store() {
        let dir = TempDir::new().unwrap();
        let store = JsonPreferenceStore::open(dir.path().join("preferences.json")).unwrap();
        assert!(store.user_value("fp_home").is_none());
        assert!(store.user_values("fp_home").is_none());
    }

    #[test]
    fn test_set_persists_across_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("preferences.json");

        let store = JsonPreferenceStore::open(&path).unwrap();
        store.set_user_value("fp_home", PrefValue::Bool(true)).unwrap();
        store
            .set_user_value("fp_mode", PrefValue::Text("2".into()))
            .unwrap();

        let reopened = JsonPreferenceStore::open(&path).unwrap();
        assert_eq!(reopened.user_value("fp_home"), Some(PrefValue::Bool(true)));
        assert_eq!(reopened.user_value("fp_mode"), Some(PrefValue::Text("2".into())));
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[test]
    fn test_reads_value_sets() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("preferences.json");
        fs::write(
            &path,
            r#"{ "values": { "fp_wakeup": false }, "value_sets": { "fp_wakeup": ["2", "0"] } }"#,
        )
        .unwrap();

        let store = JsonPreferenceStore::open(&path).unwrap();
        assert_eq!(store.user_value("fp_wakeup"), Some(PrefValue::Bool(false)));
        assert_eq!(
            store.user_values("fp_wakeup"),
            Some(vec![PrefValue::Text("2".into()), PrefValue::Text("0".into())])
        );
    }

    #[test]
    fn test_corrupt_file_is_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("preferences.json");
        fs::write(&path, "{ not json").unwrap();

        assert!(matches!(
            JsonPreferenceStore::open(&path),
            Err(PartsError::JsonParse(_))
        ));
    }

    #[test]
    fn test_memory_store_builder() {
        let store = MemoryPreferenceStore::new().with_value("fp_home", PrefValue::Bool(true));
        assert_eq!(store.user_value("fp_home"), Some(PrefValue::Bool(true)));
        store.set_user_value("fp_home", PrefValue::Bool(false)).unwrap();
        assert_eq!(store.user_value("fp_home"), Some(PrefValue::Bool(false)));
    }
}
