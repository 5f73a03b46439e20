//! Settings storage backed by an in-memory map, optionally mirrored to a JSON file.

use async_trait::async_trait;
use bridge_traits::{
    error::{BridgeError, Result},
    storage::SettingsStore,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use tokio::sync::RwLock;
use tracing::{debug, error};

/// Typed setting value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
enum SettingValue {
    String(String),
    Bool(bool),
    F64(f64),
}

impl SettingValue {
    fn type_name(&self) -> &'static str {
        match self {
            SettingValue::String(_) => "string",
            SettingValue::Bool(_) => "bool",
            SettingValue::F64(_) => "f64",
        }
    }
}

/// Key-value settings store for desktop hosts and tests.
///
/// Provides:
/// - Type-checked value storage
/// - Optional write-through persistence to a JSON file (the desktop
///   counterpart of browser `localStorage`)
pub struct MemorySettingsStore {
    values: RwLock<BTreeMap<String, SettingValue>>,
    file: Option<PathBuf>,
}

impl MemorySettingsStore {
    /// Create an empty, purely in-memory store.
    pub fn new() -> Self {
        Self {
            values: RwLock::new(BTreeMap::new()),
            file: None,
        }
    }

    /// Open a store persisted at `path`, loading existing values if the file exists.
    pub async fn open(path: PathBuf) -> Result<Self> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(BridgeError::Io)?;
        }

        let values = match tokio::fs::read(&path).await {
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(|e| {
                BridgeError::OperationFailed(format!("Corrupted settings file: {}", e))
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(BridgeError::Io(e)),
        };

        debug!(path = ?path, "Initialized settings store");

        Ok(Self {
            values: RwLock::new(values),
            file: Some(path),
        })
    }

    async fn flush(&self, values: &BTreeMap<String, SettingValue>) -> Result<()> {
        let Some(path) = &self.file else {
            return Ok(());
        };

        let bytes = serde_json::to_vec_pretty(values)
            .map_err(|e| BridgeError::OperationFailed(format!("Serialize error: {}", e)))?;
        tokio::fs::write(path, bytes).await.map_err(BridgeError::Io)
    }

    async fn set_value(&self, key: &str, value: SettingValue) -> Result<()> {
        let mut values = self.values.write().await;
        let value_type = value.type_name();
        values.insert(key.to_string(), value);
        self.flush(&values).await?;

        debug!(key = key, value_type = value_type, "Stored setting");
        Ok(())
    }

    async fn get_value(&self, key: &str, expected_type: &str) -> Result<Option<SettingValue>> {
        let values = self.values.read().await;
        match values.get(key) {
            Some(value) if value.type_name() != expected_type => {
                error!(
                    key = key,
                    expected = expected_type,
                    actual = value.type_name(),
                    "Type mismatch"
                );
                Err(BridgeError::OperationFailed(format!(
                    "Type mismatch: expected {}, got {}",
                    expected_type,
                    value.type_name()
                )))
            }
            Some(value) => Ok(Some(value.clone())),
            None => Ok(None),
        }
    }
}

impl Default for MemorySettingsStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SettingsStore for MemorySettingsStore {
    async fn set_string(&self, key: &str, value: &str) -> Result<()> {
        self.set_value(key, SettingValue::String(value.to_string()))
            .await
    }

    async fn get_string(&self, key: &str) -> Result<Option<String>> {
        match self.get_value(key, "string").await? {
            Some(SettingValue::String(s)) => Ok(Some(s)),
            _ => Ok(None),
        }
    }

    async fn set_bool(&self, key: &str, value: bool) -> Result<()> {
        self.set_value(key, SettingValue::Bool(value)).await
    }

    async fn get_bool(&self, key: &str) -> Result<Option<bool>> {
        match self.get_value(key, "bool").await? {
            Some(SettingValue::Bool(b)) => Ok(Some(b)),
            _ => Ok(None),
        }
    }

    async fn set_f64(&self, key: &str, value: f64) -> Result<()> {
        self.set_value(key, SettingValue::F64(value)).await
    }

    async fn get_f64(&self, key: &str) -> Result<Option<f64>> {
        match self.get_value(key, "f64").await? {
            Some(SettingValue::F64(v)) => Ok(Some(v)),
            _ => Ok(None),
        }
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let mut values = self.values.write().await;
        values.remove(key);
        self.flush(&values).await?;

        debug!(key = key, "Deleted setting");
        Ok(())
    }

    async fn has_key(&self, key: &str) -> Result<bool> {
        Ok(self.values.read().await.contains_key(key))
    }

    async fn list_keys(&self) -> Result<Vec<String>> {
        Ok(self.values.read().await.keys().cloned().collect())
    }

    async fn clear_all(&self) -> Result<()> {
        let mut values = self.values.write().await;
        values.clear();
        self.flush(&values).await?;

        debug!("Cleared all settings");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_string_operations() {
        let store = MemorySettingsStore::new();

        store.set_string("test_key", "test_value").await.unwrap();
        let value = store.get_string("test_key").await.unwrap();
        assert_eq!(value, Some("test_value".to_string()));

        store.delete("test_key").await.unwrap();
        let value = store.get_string("test_key").await.unwrap();
        assert_eq!(value, None);
    }

    #[tokio::test]
    async fn test_typed_operations() {
        let store = MemorySettingsStore::new();

        store.set_bool("bool_key", true).await.unwrap();
        assert_eq!(store.get_bool("bool_key").await.unwrap(), Some(true));

        store.set_f64("f64_key", 0.7).await.unwrap();
        assert_eq!(store.get_f64("f64_key").await.unwrap(), Some(0.7));
    }

    #[tokio::test]
    async fn test_type_mismatch_is_an_error() {
        let store = MemorySettingsStore::new();
        store.set_bool("playback.loop", true).await.unwrap();

        assert!(store.get_f64("playback.loop").await.is_err());
    }

    #[tokio::test]
    async fn test_list_keys_sorted() {
        let store = MemorySettingsStore::new();

        store.set_string("key2", "value2").await.unwrap();
        store.set_string("key1", "value1").await.unwrap();

        let keys = store.list_keys().await.unwrap();
        assert_eq!(keys, vec!["key1", "key2"]);

        store.clear_all().await.unwrap();
        assert!(!store.has_key("key1").await.unwrap());
    }

    #[tokio::test]
    async fn test_file_round_trip() {
        let path = std::env::temp_dir()
            .join(format!("melodia_settings_{}", std::process::id()))
            .join("settings.json");
        let _ = tokio::fs::remove_file(&path).await;

        {
            let store = MemorySettingsStore::open(path.clone()).await.unwrap();
            store.set_f64("playback.volume", 0.25).await.unwrap();
            store.set_bool("playback.loop", true).await.unwrap();
        }

        let reopened = MemorySettingsStore::open(path.clone()).await.unwrap();
        assert_eq!(reopened.get_f64("playback.volume").await.unwrap(), Some(0.25));
        assert_eq!(reopened.get_bool("playback.loop").await.unwrap(), Some(true));

        let _ = tokio::fs::remove_file(&path).await;
    }
}
