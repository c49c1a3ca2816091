use std::path::PathBuf;

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio::sync::Mutex;
use tracing::debug;

use super::SecureStore;

/// The config struct for the file-backed store: where the JSON file lives.
#[derive(Deserialize, Serialize, JsonSchema, Debug, Clone)]
pub struct FileStoreConfig {
    pub path: String,
}

/// A concrete `SecureStore` implementation backed by a single JSON object
/// file. Writes go to a sibling temp file which is then renamed over the
/// target, so readers only ever observe a complete file.
///
/// The async mutex serializes read-modify-write cycles within this process;
/// cross-process locking is out of scope for a single-app store.
pub struct FileStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileStore {
    pub fn new(config: &FileStoreConfig) -> Self {
        FileStore {
            path: PathBuf::from(&config.path),
            write_lock: Mutex::new(()),
        }
    }

    async fn load_entries(&self) -> Result<Map<String, Value>, String> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => match serde_json::from_str::<Value>(&contents) {
                Ok(Value::Object(map)) => Ok(map),
                Ok(_) => Err(format!(
                    "store file '{}' is not a JSON object",
                    self.path.display()
                )),
                Err(e) => Err(format!("store file parse error: {}", e)),
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Map::new()),
            Err(e) => Err(format!("store file read error: {}", e)),
        }
    }

    async fn save_entries(&self, entries: &Map<String, Value>) -> Result<(), String> {
        let serialized = serde_json::to_string(&Value::Object(entries.clone()))
            .map_err(|e| format!("store serialization error: {}", e))?;

        let tmp_path = self.path.with_extension("tmp");
        tokio::fs::write(&tmp_path, serialized.as_bytes())
            .await
            .map_err(|e| format!("store file write error: {}", e))?;
        tokio::fs::rename(&tmp_path, &self.path)
            .await
            .map_err(|e| format!("store file rename error: {}", e))?;

        debug!("Wrote {} store entries to '{}'", entries.len(), self.path.display());
        Ok(())
    }
}

#[async_trait]
impl SecureStore for FileStore {
    async fn get(&self, key: &str) -> Result<Option<String>, String> {
        let entries = self.load_entries().await?;
        Ok(entries
            .get(key)
            .and_then(|v| v.as_str())
            .map(|s| s.to_string()))
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), String> {
        let _guard = self.write_lock.lock().await;
        let mut entries = self.load_entries().await?;
        entries.insert(key.to_string(), Value::from(value));
        self.save_entries(&entries).await
    }

    async fn remove(&self, key: &str) -> Result<(), String> {
        let _guard = self.write_lock.lock().await;
        let mut entries = self.load_entries().await?;
        if entries.remove(key).is_none() {
            return Ok(());
        }
        self.save_entries(&entries).await
    }
}
