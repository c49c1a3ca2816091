use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use super::SecureStore;

/// An in-memory store for hosts without platform secure storage and for
/// tests. Sessions kept here die with the process, which is exactly the
/// fail-open behavior the lifecycle expects.
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SecureStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, String> {
        let entries = self
            .entries
            .lock()
            .map_err(|_| "memory store mutex poisoned".to_string())?;
        Ok(entries.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), String> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| "memory store mutex poisoned".to_string())?;
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), String> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| "memory store mutex poisoned".to_string())?;
        entries.remove(key);
        Ok(())
    }
}
