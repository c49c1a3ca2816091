use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use super::{file_store::FileStore, memory_store::MemoryStore};
use crate::config::{StoreBackend, StoreConfig};

/// The SecureStore trait abstracts the host platform's secure key-value
/// storage (keychain, keystore, encrypted prefs). Values are opaque strings;
/// a missing key reads as `None`. Errors stay strings at this seam; the
/// transitions recover from them in place (fail-open reads, best-effort
/// writes) rather than surfacing them.
#[async_trait]
pub trait SecureStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, String>;
    async fn set(&self, key: &str, value: &str) -> Result<(), String>;
    async fn remove(&self, key: &str) -> Result<(), String>;
}

/// Creates a concrete store implementation based on the StoreConfig.
pub fn create_store(config: &StoreConfig) -> Arc<dyn SecureStore> {
    match &config.backend {
        StoreBackend::File(file_config) => {
            info!("Using file-backed secure store at '{}'.", file_config.path);
            Arc::new(FileStore::new(file_config))
        }
        StoreBackend::Memory => {
            info!("Using in-memory secure store; sessions will not survive a restart.");
            Arc::new(MemoryStore::new())
        }
    }
}
