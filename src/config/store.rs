use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::store::file_store::FileStoreConfig;

/// A wrapper for the secure-store configuration.
#[derive(Deserialize, Serialize, Debug, JsonSchema)]
pub struct StoreConfig {
    #[serde(flatten)]
    pub backend: StoreBackend,
}

/// The available store backends. We differentiate them via a "type" tag in
/// the YAML.
#[derive(Deserialize, Serialize, Debug, JsonSchema)]
#[serde(tag = "type")]
pub enum StoreBackend {
    #[serde(rename = "file")]
    File(FileStoreConfig),
    /// Process-local only; used when the host provides no durable secure
    /// storage, and by tests.
    #[serde(rename = "memory")]
    Memory,
}
