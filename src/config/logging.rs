use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// LoggingConfig controls how the session client initializes tracing.
#[derive(Deserialize, Serialize, Debug, JsonSchema)]
pub struct LoggingConfig {
    /// One of "trace", "debug", "info", "warn", "error".
    pub level: String,
    /// "json" for shipped logs, "console" for development output.
    pub format: String,
}
