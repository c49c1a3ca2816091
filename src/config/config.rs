use figment::providers::{Env, Format, Yaml};
use figment::Figment;
use schemars::{schema_for, JsonSchema};
use serde::{Deserialize, Serialize};

use super::logging::LoggingConfig;
use super::store::StoreConfig;

/// A top-level enum for versioned configurations.
#[derive(Deserialize, Serialize, JsonSchema)]
#[serde(tag = "version")]
pub enum Config {
    #[serde(rename = "1.0.0")]
    ConfigV1(ConfigV1),
}

/// Main config for v1.0.0, containing the backend API endpoint, session
/// policy, secure store, and logging sections.
#[derive(Deserialize, Serialize, Debug, JsonSchema)]
pub struct ConfigV1 {
    pub api: ApiConfig,
    #[serde(default)]
    pub session: SessionConfig,
    pub store: StoreConfig,
    pub logging: LoggingConfig,
}

/// Where the backend auth service lives and how long to wait for it.
#[derive(Deserialize, Serialize, Debug, JsonSchema, Clone)]
pub struct ApiConfig {
    /// Base URL of the backend, e.g. "https://api.example.com/dev".
    pub base_url: String,
    #[serde(default = "default_request_timeout_in_ms")]
    pub request_timeout_in_ms: u64,
}

fn default_request_timeout_in_ms() -> u64 {
    10_000
}

/// Session policy knobs.
#[derive(Deserialize, Serialize, Debug, JsonSchema, Clone)]
pub struct SessionConfig {
    /// Inactivity window after which the session is considered expired.
    #[serde(default = "default_timeout_in_secs")]
    pub timeout_in_secs: i64,
}

fn default_timeout_in_secs() -> i64 {
    // One hour of inactivity.
    3600
}

impl Default for SessionConfig {
    fn default() -> Self {
        SessionConfig {
            timeout_in_secs: default_timeout_in_secs(),
        }
    }
}

/// Load config from a YAML file named "config.yaml" in the current
/// directory, with SESSIONTRON_* environment overrides on top.
pub fn load_config() -> ConfigV1 {
    let figment = Figment::new()
        .merge(Yaml::file("./config.yaml"))
        .merge(Env::prefixed("SESSIONTRON_").split("__"));
    let config = match figment.extract::<Config>() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Error loading configuration: {}", e);
            std::process::exit(1);
        }
    };
    match config {
        Config::ConfigV1(c) => c,
    }
}

/// Print the JSON schema for the configuration to stdout.
pub fn print_schema() {
    let schema = schema_for!(Config);
    println!("{}", serde_json::to_string_pretty(&schema).unwrap());
}
