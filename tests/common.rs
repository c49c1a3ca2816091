use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use figment::providers::{Format, Yaml};
use figment::Figment;
use tokio::sync::Notify;

use sessiontron::backend::{
    AuthBackend, AuthSuccess, LoginRequest, ProfileUpdate, RegisterRequest,
};
use sessiontron::config::{Config, ConfigV1};
use sessiontron::errors::SessionError;
use sessiontron::models::UserProfile;
use sessiontron::session::SessionManager;
use sessiontron::store::memory_store::MemoryStore;
use sessiontron::store::SecureStore;

pub const TEST_CONFIG: &str = r#"
version: "1.0.0"
api:
  base_url: "https://api.example.test/dev"
  request_timeout_in_ms: 3000
session:
  timeout_in_secs: 3600
store:
  type: "memory"
logging:
  level: "debug"
  format: "console"
"#;

pub fn load_test_config() -> ConfigV1 {
    let config: Config = Figment::new()
        .merge(Yaml::string(TEST_CONFIG))
        .extract()
        .expect("Failed to parse test config YAML");

    match config {
        Config::ConfigV1(cfg) => cfg,
    }
}

pub fn sample_user(id: &str) -> UserProfile {
    UserProfile {
        id: id.to_string(),
        email: format!("{}@example.com", id),
        first_name: "Adam".to_string(),
        last_name: "First".to_string(),
        address: "1 Garden Way".to_string(),
        phone: None,
        profile_picture: None,
        is_verified: true,
        rating: 4.5,
        review_count: 12,
    }
}

pub fn ok_auth(id: &str, token: &str, refresh_token: Option<&str>) -> AuthSuccess {
    AuthSuccess {
        user: sample_user(id),
        access_token: token.to_string(),
        refresh_token: refresh_token.map(str::to_string),
    }
}

fn unscripted(endpoint: &str) -> SessionError {
    SessionError::Api {
        status: 500,
        message: format!("unscripted {} call", endpoint),
    }
}

/// A scriptable stand-in for the backend auth service. Responses are queued
/// per endpoint; an unscripted call answers a 500. `hold_refresh` lets a test
/// park a refresh call mid-flight to race it against other transitions.
#[derive(Default)]
pub struct FakeBackend {
    login_responses: Mutex<VecDeque<Result<AuthSuccess, SessionError>>>,
    refresh_responses: Mutex<VecDeque<Result<AuthSuccess, SessionError>>>,
    pub refresh_calls: AtomicUsize,
    /// Signalled when a refresh call reaches the backend.
    pub refresh_entered: Notify,
    release_refresh: Mutex<Option<Arc<Notify>>>,
}

impl FakeBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn push_login(&self, response: Result<AuthSuccess, SessionError>) {
        self.login_responses.lock().unwrap().push_back(response);
    }

    pub fn push_refresh(&self, response: Result<AuthSuccess, SessionError>) {
        self.refresh_responses.lock().unwrap().push_back(response);
    }

    /// Make the next refresh call block until the returned handle is
    /// notified.
    pub fn hold_refresh(&self) -> Arc<Notify> {
        let release = Arc::new(Notify::new());
        *self.release_refresh.lock().unwrap() = Some(release.clone());
        release
    }
}

#[async_trait]
impl AuthBackend for FakeBackend {
    async fn login(&self, _request: &LoginRequest) -> Result<AuthSuccess, SessionError> {
        self.login_responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(unscripted("login")))
    }

    async fn register(&self, _request: &RegisterRequest) -> Result<AuthSuccess, SessionError> {
        Err(unscripted("register"))
    }

    async fn refresh(&self, _access_token: &str) -> Result<AuthSuccess, SessionError> {
        self.refresh_calls.fetch_add(1, Ordering::SeqCst);
        self.refresh_entered.notify_one();
        let release = self.release_refresh.lock().unwrap().take();
        if let Some(release) = release {
            release.notified().await;
        }
        self.refresh_responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(unscripted("refresh")))
    }

    async fn fetch_profile(&self, _access_token: &str) -> Result<UserProfile, SessionError> {
        Err(unscripted("fetch_profile"))
    }

    async fn update_profile(
        &self,
        _access_token: &str,
        _update: &ProfileUpdate,
    ) -> Result<UserProfile, SessionError> {
        Err(unscripted("update_profile"))
    }

    async fn forgot_password(&self, _email: &str) -> Result<(), SessionError> {
        Err(unscripted("forgot_password"))
    }

    async fn reset_password(&self, _token: &str, _password: &str) -> Result<(), SessionError> {
        Err(unscripted("reset_password"))
    }
}

/// A store wrapper that can park a `set` call mid-flight, for racing other
/// transitions against a storage write.
#[derive(Default)]
pub struct HoldStore {
    inner: MemoryStore,
    /// Signalled when a held `set` call reaches the store.
    pub set_entered: Notify,
    release_set: Mutex<Option<Arc<Notify>>>,
}

impl HoldStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Make the next `set` call block until the returned handle is notified.
    pub fn hold_set(&self) -> Arc<Notify> {
        let release = Arc::new(Notify::new());
        *self.release_set.lock().unwrap() = Some(release.clone());
        release
    }
}

#[async_trait]
impl SecureStore for HoldStore {
    async fn get(&self, key: &str) -> Result<Option<String>, String> {
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), String> {
        let release = self.release_set.lock().unwrap().take();
        if let Some(release) = release {
            self.set_entered.notify_one();
            release.notified().await;
        }
        self.inner.set(key, value).await
    }

    async fn remove(&self, key: &str) -> Result<(), String> {
        self.inner.remove(key).await
    }
}

/// A store whose every call fails, standing in for broken platform storage.
pub struct FailStore;

#[async_trait]
impl SecureStore for FailStore {
    async fn get(&self, _key: &str) -> Result<Option<String>, String> {
        Err("secure storage unavailable".to_string())
    }

    async fn set(&self, _key: &str, _value: &str) -> Result<(), String> {
        Err("secure storage unavailable".to_string())
    }

    async fn remove(&self, _key: &str) -> Result<(), String> {
        Err("secure storage unavailable".to_string())
    }
}

pub struct TestHarness {
    pub manager: Arc<SessionManager>,
    pub store: Arc<MemoryStore>,
    pub backend: Arc<FakeBackend>,
}

/// Build a manager over an in-memory store and a scripted backend, using the
/// session section of the shared test config.
pub fn build_harness() -> TestHarness {
    let backend = FakeBackend::new();
    let store = Arc::new(MemoryStore::new());
    let manager = Arc::new(SessionManager::new(
        backend.clone(),
        store.clone() as Arc<dyn SecureStore>,
        &load_test_config().session,
    ));
    TestHarness {
        manager,
        store,
        backend,
    }
}
