use serde::{Deserialize, Serialize};

use crate::errors::SessionError;
use crate::models::UserProfile;

/// Credentials for the login endpoint.
#[derive(Serialize, Debug, Clone)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Payload for the register endpoint. The backend takes snake_case here,
/// unlike the camelCase it serves profiles in.
#[derive(Serialize, Debug, Clone)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub address: String,
    pub city: String,
    pub state: String,
    pub zip_code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

/// Partial profile update; only the supplied fields are sent.
#[derive(Serialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile_picture: Option<String>,
}

/// Canonical shape of every token-issuing response, after normalization.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthSuccess {
    pub user: UserProfile,
    pub access_token: String,
    pub refresh_token: Option<String>,
}

/// Wire shape of the token-issuing endpoints. Login and register answer
/// `access_token`/`refresh_token`, refresh answers `token` with no refresh
/// token; the alias folds both shapes into one struct so callers never see
/// the inconsistency.
#[derive(Deserialize, Debug)]
pub(crate) struct AuthResponseWire {
    pub user: UserProfile,
    #[serde(alias = "token")]
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
}

impl From<AuthResponseWire> for AuthSuccess {
    fn from(wire: AuthResponseWire) -> Self {
        AuthSuccess {
            user: wire.user,
            access_token: wire.access_token,
            refresh_token: wire.refresh_token,
        }
    }
}

/// The backend auth service as the session core sees it. The HTTP client
/// implements this; tests substitute scripted fakes.
#[async_trait::async_trait]
pub trait AuthBackend: Send + Sync {
    async fn login(&self, request: &LoginRequest) -> Result<AuthSuccess, SessionError>;
    async fn register(&self, request: &RegisterRequest) -> Result<AuthSuccess, SessionError>;
    /// Bearer-authenticated with the current access token, empty body.
    async fn refresh(&self, access_token: &str) -> Result<AuthSuccess, SessionError>;
    async fn fetch_profile(&self, access_token: &str) -> Result<UserProfile, SessionError>;
    async fn update_profile(
        &self,
        access_token: &str,
        update: &ProfileUpdate,
    ) -> Result<UserProfile, SessionError>;
    async fn forgot_password(&self, email: &str) -> Result<(), SessionError>;
    async fn reset_password(&self, token: &str, password: &str) -> Result<(), SessionError>;
}
