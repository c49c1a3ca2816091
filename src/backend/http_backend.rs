use std::time::Duration;

use reqwest::Response;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use super::base::{
    AuthBackend, AuthResponseWire, AuthSuccess, LoginRequest, ProfileUpdate, RegisterRequest,
};
use crate::config::ApiConfig;
use crate::errors::SessionError;
use crate::models::UserProfile;

/// Reqwest-backed client for the `/v1/auth/*` endpoints.
pub struct HttpAuthBackend {
    client: reqwest::Client,
    base_url: String,
}

impl HttpAuthBackend {
    pub fn new(config: &ApiConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_in_ms))
            .build()
            .expect("failed to build HTTP client");
        HttpAuthBackend {
            client,
            // Trailing slashes double up in the joined URLs.
            base_url: config.base_url.trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Pull the backend's error message out of a non-success response body,
    /// falling back to the raw body when it isn't the usual JSON envelope.
    async fn api_error(response: Response) -> SessionError {
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<Value>(&body)
            .ok()
            .and_then(|v| {
                v.get("message")
                    .or_else(|| v.get("error"))
                    .and_then(|m| m.as_str())
                    .map(str::to_string)
            })
            .unwrap_or(body);
        warn!("Backend auth request failed with status {}: {}", status, message);
        SessionError::Api { status, message }
    }

    async fn read_auth_response(response: Response) -> Result<AuthSuccess, SessionError> {
        if !response.status().is_success() {
            return Err(Self::api_error(response).await);
        }
        let wire: AuthResponseWire = response.json().await?;
        Ok(wire.into())
    }
}

#[derive(Deserialize)]
struct MessageResponse {
    #[allow(dead_code)]
    message: String,
}

#[async_trait::async_trait]
impl AuthBackend for HttpAuthBackend {
    async fn login(&self, request: &LoginRequest) -> Result<AuthSuccess, SessionError> {
        debug!("Sending login request for '{}'", request.email);
        let response = self
            .client
            .post(self.url("/v1/auth/login"))
            .json(request)
            .send()
            .await?;
        Self::read_auth_response(response).await
    }

    async fn register(&self, request: &RegisterRequest) -> Result<AuthSuccess, SessionError> {
        debug!("Sending register request for '{}'", request.email);
        let response = self
            .client
            .post(self.url("/v1/auth/register"))
            .json(request)
            .send()
            .await?;
        Self::read_auth_response(response).await
    }

    async fn refresh(&self, access_token: &str) -> Result<AuthSuccess, SessionError> {
        debug!("Sending token refresh request");
        let response = self
            .client
            .post(self.url("/v1/auth/refresh"))
            .bearer_auth(access_token)
            .send()
            .await?;
        Self::read_auth_response(response).await
    }

    async fn fetch_profile(&self, access_token: &str) -> Result<UserProfile, SessionError> {
        let response = self
            .client
            .get(self.url("/v1/auth/profile"))
            .bearer_auth(access_token)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(Self::api_error(response).await);
        }
        Ok(response.json().await?)
    }

    async fn update_profile(
        &self,
        access_token: &str,
        update: &ProfileUpdate,
    ) -> Result<UserProfile, SessionError> {
        let response = self
            .client
            .put(self.url("/v1/auth/profile"))
            .bearer_auth(access_token)
            .json(update)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(Self::api_error(response).await);
        }
        Ok(response.json().await?)
    }

    async fn forgot_password(&self, email: &str) -> Result<(), SessionError> {
        let response = self
            .client
            .post(self.url("/v1/auth/forgot-password"))
            .json(&serde_json::json!({ "email": email }))
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(Self::api_error(response).await);
        }
        let _: MessageResponse = response.json().await?;
        Ok(())
    }

    async fn reset_password(&self, token: &str, password: &str) -> Result<(), SessionError> {
        let response = self
            .client
            .post(self.url("/v1/auth/reset-password"))
            .json(&serde_json::json!({ "token": token, "password": password }))
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(Self::api_error(response).await);
        }
        let _: MessageResponse = response.json().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Server;

    fn backend_for(server: &Server) -> HttpAuthBackend {
        HttpAuthBackend::new(&ApiConfig {
            base_url: server.url(),
            request_timeout_in_ms: 3000,
        })
    }

    const USER_JSON: &str = r#"{"id":"u-1","email":"adam@example.com","firstName":"Adam",
        "lastName":"First","address":"1 Garden Way","isVerified":true,
        "rating":4.5,"reviewCount":12}"#;

    /// Login returns the access_token/refresh_token shape; both tokens land
    /// in the normalized result.
    #[tokio::test]
    async fn test_login_normalizes_tokens() {
        let mut server = Server::new_async().await;
        let body = format!(
            r#"{{"user":{},"access_token":"tok123","refresh_token":"ref456"}}"#,
            USER_JSON
        );
        let m = server
            .mock("POST", "/v1/auth/login")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(body)
            .create_async()
            .await;

        let backend = backend_for(&server);
        let auth = backend
            .login(&LoginRequest {
                email: "adam@example.com".to_string(),
                password: "secret".to_string(),
            })
            .await
            .expect("login should succeed");

        m.assert_async().await;
        assert_eq!(auth.access_token, "tok123");
        assert_eq!(auth.refresh_token.as_deref(), Some("ref456"));
        assert_eq!(auth.user.id, "u-1");
    }

    /// Refresh returns the `token` shape and sends the current token as a
    /// bearer credential.
    #[tokio::test]
    async fn test_refresh_normalizes_token_field() {
        let mut server = Server::new_async().await;
        let body = format!(r#"{{"user":{},"token":"tok-next"}}"#, USER_JSON);
        let m = server
            .mock("POST", "/v1/auth/refresh")
            .match_header("authorization", "Bearer tok-old")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(body)
            .create_async()
            .await;

        let backend = backend_for(&server);
        let auth = backend
            .refresh("tok-old")
            .await
            .expect("refresh should succeed");

        m.assert_async().await;
        assert_eq!(auth.access_token, "tok-next");
        assert_eq!(auth.refresh_token, None);
    }

    /// A 401 on refresh surfaces as an Api error carrying the backend's
    /// message, not a parse failure.
    #[tokio::test]
    async fn test_refresh_rejected_maps_to_api_error() {
        let mut server = Server::new_async().await;
        let m = server
            .mock("POST", "/v1/auth/refresh")
            .with_status(401)
            .with_header("content-type", "application/json")
            .with_body(r#"{"message":"token expired"}"#)
            .create_async()
            .await;

        let backend = backend_for(&server);
        let err = backend
            .refresh("tok-old")
            .await
            .expect_err("refresh should be rejected");

        m.assert_async().await;
        match err {
            SessionError::Api { status, message } => {
                assert_eq!(status, 401);
                assert_eq!(message, "token expired");
            }
            other => panic!("expected Api error, got {:?}", other),
        }
    }

    /// Profile update is a bearer-authenticated PUT answering a bare profile.
    #[tokio::test]
    async fn test_update_profile() {
        let mut server = Server::new_async().await;
        let m = server
            .mock("PUT", "/v1/auth/profile")
            .match_header("authorization", "Bearer tok123")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(USER_JSON)
            .create_async()
            .await;

        let backend = backend_for(&server);
        let user = backend
            .update_profile(
                "tok123",
                &ProfileUpdate {
                    phone: Some("555-0100".to_string()),
                    ..Default::default()
                },
            )
            .await
            .expect("update should succeed");

        m.assert_async().await;
        assert_eq!(user.email, "adam@example.com");
    }
}
