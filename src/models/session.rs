use serde::{Deserialize, Serialize};

use crate::models::user::UserProfile;

/// Storage key for the serialized [`PersistedSession`] record. The whole
/// session is kept under a single key so it flips atomically: there is no
/// window where the token is on disk but the user record is not.
pub const SESSION_KEY: &str = "auth_session";

/// In-memory view of the current session. This is the payload the
/// `SessionManager` mutates and everything else reads; it carries no
/// behavior beyond the token validity check.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct SessionSnapshot {
    pub user: Option<UserProfile>,
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    /// Epoch milliseconds of the last authenticated user action.
    pub last_activity_ms: Option<i64>,
    pub is_authenticated: bool,
    /// Set exactly once, after the first load-from-storage attempt finishes.
    /// Routing decisions must not be made before this is true.
    pub is_initialized: bool,
}

impl SessionSnapshot {
    /// The empty snapshot after initialization completed without a session.
    pub fn empty_initialized() -> Self {
        SessionSnapshot {
            is_initialized: true,
            ..Default::default()
        }
    }
}

/// The single record written to secure storage. Deliberately separate from
/// [`SessionSnapshot`]: the two in-memory flags have no business on disk.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct PersistedSession {
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    pub user: UserProfile,
    pub last_activity_ms: i64,
}

/// A token is usable only if it is non-empty and not one of the literal
/// strings a sloppy serializer produces for an absent value. Tokens like
/// "undefined" have been observed reaching storage in the wild.
pub fn token_is_usable(token: &str) -> bool {
    !token.is_empty() && token != "undefined" && token != "null"
}
