//! Error taxonomy for the session core.
//!
//! Every lifecycle transition is total: failures in the side-effecting half
//! are caught at the transition boundary, so observers never see a
//! half-applied snapshot. Network failures map to the variants below;
//! storage failures are recovered in place (reads fail open to
//! unauthenticated, writes are best-effort and logged) and never surface
//! as an error value.

/// Errors surfaced by session transitions and the backend client.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// `persist` was called without a usable access token. Nothing was
    /// written, in memory or in storage.
    #[error("cannot persist session: access token is missing or empty")]
    MissingToken,

    /// The backend refused the refresh call or was unreachable. The session
    /// has already been cleared when this is returned.
    #[error("token refresh rejected: {0}")]
    RefreshRejected(String),

    /// The inactivity window elapsed; the session has been cleared.
    #[error("session expired")]
    Expired,

    /// Transport-level failure talking to the backend auth service.
    #[error("backend request failed: {0}")]
    Backend(#[from] reqwest::Error),

    /// The backend answered with a non-success status.
    #[error("backend returned {status}: {message}")]
    Api { status: u16, message: String },
}
