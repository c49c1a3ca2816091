pub mod base;
pub mod http_backend;

// Re-export from base.rs so we can do "use crate::backend::*;"
pub use base::{AuthBackend, AuthSuccess, LoginRequest, ProfileUpdate, RegisterRequest};
pub use http_backend::HttpAuthBackend;
