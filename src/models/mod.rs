pub mod session;
pub mod user;

// Re-export the primary types so code outside can do
// "use crate::models::{SessionSnapshot, UserProfile};"
pub use session::{PersistedSession, SessionSnapshot};
pub use user::UserProfile;
