use serde::{Deserialize, Serialize};

/// The UserProfile struct represents the marketplace account attached to the
/// current session. The session core only cares about its existence; the
/// fields are carried opaquely for the screens.
///
/// The backend serves profiles in camelCase, so the wire names follow suit.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_picture: Option<String>,
    pub is_verified: bool,
    pub rating: f64,
    pub review_count: i64,
}
