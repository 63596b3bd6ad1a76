use serde::{Deserialize, Serialize};

/// A marketplace user. Accounts are provisioned by the identity service;
/// this backend only reads profiles and maintains the push delivery token.
#[derive(Debug, Serialize, Deserialize)]
pub struct User {
    #[serde(rename = "_id")]
    pub id: String,
    pub display_name: String,
    pub email: String,
    /// Push delivery token for the user's current device, when registered.
    pub fcm_token: Option<String>,
    /// "student" or "admin".
    pub role: String,
}
