use chrono::{DateTime, Utc};
use mongodb::bson::Document;
use serde::{Deserialize, Serialize};

/// A notification record. `user_id: None` denotes a broadcast addressed to
/// every user existing at dispatch time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    #[serde(rename = "_id")]
    pub id: String,
    pub user_id: Option<String>,
    /// e.g. "message", "review", "booking", "announcement".
    pub kind: String,
    pub title: String,
    pub body: String,
    pub link: Option<String>,
    pub read: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extra_data: Option<Document>,
    pub created_at: DateTime<Utc>,
}
