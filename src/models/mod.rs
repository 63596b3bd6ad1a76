pub mod listing;
pub mod message;
pub mod notification;
pub mod user;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A user's saved listing. `item_type` carries the listing variant so one
/// collection serves all three listing kinds.
#[derive(Debug, Serialize, Deserialize)]
pub struct Favorite {
    #[serde(rename = "_id")]
    pub id: String,
    pub user_id: String,
    pub item_id: String,
    pub item_type: String,
}

/// A review left on a listing. `reviewee_id` is the listing owner at the time
/// the review was written.
#[derive(Debug, Serialize, Deserialize)]
pub struct Review {
    #[serde(rename = "_id")]
    pub id: String,
    pub listing_id: String,
    pub listing_type: String,
    pub reviewer_id: String,
    pub reviewee_id: String,
    pub rating: i32,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A booking request against an accommodation listing.
#[derive(Debug, Serialize, Deserialize)]
pub struct Booking {
    #[serde(rename = "_id")]
    pub id: String,
    pub accommodation_id: String,
    pub customer_id: String,
    /// "pending", "confirmed" or "cancelled".
    pub status: String,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}
