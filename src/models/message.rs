use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A message between two users about a specific listing.
#[derive(Debug, Serialize, Deserialize)]
pub struct Message {
    #[serde(rename = "_id")]
    pub id: String,
    pub listing_id: String,
    pub listing_type: String,
    pub conversation_id: String,
    pub sender_id: String,
    pub receiver_id: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// Derives the conversation id for a (listing, participant pair) triple.
/// Symmetric in the two participants so both sides land in the same thread.
pub fn conversation_id(listing_id: &str, user_a: &str, user_b: &str) -> String {
    let (first, second) = if user_a <= user_b {
        (user_a, user_b)
    } else {
        (user_b, user_a)
    };
    format!("{}:{}:{}", listing_id, first, second)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conversation_id_is_symmetric() {
        assert_eq!(
            conversation_id("P123", "alice", "bob"),
            conversation_id("P123", "bob", "alice")
        );
        assert_ne!(
            conversation_id("P123", "alice", "bob"),
            conversation_id("P124", "alice", "bob")
        );
    }
}
