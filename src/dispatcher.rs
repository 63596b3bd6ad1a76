// src/dispatcher.rs
//
// Creates notification records and fans out best-effort push delivery.
// Record creation and push delivery are independent: a dead or unconfigured
// gateway never prevents the record from being written.

use chrono::Utc;
use futures_util::{stream, StreamExt};
use log::{error, warn};
use mongodb::bson::{doc, to_document, Bson, Document};
use uuid::Uuid;

use crate::errors::ActionError;
use crate::models::notification::Notification;
use crate::push::{PushMessage, PushOutcome, PushSender};
use crate::store::{DocumentStore, NOTIFICATIONS, USERS};

/// Upper bound on concurrent deliveries during a broadcast fan-out.
const PUSH_FANOUT_LIMIT: usize = 16;

#[derive(Debug, Clone)]
pub struct NotificationInput {
    /// `None` broadcasts to every current user.
    pub user_id: Option<String>,
    pub kind: String,
    pub title: String,
    pub body: String,
    pub link: Option<String>,
    pub extra_data: Option<Document>,
}

/// Inserts the notification record. No push is attempted.
pub async fn create_notification(
    store: &dyn DocumentStore,
    input: &NotificationInput,
) -> Result<Notification, ActionError> {
    let notification = Notification {
        id: Uuid::new_v4().to_string(),
        user_id: input.user_id.clone(),
        kind: input.kind.clone(),
        title: input.title.clone(),
        body: input.body.clone(),
        link: input.link.clone(),
        read: false,
        extra_data: input.extra_data.clone(),
        created_at: Utc::now(),
    };
    store
        .insert_one(NOTIFICATIONS, to_document(&notification)?)
        .await?;
    Ok(notification)
}

/// Creates the notification record, then attempts push delivery.
///
/// Targeted input pushes to that user's registered token, if any; broadcast
/// input pushes to every user holding a token at dispatch time. Delivery
/// failures are logged and swallowed.
pub async fn notify_and_push(
    store: &dyn DocumentStore,
    push: &dyn PushSender,
    input: NotificationInput,
) -> Result<Notification, ActionError> {
    let notification = create_notification(store, &input).await?;

    match &input.user_id {
        Some(user_id) => push_to_user(store, push, user_id, &input).await,
        None => push_broadcast(store, push, &input).await,
    }

    Ok(notification)
}

async fn push_to_user(
    store: &dyn DocumentStore,
    push: &dyn PushSender,
    user_id: &str,
    input: &NotificationInput,
) {
    let user = match store.find_one(USERS, doc! { "_id": user_id }).await {
        Ok(Some(user)) => user,
        Ok(None) => return,
        Err(err) => {
            error!("could not load user {} for push: {}", user_id, err);
            return;
        }
    };

    let token = match user.get_str("fcm_token") {
        Ok(token) if !token.is_empty() => token.to_string(),
        _ => return,
    };

    let outcome = push
        .send(PushMessage::new(
            token,
            input.title.clone(),
            input.body.clone(),
            input.link.clone(),
        ))
        .await;
    if let PushOutcome::Failed(reason) = outcome {
        warn!("push to user {} failed: {}", user_id, reason);
    }
}

async fn push_broadcast(store: &dyn DocumentStore, push: &dyn PushSender, input: &NotificationInput) {
    let users = match store.find_many(USERS, doc! {}).await {
        Ok(users) => users,
        Err(err) => {
            error!("could not enumerate users for broadcast push: {}", err);
            return;
        }
    };

    let tokens: Vec<String> = users
        .iter()
        .filter_map(|user| user.get_str("fcm_token").ok())
        .filter(|token| !token.is_empty())
        .map(str::to_owned)
        .collect();

    stream::iter(tokens)
        .map(|token| {
            push.send(PushMessage::new(
                token,
                input.title.clone(),
                input.body.clone(),
                input.link.clone(),
            ))
        })
        .buffer_unordered(PUSH_FANOUT_LIMIT)
        .for_each(|outcome| async move {
            if let PushOutcome::Failed(reason) = outcome {
                warn!("broadcast push delivery failed: {}", reason);
            }
        })
        .await;
}

/// Marks a single notification as read. `read` only ever moves false→true.
pub async fn mark_read(store: &dyn DocumentStore, id: &str) -> Result<(), ActionError> {
    let matched = store
        .update_one(
            NOTIFICATIONS,
            doc! { "_id": id },
            doc! { "$set": { "read": true } },
        )
        .await?;
    if matched == 0 {
        return Err(ActionError::NotFound);
    }
    Ok(())
}

/// Marks every unread notification addressed to `user_id` as read and returns
/// how many were flipped.
pub async fn mark_all_read(store: &dyn DocumentStore, user_id: &str) -> Result<u64, ActionError> {
    store
        .update_many(
            NOTIFICATIONS,
            doc! { "user_id": user_id, "read": false },
            doc! { "$set": { "read": true } },
        )
        .await
}

pub async fn delete_notification(store: &dyn DocumentStore, id: &str) -> Result<(), ActionError> {
    let deleted = store.delete_one(NOTIFICATIONS, doc! { "_id": id }).await?;
    if deleted == 0 {
        return Err(ActionError::NotFound);
    }
    Ok(())
}

/// Filter matching notifications visible to one user: their own plus
/// broadcasts.
pub fn visible_to(user_id: &str) -> Document {
    doc! { "$or": [ { "user_id": user_id }, { "user_id": Bson::Null } ] }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::MemoryStore;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct RecordingPush {
        sent: Mutex<Vec<PushMessage>>,
        outcome: PushOutcome,
    }

    impl RecordingPush {
        fn new(outcome: PushOutcome) -> Self {
            RecordingPush {
                sent: Mutex::new(Vec::new()),
                outcome,
            }
        }

        fn sent_tokens(&self) -> Vec<String> {
            self.sent
                .lock()
                .unwrap()
                .iter()
                .map(|m| m.token.clone())
                .collect()
        }
    }

    #[async_trait]
    impl PushSender for RecordingPush {
        async fn send(&self, message: PushMessage) -> PushOutcome {
            self.sent.lock().unwrap().push(message);
            self.outcome.clone()
        }
    }

    fn input(user_id: Option<&str>) -> NotificationInput {
        NotificationInput {
            user_id: user_id.map(str::to_owned),
            kind: "announcement".to_string(),
            title: "Maintenance window".to_string(),
            body: "The marketplace goes offline tonight".to_string(),
            link: Some("/announcements/1".to_string()),
            extra_data: None,
        }
    }

    fn seed_users(store: &MemoryStore) {
        store.seed(
            USERS,
            vec![
                doc! { "_id": "u1", "fcm_token": "tok-1", "role": "student" },
                doc! { "_id": "u2", "fcm_token": "", "role": "student" },
                doc! { "_id": "u3", "role": "student" },
                doc! { "_id": "u4", "fcm_token": "tok-4", "role": "admin" },
            ],
        );
    }

    #[tokio::test]
    async fn broadcast_creates_one_record_and_pushes_to_token_holders() {
        let store = MemoryStore::new();
        seed_users(&store);
        let push = RecordingPush::new(PushOutcome::Sent);

        let notification = notify_and_push(&store, &push, input(None)).await.unwrap();
        assert!(notification.user_id.is_none());
        assert!(!notification.read);

        let records = store.dump(NOTIFICATIONS);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].get("user_id"), Some(&Bson::Null));

        let mut tokens = push.sent_tokens();
        tokens.sort();
        assert_eq!(tokens, vec!["tok-1".to_string(), "tok-4".to_string()]);
    }

    #[tokio::test]
    async fn targeted_push_uses_registered_token() {
        let store = MemoryStore::new();
        seed_users(&store);
        let push = RecordingPush::new(PushOutcome::Sent);

        notify_and_push(&store, &push, input(Some("u1"))).await.unwrap();

        let sent = push.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].token, "tok-1");
        assert_eq!(sent[0].data.link, "/announcements/1");
    }

    #[tokio::test]
    async fn targeted_user_without_token_gets_record_but_no_push() {
        let store = MemoryStore::new();
        seed_users(&store);
        let push = RecordingPush::new(PushOutcome::Sent);

        let result = notify_and_push(&store, &push, input(Some("u3"))).await;
        assert!(result.is_ok());
        assert_eq!(store.count(NOTIFICATIONS), 1);
        assert!(push.sent_tokens().is_empty());
    }

    #[tokio::test]
    async fn unavailable_gateway_still_creates_record() {
        let store = MemoryStore::new();
        seed_users(&store);
        let push = RecordingPush::new(PushOutcome::Unavailable);

        let result = notify_and_push(&store, &push, input(None)).await;
        assert!(result.is_ok());
        assert_eq!(store.count(NOTIFICATIONS), 1);
    }

    #[tokio::test]
    async fn per_user_delivery_failures_are_swallowed() {
        let store = MemoryStore::new();
        seed_users(&store);
        let push = RecordingPush::new(PushOutcome::Failed("device gone".to_string()));

        let result = notify_and_push(&store, &push, input(None)).await;
        assert!(result.is_ok());
        assert_eq!(push.sent_tokens().len(), 2);
    }

    #[tokio::test]
    async fn mark_all_read_is_scoped_to_one_user() {
        let store = MemoryStore::new();
        store.seed(
            NOTIFICATIONS,
            vec![
                doc! { "_id": "n1", "user_id": "alice", "read": false },
                doc! { "_id": "n2", "user_id": "alice", "read": false },
                doc! { "_id": "n3", "user_id": "alice", "read": true },
                doc! { "_id": "n4", "user_id": "bob", "read": false },
            ],
        );

        let flipped = mark_all_read(&store, "alice").await.unwrap();
        assert_eq!(flipped, 2);

        for record in store.dump(NOTIFICATIONS) {
            let expected = record.get_str("user_id").unwrap() == "alice";
            if expected {
                assert!(record.get_bool("read").unwrap());
            }
        }
        let bob = store
            .find_one(NOTIFICATIONS, doc! { "_id": "n4" })
            .await
            .unwrap()
            .unwrap();
        assert!(!bob.get_bool("read").unwrap());
    }

    #[tokio::test]
    async fn mark_read_missing_notification_is_not_found() {
        let store = MemoryStore::new();
        let err = mark_read(&store, "missing").await.unwrap_err();
        assert!(matches!(err, ActionError::NotFound));
    }

    #[tokio::test]
    async fn visible_filter_includes_broadcasts() {
        let store = MemoryStore::new();
        store.seed(
            NOTIFICATIONS,
            vec![
                doc! { "_id": "n1", "user_id": "alice", "read": false },
                doc! { "_id": "n2", "user_id": Bson::Null, "read": false },
                doc! { "_id": "n3", "user_id": "bob", "read": false },
            ],
        );

        let visible = store
            .find_many(NOTIFICATIONS, visible_to("alice"))
            .await
            .unwrap();
        assert_eq!(visible.len(), 2);
    }
}
