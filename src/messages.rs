// src/messages.rs

use actix_web::{web, HttpRequest, HttpResponse};
use chrono::Utc;
use mongodb::bson::{doc, to_document};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::app_state::AppState;
use crate::auth::current_user;
use crate::store::MESSAGES;
use crate::dispatcher::{self, NotificationInput};
use crate::errors::ActionError;
use crate::feed_hub::FeedEvent;
use crate::listings::parse_listing_type;
use crate::models::message::{conversation_id, Message};

#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    pub listing_id: String,
    pub listing_type: String,
    pub receiver_id: String,
    pub content: String,
}

#[derive(Debug, Deserialize)]
pub struct MessageQuery {
    pub conversation_id: Option<String>,
    /// The other participant; lists the thread between the caller and them.
    pub user_id: Option<String>,
}

/// POST /messages
pub async fn send_message(
    req: HttpRequest,
    data: web::Data<AppState>,
    payload: web::Json<SendMessageRequest>,
) -> Result<HttpResponse, ActionError> {
    let sender_id = current_user(&req)?;
    let listing_type = parse_listing_type(&payload.listing_type)?;
    if payload.content.trim().is_empty() {
        return Err(ActionError::validation("Message content is required"));
    }
    if payload.receiver_id == sender_id {
        return Err(ActionError::validation("You cannot message yourself"));
    }

    let message = Message {
        id: Uuid::new_v4().to_string(),
        listing_id: payload.listing_id.clone(),
        listing_type: listing_type.as_str().to_string(),
        conversation_id: conversation_id(&payload.listing_id, &sender_id, &payload.receiver_id),
        sender_id: sender_id.clone(),
        receiver_id: payload.receiver_id.clone(),
        content: payload.content.clone(),
        created_at: Utc::now(),
    };
    data.store
        .insert_one(MESSAGES, to_document(&message)?)
        .await?;

    // Notify the receiver out-of-band; the message itself is already stored.
    let _ = dispatcher::notify_and_push(
        &*data.store,
        &*data.push,
        NotificationInput {
            user_id: Some(payload.receiver_id.clone()),
            kind: "message".to_string(),
            title: "New message".to_string(),
            body: payload.content.clone(),
            link: Some(format!("/messages?conversation_id={}", message.conversation_id)),
            extra_data: Some(doc! { "listing_id": &payload.listing_id }),
        },
    )
    .await;
    data.feed.do_send(FeedEvent {
        user_id: Some(payload.receiver_id.clone()),
        payload: json!({
            "event": "message",
            "conversation_id": &message.conversation_id,
            "sender_id": &sender_id,
        })
        .to_string(),
    });

    Ok(HttpResponse::Ok().json(message))
}

/// GET /messages?conversation_id=.. | ?user_id=..
pub async fn list_messages(
    req: HttpRequest,
    data: web::Data<AppState>,
    query: web::Query<MessageQuery>,
) -> Result<HttpResponse, ActionError> {
    let current = current_user(&req)?;

    let filter = match (&query.conversation_id, &query.user_id) {
        (Some(conversation_id), _) => doc! {
            "conversation_id": conversation_id,
            // The caller must be part of the thread.
            "$or": [ { "sender_id": &current }, { "receiver_id": &current } ],
        },
        (None, Some(other)) => doc! {
            "$or": [
                { "sender_id": &current, "receiver_id": other },
                { "sender_id": other, "receiver_id": &current },
            ],
        },
        (None, None) => {
            return Err(ActionError::validation(
                "Either conversation_id or user_id is required",
            ))
        }
    };

    let messages = data.store.find_many(MESSAGES, filter).await?;
    Ok(HttpResponse::Ok().json(messages))
}
