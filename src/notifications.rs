// src/notifications.rs
//
// HTTP surface over the notification dispatcher: listing, read-state
// transitions, deletion, and the admin broadcast endpoint.

use actix_web::{web, HttpRequest, HttpResponse};
use mongodb::bson::doc;
use serde::Deserialize;
use serde_json::json;

use crate::app_state::AppState;
use crate::auth::current_user;
use crate::dispatcher::{self, NotificationInput};
use crate::store::{NOTIFICATIONS, USERS};
use crate::errors::ActionError;
use crate::feed_hub::FeedEvent;

/// GET /notifications — the caller's notifications plus broadcasts.
pub async fn list_notifications(
    req: HttpRequest,
    data: web::Data<AppState>,
) -> Result<HttpResponse, ActionError> {
    let user_id = current_user(&req)?;
    let notifications = data
        .store
        .find_many(NOTIFICATIONS, dispatcher::visible_to(&user_id))
        .await?;
    Ok(HttpResponse::Ok().json(notifications))
}

/// POST /notifications/{notification_id}/read
pub async fn mark_read(
    req: HttpRequest,
    data: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, ActionError> {
    current_user(&req)?;
    dispatcher::mark_read(&*data.store, &path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(doc! { "read": true }))
}

/// POST /notifications/read_all
pub async fn mark_all_read(
    req: HttpRequest,
    data: web::Data<AppState>,
) -> Result<HttpResponse, ActionError> {
    let user_id = current_user(&req)?;
    let updated = dispatcher::mark_all_read(&*data.store, &user_id).await?;
    Ok(HttpResponse::Ok().json(json!({ "updated": updated })))
}

/// DELETE /notifications/{notification_id}
pub async fn delete_notification(
    req: HttpRequest,
    data: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, ActionError> {
    current_user(&req)?;
    dispatcher::delete_notification(&*data.store, &path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(doc! { "removed": true }))
}

#[derive(Debug, Deserialize)]
pub struct BroadcastRequest {
    pub title: String,
    pub body: String,
    pub link: Option<String>,
}

/// POST /notifications — admin-only broadcast to every current user.
pub async fn broadcast(
    req: HttpRequest,
    data: web::Data<AppState>,
    payload: web::Json<BroadcastRequest>,
) -> Result<HttpResponse, ActionError> {
    let user_id = current_user(&req)?;

    let caller = data
        .store
        .find_one(USERS, doc! { "_id": &user_id })
        .await?
        .ok_or(ActionError::PermissionDenied)?;
    if caller.get_str("role").ok() != Some("admin") {
        return Err(ActionError::PermissionDenied);
    }

    let notification = dispatcher::notify_and_push(
        &*data.store,
        &*data.push,
        NotificationInput {
            user_id: None,
            kind: "announcement".to_string(),
            title: payload.title.clone(),
            body: payload.body.clone(),
            link: payload.link.clone(),
            extra_data: None,
        },
    )
    .await?;

    data.feed.do_send(FeedEvent {
        user_id: None,
        payload: json!({ "event": "notification", "title": &payload.title }).to_string(),
    });

    Ok(HttpResponse::Ok().json(notification))
}
