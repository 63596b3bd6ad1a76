// src/users.rs

use actix_web::{web, HttpRequest, HttpResponse};
use mongodb::bson::{doc, from_document, Bson};
use serde::{Deserialize, Serialize};

use crate::app_state::AppState;
use crate::auth::current_user;
use crate::errors::ActionError;
use crate::models::user::User;
use crate::store::USERS;

/// Public view of a profile. The delivery token and email never leave the
/// backend.
#[derive(Debug, Serialize)]
pub struct Profile {
    pub id: String,
    pub display_name: String,
    pub role: String,
}

impl From<User> for Profile {
    fn from(user: User) -> Self {
        Profile {
            id: user.id,
            display_name: user.display_name,
            role: user.role,
        }
    }
}

/// GET /users/{user_id}
pub async fn get_user(
    data: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, ActionError> {
    let user_id = path.into_inner();
    let user = data
        .store
        .find_one(USERS, doc! { "_id": &user_id })
        .await?
        .ok_or(ActionError::NotFound)?;
    let user: User = from_document(user)?;
    Ok(HttpResponse::Ok().json(Profile::from(user)))
}

#[derive(Debug, Deserialize)]
pub struct DeviceTokenRequest {
    /// `None` clears the registration (e.g. on logout).
    pub fcm_token: Option<String>,
}

/// PUT /users/me/device_token
pub async fn update_device_token(
    req: HttpRequest,
    data: web::Data<AppState>,
    payload: web::Json<DeviceTokenRequest>,
) -> Result<HttpResponse, ActionError> {
    let user_id = current_user(&req)?;
    let token = match &payload.fcm_token {
        Some(token) => Bson::String(token.clone()),
        None => Bson::Null,
    };

    let matched = data
        .store
        .update_one(
            USERS,
            doc! { "_id": &user_id },
            doc! { "$set": { "fcm_token": token } },
        )
        .await?;
    if matched == 0 {
        return Err(ActionError::NotFound);
    }
    Ok(HttpResponse::Ok().json(doc! { "updated": true }))
}
