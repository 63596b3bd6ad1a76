// src/favorites.rs

use actix_web::{web, HttpRequest, HttpResponse};
use mongodb::bson::{doc, to_document};
use serde::Deserialize;
use uuid::Uuid;

use crate::app_state::AppState;
use crate::auth::current_user;
use crate::store::FAVORITES;
use crate::errors::ActionError;
use crate::listings::parse_listing_type;
use crate::models::Favorite;

#[derive(Debug, Deserialize)]
pub struct AddFavoriteRequest {
    pub item_id: String,
    pub item_type: String,
}

/// POST /favorites
pub async fn add_favorite(
    req: HttpRequest,
    data: web::Data<AppState>,
    payload: web::Json<AddFavoriteRequest>,
) -> Result<HttpResponse, ActionError> {
    let user_id = current_user(&req)?;
    let listing_type = parse_listing_type(&payload.item_type)?;

    // The listing must still exist; favorites never point at deleted records.
    data.store
        .find_one(listing_type.collection(), doc! { "_id": &payload.item_id })
        .await?
        .ok_or(ActionError::NotFound)?;

    let existing = data
        .store
        .find_one(
            FAVORITES,
            doc! {
                "user_id": &user_id,
                "item_id": &payload.item_id,
                "item_type": listing_type.as_str(),
            },
        )
        .await?;
    if existing.is_some() {
        return Err(ActionError::AlreadyExists);
    }

    let favorite = Favorite {
        id: Uuid::new_v4().to_string(),
        user_id,
        item_id: payload.item_id.clone(),
        item_type: listing_type.as_str().to_string(),
    };
    data.store
        .insert_one(FAVORITES, to_document(&favorite)?)
        .await?;

    Ok(HttpResponse::Ok().json(favorite))
}

/// GET /favorites
pub async fn list_favorites(
    req: HttpRequest,
    data: web::Data<AppState>,
) -> Result<HttpResponse, ActionError> {
    let user_id = current_user(&req)?;
    let favorites = data
        .store
        .find_many(FAVORITES, doc! { "user_id": &user_id })
        .await?;
    Ok(HttpResponse::Ok().json(favorites))
}

/// DELETE /favorites/{item_type}/{item_id}
pub async fn remove_favorite(
    req: HttpRequest,
    data: web::Data<AppState>,
    path: web::Path<(String, String)>,
) -> Result<HttpResponse, ActionError> {
    let (item_type, item_id) = path.into_inner();
    let user_id = current_user(&req)?;
    let listing_type = parse_listing_type(&item_type)?;

    let deleted = data
        .store
        .delete_one(
            FAVORITES,
            doc! {
                "user_id": &user_id,
                "item_id": &item_id,
                "item_type": listing_type.as_str(),
            },
        )
        .await?;
    if deleted == 0 {
        return Err(ActionError::NotFound);
    }
    Ok(HttpResponse::Ok().json(doc! { "removed": true }))
}
