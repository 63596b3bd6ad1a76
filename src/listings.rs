// src/listings.rs

use actix_web::{web, HttpRequest, HttpResponse};
use chrono::Utc;
use mongodb::bson::{doc, to_document, Document};
use serde::Deserialize;
use uuid::Uuid;

use crate::app_state::AppState;
use crate::auth::current_user;
use crate::cascade;
use crate::errors::ActionError;
use crate::feed_hub::Revalidate;
use crate::models::listing::{resolve_owner_id, Listing, ListingType};

pub fn parse_listing_type(param: &str) -> Result<ListingType, ActionError> {
    ListingType::from_param(param)
        .ok_or_else(|| ActionError::validation(format!("Unknown listing type: {}", param)))
}

/// Injects the normalized `owner_id` into documents written before the owner
/// field was unified.
fn normalized(mut listing: Document) -> Document {
    if !listing.contains_key("owner_id") {
        if let Some(owner_id) = resolve_owner_id(&listing) {
            listing.insert("owner_id", owner_id);
        }
    }
    listing
}

#[derive(Debug, Deserialize)]
pub struct CreateListingRequest {
    pub title: String,
    pub description: Option<String>,
    pub price: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateListingRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub price: Option<f64>,
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ListingQuery {
    pub owner_id: Option<String>,
    pub status: Option<String>,
}

/// POST /listings/{listing_type}
pub async fn create_listing(
    req: HttpRequest,
    data: web::Data<AppState>,
    path: web::Path<String>,
    payload: web::Json<CreateListingRequest>,
) -> Result<HttpResponse, ActionError> {
    let listing_type = parse_listing_type(&path.into_inner())?;
    let owner_id = current_user(&req)?;
    if payload.title.trim().is_empty() {
        return Err(ActionError::validation("Title is required"));
    }

    let now = Utc::now();
    let listing = Listing {
        id: Uuid::new_v4().to_string(),
        owner_id,
        title: payload.title.clone(),
        description: payload.description.clone(),
        price: payload.price,
        status: "active".to_string(),
        created_at: now,
        updated_at: now,
    };

    data.store
        .insert_one(listing_type.collection(), to_document(&listing)?)
        .await?;
    data.feed.do_send(Revalidate {
        collection: listing_type.collection(),
    });

    Ok(HttpResponse::Ok().json(listing))
}

/// GET /listings/{listing_type}
pub async fn list_listings(
    data: web::Data<AppState>,
    path: web::Path<String>,
    query: web::Query<ListingQuery>,
) -> Result<HttpResponse, ActionError> {
    let listing_type = parse_listing_type(&path.into_inner())?;

    let mut filter = doc! {};
    if let Some(owner_id) = &query.owner_id {
        filter.insert("owner_id", owner_id);
    }
    if let Some(status) = &query.status {
        filter.insert("status", status);
    }

    let listings = data
        .store
        .find_many(listing_type.collection(), filter)
        .await?;
    let listings: Vec<Document> = listings.into_iter().map(normalized).collect();
    Ok(HttpResponse::Ok().json(listings))
}

/// GET /listings/{listing_type}/{listing_id}
pub async fn get_listing(
    data: web::Data<AppState>,
    path: web::Path<(String, String)>,
) -> Result<HttpResponse, ActionError> {
    let (type_param, listing_id) = path.into_inner();
    let listing_type = parse_listing_type(&type_param)?;

    let listing = data
        .store
        .find_one(listing_type.collection(), doc! { "_id": &listing_id })
        .await?
        .ok_or(ActionError::NotFound)?;
    Ok(HttpResponse::Ok().json(normalized(listing)))
}

/// PUT /listings/{listing_type}/{listing_id}
pub async fn update_listing(
    req: HttpRequest,
    data: web::Data<AppState>,
    path: web::Path<(String, String)>,
    payload: web::Json<UpdateListingRequest>,
) -> Result<HttpResponse, ActionError> {
    let (type_param, listing_id) = path.into_inner();
    let listing_type = parse_listing_type(&type_param)?;
    let user_id = current_user(&req)?;

    let listing = data
        .store
        .find_one(listing_type.collection(), doc! { "_id": &listing_id })
        .await?
        .ok_or(ActionError::NotFound)?;
    if resolve_owner_id(&listing).as_deref() != Some(user_id.as_str()) {
        return Err(ActionError::PermissionDenied);
    }

    let mut update_doc = doc! {};
    if let Some(title) = &payload.title {
        update_doc.insert("title", title);
    }
    if let Some(description) = &payload.description {
        update_doc.insert("description", description);
    }
    if let Some(price) = &payload.price {
        update_doc.insert("price", price);
    }
    if let Some(status) = &payload.status {
        update_doc.insert("status", status);
    }
    if update_doc.is_empty() {
        return Err(ActionError::validation("No fields to update"));
    }
    update_doc.insert(
        "updated_at",
        Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
    );

    data.store
        .update_one(
            listing_type.collection(),
            doc! { "_id": &listing_id },
            doc! { "$set": update_doc },
        )
        .await?;
    data.feed.do_send(Revalidate {
        collection: listing_type.collection(),
    });

    Ok(HttpResponse::Ok().json(doc! { "updated": true }))
}

/// DELETE /listings/{listing_type}/{listing_id}
///
/// Runs the cascading delete workflow. The outcome is always reported in the
/// body so the caller can render failures inline; the workflow never bubbles
/// an error out of this boundary.
pub async fn delete_listing(
    req: HttpRequest,
    data: web::Data<AppState>,
    path: web::Path<(String, String)>,
) -> Result<HttpResponse, ActionError> {
    let (type_param, listing_id) = path.into_inner();
    let listing_type = parse_listing_type(&type_param)?;
    let user_id = current_user(&req)?;

    let outcome = cascade::delete_listing(&*data.store, &listing_id, listing_type, &user_id).await;
    if outcome.success {
        data.feed.do_send(Revalidate {
            collection: listing_type.collection(),
        });
    }
    Ok(HttpResponse::Ok().json(outcome))
}

#[derive(Debug, Deserialize)]
pub struct AddImageRequest {
    pub url: String,
    #[serde(default)]
    pub is_primary: bool,
}

/// POST /listings/{listing_type}/{listing_id}/images
pub async fn add_image(
    req: HttpRequest,
    data: web::Data<AppState>,
    path: web::Path<(String, String)>,
    payload: web::Json<AddImageRequest>,
) -> Result<HttpResponse, ActionError> {
    let (type_param, listing_id) = path.into_inner();
    let listing_type = parse_listing_type(&type_param)?;
    let user_id = current_user(&req)?;

    let listing = data
        .store
        .find_one(listing_type.collection(), doc! { "_id": &listing_id })
        .await?
        .ok_or(ActionError::NotFound)?;
    if resolve_owner_id(&listing).as_deref() != Some(user_id.as_str()) {
        return Err(ActionError::PermissionDenied);
    }

    let image = doc! {
        "_id": Uuid::new_v4().to_string(),
        listing_type.image_link_field(): &listing_id,
        "url": &payload.url,
        "is_primary": payload.is_primary,
    };
    data.store
        .insert_one(listing_type.images_collection(), image.clone())
        .await?;

    Ok(HttpResponse::Ok().json(image))
}

/// GET /listings/{listing_type}/{listing_id}/images
pub async fn list_images(
    data: web::Data<AppState>,
    path: web::Path<(String, String)>,
) -> Result<HttpResponse, ActionError> {
    let (type_param, listing_id) = path.into_inner();
    let listing_type = parse_listing_type(&type_param)?;

    let images = data
        .store
        .find_many(
            listing_type.images_collection(),
            doc! { listing_type.image_link_field(): &listing_id },
        )
        .await?;
    Ok(HttpResponse::Ok().json(images))
}
