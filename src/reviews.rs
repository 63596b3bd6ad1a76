// src/reviews.rs

use actix_web::{web, HttpRequest, HttpResponse};
use chrono::Utc;
use mongodb::bson::{doc, to_document};
use serde::Deserialize;
use uuid::Uuid;

use crate::app_state::AppState;
use crate::auth::current_user;
use crate::store::REVIEWS;
use crate::dispatcher::{self, NotificationInput};
use crate::errors::ActionError;
use crate::listings::parse_listing_type;
use crate::models::listing::resolve_owner_id;
use crate::models::Review;

#[derive(Debug, Deserialize)]
pub struct CreateReviewRequest {
    pub listing_id: String,
    pub listing_type: String,
    pub rating: i32,
    pub comment: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ReviewQuery {
    pub listing_id: Option<String>,
    pub listing_type: Option<String>,
}

/// POST /reviews
pub async fn create_review(
    req: HttpRequest,
    data: web::Data<AppState>,
    payload: web::Json<CreateReviewRequest>,
) -> Result<HttpResponse, ActionError> {
    let reviewer_id = current_user(&req)?;
    let listing_type = parse_listing_type(&payload.listing_type)?;
    if !(1..=5).contains(&payload.rating) {
        return Err(ActionError::validation("Rating must be between 1 and 5"));
    }

    let listing = data
        .store
        .find_one(listing_type.collection(), doc! { "_id": &payload.listing_id })
        .await?
        .ok_or(ActionError::NotFound)?;
    let reviewee_id = resolve_owner_id(&listing)
        .ok_or_else(|| ActionError::validation("Listing has no resolvable owner"))?;
    if reviewee_id == reviewer_id {
        return Err(ActionError::validation("You cannot review your own listing"));
    }

    let review = Review {
        id: Uuid::new_v4().to_string(),
        listing_id: payload.listing_id.clone(),
        listing_type: listing_type.as_str().to_string(),
        reviewer_id,
        reviewee_id: reviewee_id.clone(),
        rating: payload.rating,
        comment: payload.comment.clone(),
        created_at: Utc::now(),
    };
    data.store.insert_one(REVIEWS, to_document(&review)?).await?;

    // Best-effort: the review stands even if the notification path hiccups.
    let _ = dispatcher::notify_and_push(
        &*data.store,
        &*data.push,
        NotificationInput {
            user_id: Some(reviewee_id),
            kind: "review".to_string(),
            title: "New review".to_string(),
            body: format!("Your listing received a {}-star review", review.rating),
            link: Some(format!(
                "/listings/{}/{}",
                listing_type.as_str(),
                review.listing_id
            )),
            extra_data: Some(doc! { "listing_id": &review.listing_id }),
        },
    )
    .await;

    Ok(HttpResponse::Ok().json(review))
}

/// GET /reviews?listing_id=..&listing_type=..
pub async fn list_reviews(
    data: web::Data<AppState>,
    query: web::Query<ReviewQuery>,
) -> Result<HttpResponse, ActionError> {
    let listing_id = query
        .listing_id
        .as_ref()
        .ok_or_else(|| ActionError::validation("listing_id is required"))?;

    let mut filter = doc! { "listing_id": listing_id };
    if let Some(type_param) = &query.listing_type {
        filter.insert("listing_type", parse_listing_type(type_param)?.as_str());
    }

    let reviews = data.store.find_many(REVIEWS, filter).await?;
    Ok(HttpResponse::Ok().json(reviews))
}

/// DELETE /reviews/{review_id}
pub async fn delete_review(
    req: HttpRequest,
    data: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, ActionError> {
    let review_id = path.into_inner();
    let user_id = current_user(&req)?;

    let review = data
        .store
        .find_one(REVIEWS, doc! { "_id": &review_id })
        .await?
        .ok_or(ActionError::NotFound)?;
    if review.get_str("reviewer_id").ok() != Some(user_id.as_str()) {
        return Err(ActionError::PermissionDenied);
    }

    data.store
        .delete_one(REVIEWS, doc! { "_id": &review_id })
        .await?;
    Ok(HttpResponse::Ok().json(doc! { "removed": true }))
}
