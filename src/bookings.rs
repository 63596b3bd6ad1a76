// src/bookings.rs

use actix_web::{web, HttpRequest, HttpResponse};
use chrono::{DateTime, Utc};
use mongodb::bson::{doc, to_document};
use serde::Deserialize;
use uuid::Uuid;

use crate::app_state::AppState;
use crate::auth::current_user;
use crate::store::BOOKINGS;
use crate::dispatcher::{self, NotificationInput};
use crate::errors::ActionError;
use crate::models::listing::{resolve_owner_id, ListingType};
use crate::models::Booking;

#[derive(Debug, Deserialize)]
pub struct CreateBookingRequest {
    pub accommodation_id: String,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct BookingQuery {
    /// When set, lists bookings for an accommodation the caller owns instead
    /// of the caller's own bookings.
    pub accommodation_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateBookingStatusRequest {
    pub status: String,
}

async fn fetch_accommodation(
    data: &AppState,
    accommodation_id: &str,
) -> Result<mongodb::bson::Document, ActionError> {
    data.store
        .find_one(
            ListingType::Accommodation.collection(),
            doc! { "_id": accommodation_id },
        )
        .await?
        .ok_or(ActionError::NotFound)
}

/// POST /bookings
pub async fn create_booking(
    req: HttpRequest,
    data: web::Data<AppState>,
    payload: web::Json<CreateBookingRequest>,
) -> Result<HttpResponse, ActionError> {
    let customer_id = current_user(&req)?;
    if payload.end_date <= payload.start_date {
        return Err(ActionError::validation("end_date must be after start_date"));
    }

    let accommodation = fetch_accommodation(&data, &payload.accommodation_id).await?;
    let owner_id = resolve_owner_id(&accommodation)
        .ok_or_else(|| ActionError::validation("Accommodation has no resolvable owner"))?;
    if owner_id == customer_id {
        return Err(ActionError::validation(
            "You cannot book your own accommodation",
        ));
    }

    let booking = Booking {
        id: Uuid::new_v4().to_string(),
        accommodation_id: payload.accommodation_id.clone(),
        customer_id,
        status: "pending".to_string(),
        start_date: payload.start_date,
        end_date: payload.end_date,
        created_at: Utc::now(),
    };
    data.store
        .insert_one(BOOKINGS, to_document(&booking)?)
        .await?;

    let _ = dispatcher::notify_and_push(
        &*data.store,
        &*data.push,
        NotificationInput {
            user_id: Some(owner_id),
            kind: "booking".to_string(),
            title: "New booking request".to_string(),
            body: "Someone requested to book your accommodation".to_string(),
            link: Some(format!(
                "/listings/accommodation/{}",
                booking.accommodation_id
            )),
            extra_data: Some(doc! { "listing_id": &booking.accommodation_id }),
        },
    )
    .await;

    Ok(HttpResponse::Ok().json(booking))
}

/// GET /bookings
pub async fn list_bookings(
    req: HttpRequest,
    data: web::Data<AppState>,
    query: web::Query<BookingQuery>,
) -> Result<HttpResponse, ActionError> {
    let user_id = current_user(&req)?;

    let filter = match &query.accommodation_id {
        Some(accommodation_id) => {
            let accommodation = fetch_accommodation(&data, accommodation_id).await?;
            if resolve_owner_id(&accommodation).as_deref() != Some(user_id.as_str()) {
                return Err(ActionError::PermissionDenied);
            }
            doc! { "accommodation_id": accommodation_id }
        }
        None => doc! { "customer_id": &user_id },
    };

    let bookings = data.store.find_many(BOOKINGS, filter).await?;
    Ok(HttpResponse::Ok().json(bookings))
}

/// PUT /bookings/{booking_id}/status
pub async fn update_booking_status(
    req: HttpRequest,
    data: web::Data<AppState>,
    path: web::Path<String>,
    payload: web::Json<UpdateBookingStatusRequest>,
) -> Result<HttpResponse, ActionError> {
    let booking_id = path.into_inner();
    let user_id = current_user(&req)?;
    if payload.status != "confirmed" && payload.status != "cancelled" {
        return Err(ActionError::validation(
            "status must be \"confirmed\" or \"cancelled\"",
        ));
    }

    let booking = data
        .store
        .find_one(BOOKINGS, doc! { "_id": &booking_id })
        .await?
        .ok_or(ActionError::NotFound)?;
    let accommodation_id = booking
        .get_str("accommodation_id")
        .map_err(|_| ActionError::Internal)?
        .to_string();

    // Only the accommodation owner decides on booking requests.
    let accommodation = fetch_accommodation(&data, &accommodation_id).await?;
    if resolve_owner_id(&accommodation).as_deref() != Some(user_id.as_str()) {
        return Err(ActionError::PermissionDenied);
    }

    data.store
        .update_one(
            BOOKINGS,
            doc! { "_id": &booking_id },
            doc! { "$set": { "status": &payload.status } },
        )
        .await?;

    if let Ok(customer_id) = booking.get_str("customer_id") {
        let _ = dispatcher::notify_and_push(
            &*data.store,
            &*data.push,
            NotificationInput {
                user_id: Some(customer_id.to_string()),
                kind: "booking".to_string(),
                title: format!("Booking {}", payload.status),
                body: format!("Your booking request was {}", payload.status),
                link: Some(format!("/listings/accommodation/{}", accommodation_id)),
                extra_data: Some(doc! { "listing_id": &accommodation_id }),
            },
        )
        .await;
    }

    Ok(HttpResponse::Ok().json(doc! { "status": &payload.status }))
}
