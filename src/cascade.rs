// src/cascade.rs
//
// Cascading listing deletion. Removes a listing together with every record
// that references it, after verifying the caller owns the listing. This is
// the one workflow in the system with ordering requirements: dependents go
// first, the listing document last, so concurrent readers never see a
// dangling reference to a listing that is already gone.

use log::{error, info};
use mongodb::bson::{doc, Document};
use serde::Serialize;

use crate::models::listing::{resolve_owner_id, ListingType};
use crate::store::{DocumentStore, BOOKINGS, FAVORITES, MESSAGES, NOTIFICATIONS, REVIEWS};

/// Boundary result of the workflow. The workflow never returns an `Err`:
/// every failure is folded into `{ success: false, error }` so the caller can
/// surface the message inline.
#[derive(Debug, Serialize)]
pub struct DeleteOutcome {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl DeleteOutcome {
    fn ok() -> Self {
        DeleteOutcome {
            success: true,
            error: None,
        }
    }

    fn failed(message: impl Into<String>) -> Self {
        DeleteOutcome {
            success: false,
            error: Some(message.into()),
        }
    }
}

/// Deletes a listing and all of its dependent records.
///
/// Step order matters and must not be changed: images, favorites,
/// notifications, reviews, bookings (accommodations only), messages, then the
/// listing document itself. There is no transaction around the sequence; a
/// failure partway leaves earlier steps committed (see DESIGN.md). Invoking
/// this on an already-deleted listing reports "Listing not found", so the
/// call is safe to retry.
pub async fn delete_listing(
    store: &dyn DocumentStore,
    listing_id: &str,
    listing_type: ListingType,
    requesting_user: &str,
) -> DeleteOutcome {
    let listing = match store
        .find_one(listing_type.collection(), doc! { "_id": listing_id })
        .await
    {
        Ok(Some(listing)) => listing,
        Ok(None) => return DeleteOutcome::failed("Listing not found"),
        Err(err) => {
            error!("could not fetch {} {}: {}", listing_type, listing_id, err);
            return DeleteOutcome::failed(format!("Failed to delete {}", listing_type));
        }
    };

    match resolve_owner_id(&listing) {
        Some(owner_id) if owner_id == requesting_user => {}
        _ => return DeleteOutcome::failed("You don't have permission to delete this listing"),
    }

    let mut steps: Vec<(&str, Document)> = vec![
        (
            listing_type.images_collection(),
            doc! { listing_type.image_link_field(): listing_id },
        ),
        (
            FAVORITES,
            doc! { "item_id": listing_id, "item_type": listing_type.as_str() },
        ),
        (NOTIFICATIONS, doc! { "extra_data.listing_id": listing_id }),
        (
            REVIEWS,
            doc! { "listing_id": listing_id, "listing_type": listing_type.as_str() },
        ),
    ];
    if listing_type == ListingType::Accommodation {
        steps.push((BOOKINGS, doc! { "accommodation_id": listing_id }));
    }
    steps.push((
        MESSAGES,
        doc! { "listing_id": listing_id, "listing_type": listing_type.as_str() },
    ));

    for (collection, filter) in steps {
        if let Err(err) = store.delete_many(collection, filter).await {
            error!(
                "cascade for {} {} failed at {}: {}",
                listing_type, listing_id, collection, err
            );
            return DeleteOutcome::failed(format!("Failed to delete {}", listing_type));
        }
    }

    if let Err(err) = store
        .delete_one(listing_type.collection(), doc! { "_id": listing_id })
        .await
    {
        error!(
            "could not delete {} document {}: {}",
            listing_type, listing_id, err
        );
        return DeleteOutcome::failed(format!("Failed to delete {}", listing_type));
    }

    info!(
        "deleted {} {} and its dependent records",
        listing_type, listing_id
    );
    DeleteOutcome::ok()
}
