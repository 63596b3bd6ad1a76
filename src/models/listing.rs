use std::fmt;

use chrono::{DateTime, Utc};
use mongodb::bson::Document;
use serde::{Deserialize, Serialize};

/// The three listing variants offered on the marketplace. Each variant lives
/// in its own collection and has a dedicated image collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListingType {
    Product,
    Accommodation,
    Service,
}

impl ListingType {
    pub fn from_param(value: &str) -> Option<Self> {
        match value {
            "product" | "products" => Some(ListingType::Product),
            "accommodation" | "accommodations" => Some(ListingType::Accommodation),
            "service" | "services" => Some(ListingType::Service),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ListingType::Product => "product",
            ListingType::Accommodation => "accommodation",
            ListingType::Service => "service",
        }
    }

    pub fn collection(&self) -> &'static str {
        match self {
            ListingType::Product => "products",
            ListingType::Accommodation => "accommodations",
            ListingType::Service => "services",
        }
    }

    pub fn images_collection(&self) -> &'static str {
        match self {
            ListingType::Product => "product_images",
            ListingType::Accommodation => "accommodation_images",
            ListingType::Service => "service_images",
        }
    }

    /// Field on an image document that points back at the listing.
    pub fn image_link_field(&self) -> &'static str {
        match self {
            ListingType::Product => "product_id",
            ListingType::Accommodation => "accommodation_id",
            ListingType::Service => "service_id",
        }
    }
}

impl fmt::Display for ListingType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Listing {
    #[serde(rename = "_id")]
    pub id: String,
    pub owner_id: String,
    pub title: String,
    pub description: Option<String>,
    pub price: Option<f64>,
    /// e.g. "active", "reserved", "sold".
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Resolves the owner of a listing document.
///
/// New documents carry a normalized `owner_id`; documents written by earlier
/// versions of the app used `seller_id`, an embedded `seller.id`, or
/// `user_id` depending on the listing variant. The legacy names are checked
/// in that order.
pub fn resolve_owner_id(listing: &Document) -> Option<String> {
    listing
        .get_str("owner_id")
        .ok()
        .or_else(|| listing.get_str("seller_id").ok())
        .or_else(|| {
            listing
                .get_document("seller")
                .ok()
                .and_then(|seller| seller.get_str("id").ok())
        })
        .or_else(|| listing.get_str("user_id").ok())
        .map(str::to_owned)
}
