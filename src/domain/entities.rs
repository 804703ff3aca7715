//! Domain entities served by the catalog.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::domain::types::ProductStatus;

/// An entity with a unique integer identity.
pub trait Entity: Clone + Send + Sync + 'static {
    fn id(&self) -> i32;

    /// Called by stores when a new row is assigned its identity.
    fn assign_id(&mut self, id: i32);
}

/// A marketplace seller. Attached to products through the `vendor` include.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Vendor {
    pub id: String,
    pub user_name: String,
    pub display_name: String,
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    #[serde(default)]
    pub id: i32,
    pub name: String,
    pub description: String,
    pub price: f64,
    pub picture_url: String,
    #[serde(rename = "type")]
    pub product_type: String,
    pub brand: String,
    pub quantity_in_stock: i32,
    #[serde(default = "default_status")]
    pub status: ProductStatus,
    #[serde(default)]
    pub vendor_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vendor: Option<Vendor>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

fn default_status() -> ProductStatus {
    ProductStatus::Approved
}

impl Entity for Product {
    fn id(&self) -> i32 {
        self.id
    }

    fn assign_id(&mut self, id: i32) {
        self.id = id;
    }
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;

    use super::*;

    fn sample(created_at: OffsetDateTime) -> Product {
        Product {
            id: 7,
            name: "Core Board".to_string(),
            description: "".to_string(),
            price: 120.0,
            picture_url: "/images/products/boards.png".to_string(),
            product_type: "Boards".to_string(),
            brand: "Angular".to_string(),
            quantity_in_stock: 3,
            status: ProductStatus::Approved,
            vendor_id: None,
            vendor: None,
            created_at,
        }
    }

    #[test]
    fn product_round_trips_rfc3339_timestamps() {
        let product = sample(datetime!(2025-03-05 00:00 UTC));
        let json = serde_json::to_string(&product).expect("json");
        assert!(json.contains("\"createdAt\":\"2025-03-05T00:00:00Z\""));
        let back: Product = serde_json::from_str(&json).expect("parse");
        assert_eq!(back, product);
    }

    #[test]
    fn product_serializes_type_field_and_omits_missing_vendor() {
        let json = serde_json::to_value(sample(datetime!(2025-03-05 00:00 UTC))).expect("json");
        assert_eq!(json["type"], "Boards");
        assert_eq!(json["quantityInStock"], 3);
        assert!(json.get("vendor").is_none());
    }
}
