//! Catalog seed data.
//!
//! The bundled catalog is compiled in; a JSON file with the same shape can
//! replace the product list at startup.

use std::path::Path;

use serde::de::DeserializeOwned;
use tracing::info;

use crate::domain::{Product, Vendor};

use super::error::InfraError;

const BUNDLED_PRODUCTS: &str = include_str!("../../data/products.json");
const BUNDLED_VENDORS: &str = include_str!("../../data/vendors.json");

/// Rows the in-memory sources start from.
#[derive(Debug, Clone)]
pub struct SeedData {
    pub products: Vec<Product>,
    pub vendors: Vec<Vendor>,
}

impl SeedData {
    pub fn bundled() -> Result<Self, InfraError> {
        Ok(Self {
            products: parse("data/products.json", BUNDLED_PRODUCTS)?,
            vendors: parse("data/vendors.json", BUNDLED_VENDORS)?,
        })
    }

    /// Bundled vendors plus products read from `products_path` when given.
    pub async fn load(products_path: Option<&Path>) -> Result<Self, InfraError> {
        let mut seed = Self::bundled()?;
        if let Some(path) = products_path {
            let raw = tokio::fs::read_to_string(path).await?;
            seed.products = parse(&path.display().to_string(), &raw)?;
        }

        let mut ids: Vec<i32> = seed.products.iter().map(|product| product.id).collect();
        ids.sort_unstable();
        if ids.windows(2).any(|pair| pair[0] == pair[1]) {
            return Err(InfraError::seed("product ids must be unique"));
        }

        info!(
            target = "storefront::seed",
            products = seed.products.len(),
            vendors = seed.vendors.len(),
            source = products_path.map_or("bundled".to_string(), |p| p.display().to_string()),
            "Seed data loaded"
        );
        Ok(seed)
    }
}

fn parse<T: DeserializeOwned>(origin: &str, raw: &str) -> Result<Vec<T>, InfraError> {
    serde_json::from_str(raw).map_err(|err| InfraError::seed(format!("{origin}: {err}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ProductStatus;

    #[test]
    fn bundled_catalog_parses() {
        let seed = SeedData::bundled().expect("bundled seed");
        assert_eq!(seed.products.len(), 18);
        assert_eq!(
            seed.products
                .iter()
                .filter(|p| p.status == ProductStatus::Approved)
                .count(),
            14
        );
        assert!(seed.vendors.iter().any(|v| v.user_name == "ExtraMile"));
    }

    #[tokio::test]
    async fn missing_override_file_is_an_io_error() {
        let err = SeedData::load(Some(Path::new("/nonexistent/products.json")))
            .await
            .expect_err("missing file");
        assert!(matches!(err, InfraError::Io(_)));
    }
}
