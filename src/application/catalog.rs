//! Catalog use cases for the public shop, admin moderation and vendors.

use std::{sync::Arc, time::Duration};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use time::OffsetDateTime;
use tracing::{info, instrument};

use crate::application::{
    pagination::{Pagination, ProductSpecParams},
    query::QueryExecutor,
    repos::{EntityStore, QuerySource, RepoError},
    specification::products::{
        ProductSpecification, VendorProductSpecification, brand_list, type_list,
    },
};
use crate::domain::{Product, ProductStatus, Vendor, error::DomainError};

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("product {0} not found")]
    ProductNotFound(i32),
    #[error("vendor `{0}` not found")]
    VendorNotFound(String),
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

/// Product fields supplied by admins and vendors on create and update.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductInput {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub price: f64,
    #[serde(default)]
    pub picture_url: String,
    #[serde(default, rename = "type")]
    pub product_type: String,
    #[serde(default)]
    pub brand: String,
    #[serde(default)]
    pub quantity_in_stock: i32,
}

impl ProductInput {
    /// `require_picture` is set on create; updates keep the current picture
    /// when none is given.
    pub fn validate(&self, require_picture: bool) -> Result<(), DomainError> {
        let blank = |value: &str| value.trim().is_empty();
        if blank(&self.name) {
            return Err(DomainError::validation("Product name is required"));
        }
        if blank(&self.description) {
            return Err(DomainError::validation("Product description is required"));
        }
        if !(self.price.is_finite() && self.price > 0.0) {
            return Err(DomainError::validation(
                "Product price must be greater than 0",
            ));
        }
        if blank(&self.product_type) {
            return Err(DomainError::validation("Product type is required"));
        }
        if blank(&self.brand) {
            return Err(DomainError::validation("Product brand is required"));
        }
        if self.quantity_in_stock <= 0 {
            return Err(DomainError::validation(
                "Product quantity must be greater than 0",
            ));
        }
        if require_picture && blank(&self.picture_url) {
            return Err(DomainError::validation("Product image is required"));
        }
        Ok(())
    }

    fn into_product(self, status: ProductStatus, vendor_id: &str) -> Product {
        Product {
            id: 0,
            name: self.name.trim().to_string(),
            description: self.description,
            price: self.price,
            picture_url: self.picture_url,
            product_type: self.product_type.trim().to_string(),
            brand: self.brand.trim().to_string(),
            quantity_in_stock: self.quantity_in_stock,
            status,
            vendor_id: Some(vendor_id.to_string()),
            vendor: None,
            created_at: OffsetDateTime::now_utc(),
        }
    }

    fn apply_to(self, product: &mut Product) {
        product.name = self.name.trim().to_string();
        product.description = self.description;
        product.price = self.price;
        product.product_type = self.product_type.trim().to_string();
        product.brand = self.brand.trim().to_string();
        product.quantity_in_stock = self.quantity_in_stock;
        if !self.picture_url.trim().is_empty() {
            product.picture_url = self.picture_url;
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminDashboard {
    pub total_products: u64,
    pub pending_products: u64,
    pub approved_products: u64,
    pub rejected_products: u64,
    pub suspended_products: u64,
    pub vendor_count: usize,
    /// Products published by the house vendor on behalf of the admin.
    pub house_products: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VendorDashboard {
    pub total_products: usize,
    pub pending_products: usize,
    pub approved_products: usize,
    pub rejected_products: usize,
    pub products: Vec<Product>,
}

#[derive(Clone)]
pub struct CatalogService {
    products: QueryExecutor<Product>,
    store: Arc<dyn EntityStore<Product>>,
    vendors: Arc<[Vendor]>,
    house_vendor: String,
}

impl CatalogService {
    /// `house_vendor` owns products created through the admin surface.
    pub fn new<S>(source: Arc<S>, vendors: Vec<Vendor>, house_vendor: impl Into<String>) -> Self
    where
        S: QuerySource<Product> + EntityStore<Product> + 'static,
    {
        let query: Arc<dyn QuerySource<Product>> = source.clone();
        Self {
            products: QueryExecutor::new(query),
            store: source,
            vendors: vendors.into(),
            house_vendor: house_vendor.into(),
        }
    }

    pub fn with_query_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.products = self.products.with_timeout(timeout);
        self
    }

    pub fn vendors(&self) -> &[Vendor] {
        &self.vendors
    }

    /// Public listing; only approved products are visible.
    pub async fn list_products(
        &self,
        params: ProductSpecParams,
    ) -> Result<Pagination<Product>, CatalogError> {
        let params = params.with_status(ProductStatus::Approved);
        let spec = ProductSpecification::list(&params);
        Ok(self.products.page(&spec).await?)
    }

    /// Public single product; anything not approved reads as missing.
    pub async fn get_product(&self, id: i32) -> Result<Product, CatalogError> {
        self.products
            .single(&ProductSpecification::by_id(id))
            .await?
            .filter(|product| product.status == ProductStatus::Approved)
            .ok_or(CatalogError::ProductNotFound(id))
    }

    pub async fn brands(&self) -> Result<Vec<String>, CatalogError> {
        Ok(self.products.list_projected(&brand_list()).await?)
    }

    pub async fn types(&self) -> Result<Vec<String>, CatalogError> {
        Ok(self.products.list_projected(&type_list()).await?)
    }

    /// Admin listing across every status, optionally filtered by one.
    pub async fn admin_list_products(
        &self,
        params: ProductSpecParams,
    ) -> Result<Pagination<Product>, CatalogError> {
        let spec = ProductSpecification::list(&params);
        Ok(self.products.page(&spec).await?)
    }

    #[instrument(skip_all, fields(name = %input.name))]
    pub async fn create_product(&self, input: ProductInput) -> Result<Product, CatalogError> {
        input.validate(true)?;
        let product = input.into_product(ProductStatus::Approved, &self.house_vendor);
        let stored = self.store.insert(product).await?;
        info!(target = "storefront::catalog", id = stored.id, "Product created");
        Ok(stored)
    }

    pub async fn update_product(
        &self,
        id: i32,
        input: ProductInput,
    ) -> Result<Product, CatalogError> {
        input.validate(false)?;
        let mut product = self.require(id).await?;
        input.apply_to(&mut product);
        self.save(product).await
    }

    pub async fn delete_product(&self, id: i32) -> Result<(), CatalogError> {
        self.store.remove(id).await.map_err(|err| not_found(err, id))?;
        info!(target = "storefront::catalog", id, "Product deleted");
        Ok(())
    }

    /// Moderation transition. Any status may move to any other.
    pub async fn set_status(
        &self,
        id: i32,
        status: ProductStatus,
    ) -> Result<Product, CatalogError> {
        let mut product = self.require(id).await?;
        let previous = product.status;
        product.status = status;
        let saved = self.save(product).await?;
        info!(
            target = "storefront::catalog",
            id,
            from = %previous,
            to = %status,
            "Product status changed"
        );
        Ok(saved)
    }

    pub async fn admin_dashboard(&self) -> Result<AdminDashboard, CatalogError> {
        let count = |status: Option<ProductStatus>| {
            let params = ProductSpecParams {
                status,
                ..ProductSpecParams::default()
            };
            let spec = ProductSpecification::list(&params)
                .derive()
                .without_paging()
                .build();
            let products = self.products.clone();
            async move { products.count(&spec).await }
        };
        let house = VendorProductSpecification::all_for_vendor(&self.house_vendor);

        let (total, pending, approved, rejected, suspended, house_products) = tokio::try_join!(
            count(None),
            count(Some(ProductStatus::Pending)),
            count(Some(ProductStatus::Approved)),
            count(Some(ProductStatus::Rejected)),
            count(Some(ProductStatus::Suspended)),
            self.products.count(&house),
        )?;

        Ok(AdminDashboard {
            total_products: total,
            pending_products: pending,
            approved_products: approved,
            rejected_products: rejected,
            suspended_products: suspended,
            vendor_count: self.vendors.len(),
            house_products,
        })
    }

    /// Products owned by the house vendor, paged with the vendor sort map.
    pub async fn house_products(
        &self,
        params: ProductSpecParams,
    ) -> Result<Pagination<Product>, CatalogError> {
        let spec = VendorProductSpecification::list(&self.house_vendor, &params);
        Ok(self.products.page(&spec).await?)
    }

    /// A vendor's own listing across every status.
    pub async fn vendor_products(
        &self,
        vendor_id: &str,
        params: ProductSpecParams,
    ) -> Result<Pagination<Product>, CatalogError> {
        self.require_vendor(vendor_id)?;
        let spec = VendorProductSpecification::list(vendor_id, &params);
        Ok(self.products.page(&spec).await?)
    }

    pub async fn vendor_product(&self, vendor_id: &str, id: i32) -> Result<Product, CatalogError> {
        self.require_vendor(vendor_id)?;
        self.products
            .single(&VendorProductSpecification::by_id(vendor_id, id))
            .await?
            .ok_or(CatalogError::ProductNotFound(id))
    }

    /// Vendor submissions start out pending moderation.
    pub async fn create_vendor_product(
        &self,
        vendor_id: &str,
        input: ProductInput,
    ) -> Result<Product, CatalogError> {
        self.require_vendor(vendor_id)?;
        input.validate(true)?;
        let product = input.into_product(ProductStatus::Pending, vendor_id);
        let stored = self.store.insert(product).await?;
        info!(
            target = "storefront::catalog",
            id = stored.id,
            vendor_id,
            "Vendor product submitted"
        );
        Ok(stored)
    }

    /// Any vendor edit sends the product back to moderation.
    pub async fn update_vendor_product(
        &self,
        vendor_id: &str,
        id: i32,
        input: ProductInput,
    ) -> Result<Product, CatalogError> {
        input.validate(false)?;
        let mut product = self.vendor_product(vendor_id, id).await?;
        input.apply_to(&mut product);
        product.status = ProductStatus::Pending;
        product.vendor = None;
        self.save(product).await
    }

    pub async fn delete_vendor_product(&self, vendor_id: &str, id: i32) -> Result<(), CatalogError> {
        let product = self.vendor_product(vendor_id, id).await?;
        self.store
            .remove(product.id)
            .await
            .map_err(|err| not_found(err, id))
    }

    pub async fn vendor_dashboard(&self, vendor_id: &str) -> Result<VendorDashboard, CatalogError> {
        self.require_vendor(vendor_id)?;
        let products = self
            .products
            .list(&VendorProductSpecification::all_for_vendor(vendor_id))
            .await?;
        let with_status =
            |status: ProductStatus| products.iter().filter(|p| p.status == status).count();

        Ok(VendorDashboard {
            total_products: products.len(),
            pending_products: with_status(ProductStatus::Pending),
            approved_products: with_status(ProductStatus::Approved),
            rejected_products: with_status(ProductStatus::Rejected),
            products,
        })
    }

    async fn require(&self, id: i32) -> Result<Product, CatalogError> {
        self.store
            .get(id)
            .await?
            .ok_or(CatalogError::ProductNotFound(id))
    }

    async fn save(&self, product: Product) -> Result<Product, CatalogError> {
        let id = product.id;
        self.store
            .update(product)
            .await
            .map_err(|err| not_found(err, id))
    }

    fn require_vendor(&self, vendor_id: &str) -> Result<(), CatalogError> {
        if self.vendors.iter().any(|vendor| vendor.id == vendor_id) {
            Ok(())
        } else {
            Err(CatalogError::VendorNotFound(vendor_id.to_string()))
        }
    }
}

fn not_found(err: RepoError, id: i32) -> CatalogError {
    match err {
        RepoError::NotFound => CatalogError::ProductNotFound(id),
        other => CatalogError::Repo(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input() -> ProductInput {
        ProductInput {
            name: "Core Board".to_string(),
            description: "Fast".to_string(),
            price: 99.5,
            picture_url: "/images/products/boards/sb-core1.png".to_string(),
            product_type: "Boards".to_string(),
            brand: "NetCore".to_string(),
            quantity_in_stock: 4,
        }
    }

    #[test]
    fn valid_input_passes() {
        assert!(input().validate(true).is_ok());
    }

    #[test]
    fn validation_reports_first_problem() {
        let cases: [(fn(&mut ProductInput), &str); 5] = [
            (|i| i.name = "  ".into(), "Product name is required"),
            (|i| i.price = 0.0, "Product price must be greater than 0"),
            (|i| i.price = f64::NAN, "Product price must be greater than 0"),
            (|i| i.quantity_in_stock = 0, "Product quantity must be greater than 0"),
            (|i| i.picture_url.clear(), "Product image is required"),
        ];
        for (mutate, expected) in cases {
            let mut candidate = input();
            mutate(&mut candidate);
            match candidate.validate(true) {
                Err(DomainError::Validation { message }) => assert_eq!(message, expected),
                other => panic!("expected validation error, got {other:?}"),
            }
        }
    }

    #[test]
    fn picture_is_optional_on_update() {
        let mut candidate = input();
        candidate.picture_url.clear();
        assert!(candidate.validate(false).is_ok());

        let mut product = input().into_product(ProductStatus::Approved, "extra-mile");
        candidate.apply_to(&mut product);
        assert_eq!(product.picture_url, "/images/products/boards/sb-core1.png");
    }

    fn service() -> CatalogService {
        use crate::infra::memory::MemorySource;

        let vendor = |id: &str| Vendor {
            id: id.to_string(),
            user_name: id.to_string(),
            display_name: id.to_string(),
            email: format!("{id}@example.com"),
        };
        let mut rows = Vec::new();
        for (id, owner, name) in [(1, "house", "Zeta"), (2, "other", "Alpha"), (3, "house", "Beta")] {
            let mut product = input().into_product(ProductStatus::Approved, owner);
            product.id = id;
            product.name = name.to_string();
            rows.push(product);
        }
        let vendors = vec![vendor("house"), vendor("other")];
        let source = Arc::new(MemorySource::products(rows, vendors.clone()));
        CatalogService::new(source, vendors, "house")
    }

    #[tokio::test]
    async fn house_listing_pages_only_house_products_by_name() {
        let catalog = service();
        let params = ProductSpecParams {
            page_index: 1,
            page_size: 10,
            ..ProductSpecParams::default()
        };

        let page = catalog.house_products(params).await.expect("house page");
        assert_eq!(page.count, 2);
        let names: Vec<&str> = page.data.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["Beta", "Zeta"]);
        assert!(page.data.iter().all(|p| p.vendor_id.as_deref() == Some("house")));
    }
}
