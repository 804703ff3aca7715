//! Product catalog specifications.
//!
//! Sort keys map through a fixed table; any unrecognized or absent key falls
//! back to the documented default of each specification type.

use std::sync::Arc;

use crate::application::pagination::ProductSpecParams;
use crate::domain::{Product, ProductStatus};

use super::{Criteria, Ordering, ProjectedSpecification, Specification, SpecificationBuilder};

/// Navigation path attaching the owning [`Vendor`](crate::domain::Vendor).
pub const VENDOR_INCLUDE: &str = "vendor";

/// Sort keys accepted by the public and admin product listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProductSort {
    PriceAsc,
    PriceDesc,
    Name,
    Newest,
    Oldest,
}

impl ProductSort {
    /// Newest products first.
    pub const DEFAULT: ProductSort = ProductSort::Newest;

    pub fn parse(value: Option<&str>) -> Self {
        match value {
            Some("priceAsc") => ProductSort::PriceAsc,
            Some("priceDesc") => ProductSort::PriceDesc,
            Some("name") => ProductSort::Name,
            Some("newest") => ProductSort::Newest,
            Some("oldest") => ProductSort::Oldest,
            _ => Self::DEFAULT,
        }
    }

    pub fn ordering(self) -> Ordering<Product> {
        match self {
            ProductSort::PriceAsc => Ordering::ascending("price", |p: &Product| p.price),
            ProductSort::PriceDesc => Ordering::descending("price", |p: &Product| p.price),
            ProductSort::Name => Ordering::ascending("name", |p: &Product| p.name.clone()),
            ProductSort::Newest => {
                Ordering::descending("created_at", |p: &Product| p.created_at)
            }
            ProductSort::Oldest => Ordering::ascending("created_at", |p: &Product| p.created_at),
        }
    }
}

/// Sort keys accepted by a vendor's own product listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VendorProductSort {
    PriceAsc,
    PriceDesc,
    Newest,
    Oldest,
    StatusAsc,
    StatusDesc,
    Name,
}

impl VendorProductSort {
    /// Alphabetical by name.
    pub const DEFAULT: VendorProductSort = VendorProductSort::Name;

    pub fn parse(value: Option<&str>) -> Self {
        match value {
            Some("priceAsc") => VendorProductSort::PriceAsc,
            Some("priceDesc") => VendorProductSort::PriceDesc,
            Some("newest") => VendorProductSort::Newest,
            Some("oldest") => VendorProductSort::Oldest,
            Some("statusAsc") => VendorProductSort::StatusAsc,
            Some("statusDesc") => VendorProductSort::StatusDesc,
            Some("name") => VendorProductSort::Name,
            _ => Self::DEFAULT,
        }
    }

    pub fn ordering(self) -> Ordering<Product> {
        match self {
            VendorProductSort::PriceAsc => Ordering::ascending("price", |p: &Product| p.price),
            VendorProductSort::PriceDesc => Ordering::descending("price", |p: &Product| p.price),
            VendorProductSort::Newest => {
                Ordering::descending("created_at", |p: &Product| p.created_at)
            }
            VendorProductSort::Oldest => {
                Ordering::ascending("created_at", |p: &Product| p.created_at)
            }
            VendorProductSort::StatusAsc => Ordering::ascending("status", |p: &Product| p.status),
            VendorProductSort::StatusDesc => {
                Ordering::descending("status", |p: &Product| p.status)
            }
            VendorProductSort::Name => Ordering::ascending("name", |p: &Product| p.name.clone()),
        }
    }
}

/// Search, brand and type filters shared by catalog and vendor listings.
fn catalog_filters(params: &ProductSpecParams) -> Criteria<Product> {
    let search = params.search().map(str::to_lowercase);
    let brands = Arc::new(params.brands.clone());
    let types = Arc::new(params.types.clone());

    Criteria::all([
        Criteria::new(move |p: &Product| match search.as_deref() {
            None => true,
            Some(term) => p.name.to_lowercase().contains(term),
        }),
        Criteria::new(move |p: &Product| brands.is_empty() || brands.contains(&p.brand)),
        Criteria::new(move |p: &Product| types.is_empty() || types.contains(&p.product_type)),
    ])
}

fn status_filter(status: Option<ProductStatus>) -> Criteria<Product> {
    match status {
        None => Criteria::any(),
        Some(status) => Criteria::new(move |p: &Product| p.status == status),
    }
}

fn vendor_filter(vendor_id: &str) -> Criteria<Product> {
    let vendor_id = vendor_id.to_owned();
    Criteria::new(move |p: &Product| p.vendor_id.as_deref() == Some(vendor_id.as_str()))
}

pub struct ProductSpecification;

impl ProductSpecification {
    /// Filtered, sorted, paged listing. `params` must already be normalized.
    pub fn list(params: &ProductSpecParams) -> Specification<Product> {
        SpecificationBuilder::new()
            .criteria(catalog_filters(params))
            .criteria(status_filter(params.status))
            .include(VENDOR_INCLUDE)
            .page(params.page_index, params.page_size)
            .ordering(ProductSort::parse(params.sort.as_deref()).ordering())
            .build()
    }

    pub fn by_id(id: i32) -> Specification<Product> {
        Specification::<Product>::by_id(id)
            .derive()
            .include(VENDOR_INCLUDE)
            .build()
    }
}

pub struct VendorProductSpecification;

impl VendorProductSpecification {
    /// All of a vendor's products, newest first, unpaged.
    pub fn all_for_vendor(vendor_id: &str) -> Specification<Product> {
        SpecificationBuilder::new()
            .criteria(vendor_filter(vendor_id))
            .include(VENDOR_INCLUDE)
            .ordering(ProductSort::Newest.ordering())
            .without_paging()
            .build()
    }

    /// A vendor's own filtered listing. Status filtering is not applied: a
    /// vendor sees every moderation state of their products.
    pub fn list(vendor_id: &str, params: &ProductSpecParams) -> Specification<Product> {
        SpecificationBuilder::new()
            .criteria(vendor_filter(vendor_id))
            .criteria(catalog_filters(params))
            .include(VENDOR_INCLUDE)
            .page(params.page_index, params.page_size)
            .ordering(VendorProductSort::parse(params.sort.as_deref()).ordering())
            .build()
    }

    pub fn by_id(vendor_id: &str, id: i32) -> Specification<Product> {
        SpecificationBuilder::new()
            .criteria(vendor_filter(vendor_id))
            .filter(move |p: &Product| p.id == id)
            .include(VENDOR_INCLUDE)
            .without_paging()
            .build()
    }
}

/// Distinct brand names across the catalog, alphabetical.
pub fn brand_list() -> ProjectedSpecification<Product, String> {
    SpecificationBuilder::new()
        .order_by("brand", |p: &Product| p.brand.clone())
        .distinct()
        .without_paging()
        .select(|p: &Product| p.brand.clone())
}

/// Distinct product types across the catalog, alphabetical.
pub fn type_list() -> ProjectedSpecification<Product, String> {
    SpecificationBuilder::new()
        .order_by("type", |p: &Product| p.product_type.clone())
        .distinct()
        .without_paging()
        .select(|p: &Product| p.product_type.clone())
}
