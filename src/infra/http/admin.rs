//! Moderation routes. Reads here are never cached; writes clear cached
//! product reads.

use axum::{
    Json, Router,
    extract::State,
    routing::{get, post, put},
};

use crate::{
    application::{
        catalog::{AdminDashboard, ProductInput},
        pagination::{Pagination, ProductSpecQuery},
    },
    domain::{Product, ProductStatus, Vendor},
};

use super::{
    ApiError, HttpState,
    extract::{ApiJson, ApiPath, ApiQuery},
    invalidating,
};

pub(super) fn routes(state: &HttpState) -> Router<HttpState> {
    let reads = Router::new()
        .route("/admin/products", get(list_products))
        .route("/admin/products/house", get(house_products))
        .route("/admin/dashboard", get(dashboard))
        .route("/admin/vendors", get(list_vendors));

    let writes = invalidating(
        state,
        Router::new()
            .route("/admin/products/{id}", put(update_product))
            .route("/admin/products/{id}/approve", post(approve_product))
            .route("/admin/products/{id}/reject", post(reject_product))
            .route("/admin/products/{id}/suspend", post(suspend_product)),
    );

    reads.merge(writes)
}

async fn list_products(
    State(state): State<HttpState>,
    ApiQuery(query): ApiQuery<ProductSpecQuery>,
) -> Result<Json<Pagination<Product>>, ApiError> {
    let params = query.into_params(state.limits);
    Ok(Json(state.catalog.admin_list_products(params).await?))
}

async fn house_products(
    State(state): State<HttpState>,
    ApiQuery(query): ApiQuery<ProductSpecQuery>,
) -> Result<Json<Pagination<Product>>, ApiError> {
    let params = query.into_params(state.limits);
    Ok(Json(state.catalog.house_products(params).await?))
}

async fn dashboard(State(state): State<HttpState>) -> Result<Json<AdminDashboard>, ApiError> {
    Ok(Json(state.catalog.admin_dashboard().await?))
}

async fn list_vendors(State(state): State<HttpState>) -> Json<Vec<Vendor>> {
    Json(state.catalog.vendors().to_vec())
}

async fn update_product(
    State(state): State<HttpState>,
    ApiPath(id): ApiPath<i32>,
    ApiJson(input): ApiJson<ProductInput>,
) -> Result<Json<Product>, ApiError> {
    Ok(Json(state.catalog.update_product(id, input).await?))
}

async fn approve_product(
    state: State<HttpState>,
    id: ApiPath<i32>,
) -> Result<Json<Product>, ApiError> {
    moderate(state, id, ProductStatus::Approved).await
}

async fn reject_product(
    state: State<HttpState>,
    id: ApiPath<i32>,
) -> Result<Json<Product>, ApiError> {
    moderate(state, id, ProductStatus::Rejected).await
}

async fn suspend_product(
    state: State<HttpState>,
    id: ApiPath<i32>,
) -> Result<Json<Product>, ApiError> {
    moderate(state, id, ProductStatus::Suspended).await
}

async fn moderate(
    State(state): State<HttpState>,
    ApiPath(id): ApiPath<i32>,
    status: ProductStatus,
) -> Result<Json<Product>, ApiError> {
    Ok(Json(state.catalog.set_status(id, status).await?))
}
