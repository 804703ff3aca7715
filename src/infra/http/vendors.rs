//! Vendor self-service routes, keyed by the vendor id in the path.

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post, put},
};

use crate::{
    application::{
        catalog::{ProductInput, VendorDashboard},
        pagination::{Pagination, ProductSpecQuery},
    },
    domain::Product,
};

use super::{
    ApiError, HttpState,
    extract::{ApiJson, ApiPath, ApiQuery},
    invalidating,
};

pub(super) fn routes(state: &HttpState) -> Router<HttpState> {
    let reads = Router::new()
        .route("/vendors/{vendor_id}/products", get(list_products))
        .route("/vendors/{vendor_id}/products/{id}", get(get_product))
        .route("/vendors/{vendor_id}/dashboard", get(dashboard));

    let writes = invalidating(
        state,
        Router::new()
            .route(
                "/vendors/{vendor_id}/products",
                post(create_product),
            )
            .route(
                "/vendors/{vendor_id}/products/{id}",
                put(update_product).delete(delete_product),
            ),
    );

    reads.merge(writes)
}

async fn list_products(
    State(state): State<HttpState>,
    ApiPath(vendor_id): ApiPath<String>,
    ApiQuery(query): ApiQuery<ProductSpecQuery>,
) -> Result<Json<Pagination<Product>>, ApiError> {
    let params = query.into_params(state.limits);
    Ok(Json(state.catalog.vendor_products(&vendor_id, params).await?))
}

async fn get_product(
    State(state): State<HttpState>,
    ApiPath((vendor_id, id)): ApiPath<(String, i32)>,
) -> Result<Json<Product>, ApiError> {
    Ok(Json(state.catalog.vendor_product(&vendor_id, id).await?))
}

async fn dashboard(
    State(state): State<HttpState>,
    ApiPath(vendor_id): ApiPath<String>,
) -> Result<Json<VendorDashboard>, ApiError> {
    Ok(Json(state.catalog.vendor_dashboard(&vendor_id).await?))
}

async fn create_product(
    State(state): State<HttpState>,
    ApiPath(vendor_id): ApiPath<String>,
    ApiJson(input): ApiJson<ProductInput>,
) -> Result<impl IntoResponse, ApiError> {
    let product = state
        .catalog
        .create_vendor_product(&vendor_id, input)
        .await?;
    Ok((StatusCode::CREATED, Json(product)))
}

async fn update_product(
    State(state): State<HttpState>,
    ApiPath((vendor_id, id)): ApiPath<(String, i32)>,
    ApiJson(input): ApiJson<ProductInput>,
) -> Result<Json<Product>, ApiError> {
    Ok(Json(
        state
            .catalog
            .update_vendor_product(&vendor_id, id, input)
            .await?,
    ))
}

async fn delete_product(
    State(state): State<HttpState>,
    ApiPath((vendor_id, id)): ApiPath<(String, i32)>,
) -> Result<StatusCode, ApiError> {
    state.catalog.delete_vendor_product(&vendor_id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
