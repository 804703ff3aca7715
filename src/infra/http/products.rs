use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post, put},
};

use crate::{
    application::{
        catalog::ProductInput,
        pagination::{Pagination, ProductSpecQuery},
    },
    domain::Product,
};

use super::{
    ApiError, HttpState,
    extract::{ApiJson, ApiPath, ApiQuery},
    cached, invalidating,
};

pub(super) fn routes(state: &HttpState) -> Router<HttpState> {
    let config = state.cache.config();

    let listings = cached(
        state,
        config.list_ttl,
        Router::new().route("/products", get(list_products)),
    );
    let items = cached(
        state,
        config.item_ttl,
        Router::new().route("/products/{id}", get(get_product)),
    );
    let lookups = cached(
        state,
        config.lookup_ttl,
        Router::new()
            .route("/products/brands", get(list_brands))
            .route("/products/types", get(list_types)),
    );
    let writes = invalidating(
        state,
        Router::new()
            .route("/products", post(create_product))
            .route(
                "/products/{id}",
                put(update_product).delete(delete_product),
            ),
    );

    listings.merge(items).merge(lookups).merge(writes)
}

async fn list_products(
    State(state): State<HttpState>,
    ApiQuery(query): ApiQuery<ProductSpecQuery>,
) -> Result<Json<Pagination<Product>>, ApiError> {
    let params = query.into_params(state.limits);
    Ok(Json(state.catalog.list_products(params).await?))
}

async fn get_product(
    State(state): State<HttpState>,
    ApiPath(id): ApiPath<i32>,
) -> Result<Json<Product>, ApiError> {
    Ok(Json(state.catalog.get_product(id).await?))
}

async fn list_brands(State(state): State<HttpState>) -> Result<Json<Vec<String>>, ApiError> {
    Ok(Json(state.catalog.brands().await?))
}

async fn list_types(State(state): State<HttpState>) -> Result<Json<Vec<String>>, ApiError> {
    Ok(Json(state.catalog.types().await?))
}

async fn create_product(
    State(state): State<HttpState>,
    ApiJson(input): ApiJson<ProductInput>,
) -> Result<impl IntoResponse, ApiError> {
    let product = state.catalog.create_product(input).await?;
    Ok((StatusCode::CREATED, Json(product)))
}

async fn update_product(
    State(state): State<HttpState>,
    ApiPath(id): ApiPath<i32>,
    ApiJson(input): ApiJson<ProductInput>,
) -> Result<Json<Product>, ApiError> {
    Ok(Json(state.catalog.update_product(id, input).await?))
}

async fn delete_product(
    State(state): State<HttpState>,
    ApiPath(id): ApiPath<i32>,
) -> Result<StatusCode, ApiError> {
    state.catalog.delete_product(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
