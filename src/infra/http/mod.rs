//! Catalog HTTP API.
//!
//! Every route lives under `/api`. Cacheable reads and invalidating writes are
//! grouped into sub-routers so each group carries exactly one cache policy.

mod admin;
mod error;
mod extract;
mod middleware;
mod products;
mod vendors;

pub use error::ApiError;
pub use middleware::X_REQUEST_ID;

use std::{sync::Arc, time::Duration};

use axum::{
    Router, http::StatusCode, middleware as axum_middleware, response::IntoResponse,
    routing::get,
};

use crate::{
    application::{catalog::CatalogService, pagination::PageLimits},
    cache::{CachePolicy, InvalidationPolicy, ResponseCache, cache_response, invalidate_on_success},
};

use middleware::{log_responses, set_request_context};

/// Cache resource shared by every product route.
pub const PRODUCTS_RESOURCE: &str = "products";

#[derive(Clone)]
pub struct HttpState {
    pub catalog: Arc<CatalogService>,
    pub cache: ResponseCache,
    pub limits: PageLimits,
}

pub fn build_router(state: HttpState) -> Router {
    let api = Router::new()
        .merge(products::routes(&state))
        .merge(admin::routes(&state))
        .merge(vendors::routes(&state))
        .with_state(state);

    Router::new()
        .nest("/api", api)
        .route("/_health", get(health))
        .layer(axum_middleware::from_fn(log_responses))
        .layer(axum_middleware::from_fn(set_request_context))
}

/// Serve the GET routes of `reads` from the response cache for `ttl`.
fn cached(state: &HttpState, ttl: Duration, reads: Router<HttpState>) -> Router<HttpState> {
    reads.route_layer(axum_middleware::from_fn_with_state(
        CachePolicy::new(state.cache.clone(), ttl),
        cache_response,
    ))
}

/// Wrap mutating routes so a 2xx response clears cached product reads.
fn invalidating(state: &HttpState, writes: Router<HttpState>) -> Router<HttpState> {
    writes.route_layer(axum_middleware::from_fn_with_state(
        InvalidationPolicy::for_resource(state.cache.clone(), PRODUCTS_RESOURCE),
        invalidate_on_success,
    ))
}

async fn health() -> impl IntoResponse {
    StatusCode::NO_CONTENT
}
