//! Per-route response caching and invalidation middleware.
//!
//! Routes opt in explicitly:
//!
//! ```ignore
//! get(list_products).layer(middleware::from_fn_with_state(
//!     CachePolicy::new(cache.clone(), ttl),
//!     cache_response,
//! ))
//! ```

use std::time::Duration;

use axum::{
    body::{Body, HttpBody},
    extract::State,
    http::{HeaderName, HeaderValue, Method, Request, StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::{debug, instrument, warn};

use super::{keys::CacheKey, service::ResponseCache, store::CachedResponse};

/// Largest response body the middleware buffers for caching.
const MAX_CACHED_BODY_BYTES: usize = 1024 * 1024;

pub const X_CACHE: HeaderName = HeaderName::from_static("x-cache");

/// Cache GET responses of one route for `ttl`.
#[derive(Clone)]
pub struct CachePolicy {
    pub cache: ResponseCache,
    pub ttl: Duration,
}

impl CachePolicy {
    pub fn new(cache: ResponseCache, ttl: Duration) -> Self {
        Self { cache, ttl }
    }
}

/// Clear every key under `prefix` after a route succeeds.
#[derive(Clone)]
pub struct InvalidationPolicy {
    pub cache: ResponseCache,
    pub prefix: String,
}

impl InvalidationPolicy {
    pub fn new(cache: ResponseCache, prefix: impl Into<String>) -> Self {
        Self {
            cache,
            prefix: prefix.into(),
        }
    }

    /// Invalidate every cached response of `resource`.
    pub fn for_resource(cache: ResponseCache, resource: &str) -> Self {
        Self::new(cache, CacheKey::prefix_for(resource))
    }
}

/// Serve GET requests from the cache, storing `200 OK` responses on a miss.
///
/// Other methods and a disabled cache pass straight through.
#[instrument(skip_all, fields(path = %request.uri().path()))]
pub async fn cache_response(
    State(policy): State<CachePolicy>,
    request: Request<Body>,
    next: Next,
) -> Response {
    if !policy.cache.is_enabled() || request.method() != Method::GET {
        return next.run(request).await;
    }

    let key = CacheKey::from_uri(request.method(), request.uri());
    if let Some(cached) = policy.cache.get(&key).await {
        return build_response(cached);
    }

    let response = next.run(request).await;
    if !should_store_response(&response) {
        return response;
    }

    let (mut parts, body) = response.into_parts();
    parts.headers.insert(X_CACHE, HeaderValue::from_static("MISS"));
    let cacheable_size = body
        .size_hint()
        .upper()
        .is_some_and(|upper| upper <= MAX_CACHED_BODY_BYTES as u64);
    if !cacheable_size {
        debug!(
            target = "storefront::cache::middleware",
            key = %key,
            "response body too large or unsized; not cached"
        );
        return Response::from_parts(parts, body);
    }

    // Size is already bounded; only a failing handler body errors here.
    let bytes = match axum::body::to_bytes(body, MAX_CACHED_BODY_BYTES).await {
        Ok(bytes) => bytes,
        Err(err) => {
            warn!(
                target = "storefront::cache::middleware",
                key = %key,
                error = %err,
                "failed to buffer response body"
            );
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    let content_type = parts
        .headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("application/octet-stream")
        .to_string();
    policy
        .cache
        .set(&key, CachedResponse::new(content_type, bytes.clone()), policy.ttl)
        .await;

    Response::from_parts(parts, Body::from(bytes))
}

/// Run the route, then invalidate the policy prefix if it returned 2xx.
#[instrument(skip_all, fields(path = %request.uri().path(), prefix = %policy.prefix))]
pub async fn invalidate_on_success(
    State(policy): State<InvalidationPolicy>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let response = next.run(request).await;
    if response.status().is_success() {
        policy.cache.invalidate(&policy.prefix).await;
    }
    response
}

fn should_store_response(response: &Response) -> bool {
    if response.status() != StatusCode::OK {
        return false;
    }

    if response.headers().contains_key(header::SET_COOKIE) {
        return false;
    }

    !response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.starts_with("text/event-stream"))
}

fn build_response(cached: CachedResponse) -> Response {
    let mut response = Response::new(Body::from(cached.body));
    if let Ok(content_type) = HeaderValue::from_str(&cached.content_type) {
        response
            .headers_mut()
            .insert(header::CONTENT_TYPE, content_type);
    }
    response
        .headers_mut()
        .insert(X_CACHE, HeaderValue::from_static("HIT"));
    response
}

#[cfg(test)]
mod tests {
    use std::sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    };

    use axum::{
        Json, Router, middleware,
        routing::{get, post},
    };
    use tower::ServiceExt;

    use super::*;
    use crate::cache::{CacheConfig, MemoryCacheStore};

    fn cache() -> ResponseCache {
        ResponseCache::new(Arc::new(MemoryCacheStore::new()), CacheConfig::default())
    }

    fn counting_router(cache: ResponseCache, calls: Arc<AtomicUsize>, status: StatusCode) -> Router {
        let writes = Arc::clone(&calls);
        Router::new()
            .route(
                "/products",
                get(move || {
                    let calls = Arc::clone(&calls);
                    async move {
                        let n = calls.fetch_add(1, Ordering::SeqCst);
                        (status, Json(vec![n]))
                    }
                })
                .layer(middleware::from_fn_with_state(
                    CachePolicy::new(cache.clone(), Duration::from_secs(60)),
                    cache_response,
                )),
            )
            .route(
                "/products/{id}/approve",
                post(move || {
                    let writes = Arc::clone(&writes);
                    async move {
                        writes.fetch_add(100, Ordering::SeqCst);
                        StatusCode::NO_CONTENT
                    }
                })
                .layer(middleware::from_fn_with_state(
                    InvalidationPolicy::for_resource(cache, "products"),
                    invalidate_on_success,
                )),
            )
    }

    async fn send(app: &Router, method: Method, uri: &str) -> Response {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .expect("request");
        app.clone().oneshot(request).await.expect("response")
    }

    fn x_cache(response: &Response) -> Option<&str> {
        response
            .headers()
            .get(X_CACHE)
            .and_then(|value| value.to_str().ok())
    }

    #[tokio::test]
    async fn second_get_is_served_from_cache() {
        let calls = Arc::new(AtomicUsize::new(0));
        let app = counting_router(cache(), calls.clone(), StatusCode::OK);

        let first = send(&app, Method::GET, "/products?sort=name&pageIndex=1").await;
        assert_eq!(x_cache(&first), Some("MISS"));
        let second = send(&app, Method::GET, "/products?pageIndex=1&sort=name").await;
        assert_eq!(x_cache(&second), Some("HIT"));
        assert_eq!(
            second.headers().get(header::CONTENT_TYPE).expect("content type"),
            "application/json"
        );
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn non_ok_responses_are_not_stored() {
        let calls = Arc::new(AtomicUsize::new(0));
        let app = counting_router(cache(), calls.clone(), StatusCode::ACCEPTED);

        send(&app, Method::GET, "/products").await;
        let again = send(&app, Method::GET, "/products").await;
        assert_eq!(x_cache(&again), None);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn successful_mutation_invalidates_resource() {
        let calls = Arc::new(AtomicUsize::new(0));
        let app = counting_router(cache(), calls.clone(), StatusCode::OK);

        send(&app, Method::GET, "/products").await;
        let mutation = send(&app, Method::POST, "/products/1/approve").await;
        assert_eq!(mutation.status(), StatusCode::NO_CONTENT);

        let after = send(&app, Method::GET, "/products").await;
        assert_eq!(x_cache(&after), Some("MISS"));
        assert_eq!(calls.load(Ordering::SeqCst), 102);
    }

    #[tokio::test]
    async fn oversized_body_passes_through_uncached() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let app = Router::new().route(
            "/products/{id}",
            get(move || {
                let counter = Arc::clone(&counter);
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    "x".repeat(MAX_CACHED_BODY_BYTES + 1)
                }
            })
            .layer(middleware::from_fn_with_state(
                CachePolicy::new(cache(), Duration::from_secs(60)),
                cache_response,
            )),
        );

        for _ in 0..2 {
            let response = send(&app, Method::GET, "/products/1").await;
            assert_eq!(response.status(), StatusCode::OK);
            assert_eq!(x_cache(&response), Some("MISS"));
            let body = axum::body::to_bytes(response.into_body(), usize::MAX)
                .await
                .expect("body");
            assert_eq!(body.len(), MAX_CACHED_BODY_BYTES + 1);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn set_cookie_responses_are_not_stored() {
        let mut response = StatusCode::OK.into_response();
        assert!(should_store_response(&response));
        response
            .headers_mut()
            .insert(header::SET_COOKIE, HeaderValue::from_static("a=b"));
        assert!(!should_store_response(&response));
    }
}
