use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use axum::{
    Router,
    body::Body,
    extract::Path,
    http::{Method, Request, StatusCode},
    middleware,
    routing::{get, post},
};
use metrics_util::debugging::DebuggingRecorder;
use storefront::cache::{
    CacheConfig, CachePolicy, InvalidationPolicy, MemoryCacheStore, ResponseCache, cache_response,
    invalidate_on_success,
};
use tower::ServiceExt;

#[tokio::test]
async fn cache_paths_emit_expected_metric_keys() {
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();
    recorder
        .install()
        .expect("debug metrics recorder should install in this test process");

    let cache = ResponseCache::new(Arc::new(MemoryCacheStore::new()), CacheConfig::default());
    let calls = Arc::new(AtomicUsize::new(0));
    let app = Router::new()
        .route(
            "/products/{id}",
            get(move |Path(_id): Path<i32>| {
                let calls = Arc::clone(&calls);
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    StatusCode::OK
                }
            })
            .layer(middleware::from_fn_with_state(
                CachePolicy::new(cache.clone(), Duration::from_secs(300)),
                cache_response,
            )),
        )
        .route(
            "/products/{id}/approve",
            post(|| async { StatusCode::OK }).layer(middleware::from_fn_with_state(
                InvalidationPolicy::for_resource(cache.clone(), "products"),
                invalidate_on_success,
            )),
        );

    for (method, uri) in [
        (Method::GET, "/products/1"),
        (Method::GET, "/products/1"),
        (Method::GET, "/products/2"),
        (Method::POST, "/products/1/approve"),
    ] {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .expect("request should build");
        let response = app
            .clone()
            .oneshot(request)
            .await
            .expect("router should respond");
        assert_eq!(response.status(), StatusCode::OK);
    }

    let names: HashSet<String> = snapshotter
        .snapshot()
        .into_vec()
        .into_iter()
        .map(|(composite_key, _, _, _)| composite_key.key().name().to_string())
        .collect();

    let expected = [
        "storefront_cache_hit_total",
        "storefront_cache_miss_total",
        "storefront_cache_store_total",
        "storefront_cache_invalidated_total",
    ];

    for metric in expected {
        assert!(names.contains(metric), "missing metric: {metric}");
    }
}
