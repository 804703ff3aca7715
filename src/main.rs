use std::{future::IntoFuture, process, sync::Arc, time::Duration};

use metrics::counter;
use storefront::{
    application::{
        catalog::CatalogService, error::AppError, pagination::ProductSpecQuery,
    },
    cache::{CacheConfig, MemoryCacheStore, ResponseCache},
    config::{self, QueryArgs, QueryTarget},
    infra::{
        error::InfraError,
        http::{self, HttpState},
        memory::MemorySource,
        seed::SeedData,
        telemetry,
    },
};
use tokio::{sync::Notify, task::JoinHandle};
use tracing::{Dispatch, Level, dispatcher, error, info, warn};
use tracing_subscriber::fmt as tracing_fmt;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
    if dispatcher::has_been_set() {
        error!(error = %error, "application error");
        return;
    }

    let subscriber = tracing_fmt().with_max_level(Level::ERROR).finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli()
        .map_err(|err| AppError::unexpected(format!("failed to load configuration: {err}")))?;

    let command = cli_args
        .command
        .unwrap_or(config::Command::Serve(Box::<config::ServeArgs>::default()));

    telemetry::init(&settings.logging).map_err(AppError::from)?;

    match command {
        config::Command::Serve(_) => run_serve(settings).await,
        config::Command::Query(args) => run_query(settings, args).await,
    }
}

async fn build_catalog(settings: &config::Settings) -> Result<CatalogService, AppError> {
    let seed = SeedData::load(settings.catalog.seed_path.as_deref()).await?;
    if !seed
        .vendors
        .iter()
        .any(|vendor| vendor.id == settings.catalog.house_vendor_id)
    {
        return Err(InfraError::configuration(format!(
            "house vendor `{}` is not a known vendor",
            settings.catalog.house_vendor_id
        ))
        .into());
    }

    let source = Arc::new(MemorySource::products(seed.products, seed.vendors.clone()));
    Ok(
        CatalogService::new(source, seed.vendors, settings.catalog.house_vendor_id.clone())
            .with_query_timeout(settings.query.timeout),
    )
}

async fn run_serve(settings: config::Settings) -> Result<(), AppError> {
    let catalog = Arc::new(build_catalog(&settings).await?);

    let cache_config = CacheConfig::from(&settings.cache);
    let store = Arc::new(MemoryCacheStore::with_capacity(
        cache_config.max_entries_non_zero(),
    ));
    let cache = ResponseCache::new(store.clone(), cache_config);
    let sweeper = settings
        .cache
        .sweep_interval
        .map(|interval| spawn_cache_sweeper(store, interval));

    let state = HttpState {
        catalog,
        cache,
        limits: settings.pagination.limits(),
    };

    let result = serve_http(&settings, state).await;

    if let Some(handle) = sweeper {
        handle.abort();
        let _ = handle.await;
    }

    result
}

fn spawn_cache_sweeper(store: Arc<MemoryCacheStore>, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        interval.tick().await;
        loop {
            interval.tick().await;
            let removed = store.purge_expired();
            if removed > 0 {
                counter!("storefront_cache_swept_total").increment(removed as u64);
                info!(
                    target = "storefront::cache::sweeper",
                    removed, "Expired cache entries swept"
                );
            }
        }
    })
}

async fn serve_http(settings: &config::Settings, state: HttpState) -> Result<(), AppError> {
    let router = http::build_router(state);

    let listener = tokio::net::TcpListener::bind(settings.server.addr)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;
    info!(
        target = "storefront::http",
        addr = %settings.server.addr,
        "Listening"
    );

    let shutdown = Arc::new(Notify::new());
    let signal = Arc::clone(&shutdown);
    let mut server = tokio::spawn(
        axum::serve(listener, router.into_make_service())
            .with_graceful_shutdown(async move { signal.notified().await })
            .into_future(),
    );

    let outcome = tokio::select! {
        joined = &mut server => joined,
        _ = tokio::signal::ctrl_c() => {
            info!(target = "storefront::http", "Shutdown requested, draining connections");
            shutdown.notify_one();
            match tokio::time::timeout(settings.server.graceful_shutdown, &mut server).await {
                Ok(joined) => joined,
                Err(_) => {
                    warn!(
                        target = "storefront::http",
                        grace = ?settings.server.graceful_shutdown,
                        "Graceful shutdown timed out"
                    );
                    server.abort();
                    return Ok(());
                }
            }
        }
    };

    outcome
        .map_err(|err| AppError::unexpected(format!("server task failed: {err}")))?
        .map_err(|err| AppError::unexpected(format!("server error: {err}")))
}

async fn run_query(settings: config::Settings, args: QueryArgs) -> Result<(), AppError> {
    let catalog = build_catalog(&settings).await?;

    let output = match args.target {
        QueryTarget::Brands => serde_json::to_string_pretty(&catalog.brands().await?),
        QueryTarget::Types => serde_json::to_string_pretty(&catalog.types().await?),
        QueryTarget::Products => {
            let query = ProductSpecQuery {
                search: args.search,
                brands: args.brands,
                types: args.types,
                status: None,
                sort: args.sort,
                page_index: args.page_index,
                page_size: args.page_size,
            };
            let params = query.into_params(settings.pagination.limits());
            serde_json::to_string_pretty(&catalog.list_products(params).await?)
        }
    }
    .map_err(|err| AppError::unexpected(format!("failed to encode output: {err}")))?;

    println!("{output}");
    Ok(())
}
