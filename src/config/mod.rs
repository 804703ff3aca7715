//! Configuration layer: typed settings with layered precedence (file → env → CLI).

use std::{net::SocketAddr, num::{NonZeroU32, NonZeroUsize}, path::PathBuf, str::FromStr, time::Duration};

use clap::{Args, Parser, Subcommand, ValueEnum, ValueHint, builder::BoolishValueParser};
use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;

use crate::application::pagination::{DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE, PageLimits};

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "storefront";
const ENV_PREFIX: &str = "STOREFRONT";
const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 5000;
const DEFAULT_GRACEFUL_SHUTDOWN_SECS: u64 = 30;
const DEFAULT_LIST_TTL_SECS: u64 = 600;
const DEFAULT_ITEM_TTL_SECS: u64 = 300;
const DEFAULT_LOOKUP_TTL_SECS: u64 = 100_000;
const DEFAULT_CACHE_MAX_ENTRIES: usize = 10_000;
const DEFAULT_HOUSE_VENDOR_ID: &str = "extra-mile";

/// Command-line arguments for the storefront binary.
#[derive(Debug, Parser)]
#[command(name = "storefront", version, about = "Storefront catalog server")]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(long = "config-file", env = "STOREFRONT_CONFIG_FILE", value_name = "PATH")]
    pub config_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Run the catalog HTTP API.
    Serve(Box<ServeArgs>),
    /// Run one catalog query against the seed data and print it as JSON.
    Query(QueryArgs),
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeArgs {
    #[command(flatten)]
    pub overrides: ServeOverrides,
}

#[derive(Debug, Args, Default, Clone)]
pub struct CatalogOverride {
    /// Replace the bundled product list with a JSON file.
    #[arg(long = "seed-products", value_name = "FILE", value_hint = ValueHint::FilePath)]
    pub seed_products: Option<PathBuf>,
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeOverrides {
    #[command(flatten)]
    pub catalog: CatalogOverride,

    /// Override the listener host.
    #[arg(long = "server-host", value_name = "HOST")]
    pub server_host: Option<String>,

    /// Override the listener port.
    #[arg(long = "server-port", value_name = "PORT")]
    pub server_port: Option<u16>,

    /// Override the graceful shutdown timeout.
    #[arg(long = "server-graceful-shutdown-seconds", value_name = "SECONDS")]
    pub server_graceful_shutdown_seconds: Option<u64>,

    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Toggle JSON logging.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub log_json: Option<bool>,

    /// Toggle response caching.
    #[arg(
        long = "cache-enabled",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub cache_enabled: Option<bool>,

    /// Override the TTL of cached product listings.
    #[arg(long = "cache-list-ttl-seconds", value_name = "SECONDS")]
    pub cache_list_ttl_seconds: Option<u64>,

    /// Override the TTL of cached single products.
    #[arg(long = "cache-item-ttl-seconds", value_name = "SECONDS")]
    pub cache_item_ttl_seconds: Option<u64>,

    /// Override the TTL of cached brand and type lookups.
    #[arg(long = "cache-lookup-ttl-seconds", value_name = "SECONDS")]
    pub cache_lookup_ttl_seconds: Option<u64>,

    /// Bound the number of cached responses; the least recently used is evicted.
    #[arg(long = "cache-max-entries", value_name = "COUNT")]
    pub cache_max_entries: Option<usize>,

    /// Sweep expired cache entries at this interval; 0 disables the sweeper.
    #[arg(long = "cache-sweep-interval-seconds", value_name = "SECONDS")]
    pub cache_sweep_interval_seconds: Option<u64>,

    /// Override the default page size.
    #[arg(long = "pagination-default-page-size", value_name = "COUNT")]
    pub default_page_size: Option<u32>,

    /// Override the largest page size a client may request.
    #[arg(long = "pagination-max-page-size", value_name = "COUNT")]
    pub max_page_size: Option<u32>,

    /// Bound every data source call; 0 disables the bound.
    #[arg(long = "query-timeout-ms", value_name = "MILLIS")]
    pub query_timeout_ms: Option<u64>,
}

/// Which catalog read the `query` command runs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum QueryTarget {
    #[default]
    Products,
    Brands,
    Types,
}

#[derive(Debug, Args, Clone)]
pub struct QueryArgs {
    #[command(flatten)]
    pub catalog: CatalogOverride,

    #[arg(value_enum, default_value_t = QueryTarget::Products)]
    pub target: QueryTarget,

    /// Case-insensitive name search.
    #[arg(long)]
    pub search: Option<String>,

    /// Brands to include, comma separated.
    #[arg(long, value_delimiter = ',')]
    pub brands: Vec<String>,

    /// Types to include, comma separated.
    #[arg(long, value_delimiter = ',')]
    pub types: Vec<String>,

    /// Sort key (priceAsc|priceDesc|name|newest|oldest).
    #[arg(long)]
    pub sort: Option<String>,

    #[arg(long = "page-index", value_name = "INDEX")]
    pub page_index: Option<i64>,

    #[arg(long = "page-size", value_name = "COUNT")]
    pub page_size: Option<i64>,
}

/// Fully-resolved deployment settings after precedence resolution and validation.
#[derive(Debug, Clone)]
pub struct Settings {
    pub server: ServerSettings,
    pub logging: LoggingSettings,
    pub cache: CacheSettings,
    pub pagination: PaginationSettings,
    pub query: QuerySettings,
    pub catalog: CatalogSettings,
}

#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub addr: SocketAddr,
    pub graceful_shutdown: Duration,
}

#[derive(Debug, Clone)]
pub struct LoggingSettings {
    pub level: LevelFilter,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy)]
pub enum LogFormat {
    Json,
    Compact,
}

#[derive(Debug, Clone)]
pub struct CacheSettings {
    pub enabled: bool,
    pub list_ttl: Duration,
    pub item_ttl: Duration,
    pub lookup_ttl: Duration,
    pub max_entries: NonZeroUsize,
    pub sweep_interval: Option<Duration>,
}

#[derive(Debug, Clone)]
pub struct PaginationSettings {
    pub default_page_size: NonZeroU32,
    pub max_page_size: NonZeroU32,
}

impl PaginationSettings {
    pub fn limits(&self) -> PageLimits {
        PageLimits {
            default_page_size: self.default_page_size.get(),
            max_page_size: self.max_page_size.get(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct QuerySettings {
    pub timeout: Option<Duration>,
}

#[derive(Debug, Clone)]
pub struct CatalogSettings {
    pub seed_path: Option<PathBuf>,
    pub house_vendor_id: String,
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to build configuration: {0}")]
    Build(#[from] config::ConfigError),
    #[error("invalid configuration for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl LoadError {
    fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

/// Load settings using the configured precedence (file → environment → CLI).
pub fn load(cli: &CliArgs) -> Result<Settings, LoadError> {
    let mut builder = Config::builder()
        .add_source(File::with_name(DEFAULT_CONFIG_BASENAME).required(false))
        .add_source(File::with_name(LOCAL_CONFIG_BASENAME).required(false));

    if let Some(path) = cli.config_file.as_ref() {
        builder = builder.add_source(File::from(path.as_path()).required(true));
    }

    builder = builder.add_source(Environment::with_prefix(ENV_PREFIX).separator("__"));

    let mut raw: RawSettings = builder.build()?.try_deserialize()?;

    match cli.command.as_ref() {
        Some(Command::Serve(args)) => raw.apply_serve_overrides(&args.overrides),
        Some(Command::Query(args)) => raw.apply_catalog_override(&args.catalog),
        None => raw.apply_serve_overrides(&ServeOverrides::default()),
    }

    Settings::from_raw(raw)
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    server: RawServerSettings,
    logging: RawLoggingSettings,
    cache: RawCacheSettings,
    pagination: RawPaginationSettings,
    query: RawQuerySettings,
    catalog: RawCatalogSettings,
}

impl RawSettings {
    fn apply_serve_overrides(&mut self, overrides: &ServeOverrides) {
        if let Some(host) = overrides.server_host.as_ref() {
            self.server.host = Some(host.clone());
        }
        if let Some(port) = overrides.server_port {
            self.server.port = Some(port);
        }
        if let Some(seconds) = overrides.server_graceful_shutdown_seconds {
            self.server.graceful_shutdown_seconds = Some(seconds);
        }
        if let Some(level) = overrides.log_level.as_ref() {
            self.logging.level = Some(level.clone());
        }
        if let Some(json) = overrides.log_json {
            self.logging.json = Some(json);
        }
        if let Some(enabled) = overrides.cache_enabled {
            self.cache.enabled = Some(enabled);
        }
        if let Some(seconds) = overrides.cache_list_ttl_seconds {
            self.cache.list_ttl_seconds = Some(seconds);
        }
        if let Some(seconds) = overrides.cache_item_ttl_seconds {
            self.cache.item_ttl_seconds = Some(seconds);
        }
        if let Some(seconds) = overrides.cache_lookup_ttl_seconds {
            self.cache.lookup_ttl_seconds = Some(seconds);
        }
        if let Some(entries) = overrides.cache_max_entries {
            self.cache.max_entries = Some(entries);
        }
        if let Some(seconds) = overrides.cache_sweep_interval_seconds {
            self.cache.sweep_interval_seconds = Some(seconds);
        }
        if let Some(size) = overrides.default_page_size {
            self.pagination.default_page_size = Some(size);
        }
        if let Some(size) = overrides.max_page_size {
            self.pagination.max_page_size = Some(size);
        }
        if let Some(millis) = overrides.query_timeout_ms {
            self.query.timeout_ms = Some(millis);
        }

        self.apply_catalog_override(&overrides.catalog);
    }

    fn apply_catalog_override(&mut self, overrides: &CatalogOverride) {
        if let Some(path) = overrides.seed_products.as_ref() {
            self.catalog.seed_path = Some(path.clone());
        }
    }
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        let RawSettings {
            server,
            logging,
            cache,
            pagination,
            query,
            catalog,
        } = raw;

        Ok(Self {
            server: build_server_settings(server)?,
            logging: build_logging_settings(logging)?,
            cache: build_cache_settings(cache)?,
            pagination: build_pagination_settings(pagination)?,
            query: build_query_settings(query),
            catalog: build_catalog_settings(catalog)?,
        })
    }
}

fn build_server_settings(server: RawServerSettings) -> Result<ServerSettings, LoadError> {
    let host = server.host.unwrap_or_else(|| DEFAULT_HOST.to_string());

    let port = server.port.unwrap_or(DEFAULT_PORT);
    if port == 0 {
        return Err(LoadError::invalid(
            "server.port",
            "port must be greater than zero",
        ));
    }

    let addr = parse_socket_addr(&host, port)
        .map_err(|reason| LoadError::invalid("server.addr", reason))?;

    let graceful_secs = server
        .graceful_shutdown_seconds
        .unwrap_or(DEFAULT_GRACEFUL_SHUTDOWN_SECS);
    if graceful_secs == 0 {
        return Err(LoadError::invalid(
            "server.graceful_shutdown_seconds",
            "must be greater than zero",
        ));
    }

    Ok(ServerSettings {
        addr,
        graceful_shutdown: Duration::from_secs(graceful_secs),
    })
}

fn build_logging_settings(logging: RawLoggingSettings) -> Result<LoggingSettings, LoadError> {
    let level = match logging.level {
        Some(level) => LevelFilter::from_str(level.as_str()).map_err(|err| {
            LoadError::invalid("logging.level", format!("failed to parse: {err}"))
        })?,
        None => LevelFilter::INFO,
    };

    let format = if logging.json.unwrap_or(false) {
        LogFormat::Json
    } else {
        LogFormat::Compact
    };

    Ok(LoggingSettings { level, format })
}

fn build_cache_settings(cache: RawCacheSettings) -> Result<CacheSettings, LoadError> {
    let ttl = |value: Option<u64>, default: u64, key: &'static str| {
        let seconds = value.unwrap_or(default);
        if seconds == 0 {
            return Err(LoadError::invalid(key, "must be greater than zero"));
        }
        Ok(Duration::from_secs(seconds))
    };

    Ok(CacheSettings {
        enabled: cache.enabled.unwrap_or(true),
        list_ttl: ttl(
            cache.list_ttl_seconds,
            DEFAULT_LIST_TTL_SECS,
            "cache.list_ttl_seconds",
        )?,
        item_ttl: ttl(
            cache.item_ttl_seconds,
            DEFAULT_ITEM_TTL_SECS,
            "cache.item_ttl_seconds",
        )?,
        lookup_ttl: ttl(
            cache.lookup_ttl_seconds,
            DEFAULT_LOOKUP_TTL_SECS,
            "cache.lookup_ttl_seconds",
        )?,
        max_entries: NonZeroUsize::new(cache.max_entries.unwrap_or(DEFAULT_CACHE_MAX_ENTRIES))
            .ok_or_else(|| LoadError::invalid("cache.max_entries", "must be greater than zero"))?,
        sweep_interval: cache
            .sweep_interval_seconds
            .filter(|seconds| *seconds > 0)
            .map(Duration::from_secs),
    })
}

fn build_pagination_settings(
    pagination: RawPaginationSettings,
) -> Result<PaginationSettings, LoadError> {
    let default_page_size = non_zero_u32(
        pagination
            .default_page_size
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .into(),
        "pagination.default_page_size",
    )?;
    let max_page_size = non_zero_u32(
        pagination.max_page_size.unwrap_or(MAX_PAGE_SIZE).into(),
        "pagination.max_page_size",
    )?;
    if default_page_size > max_page_size {
        return Err(LoadError::invalid(
            "pagination.default_page_size",
            "must not exceed pagination.max_page_size",
        ));
    }

    Ok(PaginationSettings {
        default_page_size,
        max_page_size,
    })
}

fn build_query_settings(query: RawQuerySettings) -> QuerySettings {
    QuerySettings {
        timeout: query
            .timeout_ms
            .filter(|millis| *millis > 0)
            .map(Duration::from_millis),
    }
}

fn build_catalog_settings(catalog: RawCatalogSettings) -> Result<CatalogSettings, LoadError> {
    let house_vendor_id = catalog
        .house_vendor_id
        .map(|value| value.trim().to_string())
        .unwrap_or_else(|| DEFAULT_HOUSE_VENDOR_ID.to_string());
    if house_vendor_id.is_empty() {
        return Err(LoadError::invalid(
            "catalog.house_vendor_id",
            "must not be empty",
        ));
    }

    let seed_path = catalog
        .seed_path
        .filter(|path| !path.as_os_str().is_empty());

    Ok(CatalogSettings {
        seed_path,
        house_vendor_id,
    })
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawServerSettings {
    host: Option<String>,
    port: Option<u16>,
    graceful_shutdown_seconds: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLoggingSettings {
    level: Option<String>,
    json: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawCacheSettings {
    enabled: Option<bool>,
    list_ttl_seconds: Option<u64>,
    item_ttl_seconds: Option<u64>,
    lookup_ttl_seconds: Option<u64>,
    max_entries: Option<usize>,
    sweep_interval_seconds: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawPaginationSettings {
    default_page_size: Option<u32>,
    max_page_size: Option<u32>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawQuerySettings {
    timeout_ms: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawCatalogSettings {
    seed_path: Option<PathBuf>,
    house_vendor_id: Option<String>,
}

fn parse_socket_addr(host: &str, port: u16) -> Result<SocketAddr, String> {
    let candidate = format!("{host}:{port}");
    candidate
        .parse()
        .map_err(|err| format!("invalid address `{candidate}`: {err}"))
}

fn non_zero_u32(value: u64, key: &'static str) -> Result<NonZeroU32, LoadError> {
    if value == 0 {
        return Err(LoadError::invalid(key, "must be greater than zero"));
    }
    let value_u32: u32 = value
        .try_into()
        .map_err(|_| LoadError::invalid(key, "value exceeds supported range for u32"))?;
    NonZeroU32::new(value_u32).ok_or_else(|| LoadError::invalid(key, "must be greater than zero"))
}

/// Resolve configuration using the supplied CLI arguments, returning both for downstream use.
pub fn load_with_cli() -> Result<(CliArgs, Settings), LoadError> {
    let args = CliArgs::parse();
    let settings = load(&args)?;
    Ok((args, settings))
}
