//! Stratus server binary.

use anyhow::{Context, Result};
use clap::Parser;
use figment::Figment;
use figment::providers::{Env, Format, Toml};
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use stratus_core::config::AppConfig;
use stratus_server::{AppState, create_router};
use stratus_upstream::WeatherApiClient;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Stratus - a caching proxy for current weather
#[derive(Parser, Debug)]
#[command(name = "stratusd")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(
        short,
        long,
        env = "STRATUS_CONFIG",
        default_value = "config/server.toml"
    )]
    config: String,
}

/// Flat environment variables accepted for compatibility with existing
/// deployments, and the config keys they set.
const LEGACY_ENV: &[(&str, &str)] = &[
    ("PORT", "server.port"),
    ("REDIS_URL", "store.url"),
    ("CACHE_TTL_SECONDS", "cache.ttl_secs"),
    ("WEATHER_API_BASE_URL", "upstream.base_url"),
    ("WEATHER_API_KEY", "upstream.api_key"),
];

/// Load configuration from the optional TOML file and the environment.
///
/// Priority, lowest first: defaults, file, `STRATUS_*` variables, legacy
/// flat variables.
fn load_config(config_path: &Path) -> Result<AppConfig> {
    let mut figment = Figment::new();

    if config_path.exists() {
        tracing::info!(config_path = %config_path.display(), "Loading configuration from file");
        figment = figment.merge(Toml::file(config_path));
    } else {
        tracing::debug!("No config file found at {}", config_path.display());
    }

    let legacy_names: Vec<&str> = LEGACY_ENV.iter().map(|(name, _)| *name).collect();
    let legacy = Env::raw().only(&legacy_names).map(|key| {
        LEGACY_ENV
            .iter()
            .find(|(name, _)| key == *name)
            .map(|(_, path)| (*path).into())
            .unwrap_or_else(|| key.as_str().to_string().into())
    });

    figment
        .merge(Env::prefixed("STRATUS_").split("__"))
        .merge(legacy)
        .extract()
        .context(
            "failed to load configuration. Set upstream.base_url and upstream.api_key \
             (or WEATHER_API_BASE_URL and WEATHER_API_KEY). \
             See config/server.example.toml for example configuration.",
        )
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env before anything reads the environment
    let dotenv = dotenvy::dotenv();

    let args = Args::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Stratus v{}", env!("CARGO_PKG_VERSION"));

    match dotenv {
        Ok(path) => tracing::info!(path = %path.display(), "Loaded environment from .env"),
        Err(e) if e.not_found() => tracing::debug!("No .env file found"),
        Err(e) => tracing::warn!(error = %e, "Failed to load .env file"),
    }

    let config = load_config(Path::new(&args.config))?;

    stratus_server::metrics::register_metrics();
    tracing::info!("Prometheus metrics registered");

    // Connect-then-listen: an unreachable store aborts startup
    let store = stratus_store::from_config(&config.store)
        .await
        .context("failed to initialize cache store")?;
    store
        .health_check()
        .await
        .context("cache store health check failed")?;
    tracing::info!(backend = store.backend_name(), "Cache store connectivity verified");

    let source = Arc::new(
        WeatherApiClient::new(&config.upstream).context("failed to initialize upstream client")?,
    );
    tracing::info!(
        provider = %config.upstream.provider,
        endpoint = %config.upstream.base_url,
        "Upstream client initialized"
    );

    let state = AppState::new(config.clone(), store, source).context("invalid configuration")?;

    if let Some(cleanup_interval) = state.rate_limit_cleanup_interval() {
        stratus_server::ratelimit::spawn_cleanup_task(state.rate_limit.clone(), cleanup_interval);
        tracing::info!(
            interval_secs = cleanup_interval.as_secs(),
            max_requests = config.rate_limit.max_requests,
            window_secs = config.rate_limit.window_secs,
            "Rate limiter cleanup task spawned"
        );
    } else {
        tracing::warn!("Rate limiting disabled");
    }

    let app = create_router(state);

    let addr: SocketAddr = config
        .server
        .bind_addr()
        .parse()
        .context("invalid bind address")?;

    tracing::info!("Listening on {}", addr);

    // ConnectInfo is required for per-IP rate limiting
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind to {}", addr))?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
