mod api;
mod config;
mod error;
mod models;
mod services;
#[cfg(test)]
mod test_support;

use crate::api::AppState;
use crate::config::Config;
use crate::services::{
    spawn_cache_reset, CacheStore, LibraryCache, PlaylistSynchronizer, RedisCacheStore,
    SpotifyGatewayProvider,
};
use axum::http::{header, HeaderValue, Method};
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    // Load configuration
    let config = Config::from_env()?;
    tracing::info!(
        "Configuration loaded: global buckets [{}], artist buckets [{}], batch size {}",
        config.sync.global_scheme,
        config.sync.artist_scheme,
        config.sync.batch_size
    );

    // Connect to Redis
    let redis_client = redis::Client::open(config.redis_url.as_str())?;
    let redis = redis::aio::ConnectionManager::new(redis_client).await?;
    tracing::info!("Connected to Redis");

    // Initialize services
    let store: Arc<dyn CacheStore> = Arc::new(RedisCacheStore::new(redis));
    let library = LibraryCache::new(store.clone(), config.sync.cache_ttl);
    let synchronizer = Arc::new(PlaylistSynchronizer::new(
        library.clone(),
        Arc::new(config.sync.clone()),
    ));
    let gateways = Arc::new(SpotifyGatewayProvider::new(
        config.spotify_api_url.clone(),
        config.gateway_timeout,
    )?);

    let _cache_reset = spawn_cache_reset(store, config.cache_flush_interval);

    let app_state = Arc::new(AppState {
        library,
        synchronizer,
        gateways,
    });

    // Build router
    let app = api::router(app_state)
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(&config.cors_origins));

    // Start server
    let addr = format!("{}:{}", config.server_host, config.server_port);
    tracing::info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// `LOG_FORMAT=json` switches to structured output.
fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,tracks_by_popularity=debug".into());
    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);

    if origins.iter().any(|o| o == "*") {
        return layer.allow_origin(Any);
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin {}", origin);
                None
            }
        })
        .collect();
    layer.allow_origin(allowed)
}
