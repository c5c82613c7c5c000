use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use photofeed_core::{
    load_config, validate_config, ByteCache, DiskImageCache, HttpImageSource, PhotoFeed,
    PhotoFetcher, SearchDebouncer, UnsplashClient,
};
use photofeed_server::api::{create_router, spawn_feed_bridge, WsBroadcaster};
use photofeed_server::state::AppState;

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Determine config path
    let config_path = std::env::var("PHOTOFEED_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("config.toml"));

    // Load configuration
    info!("Loading configuration from {:?}", config_path);
    let config = load_config(&config_path)
        .with_context(|| format!("Failed to load config from {:?}", config_path))?;

    // Validate configuration
    validate_config(&config).context("Configuration validation failed")?;

    let sanitized = serde_json::to_string(&photofeed_core::SanitizedConfig::from(&config))
        .unwrap_or_default();
    let config_hash = format!("{:x}", Sha256::digest(sanitized.as_bytes()));
    info!(config_hash = &config_hash[..16], "Configuration loaded successfully");
    info!("Caching mode: {:?}", config.feed.caching);
    info!("Image cache directory: {:?}", config.cache.dir);

    // Search API client
    let fetcher: Arc<dyn PhotoFetcher> = Arc::new(
        UnsplashClient::new(&config.unsplash).context("Failed to create Unsplash client")?,
    );
    info!("Using photo fetcher: {}", fetcher.name());

    // Image cache
    let source = HttpImageSource::new(Duration::from_secs(config.cache.timeout_secs as u64))
        .context("Failed to create image downloader")?;
    let disk_cache = DiskImageCache::new(&config.cache.dir, Arc::new(source));
    disk_cache
        .ensure_root()
        .await
        .context("Failed to create image cache directory")?;
    let cache: Arc<dyn ByteCache> = Arc::new(disk_cache);
    info!("Image cache initialized");

    // Feed
    let feed = Arc::new(PhotoFeed::new(config.feed.clone(), fetcher, cache));
    let debouncer = SearchDebouncer::spawn(
        Arc::clone(&feed),
        Duration::from_millis(config.feed.search_debounce_ms),
    );

    // WebSocket broadcaster fed from the feed's observable outputs
    let ws_broadcaster = WsBroadcaster::default();
    let bridge = spawn_feed_bridge(&feed, ws_broadcaster.clone());
    info!("WebSocket broadcaster initialized");

    if let Some(query) = config.feed.initial_query.clone() {
        let feed = Arc::clone(&feed);
        tokio::spawn(async move {
            info!(query = %query, "Loading initial query");
            if let Err(e) = feed.search(&query).await {
                warn!(query = %query, error = %e, "Initial query failed");
            }
        });
    }

    // Create app state
    let state = Arc::new(AppState::new(
        config.clone(),
        Arc::clone(&feed),
        debouncer,
        ws_broadcaster,
    ));

    // Create router
    let app = create_router(state);

    // Start server
    let addr = SocketAddr::new(config.server.host, config.server.port);
    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    // Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutting down...");
    bridge.abort();
    feed.shutdown().await;
    info!("Feed stopped");

    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
