use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use mediadex_core::{
    load_config, validate_config, AnnouncementSink, CatalogStore, IndexingController, Ingestor,
    JobStore, LogSink, MessageSource, MetadataProvider, SqliteCatalog, SqliteJobStore,
    SqliteMessageLog, TelegramSink, TmdbProvider, UpdatePublisher,
};
use mediadex_server::{api::create_router, state::AppState};

/// Application version
const VERSION: &str = env!("CARGO_PKG_VERSION");

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

    info!("mediadex {} starting", VERSION);

    // Determine config path
    let config_path = std::env::var("MEDIADEX_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("config.toml"));

    // Load configuration
    info!("Loading configuration from {:?}", config_path);
    let config = load_config(&config_path)
        .with_context(|| format!("Failed to load config from {:?}", config_path))?;

    // Validate configuration
    validate_config(&config).context("Configuration validation failed")?;

    info!("Configuration loaded successfully");
    info!("Database path: {:?}", config.database.path);
    info!("Configured channels: {}", config.channels.len());

    // Stores share one SQLite file
    let catalog: Arc<dyn CatalogStore> = Arc::new(
        SqliteCatalog::new(&config.database.path).context("Failed to open catalog")?,
    );
    let job_store: Arc<dyn JobStore> = Arc::new(
        SqliteJobStore::new(&config.database.path).context("Failed to open job store")?,
    );
    let message_log = Arc::new(
        SqliteMessageLog::new(&config.database.path).context("Failed to open message log")?,
    );
    info!("Stores initialized");

    // Outbound sink for announcements
    let sink: Arc<dyn AnnouncementSink> = match &config.telegram {
        Some(telegram) => {
            info!("Announcements go to Telegram chat {}", telegram.update_chat);
            Arc::new(TelegramSink::new(telegram.clone()).context("Failed to create Telegram sink")?)
        }
        None => {
            info!("No Telegram config, announcements are only logged");
            Arc::new(LogSink::new())
        }
    };

    // Enrichment provider
    let provider: Option<Arc<dyn MetadataProvider>> = match &config.tmdb {
        Some(tmdb) => match TmdbProvider::new(tmdb.clone()) {
            Ok(provider) => {
                info!("Initializing TMDB enrichment");
                Some(Arc::new(provider))
            }
            Err(e) => {
                warn!("TMDB enrichment disabled: {}", e);
                None
            }
        },
        None => {
            info!("No enrichment provider configured");
            None
        }
    };

    // Update publisher
    let publisher = UpdatePublisher::new(config.publisher.clone(), sink, provider);
    let publisher_handle = publisher.handle();
    let publisher_task = publisher.spawn();

    // Indexing controller
    let ingestor = Arc::new(Ingestor::new(
        Arc::clone(&catalog),
        Some(publisher_handle.clone()),
        &config.indexer,
    ));
    let source: Arc<dyn MessageSource> = message_log.clone();
    let controller = Arc::new(IndexingController::new(
        config.indexer.clone(),
        job_store,
        source,
        ingestor,
        config.channel_policies(),
    ));

    let recovered = controller
        .recover_interrupted()
        .await
        .context("Failed to recover interrupted jobs")?;
    if !recovered.is_empty() {
        info!("Recovered {} interrupted job(s)", recovered.len());
    }

    // Create app state
    let state = Arc::new(AppState::new(
        config.clone(),
        catalog,
        Arc::clone(&controller),
        publisher_handle.clone(),
        message_log,
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

    // Checkpoint running jobs
    info!("Server shutting down, pausing running jobs...");
    controller.shutdown().await;

    // Stop the publisher; queued announcements are dropped
    publisher_handle.shutdown();
    if let Err(e) = publisher_task.await {
        error!("Publisher task failed: {}", e);
    }
    info!("Shutdown complete");

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
