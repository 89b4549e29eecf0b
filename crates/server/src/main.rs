use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use parcelo_core::{
    create_message_inbox, load_config, validate_config, Carrier, CarrierBackend, InstantCarrier,
    ItemProcessManager, WebhookCarrier,
};

use parcelo_server::api::create_router;
use parcelo_server::state::AppState;

/// Application version
const VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {}", e);
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
    let config_path = std::env::var("PARCELO_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("config.toml"));

    // Load configuration
    info!("Loading configuration from {:?}", config_path);
    let config = load_config(&config_path)
        .with_context(|| format!("Failed to load config from {:?}", config_path))?;

    // Validate configuration
    validate_config(&config).context("Configuration validation failed")?;

    info!("Configuration loaded successfully (parcelo {})", VERSION);

    // Compute config hash for startup logging
    let config_json = serde_json::to_string(&config).unwrap_or_default();
    let config_hash = format!("{:x}", Sha256::digest(config_json.as_bytes()));
    info!("Config hash: {}", &config_hash[..16]);

    // Create carrier backend
    let carrier: Arc<dyn Carrier> = match config.carrier.backend {
        CarrierBackend::Instant => {
            info!("Initializing instant carrier");
            Arc::new(InstantCarrier::new(
                config.delivery.confirmation_code.clone(),
            ))
        }
        CarrierBackend::Webhook => {
            let webhook_config = config
                .carrier
                .webhook
                .clone()
                .context("Webhook backend selected but no webhook config provided")?;
            info!("Initializing webhook carrier at {}", webhook_config.url);
            Arc::new(
                WebhookCarrier::new(webhook_config)
                    .context("Failed to create webhook carrier")?,
            )
        }
    };
    info!("Using carrier: {}", carrier.name());

    // Create item process manager
    let manager = Arc::new(ItemProcessManager::new(
        Arc::clone(&carrier),
        config.delivery.clone(),
    ));
    info!("Item process manager initialized");

    // Create the inbound message surface and spawn its dispatcher
    let (messages, dispatcher) =
        create_message_inbox(manager.router(), config.delivery.inbox_buffer);
    let dispatcher_handle = tokio::spawn(dispatcher.run());
    info!("Message dispatcher started");

    // Create app state
    let state = Arc::new(AppState::new(config.clone(), manager, messages));

    // Create router
    let app = create_router(Arc::clone(&state));

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

    // Drop all holders of MessageHandle so the dispatcher's channel closes.
    // The app (and its AppState clone) is gone once serve returns; this is
    // the last one.
    drop(state);

    // Wait for the dispatcher to drain remaining messages
    let _ = dispatcher_handle.await;
    info!("Message dispatcher stopped");

    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
