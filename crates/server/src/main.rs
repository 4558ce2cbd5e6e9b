// Alarm relay server
// Decision: TLS is terminated in front of the relay (reverse proxy); we serve plain HTTP
// Decision: On ctrl-c the ingest loop stops first, then live streams are closed
//           so graceful shutdown is not held open by long-lived responses

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::sync::watch;

use alarmrelay_core::{
    Coordinator, DeviceReader, JsonFileStore, LogTransport, PushTransport, Relay,
};
use alarmrelay_server::device::{JsonLinesReader, MockDeviceReader};
use alarmrelay_server::expo::ExpoPushTransport;
use alarmrelay_server::telemetry::init_tracing;
use alarmrelay_server::{build_router, Config};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (ignore errors if not found)
    let _ = dotenvy::dotenv();

    init_tracing();

    let config = Config::parse();
    config.validate().context("Invalid configuration")?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        name = %config.name,
        mock = config.mock,
        savefile = %config.savefile.display(),
        "alarmrelay starting..."
    );

    let store = Arc::new(JsonFileStore::new(&config.savefile));
    let transport: Arc<dyn PushTransport> = if config.mock {
        Arc::new(LogTransport)
    } else {
        Arc::new(
            ExpoPushTransport::new(config.push_url.clone(), config.push_timeout())
                .context("Failed to build push client")?,
        )
    };

    let relay = Arc::new(
        Relay::open(config.relay_config(), store, transport)
            .await
            .context("Failed to start relay")?,
    );

    let reader: Box<dyn DeviceReader> = if config.mock {
        tracing::info!("Using simulated panel");
        Box::new(MockDeviceReader::default())
    } else {
        tracing::info!(device = %config.device, "Reading panel messages");
        Box::new(
            JsonLinesReader::open(&config.device)
                .await
                .context("Failed to open device feed")?,
        )
    };

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let ingest = tokio::spawn(Coordinator::new(relay.clone()).run(reader, shutdown_rx));

    let app = build_router(relay.clone(), &config.secret);
    let listener = tokio::net::TcpListener::bind(&config.bind)
        .await
        .with_context(|| format!("Failed to bind to {}", config.bind))?;
    tracing::info!("HTTP server listening on {}", config.bind);

    let shutdown_relay = relay.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to listen for shutdown signal");
            }
            tracing::info!("Shutting down");
            let _ = shutdown_tx.send(true);
            let closed = shutdown_relay.close_listeners();
            tracing::debug!(closed, "Closed live streams");
        })
        .await
        .context("Server error")?;

    if let Err(e) = ingest.await {
        tracing::error!(error = %e, "Ingest task failed");
    }
    relay.persist().await.context("Failed to save state on shutdown")?;

    Ok(())
}
