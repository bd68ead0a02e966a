// Main entry point for the gateway server

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use bridge::{BridgeOptions, BridgeService};
use gateway_core::kernel::{BridgeTransportProvider, QrCodeRenderer, ServerDeps};
use gateway_core::{server::build_app, Config};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,gateway_core=debug,tower_http=info".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_line_number(true),
        )
        .init();

    tracing::info!("Starting messaging gateway");

    // Load configuration
    let config = Config::from_env().context("Failed to load configuration")?;
    tracing::info!(
        bridge_url = %config.bridge_url,
        session_id = %config.session_id,
        "Configuration loaded"
    );

    // Device bridge hosts the chat-network session
    let bridge = Arc::new(BridgeService::new(BridgeOptions {
        base_url: config.bridge_url.clone(),
        api_key: config.bridge_api_key.clone(),
        session_id: config.session_id.clone(),
    }));

    let deps = ServerDeps::new(
        Arc::new(BridgeTransportProvider::new(
            bridge,
            config.bridge_poll_interval,
        )),
        Arc::new(QrCodeRenderer::new()),
    );

    // Build application
    let (app, controller, controller_task) = build_app(
        deps,
        config.controller_config(),
        config.chat_id_suffix.clone(),
    )
    .await;

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!("Starting server on {}", addr);
    tracing::info!("Status: http://localhost:{}/status", config.port);
    tracing::info!("QR code: http://localhost:{}/qr", config.port);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .context("Failed to bind to address")?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    // Tear the transport session down before exiting
    tracing::info!("Shutting down reconnection controller");
    controller.shutdown().await;
    let grace = config.restart_grace_period + Duration::from_secs(1);
    if tokio::time::timeout(grace, controller_task).await.is_err() {
        tracing::warn!("Reconnection controller did not stop in time");
    }

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Received shutdown signal");
}
