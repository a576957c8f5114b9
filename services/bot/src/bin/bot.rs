//! services/bot/src/bin/bot.rs

use attendance_core::{IdentityResolver, PortError};
use bot_lib::{
    adapters::{LivePresence, SlackDirectory, SlackNotifier, SpreadsheetExport},
    config::Config,
    engine::{Engine, Ports},
    error::ServiceError,
    web::{router, state::AppState},
};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), ServiceError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Arc::new(Config::from_env()?);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();
    info!("Configuration loaded. Starting attendance bot...");

    // --- 2. Initialize Outbound Adapters ---
    let http = reqwest::Client::builder()
        .timeout(Duration::from_secs(10))
        .build()?;

    let notifier = Arc::new(SlackNotifier::new(
        http.clone(),
        config.slack_api_base.clone(),
        config.slack_bot_token.clone(),
    ));
    let directory = Arc::new(SlackDirectory::new(
        http.clone(),
        config.slack_api_base.clone(),
        config.slack_bot_token.clone(),
        config.identity_overrides.clone(),
        config.identity_refresh,
    ));
    let export = Arc::new(SpreadsheetExport::new(
        http.clone(),
        config.attendance_webhooks.clone(),
        config.utc_offset,
    ));

    info!("Warming the Slack member directory...");
    match directory.warm().await {
        Ok(()) => {}
        // A refused bot token is fatal.
        Err(e @ PortError::Unauthorized(_)) => return Err(e.into()),
        Err(e) => {
            warn!(error = %e, "Member directory unavailable; mentions will be resolved lazily");
        }
    }

    // --- 3. Start the Attendance Engine ---
    let cancel = CancellationToken::new();
    let presence = Arc::new(LivePresence::new());
    let engine = Engine::start(
        &config,
        presence.clone(),
        Ports {
            notifier,
            identity: directory,
            export,
        },
        cancel.clone(),
    );

    // --- 4. Build the Shared AppState & Router ---
    let app_state = Arc::new(AppState {
        config: config.clone(),
        events: engine.events.clone(),
        presence,
    });
    let app = router(app_state);

    // --- 5. Start the Server ---
    info!("Starting server on {}", config.bind_address);
    info!(
        "Swagger UI available at http://{}/swagger-ui",
        config.bind_address
    );
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(cancel.clone()))
        .await?;

    // --- 6. Drain the Engine ---
    cancel.cancel();
    engine.join().await;
    info!("Attendance bot stopped.");

    Ok(())
}

/// Resolves on Ctrl-C or SIGTERM and broadcasts shutdown to the engine.
async fn shutdown_signal(cancel: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to listen for SIGTERM");
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
    info!("Shutdown signal received.");
    cancel.cancel();
}
