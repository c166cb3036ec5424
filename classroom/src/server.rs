//! Server lifecycle management
//!
//! Binds the HTTP/WebSocket listener, runs the session sweep task and
//! shuts both down on SIGINT/SIGTERM.

use anyhow::Context;
use tracing::{error, info, warn};

use classroom_api::{create_router, AppState};
use classroom_core::Config;

/// Classroom relay server
pub struct ClassroomServer {
    config: Config,
    state: AppState,
}

impl ClassroomServer {
    pub const fn new(config: Config, state: AppState) -> Self {
        Self { config, state }
    }

    /// Start serving and wait for a shutdown signal
    pub async fn start(self) -> anyhow::Result<()> {
        let http_address = self.config.http_address();

        if !self.state.api_config.get().is_complete() {
            warn!("Image API base URL or key not configured; edits fail until POST /api/images/config");
        }

        let sweeper = self.state.sessions.start_sweeper(
            self.config.sessions.sweep_interval(),
            self.config.sessions.max_inactive(),
        );
        info!(
            interval_secs = self.config.sessions.sweep_interval_seconds,
            max_inactive_secs = self.config.sessions.max_inactive_seconds,
            "Session sweep scheduled"
        );

        let router = create_router(self.state.clone(), &self.config.server);

        let listener = tokio::net::TcpListener::bind(&http_address)
            .await
            .with_context(|| format!("Failed to bind HTTP address {http_address}"))?;

        info!("HTTP server listening on {}", http_address);
        info!("WebSocket endpoint: ws://{}/ws", http_address);

        let result = axum::serve(listener, router)
            .with_graceful_shutdown(shutdown_signal())
            .await;

        sweeper.abort();

        if let Err(e) = result {
            error!("HTTP server error: {}", e);
            return Err(e.into());
        }

        info!(
            sessions = self.state.sessions.len(),
            "Classroom server shut down gracefully"
        );
        Ok(())
    }
}

/// Wait for a shutdown signal (SIGTERM or SIGINT/Ctrl+C)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
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
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => { info!("Received Ctrl+C"); }
        () = terminate => { info!("Received SIGTERM"); }
    }
}
