//! HTTP API server for the bot

pub mod health;
pub mod messages;

use std::sync::Arc;

use axum::{Router, routing::post};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use crate::Result;
use crate::channels::ReplyChannel;
use crate::router::ActivityRouter;

/// Shared state for API handlers
///
/// Everything here is long-lived and shared; nothing is per turn.
#[derive(Clone)]
pub struct ApiState {
    /// Activity dispatch
    pub router: ActivityRouter,
    /// Outbound replies and download tokens
    pub channel: Arc<dyn ReplyChannel>,
    /// Vision endpoint, reported by the status endpoint
    pub vision_endpoint: String,
    /// Whether bot credentials are configured
    pub authenticated: bool,
}

/// Build the router with all routes
pub fn router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route("/api/messages", post(messages::handle_activity))
        .with_state(state.clone())
        .merge(health::router())
        .merge(health::status_router(state))
        .layer(TraceLayer::new_for_http())
}

/// API server
pub struct ApiServer {
    state: Arc<ApiState>,
    port: u16,
}

impl ApiServer {
    /// Create a server for the given state
    #[must_use]
    pub const fn new(state: Arc<ApiState>, port: u16) -> Self {
        Self { state, port }
    }

    /// Run the API server until Ctrl-C
    ///
    /// # Errors
    ///
    /// Returns error if server fails to bind or run
    pub async fn run(self) -> Result<()> {
        let addr = format!("0.0.0.0:{}", self.port);
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|e| crate::Error::Config(format!("failed to bind API server: {e}")))?;

        tracing::info!(port = self.port, "API server listening");

        axum::serve(listener, router(self.state))
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| crate::Error::Config(format!("API server error: {e}")))?;

        tracing::info!("API server stopped");
        Ok(())
    }
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("shutdown requested"),
        Err(e) => {
            tracing::warn!(error = %e, "cannot listen for Ctrl-C, running until killed");
            std::future::pending::<()>().await;
        }
    }
}
