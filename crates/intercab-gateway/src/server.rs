// SPDX-FileCopyrightText: 2026 Intercab Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Gateway HTTP server built on axum.
//!
//! Sets up routes, middleware, and shared state for the gateway.

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};
use intercab_config::model::GatewayConfig;
use intercab_core::IntercabError;
use intercab_dispatch::DispatchContext;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::handlers;

/// Shared state for axum request handlers.
#[derive(Clone)]
pub struct GatewayState {
    /// Store and notifier shared with the role loops.
    pub ctx: DispatchContext,
    /// Shared secret for webhook signatures (None = unsigned calls accepted).
    pub webhook_secret: Option<Arc<str>>,
    /// Process start time for uptime calculation.
    pub start_time: std::time::Instant,
}

impl GatewayState {
    pub fn new(ctx: DispatchContext, webhook_secret: Option<&str>) -> Self {
        Self {
            ctx,
            webhook_secret: webhook_secret.map(Arc::from),
            start_time: std::time::Instant::now(),
        }
    }
}

/// Builds the gateway router:
/// - GET /health
/// - GET /api/orders/active
/// - GET /api/locations
/// - POST /api/payments/webhook (signature checked in the handler)
pub fn router(state: GatewayState) -> Router {
    Router::new()
        .route("/health", get(handlers::get_health))
        .route("/api/orders/active", get(handlers::get_active_orders))
        .route("/api/locations", get(handlers::get_locations))
        .route("/api/payments/webhook", post(handlers::post_payment_webhook))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Start the gateway HTTP server and serve until `cancel` fires.
pub async fn start_server(
    config: &GatewayConfig,
    state: GatewayState,
    cancel: CancellationToken,
) -> Result<(), IntercabError> {
    if state.webhook_secret.is_none() {
        tracing::warn!("gateway.webhook_secret is not set, payment webhook accepts unsigned calls");
    }
    let app = router(state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| IntercabError::Channel {
            message: format!("failed to bind gateway to {addr}: {e}"),
            source: Some(Box::new(e)),
        })?;

    tracing::info!("Gateway server listening on {addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move { cancel.cancelled().await })
        .await
        .map_err(|e| IntercabError::Channel {
            message: format!("gateway server error: {e}"),
            source: Some(Box::new(e)),
        })?;

    tracing::info!("Gateway server stopped");
    Ok(())
}
