// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use std::{net::SocketAddr, sync::Arc};

use anyhow::Context;
use axum::{extract::DefaultBodyLimit, routing::post, Router};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;

use super::analyze::{analyze_handler, AnalysisPipeline};
use crate::config::DEFAULT_MAX_UPLOAD_BYTES;

pub const ANALYZE_ROUTE: &str = "/api/analyze";

#[derive(Clone, Debug)]
pub struct AppState {
    pub pipeline: Arc<AnalysisPipeline>,
    pub max_upload_bytes: usize,
}

impl AppState {
    pub fn new(pipeline: AnalysisPipeline) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }

    pub fn with_max_upload_bytes(mut self, limit: usize) -> Self {
        self.max_upload_bytes = limit;
        self
    }
}

/// Build the router with CORS open to every origin
pub fn create_app(state: AppState) -> Router {
    let body_limit = state.max_upload_bytes;

    Router::new()
        .route(ANALYZE_ROUTE, post(analyze_handler))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve until Ctrl+C
pub async fn start_server(addr: SocketAddr, state: AppState) -> anyhow::Result<()> {
    let app = create_app(state);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    info!("API server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error")?;

    info!("API server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
