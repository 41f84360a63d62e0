//! HTTP prediction service
//!
//! Endpoints:
//! - GET /health - Model load status
//! - GET /model-info - Static model description
//! - POST /predict - Classify one flower
//! - GET / - Links to the other endpoints

pub mod handlers;
pub mod state;

pub use self::handlers::{ApiError, PredictRequest, PredictResponse};
pub use self::state::{AppContext, ArtifactPaths, LoadedModel, ModelState, ServiceSettings};

use crate::core::Result;
use axum::{
    routing::{get, post},
    Router,
};
use log::info;
use std::net::SocketAddr;
use std::sync::Arc;

/// Build the router over an already loaded context
pub fn router(ctx: Arc<AppContext>) -> Router {
    Router::new()
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health))
        .route("/model-info", get(handlers::model_info))
        .route("/predict", post(handlers::predict))
        .fallback(handlers::not_found)
        .with_state(ctx)
}

/// Serve until Ctrl-C
pub async fn run_server(addr: SocketAddr, ctx: Arc<AppContext>) -> Result<()> {
    let model_loaded = ctx.is_ready();
    let app = router(ctx);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(
        "Iris classifier listening on http://{} (model loaded: {model_loaded})",
        listener.local_addr()?
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        log::error!("Failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
