//! HTTP API server
//!
//! Routes:
//! - /buckets, /buckets/:id: bucket CRUD
//! - /transactions, /transactions/:id: listing, creation, bucket assignment
//! - /dashboard: pacing status per bucket
//! - /upload-statement: CSV statement import (multipart field `file`)

pub mod error;
pub mod handlers;

use crate::config::Config;
use crate::db::{connection, Store};
use crate::error::{AppError, Result};
use axum::{
    routing::{get, post},
    Router,
};
use rusqlite::Connection;
use tokio::net::TcpListener;

/// Application state
#[derive(Clone)]
pub struct AppState {
    pub store: Store,
}

/// Create the application router
pub fn create_router(state: AppState) -> Router {
    use handlers::*;

    Router::new()
        .route("/health", get(health))
        .route("/buckets", get(list_buckets).post(create_bucket))
        .route(
            "/buckets/:id",
            get(get_bucket).put(update_bucket).delete(delete_bucket),
        )
        .route("/transactions", get(list_transactions).post(create_transaction))
        .route(
            "/transactions/:id",
            get(get_transaction)
                .put(assign_transaction)
                .delete(delete_transaction),
        )
        .route("/dashboard", get(get_dashboard))
        .route("/upload-statement", post(upload_statement))
        .with_state(state)
}

/// Runs `work` on the blocking pool with its own connection, released when
/// `work` returns.
pub(crate) async fn run_blocking<T, F>(store: &Store, work: F) -> Result<T>
where
    F: FnOnce(&Connection) -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    let store = store.clone();
    tokio::task::spawn_blocking(move || store.with_connection(work))
        .await
        .map_err(|e| AppError::Internal(format!("Blocking task failed: {}", e)))?
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        log::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    log::info!("Shutdown signal received");
}

pub async fn start_server(config: &Config, store: Store) -> Result<()> {
    run_blocking(&store, connection::migrate).await?;

    let addr = config.bind_address();
    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|e| AppError::Internal(format!("Failed to bind {}: {}", addr, e)))?;

    log::info!("Starting server on http://{}", addr);
    log::info!("Database: {}", store.path().display());

    axum::serve(listener, create_router(AppState { store }))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| AppError::Internal(format!("Server error: {}", e)))?;

    log::info!("Server stopped gracefully");
    Ok(())
}
