//! REST API server module
//!
//! Exposes bulk run control, progress, coverage and record listing over HTTP,
//! with an OpenAPI document generated by utoipa.

use crate::Result;
use axum::{
    Router,
    http::HeaderValue,
    routing::{get, post},
};
use tokio::net::TcpListener;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub mod error_response;
pub mod openapi;
pub mod routes;
pub mod state;

pub use openapi::ApiDoc;
pub use state::AppState;

/// Create the API router with all route definitions
///
/// # Routes
///
/// ## Bulk runs
/// - `POST /download/start` - Start a run (409 if one is active)
/// - `POST /download/stop` - Stop the active run and wait for it
/// - `GET /download/progress` - Live run counters
/// - `GET /download/stats` - Coverage across all eligible records
/// - `POST /download/record/:id` - Download one record now
///
/// ## Records
/// - `GET /records` - Paginated records (`page`, `per_page`, `sort_order`)
/// - `GET /records/:id/path` - Directory of one record
///
/// ## System
/// - `GET /health` - Health check
/// - `GET /openapi.json` - OpenAPI specification
pub fn create_router(state: AppState) -> Router {
    let cors = state
        .config
        .server
        .api
        .cors_enabled
        .then(|| build_cors_layer(&state.config.server.api.cors_origins));

    let router = Router::new()
        // Bulk runs
        .route("/download/start", post(routes::start_download))
        .route("/download/stop", post(routes::stop_download))
        .route("/download/progress", get(routes::get_progress))
        .route("/download/stats", get(routes::get_coverage))
        .route("/download/record/:id", post(routes::download_record))
        // Records
        .route("/records", get(routes::list_records))
        .route("/records/:id/path", get(routes::get_record_path))
        // System
        .route("/health", get(routes::health_check))
        .route("/openapi.json", get(routes::openapi_spec))
        .with_state(state)
        .layer(TraceLayer::new_for_http());

    // Apply CORS middleware if enabled in config
    match cors {
        Some(cors) => router.layer(cors),
        None => router,
    }
}

/// Build a CORS layer based on configured origins
///
/// `"*"` or an empty list allows any origin; otherwise only the listed
/// origins are allowed. Methods and headers are always unrestricted.
fn build_cors_layer(origins: &[String]) -> CorsLayer {
    let allow_any = origins.iter().any(|o| o == "*");

    if allow_any || origins.is_empty() {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let allowed: Vec<HeaderValue> = origins.iter().filter_map(|o| o.parse().ok()).collect();

        CorsLayer::new()
            .allow_origin(AllowOrigin::list(allowed))
            .allow_methods(Any)
            .allow_headers(Any)
    }
}

/// Start the API server on the configured bind address.
///
/// Runs until the server stops or fails.
///
/// # Example
///
/// ```no_run
/// use bundle_dl::{BulkDownloader, Config, api::AppState};
/// use std::sync::Arc;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = Config::default();
/// let (downloader, db) = BulkDownloader::with_database(config.clone()).await?;
/// let state = AppState::new(Arc::new(downloader), db, Arc::new(config));
///
/// // Blocks until shutdown
/// bundle_dl::api::start_api_server(state).await?;
/// # Ok(())
/// # }
/// ```
pub async fn start_api_server(state: AppState) -> Result<()> {
    let bind_address = state.config.server.api.bind_address;

    tracing::info!(address = %bind_address, "Starting API server");

    let app = create_router(state);

    let listener = TcpListener::bind(bind_address)
        .await
        .map_err(crate::error::Error::Io)?;

    tracing::info!(address = %bind_address, "API server listening");

    axum::serve(listener, app)
        .await
        .map_err(|e| crate::error::Error::ApiServerError(e.to_string()))?;

    tracing::info!("API server stopped");
    Ok(())
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;
