//! Bulk run control and single-record download handlers.

use super::{ProgressResponse, RunActionResponse};
use crate::api::AppState;
use crate::types::RecordId;
use axum::{
    Json,
    extract::{Path, State},
    response::{IntoResponse, Response},
};

/// POST /download/start - Start a bulk run
#[utoipa::path(
    post,
    path = "/download/start",
    tag = "download",
    responses(
        (status = 200, description = "Run started", body = RunActionResponse),
        (status = 409, description = "A run is already in progress", body = crate::error::ApiError)
    )
)]
pub async fn start_download(State(state): State<AppState>) -> Response {
    match state.downloader.start().await {
        Ok(()) => Json(RunActionResponse {
            status: "started".to_string(),
        })
        .into_response(),
        Err(e) => e.into_response(),
    }
}

/// POST /download/stop - Cancel the active run and wait for it to wind down
#[utoipa::path(
    post,
    path = "/download/stop",
    tag = "download",
    responses(
        (status = 200, description = "Run stopped (or none was active)", body = RunActionResponse)
    )
)]
pub async fn stop_download(State(state): State<AppState>) -> impl IntoResponse {
    state.downloader.stop().await;
    Json(RunActionResponse {
        status: "stopped".to_string(),
    })
}

/// GET /download/progress - Live progress of the current or last run
#[utoipa::path(
    get,
    path = "/download/progress",
    tag = "download",
    responses(
        (status = 200, description = "Run progress", body = ProgressResponse)
    )
)]
pub async fn get_progress(State(state): State<AppState>) -> impl IntoResponse {
    Json(ProgressResponse::from(state.downloader.status()))
}

/// GET /download/stats - Download coverage across all eligible records
#[utoipa::path(
    get,
    path = "/download/stats",
    tag = "download",
    responses(
        (status = 200, description = "Coverage summary", body = crate::types::CoverageSummary),
        (status = 500, description = "Internal server error", body = crate::error::ApiError)
    )
)]
pub async fn get_coverage(State(state): State<AppState>) -> Response {
    match state.db.coverage_summary().await {
        Ok(summary) => Json(summary).into_response(),
        Err(e) => e.into_response(),
    }
}

/// POST /download/record/:id - Download every bundle of one record now
#[utoipa::path(
    post,
    path = "/download/record/{id}",
    tag = "download",
    params(
        ("id" = i64, Path, description = "Record ID")
    ),
    responses(
        (status = 200, description = "Record processed; see errors for per-bundle failures", body = crate::types::RecordReport),
        (status = 400, description = "Record has no usable group key or references", body = crate::error::ApiError),
        (status = 404, description = "Record not found", body = crate::error::ApiError)
    )
)]
pub async fn download_record(State(state): State<AppState>, Path(id): Path<i64>) -> Response {
    match state.downloader.download_record(RecordId(id)).await {
        Ok(report) => Json(report).into_response(),
        Err(e) => e.into_response(),
    }
}
