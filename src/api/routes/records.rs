//! Record listing and path lookup handlers.

use super::ListRecordsQuery;
use crate::api::AppState;
use crate::db::DEFAULT_PER_PAGE;
use crate::types::{RecordId, SortOrder};
use axum::{
    Json,
    extract::{Path, Query, State},
    response::{IntoResponse, Response},
};

/// GET /records - Paginated eligible records with their download flags
#[utoipa::path(
    get,
    path = "/records",
    tag = "records",
    params(ListRecordsQuery),
    responses(
        (status = 200, description = "One page of records", body = crate::types::RecordPage),
        (status = 500, description = "Internal server error", body = crate::error::ApiError)
    )
)]
pub async fn list_records(
    State(state): State<AppState>,
    Query(query): Query<ListRecordsQuery>,
) -> Response {
    let page = parse_or(query.page.as_deref(), 1);
    let per_page = parse_or(query.per_page.as_deref(), DEFAULT_PER_PAGE);
    let sort_order = SortOrder::parse_lenient(query.sort_order.as_deref());

    match state.db.list_records(page, per_page, sort_order).await {
        Ok(page) => Json(page).into_response(),
        Err(e) => e.into_response(),
    }
}

/// GET /records/:id/path - Directory holding a record's bundles
#[utoipa::path(
    get,
    path = "/records/{id}/path",
    tag = "records",
    params(
        ("id" = i64, Path, description = "Record ID")
    ),
    responses(
        (status = 200, description = "Record directory", body = crate::types::RecordPath),
        (status = 400, description = "Group key is not a usable directory name", body = crate::error::ApiError),
        (status = 404, description = "Record or its group key not found", body = crate::error::ApiError)
    )
)]
pub async fn get_record_path(State(state): State<AppState>, Path(id): Path<i64>) -> Response {
    match state.downloader.record_path(RecordId(id)).await {
        Ok(path) => Json(path).into_response(),
        Err(e) => e.into_response(),
    }
}

fn parse_or(value: Option<&str>, default: u32) -> u32 {
    value
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}
