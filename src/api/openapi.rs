//! OpenAPI documentation and schema generation
//!
//! This module defines the OpenAPI specification for the bundle-dl REST API
//! using utoipa for compile-time spec generation.

use utoipa::OpenApi;

/// OpenAPI documentation for the bundle-dl REST API
///
/// Served as JSON from `/openapi.json`.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "bundle-dl REST API",
        version = "0.1.0",
        description = "REST API for starting, stopping and monitoring bulk CDN bundle downloads",
        license(
            name = "MIT OR Apache-2.0"
        )
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development server")
    ),
    paths(
        // Bulk run control
        crate::api::routes::start_download,
        crate::api::routes::stop_download,
        crate::api::routes::get_progress,
        crate::api::routes::get_coverage,
        crate::api::routes::download_record,

        // Records
        crate::api::routes::list_records,
        crate::api::routes::get_record_path,

        // System
        crate::api::routes::health_check,
        crate::api::routes::openapi_spec,
    ),
    components(schemas(
        // Core types from types.rs
        crate::types::RecordId,
        crate::types::RunState,
        crate::types::StatsSnapshot,
        crate::types::RecordReport,
        crate::types::CoverageSummary,
        crate::types::SortOrder,
        crate::types::RecordView,
        crate::types::RecordPage,
        crate::types::RecordPath,

        // API request/response types from routes.rs
        crate::api::routes::ListRecordsQuery,
        crate::api::routes::RunActionResponse,
        crate::api::routes::ProgressResponse,

        // Error types from error.rs
        crate::error::ApiError,
        crate::error::ErrorDetail,
    )),
    tags(
        (name = "download", description = "Bulk runs - Start, stop and monitor runs, download single records"),
        (name = "records", description = "Records - Browse eligible records and their download flags"),
        (name = "system", description = "System endpoints - Health check, OpenAPI spec"),
    )
)]
pub struct ApiDoc;
