//! Route handlers for the REST API
//!
//! Handlers are organized by domain:
//! - [`download`] - Bulk run control and on-demand record downloads
//! - [`records`] - Record listing and on-disk paths
//! - [`system`] - Health and OpenAPI

use serde::{Deserialize, Serialize};

use crate::types::{ProgressReport, RunState, StatsSnapshot};

mod download;
mod records;
mod system;

pub use download::*;
pub use records::*;
pub use system::*;

// ============================================================================
// Query/Response Types (shared across handlers)
// ============================================================================

/// Query parameters for GET /records
///
/// Values are taken as raw strings so malformed numbers fall back to the
/// defaults instead of rejecting the request.
#[derive(Debug, Default, Deserialize, Serialize, utoipa::ToSchema, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListRecordsQuery {
    /// 1-based page number (default: 1)
    pub page: Option<String>,
    /// Rows per page, 1 to 100 (default: 20)
    pub per_page: Option<String>,
    /// "asc" or "desc" by record id (default: "desc")
    pub sort_order: Option<String>,
}

/// Response for POST /download/start and POST /download/stop
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct RunActionResponse {
    /// "started" or "stopped"
    pub status: String,
}

/// Response for GET /download/progress
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct ProgressResponse {
    /// Current run state
    pub status: RunState,
    /// Run counters
    #[serde(flatten)]
    pub stats: StatsSnapshot,
    /// Seconds since start while running, run duration once finished
    pub duration_seconds: f64,
    /// Processed records as a percentage of the eligible total
    pub progress_percent: f64,
    /// Why the last run failed, when it did
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<ProgressReport> for ProgressResponse {
    fn from(report: ProgressReport) -> Self {
        Self {
            status: report.state,
            stats: report.stats,
            duration_seconds: report.elapsed.as_secs_f64(),
            progress_percent: report.progress_percent(),
            error: report.error,
        }
    }
}
