//! Application state for the API server

use crate::db::Database;
use crate::{BulkDownloader, Config};
use std::sync::Arc;

/// Shared application state accessible to all route handlers
///
/// Cloned for each request; every field is an `Arc`.
#[derive(Clone)]
pub struct AppState {
    /// The bulk downloader driving runs
    pub downloader: Arc<BulkDownloader>,

    /// Database backing coverage and listing endpoints
    pub db: Arc<Database>,

    /// Configuration (read-only)
    pub config: Arc<Config>,
}

impl AppState {
    /// Create a new AppState
    pub fn new(downloader: Arc<BulkDownloader>, db: Arc<Database>, config: Arc<Config>) -> Self {
        Self {
            downloader,
            db,
            config,
        }
    }
}
