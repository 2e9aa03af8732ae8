//! # bundle-dl
//!
//! Resumable, rate-limited bulk downloader for CDN file bundles referenced by
//! database records.
//!
//! ## Design Philosophy
//!
//! bundle-dl is designed to be:
//! - **Resumable** - Per-record status is persisted, so a stopped run picks up
//!   where it left off
//! - **Polite** - A single worker paces itself with a random delay between records
//! - **Library-first** - Storage is behind the [`RecordSource`] and
//!   [`StatusStore`] traits; [`Database`] is the bundled SQLite backend
//!
//! ## Quick Start
//!
//! ```no_run
//! use bundle_dl::{BulkDownloader, Config};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut config = Config::default();
//!     config.download.workers = 8;
//!
//!     let (downloader, _db) = BulkDownloader::with_database(config).await?;
//!     downloader.start().await?;
//!
//!     while downloader.is_running() {
//!         let progress = downloader.status();
//!         println!("{:.1}% ({:?})", progress.progress_percent(), progress.stats);
//!         tokio::time::sleep(std::time::Duration::from_secs(5)).await;
//!     }
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// REST API server
pub mod api;
/// Bundle reference parsing
pub mod bundle;
/// Configuration types
pub mod config;
/// SQLite persistence
pub mod db;
/// Bulk download orchestration
pub mod downloader;
/// Error types
pub mod error;
/// Single-file and bundle fetching over HTTP
pub mod fetcher;
/// Record source and status store traits
pub mod store;
/// Core data types
pub mod types;

pub use bundle::{Bundle, BundleFile, resolve};
pub use config::{ApiConfig, Config, DownloadConfig, PacingConfig, PersistenceConfig};
pub use db::Database;
pub use downloader::BulkDownloader;
pub use error::{ApiError, DatabaseError, Error, FetchError, Result, RunError, ToHttpStatus};
pub use fetcher::{BundleFailure, FetchOutcome, FileFetcher};
pub use store::{RecordSource, StatusStore};
pub use types::{
    BundleKind, CoverageSummary, DownloadStatus, ProgressReport, Record, RecordId, RecordPath, RecordReport,
    RunState, StatsSnapshot,
};

/// Helper function to run the downloader with graceful signal handling.
///
/// Waits for SIGINT or SIGTERM (Ctrl+C where those are unavailable), then
/// stops any active run and waits for its workers to exit.
///
/// # Example
///
/// ```no_run
/// use bundle_dl::{BulkDownloader, Config, run_with_shutdown};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let (downloader, _db) = BulkDownloader::with_database(Config::default()).await?;
///     downloader.start().await?;
///
///     // Run until SIGINT/SIGTERM
///     run_with_shutdown(downloader).await?;
///     Ok(())
/// }
/// ```
pub async fn run_with_shutdown(downloader: BulkDownloader) -> Result<()> {
    shutdown_on(downloader, wait_for_signal()).await
}

/// Shut `downloader` down once `signal` resolves
pub async fn shutdown_on<F>(downloader: BulkDownloader, signal: F) -> Result<()>
where
    F: std::future::Future<Output = ()>,
{
    signal.await;
    downloader.shutdown().await
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    match (signal(SignalKind::terminate()), signal(SignalKind::interrupt())) {
        (Ok(mut sigterm), Ok(mut sigint)) => {
            tokio::select! {
                _ = sigterm.recv() => tracing::info!("Received SIGTERM signal"),
                _ = sigint.recv() => tracing::info!("Received SIGINT signal (Ctrl+C)"),
            }
        }
        _ => {
            tracing::warn!("Could not register signal handlers, using ctrl_c fallback");
            tokio::signal::ctrl_c().await.ok();
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for Ctrl+C signal");
    }
}
