//! Bulk download orchestration split into focused submodules.
//!
//! The `BulkDownloader` struct and its methods are organized by domain:
//! - [`lifecycle`] - Construction, start/stop/status and shutdown
//! - [`run`] - One run: counting, spawning the pager and workers, finalizing state
//! - [`pager`] - Streams eligible records from the source into the worker channel
//! - [`worker`] - Per-record processing, pacing and counters
//! - [`record`] - Bundle downloads for one record, shared with on-demand downloads

mod lifecycle;
mod pager;
mod record;
mod run;
mod worker;

pub use record::{INFO_FILE_NAME, record_dir};

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
pub(crate) mod test_helpers;
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;

use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::fetcher::FileFetcher;
use crate::store::{RecordSource, StatusStore};
use crate::types::{RunState, RunStats};

/// Run-level state guarded by one mutex, held only around transitions
pub(crate) struct RunControl {
    /// Current lifecycle state
    pub(crate) state: RunState,
    /// When the current or last run started
    pub(crate) started_at: Option<Instant>,
    /// When the last run ended
    pub(crate) finished_at: Option<Instant>,
    /// Cancels the current run
    pub(crate) cancel: CancellationToken,
    /// Fires once the run task (pager and every worker) has finished
    pub(crate) done: CancellationToken,
    /// Why the last run failed
    pub(crate) last_error: Option<String>,
}

impl Default for RunControl {
    fn default() -> Self {
        let done = CancellationToken::new();
        done.cancel();
        Self {
            state: RunState::Idle,
            started_at: None,
            finished_at: None,
            cancel: CancellationToken::new(),
            done,
            last_error: None,
        }
    }
}

/// Bulk downloader instance (cloneable - all fields are Arc-wrapped)
///
/// Streams records from a [`RecordSource`] into a pool of workers, each of
/// which downloads the bundles a record still needs and records completion in
/// a [`StatusStore`]. Only one run is active at a time; re-running resumes
/// from the persisted status.
#[derive(Clone)]
pub struct BulkDownloader {
    /// Configuration (wrapped in Arc for sharing across tasks)
    pub(crate) config: Arc<Config>,
    /// HTTP fetcher shared by every worker
    pub(crate) fetcher: FileFetcher,
    /// Where records come from
    pub(crate) source: Arc<dyn RecordSource>,
    /// Where completion flags go
    pub(crate) store: Arc<dyn StatusStore>,
    /// Counters for the current or last run
    pub(crate) stats: Arc<RunStats>,
    /// Lifecycle state
    pub(crate) control: Arc<std::sync::Mutex<RunControl>>,
}

impl BulkDownloader {
    /// Configuration this downloader was built with
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Lock the run control, recovering the guard if a holder panicked
    pub(crate) fn lock_control(&self) -> std::sync::MutexGuard<'_, RunControl> {
        self.control
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}
