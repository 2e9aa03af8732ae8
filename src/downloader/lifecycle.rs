//! Construction, start/stop/status and shutdown coordination.

use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::db::Database;
use crate::error::{Error, Result, RunError};
use crate::fetcher::FileFetcher;
use crate::store::{RecordSource, StatusStore};
use crate::types::{ProgressReport, RunState, RunStats};

use super::{BulkDownloader, RunControl};

impl BulkDownloader {
    /// Create a downloader over an arbitrary record source and status store
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`](crate::Error::Config) if the configuration is
    /// invalid, or an error if the HTTP client cannot be built.
    pub fn new(
        config: Config,
        source: Arc<dyn RecordSource>,
        store: Arc<dyn StatusStore>,
    ) -> Result<Self> {
        config.validate()?;
        let fetcher = FileFetcher::new(config.download.request_timeout)?;

        Ok(Self {
            config: Arc::new(config),
            fetcher,
            source,
            store,
            stats: Arc::new(RunStats::default()),
            control: Arc::new(std::sync::Mutex::new(RunControl::default())),
        })
    }

    /// Create a downloader backed by the SQLite database at
    /// `config.persistence.database_path`
    ///
    /// Returns the database handle as well so callers can seed records or
    /// query coverage through the same pool.
    pub async fn with_database(config: Config) -> Result<(Self, Arc<Database>)> {
        config.validate()?;
        let db = Arc::new(Database::new(&config.persistence.database_path).await?);
        let downloader = Self::new(config, db.clone(), db.clone())?;
        Ok((downloader, db))
    }

    /// Begin a run in the background and return immediately
    ///
    /// # Errors
    ///
    /// Returns [`RunError::AlreadyRunning`] if a run is in progress.
    pub async fn start(&self) -> Result<()> {
        let mut control = self.lock_control();
        if control.state == RunState::Running {
            return Err(RunError::AlreadyRunning.into());
        }

        self.stats.reset();
        let cancel = CancellationToken::new();
        let done = CancellationToken::new();
        control.state = RunState::Running;
        control.started_at = Some(Instant::now());
        control.finished_at = None;
        control.cancel = cancel.clone();
        control.done = done.clone();
        control.last_error = None;

        let downloader = self.clone();
        tokio::spawn(async move {
            let _done = done.drop_guard();
            let run = tokio::spawn({
                let downloader = downloader.clone();
                let cancel = cancel.clone();
                async move { downloader.execute_run(cancel).await }
            });
            if let Err(e) = run.await {
                // Detached workers must not outlive a crashed run
                cancel.cancel();
                downloader.fail_run(RunError::Panicked(e.to_string()).into());
            }
        });

        tracing::info!(
            workers = self.config.download.workers,
            batch_size = self.config.download.batch_size,
            "Bulk download started"
        );
        Ok(())
    }

    /// Cancel the active run and wait until every worker and the pager exit
    ///
    /// A no-op when not running. Once this returns, no further status or
    /// filesystem writes happen for the stopped run.
    pub async fn stop(&self) {
        let done = {
            let control = self.lock_control();
            if control.state != RunState::Running {
                return;
            }
            control.cancel.cancel();
            control.done.clone()
        };

        tracing::info!("Stopping bulk download");
        done.cancelled().await;

        // The run task normally records the final state itself
        let mut control = self.lock_control();
        if control.state == RunState::Running {
            control.state = RunState::Idle;
            control.finished_at = Some(Instant::now());
        }
        tracing::info!("Bulk download stopped");
    }

    /// Current state, counters and elapsed time
    pub fn status(&self) -> ProgressReport {
        let (state, elapsed, error) = {
            let control = self.lock_control();
            let elapsed = match (control.state, control.started_at, control.finished_at) {
                (RunState::Running, Some(start), _) => start.elapsed(),
                (_, Some(start), Some(end)) => end.saturating_duration_since(start),
                _ => Duration::ZERO,
            };
            (control.state, elapsed, control.last_error.clone())
        };

        ProgressReport {
            state,
            stats: self.stats.snapshot(),
            elapsed,
            error,
        }
    }

    /// Whether a run is in progress
    pub fn is_running(&self) -> bool {
        self.lock_control().state == RunState::Running
    }

    /// Wait for the active run (if any) to end on its own
    pub async fn wait(&self) {
        let done = self.lock_control().done.clone();
        done.cancelled().await;
    }

    /// Gracefully shut down the downloader
    ///
    /// Stops any active run. Status is written per record as the run
    /// progresses, so there is no additional state to persist.
    pub async fn shutdown(&self) -> Result<()> {
        tracing::info!("Initiating graceful shutdown");
        self.stop().await;
        tracing::info!("Graceful shutdown complete");
        Ok(())
    }

    /// Record the end of a run; called by the run task after every worker joined
    pub(crate) fn finish_run(&self, state: RunState) {
        let mut control = self.lock_control();
        control.state = state;
        control.finished_at = Some(Instant::now());
    }

    /// End the run as `Failed`, keeping `error` for [`status`](Self::status)
    pub(crate) fn fail_run(&self, error: Error) {
        tracing::error!(error = %error, "Bulk download failed");
        let mut control = self.lock_control();
        control.state = RunState::Failed;
        control.finished_at = Some(Instant::now());
        control.last_error = Some(error.to_string());
    }
}
