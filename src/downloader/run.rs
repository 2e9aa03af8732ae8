//! One bulk run: size it, feed the workers, wait for them, record the outcome.

use std::sync::Arc;
use std::sync::atomic::Ordering;
use tokio::sync::{Mutex, mpsc};
use tokio_util::sync::CancellationToken;

use crate::error::RunError;
use crate::types::{Record, RunState};

use super::BulkDownloader;
use super::pager::run_pager;
use super::worker::run_worker;

/// Receiving side of the record channel, shared by every worker
pub(crate) type SharedReceiver = Arc<Mutex<mpsc::Receiver<Record>>>;

impl BulkDownloader {
    pub(crate) async fn execute_run(&self, cancel: CancellationToken) {
        let count = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                tracing::info!("Bulk download cancelled before it was sized");
                self.finish_run(RunState::Idle);
                return;
            }
            count = self.source.count_eligible() => count,
        };

        let total = match count {
            Ok(total) => total,
            Err(e) => {
                self.fail_run(RunError::CountFailed(e.to_string()).into());
                return;
            }
        };
        self.stats
            .total_records
            .store(u64::try_from(total).unwrap_or(0), Ordering::Relaxed);

        let batch_size = self.config.download.batch_size;
        let workers = self.config.download.workers;
        tracing::info!(total, workers, batch_size, "Eligible records counted");

        let (tx, rx) = mpsc::channel::<Record>(batch_size);
        let rx: SharedReceiver = Arc::new(Mutex::new(rx));

        let worker_handles: Vec<_> = (0..workers)
            .map(|worker_id| {
                let downloader = self.clone();
                let rx = rx.clone();
                let cancel = cancel.clone();
                tokio::spawn(async move { run_worker(downloader, worker_id, rx, cancel).await })
            })
            .collect();

        let source = self.source.clone();
        let pager_cancel = cancel.clone();
        let pager = tokio::spawn(async move { run_pager(source, batch_size, tx, pager_cancel).await });

        match pager.await {
            Ok(sent) => tracing::debug!(sent, "Pager finished"),
            Err(e) => tracing::error!(error = %e, "Pager task failed"),
        }

        for result in futures::future::join_all(worker_handles).await {
            if let Err(e) = result {
                tracing::error!(error = %e, "Worker task failed");
            }
        }

        let state = if cancel.is_cancelled() {
            RunState::Idle
        } else {
            RunState::Completed
        };
        self.finish_run(state);

        let stats = self.stats.snapshot();
        tracing::info!(
            state = %state,
            processed = stats.processed_records,
            successful = stats.successful_records,
            failed = stats.failed_records,
            skipped = stats.skipped_records,
            files = stats.successful_files,
            failed_files = stats.failed_files,
            "Bulk download finished"
        );
    }
}
