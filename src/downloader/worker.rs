//! Worker loop: per-record processing, counters and pacing.

use rand::Rng;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::config::PacingConfig;
use crate::error::FetchError;
use crate::types::{BundleKind, Record, RunStats};

use super::BulkDownloader;
use super::record::{KindFlags, KindOutcome, record_dir};
use super::run::SharedReceiver;

/// What a worker did with one record
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum RecordOutcome {
    /// No usable group key, nothing left to download, or interrupted by stop
    Skipped,
    /// Every needed bundle downloaded this pass
    Succeeded,
    /// At least one needed bundle failed this pass
    Failed,
}

pub(crate) async fn run_worker(
    downloader: BulkDownloader,
    worker_id: usize,
    rx: SharedReceiver,
    cancel: CancellationToken,
) {
    tracing::debug!(worker_id, "Worker started");
    let pace = downloader.config.download.workers == 1 && downloader.config.download.pacing.enabled;

    loop {
        if cancel.is_cancelled() {
            break;
        }

        let next = {
            let mut rx = rx.lock().await;
            tokio::select! {
                biased;
                _ = cancel.cancelled() => None,
                record = rx.recv() => record,
            }
        };
        let Some(record) = next else {
            break;
        };

        let outcome = downloader.process_record(worker_id, &record, &cancel).await;

        if pace && outcome != RecordOutcome::Skipped {
            let delay = pacing_delay(&downloader.config.download.pacing);
            tracing::debug!(worker_id, delay_secs = delay.as_secs_f64(), "Pausing before next record");
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(delay) => {}
            }
        }
    }

    tracing::debug!(worker_id, "Worker stopped");
}

/// Uniformly random pause within the configured bounds
pub(crate) fn pacing_delay(pacing: &PacingConfig) -> Duration {
    let min = pacing.min_delay.as_millis() as u64;
    let max = pacing.max_delay.as_millis() as u64;
    if max <= min {
        return pacing.min_delay;
    }
    Duration::from_millis(rand::thread_rng().gen_range(min..=max))
}

impl BulkDownloader {
    /// Download whatever `record` still needs and update counters and status
    pub(crate) async fn process_record(
        &self,
        worker_id: usize,
        record: &Record,
        cancel: &CancellationToken,
    ) -> RecordOutcome {
        let stats = &self.stats;
        RunStats::incr(&stats.processed_records);

        let Some(group_key) = record.safe_group_key() else {
            tracing::debug!(worker_id, record_id = %record.id, "No usable group key, skipping");
            RunStats::incr(&stats.skipped_records);
            return RecordOutcome::Skipped;
        };

        let prior = match self.store.get(record.id).await {
            Ok(status) => status,
            Err(e) => {
                tracing::warn!(worker_id, record_id = %record.id, error = %e, "Status lookup failed, assuming nothing done");
                None
            }
        };
        let mut flags = KindFlags::from_status(prior.as_ref());

        let needed: Vec<BundleKind> = BundleKind::ALL
            .into_iter()
            .filter(|kind| record.bundle_ref(*kind).is_some() && !flags.get(*kind))
            .collect();
        if needed.is_empty() {
            tracing::debug!(worker_id, record_id = %record.id, "Already downloaded, skipping");
            RunStats::incr(&stats.skipped_records);
            return RecordOutcome::Skipped;
        }

        let dir = record_dir(&self.config.download.download_dir, group_key, record.id);
        let mut failed = false;
        let mut interrupted = false;

        for kind in needed {
            match self.fetch_kind(record, &dir, kind, cancel).await {
                KindOutcome::Saved(saved) => {
                    let count = saved.len() as u64;
                    RunStats::add(&stats.total_files, count);
                    RunStats::add(&stats.successful_files, count);
                    flags.set(kind);
                    tracing::info!(worker_id, record_id = %record.id, %kind, files = count, "Bundle downloaded");
                }
                KindOutcome::Failed(failure) if matches!(failure.error, FetchError::Cancelled { .. }) => {
                    let count = failure.saved.len() as u64;
                    RunStats::add(&stats.total_files, count);
                    RunStats::add(&stats.successful_files, count);
                    interrupted = true;
                    tracing::debug!(worker_id, record_id = %record.id, %kind, saved = count, "Bundle interrupted by stop");
                }
                KindOutcome::Failed(failure) => {
                    let count = failure.saved.len() as u64;
                    RunStats::add(&stats.total_files, count);
                    RunStats::add(&stats.successful_files, count);
                    RunStats::incr(&stats.failed_files);
                    failed = true;
                    tracing::warn!(
                        worker_id,
                        record_id = %record.id,
                        %kind,
                        saved = count,
                        error = %failure.error,
                        "Bundle download failed"
                    );
                }
            }
        }

        if flags.any() {
            self.persist_record(record, &dir, flags).await;
        }

        if failed {
            RunStats::incr(&stats.failed_records);
            tracing::info!(worker_id, record_id = %record.id, "Record finished with errors");
            RecordOutcome::Failed
        } else if interrupted {
            // Picked up again by the next run
            RunStats::incr(&stats.skipped_records);
            tracing::info!(worker_id, record_id = %record.id, "Record interrupted by stop");
            RecordOutcome::Skipped
        } else {
            RunStats::incr(&stats.successful_records);
            tracing::info!(
                worker_id,
                record_id = %record.id,
                document = flags.document,
                address = flags.address,
                "Record finished"
            );
            RecordOutcome::Succeeded
        }
    }
}
