//! Bundle downloads for one record, and on-demand single-record downloads.

use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;

use crate::error::{Error, Result};
use crate::fetcher::BundleFailure;
use crate::types::{BundleKind, DownloadStatus, Record, RecordId, RecordPath, RecordReport};

use super::BulkDownloader;

/// Name of the side file written next to a record's bundles
pub const INFO_FILE_NAME: &str = "info.txt";

/// Directory holding every bundle of one record
pub fn record_dir(download_dir: &Path, group_key: &str, id: RecordId) -> PathBuf {
    download_dir.join(group_key).join(format!("record_{}", id))
}

/// Done flags for both bundle kinds
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) struct KindFlags {
    pub(crate) document: bool,
    pub(crate) address: bool,
}

impl KindFlags {
    /// Flags already recorded for a record, all clear when it has no status
    pub(crate) fn from_status(status: Option<&DownloadStatus>) -> Self {
        Self {
            document: status.is_some_and(|s| s.is_done(BundleKind::Document)),
            address: status.is_some_and(|s| s.is_done(BundleKind::Address)),
        }
    }

    pub(crate) fn get(&self, kind: BundleKind) -> bool {
        match kind {
            BundleKind::Document => self.document,
            BundleKind::Address => self.address,
        }
    }

    pub(crate) fn set(&mut self, kind: BundleKind) {
        match kind {
            BundleKind::Document => self.document = true,
            BundleKind::Address => self.address = true,
        }
    }

    pub(crate) fn any(&self) -> bool {
        self.document || self.address
    }
}

/// What happened to one bundle kind of a record
pub(crate) enum KindOutcome {
    Saved(Vec<PathBuf>),
    Failed(BundleFailure),
}

impl BulkDownloader {
    /// Download one bundle kind of `record` into its kind directory
    pub(crate) async fn fetch_kind(
        &self,
        record: &Record,
        dir: &Path,
        kind: BundleKind,
        cancel: &CancellationToken,
    ) -> KindOutcome {
        let reference = record.bundle_ref(kind).unwrap_or_default();
        match self
            .fetcher
            .download_bundle_cancellable(reference, &dir.join(kind.dir_name()), kind.file_prefix(), cancel)
            .await
        {
            Ok(saved) => KindOutcome::Saved(saved),
            Err(failure) => KindOutcome::Failed(failure),
        }
    }

    /// Upsert merged flags, then write the info side file
    ///
    /// Both steps are best-effort: failures are logged and reported to the
    /// caller as messages rather than errors.
    pub(crate) async fn persist_record(
        &self,
        record: &Record,
        dir: &Path,
        flags: KindFlags,
    ) -> Vec<String> {
        let mut problems = Vec::new();

        if let Err(e) = self
            .store
            .upsert(record.id, flags.document, flags.address)
            .await
        {
            tracing::warn!(record_id = %record.id, error = %e, "Failed to persist download status");
            problems.push(format!("status: {}", e));
        }

        if let Err(e) = write_info_file(dir, record).await {
            tracing::warn!(record_id = %record.id, error = %e, "Failed to write info file");
            problems.push(format!("info file: {}", e));
        }

        problems
    }

    /// Download every referenced bundle of one record, on demand
    ///
    /// Unlike a bulk run this ignores prior done flags, so a bundle that lost
    /// files on disk is completed again (files still present are not
    /// re-fetched). Prior flags are merged, never downgraded. Run counters are
    /// not touched, so this may be called while a bulk run is active.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] for an unknown id and
    /// [`Error::NotDownloadable`] for a record without a usable group key or
    /// without references.
    pub async fn download_record(&self, id: RecordId) -> Result<RecordReport> {
        let record = self
            .source
            .find(id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("record {}", id)))?;

        let group_key = record
            .safe_group_key()
            .ok_or_else(|| Error::NotDownloadable {
                id: id.get(),
                reason: "missing or unsafe group key".to_string(),
            })?
            .to_string();
        if !record.is_eligible() {
            return Err(Error::NotDownloadable {
                id: id.get(),
                reason: "no bundle references".to_string(),
            });
        }

        let prior = match self.store.get(id).await {
            Ok(status) => status,
            Err(e) => {
                tracing::warn!(record_id = %id, error = %e, "Status lookup failed, assuming nothing done");
                None
            }
        };
        let mut flags = KindFlags::from_status(prior.as_ref());

        let dir = record_dir(&self.config.download.download_dir, &group_key, id);
        let cancel = CancellationToken::new();
        let mut report = RecordReport {
            record_id: id,
            path: dir.clone(),
            ..Default::default()
        };

        for kind in BundleKind::ALL {
            if record.bundle_ref(kind).is_none() {
                continue;
            }
            match self.fetch_kind(&record, &dir, kind, &cancel).await {
                KindOutcome::Saved(saved) => {
                    tracing::info!(record_id = %id, %kind, files = saved.len(), "Bundle downloaded");
                    report.files.extend(saved);
                    flags.set(kind);
                }
                KindOutcome::Failed(failure) => {
                    tracing::warn!(record_id = %id, %kind, error = %failure.error, "Bundle download failed");
                    report.errors.push(format!("{}: {}", kind, failure.error));
                    report.files.extend(failure.saved);
                }
            }
        }

        if flags.any() {
            let problems = self.persist_record(&record, &dir, flags).await;
            report.errors.extend(problems);
        }

        report.document_success = flags.document;
        report.address_success = flags.address;
        Ok(report)
    }
}

impl BulkDownloader {
    /// Directory a record's bundles are (or would be) saved to
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] for an unknown id or a record without a
    /// group key, and [`Error::NotDownloadable`] for a group key that cannot
    /// be used as a directory name.
    pub async fn record_path(&self, id: RecordId) -> Result<RecordPath> {
        let record = self
            .source
            .find(id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("record {}", id)))?;

        let has_key = record
            .group_key
            .as_deref()
            .is_some_and(|k| !k.trim().is_empty());
        if !has_key {
            return Err(Error::NotFound(format!("group key for record {}", id)));
        }
        let group_key = record
            .safe_group_key()
            .ok_or_else(|| Error::NotDownloadable {
                id: id.get(),
                reason: "unsafe group key".to_string(),
            })?
            .to_string();

        Ok(RecordPath {
            record_id: id,
            path: record_dir(&self.config.download.download_dir, &group_key, id),
            group_key,
        })
    }
}

/// Write `info.txt` into the record directory, creating it if needed
pub(crate) async fn write_info_file(dir: &Path, record: &Record) -> std::io::Result<()> {
    tokio::fs::create_dir_all(dir).await?;
    tokio::fs::write(dir.join(INFO_FILE_NAME), record.info_file_contents()).await
}
