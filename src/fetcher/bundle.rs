//! Downloading every file designated by one bundle reference.

use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;

use super::FileFetcher;
use crate::bundle;
use crate::error::FetchError;

/// A bundle that stopped at its first failing file
///
/// `saved` holds the files that made it to disk before the failure, so callers
/// can compare it against the expected count. Re-running the bundle resumes
/// from the first missing file.
#[derive(Debug)]
pub struct BundleFailure {
    /// Paths saved before the failure, in bundle order
    pub saved: Vec<PathBuf>,
    /// The error that stopped the bundle
    pub error: FetchError,
}

impl std::fmt::Display for BundleFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} (after {} file(s) saved)", self.error, self.saved.len())
    }
}

impl FileFetcher {
    /// Fetch every file of `reference` into `dest_dir` as `<file_prefix>_<n><ext>`
    ///
    /// A blank reference is an empty success. Files are fetched in bundle
    /// order and the first failure stops the bundle.
    pub async fn download_bundle(
        &self,
        reference: &str,
        dest_dir: &Path,
        file_prefix: &str,
    ) -> Result<Vec<PathBuf>, BundleFailure> {
        self.download_bundle_cancellable(reference, dest_dir, file_prefix, &CancellationToken::new())
            .await
    }

    /// [`download_bundle`](Self::download_bundle), stopping early once `cancel` fires
    pub async fn download_bundle_cancellable(
        &self,
        reference: &str,
        dest_dir: &Path,
        file_prefix: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<PathBuf>, BundleFailure> {
        let reference = reference.trim();
        if reference.is_empty() {
            return Ok(Vec::new());
        }

        let resolved = bundle::resolve(reference).map_err(|error| BundleFailure {
            saved: Vec::new(),
            error,
        })?;
        tracing::debug!(
            reference,
            files = resolved.len(),
            grouped = resolved.is_grouped(),
            "Resolved bundle"
        );

        let mut saved = Vec::with_capacity(resolved.len());
        for file in resolved.files() {
            if cancel.is_cancelled() {
                return Err(BundleFailure {
                    saved,
                    error: FetchError::Cancelled {
                        url: file.url.clone(),
                    },
                });
            }

            let ext = self.detect_extension(&file.url).await;
            let dest = dest_dir.join(format!("{}_{}{}", file_prefix, file.index + 1, ext));

            if let Err(error) = self.fetch_cancellable(&file.url, &dest, cancel).await {
                return Err(BundleFailure { saved, error });
            }
            saved.push(dest);
        }

        Ok(saved)
    }
}
