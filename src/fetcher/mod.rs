//! HTTP file fetching for CDN bundles.
//!
//! - [`FileFetcher::fetch`] downloads one URL to one path, atomically
//! - [`FileFetcher::detect_extension`] guesses a file extension from a HEAD request
//! - [`FileFetcher::download_bundle`] resolves a reference and fetches every file in it

use crate::error::{Error, FetchError, Result};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio_util::sync::CancellationToken;

mod bundle;

pub use bundle::BundleFailure;

/// Suffix appended to the destination path while a download is in flight
pub const PARTIAL_SUFFIX: &str = ".part";

/// Extension used when the content type is unknown or the lookup fails
pub const DEFAULT_EXTENSION: &str = ".bin";

/// What [`FileFetcher::fetch`] did
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FetchOutcome {
    /// The body was downloaded and renamed into place
    Downloaded {
        /// Bytes written
        bytes: u64,
    },
    /// The destination already existed; no request was made
    AlreadyPresent,
}

/// Downloads files from the CDN with a bounded per-request timeout
#[derive(Clone, Debug)]
pub struct FileFetcher {
    client: reqwest::Client,
}

impl FileFetcher {
    /// Create a fetcher whose requests (including body transfer) time out after `timeout`
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Other(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self { client })
    }

    /// Download `url` into `dest` unless `dest` already exists
    ///
    /// The body is streamed into `<dest>.part` and renamed over `dest` only
    /// after the whole body has been written and synced, so `dest` is either
    /// absent or complete. Any failure removes the partial file.
    pub async fn fetch(&self, url: &str, dest: &Path) -> std::result::Result<FetchOutcome, FetchError> {
        self.fetch_cancellable(url, dest, &CancellationToken::new())
            .await
    }

    /// [`fetch`](Self::fetch), abandoning the transfer as soon as `cancel` fires
    pub async fn fetch_cancellable(
        &self,
        url: &str,
        dest: &Path,
        cancel: &CancellationToken,
    ) -> std::result::Result<FetchOutcome, FetchError> {
        if tokio::fs::try_exists(dest).await.unwrap_or(false) {
            tracing::debug!(url, path = %dest.display(), "File already present, skipping");
            return Ok(FetchOutcome::AlreadyPresent);
        }

        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| FetchError::write(parent, e))?;
        }

        let response = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                return Err(FetchError::Cancelled { url: url.to_string() });
            }
            result = self.client.get(url).send() => {
                result.map_err(|e| FetchError::from_reqwest(url, e))?
            }
        };

        if !response.status().is_success() {
            return Err(FetchError::HttpStatus {
                url: url.to_string(),
                status: response.status().as_u16(),
            });
        }

        let tmp = partial_path(dest);
        let written = match write_body(response, &tmp, url, cancel).await {
            Ok(bytes) => bytes,
            Err(e) => {
                remove_partial(&tmp).await;
                return Err(e);
            }
        };

        if let Err(e) = tokio::fs::rename(&tmp, dest).await {
            remove_partial(&tmp).await;
            return Err(FetchError::write(dest, e));
        }

        tracing::debug!(url, path = %dest.display(), bytes = written, "File downloaded");
        Ok(FetchOutcome::Downloaded { bytes: written })
    }

    /// Guess an extension for `url` from the `Content-Type` of a HEAD request
    ///
    /// Never fails: transport errors, non-2xx answers, and unknown types all
    /// yield [`DEFAULT_EXTENSION`].
    pub async fn detect_extension(&self, url: &str) -> &'static str {
        let response = match self.client.head(url).send().await {
            Ok(response) if response.status().is_success() => response,
            Ok(response) => {
                tracing::debug!(url, status = %response.status(), "Extension lookup rejected");
                return DEFAULT_EXTENSION;
            }
            Err(e) => {
                tracing::debug!(url, error = %e, "Extension lookup failed");
                return DEFAULT_EXTENSION;
            }
        };

        response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(extension_for_content_type)
            .unwrap_or(DEFAULT_EXTENSION)
    }
}

/// Map a `Content-Type` header value to a file extension (with leading dot)
pub fn extension_for_content_type(content_type: &str) -> &'static str {
    let content_type = content_type.to_ascii_lowercase();
    if content_type.contains("image/jpeg") {
        ".jpg"
    } else if content_type.contains("image/png") {
        ".png"
    } else if content_type.contains("image/gif") {
        ".gif"
    } else if content_type.contains("application/pdf") {
        ".pdf"
    } else if content_type.contains("image/webp") {
        ".webp"
    } else {
        DEFAULT_EXTENSION
    }
}

/// Sibling path a download is written to before being renamed into place
pub fn partial_path(dest: &Path) -> PathBuf {
    let mut name = dest.as_os_str().to_owned();
    name.push(PARTIAL_SUFFIX);
    PathBuf::from(name)
}

async fn write_body(
    mut response: reqwest::Response,
    tmp: &Path,
    url: &str,
    cancel: &CancellationToken,
) -> std::result::Result<u64, FetchError> {
    let mut file = tokio::fs::File::create(tmp)
        .await
        .map_err(|e| FetchError::write(tmp, e))?;
    let mut written = 0u64;

    loop {
        let chunk = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                return Err(FetchError::Cancelled { url: url.to_string() });
            }
            chunk = response.chunk() => chunk.map_err(|e| FetchError::from_reqwest(url, e))?,
        };
        let Some(chunk) = chunk else {
            break;
        };
        file.write_all(&chunk)
            .await
            .map_err(|e| FetchError::write(tmp, e))?;
        written += chunk.len() as u64;
    }

    file.flush().await.map_err(|e| FetchError::write(tmp, e))?;
    file.sync_all()
        .await
        .map_err(|e| FetchError::write(tmp, e))?;
    Ok(written)
}

async fn remove_partial(tmp: &Path) {
    match tokio::fs::remove_file(tmp).await {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => {
            tracing::warn!(path = %tmp.display(), error = %e, "Failed to remove partial file");
        }
    }
}
