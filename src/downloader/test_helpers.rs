//! Shared test helpers: in-memory record sources, status stores and a mock CDN.

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;
use wiremock::matchers::{method, path_regex};
use rand::Rng;
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

use crate::config::{Config, PacingConfig};
use crate::downloader::BulkDownloader;
use crate::error::{DatabaseError, Error, Result};
use crate::store::{RecordSource, StatusStore};
use crate::types::{DownloadStatus, Record, RecordId};

/// Body served by [`mock_cdn`] for every file
pub(crate) const FILE_BODY: &[u8] = b"bundle-file-bytes";

/// In-memory [`RecordSource`] with optional failure injection
#[derive(Default)]
pub(crate) struct MemorySource {
    pub(crate) records: Vec<Record>,
    /// `count_eligible` fails
    pub(crate) fail_count: AtomicBool,
    /// `count_eligible` panics
    pub(crate) panic_count: AtomicBool,
    /// `page` returns records without filtering out ineligible ones
    pub(crate) unfiltered: bool,
    /// `page` fails for any offset at or beyond this one
    pub(crate) fail_page_from: Option<i64>,
    /// Latency added to every `page` call
    pub(crate) page_delay: Option<Duration>,
    pub(crate) page_calls: AtomicUsize,
}

impl MemorySource {
    pub(crate) fn new(records: Vec<Record>) -> Self {
        Self {
            records,
            ..Default::default()
        }
    }

    fn eligible(&self) -> impl Iterator<Item = &Record> {
        self.records.iter().filter(|r| r.is_eligible())
    }
}

#[async_trait]
impl RecordSource for MemorySource {
    async fn count_eligible(&self) -> Result<i64> {
        if self.panic_count.load(Ordering::SeqCst) {
            panic!("injected count panic");
        }
        if self.fail_count.load(Ordering::SeqCst) {
            return Err(Error::Database(DatabaseError::QueryFailed(
                "injected count failure".to_string(),
            )));
        }
        Ok(self.eligible().count() as i64)
    }

    async fn page(&self, limit: i64, offset: i64) -> Result<Vec<Record>> {
        self.page_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.page_delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_page_from.is_some_and(|from| offset >= from) {
            return Err(Error::Database(DatabaseError::QueryFailed(
                "injected page failure".to_string(),
            )));
        }
        if self.unfiltered {
            return Ok(self
                .records
                .iter()
                .skip(offset as usize)
                .take(limit as usize)
                .cloned()
                .collect());
        }
        Ok(self
            .eligible()
            .skip(offset as usize)
            .take(limit as usize)
            .cloned()
            .collect())
    }

    async fn find(&self, id: RecordId) -> Result<Option<Record>> {
        Ok(self.records.iter().find(|r| r.id == id).cloned())
    }
}

/// In-memory [`StatusStore`] that counts calls
#[derive(Default)]
pub(crate) struct MemoryStore {
    pub(crate) statuses: std::sync::Mutex<HashMap<RecordId, DownloadStatus>>,
    /// `get` fails for every id
    pub(crate) fail_get: AtomicBool,
    pub(crate) upserts: AtomicUsize,
}

impl MemoryStore {
    pub(crate) fn with_status(self, id: i64, document_done: bool, address_done: bool) -> Self {
        self.statuses.lock().unwrap().insert(
            RecordId(id),
            DownloadStatus {
                record_id: RecordId(id),
                document_done,
                address_done,
                updated_at: chrono::Utc::now(),
            },
        );
        self
    }

    pub(crate) fn flags(&self, id: i64) -> Option<(bool, bool)> {
        self.statuses
            .lock()
            .unwrap()
            .get(&RecordId(id))
            .map(|s| (s.document_done, s.address_done))
    }

    pub(crate) fn upsert_count(&self) -> usize {
        self.upserts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StatusStore for MemoryStore {
    async fn get(&self, id: RecordId) -> Result<Option<DownloadStatus>> {
        if self.fail_get.load(Ordering::SeqCst) {
            return Err(Error::Database(DatabaseError::QueryFailed(
                "injected lookup failure".to_string(),
            )));
        }
        Ok(self.statuses.lock().unwrap().get(&id).cloned())
    }

    async fn upsert(&self, id: RecordId, document_done: bool, address_done: bool) -> Result<()> {
        self.upserts.fetch_add(1, Ordering::SeqCst);
        self.statuses.lock().unwrap().insert(
            id,
            DownloadStatus {
                record_id: id,
                document_done,
                address_done,
                updated_at: chrono::Utc::now(),
            },
        );
        Ok(())
    }
}

/// Mock CDN: every path serves [`FILE_BODY`] as a JPEG, except paths starting
/// with `/fail` which answer 500
pub(crate) async fn mock_cdn() -> MockServer {
    mock_cdn_serving(file_response()).await
}

/// [`mock_cdn`] whose file GETs each take a random 0 to `max_ms` milliseconds
pub(crate) async fn jittered_cdn(max_ms: u64) -> MockServer {
    mock_cdn_serving(Jittered { max_ms }).await
}

/// [`mock_cdn`] whose file GETs each take `delay`
pub(crate) async fn slow_cdn(delay: Duration) -> MockServer {
    mock_cdn_serving(file_response().set_delay(delay)).await
}

async fn mock_cdn_serving(files: impl Respond + 'static) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(path_regex("^/fail"))
        .respond_with(ResponseTemplate::new(500))
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("HEAD"))
        .respond_with(ResponseTemplate::new(200).insert_header("Content-Type", "image/jpeg"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .respond_with(files)
        .mount(&server)
        .await;
    server
}

fn file_response() -> ResponseTemplate {
    ResponseTemplate::new(200)
        .insert_header("Content-Type", "image/jpeg")
        .set_body_bytes(FILE_BODY.to_vec())
}

struct Jittered {
    max_ms: u64,
}

impl Respond for Jittered {
    fn respond(&self, _request: &Request) -> ResponseTemplate {
        let delay = rand::thread_rng().gen_range(0..=self.max_ms);
        file_response().set_delay(Duration::from_millis(delay))
    }
}

/// Number of GET requests the mock CDN has received
pub(crate) async fn get_requests(server: &MockServer) -> usize {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter(|r| r.method.as_str() == "GET")
        .count()
}

/// Record in group `KZ` with the given references
pub(crate) fn record(id: i64, document_ref: Option<String>, address_ref: Option<String>) -> Record {
    Record {
        id: RecordId(id),
        group_key: Some("KZ".to_string()),
        document_ref,
        address_ref,
        phone: Some("+7 700 000 00 00".to_string()),
        first_name: Some("Aida".to_string()),
        ..Default::default()
    }
}

/// Config writing into `dir` with pacing off
pub(crate) fn test_config(dir: &Path, workers: usize) -> Config {
    let mut config = Config::default();
    config.download.download_dir = dir.join("downloads");
    config.persistence.database_path = dir.join("test.db");
    config.download.workers = workers;
    config.download.batch_size = 10;
    config.download.request_timeout = Duration::from_secs(5);
    config.download.pacing = PacingConfig::disabled();
    config
}

/// Build a downloader over in-memory fakes
pub(crate) fn create_test_downloader(
    config: Config,
    source: Arc<MemorySource>,
    store: Arc<MemoryStore>,
) -> BulkDownloader {
    BulkDownloader::new(config, source, store).unwrap()
}

/// Wait for the active run to end, failing the test after `secs`
pub(crate) async fn wait_for_run(downloader: &BulkDownloader, secs: u64) {
    tokio::time::timeout(Duration::from_secs(secs), downloader.wait())
        .await
        .expect("run did not finish in time");
}
