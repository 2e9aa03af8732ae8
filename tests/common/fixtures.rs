//! Mock CDN and seeded SQLite fixtures

use bundle_dl::config::PacingConfig;
use bundle_dl::{BulkDownloader, Config, Database, Record, RecordId};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{method, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Bytes served for every successful file
pub const CDN_BODY: &[u8] = b"\xff\xd8\xff\xe0fake-jpeg";

/// CDN serving JPEGs everywhere except under `/broken`, which answers 404
pub async fn start_cdn() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(path_regex("^/broken"))
        .respond_with(ResponseTemplate::new(404))
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("HEAD"))
        .respond_with(ResponseTemplate::new(200).insert_header("Content-Type", "image/jpeg"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(CDN_BODY.to_vec()))
        .mount(&server)
        .await;
    server
}

/// Config rooted in `dir` with pacing off
pub fn test_config(dir: &TempDir, workers: usize) -> Config {
    let mut config = Config::default();
    config.download.download_dir = dir.path().join("downloads");
    config.persistence.database_path = dir.path().join("bundle-dl.db");
    config.download.workers = workers;
    config.download.batch_size = 4;
    config.download.request_timeout = Duration::from_secs(5);
    config.download.pacing = PacingConfig::disabled();
    config
}

/// Downloader over a fresh SQLite database
pub async fn create_downloader(config: Config) -> (BulkDownloader, Arc<Database>) {
    BulkDownloader::with_database(config)
        .await
        .expect("failed to build downloader")
}

/// Record in `group` with the given references
pub fn record(id: i64, group: &str, document_ref: Option<String>, address_ref: Option<String>) -> Record {
    Record {
        id: RecordId(id),
        group_key: Some(group.to_string()),
        document_ref,
        address_ref,
        phone: Some("+7 701 111 22 33".to_string()),
        email: Some(format!("user{id}@example.com")),
        first_name: Some("Dana".to_string()),
        last_name: Some("Sarsen".to_string()),
        ..Default::default()
    }
}

pub async fn seed(db: &Database, records: &[Record]) {
    for r in records {
        db.insert_record(r).await.expect("failed to insert record");
    }
}

/// Wait for the active run to finish
pub async fn wait_for_run(downloader: &BulkDownloader, secs: u64) {
    tokio::time::timeout(Duration::from_secs(secs), downloader.wait())
        .await
        .expect("run did not finish in time");
}
