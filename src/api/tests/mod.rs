use super::*;
use crate::db::Database;
use crate::downloader::test_helpers::{record, test_config};
use crate::{BulkDownloader, Config};
use axum::body::Body;
use axum::extract::Request;
use axum::http::StatusCode;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tower::ServiceExt;


/// Router over a real SQLite database in a scratch directory
struct TestApp {
    router: Router,
    state: AppState,
    _temp_dir: TempDir,
}

impl TestApp {
    async fn new() -> Self {
        Self::with_config(|_| {}).await
    }

    async fn with_config(tweak: impl FnOnce(&mut Config)) -> Self {
        let temp_dir = tempfile::tempdir().unwrap();
        let mut config = test_config(temp_dir.path(), 2);
        tweak(&mut config);

        let db = Arc::new(Database::new(&config.persistence.database_path).await.unwrap());
        let downloader = BulkDownloader::new(config.clone(), db.clone(), db.clone()).unwrap();
        let state = AppState::new(Arc::new(downloader), db, Arc::new(config));

        Self {
            router: create_router(state.clone()),
            state,
            _temp_dir: temp_dir,
        }
    }

    async fn seed(&self, records: Vec<crate::types::Record>) {
        for r in &records {
            self.state.db.insert_record(r).await.unwrap();
        }
    }

    /// Send a bodyless request and decode the JSON answer
    async fn send(&self, method: &str, uri: &str) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap();
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = if body.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body).unwrap()
        };
        (status, json)
    }
}

#[tokio::test]
async fn test_api_server_spawns() {
    let app = TestApp::with_config(|c| {
        c.server.api.bind_address = "127.0.0.1:0".parse().unwrap();
    })
    .await;

    let api_handle = tokio::spawn({
        let state = app.state.clone();
        async move { start_api_server(state).await }
    });

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(!api_handle.is_finished(), "server should still be serving");
    api_handle.abort();
}

#[tokio::test]
async fn test_cors_enabled() {
    let app = TestApp::with_config(|c| {
        c.server.api.cors_enabled = true;
        c.server.api.cors_origins = vec!["*".to_string()];
    })
    .await;

    let request = Request::builder()
        .uri("/health")
        .header("Origin", "http://localhost:3000")
        .body(Body::empty())
        .unwrap();
    let response = app.router.clone().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(
        response.headers().contains_key("access-control-allow-origin"),
        "CORS header should be present when CORS is enabled"
    );
}

#[tokio::test]
async fn test_cors_disabled() {
    let app = TestApp::with_config(|c| c.server.api.cors_enabled = false).await;

    let request = Request::builder()
        .uri("/health")
        .header("Origin", "http://localhost:3000")
        .body(Body::empty())
        .unwrap();
    let response = app.router.clone().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(!response.headers().contains_key("access-control-allow-origin"));
}

#[tokio::test]
async fn test_cors_specific_origin() {
    let app = TestApp::with_config(|c| {
        c.server.api.cors_origins = vec!["http://allowed.example".to_string()];
    })
    .await;

    let request = Request::builder()
        .uri("/health")
        .header("Origin", "http://allowed.example")
        .body(Body::empty())
        .unwrap();
    let response = app.router.clone().oneshot(request).await.unwrap();

    assert_eq!(
        response.headers().get("access-control-allow-origin").unwrap(),
        "http://allowed.example"
    );
}

#[tokio::test]
async fn test_unknown_route_is_404() {
    let app = TestApp::new().await;
    let (status, _) = app.send("GET", "/downloads").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
