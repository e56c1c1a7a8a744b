use base64::Engine;
use reqwest::StatusCode;
use serde_json::Value;
use stash_inspect::ActiveDatabase;
use stash_serve::QueryServer;
use stash_store::{Database, Repository};
use std::net::SocketAddr;

struct TestServer {
    _dir: tempfile::TempDir,
    server: QueryServer,
    addr: SocketAddr,
    file_id: i64,
    client: reqwest::Client,
}

impl TestServer {
    async fn start() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.db");
        let db = Database::create(&path).await.unwrap();
        let file_id = Repository::from(&db).insert(b"0123456789", "a.txt", Some("text/plain")).await.unwrap();
        sqlx::raw_sql("CREATE TABLE codes (code TEXT PRIMARY KEY, label TEXT); INSERT INTO codes VALUES ('007', 'bond');")
            .execute(db.pool())
            .await
            .unwrap();
        db.close().await;

        let active = ActiveDatabase::new();
        active.open(&path).await.unwrap();
        let server = QueryServer::new(active);
        let addr = server.start(0).await.unwrap();
        Self { _dir: dir, server, addr, file_id, client: reqwest::Client::new() }
    }

    async fn get(&self, path: &str) -> (StatusCode, Value) {
        let url = format!("http://127.0.0.1:{}{path}", self.addr.port());
        let response = self.client.get(url).send().await.unwrap();
        let status = response.status();
        (status, response.json().await.unwrap())
    }
}

#[tokio::test]
async fn test_get_existing_file() {
    let server = TestServer::start().await;
    let (status, body) = server.get(&format!("/files/{}", server.file_id)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], server.file_id);
    assert_eq!(body["file_name"], "a.txt");
    assert_eq!(body["file_size"], 10);
    assert_eq!(body["sha256_hash"], stash_store::hash(b"0123456789").strong);
    let data = base64::engine::general_purpose::STANDARD.decode(body["file_data"].as_str().unwrap()).unwrap();
    assert_eq!(data, b"0123456789");
    server.server.stop().await.unwrap();
}

#[tokio::test]
async fn test_get_text_key_with_leading_zeros() {
    let server = TestServer::start().await;
    let (status, body) = server.get("/codes/007").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, serde_json::json!({ "code": "007", "label": "bond" }));
    let (status, _) = server.get("/codes/7").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    // Integer keys still match regardless of leading zeros.
    let (status, body) = server.get(&format!("/files/00{}", server.file_id)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], server.file_id);
}

#[tokio::test]
async fn test_get_missing_row() {
    let server = TestServer::start().await;
    let (status, body) = server.get("/files/9999").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, serde_json::json!({ "error": "Not found" }));
}

#[tokio::test]
async fn test_get_unknown_table() {
    let server = TestServer::start().await;
    let (status, body) = server.get("/nope/1").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["error"].as_str().unwrap().contains("nope"));
    // The store is untouched by hostile table names.
    let (status, _) = server.get("/files;%20DROP%20TABLE%20files/1").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    let (status, _) = server.get(&format!("/files/{}", server.file_id)).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_unrouted_path() {
    let server = TestServer::start().await;
    let (status, body) = server.get("/files").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Not found");
}

#[tokio::test]
async fn test_no_database_selected() {
    let server = QueryServer::new(ActiveDatabase::new());
    let addr = server.start(0).await.unwrap();
    let response = reqwest::get(format!("http://127.0.0.1:{}/files/1", addr.port())).await.unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = response.json().await.unwrap();
    assert!(body["error"].is_string());
    server.stop().await.unwrap();
}

#[tokio::test]
async fn test_requests_are_published() {
    let server = TestServer::start().await;
    let mut events = server.server.subscribe();
    server.get(&format!("/files/{}?pretty", server.file_id)).await;
    server.get("/files/9999").await;

    let first = events.recv().await.unwrap();
    assert_eq!(first.method, "GET");
    assert_eq!(first.url, format!("/files/{}?pretty", server.file_id));
    assert_eq!(first.status, 200);
    let second = events.recv().await.unwrap();
    assert_eq!((second.url.as_str(), second.status), ("/files/9999", 404));
}
