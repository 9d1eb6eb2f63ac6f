use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::Duration;

use axum::extract::{Path, Query};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use futures_util::StreamExt;
use serde_json::json;
use tokio::net::TcpListener;

use doc_relay_engine::remote::{HttpRemoteStore, RemoteStore};

const TEST_SIZE: usize = 256 * 1024;
const TOKEN: &str = "test-token";

fn authorized(headers: &HeaderMap) -> bool {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(|v| v == format!("Bearer {}", TOKEN))
        .unwrap_or(false)
}

async fn list_files(
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
) -> impl IntoResponse {
    if !authorized(&headers) {
        return (StatusCode::UNAUTHORIZED, "no token").into_response();
    }
    let q = params.get("q").cloned().unwrap_or_default();
    let files = match q.as_str() {
        "name = '101-A.pdf'" => json!([
            { "id": "file-1", "name": "101-A.pdf" },
            { "id": "file-2", "name": "101-A.pdf" }
        ]),
        "name = 'o\\'neil.pdf'" => json!([{ "id": "file-q", "name": "o'neil.pdf" }]),
        _ => json!([]),
    };
    Json(json!({ "files": files })).into_response()
}

async fn get_media(
    headers: HeaderMap,
    Path(id): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> impl IntoResponse {
    if !authorized(&headers) {
        return (StatusCode::FORBIDDEN, "forbidden").into_response();
    }
    if params.get("alt").map(String::as_str) != Some("media") || id != "file-1" {
        return (StatusCode::NOT_FOUND, "not found").into_response();
    }
    let body: Vec<u8> = (0..TEST_SIZE).map(|i| (i % 256) as u8).collect();
    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (header::CONTENT_LENGTH, TEST_SIZE.to_string()),
        ],
        body,
    )
        .into_response()
}

async fn start_server() -> (SocketAddr, tokio::task::JoinHandle<()>) {
    let app = Router::new()
        .route("/drive/v3/files", get(list_files))
        .route("/drive/v3/files/{id}", get(get_media));
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let handle = tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (addr, handle)
}

#[tokio::test]
async fn test_search_returns_results_in_store_order() {
    let (addr, _handle) = start_server().await;
    let store = HttpRemoteStore::new(format!("http://{}/drive/v3", addr), TOKEN);

    let files = store.search("101-A.pdf").await.unwrap();
    let ids: Vec<_> = files.iter().map(|f| f.id.as_str()).collect();
    assert_eq!(ids, vec!["file-1", "file-2"]);

    assert!(store.search("missing.pdf").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_search_escapes_quotes() {
    let (addr, _handle) = start_server().await;
    let store = HttpRemoteStore::new(format!("http://{}/drive/v3", addr), TOKEN);

    let files = store.search("o'neil.pdf").await.unwrap();
    assert_eq!(files.len(), 1);
    assert_eq!(files[0].id, "file-q");
}

#[tokio::test]
async fn test_stream_media_reports_size_and_bytes() {
    let (addr, _handle) = start_server().await;
    let store = HttpRemoteStore::new(format!("http://{}/drive/v3", addr), TOKEN);

    let media = store
        .stream_media("file-1", Duration::from_secs(30))
        .await
        .unwrap();
    assert_eq!(media.total_size, Some(TEST_SIZE as u64));

    let mut body = media.body;
    let mut data = Vec::new();
    while let Some(chunk) = body.next().await {
        data.extend_from_slice(&chunk.unwrap());
    }
    assert_eq!(data.len(), TEST_SIZE);
    for (i, b) in data.iter().take(300).enumerate() {
        assert_eq!(*b, (i % 256) as u8);
    }
}

#[tokio::test]
async fn test_rejected_token_is_auth_error() {
    let (addr, _handle) = start_server().await;
    let store = HttpRemoteStore::new(format!("http://{}/drive/v3", addr), "wrong");

    let err = store.search("101-A.pdf").await.unwrap_err();
    assert!(err.to_string().starts_with("auth_rejected"));

    let err = store
        .stream_media("file-1", Duration::from_secs(30))
        .await
        .err()
        .unwrap();
    assert!(err.to_string().starts_with("auth_rejected"));
}

#[tokio::test]
async fn test_unknown_media_is_error() {
    let (addr, _handle) = start_server().await;
    let store = HttpRemoteStore::new(format!("http://{}/drive/v3", addr), TOKEN);

    let result = store.stream_media("nope", Duration::from_secs(30)).await;
    assert!(result.is_err());
}
