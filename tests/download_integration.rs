//! Integration tests for the download module.
//!
//! These tests verify the full download flow with mock HTTP servers.

use leecher_core::CancelFlag;
use leecher_core::download::{ClientConfig, DownloadError, DownloadOutcome, HttpClient};
use reqwest::header::{HeaderMap, HeaderValue};
use tempfile::TempDir;
use tokio::io::AsyncWriteExt;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, ResponseTemplate};

mod support;
use support::pdf_bytes;
use support::socket_guard::{should_skip_socket_bound_test, start_mock_server_or_skip};

fn client() -> HttpClient {
    HttpClient::new(&ClientConfig::default()).expect("client should build")
}

#[tokio::test]
async fn test_download_full_flow_preserves_content() {
    let Some(mock_server) = start_mock_server_or_skip().await else {
        return;
    };
    let temp_dir = TempDir::new().expect("failed to create temp dir");
    let content = pdf_bytes(4096);

    Mock::given(method("GET"))
        .and(path("/provas/analista.pdf"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(content.clone()))
        .mount(&mock_server)
        .await;

    let dest = temp_dir.path().join("Analista (2021).pdf");
    let url = format!("{}/provas/analista.pdf", mock_server.uri());
    let outcome = client()
        .try_download(&url, &dest, &HeaderMap::new(), &CancelFlag::new())
        .await
        .expect("download should succeed");

    assert_eq!(outcome, DownloadOutcome::Fetched { bytes: 4096 });
    assert_eq!(std::fs::read(&dest).unwrap(), content);
}

#[tokio::test]
async fn test_download_existing_complete_file_is_not_refetched() {
    let Some(mock_server) = start_mock_server_or_skip().await else {
        return;
    };
    let temp_dir = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .and(path("/doc.pdf"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(pdf_bytes(2048)))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = client();
    let dest = temp_dir.path().join("doc.pdf");
    let url = format!("{}/doc.pdf", mock_server.uri());
    let cancel = CancelFlag::new();

    let first = client
        .try_download(&url, &dest, &HeaderMap::new(), &cancel)
        .await
        .unwrap();
    let second = client
        .try_download(&url, &dest, &HeaderMap::new(), &cancel)
        .await
        .unwrap();

    assert!(first.was_fetched());
    assert_eq!(second, DownloadOutcome::AlreadyPresent { bytes: 2048 });
}

#[tokio::test]
async fn test_download_small_existing_file_is_replaced() {
    let Some(mock_server) = start_mock_server_or_skip().await else {
        return;
    };
    let temp_dir = TempDir::new().unwrap();
    let dest = temp_dir.path().join("doc.pdf");
    std::fs::write(&dest, b"stub").unwrap();

    Mock::given(method("GET"))
        .and(path("/doc.pdf"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(pdf_bytes(2048)))
        .expect(1)
        .mount(&mock_server)
        .await;

    let url = format!("{}/doc.pdf", mock_server.uri());
    assert!(
        client()
            .download(&url, &dest, &HeaderMap::new(), &CancelFlag::new())
            .await
    );
    assert_eq!(std::fs::metadata(&dest).unwrap().len(), 2048);
}

#[tokio::test]
async fn test_download_http_404_leaves_no_file() {
    let Some(mock_server) = start_mock_server_or_skip().await else {
        return;
    };
    let temp_dir = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .and(path("/missing.pdf"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock_server)
        .await;

    let dest = temp_dir.path().join("missing.pdf");
    let url = format!("{}/missing.pdf", mock_server.uri());
    let result = client()
        .try_download(&url, &dest, &HeaderMap::new(), &CancelFlag::new())
        .await;

    assert!(
        matches!(result, Err(DownloadError::HttpStatus { status: 404, .. })),
        "expected 404 error, got {result:?}"
    );
    assert!(!dest.exists());
}

#[tokio::test]
async fn test_download_http_404_removes_small_leftover() {
    let Some(mock_server) = start_mock_server_or_skip().await else {
        return;
    };
    let temp_dir = TempDir::new().unwrap();
    let dest = temp_dir.path().join("x.pdf");
    std::fs::write(&dest, b"%PDF-").unwrap();

    Mock::given(method("GET"))
        .and(path("/x.pdf"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&mock_server)
        .await;

    let url = format!("{}/x.pdf", mock_server.uri());
    let ok = client()
        .download(&url, &dest, &HeaderMap::new(), &CancelFlag::new())
        .await;

    assert!(!ok);
    assert!(!dest.exists(), "stale leftover should be removed");
}

#[tokio::test]
async fn test_download_sends_request_headers() {
    let Some(mock_server) = start_mock_server_or_skip().await else {
        return;
    };
    let temp_dir = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .and(path("/private.pdf"))
        .and(header("access-token", "tok-123"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(pdf_bytes(1500)))
        .expect(1)
        .mount(&mock_server)
        .await;

    let mut headers = HeaderMap::new();
    headers.insert("access-token", HeaderValue::from_static("tok-123"));
    let dest = temp_dir.path().join("private.pdf");
    let url = format!("{}/private.pdf", mock_server.uri());

    assert!(
        client()
            .download(&url, &dest, &headers, &CancelFlag::new())
            .await
    );
    assert!(dest.exists());
}

#[tokio::test]
async fn test_download_cancelled_before_start_sends_no_request() {
    let Some(mock_server) = start_mock_server_or_skip().await else {
        return;
    };
    let temp_dir = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(pdf_bytes(2048)))
        .expect(0)
        .mount(&mock_server)
        .await;

    let cancel = CancelFlag::new();
    cancel.cancel();
    let dest = temp_dir.path().join("doc.pdf");
    let url = format!("{}/doc.pdf", mock_server.uri());
    let result = client()
        .try_download(&url, &dest, &HeaderMap::new(), &cancel)
        .await;

    assert!(matches!(result, Err(DownloadError::Cancelled { .. })));
    assert!(!dest.exists());
}

#[tokio::test]
async fn test_download_truncated_body_removes_partial_file() {
    if should_skip_socket_bound_test() {
        return;
    }
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    // Promise 10 000 bytes, send 100, then hang up.
    let server = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut request = vec![0u8; 4096];
        let _ = tokio::io::AsyncReadExt::read(&mut socket, &mut request).await;
        let head = "HTTP/1.1 200 OK\r\nContent-Type: application/pdf\r\nContent-Length: 10000\r\n\r\n";
        socket.write_all(head.as_bytes()).await.unwrap();
        socket.write_all(&[b'x'; 100]).await.unwrap();
        socket.shutdown().await.unwrap();
    });

    let temp_dir = TempDir::new().unwrap();
    let dest = temp_dir.path().join("truncated.pdf");
    let url = format!("http://{addr}/truncated.pdf");
    let ok = client()
        .download(&url, &dest, &HeaderMap::new(), &CancelFlag::new())
        .await;

    server.await.unwrap();
    assert!(!ok, "a truncated body must not count as downloaded");
    assert!(!dest.exists(), "partial file should be removed");
}
