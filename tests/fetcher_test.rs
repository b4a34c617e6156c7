use gateway_sync::config::SourceConfig;
use gateway_sync::error::SyncError;
use gateway_sync::fetcher::{HttpSourceFetcher, SourceFetcher, VersionToken};
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn fetcher() -> HttpSourceFetcher {
    HttpSourceFetcher::new(Duration::from_secs(5)).unwrap()
}

async fn serve(server: &MockServer, route: &str, status: u16, body: &str) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(status).set_body_string(body.to_string()))
        .mount(server)
        .await;
}

async fn hits(server: &MockServer, route: &str) -> usize {
    server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .filter(|r| r.url.path() == route)
        .count()
}

#[tokio::test]
async fn test_version_from_header() {
    let server = MockServer::start().await;
    serve(
        &server,
        "/pro.txt",
        200,
        "# Title: Pro\n# Version: 2024.0815.1\n# Last modified: 15 Aug 2024\nads.example.com\n",
    )
    .await;

    let source = SourceConfig::new("Pro", &format!("{}/pro.txt", server.uri()), None);
    let version = fetcher().fetch_version(&source).await;
    assert_eq!(version, Some(VersionToken::new("2024.0815.1")));
}

#[tokio::test]
async fn test_version_falls_back_to_last_modified() {
    let server = MockServer::start().await;
    serve(
        &server,
        "/tif.txt",
        200,
        "# Title: TIF\n# Last modified: 01 Jan 2025 10:00 UTC\nbad.example.com\n",
    )
    .await;

    let source = SourceConfig::new("TIF", &format!("{}/tif.txt", server.uri()), None);
    let version = fetcher().fetch_version(&source).await;
    assert_eq!(version, Some(VersionToken::new("01 Jan 2025 10:00 UTC")));
}

#[tokio::test]
async fn test_version_beyond_probe_uses_full_body() {
    let server = MockServer::start().await;
    let mut body = String::new();
    for _ in 0..15 {
        body.push_str(&format!("# {}\n", "x".repeat(200)));
    }
    body.push_str("# Version: 7\nads.example.com\n");
    serve(&server, "/long.txt", 200, &body).await;

    let source = SourceConfig::new("Long", &format!("{}/long.txt", server.uri()), None);
    let version = fetcher().fetch_version(&source).await;

    assert_eq!(version, Some(VersionToken::new("7")));
    assert_eq!(hits(&server, "/long.txt").await, 2);
}

#[tokio::test]
async fn test_version_line_cut_by_probe_uses_full_body() {
    let server = MockServer::start().await;
    let mut body = String::new();
    for _ in 0..19 {
        body.push_str(&format!("# {}\n", "x".repeat(104)));
    }
    // Starts at byte 2033, so the 2048-byte probe ends inside it.
    body.push_str("# Version: 2025.1222.2237.20\nads.example.com\n");
    serve(&server, "/cut.txt", 200, &body).await;

    let source = SourceConfig::new("Cut", &format!("{}/cut.txt", server.uri()), None);
    let version = fetcher().fetch_version(&source).await;

    assert_eq!(version, Some(VersionToken::new("2025.1222.2237.20")));
    assert_eq!(hits(&server, "/cut.txt").await, 2);
}

#[tokio::test]
async fn test_version_uses_backup_url() {
    let server = MockServer::start().await;
    serve(&server, "/primary.txt", 404, "").await;
    serve(&server, "/backup.txt", 200, "# Version: 42\nads.example.com\n").await;

    let source = SourceConfig::new(
        "Multi",
        &format!("{}/primary.txt", server.uri()),
        Some(&format!("{}/backup.txt", server.uri())),
    );
    let version = fetcher().fetch_version(&source).await;
    assert_eq!(version, Some(VersionToken::new("42")));
}

#[tokio::test]
async fn test_version_unknown_when_no_marker() {
    let server = MockServer::start().await;
    serve(&server, "/plain.txt", 200, "ads.example.com\ntracker.example.net\n").await;
    serve(&server, "/plain2.txt", 200, "ads.example.com\n").await;

    let source = SourceConfig::new(
        "Plain",
        &format!("{}/plain.txt", server.uri()),
        Some(&format!("{}/plain2.txt", server.uri())),
    );
    assert_eq!(fetcher().fetch_version(&source).await, None);
    assert!(hits(&server, "/plain.txt").await >= 1);
    assert!(hits(&server, "/plain2.txt").await >= 1);
}

#[tokio::test]
async fn test_version_survives_unreachable_primary() {
    let server = MockServer::start().await;
    serve(&server, "/backup.txt", 200, "# Version: 3\n").await;

    // Nothing listens on port 1.
    let source = SourceConfig::new(
        "Flaky",
        "http://127.0.0.1:1/list.txt",
        Some(&format!("{}/backup.txt", server.uri())),
    );
    assert_eq!(
        fetcher().fetch_version(&source).await,
        Some(VersionToken::new("3"))
    );
}

#[tokio::test]
async fn test_fetch_full_falls_back_to_backup() {
    let server = MockServer::start().await;
    serve(&server, "/primary.txt", 500, "").await;
    serve(&server, "/backup.txt", 200, "a.example.com\nb.example.com\n").await;

    let source = SourceConfig::new(
        "Multi",
        &format!("{}/primary.txt", server.uri()),
        Some(&format!("{}/backup.txt", server.uri())),
    );
    let body = fetcher().fetch_full(&source).await.unwrap();
    assert_eq!(body, "a.example.com\nb.example.com\n");
}

#[tokio::test]
async fn test_fetch_full_reports_every_attempt() {
    let server = MockServer::start().await;
    serve(&server, "/primary.txt", 404, "").await;
    serve(&server, "/backup.txt", 503, "").await;

    let source = SourceConfig::new(
        "Gone",
        &format!("{}/primary.txt", server.uri()),
        Some(&format!("{}/backup.txt", server.uri())),
    );
    match fetcher().fetch_full(&source).await.unwrap_err() {
        SyncError::Fetch { name, attempts } => {
            assert_eq!(name, "Gone");
            assert_eq!(attempts.len(), 2);
            assert!(attempts[0].contains("404"));
            assert!(attempts[1].contains("503"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}
