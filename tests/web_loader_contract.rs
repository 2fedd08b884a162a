use axum::{Router, http::StatusCode, http::header, routing::get};
use std::net::SocketAddr;
use url::Url;

use urlsum::config::FetchConfig;
use urlsum::loader::{ContentLoader, HttpLoader};
use urlsum::{PipelineError, SourceKind};

async fn serve(app: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

fn fixture_site() -> Router {
    Router::new()
        .route(
            "/article",
            get(|| async {
                (
                    [(header::CONTENT_TYPE, "text/html; charset=utf-8")],
                    "<html><head><title>Fixture Article</title><script>track()</script></head>\
                     <body><h1>Rust in production</h1><p>Ownership makes   memory safety cheap.</p></body></html>",
                )
            }),
        )
        .route(
            "/notes.txt",
            get(|| async { ([(header::CONTENT_TYPE, "text/plain")], "  plain notes \n") }),
        )
        .route(
            "/blank",
            get(|| async { ([(header::CONTENT_TYPE, "text/html")], "<html><body><script>x()</script></body></html>") }),
        )
        .route(
            "/paper.pdf",
            get(|| async { ([(header::CONTENT_TYPE, "application/pdf")], "%PDF-1.7") }),
        )
        .route("/missing", get(|| async { (StatusCode::NOT_FOUND, "gone") }))
        .route(
            "/huge.txt",
            get(|| async { ([(header::CONTENT_TYPE, "text/plain")], "word ".repeat(40_000)) }),
        )
        .route(
            "/ua",
            get(|headers: axum::http::HeaderMap| async move {
                let ua = headers
                    .get(header::USER_AGENT)
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("")
                    .to_string();
                ([(header::CONTENT_TYPE, "text/plain")], format!("agent={ua}"))
            }),
        )
}

async fn load(addr: SocketAddr, path: &str) -> Result<Vec<urlsum::Document>, PipelineError> {
    let loader = HttpLoader::new(&FetchConfig::default()).unwrap();
    let url = Url::parse(&format!("http://{addr}{path}")).unwrap();
    loader.load(&url, SourceKind::GenericPage).await
}

#[tokio::test]
async fn html_page_becomes_one_text_document() {
    let addr = serve(fixture_site()).await;
    let docs = load(addr, "/article").await.unwrap();

    assert_eq!(docs.len(), 1);
    assert_eq!(docs[0].text, "Rust in production\nOwnership makes memory safety cheap.");
    assert_eq!(docs[0].metadata["title"], "Fixture Article");
    assert_eq!(docs[0].metadata["content_type"], "text/html");
    assert_eq!(docs[0].metadata["source"], format!("http://{addr}/article"));
}

#[tokio::test]
async fn plain_text_passes_through() {
    let addr = serve(fixture_site()).await;
    let docs = load(addr, "/notes.txt").await.unwrap();
    assert_eq!(docs[0].text, "plain notes");
}

#[tokio::test]
async fn browser_like_user_agent_is_sent() {
    let addr = serve(fixture_site()).await;
    let docs = load(addr, "/ua").await.unwrap();
    assert_eq!(docs[0].text, "agent=Mozilla/5.0");
}

#[tokio::test]
async fn page_without_text_is_unavailable() {
    let addr = serve(fixture_site()).await;
    let err = load(addr, "/blank").await.unwrap_err();
    assert!(matches!(
        err,
        PipelineError::ContentUnavailable {
            kind: SourceKind::GenericPage,
            ..
        }
    ));
}

#[tokio::test]
async fn http_error_status_is_unavailable() {
    let addr = serve(fixture_site()).await;
    let err = load(addr, "/missing").await.unwrap_err();
    assert!(matches!(err, PipelineError::ContentUnavailable { .. }));
    assert!(err.to_string().contains("404"));
}

#[tokio::test]
async fn binary_content_is_unavailable() {
    let addr = serve(fixture_site()).await;
    let err = load(addr, "/paper.pdf").await.unwrap_err();
    assert!(err.to_string().contains("unsupported content type: application/pdf"));
}

#[tokio::test]
async fn unreachable_host_is_unavailable() {
    // Bind then drop to get a port nothing listens on
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let err = load(addr, "/").await.unwrap_err();
    assert!(matches!(err, PipelineError::ContentUnavailable { .. }));
}

#[tokio::test]
async fn oversized_page_is_cut_at_byte_cap() {
    let addr = serve(fixture_site()).await;
    let fetch = FetchConfig {
        max_bytes: 1000,
        ..FetchConfig::default()
    };
    let loader = HttpLoader::new(&fetch).unwrap();
    let url = Url::parse(&format!("http://{addr}/huge.txt")).unwrap();
    let docs = loader.load(&url, SourceKind::GenericPage).await.unwrap();

    // 1000 bytes of "word " ends on a space, which trimming drops
    assert_eq!(docs[0].text.len(), 999);
    assert!(docs[0].text.starts_with("word word"));

    let full = load(addr, "/huge.txt").await.unwrap();
    assert_eq!(full[0].text.len(), 200_000 - 1);
}
