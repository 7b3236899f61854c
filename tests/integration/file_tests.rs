//! Menu file harvesting against a mock file server

use crate::common::test_worker;
use menu_harvest::browser::{SnapshotBrowser, SnapshotDocument};
use menu_harvest::job::CrawlJob;
use menu_harvest::state::ExtractionMethod;
use menu_harvest::storage::CacheStore;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn serve(server: &MockServer, route: &str, content_type: &str, body: Vec<u8>) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(body)
                .insert_header("content-type", content_type),
        )
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_file_extractor_applies_size_and_dimension_rules() {
    let server = MockServer::start().await;
    serve(&server, "/downloads/karte.pdf", "application/pdf", b"%PDF-1.4 menu".to_vec()).await;
    serve(&server, "/img/menu-small.jpg", "image/jpeg", vec![7; 20 * 1024]).await;
    serve(&server, "/img/menu-large.jpg", "image/jpeg", vec![7; 50 * 1024]).await;
    serve(&server, "/img/menu-banner.jpg", "image/jpeg", vec![7; 50 * 1024]).await;
    serve(&server, "/img/team.jpg", "image/jpeg", vec![7; 50 * 1024]).await;

    let page_url = format!("{}/speisekarte", server.uri());
    let html = r#"<html><body>
        <h1>Unsere Karte</h1>
        <a href="/downloads/karte.pdf">Speisekarte als PDF</a>
        <img src="/img/menu-small.jpg">
        <img src="/img/menu-large.jpg">
        <img src="/img/menu-banner.jpg">
        <img src="/img/team.jpg">
    </body></html>"#;
    let document = SnapshotDocument::new(html)
        .with_image("/img/menu-small.jpg", 400, 600)
        .with_image("/img/menu-large.jpg", 400, 600)
        .with_image("/img/menu-banner.jpg", 1600, 400)
        .with_image("/img/team.jpg", 800, 600);
    let browser = SnapshotBrowser::new().with_document(&page_url, document);

    let uploads = tempfile::tempdir().unwrap();
    let worker = test_worker(browser, uploads.path());

    let result = worker
        .coordinator
        .process_job(&CrawlJob::page("job-10", page_url.as_str()))
        .await
        .unwrap();

    assert_eq!(result.method, Some(ExtractionMethod::FileExtractor));
    assert_eq!(
        result.data,
        vec!["127.0.0.1/karte.pdf", "127.0.0.1/menu-large.jpg"]
    );

    let pdf = std::fs::read(uploads.path().join("127.0.0.1").join("karte.pdf")).unwrap();
    assert_eq!(pdf, b"%PDF-1.4 menu".to_vec());
    let image = std::fs::read(uploads.path().join("127.0.0.1").join("menu-large.jpg")).unwrap();
    assert_eq!(image.len(), 50 * 1024);
    assert!(!uploads.path().join("127.0.0.1").join("menu-small.jpg").exists());

    let strategy = worker.cache.get("strategy:127.0.0.1").await.unwrap().unwrap();
    assert_eq!(strategy, r#"{"method":"fileExtractor"}"#);
}

#[tokio::test]
async fn test_non_menu_path_rejected_before_download() {
    let server = MockServer::start().await;
    serve(&server, "/docs/flyer.png", "application/pdf", b"%PDF-1.7".to_vec()).await;

    let page_url = format!("{}/", server.uri());
    let html = r#"<html><body><a href="/docs/flyer.png">Flyer</a></body></html>"#;
    let browser = SnapshotBrowser::new().with_page(&page_url, html);

    let uploads = tempfile::tempdir().unwrap();
    let worker = test_worker(browser, uploads.path());

    let result = worker
        .coordinator
        .process_job(&CrawlJob::page("job-11", page_url.as_str()))
        .await
        .unwrap();

    assert_eq!(result.method, None);
    assert!(result.data.is_empty());
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_failed_downloads_do_not_abort_the_batch() {
    let server = MockServer::start().await;
    serve(&server, "/menu/page2.pdf", "application/pdf", b"%PDF second".to_vec()).await;
    Mock::given(method("GET"))
        .and(path("/menu/page1.pdf"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let page_url = format!("{}/", server.uri());
    let html = r#"<html><body>
        <a href="/menu/page1.pdf">Seite 1</a>
        <a href="/menu/page2.pdf">Seite 2</a>
    </body></html>"#;
    let browser = SnapshotBrowser::new().with_page(&page_url, html);

    let uploads = tempfile::tempdir().unwrap();
    let worker = test_worker(browser, uploads.path());

    let result = worker
        .coordinator
        .process_job(&CrawlJob::page("job-12", page_url.as_str()))
        .await
        .unwrap();

    assert_eq!(result.method, Some(ExtractionMethod::FileExtractor));
    assert_eq!(result.data, vec!["127.0.0.1/page2.pdf"]);
}
