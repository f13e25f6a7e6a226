//! Link extraction against mock listing pages

use doc_harvest::config::SourceDefinition;
use doc_harvest::download::build_http_client;
use doc_harvest::extract::{ExtractError, HtmlLinkExtractor, LinkExtractor};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn listing_source(base_url: String, follow_pagination: bool) -> SourceDefinition {
    SourceDefinition {
        id: "laws".to_string(),
        name: "Federal laws".to_string(),
        category: "laws".to_string(),
        store: Some("fileSearchStores/laws".to_string()),
        store_env: None,
        kind: "listing-page".to_string(),
        base_url,
        link_selector: "a[href$='.pdf']".to_string(),
        follow_pagination,
        max_pages: 5,
    }
}

fn extractor() -> HtmlLinkExtractor {
    let client = build_http_client(&Default::default()).expect("client");
    HtmlLinkExtractor::with_defaults(client)
}

async fn mount_listing(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/laws/index.html"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"<html><body>
                <a href="/files/a.pdf">A</a>
                <a href="files/b.pdf">B</a>
                <a href="/about.html">About</a>
                <a rel="next" href="/laws/page2.html">Next</a>
            </body></html>"#,
        ))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/laws/page2.html"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"<html><body>
                <a href="/files/a.pdf">A again</a>
                <a href="/files/c.pdf">C</a>
                <a rel="next" href="/laws/index.html">Back to start</a>
            </body></html>"#,
        ))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_single_page_listing() {
    let server = MockServer::start().await;
    mount_listing(&server).await;
    let base = server.uri();

    let links = extractor()
        .extract(&listing_source(format!("{}/laws/index.html", base), false))
        .await
        .unwrap();

    assert_eq!(
        links,
        vec![
            format!("{}/files/a.pdf", base),
            format!("{}/laws/files/b.pdf", base),
        ]
    );
}

#[tokio::test]
async fn test_pagination_is_followed_without_loops() {
    let server = MockServer::start().await;
    mount_listing(&server).await;
    let base = server.uri();

    let links = extractor()
        .extract(&listing_source(format!("{}/laws/index.html", base), true))
        .await
        .unwrap();

    assert_eq!(
        links,
        vec![
            format!("{}/files/a.pdf", base),
            format!("{}/laws/files/b.pdf", base),
            format!("{}/files/c.pdf", base),
        ]
    );
}

#[tokio::test]
async fn test_http_error_is_reported() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let err = extractor()
        .extract(&listing_source(format!("{}/laws/index.html", server.uri()), false))
        .await
        .unwrap_err();

    assert!(matches!(err, ExtractError::Status { status: 503, .. }));
}

#[tokio::test]
async fn test_direct_file_kind() {
    let mut source = listing_source("https://example.com/report.pdf".to_string(), false);
    source.kind = "direct-file".to_string();

    let links = extractor().extract(&source).await.unwrap();
    assert_eq!(links, vec!["https://example.com/report.pdf".to_string()]);
}

#[tokio::test]
async fn test_unknown_kind() {
    let mut source = listing_source("https://example.com/".to_string(), false);
    source.kind = "sitemap".to_string();

    let err = extractor().extract(&source).await.unwrap_err();
    assert!(matches!(err, ExtractError::UnknownKind(kind) if kind == "sitemap"));
}
