//! End-to-end scrape-and-index runs against mock sites and a mock backend

use doc_harvest::backend::{GeminiBackend, WaitPolicy};
use doc_harvest::config::{parse_config, Config};
use doc_harvest::download::{build_http_client, Downloader};
use doc_harvest::extract::HtmlLinkExtractor;
use doc_harvest::pipeline::StoreAction;
use doc_harvest::storage::{open_schedule_store, ScheduleStore};
use doc_harvest::{FileValidator, IndexScheduler, Orchestrator};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{method, path, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Builds a config whose sources and backend all point at `server`
fn test_config(server: &MockServer, dir: &TempDir, state_backend: &str) -> Config {
    let base = server.uri();
    let toml = format!(
        r#"
[scraper]
min-files-to-index = 3
max-concurrent-sources = 2

[download]
data-root = "{data}"

[backend]
base-url = "{base}"
poll-interval-secs = 1

[state]
backend = "{state_backend}"
path = "{state}"

[[source]]
id = "laws"
name = "Federal laws"
category = "laws"
store = "fileSearchStores/legal"
base-url = "{base}/laws/index.html"
follow-pagination = true

[[source]]
id = "gazette"
name = "Official gazette"
category = "gazette"
store = "fileSearchStores/legal"
base-url = "{base}/gazette/index.html"

[[source]]
id = "circulars"
name = "Circulars"
category = "circulars"
store = "fileSearchStores/circulars"
base-url = "{base}/circulars/index.html"
"#,
        data = dir.path().join("data").display(),
        state = dir.path().join("meta/state").display(),
    );

    parse_config(&toml).expect("test config is valid")
}

async fn mount_sites(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/laws/index.html"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"<a href="/files/ley-1.pdf">1</a>
               <a href="/files/ley-2.pdf">2</a>
               <a href="/files/tabla.xlsx">xlsx</a>
               <a rel="next" href="/laws/page2.html">next</a>"#,
        ))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/laws/page2.html"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string(r#"<a href="/files/ley-3.pdf">3</a>"#),
        )
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/gazette/index.html"))
        .respond_with(ResponseTemplate::new(500))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/circulars/index.html"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(r#"<a href="/files/circ-1.pdf">c1</a>"#),
        )
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path_regex(r"^/files/.+\.pdf$"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"%PDF-1.4 test".to_vec()))
        .mount(server)
        .await;
}

async fn mount_backend(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path_regex(r"^/upload/v1beta/fileSearchStores/.+:uploadToFileSearchStore$"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({ "name": "operations/upload-1" })),
        )
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/v1beta/operations/upload-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(
            serde_json::json!({ "name": "operations/upload-1", "done": true }),
        ))
        .mount(server)
        .await;
}

fn orchestrator(config: &Config, schedule: Arc<dyn ScheduleStore>) -> Orchestrator {
    let client = build_http_client(&config.download).expect("client");
    let backend = GeminiBackend::new(client.clone(), &config.backend, "test-key").with_wait_policy(
        WaitPolicy {
            poll_interval: Duration::from_millis(10),
            max_wait: Duration::from_secs(2),
        },
    );

    Orchestrator::new(
        Arc::new(HtmlLinkExtractor::with_defaults(client.clone())),
        Downloader::from_config(client, &config.download),
        FileValidator::from_config(&config.filter),
        IndexScheduler::from_config(schedule, &config.scraper),
        Arc::new(backend),
    )
    .with_concurrency(config.scraper.max_concurrent_sources)
}

#[tokio::test]
async fn test_full_run_indexes_and_survives_failing_source() {
    let server = MockServer::start().await;
    mount_sites(&server).await;
    mount_backend(&server).await;

    let dir = TempDir::new().unwrap();
    let config = test_config(&server, &dir, "json");
    let schedule = open_schedule_store(&config.state).unwrap();

    let summary = orchestrator(&config, schedule.clone())
        .run(&config.sources)
        .await
        .unwrap();

    // Per-source outcomes keep configuration order
    let ids: Vec<&str> = summary.sources.iter().map(|s| s.source_id.as_str()).collect();
    assert_eq!(ids, vec!["laws", "gazette", "circulars"]);
    assert_eq!(summary.sources[0].links_found, 3);
    assert_eq!(summary.sources[0].downloaded.len(), 3);
    assert!(summary.sources[1].error.is_some());
    assert_eq!(summary.sources[2].downloaded.len(), 1);

    // Both stores index: "legal" has 3 files, "circulars" was never indexed
    assert_eq!(summary.stores.len(), 2);
    assert_eq!(summary.stores[0].store, "fileSearchStores/circulars");
    assert_eq!(summary.stores[0].action, StoreAction::Indexed { files: 1 });
    assert_eq!(summary.stores[1].store, "fileSearchStores/legal");
    assert_eq!(summary.stores[1].categories, vec!["gazette", "laws"]);
    assert_eq!(summary.stores[1].action, StoreAction::Indexed { files: 3 });

    let state = schedule.load().unwrap();
    assert!(state.contains_key("fileSearchStores/legal"));
    assert!(state.contains_key("fileSearchStores/circulars"));

    // Non-PDF links are never downloaded
    let laws_dir = dir.path().join("data/laws");
    assert_eq!(std::fs::read_dir(laws_dir).unwrap().count(), 3);
}

#[tokio::test]
async fn test_second_run_is_idempotent() {
    let server = MockServer::start().await;
    mount_sites(&server).await;
    mount_backend(&server).await;

    let dir = TempDir::new().unwrap();
    let config = test_config(&server, &dir, "sqlite");
    let schedule = open_schedule_store(&config.state).unwrap();

    let first = orchestrator(&config, schedule.clone())
        .run(&config.sources)
        .await
        .unwrap();
    assert_eq!(first.indexed_stores(), 2);

    let second = orchestrator(&config, schedule.clone())
        .run(&config.sources)
        .await
        .unwrap();

    assert_eq!(second.downloaded(), 0);
    assert_eq!(second.indexed_stores(), 0);
    assert!(second
        .stores
        .iter()
        .all(|store| store.action == StoreAction::Idle));
}
