//! Integration tests for the harvester
//!
//! These tests use wiremock to stand in for both the listing sites and the
//! model endpoint, and drive full harvest runs end-to-end.

use listing_harvester::config::{resolve_credentials_with, Config};
use listing_harvester::extract::StructuredExtractor;
use listing_harvester::frontier::{Frontier, KeywordDiscovery, WorkItem};
use listing_harvester::harvest::{
    Fetcher, HarvestPhase, HttpTransport, ItemOutcome, Pipeline, RetryPolicy,
};
use listing_harvester::output::{CsvSink, MemorySink, SinkSet, SqliteSink};
use listing_harvester::record::{Category, Field, RECORD_HEADERS};
use listing_harvester::{ConfigError, Harvester};
use std::sync::Arc;
use tempfile::TempDir;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a test configuration for the given seed URLs, with the model off
fn create_test_config(seeds: Vec<String>) -> Config {
    let mut config = Config::default();
    config.harvester.workers = 3;
    config.harvester.checkpoint_every = 0;
    config.fetcher.max_attempts = 2;
    config.fetcher.attempt_timeout_secs = 5;
    config.fetcher.retry_delay_ms = 0;
    config.model.enabled = false;
    config.seeds.urls = seeds;
    config
}

fn listing_page(name: &str, extra: &str) -> String {
    format!(
        "<html><head><title>{}</title></head><body><h1>{}</h1>{}</body></html>",
        name, name, extra
    )
}

async fn mount_page(server: &MockServer, page_path: &str, body: String) {
    Mock::given(method("GET"))
        .and(path(page_path))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(server)
        .await;
}

fn build_harvester(config: &Config) -> Harvester {
    let credentials = resolve_credentials_with(config, |name| {
        (name == "OPENAI_API_KEY").then(|| "test-key".to_string())
    })
    .expect("credentials resolve");
    Harvester::from_config(config, &credentials).expect("harvester builds")
}

#[tokio::test]
async fn test_failing_item_does_not_abort_run() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    for i in [1, 2, 4, 5] {
        mount_page(
            &mock_server,
            &format!("/wellness/{}", i),
            listing_page(&format!("Studio {}", i), ""),
        )
        .await;
    }

    // Every attempt for item 3 fails
    Mock::given(method("GET"))
        .and(path("/wellness/3"))
        .respond_with(ResponseTemplate::new(500))
        .expect(2)
        .mount(&mock_server)
        .await;

    let seeds = (1..=5)
        .map(|i| format!("{}/wellness/{}", base_url, i))
        .collect();
    let config = create_test_config(seeds);
    let mut harvester = build_harvester(&config);
    let mut sink = MemorySink::new();

    let report = harvester.run(&mut sink).await.expect("run completes");

    assert_eq!(report.phase, HarvestPhase::Done);
    assert_eq!(report.items_processed, 5);
    assert_eq!(report.records, 4);
    assert_eq!(report.fetch_failures, 1);
    assert_eq!(sink.write_count(), 1);

    let mut names: Vec<String> = sink.last_write().into_iter().map(|r| r.name).collect();
    names.sort();
    assert_eq!(names, vec!["Studio 1", "Studio 2", "Studio 4", "Studio 5"]);
}

#[tokio::test]
async fn test_discovery_pushes_only_in_scope_links() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    let links = r#"
        <a href="/wellness/b">B</a>
        <a href="/wellness/c">C</a>
        <a href="/garage/d">D</a>
    "#;
    mount_page(&mock_server, "/wellness/a", listing_page("A", links)).await;

    let config = create_test_config(vec![format!("{}/wellness/a", base_url)]);
    let transport = HttpTransport::new(&config.fetcher, None).expect("client builds");
    let pipeline = Pipeline::new(
        Fetcher::new(Arc::new(transport), RetryPolicy::from_config(&config.fetcher)),
        StructuredExtractor::default(),
        None,
        Arc::new(KeywordDiscovery::new(["wellness"])),
    );

    let item_a = WorkItem::url(&format!("{}/wellness/a", base_url)).unwrap();
    let frontier = Frontier::with_seeds([item_a.clone()]);

    let claimed = frontier.claim_next().expect("seed is pending");
    assert_eq!(claimed, item_a);

    let ItemOutcome::Harvested { discovered, .. } = pipeline.run(claimed).await else {
        panic!("expected a harvested record");
    };
    for item in discovered {
        frontier.push(item);
    }

    // Re-pushing a visited item is a no-op
    assert!(!frontier.push(item_a.clone()));

    assert_eq!(
        frontier.pending_keys(),
        vec![
            format!("{}/wellness/b", base_url),
            format!("{}/wellness/c", base_url),
        ]
    );
    assert_eq!(frontier.visited_keys(), vec![item_a.key()]);
}

#[tokio::test]
async fn test_fallback_fills_category_only() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    mount_page(
        &mock_server,
        "/wellness/acme",
        listing_page("Acme Spa", "<p>Relax with us.</p>"),
    )
    .await;

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("authorization", "Bearer test-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "choices": [
                {"message": {"role": "assistant", "content": "{\"category\":\"Massage\"}"}}
            ]
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let mut config = create_test_config(vec![format!("{}/wellness/acme", base_url)]);
    config.model.enabled = true;
    config.model.endpoint = format!("{}/v1", base_url);

    let mut harvester = build_harvester(&config);
    let mut sink = MemorySink::new();

    let report = harvester.run(&mut sink).await.expect("run completes");

    assert_eq!(report.fallback.enriched, 1);
    assert_eq!(report.fallback.calls(), 1);

    let records = sink.last_write();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].name, "Acme Spa");
    assert_eq!(records[0].category, Field::Known(Category::Massage));
    assert_eq!(records[0].phone, Field::Unknown);
}

#[tokio::test]
async fn test_malformed_model_output_keeps_record() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    mount_page(
        &mock_server,
        "/wellness/acme",
        listing_page("Acme Spa", "<a href=\"tel:+38970123456\">Call</a>"),
    )
    .await;

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "choices": [
                {"message": {"role": "assistant", "content": "Sorry, I cannot help with that."}}
            ]
        })))
        .mount(&mock_server)
        .await;

    let mut config = create_test_config(vec![format!("{}/wellness/acme", base_url)]);
    config.model.enabled = true;
    config.model.endpoint = format!("{}/v1", base_url);

    let mut harvester = build_harvester(&config);
    let mut sink = MemorySink::new();

    let report = harvester.run(&mut sink).await.expect("run completes");

    assert_eq!(report.fallback.malformed, 1);
    let records = sink.last_write();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].phone, Field::Known("+38970123456".to_string()));
    assert_eq!(records[0].category, Field::Unknown);
}

#[tokio::test]
async fn test_duplicate_identities_are_fetched_once() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    let self_links = r#"
        <a href="/wellness/spa/">Home</a>
        <a href="/wellness/spa?utm_source=footer">Home again</a>
    "#;
    Mock::given(method("GET"))
        .and(path("/wellness/spa"))
        .respond_with(ResponseTemplate::new(200).set_body_string(listing_page("Spa", self_links)))
        .expect(1)
        .mount(&mock_server)
        .await;

    let config = create_test_config(vec![
        format!("{}/wellness/spa", base_url),
        format!("{}/wellness/spa/", base_url),
        format!("{}/wellness/spa#contact", base_url),
    ]);
    let mut harvester = build_harvester(&config);
    let mut sink = MemorySink::new();

    let report = harvester.run(&mut sink).await.expect("run completes");

    assert_eq!(report.items_processed, 1);
    assert_eq!(report.items_discovered, 0);
    assert_eq!(sink.last_write().len(), 1);
}

#[tokio::test]
async fn test_query_seed_uses_search_template() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    Mock::given(method("GET"))
        .and(path("/search"))
        .and(query_param("q", "Massage Skopje"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "local_results": [
                {"title": "Sense Studio", "phone": "+389 2 3123 456", "address": "Partizanska 12"}
            ]
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let mut config = create_test_config(vec![]);
    config.fetcher.search_url_template = Some(format!("{}/search?q={{query}}", base_url));
    config.seeds.locations = vec!["Skopje".to_string()];
    config.seeds.categories = vec!["Massage".to_string()];

    let mut harvester = build_harvester(&config);
    let mut sink = MemorySink::new();

    harvester.run(&mut sink).await.expect("run completes");

    let records = sink.last_write();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].name, "Sense Studio");
    assert_eq!(records[0].phone, Field::Known("+389 2 3123 456".to_string()));
    assert_eq!(records[0].location, Field::Known("Skopje".to_string()));
    assert_eq!(records[0].category, Field::Known(Category::Massage));
}

#[tokio::test]
async fn test_records_reach_csv_and_sqlite() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();
    let dir = TempDir::new().unwrap();

    mount_page(
        &mock_server,
        "/wellness/nails",
        listing_page("Nail Bar", "<a href=\"mailto:hello@nailbar.example\">Mail</a>"),
    )
    .await;

    let config = create_test_config(vec![format!("{}/wellness/nails", base_url)]);
    let csv_path = dir.path().join("out").join("businesses.csv");
    let db_path = dir.path().join("businesses.db");

    let mut sinks = SinkSet::new();
    sinks.push(Box::new(CsvSink::new(&csv_path)));
    sinks.push(Box::new(SqliteSink::new(&db_path).unwrap()));

    let mut harvester = build_harvester(&config);
    harvester.run(&mut sinks).await.expect("run completes");

    let mut reader = csv::Reader::from_path(&csv_path).unwrap();
    let headers: Vec<String> = reader.headers().unwrap().iter().map(String::from).collect();
    assert_eq!(headers, RECORD_HEADERS);

    let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
    assert_eq!(rows.len(), 1);
    assert_eq!(&rows[0][0], "Nail Bar");
    assert_eq!(&rows[0][6], "hello@nailbar.example");

    let db = SqliteSink::new(&db_path).unwrap();
    assert_eq!(db.count().unwrap(), 1);
}

#[tokio::test]
async fn test_unreachable_run_writes_empty_sink() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    let config = create_test_config(vec![
        format!("{}/wellness/gone", base_url),
        format!("{}/wellness/missing", base_url),
    ]);
    let mut harvester = build_harvester(&config);
    let mut sink = MemorySink::new();

    let report = harvester.run(&mut sink).await.expect("run completes");

    assert_eq!(report.fetch_failures, 2);
    assert_eq!(report.records, 0);
    assert_eq!(sink.write_count(), 1);
    assert!(sink.last_write().is_empty());
}

#[test]
fn test_missing_api_key_is_fatal() {
    let mut config = create_test_config(vec!["https://dir.example/wellness".to_string()]);
    config.model.enabled = true;

    let result = resolve_credentials_with(&config, |_| None);

    assert!(matches!(
        result,
        Err(ConfigError::MissingCredential(name)) if name == "OPENAI_API_KEY"
    ));
}
