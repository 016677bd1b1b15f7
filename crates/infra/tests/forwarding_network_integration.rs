//! Full forwarding passes over HTTP against wiremock source and sink servers.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use auditbridge_core::{ForwardingPipeline, HealthChecker, SystemClock};
use auditbridge_domain::{AppConfig, ForwardingConfig, SinkConfig, SourceConfig, TimeWindow};
use auditbridge_infra::{CrusoeAuditClient, HecClient, HecSettings, HttpClient, StaticTokenProvider};
use chrono::{TimeZone, Utc};
use serde_json::{json, Value};
use wiremock::matchers::{method, path, query_param, query_param_is_missing};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

fn app_config(source: &MockServer, sink: &MockServer) -> AppConfig {
    AppConfig {
        source: SourceConfig {
            api_token: "api-token".into(),
            base_url: format!("{}/v1alpha5", source.uri()),
            organization_id: "org-1".into(),
            page_size: 2,
            max_pages: None,
        },
        sink: SinkConfig {
            hec_token: "hec-token".into(),
            hec_url: format!("{}/services/collector/event", sink.uri()),
            ..SinkConfig::default()
        },
        forwarding: ForwardingConfig {
            batch_size: 2,
            request_timeout_secs: 2,
            max_retries: 3,
            base_backoff_ms: 10,
            max_backoff_ms: 50,
            ..ForwardingConfig::default()
        },
    }
}

fn adapters(config: &AppConfig) -> (Arc<CrusoeAuditClient>, Arc<HecClient>) {
    let http = HttpClient::builder().timeout(config.forwarding.request_timeout()).build().unwrap();
    let source = CrusoeAuditClient::from_config(
        http.clone(),
        &config.source,
        Arc::new(StaticTokenProvider::bearer(config.source.api_token.clone())),
    )
    .unwrap();
    let sink = HecClient::new(
        http,
        &config.sink.hec_url,
        HecSettings::from_config(&config.sink),
        Arc::new(StaticTokenProvider::splunk(config.sink.hec_token.clone())),
        Arc::new(SystemClock),
    )
    .unwrap();
    (Arc::new(source), Arc::new(sink))
}

fn record(actor: &str) -> Value {
    json!({
        "start_time": "2024-05-01T10:15:00Z",
        "actor_id": actor,
        "action": "CREATE",
        "target_type": "vm",
        "organization_id": "org-1",
        "target_id": format!("vm-{actor}")
    })
}

fn window() -> TimeWindow {
    TimeWindow::new(
        Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap(),
        Utc.with_ymd_and_hms(2024, 5, 1, 11, 0, 0).unwrap(),
    )
    .unwrap()
}

async fn mount_pages(source: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/v1alpha5/organizations/org-1/audit-logs"))
        .and(query_param_is_missing("next_token"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"items": [record("a"), record("b")], "next_token": "p2"})),
        )
        .mount(source)
        .await;

    // Page 2 fails with a 502 once before succeeding.
    let calls = Arc::new(AtomicUsize::new(0));
    Mock::given(method("GET"))
        .and(query_param("next_token", "p2"))
        .respond_with(move |_req: &Request| -> ResponseTemplate {
            if calls.fetch_add(1, Ordering::SeqCst) == 0 {
                ResponseTemplate::new(502)
            } else {
                ResponseTemplate::new(200).set_body_json(json!({"items": [record("c")], "next_token": null}))
            }
        })
        .expect(2)
        .mount(source)
        .await;
}

#[tokio::test]
async fn forwards_all_pages_in_batches() {
    let source_server = MockServer::start().await;
    let sink_server = MockServer::start().await;
    mount_pages(&source_server).await;
    Mock::given(method("POST"))
        .and(path("/services/collector/event"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"text": "Success", "code": 0})))
        .expect(2)
        .mount(&sink_server)
        .await;

    let config = app_config(&source_server, &sink_server);
    let (source, sink) = adapters(&config);
    let pipeline = ForwardingPipeline::from_config(source, sink, &config);

    let result = pipeline.run(window(), false).await.unwrap();

    assert!(result.is_success());
    assert_eq!(result.records_fetched, 3);
    assert_eq!(result.batches_attempted, 2);
    assert_eq!(result.records_delivered, 3);

    let posted = sink_server.received_requests().await.unwrap();
    let events: Vec<Value> = posted
        .iter()
        .flat_map(|req| String::from_utf8(req.body.clone()).unwrap().lines().map(String::from).collect::<Vec<_>>())
        .map(|line| serde_json::from_str(&line).unwrap())
        .collect();
    assert_eq!(events.len(), 3);
    assert!(events.iter().all(|e| e["fields"]["event_id"].as_str().map(str::len) == Some(64)));
    assert_eq!(events[2]["event"]["target_id"], "vm-c");
    assert_eq!(events[0]["sourcetype"], "crusoe:audit");
}

#[tokio::test]
async fn malformed_items_are_skipped_without_failing_the_page() {
    let source_server = MockServer::start().await;
    let sink_server = MockServer::start().await;
    let mut structured_actor = record("b");
    structured_actor["actor_id"] = json!({"id": "u2", "type": "user"});
    let mut numeric_actor = record("d");
    numeric_actor["actor_id"] = json!(1234);
    Mock::given(method("GET"))
        .and(path("/v1alpha5/organizations/org-1/audit-logs"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [record("a"), structured_actor, 42, numeric_actor],
            "next_token": null
        })))
        .mount(&source_server)
        .await;
    Mock::given(method("POST"))
        .and(path("/services/collector/event"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"text": "Success", "code": 0})))
        .expect(1)
        .mount(&sink_server)
        .await;

    let config = app_config(&source_server, &sink_server);
    let (source, sink) = adapters(&config);
    let result = ForwardingPipeline::from_config(source, sink, &config).run(window(), false).await.unwrap();

    assert!(result.is_success());
    assert_eq!(result.fetch_failure, None);
    assert_eq!(result.records_fetched, 4);
    assert_eq!(result.records_skipped, 2);
    assert_eq!(result.records_delivered, 2);

    let posted = sink_server.received_requests().await.unwrap();
    let body = String::from_utf8(posted[0].body.clone()).unwrap();
    let events: Vec<Value> = body.lines().map(|line| serde_json::from_str(line).unwrap()).collect();
    assert_eq!(events[0]["event"]["actor_id"], "a");
    assert_eq!(events[1]["event"]["actor_id"], json!(1234));
}

#[tokio::test]
async fn page_cap_reports_truncated_window() {
    let source_server = MockServer::start().await;
    let sink_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1alpha5/organizations/org-1/audit-logs"))
        .and(query_param_is_missing("next_token"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"items": [record("a"), record("b")], "next_token": "p2"})),
        )
        .expect(1)
        .mount(&source_server)
        .await;
    Mock::given(method("POST")).respond_with(ResponseTemplate::new(200)).mount(&sink_server).await;

    let mut config = app_config(&source_server, &sink_server);
    config.source.max_pages = Some(1);
    let (source, sink) = adapters(&config);
    let result = ForwardingPipeline::from_config(source, sink, &config).run(window(), false).await.unwrap();

    assert!(result.truncated);
    assert_eq!(result.records_delivered, 2);
    let json = serde_json::to_value(&result).unwrap();
    assert_eq!(json["truncated"], json!(true));
}

#[tokio::test]
async fn rejected_batch_is_isolated() {
    let source_server = MockServer::start().await;
    let sink_server = MockServer::start().await;
    mount_pages(&source_server).await;

    let posts = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&posts);
    Mock::given(method("POST"))
        .respond_with(move |_req: &Request| -> ResponseTemplate {
            if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                ResponseTemplate::new(400).set_body_json(json!({"text": "Invalid data format", "code": 6}))
            } else {
                ResponseTemplate::new(200)
            }
        })
        .mount(&sink_server)
        .await;

    let config = app_config(&source_server, &sink_server);
    let (source, sink) = adapters(&config);
    let result = ForwardingPipeline::from_config(source, sink, &config).run(window(), false).await.unwrap();

    // The 400 is not retried and the second batch is still sent.
    assert_eq!(posts.load(Ordering::SeqCst), 2);
    assert_eq!(result.batches_failed, 1);
    assert_eq!(result.batches_succeeded, 1);
    assert_eq!(result.records_delivered, 1);
    assert!(!result.is_success());
}

#[tokio::test]
async fn health_check_reaches_both_services() {
    let source_server = MockServer::start().await;
    let sink_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(query_param("limit", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"items": []})))
        .expect(1)
        .mount(&source_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/services/collector/health"))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&sink_server)
        .await;

    let config = app_config(&source_server, &sink_server);
    let (source, sink) = adapters(&config);
    let report = HealthChecker::new(source, sink, Arc::new(SystemClock), "org-1").check().await;

    assert!(report.source.healthy);
    assert!(!report.sink.healthy);
    assert!(!report.is_healthy());
}
