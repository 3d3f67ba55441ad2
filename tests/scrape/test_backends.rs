// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use super::common::{MemoryAudit, StubPdf};
use fabstir_scraper::scrape::audit::JsonlAuditSink;
use fabstir_scraper::scrape::backend::{
    BackendSet, FetchBackend, FireEngineBackend, PlaywrightBackend, ScrapingBeeBackend,
    ScrapingBeeMode,
};
use fabstir_scraper::scrape::host_params::{
    EffectiveParams, HostOverrideEntry, HostOverrides, HostParamResolver, RequestDefaults,
};
use fabstir_scraper::scrape::pdf::{HttpPdfExtractor, PdfExtractor};
use fabstir_scraper::scrape::types::{BackendKind, FetchRequest, PageOptions};
use reqwest::Client;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn request(url: &str) -> FetchRequest {
    FetchRequest::from_options(url, &PageOptions::default())
}

fn params() -> EffectiveParams {
    EffectiveParams::defaults(&RequestDefaults::default())
}

fn no_pdf() -> Arc<StubPdf> {
    Arc::new(StubPdf::default())
}

#[tokio::test]
async fn test_fetch_returns_page_body() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/page"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<p>hello world</p>"))
        .expect(1)
        .mount(&server)
        .await;

    let audit = Arc::new(MemoryAudit::default());
    let set = BackendSet::new(
        vec![Arc::new(FetchBackend::new(Client::new(), 5_000, no_pdf()))],
        audit.clone(),
    );
    let url = format!("{}/page", server.uri());

    let result = set.attempt(BackendKind::Fetch, &request(&url), &params()).await;
    assert_eq!(result.raw_content, "<p>hello world</p>");
    assert_eq!(result.status_code, Some(200));
    assert!(result.error_message.is_none());

    let records = audit.records.lock().unwrap();
    assert_eq!(records.len(), 1);
    assert!(records[0].success);
    assert_eq!(records[0].url, url);
}

#[tokio::test]
async fn test_fetch_routes_pdf_to_extractor() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/report.pdf"))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(b"%PDF-1.4 binary".to_vec(), "application/pdf"),
        )
        .mount(&server)
        .await;

    let pdf = StubPdf::with_text("Quarterly report text".to_string());
    let backend = FetchBackend::new(Client::new(), 5_000, pdf.clone());
    let set = BackendSet::new(vec![Arc::new(backend)], Arc::new(MemoryAudit::default()));
    let url = format!("{}/report.pdf", server.uri());

    let result = set.attempt(BackendKind::Fetch, &request(&url), &params()).await;
    assert_eq!(result.raw_content, "Quarterly report text");
    assert_eq!(pdf.urls.lock().unwrap().as_slice(), &[url]);
}

#[tokio::test]
async fn test_playwright_routes_pdf_to_extractor() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/scrape"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(b"%PDF".to_vec(), "application/pdf"))
        .mount(&server)
        .await;

    let pdf = StubPdf::with_text("PDF body".to_string());
    let backend = PlaywrightBackend::new(
        Client::new(),
        Some(format!("{}/scrape", server.uri())),
        pdf.clone(),
    );
    let set = BackendSet::new(vec![Arc::new(backend)], Arc::new(MemoryAudit::default()));

    let result = set
        .attempt(BackendKind::Playwright, &request("https://example.com/doc"), &params())
        .await;
    assert_eq!(result.raw_content, "PDF body");
    assert_eq!(
        pdf.urls.lock().unwrap().as_slice(),
        &["https://example.com/doc".to_string()]
    );
}

#[tokio::test]
async fn test_fetch_non_success_carries_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404).set_body_string("missing"))
        .mount(&server)
        .await;

    let set = BackendSet::new(
        vec![Arc::new(FetchBackend::new(Client::new(), 5_000, no_pdf()))],
        Arc::new(MemoryAudit::default()),
    );

    let result = set
        .attempt(BackendKind::Fetch, &request(&format!("{}/gone", server.uri())), &params())
        .await;
    assert!(result.raw_content.is_empty());
    assert_eq!(result.status_code, Some(404));
    assert_eq!(result.error_message.as_deref(), Some("Not Found"));
}

#[tokio::test]
async fn test_timeout_becomes_empty_result() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("too late")
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&server)
        .await;

    let audit = Arc::new(MemoryAudit::default());
    let set = BackendSet::new(
        vec![Arc::new(FetchBackend::new(Client::new(), 100, no_pdf()))],
        audit.clone(),
    );

    let result = set
        .attempt(BackendKind::Fetch, &request(&format!("{}/slow", server.uri())), &params())
        .await;
    assert!(result.raw_content.is_empty());
    assert_eq!(result.status_code, None);
    assert_eq!(result.error_message.as_deref(), Some("Request timed out"));

    let records = audit.records.lock().unwrap();
    assert_eq!(records.len(), 1);
    assert!(!records[0].success);
}

#[tokio::test]
async fn test_playwright_decodes_provider_payload() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/scrape"))
        .and(body_partial_json(json!({
            "url": "https://example.com",
            "wait_after_load": 1500,
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "content": "<p>rendered</p>",
            "pageStatusCode": 200,
        })))
        .expect(1)
        .mount(&server)
        .await;

    let backend = PlaywrightBackend::new(
        Client::new(),
        Some(format!("{}/scrape", server.uri())),
        no_pdf(),
    );
    let set = BackendSet::new(vec![Arc::new(backend)], Arc::new(MemoryAudit::default()));
    let mut req = request("https://example.com");
    req.wait_ms = 1500;

    let result = set.attempt(BackendKind::Playwright, &req, &params()).await;
    assert_eq!(result.raw_content, "<p>rendered</p>");
    assert_eq!(result.status_code, Some(200));
}

#[tokio::test]
async fn test_playwright_decode_error_is_captured() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>not json</html>"))
        .mount(&server)
        .await;

    let backend = PlaywrightBackend::new(Client::new(), Some(server.uri()), no_pdf());
    let set = BackendSet::new(vec![Arc::new(backend)], Arc::new(MemoryAudit::default()));

    let result = set
        .attempt(BackendKind::Playwright, &request("https://example.com"), &params())
        .await;
    assert!(result.raw_content.is_empty());
    assert!(result
        .error_message
        .unwrap()
        .starts_with("Failed to decode response"));
}

#[tokio::test]
async fn test_fire_engine_sends_engine_and_reads_payload() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/scrape"))
        .and(body_partial_json(json!({"engine": "chrome-cdp", "screenshot": true})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "content": "<p>cdp</p>",
            "screenshot": "https://cdn.example.com/s.png",
            "pageStatusCode": 200,
        })))
        .expect(1)
        .mount(&server)
        .await;

    let backend = FireEngineBackend::new(
        Client::new(),
        Some(server.uri()),
        BackendKind::FireEngineCdp,
        no_pdf(),
    );
    let set = BackendSet::new(vec![Arc::new(backend)], Arc::new(MemoryAudit::default()));
    let mut req = request("https://example.com");
    req.screenshot = true;

    let result = set.attempt(BackendKind::FireEngineCdp, &req, &params()).await;
    assert_eq!(result.raw_content, "<p>cdp</p>");
    assert_eq!(result.screenshot.as_deref(), Some("https://cdn.example.com/s.png"));
}

#[tokio::test]
async fn test_fire_engine_provider_error_is_not_thrown() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({
            "pageStatusCode": 403,
            "pageError": "Blocked by site",
        })))
        .mount(&server)
        .await;

    let backend = FireEngineBackend::new(
        Client::new(),
        Some(server.uri()),
        BackendKind::FireEngine,
        no_pdf(),
    );
    let set = BackendSet::new(vec![Arc::new(backend)], Arc::new(MemoryAudit::default()));

    let result = set
        .attempt(BackendKind::FireEngine, &request("https://example.com"), &params())
        .await;
    assert!(result.raw_content.is_empty());
    assert_eq!(result.status_code, Some(403));
    assert_eq!(result.error_message.as_deref(), Some("Blocked by site"));
}

fn slow_host_resolver() -> HostParamResolver {
    let overrides = HostOverrides::empty().with_entry(
        "slow.example.com",
        HostOverrideEntry {
            timeout_ms: Some(5_000),
            ..Default::default()
        },
    );
    HostParamResolver::new(overrides, RequestDefaults::new(300))
}

async fn delayed_render_service() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/scrape"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"content": "<p>slow render</p>", "pageStatusCode": 200}))
                .set_delay(Duration::from_millis(1_000)),
        )
        .mount(&server)
        .await;
    server
}

#[tokio::test]
async fn test_fire_engine_honors_host_timeout() {
    let server = delayed_render_service().await;
    let backend = FireEngineBackend::new(
        Client::new(),
        Some(server.uri()),
        BackendKind::FireEngine,
        no_pdf(),
    );
    let set = BackendSet::new(vec![Arc::new(backend)], Arc::new(MemoryAudit::default()));
    let resolver = slow_host_resolver();

    let url = "https://slow.example.com/page";
    let result = set
        .attempt(BackendKind::FireEngine, &request(url), &resolver.resolve(url))
        .await;
    assert_eq!(result.raw_content, "<p>slow render</p>");
    assert!(result.error_message.is_none());

    let url = "https://other.example.com/page";
    let result = set
        .attempt(BackendKind::FireEngine, &request(url), &resolver.resolve(url))
        .await;
    assert!(result.raw_content.is_empty());
    assert_eq!(result.error_message.as_deref(), Some("Request timed out"));
}

#[tokio::test]
async fn test_playwright_honors_host_timeout() {
    let server = delayed_render_service().await;
    let backend = PlaywrightBackend::new(
        Client::new(),
        Some(format!("{}/scrape", server.uri())),
        no_pdf(),
    );
    let set = BackendSet::new(vec![Arc::new(backend)], Arc::new(MemoryAudit::default()));
    let resolver = slow_host_resolver();

    let url = "https://slow.example.com/page";
    let result = set
        .attempt(BackendKind::Playwright, &request(url), &resolver.resolve(url))
        .await;
    assert_eq!(result.raw_content, "<p>slow render</p>");

    let url = "https://other.example.com/page";
    let result = set
        .attempt(BackendKind::Playwright, &request(url), &resolver.resolve(url))
        .await;
    assert!(result.raw_content.is_empty());
    assert_eq!(result.error_message.as_deref(), Some("Request timed out"));
}

#[tokio::test]
async fn test_fire_engine_pdf_response_goes_through_extractor() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/scrape"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(b"%PDF-1.7".to_vec(), "application/pdf"))
        .expect(1)
        .mount(&server)
        .await;

    let pdf = StubPdf::with_text("Fire engine PDF text".to_string());
    let backend = FireEngineBackend::new(
        Client::new(),
        Some(server.uri()),
        BackendKind::FireEngine,
        pdf.clone(),
    );
    let set = BackendSet::new(vec![Arc::new(backend)], Arc::new(MemoryAudit::default()));

    let result = set
        .attempt(BackendKind::FireEngine, &request("https://example.com/paper.pdf"), &params())
        .await;
    assert_eq!(result.raw_content, "Fire engine PDF text");
    assert!(result.screenshot.is_none());
    assert_eq!(
        pdf.urls.lock().unwrap().as_slice(),
        &["https://example.com/paper.pdf".to_string()]
    );
}

#[tokio::test]
async fn test_scraping_bee_pdf_response_goes_through_extractor() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(b"%PDF-1.7".to_vec(), "application/pdf"))
        .expect(1)
        .mount(&server)
        .await;

    let pdf = StubPdf::with_text("Proxied PDF text".to_string());
    let backend = ScrapingBeeBackend::new(
        Client::new(),
        format!("{}/api/v1/", server.uri()),
        Some("secret".to_string()),
        ScrapingBeeMode::Fast,
        7_000,
        pdf.clone(),
    );
    let set = BackendSet::new(vec![Arc::new(backend)], Arc::new(MemoryAudit::default()));

    let result = set
        .attempt(BackendKind::ScrapingBee, &request("https://example.com/report.pdf"), &params())
        .await;
    assert_eq!(result.raw_content, "Proxied PDF text");
    assert_eq!(
        pdf.urls.lock().unwrap().as_slice(),
        &["https://example.com/report.pdf".to_string()]
    );
}

#[tokio::test]
async fn test_scraping_bee_query_and_forwarded_headers() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/"))
        .and(query_param("api_key", "secret"))
        .and(query_param("url", "https://example.com/a"))
        .and(query_param("wait_browser", "networkidle2"))
        .and(query_param("transparent_status_code", "True"))
        .and(query_param("forward_headers", "True"))
        .and(header("Spb-X-Test", "1"))
        .and(header("Spb-ScrapingService-Request", "TRUE"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<p>proxied</p>"))
        .expect(1)
        .mount(&server)
        .await;

    let backend = ScrapingBeeBackend::new(
        Client::new(),
        format!("{}/api/v1/", server.uri()),
        Some("secret".to_string()),
        ScrapingBeeMode::FullLoad,
        7_000,
        no_pdf(),
    );
    let set = BackendSet::new(vec![Arc::new(backend)], Arc::new(MemoryAudit::default()));
    let options = PageOptions {
        headers: Some([("X-Test".to_string(), "1".to_string())].into_iter().collect()),
        ..Default::default()
    };
    let req = FetchRequest::from_options("https://example.com/a", &options);

    let result = set.attempt(BackendKind::ScrapingBeeLoad, &req, &params()).await;
    assert_eq!(result.raw_content, "<p>proxied</p>");
    assert_eq!(result.status_code, Some(200));
}

#[tokio::test]
async fn test_pdf_extractor_reports_download_failure() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let extractor = HttpPdfExtractor::new(Client::new(), 5_000);
    let content = extractor
        .extract(&format!("{}/missing.pdf", server.uri()), true)
        .await;
    assert!(content.content.is_empty());
    assert_eq!(content.status_code, Some(404));
    assert_eq!(content.page_error.as_deref(), Some("Not Found"));
}

#[tokio::test]
async fn test_pdf_extractor_skips_parsing_on_request() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(b"raw pdf body".to_vec(), "application/pdf"))
        .mount(&server)
        .await;

    let extractor = HttpPdfExtractor::new(Client::new(), 5_000);
    let content = extractor
        .extract(&format!("{}/doc.pdf", server.uri()), false)
        .await;
    assert_eq!(content.content, "raw pdf body");
    assert_eq!(content.status_code, Some(200));
    assert!(content.page_error.is_none());
}

#[tokio::test]
async fn test_jsonl_audit_sink_appends_one_line_per_attempt() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<p>logged</p>"))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let log_path = dir.path().join("audit").join("attempts.jsonl");
    let sink = Arc::new(JsonlAuditSink::open(&log_path).await.unwrap());
    let set = BackendSet::new(
        vec![Arc::new(FetchBackend::new(Client::new(), 5_000, no_pdf()))],
        sink,
    );
    let url = format!("{}/page", server.uri());

    set.attempt(BackendKind::Fetch, &request(&url), &params()).await;
    set.attempt(BackendKind::Fetch, &request(&url), &params()).await;

    let content = tokio::fs::read_to_string(&log_path).await.unwrap();
    let lines: Vec<serde_json::Value> = content
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0]["backend"], "fetch");
    assert_eq!(lines[0]["success"], true);
    assert_eq!(lines[1]["html"], "<p>logged</p>");
}
