// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Backend adapters
//!
//! Each backend fetches one URL through a different transport and returns
//! a uniform [`BackendResult`]. Adapters report transport problems as
//! [`BackendError`]; [`BackendSet::attempt`] turns those into empty
//! results and writes the audit record for every attempt.

pub mod fetch;
pub mod fire_engine;
pub mod playwright;
pub mod scraping_bee;

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::{debug, warn};

use super::audit::{AuditRecord, AuditSink};
use super::host_params::EffectiveParams;
use super::pdf::PdfExtractor;
use super::types::{BackendError, BackendKind, BackendResult, FetchRequest};
use crate::config::ScrapeConfig;

pub use fetch::FetchBackend;
pub use fire_engine::FireEngineBackend;
pub use playwright::PlaywrightBackend;
pub use scraping_bee::{ScrapingBeeBackend, ScrapingBeeMode};

/// A content-fetching strategy
#[async_trait]
pub trait Backend: Send + Sync {
    /// Identifier used for planning, logging and auditing
    fn kind(&self) -> BackendKind;

    /// Whether the endpoint or credential this backend needs is configured
    fn is_available(&self) -> bool;

    /// Fetch `request.url` once, bounded by the backend's timeout
    async fn fetch(
        &self,
        request: &FetchRequest,
        params: &EffectiveParams,
    ) -> Result<BackendResult, BackendError>;
}

/// The registered backends plus the audit sink every attempt reports to
pub struct BackendSet {
    backends: Vec<Arc<dyn Backend>>,
    audit: Arc<dyn AuditSink>,
}

impl BackendSet {
    pub fn new(backends: Vec<Arc<dyn Backend>>, audit: Arc<dyn AuditSink>) -> Self {
        Self { backends, audit }
    }

    /// Build every adapter from configuration
    pub fn from_config(
        config: &ScrapeConfig,
        client: Client,
        pdf: Arc<dyn PdfExtractor>,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        let backends: Vec<Arc<dyn Backend>> = vec![
            Arc::new(FireEngineBackend::new(
                client.clone(),
                config.fire_engine_url.clone(),
                BackendKind::FireEngine,
                pdf.clone(),
            )),
            Arc::new(FireEngineBackend::new(
                client.clone(),
                config.fire_engine_url.clone(),
                BackendKind::FireEngineCdp,
                pdf.clone(),
            )),
            Arc::new(ScrapingBeeBackend::new(
                client.clone(),
                config.scraping_bee_url.clone(),
                config.scraping_bee_api_key.clone(),
                ScrapingBeeMode::Fast,
                config.fast_timeout_ms,
                pdf.clone(),
            )),
            Arc::new(ScrapingBeeBackend::new(
                client.clone(),
                config.scraping_bee_url.clone(),
                config.scraping_bee_api_key.clone(),
                ScrapingBeeMode::FullLoad,
                config.fast_timeout_ms,
                pdf.clone(),
            )),
            Arc::new(PlaywrightBackend::new(
                client.clone(),
                config.playwright_url.clone(),
                pdf.clone(),
            )),
            Arc::new(FetchBackend::new(client, config.universal_timeout_ms, pdf)),
        ];

        for backend in &backends {
            if backend.is_available() {
                debug!("Scrape backend {} enabled", backend.kind());
            }
        }

        Self::new(backends, audit)
    }

    pub fn get(&self, kind: BackendKind) -> Option<&Arc<dyn Backend>> {
        self.backends.iter().find(|b| b.kind() == kind)
    }

    /// Available backends in availability-scan order
    pub fn available(&self) -> Vec<BackendKind> {
        BackendKind::ALL
            .iter()
            .copied()
            .filter(|kind| self.get(*kind).map_or(false, |b| b.is_available()))
            .collect()
    }

    /// Run one audited attempt; never fails
    pub async fn attempt(
        &self,
        kind: BackendKind,
        request: &FetchRequest,
        params: &EffectiveParams,
    ) -> BackendResult {
        let fetch = async {
            match self.get(kind) {
                Some(backend) if backend.is_available() => backend.fetch(request, params).await,
                _ => Err(BackendError::NotConfigured(kind)),
            }
        };
        self.audited(&request.url, kind, fetch).await
    }

    /// Times `attempt`, converts its error into an empty result and emits
    /// exactly one audit record before returning
    async fn audited<F>(&self, url: &str, kind: BackendKind, attempt: F) -> BackendResult
    where
        F: Future<Output = Result<BackendResult, BackendError>> + Send,
    {
        let started = Instant::now();
        let result = match attempt.await {
            Ok(result) => result,
            Err(e) => {
                warn!("[{}] {} for url: {}", kind, e, url);
                BackendResult::failed(e.to_string())
            }
        };

        let record = AuditRecord::from_result(url, kind, &result, started.elapsed().as_secs_f64());
        if let Err(e) = self.audit.record(&record).await {
            warn!("Failed to record {} attempt for {}: {}", kind, url, e);
        }
        result
    }
}

/// JSON payload returned by the render service and the browser microservice
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ProviderPayload {
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub screenshot: Option<String>,
    #[serde(default)]
    pub page_status_code: Option<u16>,
    #[serde(default)]
    pub page_error: Option<String>,
}

impl ProviderPayload {
    pub(crate) fn into_result(self) -> BackendResult {
        BackendResult {
            raw_content: self.content.unwrap_or_default(),
            screenshot: self.screenshot.filter(|s| !s.is_empty()),
            status_code: self.page_status_code,
            error_message: self.page_error,
        }
    }
}

/// Canonical reason phrase for a status, e.g. "Not Found"
pub(crate) fn status_reason(status: StatusCode) -> String {
    status
        .canonical_reason()
        .map(str::to_string)
        .unwrap_or_else(|| format!("HTTP {}", status.as_u16()))
}

/// Result for a non-2xx answer from a JSON-speaking provider; the body's
/// own page status and error win over the transport status when present
pub(crate) fn provider_failure(kind: BackendKind, status: StatusCode, body: &[u8]) -> BackendResult {
    let payload: ProviderPayload = serde_json::from_slice(body).unwrap_or_default();
    warn!("[{}] provider returned {}", kind, status.as_u16());
    BackendResult {
        raw_content: String::new(),
        screenshot: None,
        status_code: payload.page_status_code.or(Some(status.as_u16())),
        error_message: payload.page_error.or_else(|| Some(status_reason(status))),
    }
}

/// Result for a plain non-2xx page
pub(crate) fn status_failure(status: StatusCode) -> BackendResult {
    BackendResult {
        raw_content: String::new(),
        screenshot: None,
        status_code: Some(status.as_u16()),
        error_message: Some(status_reason(status)),
    }
}

/// Hand a PDF response over to the extractor
pub(crate) async fn pdf_result(pdf: &dyn PdfExtractor, url: &str, parse: bool) -> BackendResult {
    let extracted = pdf.extract(url, parse).await;
    BackendResult {
        raw_content: extracted.content,
        screenshot: None,
        status_code: extracted.status_code,
        error_message: extracted.page_error,
    }
}

/// Base timeout plus the resolved wait
pub(crate) fn composed_timeout(base_ms: u64, wait_ms: u64) -> Duration {
    Duration::from_millis(base_ms.saturating_add(wait_ms))
}
