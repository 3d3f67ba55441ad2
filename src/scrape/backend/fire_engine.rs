// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Headless render service backend
//!
//! The only backend able to return a screenshot. The same service is
//! exposed twice: once with its default playwright engine and once driven
//! over the Chrome DevTools protocol.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Map, Value};
use tracing::debug;

use super::{composed_timeout, pdf_result, provider_failure, Backend, ProviderPayload};
use crate::scrape::host_params::EffectiveParams;
use crate::scrape::pdf::{is_pdf_response, PdfExtractor};
use crate::scrape::types::{BackendError, BackendKind, BackendResult, FetchRequest};

/// Host parameter key holding extra options for this service
pub const FIRE_ENGINE_OPTIONS_KEY: &str = "fireEngineOptions";

pub struct FireEngineBackend {
    client: Client,
    base_url: Option<String>,
    kind: BackendKind,
    pdf: Arc<dyn PdfExtractor>,
}

impl FireEngineBackend {
    /// `kind` selects the engine: `FireEngine` or `FireEngineCdp`
    pub fn new(
        client: Client,
        base_url: Option<String>,
        kind: BackendKind,
        pdf: Arc<dyn PdfExtractor>,
    ) -> Self {
        Self {
            client,
            base_url: base_url.filter(|u| !u.is_empty()),
            kind,
            pdf,
        }
    }

    fn engine(&self) -> &'static str {
        match self.kind {
            BackendKind::FireEngineCdp => "chrome-cdp",
            _ => "playwright",
        }
    }

    /// Request body; host-level service options override the defaults,
    /// except that the CDP variant always keeps its engine
    fn body(&self, request: &FetchRequest, params: &EffectiveParams, wait_ms: u64) -> Value {
        let mut body = Map::new();
        body.insert("url".into(), json!(request.url));
        body.insert("wait".into(), json!(wait_ms));
        body.insert("screenshot".into(), json!(request.screenshot));
        body.insert("fullPageScreenshot".into(), json!(request.full_page_screenshot));
        body.insert("headers".into(), json!(request.headers));
        body.insert(
            "pageOptions".into(),
            json!({
                "scrollXPaths": request.scroll_xpaths,
                "parsePDF": request.parse_pdf,
            }),
        );
        body.insert("engine".into(), json!(self.engine()));

        if let Some(Value::Object(options)) = params.params.get(FIRE_ENGINE_OPTIONS_KEY) {
            for (key, value) in options {
                body.insert(key.clone(), value.clone());
            }
        }
        if self.kind == BackendKind::FireEngineCdp {
            body.insert("engine".into(), json!(self.engine()));
        }

        Value::Object(body)
    }
}

#[async_trait]
impl Backend for FireEngineBackend {
    fn kind(&self) -> BackendKind {
        self.kind
    }

    fn is_available(&self) -> bool {
        self.base_url.is_some()
    }

    async fn fetch(
        &self,
        request: &FetchRequest,
        params: &EffectiveParams,
    ) -> Result<BackendResult, BackendError> {
        let base_url = self
            .base_url
            .as_deref()
            .ok_or(BackendError::NotConfigured(self.kind))?;
        let wait_ms = params.effective_wait_ms(request.wait_ms);

        debug!("[{}] Scraping {} (wait {}ms)", self.kind, request.url, wait_ms);

        let response = self
            .client
            .post(format!("{}/scrape", base_url.trim_end_matches('/')))
            .timeout(composed_timeout(params.timeout_ms, wait_ms))
            .json(&self.body(request, params, wait_ms))
            .send()
            .await?;

        if is_pdf_response(response.headers()) {
            return Ok(pdf_result(self.pdf.as_ref(), &request.url, request.parse_pdf).await);
        }

        let status = response.status();
        let body = response.bytes().await?;
        if !status.is_success() {
            return Ok(provider_failure(self.kind, status, &body));
        }

        let payload: ProviderPayload =
            serde_json::from_slice(&body).map_err(|e| BackendError::Decode(e.to_string()))?;
        Ok(payload.into_result())
    }
}
