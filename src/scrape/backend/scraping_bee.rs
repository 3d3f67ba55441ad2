// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Rendering proxy backend
//!
//! Two modes share one adapter: `Fast` waits for DOM content and may use
//! a short timeout, `FullLoad` waits for the network to go idle.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use tracing::debug;

use super::{composed_timeout, pdf_result, status_failure, Backend};
use crate::scrape::host_params::EffectiveParams;
use crate::scrape::pdf::{is_pdf_response, PdfExtractor};
use crate::scrape::types::{BackendError, BackendKind, BackendResult, FetchRequest};

/// Default proxy API endpoint
pub const SCRAPING_BEE_API_URL: &str = "https://app.scrapingbee.com/api/v1/";

/// Proxy wait strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrapingBeeMode {
    Fast,
    FullLoad,
}

impl ScrapingBeeMode {
    fn kind(&self) -> BackendKind {
        match self {
            ScrapingBeeMode::Fast => BackendKind::ScrapingBee,
            ScrapingBeeMode::FullLoad => BackendKind::ScrapingBeeLoad,
        }
    }

    /// Wait condition used unless the host override names one
    fn default_wait_browser(&self) -> &'static str {
        match self {
            ScrapingBeeMode::Fast => "domcontentloaded",
            ScrapingBeeMode::FullLoad => "networkidle2",
        }
    }
}

pub struct ScrapingBeeBackend {
    client: Client,
    api_url: String,
    api_key: Option<String>,
    mode: ScrapingBeeMode,
    short_timeout_ms: u64,
    pdf: Arc<dyn PdfExtractor>,
}

impl ScrapingBeeBackend {
    pub fn new(
        client: Client,
        api_url: String,
        api_key: Option<String>,
        mode: ScrapingBeeMode,
        short_timeout_ms: u64,
        pdf: Arc<dyn PdfExtractor>,
    ) -> Self {
        Self {
            client,
            api_url,
            api_key: api_key.filter(|k| !k.is_empty()),
            mode,
            short_timeout_ms,
            pdf,
        }
    }

    /// Provider-side timeout; the fast mode drops to the short budget when
    /// the caller disabled fallback
    fn provider_timeout_ms(&self, request: &FetchRequest, params: &EffectiveParams) -> u64 {
        match self.mode {
            ScrapingBeeMode::Fast if !request.fallback => self.short_timeout_ms,
            _ => params.timeout_ms,
        }
    }

    fn query(
        &self,
        api_key: &str,
        request: &FetchRequest,
        params: &EffectiveParams,
        timeout_ms: u64,
        wait_ms: u64,
    ) -> Vec<(String, String)> {
        let mut query = vec![
            ("api_key".to_string(), api_key.to_string()),
            ("url".to_string(), request.url.clone()),
            ("timeout".to_string(), timeout_ms.to_string()),
            (
                "wait_browser".to_string(),
                params.wait_browser_or(self.mode.default_wait_browser()).to_string(),
            ),
            ("transparent_status_code".to_string(), "True".to_string()),
        ];
        if wait_ms > 0 {
            query.push(("wait".to_string(), wait_ms.to_string()));
        }
        if !params.headers.is_empty() || request.headers.is_some() {
            query.push(("forward_headers".to_string(), "True".to_string()));
        }
        for (key, value) in &params.params {
            let value = match value {
                Value::String(s) => s.clone(),
                Value::Object(_) => continue,
                other => other.to_string(),
            };
            query.push((key.clone(), value));
        }
        query
    }
}

#[async_trait]
impl Backend for ScrapingBeeBackend {
    fn kind(&self) -> BackendKind {
        self.mode.kind()
    }

    fn is_available(&self) -> bool {
        self.api_key.is_some()
    }

    async fn fetch(
        &self,
        request: &FetchRequest,
        params: &EffectiveParams,
    ) -> Result<BackendResult, BackendError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(BackendError::NotConfigured(self.kind()))?;
        let wait_ms = params.effective_wait_ms(request.wait_ms);
        let timeout_ms = self.provider_timeout_ms(request, params);

        debug!(
            "[{}] Scraping {} (timeout {}ms, wait {}ms)",
            self.kind(),
            request.url,
            timeout_ms,
            wait_ms
        );

        // Headers are forwarded to the target with the proxy's Spb- prefix
        let mut builder = self
            .client
            .get(&self.api_url)
            .timeout(composed_timeout(timeout_ms, wait_ms))
            .query(&self.query(api_key, request, params, timeout_ms, wait_ms));
        let forwarded = params.headers.iter().chain(request.headers.iter().flatten());
        for (name, value) in forwarded {
            builder = builder.header(format!("Spb-{}", name), value);
        }

        let response = builder.send().await?;

        if is_pdf_response(response.headers()) {
            return Ok(pdf_result(self.pdf.as_ref(), &request.url, request.parse_pdf).await);
        }

        let status = response.status();
        if !status.is_success() {
            return Ok(status_failure(status));
        }

        let body = response.bytes().await?;
        Ok(BackendResult {
            raw_content: String::from_utf8_lossy(&body).into_owned(),
            screenshot: None,
            status_code: Some(status.as_u16()),
            error_message: None,
        })
    }
}
