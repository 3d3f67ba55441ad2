// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Headless browser microservice backend

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use tracing::{debug, error};

use super::{composed_timeout, pdf_result, provider_failure, Backend, ProviderPayload};
use crate::scrape::host_params::EffectiveParams;
use crate::scrape::pdf::{is_pdf_response, PdfExtractor};
use crate::scrape::types::{BackendError, BackendKind, BackendResult, FetchRequest};

#[derive(Debug, Serialize)]
struct PlaywrightRequest<'a> {
    url: &'a str,
    wait_after_load: u64,
    timeout: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    headers: Option<&'a BTreeMap<String, String>>,
}

pub struct PlaywrightBackend {
    client: Client,
    endpoint: Option<String>,
    pdf: Arc<dyn PdfExtractor>,
}

impl PlaywrightBackend {
    pub fn new(
        client: Client,
        endpoint: Option<String>,
        pdf: Arc<dyn PdfExtractor>,
    ) -> Self {
        Self {
            client,
            endpoint: endpoint.filter(|u| !u.is_empty()),
            pdf,
        }
    }
}

#[async_trait]
impl Backend for PlaywrightBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Playwright
    }

    fn is_available(&self) -> bool {
        self.endpoint.is_some()
    }

    async fn fetch(
        &self,
        request: &FetchRequest,
        params: &EffectiveParams,
    ) -> Result<BackendResult, BackendError> {
        let endpoint = self
            .endpoint
            .as_deref()
            .ok_or(BackendError::NotConfigured(BackendKind::Playwright))?;
        let wait_ms = params.effective_wait_ms(request.wait_ms);
        let timeout = composed_timeout(params.timeout_ms, wait_ms);

        debug!("[playwright] Scraping {} (wait {}ms)", request.url, wait_ms);

        let response = self
            .client
            .post(endpoint)
            .timeout(timeout)
            .json(&PlaywrightRequest {
                url: &request.url,
                wait_after_load: wait_ms,
                timeout: timeout.as_millis() as u64,
                headers: request.headers.as_ref(),
            })
            .send()
            .await?;

        if is_pdf_response(response.headers()) {
            return Ok(pdf_result(self.pdf.as_ref(), &request.url, request.parse_pdf).await);
        }

        let status = response.status();
        let body = response.bytes().await?;
        if !status.is_success() {
            return Ok(provider_failure(BackendKind::Playwright, status, &body));
        }

        let payload: ProviderPayload = serde_json::from_slice(&body).map_err(|e| {
            error!(
                "[playwright] Error parsing JSON response for url: {} -> {}",
                request.url, e
            );
            BackendError::Decode(e.to_string())
        })?;
        Ok(payload.into_result())
    }
}
