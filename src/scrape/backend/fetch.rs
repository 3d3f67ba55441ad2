// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Plain HTTP fetch backend; always available

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use super::{pdf_result, status_failure, Backend};
use crate::scrape::host_params::EffectiveParams;
use crate::scrape::pdf::{is_pdf_response, PdfExtractor};
use crate::scrape::types::{BackendError, BackendKind, BackendResult, FetchRequest};

pub struct FetchBackend {
    client: Client,
    timeout: Duration,
    pdf: Arc<dyn PdfExtractor>,
}

impl FetchBackend {
    pub fn new(client: Client, timeout_ms: u64, pdf: Arc<dyn PdfExtractor>) -> Self {
        Self {
            client,
            timeout: Duration::from_millis(timeout_ms),
            pdf,
        }
    }
}

#[async_trait]
impl Backend for FetchBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Fetch
    }

    fn is_available(&self) -> bool {
        true
    }

    async fn fetch(
        &self,
        request: &FetchRequest,
        _params: &EffectiveParams,
    ) -> Result<BackendResult, BackendError> {
        debug!("[fetch] Fetching {}", request.url);

        let mut builder = self.client.get(&request.url).timeout(self.timeout);
        for (name, value) in request.headers.iter().flatten() {
            builder = builder.header(name.as_str(), value.as_str());
        }
        let response = builder.send().await?;

        if is_pdf_response(response.headers()) {
            return Ok(pdf_result(self.pdf.as_ref(), &request.url, request.parse_pdf).await);
        }

        let status = response.status();
        if !status.is_success() {
            return Ok(status_failure(status));
        }

        let text = response.text().await?;
        Ok(BackendResult {
            raw_content: text,
            screenshot: None,
            status_code: Some(status.as_u16()),
            error_message: None,
        })
    }
}
