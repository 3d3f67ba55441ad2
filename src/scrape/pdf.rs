// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! PDF download and text extraction

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, CONTENT_TYPE};
use reqwest::Client;
use thiserror::Error;
use tracing::{debug, warn};

use super::types::BackendError;

/// Errors extracting text from PDF bytes
#[derive(Debug, Error)]
pub enum PdfError {
    #[error("PDF text extraction failed: {0}")]
    Extract(String),

    #[error("PDF extraction task failed: {0}")]
    Task(String),
}

/// Output of a PDF fetch
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PdfContent {
    pub content: String,
    pub status_code: Option<u16>,
    pub page_error: Option<String>,
}

/// Fetches a PDF and turns it into text
#[async_trait]
pub trait PdfExtractor: Send + Sync {
    /// Fetch `url`; with `parse` false the body is returned as decoded text
    async fn extract(&self, url: &str, parse: bool) -> PdfContent;
}

/// True when the response headers announce a PDF body
pub fn is_pdf_response(headers: &HeaderMap) -> bool {
    headers
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.to_ascii_lowercase().contains("application/pdf"))
        .unwrap_or(false)
}

/// Extract the text layer of a PDF held in memory
pub async fn pdf_bytes_to_text(bytes: Vec<u8>) -> Result<String, PdfError> {
    tokio::task::spawn_blocking(move || {
        pdf_extract::extract_text_from_mem(&bytes).map_err(|e| PdfError::Extract(e.to_string()))
    })
    .await
    .map_err(|e| PdfError::Task(e.to_string()))?
}

/// Downloads PDFs over HTTP and extracts their text with `pdf-extract`
#[derive(Clone)]
pub struct HttpPdfExtractor {
    client: Client,
    timeout: Duration,
}

impl HttpPdfExtractor {
    pub fn new(client: Client, timeout_ms: u64) -> Self {
        Self {
            client,
            timeout: Duration::from_millis(timeout_ms),
        }
    }

    async fn download(&self, url: &str) -> Result<(u16, Vec<u8>), BackendError> {
        let response = self
            .client
            .get(url)
            .timeout(self.timeout)
            .send()
            .await?;
        let status = response.status().as_u16();
        let bytes = response.bytes().await?;
        Ok((status, bytes.to_vec()))
    }
}

#[async_trait]
impl PdfExtractor for HttpPdfExtractor {
    async fn extract(&self, url: &str, parse: bool) -> PdfContent {
        let (status, bytes) = match self.download(url).await {
            Ok(downloaded) => downloaded,
            Err(e) => {
                warn!("Failed to download PDF {}: {}", url, e);
                return PdfContent {
                    page_error: Some(e.to_string()),
                    ..Default::default()
                };
            }
        };

        if status >= 400 {
            let reason = reqwest::StatusCode::from_u16(status)
                .ok()
                .and_then(|s| s.canonical_reason())
                .unwrap_or("PDF download failed");
            return PdfContent {
                content: String::new(),
                status_code: Some(status),
                page_error: Some(reason.to_string()),
            };
        }

        if !parse {
            return PdfContent {
                content: String::from_utf8_lossy(&bytes).into_owned(),
                status_code: Some(status),
                page_error: None,
            };
        }

        match pdf_bytes_to_text(bytes).await {
            Ok(text) => {
                debug!("Extracted {} chars of PDF text from {}", text.len(), url);
                PdfContent {
                    content: text,
                    status_code: Some(status),
                    page_error: None,
                }
            }
            Err(e) => {
                warn!("{} for {}", e, url);
                PdfContent {
                    content: String::new(),
                    status_code: Some(status),
                    page_error: Some(e.to_string()),
                }
            }
        }
    }
}
