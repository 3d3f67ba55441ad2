// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Single-URL scrape orchestration
//!
//! Plans the backend order for a URL, tries backends one at a time until
//! one yields enough text, and assembles the final document.

use std::sync::Arc;
use std::time::Instant;

use reqwest::Client;
use tracing::{debug, info, warn};

use super::audit::AuditSink;
use super::backend::BackendSet;
use super::custom::{self, ScrapeDirective};
use super::finalizer::{assemble_document, clean_and_convert};
use super::host_params::{EffectiveParams, HostOverrides, HostParamResolver, RequestDefaults};
use super::pdf::{HttpPdfExtractor, PdfExtractor};
use super::planner::{plan, PlanHints};
use super::types::{
    AttemptOutcome, BackendKind, BackendResult, Document, ExtractorOptions, FetchRequest,
    PageOptions, ScrapeError,
};
use crate::config::ScrapeConfig;

/// Minimum trimmed text length for an attempt to count as a success
pub const SUFFICIENT_TEXT_LEN: usize = 100;

/// Judgment of one attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Enough text; stop with this attempt
    Sufficient,
    /// Confirmed missing page; stop without trying other backends
    NotFound,
    /// Try the next backend
    Insufficient,
}

/// Judge an attempt by its text and page status
pub fn judge(text: &str, status_code: Option<u16>) -> Verdict {
    if text.trim().chars().count() >= SUFFICIENT_TEXT_LEN {
        Verdict::Sufficient
    } else if status_code == Some(404) {
        Verdict::NotFound
    } else {
        Verdict::Insufficient
    }
}

/// Page status and error carried across attempts
#[derive(Debug, Clone, Default, PartialEq)]
struct CarriedStatus {
    status_code: Option<u16>,
    page_error: Option<String>,
}

impl CarriedStatus {
    fn absorb(&mut self, status_code: Option<u16>, page_error: Option<&String>) {
        match status_code {
            Some(code) if code >= 400 => {
                self.status_code = Some(code);
                if let Some(error) = page_error {
                    self.page_error = Some(error.clone());
                }
            }
            Some(code) => {
                self.status_code = Some(code);
                self.page_error = None;
            }
            None => {}
        }
    }
}

/// Fetches single URLs through the configured backends
pub struct Scraper {
    resolver: HostParamResolver,
    backends: BackendSet,
    pdf: Arc<dyn PdfExtractor>,
}

impl Scraper {
    /// Create a scraper with every backend built from configuration
    pub fn new(config: &ScrapeConfig, overrides: HostOverrides, audit: Arc<dyn AuditSink>) -> Self {
        let client = Client::new();
        let pdf: Arc<dyn PdfExtractor> =
            Arc::new(HttpPdfExtractor::new(client.clone(), config.universal_timeout_ms));
        let backends = BackendSet::from_config(config, client, pdf.clone(), audit);
        let resolver =
            HostParamResolver::new(overrides, RequestDefaults::new(config.universal_timeout_ms));

        info!(
            "Scraper ready: {} host overrides, backends available: {:?}",
            resolver.overrides().len(),
            backends.available()
        );

        Self::from_parts(resolver, backends, pdf)
    }

    /// Assemble a scraper from prebuilt parts
    pub fn from_parts(
        resolver: HostParamResolver,
        backends: BackendSet,
        pdf: Arc<dyn PdfExtractor>,
    ) -> Self {
        Self {
            resolver,
            backends,
            pdf,
        }
    }

    pub fn resolver(&self) -> &HostParamResolver {
        &self.resolver
    }

    pub fn backends(&self) -> &BackendSet {
        &self.backends
    }

    /// Effective parameters for `url`
    pub fn resolve(&self, url: &str) -> EffectiveParams {
        self.resolver.resolve(url.trim())
    }

    /// Backend order that would be tried for `url`
    pub fn plan_for(&self, url: &str, options: &PageOptions) -> Vec<BackendKind> {
        let params = self.resolve(url);
        self.plan_with(&params, options)
    }

    fn plan_with(&self, params: &EffectiveParams, options: &PageOptions) -> Vec<BackendKind> {
        plan(
            &self.backends.available(),
            PlanHints {
                forced: params.default_backend,
                wants_wait: options.wait_for_ms > 0,
                wants_screenshot: options.screenshot,
                has_custom_headers: options.has_custom_headers(),
            },
        )
    }

    /// Scrape `url`; a URL every backend failed on yields a degraded
    /// document instead of an error
    pub async fn scrape_url(
        &self,
        url: &str,
        page_options: &PageOptions,
        extractor_options: &ExtractorOptions,
        existing_html: Option<&str>,
    ) -> Document {
        match self
            .try_scrape_url(url, page_options, extractor_options, existing_html)
            .await
        {
            Ok(document) => document,
            Err(ScrapeError::AllBackendsExhausted {
                url,
                status_code,
                page_error,
            }) => {
                warn!("All scraping methods failed for URL: {}", url);
                Document::degraded(&url, status_code, page_error)
            }
        }
    }

    /// Scrape `url`, surfacing backend exhaustion as an error
    pub async fn try_scrape_url(
        &self,
        url: &str,
        page_options: &PageOptions,
        extractor_options: &ExtractorOptions,
        existing_html: Option<&str>,
    ) -> Result<Document, ScrapeError> {
        let url = url.trim();
        let start = Instant::now();

        let prefetched = existing_html
            .filter(|html| html.trim().chars().count() >= SUFFICIENT_TEXT_LEN);
        if let Some(existing) = prefetched {
            debug!("Using pre-fetched content for {}", url);
            let cleaned = clean_and_convert(existing, page_options);
            let outcome = AttemptOutcome {
                text: cleaned.text,
                html: cleaned.html,
                raw_html: existing.to_string(),
                ..Default::default()
            };
            return Ok(assemble_document(
                url,
                &outcome,
                None,
                None,
                page_options,
                extractor_options,
            ));
        }

        let params = self.resolver.resolve(url);
        let order = self.plan_with(&params, page_options);
        let request = FetchRequest::from_options(url, page_options);
        debug!("Backend order for {}: {:?}", url, order);

        let mut outcome = AttemptOutcome::default();
        let mut carried = CarriedStatus::default();

        for (index, &kind) in order.iter().enumerate() {
            let result = self.backends.attempt(kind, &request, &params).await;
            let result = self.apply_directive(result, &request, &params).await;

            let cleaned = clean_and_convert(&result.raw_content, page_options);
            outcome = AttemptOutcome {
                text: cleaned.text,
                html: cleaned.html,
                raw_html: result.raw_content,
                screenshot: result.screenshot.unwrap_or_default(),
                status_code: result.status_code,
                page_error: result.error_message,
            };
            carried.absorb(outcome.status_code, outcome.page_error.as_ref());

            match judge(&outcome.text, outcome.status_code) {
                Verdict::Sufficient => {
                    info!(
                        "Scraped {} with {} in {}ms",
                        url,
                        kind,
                        start.elapsed().as_millis()
                    );
                    break;
                }
                Verdict::NotFound => {
                    debug!("{} returned 404 for {}, not trying other backends", kind, url);
                    break;
                }
                Verdict::Insufficient => match order.get(index + 1) {
                    Some(next) => debug!(
                        "{} failed to produce content for {}, falling back to {}",
                        kind, url, next
                    ),
                    None => debug!("{} failed to produce content for {}, no backends left", kind, url),
                },
            }
        }

        if outcome.text.trim().is_empty() {
            return Err(ScrapeError::AllBackendsExhausted {
                url: url.to_string(),
                status_code: carried.status_code,
                page_error: carried.page_error,
            });
        }

        Ok(assemble_document(
            url,
            &outcome,
            carried.status_code,
            carried.page_error,
            page_options,
            extractor_options,
        ))
    }

    /// Run at most one replacement fetch when the content matches a
    /// site-specific rule
    async fn apply_directive(
        &self,
        mut result: BackendResult,
        request: &FetchRequest,
        params: &EffectiveParams,
    ) -> BackendResult {
        let directive = match custom::inspect(&result.raw_content, &request.url) {
            Some(directive) => directive,
            None => return result,
        };
        debug!("Custom rule matched for {}: {:?}", request.url, directive);

        match directive {
            ScrapeDirective::FireEngine {
                url,
                wait_after_load_ms,
                scroll_xpaths,
            } => {
                if !self.backends.available().contains(&BackendKind::FireEngine) {
                    warn!(
                        "Custom rule for {} needs {}, which is not configured; keeping original content",
                        request.url,
                        BackendKind::FireEngine
                    );
                    return result;
                }
                let redirected = FetchRequest {
                    url,
                    wait_ms: wait_after_load_ms,
                    scroll_xpaths,
                    ..request.clone()
                };
                let replacement = self
                    .backends
                    .attempt(BackendKind::FireEngine, &redirected, params)
                    .await;
                // A redirect without a capture keeps the first backend's screenshot
                result.raw_content = replacement.raw_content;
                result.screenshot = replacement.screenshot.or(result.screenshot);
            }
            ScrapeDirective::Pdf { url } => {
                let extracted = self.pdf.extract(&url, request.parse_pdf).await;
                result.raw_content = extracted.content;
            }
        }
        result
    }
}
