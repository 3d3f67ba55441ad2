// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Core types for single-URL scraping

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::metadata::PageMetadata;

/// Identifier of one interchangeable fetching strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum BackendKind {
    /// Headless render service (playwright engine)
    #[serde(rename = "fire-engine")]
    FireEngine,
    /// Headless render service driven over the Chrome DevTools protocol
    #[serde(rename = "fire-engine;chrome-cdp")]
    FireEngineCdp,
    /// Rendering proxy, DOM-content-loaded wait
    #[serde(rename = "scrapingBee")]
    ScrapingBee,
    /// Rendering proxy, network-idle wait
    #[serde(rename = "scrapingBeeLoad")]
    ScrapingBeeLoad,
    /// Headless browser microservice
    #[serde(rename = "playwright")]
    Playwright,
    /// Plain HTTP GET
    #[serde(rename = "fetch")]
    Fetch,
}

impl BackendKind {
    /// Order in which backends are scanned for availability
    pub const ALL: [BackendKind; 6] = [
        BackendKind::FireEngine,
        BackendKind::FireEngineCdp,
        BackendKind::ScrapingBee,
        BackendKind::Playwright,
        BackendKind::ScrapingBeeLoad,
        BackendKind::Fetch,
    ];

    /// Wire name used in logs, audit records and host-override tables
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::FireEngine => "fire-engine",
            BackendKind::FireEngineCdp => "fire-engine;chrome-cdp",
            BackendKind::ScrapingBee => "scrapingBee",
            BackendKind::ScrapingBeeLoad => "scrapingBeeLoad",
            BackendKind::Playwright => "playwright",
            BackendKind::Fetch => "fetch",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Caller-supplied options controlling how a page is fetched and what the
/// resulting document contains
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PageOptions {
    /// Strip navigation chrome, ads and other non-content elements
    pub only_main_content: bool,
    /// Include the cleaned HTML in the document
    pub include_html: bool,
    /// Include the untouched backend payload in the document
    pub include_raw_html: bool,
    /// Extra wait after page load, in milliseconds
    pub wait_for_ms: u64,
    /// Ask for a screenshot of the rendered page
    pub screenshot: bool,
    /// Screenshot the full scroll height instead of the viewport
    pub full_page_screenshot: bool,
    /// Custom request headers forwarded to backends
    #[serde(skip_serializing_if = "Option::is_none")]
    pub headers: Option<BTreeMap<String, String>>,
    /// CSS selectors to remove before conversion
    pub remove_tags: Vec<String>,
    /// CSS selectors to keep; everything else is dropped when non-empty
    pub only_include_tags: Vec<String>,
    /// Run text extraction on PDF payloads
    #[serde(rename = "parsePDF")]
    pub parse_pdf: bool,
    /// Allow the slow, long-timeout paths of the rendering proxy
    pub fallback: bool,
}

impl Default for PageOptions {
    fn default() -> Self {
        Self {
            only_main_content: true,
            include_html: false,
            include_raw_html: false,
            wait_for_ms: 0,
            screenshot: false,
            full_page_screenshot: false,
            headers: None,
            remove_tags: Vec::new(),
            only_include_tags: Vec::new(),
            parse_pdf: true,
            fallback: true,
        }
    }
}

impl PageOptions {
    /// True when custom headers were supplied
    pub fn has_custom_headers(&self) -> bool {
        self.headers.is_some()
    }
}

/// How the document will be consumed downstream
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExtractionMode {
    #[serde(rename = "markdown")]
    Markdown,
    #[serde(rename = "llm-extraction")]
    LlmExtraction,
    #[default]
    #[serde(rename = "llm-extraction-from-markdown")]
    LlmExtractionFromMarkdown,
    #[serde(rename = "llm-extraction-from-raw-html")]
    LlmExtractionFromRawHtml,
}

/// Options for the extraction stage that consumes the document
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExtractorOptions {
    pub mode: ExtractionMode,
}

impl ExtractorOptions {
    /// Extraction modes that need the untouched payload
    pub fn requires_raw_html(&self) -> bool {
        self.mode == ExtractionMode::LlmExtractionFromRawHtml
    }
}

/// One fetch handed to a backend adapter
#[derive(Debug, Clone, PartialEq)]
pub struct FetchRequest {
    pub url: String,
    /// Extra wait after load; 0 means none
    pub wait_ms: u64,
    pub screenshot: bool,
    pub full_page_screenshot: bool,
    pub headers: Option<BTreeMap<String, String>>,
    /// XPaths the render service scrolls into view before capture
    pub scroll_xpaths: Vec<String>,
    pub parse_pdf: bool,
    /// Use the long proxy timeout
    pub fallback: bool,
}

impl FetchRequest {
    /// Build the per-URL request from page options
    pub fn from_options(url: &str, options: &PageOptions) -> Self {
        Self {
            url: url.to_string(),
            wait_ms: options.wait_for_ms,
            screenshot: options.screenshot,
            full_page_screenshot: options.full_page_screenshot,
            headers: options.headers.clone(),
            scroll_xpaths: Vec::new(),
            parse_pdf: options.parse_pdf,
            fallback: options.fallback,
        }
    }
}

/// Uniform result every backend adapter returns
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BackendResult {
    pub raw_content: String,
    pub screenshot: Option<String>,
    /// `None` means the page status is unknown (transport failure)
    pub status_code: Option<u16>,
    pub error_message: Option<String>,
}

impl BackendResult {
    /// An empty result carrying only an error message
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            error_message: Some(message.into()),
            ..Default::default()
        }
    }

    /// Whether the attempt produced content without an error report
    pub fn is_success(&self) -> bool {
        self.error_message.is_none()
            && !self.raw_content.is_empty()
            && self.status_code.map_or(true, |code| code < 400)
    }
}

/// Post-processed result of one loop iteration
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AttemptOutcome {
    /// Normalized text (markdown)
    pub text: String,
    /// Cleaned HTML
    pub html: String,
    /// Untouched backend payload
    pub raw_html: String,
    pub screenshot: String,
    pub status_code: Option<u16>,
    pub page_error: Option<String>,
}

/// Metadata attached to every document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentMetadata {
    #[serde(flatten)]
    pub page: PageMetadata,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub screenshot: Option<String>,
    #[serde(rename = "sourceURL")]
    pub source_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_status_code: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_error: Option<String>,
}

/// Normalized output of one URL fetch
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub content: String,
    pub markdown: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub html: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_html: Option<String>,
    pub metadata: DocumentMetadata,
}

impl Document {
    /// Document returned when every backend failed
    pub fn degraded(url: &str, status_code: Option<u16>, page_error: Option<String>) -> Self {
        Self {
            metadata: DocumentMetadata {
                source_url: url.to_string(),
                page_status_code: status_code,
                page_error,
                ..Default::default()
            },
            ..Default::default()
        }
    }
}

/// Errors raised inside a backend adapter; never escape the audited dispatch
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("Request timed out")]
    Timeout,

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Failed to decode response: {0}")]
    Decode(String),

    #[error("Backend {0} is not configured")]
    NotConfigured(BackendKind),
}

impl From<reqwest::Error> for BackendError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            BackendError::Timeout
        } else if e.is_decode() {
            BackendError::Decode(e.to_string())
        } else {
            BackendError::Transport(e.to_string())
        }
    }
}

/// Errors surfaced at the orchestration boundary
#[derive(Debug, Error)]
pub enum ScrapeError {
    /// Every planned backend failed the sufficiency test
    #[error("All scraping methods failed for URL: {url}")]
    AllBackendsExhausted {
        url: String,
        status_code: Option<u16>,
        page_error: Option<String>,
    },
}
