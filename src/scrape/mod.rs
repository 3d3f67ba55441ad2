// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Single-URL scraping with backend fallback
//!
//! Fetches the rendered content of one URL by trying interchangeable
//! backends in a planned order until one yields enough text, then
//! normalizes the result into a [`Document`].
//!
//! Key features:
//! - Per-host request parameters from a TOML override table
//! - Fallback order planned from availability and request traits
//! - Site-specific redirects (late-rendering docs, Drive PDFs)
//! - One audit record per backend attempt

pub mod audit;
pub mod backend;
pub mod custom;
pub mod finalizer;
pub mod host_params;
pub mod metadata;
pub mod orchestrator;
pub mod pdf;
pub mod planner;
pub mod types;

// Re-export commonly used types
pub use audit::{AuditRecord, AuditSink, JsonlAuditSink, TracingAuditSink};
pub use backend::{Backend, BackendSet};
pub use host_params::{EffectiveParams, HostOverrideEntry, HostOverrides, HostParamResolver};
pub use orchestrator::{judge, Scraper, Verdict};
pub use pdf::{HttpPdfExtractor, PdfContent, PdfExtractor};
pub use planner::{plan, PlanHints};
pub use types::{
    BackendError, BackendKind, BackendResult, Document, ExtractionMode, ExtractorOptions,
    FetchRequest, PageOptions, ScrapeError,
};
