// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod cli;
pub mod config;
pub mod scrape;

// Re-export main types
pub use config::ScrapeConfig;
pub use scrape::{
    BackendKind, Document, ExtractionMode, ExtractorOptions, PageOptions, ScrapeError, Scraper,
};
