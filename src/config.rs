// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Configuration for the scraper

use std::env;
use std::path::PathBuf;

use crate::scrape::backend::scraping_bee::SCRAPING_BEE_API_URL;

/// Endpoints, credentials and timeouts for every backend
#[derive(Debug, Clone, PartialEq)]
pub struct ScrapeConfig {
    /// Render service endpoint; enables both render-service backends
    pub fire_engine_url: Option<String>,
    /// Rendering proxy credential
    pub scraping_bee_api_key: Option<String>,
    /// Rendering proxy API base
    pub scraping_bee_url: String,
    /// Browser microservice endpoint
    pub playwright_url: Option<String>,
    /// Base timeout for every backend in milliseconds
    pub universal_timeout_ms: u64,
    /// Short proxy timeout used when fallback is disabled
    pub fast_timeout_ms: u64,
    /// Host-override table replacing the built-in one
    pub host_overrides_path: Option<PathBuf>,
    /// JSONL file receiving one audit record per attempt
    pub audit_log_path: Option<PathBuf>,
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

impl ScrapeConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            fire_engine_url: non_empty_var("FIRE_ENGINE_BETA_URL"),
            scraping_bee_api_key: non_empty_var("SCRAPING_BEE_API_KEY"),
            scraping_bee_url: non_empty_var("SCRAPING_BEE_URL")
                .unwrap_or(defaults.scraping_bee_url),
            playwright_url: non_empty_var("PLAYWRIGHT_MICROSERVICE_URL"),
            universal_timeout_ms: non_empty_var("SCRAPE_UNIVERSAL_TIMEOUT_MS")
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.universal_timeout_ms),
            fast_timeout_ms: non_empty_var("SCRAPE_FAST_TIMEOUT_MS")
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.fast_timeout_ms),
            host_overrides_path: non_empty_var("SCRAPE_HOST_OVERRIDES").map(PathBuf::from),
            audit_log_path: non_empty_var("SCRAPE_AUDIT_LOG").map(PathBuf::from),
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.universal_timeout_ms == 0 {
            return Err("Universal timeout must be greater than 0".to_string());
        }
        if self.fast_timeout_ms == 0 {
            return Err("Fast timeout must be greater than 0".to_string());
        }
        if self.scraping_bee_url.trim().is_empty() {
            return Err("Scraping proxy URL must not be empty".to_string());
        }
        for (name, endpoint) in [
            ("FIRE_ENGINE_BETA_URL", &self.fire_engine_url),
            ("PLAYWRIGHT_MICROSERVICE_URL", &self.playwright_url),
        ] {
            if let Some(endpoint) = endpoint {
                url::Url::parse(endpoint)
                    .map_err(|e| format!("{} is not a valid URL: {}", name, e))?;
            }
        }
        Ok(())
    }

    /// Check if any backend beyond plain fetch is configured
    pub fn has_any_renderer(&self) -> bool {
        self.fire_engine_url.is_some()
            || self.scraping_bee_api_key.is_some()
            || self.playwright_url.is_some()
    }
}

impl Default for ScrapeConfig {
    fn default() -> Self {
        Self {
            fire_engine_url: None,
            scraping_bee_api_key: None,
            scraping_bee_url: SCRAPING_BEE_API_URL.to_string(),
            playwright_url: None,
            universal_timeout_ms: 15_000,
            fast_timeout_ms: 7_000,
            host_overrides_path: None,
            audit_log_path: None,
        }
    }
}
