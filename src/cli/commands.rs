// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use clap::Args;
use tracing::{info, warn};

use crate::config::ScrapeConfig;
use crate::scrape::audit::{AuditSink, JsonlAuditSink, TracingAuditSink};
use crate::scrape::host_params::HostOverrides;
use crate::scrape::orchestrator::Scraper;
use crate::scrape::types::{ExtractorOptions, PageOptions};

/// Request traits shared by `scrape` and `plan`
#[derive(Args, Debug, Clone, Default)]
pub struct RequestArgs {
    /// Extra wait after page load in milliseconds
    #[arg(long, default_value_t = 0)]
    pub wait_for: u64,

    /// Capture a screenshot of the rendered page
    #[arg(long)]
    pub screenshot: bool,

    /// Custom request header, e.g. "Accept-Language: de" (repeatable)
    #[arg(long = "header", value_parser = parse_header)]
    pub headers: Vec<(String, String)>,
}

/// Arguments for the scrape command
#[derive(Args, Debug)]
pub struct ScrapeArgs {
    /// URL to scrape
    pub url: String,

    #[command(flatten)]
    pub request: RequestArgs,

    /// Screenshot the full page instead of the viewport
    #[arg(long)]
    pub full_page_screenshot: bool,

    /// Include the cleaned HTML in the document
    #[arg(long)]
    pub include_html: bool,

    /// Include the untouched backend payload in the document
    #[arg(long)]
    pub include_raw_html: bool,

    /// Keep navigation chrome instead of only the main content
    #[arg(long)]
    pub all_content: bool,

    /// Return PDF bodies without text extraction
    #[arg(long)]
    pub no_parse_pdf: bool,

    /// Use the short proxy timeout
    #[arg(long)]
    pub no_fallback: bool,

    /// Previously fetched HTML to use instead of contacting backends
    #[arg(long)]
    pub existing_html: Option<PathBuf>,
}

/// Arguments for the plan command
#[derive(Args, Debug)]
pub struct PlanArgs {
    /// URL to plan for
    pub url: String,

    #[command(flatten)]
    pub request: RequestArgs,
}

/// Arguments for the resolve command
#[derive(Args, Debug)]
pub struct ResolveArgs {
    /// URL to resolve parameters for
    pub url: String,
}

/// Parse a `Name: value` header argument
pub fn parse_header(raw: &str) -> Result<(String, String), String> {
    let (name, value) = raw
        .split_once(':')
        .ok_or_else(|| format!("header must look like 'Name: value', got '{}'", raw))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("header name is empty in '{}'", raw));
    }
    Ok((name.to_string(), value.trim().to_string()))
}

impl RequestArgs {
    fn page_options(&self) -> PageOptions {
        let headers = (!self.headers.is_empty())
            .then(|| self.headers.iter().cloned().collect::<BTreeMap<_, _>>());
        PageOptions {
            wait_for_ms: self.wait_for,
            screenshot: self.screenshot,
            headers,
            ..Default::default()
        }
    }
}

impl ScrapeArgs {
    /// Page options described by the flags
    pub fn page_options(&self) -> PageOptions {
        PageOptions {
            only_main_content: !self.all_content,
            include_html: self.include_html,
            include_raw_html: self.include_raw_html,
            full_page_screenshot: self.full_page_screenshot,
            parse_pdf: !self.no_parse_pdf,
            fallback: !self.no_fallback,
            ..self.request.page_options()
        }
    }
}

fn load_config() -> Result<ScrapeConfig> {
    dotenv::dotenv().ok();
    let config = ScrapeConfig::from_env();
    config
        .validate()
        .map_err(|e| anyhow!("Invalid scraper configuration: {}", e))?;
    if !config.has_any_renderer() {
        warn!("No rendering backend configured; only plain fetch is available");
    }
    Ok(config)
}

fn load_overrides(config: &ScrapeConfig) -> Result<HostOverrides> {
    match &config.host_overrides_path {
        Some(path) => {
            let overrides = HostOverrides::load(path)
                .with_context(|| format!("Failed to load host overrides from {}", path.display()))?;
            info!("Loaded {} host overrides from {}", overrides.len(), path.display());
            Ok(overrides)
        }
        None => Ok(HostOverrides::builtin()),
    }
}

async fn audit_sink(config: &ScrapeConfig) -> Result<Arc<dyn AuditSink>> {
    match &config.audit_log_path {
        Some(path) => {
            let sink = JsonlAuditSink::open(path)
                .await
                .with_context(|| format!("Failed to open audit log {}", path.display()))?;
            Ok(Arc::new(sink))
        }
        None => Ok(Arc::new(TracingAuditSink)),
    }
}

async fn build_scraper() -> Result<Scraper> {
    let config = load_config()?;
    let overrides = load_overrides(&config)?;
    let audit = audit_sink(&config).await?;
    Ok(Scraper::new(&config, overrides, audit))
}

/// Scrape a URL and print the document
pub async fn scrape(args: ScrapeArgs) -> Result<()> {
    let existing_html = match &args.existing_html {
        Some(path) => Some(
            tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("Failed to read {}", path.display()))?,
        ),
        None => None,
    };

    let scraper = build_scraper().await?;
    let document = scraper
        .scrape_url(
            &args.url,
            &args.page_options(),
            &ExtractorOptions::default(),
            existing_html.as_deref(),
        )
        .await;

    if document.content.is_empty() {
        warn!("No content obtained for {}", args.url);
    }
    println!("{}", serde_json::to_string_pretty(&document)?);
    Ok(())
}

/// Print the planned backend order
pub async fn plan(args: PlanArgs) -> Result<()> {
    let scraper = build_scraper().await?;
    let order = scraper.plan_for(&args.url, &args.request.page_options());
    println!("{}", serde_json::to_string_pretty(&order)?);
    Ok(())
}

/// Print the effective host parameters
pub async fn resolve(args: ResolveArgs) -> Result<()> {
    let scraper = build_scraper().await?;
    let params = scraper.resolve(&args.url);
    println!("{}", serde_json::to_string_pretty(&params)?);
    Ok(())
}
