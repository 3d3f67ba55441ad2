// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};

/// Fabstir Scraper CLI
#[derive(Parser, Debug)]
#[command(name = "fabstir-scraper")]
#[command(version)]
#[command(about = "Fetch a URL through a fallback chain of scraping backends", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Scrape a URL and print the resulting document as JSON
    Scrape(commands::ScrapeArgs),

    /// Show the backend order that would be tried for a URL
    Plan(commands::PlanArgs),

    /// Show the effective host parameters for a URL
    Resolve(commands::ResolveArgs),
}

/// Execute CLI command
pub async fn execute(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Scrape(args) => commands::scrape(args).await,
        Commands::Plan(args) => commands::plan(args).await,
        Commands::Resolve(args) => commands::resolve(args).await,
    }
}
