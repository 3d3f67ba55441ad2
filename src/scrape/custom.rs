// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Site-specific redirects applied after a backend returns
//!
//! A few sites are recognisable from their markup or URL and are known to
//! need a different fetch: documentation portals that render late, and
//! Google Drive viewer pages that wrap a downloadable PDF.

use std::sync::OnceLock;

use regex::Regex;

/// Replacement fetch requested for the current attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScrapeDirective {
    /// Re-fetch through the render service
    FireEngine {
        url: String,
        wait_after_load_ms: u64,
        scroll_xpaths: Vec<String>,
    },
    /// Treat the resource as a PDF
    Pdf { url: String },
}

const README_MARKER: &str = r#"<meta name="readme-deploy""#;
const README_PLAYGROUND_XPATH: &str =
    r#"//*[@id="ReferencePlayground"]/section[3]/div/pre/div/div/div[5]"#;
const VANTA_MARKER: &str = r#"<link href="https://static.vanta.com"#;

fn google_drive_file() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"https://drive\.google\.com/file/d/([^/]+)/view").ok())
        .as_ref()
}

/// Inspect a backend's raw content and decide whether another fetch
/// should replace it
pub fn inspect(raw_content: &str, url: &str) -> Option<ScrapeDirective> {
    if raw_content.contains(README_MARKER) {
        return Some(ScrapeDirective::FireEngine {
            url: url.to_string(),
            wait_after_load_ms: 1000,
            scroll_xpaths: vec![README_PLAYGROUND_XPATH.to_string()],
        });
    }

    if raw_content.contains(VANTA_MARKER) {
        return Some(ScrapeDirective::FireEngine {
            url: url.to_string(),
            wait_after_load_ms: 3000,
            scroll_xpaths: Vec::new(),
        });
    }

    if let Some(captures) = google_drive_file().and_then(|re| re.captures(url)) {
        let file_id = &captures[1];
        return Some(ScrapeDirective::Pdf {
            url: format!("https://drive.google.com/uc?export=download&id={}", file_id),
        });
    }

    None
}
