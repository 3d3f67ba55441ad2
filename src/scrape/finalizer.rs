// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Content cleaning, markdown conversion and document assembly

use htmd::options::{CodeBlockStyle, HeadingStyle, LinkStyle, Options};
use htmd::HtmlToMarkdown;
use scraper::{Html, Selector};
use tracing::warn;

use super::metadata::extract_metadata;
use super::types::{AttemptOutcome, Document, DocumentMetadata, ExtractorOptions, PageOptions};

/// Elements that never carry page content
const ALWAYS_REMOVED: &str = "script, style, noscript, meta, head";

/// Page chrome dropped when only the main content is wanted
const NON_MAIN_SELECTORS: &[&str] = &[
    "header",
    "footer",
    "nav",
    "aside",
    ".header",
    ".top",
    ".navbar",
    "#header",
    ".footer",
    ".bottom",
    "#footer",
    ".sidebar",
    ".side",
    ".aside",
    "#sidebar",
    ".modal",
    ".popup",
    "#modal",
    ".overlay",
    ".ad",
    ".ads",
    ".advert",
    "#ad",
    ".lang-selector",
    ".language",
    "#language-selector",
    ".social",
    ".social-media",
    ".social-links",
    "#social",
    ".menu",
    ".navigation",
    "#nav",
    ".breadcrumbs",
    "#breadcrumbs",
    "#search-form",
    ".search",
    "#search",
    ".share",
    "#share",
    ".widget",
    "#widget",
    ".cookie",
    "#cookie",
];

/// Cleaned HTML and the text derived from it
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CleanedContent {
    pub html: String,
    pub text: String,
}

/// Strip unwanted elements from `raw` according to the page options
pub fn remove_unwanted_elements(raw: &str, options: &PageOptions) -> String {
    if raw.trim().is_empty() {
        return String::new();
    }

    let mut document = Html::parse_document(raw);

    if !options.only_include_tags.is_empty() {
        let mut kept = String::new();
        for selector in &options.only_include_tags {
            match Selector::parse(selector) {
                Ok(selector) => {
                    for element in document.select(&selector) {
                        kept.push_str(&element.html());
                    }
                }
                Err(_) => warn!("Ignoring invalid include selector: {}", selector),
            }
        }
        return format!("<div>{}</div>", kept);
    }

    detach_matching(&mut document, ALWAYS_REMOVED);

    for selector in &options.remove_tags {
        detach_matching(&mut document, selector);
    }

    if options.only_main_content {
        for selector in NON_MAIN_SELECTORS {
            detach_matching(&mut document, selector);
        }
    }

    document.html()
}

fn detach_matching(document: &mut Html, selector: &str) {
    let selector = match Selector::parse(selector) {
        Ok(selector) => selector,
        Err(_) => {
            warn!("Ignoring invalid removal selector: {}", selector);
            return;
        }
    };

    let ids: Vec<_> = document.select(&selector).map(|element| element.id()).collect();
    for id in ids {
        if let Some(mut node) = document.tree.get_mut(id) {
            node.detach();
        }
    }
}

/// Convert cleaned HTML into normalized markdown text
pub fn to_markdown(html: &str) -> String {
    if html.trim().is_empty() {
        return String::new();
    }

    let converter = HtmlToMarkdown::builder()
        .options(Options {
            heading_style: HeadingStyle::Atx,
            code_block_style: CodeBlockStyle::Fenced,
            link_style: LinkStyle::Inlined,
            ..Default::default()
        })
        .skip_tags(vec!["script", "style", "noscript"])
        .build();

    match converter.convert(html) {
        Ok(markdown) => markdown.trim().to_string(),
        Err(e) => {
            warn!("Markdown conversion failed: {}", e);
            String::new()
        }
    }
}

/// Clean raw content and convert it to text
pub fn clean_and_convert(raw: &str, options: &PageOptions) -> CleanedContent {
    let html = remove_unwanted_elements(raw, options);
    let text = to_markdown(&html);
    CleanedContent { html, text }
}

/// Assemble the final document from the chosen attempt
///
/// `status_code` and `page_error` are the values carried across attempts,
/// not necessarily the ones of `outcome`.
pub fn assemble_document(
    url: &str,
    outcome: &AttemptOutcome,
    status_code: Option<u16>,
    page_error: Option<String>,
    page_options: &PageOptions,
    extractor_options: &ExtractorOptions,
) -> Document {
    let page = if outcome.raw_html.trim().is_empty() {
        Default::default()
    } else {
        extract_metadata(&Html::parse_document(&outcome.raw_html), url)
    };

    let include_raw = page_options.include_raw_html || extractor_options.requires_raw_html();

    Document {
        content: outcome.text.clone(),
        markdown: outcome.text.clone(),
        html: page_options.include_html.then(|| outcome.html.clone()),
        raw_html: include_raw.then(|| outcome.raw_html.clone()),
        metadata: DocumentMetadata {
            page,
            screenshot: (!outcome.screenshot.is_empty()).then(|| outcome.screenshot.clone()),
            source_url: url.to_string(),
            page_status_code: status_code,
            page_error,
        },
    }
}
