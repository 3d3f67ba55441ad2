// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Page metadata extraction from parsed HTML

use scraper::{Html, Selector};
use serde::{Deserialize, Serialize};
use url::Url;

/// Metadata read from a page's head and root element
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keywords: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub robots: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub og_title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub og_description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub og_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub og_image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub og_site_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub og_locale: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub published_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modified_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub favicon: Option<String>,
}

/// Extract metadata from a parsed document fetched from `url`
pub fn extract_metadata(document: &Html, url: &str) -> PageMetadata {
    PageMetadata {
        title: first_text(document, "title"),
        description: meta_name(document, "description"),
        language: first_attr(document, "html", "lang"),
        keywords: meta_name(document, "keywords"),
        robots: meta_name(document, "robots"),
        og_title: meta_property(document, "og:title"),
        og_description: meta_property(document, "og:description"),
        og_url: meta_property(document, "og:url"),
        og_image: meta_property(document, "og:image"),
        og_site_name: meta_property(document, "og:site_name"),
        og_locale: meta_property(document, "og:locale"),
        published_time: meta_property(document, "article:published_time"),
        modified_time: meta_property(document, "article:modified_time"),
        favicon: favicon(document, url),
    }
}

fn non_empty(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn first_text(document: &Html, selector: &str) -> Option<String> {
    let selector = Selector::parse(selector).ok()?;
    document
        .select(&selector)
        .next()
        .and_then(|el| non_empty(&el.text().collect::<String>()))
}

fn first_attr(document: &Html, selector: &str, attr: &str) -> Option<String> {
    let selector = Selector::parse(selector).ok()?;
    document
        .select(&selector)
        .filter_map(|el| el.value().attr(attr))
        .find_map(non_empty)
}

fn meta_name(document: &Html, name: &str) -> Option<String> {
    first_attr(document, &format!(r#"meta[name="{}"]"#, name), "content")
}

fn meta_property(document: &Html, property: &str) -> Option<String> {
    first_attr(document, &format!(r#"meta[property="{}"]"#, property), "content")
}

fn favicon(document: &Html, url: &str) -> Option<String> {
    let href = first_attr(document, r#"link[rel~="icon"]"#, "href")?;
    match Url::parse(url).and_then(|base| base.join(&href)) {
        Ok(resolved) => Some(resolved.to_string()),
        Err(_) => Some(href),
    }
}
