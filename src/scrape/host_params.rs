// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Host-keyed request parameter overrides
//!
//! Some sites only render correctly with a particular backend, a longer
//! wait or extra provider parameters. The override table is keyed by the
//! hostname with the scheme and a leading `www.` removed, is loaded once
//! and never mutated afterwards.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{error, warn};
use url::Url;

use super::types::BackendKind;

/// Marker header identifying the call as a scraping request
pub const SCRAPING_REQUEST_HEADER: &str = "ScrapingService-Request";

const BUILTIN_OVERRIDES: &str = include_str!("host_overrides.toml");

/// Errors loading a host override table
#[derive(Debug, Error)]
pub enum HostOverrideError {
    #[error("Failed to read host overrides from {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid host override table: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Per-host overrides; every field is optional and replaces the default
/// wholesale when present
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HostOverrideEntry {
    /// Backend tried before any other
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_backend: Option<BackendKind>,
    /// Wait applied when the request does not ask for one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wait_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
    /// Page lifecycle event the rendering proxy waits for
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wait_browser: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub headers: Option<BTreeMap<String, String>>,
    /// Backend-specific parameters, passed through untouched
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Map<String, Value>>,
}

#[derive(Debug, Default, Deserialize)]
struct OverrideFile {
    #[serde(default)]
    hosts: HashMap<String, HostOverrideEntry>,
}

/// Immutable host override table
#[derive(Debug, Clone, Default)]
pub struct HostOverrides {
    hosts: HashMap<String, HostOverrideEntry>,
}

impl HostOverrides {
    /// A table with no entries
    pub fn empty() -> Self {
        Self::default()
    }

    /// The table shipped with the crate
    pub fn builtin() -> Self {
        match Self::from_toml_str(BUILTIN_OVERRIDES) {
            Ok(table) => table,
            Err(e) => {
                error!("Built-in host override table is invalid: {}", e);
                Self::empty()
            }
        }
    }

    /// Parse a TOML table of the form `[hosts."example.com"]`
    pub fn from_toml_str(content: &str) -> Result<Self, HostOverrideError> {
        let file: OverrideFile = toml::from_str(content)?;
        Ok(file
            .hosts
            .into_iter()
            .fold(Self::empty(), |table, (host, entry)| table.with_entry(&host, entry)))
    }

    /// Load a TOML table from disk
    pub fn load(path: impl AsRef<Path>) -> Result<Self, HostOverrideError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| HostOverrideError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    /// Add or replace an entry; the key is normalized like a hostname
    pub fn with_entry(mut self, host: &str, entry: HostOverrideEntry) -> Self {
        self.hosts.insert(strip_www(&host.to_lowercase()), entry);
        self
    }

    /// Entry for an already-normalized hostname
    pub fn get(&self, host: &str) -> Option<&HostOverrideEntry> {
        self.hosts.get(host)
    }

    /// Entry for the host of `url`, if the URL parses and has one
    pub fn lookup(&self, url: &str) -> Option<&HostOverrideEntry> {
        normalize_host(url).ok().and_then(|host| self.get(&host))
    }

    pub fn len(&self) -> usize {
        self.hosts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hosts.is_empty()
    }
}

/// Hostname of `url` without scheme or leading `www.`
pub fn normalize_host(url: &str) -> Result<String, url::ParseError> {
    let parsed = Url::parse(url.trim())?;
    let host = parsed.host_str().ok_or(url::ParseError::EmptyHost)?;
    Ok(strip_www(host))
}

fn strip_www(host: &str) -> String {
    host.strip_prefix("www.").unwrap_or(host).to_string()
}

/// Defaults every request starts from
#[derive(Debug, Clone, PartialEq)]
pub struct RequestDefaults {
    pub timeout_ms: u64,
    pub headers: BTreeMap<String, String>,
}

impl RequestDefaults {
    pub fn new(timeout_ms: u64) -> Self {
        let mut headers = BTreeMap::new();
        headers.insert(SCRAPING_REQUEST_HEADER.to_string(), "TRUE".to_string());
        Self {
            timeout_ms,
            headers,
        }
    }
}

impl Default for RequestDefaults {
    fn default() -> Self {
        Self::new(15_000)
    }
}

/// Request parameters after overlaying the host entry on the defaults
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EffectiveParams {
    /// Normalized host the parameters were resolved for; informational
    /// only and never part of the override values
    pub host: Option<String>,
    pub timeout_ms: u64,
    /// `None` leaves the backend's own wait condition in place
    pub wait_browser: Option<String>,
    pub wait_ms: Option<u64>,
    pub headers: BTreeMap<String, String>,
    pub params: Map<String, Value>,
    pub default_backend: Option<BackendKind>,
}

impl EffectiveParams {
    /// Parameters with no host entry applied
    pub fn defaults(defaults: &RequestDefaults) -> Self {
        Self {
            host: None,
            timeout_ms: defaults.timeout_ms,
            wait_browser: None,
            wait_ms: None,
            headers: defaults.headers.clone(),
            params: Map::new(),
            default_backend: None,
        }
    }

    fn overlay(mut self, entry: &HostOverrideEntry) -> Self {
        if let Some(timeout_ms) = entry.timeout_ms {
            self.timeout_ms = timeout_ms;
        }
        if let Some(wait_browser) = &entry.wait_browser {
            self.wait_browser = Some(wait_browser.clone());
        }
        if let Some(wait_ms) = entry.wait_ms {
            self.wait_ms = Some(wait_ms);
        }
        if let Some(headers) = &entry.headers {
            self.headers = headers.clone();
        }
        if let Some(params) = &entry.params {
            self.params = params.clone();
        }
        if let Some(backend) = entry.default_backend {
            self.default_backend = Some(backend);
        }
        self
    }

    /// Wait to apply: the request's own wait wins, then the host's
    pub fn effective_wait_ms(&self, requested_wait_ms: u64) -> u64 {
        if requested_wait_ms > 0 {
            requested_wait_ms
        } else {
            self.wait_ms.unwrap_or(0)
        }
    }

    /// Wait condition for rendering proxies, falling back to the mode default
    pub fn wait_browser_or<'a>(&'a self, mode_default: &'a str) -> &'a str {
        self.wait_browser.as_deref().unwrap_or(mode_default)
    }
}

/// Resolves effective request parameters for a URL
#[derive(Debug, Clone)]
pub struct HostParamResolver {
    overrides: HostOverrides,
    defaults: RequestDefaults,
}

impl HostParamResolver {
    pub fn new(overrides: HostOverrides, defaults: RequestDefaults) -> Self {
        Self {
            overrides,
            defaults,
        }
    }

    /// Resolve parameters for `url`; a malformed URL yields the defaults
    pub fn resolve(&self, url: &str) -> EffectiveParams {
        let base = EffectiveParams::defaults(&self.defaults);

        let host = match normalize_host(url) {
            Ok(host) => host,
            Err(e) => {
                warn!("Error generating URL key for {}: {}", url, e);
                return base;
            }
        };

        match self.overrides.get(&host) {
            Some(entry) => EffectiveParams {
                host: Some(host),
                ..base
            }
            .overlay(entry),
            None => EffectiveParams {
                host: Some(host),
                ..base
            },
        }
    }

    pub fn overrides(&self) -> &HostOverrides {
        &self.overrides
    }

    pub fn defaults(&self) -> &RequestDefaults {
        &self.defaults
    }
}
