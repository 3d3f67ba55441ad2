// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Fallback order planning
//!
//! Computes the ordered, de-duplicated list of backends to try for one URL.
//! Requests that need browser behaviour (a wait, a screenshot, custom
//! headers) move the heavy renderers to the front, since the proxy and
//! plain fetch paths cannot honour those options.

use super::types::BackendKind;

/// Order used when nothing about the request favours a renderer
pub const DEFAULT_ORDER: [BackendKind; 5] = [
    BackendKind::ScrapingBee,
    BackendKind::FireEngine,
    BackendKind::Playwright,
    BackendKind::ScrapingBeeLoad,
    BackendKind::Fetch,
];

/// Request traits that influence the fallback order
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlanHints {
    pub forced: Option<BackendKind>,
    pub wants_wait: bool,
    pub wants_screenshot: bool,
    pub has_custom_headers: bool,
}

impl PlanHints {
    fn needs_renderer(&self) -> bool {
        self.wants_wait || self.wants_screenshot || self.has_custom_headers
    }
}

/// Plan the backend order
///
/// `available` lists the configured backends in availability-scan order.
/// Backends missing from it never appear in the output, a forced backend
/// included.
pub fn plan(available: &[BackendKind], hints: PlanHints) -> Vec<BackendKind> {
    let mut order: Vec<BackendKind> = if hints.needs_renderer() {
        let promoted = [BackendKind::FireEngine, BackendKind::Playwright];
        promoted
            .iter()
            .copied()
            .chain(DEFAULT_ORDER.iter().copied().filter(|k| !promoted.contains(k)))
            .collect()
    } else {
        DEFAULT_ORDER.to_vec()
    };

    order.retain(|kind| available.contains(kind));

    let forced = hints.forced.filter(|kind| available.contains(kind));
    let candidates = forced
        .into_iter()
        .chain(order)
        .chain(available.iter().copied());

    let mut planned = Vec::with_capacity(available.len());
    for kind in candidates {
        if !planned.contains(&kind) {
            planned.push(kind);
        }
    }
    planned
}
