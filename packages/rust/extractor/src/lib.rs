//! Candidate extraction from rendered document snapshots.
//!
//! The extractor walks the main document and every accessible frame
//! independently, applying the same fixed rule cascade to each (see
//! [`rules`]), and unions the results into one de-duplicated candidate list.
//! It is a read-only traversal: no side effects, no network, and it never
//! fails — a session that cannot produce snapshots at all is handled
//! upstream as a recoverable error, and an empty snapshot list simply yields
//! an empty candidate list.

mod rules;

use std::collections::HashSet;

use scraper::{ElementRef, Html};
use tracing::debug;
use url::Url;

use istawatch_shared::{Candidate, DiscoveryMethod, DocumentSnapshot};

pub use rules::{DOWNLOAD_KEYWORDS, is_download_endpoint};

/// Extract download candidates from a set of rendered-document snapshots.
///
/// Candidates are de-duplicated by resolved target across all rules and all
/// frames; the first occurrence (rule order, then frame order) wins.
/// Candidates carrying a document-extension marker in label or target are
/// excluded unconditionally.
pub fn extract_candidates(snapshots: &[DocumentSnapshot]) -> Vec<Candidate> {
    let mut seen_targets: HashSet<String> = HashSet::new();
    let mut candidates: Vec<Candidate> = Vec::new();

    for snapshot in snapshots {
        let doc = Html::parse_document(&snapshot.html);
        let base = Url::parse(&snapshot.url).ok();

        for found in rules::scan_document(&doc, base.as_ref()) {
            if found.target.is_empty() {
                continue;
            }
            if rules::has_document_extension(&found.label)
                || rules::has_document_extension(&found.target)
            {
                debug!(target = %found.target, "document-type candidate excluded");
                continue;
            }
            if !seen_targets.insert(found.target.clone()) {
                continue;
            }
            candidates.push(Candidate {
                label: found.label,
                target: found.target,
                source_frame: snapshot.frame.clone(),
                method: found.method,
            });
        }
    }

    debug!(
        documents = snapshots.len(),
        candidates = candidates.len(),
        "extraction pass complete"
    );
    candidates
}

/// A candidate before it is tagged with its source frame.
#[derive(Debug, Clone)]
pub(crate) struct RawCandidate {
    pub label: String,
    pub target: String,
    pub method: DiscoveryMethod,
}

/// Visible text of an element, whitespace-collapsed; falls back to `title`
/// and `aria-label` attributes for icon-only controls.
pub(crate) fn element_label(el: &ElementRef<'_>) -> String {
    let text = el
        .text()
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");

    if !text.is_empty() {
        return text;
    }

    for attr in ["title", "aria-label"] {
        if let Some(value) = el.value().attr(attr) {
            let trimmed = value.trim();
            if !trimmed.is_empty() {
                return trimmed.to_string();
            }
        }
    }

    String::new()
}

/// Resolve an href against the snapshot URL. Absolute http(s) targets pass
/// through; anchors, `javascript:` and `mailto:` pseudo-targets resolve to
/// nothing.
pub(crate) fn resolve_target(href: &str, base: Option<&Url>) -> Option<String> {
    let href = href.trim();
    if href.is_empty()
        || href.starts_with('#')
        || href.starts_with("javascript:")
        || href.starts_with("mailto:")
    {
        return None;
    }

    if href.starts_with("http://") || href.starts_with("https://") {
        return Some(href.to_string());
    }

    match base.and_then(|base| base.join(href).ok()) {
        Some(mut resolved) => {
            resolved.set_fragment(None);
            Some(resolved.to_string())
        }
        // No usable base URL: keep the raw relative target for diagnostics.
        None => Some(href.to_string()),
    }
}
