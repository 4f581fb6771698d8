//! The fixed extraction rule cascade applied to every document.
//!
//! Rules run in a fixed order per document and their results are unioned by
//! the caller:
//!   a. anchors whose target matches a download-endpoint path pattern
//!   b. interactive elements whose inline handler text contains a download
//!      keyword
//!   c. descendants of known download-region containers
//!   d. any element with download-keyword visible text and a resolvable
//!      action target, minus the non-artifact denylist
//!
//! The portal serves labels in English and German; keyword lists cover both.

use regex::Regex;
use scraper::{Html, Selector};
use url::Url;

use istawatch_shared::DiscoveryMethod;

use crate::{RawCandidate, element_label, resolve_target};

/// Path markers that identify a download endpoint.
const DOWNLOAD_PATH_MARKERS: &[&str] = &["/download", "/dl/", "delivery", "getfile", "artifact"];

/// Artifact file suffixes that identify a download endpoint on their own.
const ARTIFACT_EXTENSIONS: &[&str] = &[".zip", ".7z", ".exe", ".msi", ".bin", ".img", ".tar.gz"];

/// Visible-text / handler keywords that indicate a download control.
pub const DOWNLOAD_KEYWORDS: &[&str] = &[
    "download",
    "herunterladen",
    "install",
    "installationsdatei",
    "firmware",
    "driver",
    "client",
];

/// Known non-artifact link paths, excluded from keyword-text matches.
const NON_ARTIFACT_DENYLIST: &[&str] = &[
    "terms",
    "privacy",
    "datenschutz",
    "pricing",
    "cookie",
    "user-guide",
    "impressum",
];

/// Document-type suffixes; candidates carrying one are never artifacts.
const DOCUMENT_EXTENSIONS: &[&str] = &[
    ".pdf", ".doc", ".docx", ".xls", ".xlsx", ".ppt", ".pptx", ".txt", ".rtf",
];

/// Container selectors the portal uses for its download regions.
const REGION_SELECTORS: &[&str] = &[
    "#downloads",
    ".download-area",
    ".downloads",
    "[data-role='downloads']",
];

/// Whether a target string looks like a download endpoint.
pub fn is_download_endpoint(target: &str) -> bool {
    let lower = target.to_lowercase();
    DOWNLOAD_PATH_MARKERS.iter().any(|m| lower.contains(m))
        || ARTIFACT_EXTENSIONS.iter().any(|e| lower.ends_with(e))
}

/// Whether a label or target carries a document-type suffix.
pub(crate) fn has_document_extension(text: &str) -> bool {
    let lower = text.to_lowercase();
    DOCUMENT_EXTENSIONS.iter().any(|e| lower.ends_with(e) || lower.contains(&format!("{e}?")))
}

fn contains_download_keyword(text: &str) -> bool {
    let lower = text.to_lowercase();
    DOWNLOAD_KEYWORDS.iter().any(|k| lower.contains(k))
}

fn is_denylisted(label: &str, target: &str) -> bool {
    let label = label.to_lowercase();
    let target = target.to_lowercase();
    NON_ARTIFACT_DENYLIST
        .iter()
        .any(|d| label.contains(d) || target.contains(d))
}

/// Run the full rule cascade over one parsed document.
pub(crate) fn scan_document(doc: &Html, base: Option<&Url>) -> Vec<RawCandidate> {
    let mut found = Vec::new();
    scan_anchor_paths(doc, base, &mut found);
    scan_handler_keywords(doc, base, &mut found);
    scan_download_regions(doc, base, &mut found);
    scan_keyword_text(doc, base, &mut found);
    found
}

/// Rule (a): anchors whose resolved target matches a download-endpoint
/// path pattern.
fn scan_anchor_paths(doc: &Html, base: Option<&Url>, out: &mut Vec<RawCandidate>) {
    let anchor_sel = Selector::parse("a[href]").unwrap();

    for el in doc.select(&anchor_sel) {
        let Some(href) = el.value().attr("href") else {
            continue;
        };
        let Some(target) = resolve_target(href, base) else {
            continue;
        };
        if is_download_endpoint(&target) {
            out.push(RawCandidate {
                label: element_label(&el),
                target,
                method: DiscoveryMethod::AnchorPath,
            });
        }
    }
}

/// Rule (b): buttons and `role="button"` elements whose inline handler text
/// contains a download keyword. The target is the first URL quoted inside
/// the handler, or the handler text itself when none is found.
fn scan_handler_keywords(doc: &Html, base: Option<&Url>, out: &mut Vec<RawCandidate>) {
    let button_sel = Selector::parse("button[onclick], [role='button'][onclick]").unwrap();

    for el in doc.select(&button_sel) {
        let Some(handler) = el.value().attr("onclick") else {
            continue;
        };
        if !contains_download_keyword(handler) {
            continue;
        }
        out.push(RawCandidate {
            label: element_label(&el),
            target: handler_target(handler, base),
            method: DiscoveryMethod::HandlerKeyword,
        });
    }
}

/// Rule (c): anchors and buttons inside known download-region containers.
fn scan_download_regions(doc: &Html, base: Option<&Url>, out: &mut Vec<RawCandidate>) {
    let inner_sel = Selector::parse("a[href], button[onclick]").unwrap();

    for region_selector in REGION_SELECTORS {
        let Ok(region_sel) = Selector::parse(region_selector) else {
            continue;
        };
        for region in doc.select(&region_sel) {
            for el in region.select(&inner_sel) {
                let target = if let Some(href) = el.value().attr("href") {
                    resolve_target(href, base)
                } else {
                    el.value().attr("onclick").map(|h| handler_target(h, base))
                };
                let Some(target) = target else { continue };
                out.push(RawCandidate {
                    label: element_label(&el),
                    target,
                    method: DiscoveryMethod::RegionScan,
                });
            }
        }
    }
}

/// Rule (d): any element whose visible text contains a download keyword and
/// which carries a resolvable action target, excluding known non-artifact
/// links.
fn scan_keyword_text(doc: &Html, base: Option<&Url>, out: &mut Vec<RawCandidate>) {
    let actionable_sel = Selector::parse("[href], [onclick]").unwrap();

    for el in doc.select(&actionable_sel) {
        let label = element_label(&el);
        if !contains_download_keyword(&label) {
            continue;
        }
        let target = if let Some(href) = el.value().attr("href") {
            resolve_target(href, base)
        } else {
            el.value().attr("onclick").map(|h| handler_target(h, base))
        };
        let Some(target) = target else { continue };
        if is_denylisted(&label, &target) {
            continue;
        }
        out.push(RawCandidate {
            label,
            target,
            method: DiscoveryMethod::KeywordText,
        });
    }
}

/// Pull a usable target out of an inline handler: the first quoted string
/// that looks like a URL or path, resolved against the document. Falls back
/// to the raw handler text so the candidate stays diagnosable.
fn handler_target(handler: &str, base: Option<&Url>) -> String {
    let Ok(quoted) = Regex::new(r#"['"]([^'"]+)['"]"#) else {
        return handler.trim().to_string();
    };

    for capture in quoted.captures_iter(handler) {
        let inner = &capture[1];
        if inner.starts_with("http://")
            || inner.starts_with("https://")
            || inner.starts_with('/')
        {
            if let Some(resolved) = resolve_target(inner, base) {
                return resolved;
            }
        }
    }

    handler.trim().to_string()
}
