//! Core domain types for the istawatch pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Sentinel version string used when no version token can be extracted
/// from a candidate's target.
pub const UNKNOWN_VERSION: &str = "unknown";

// ---------------------------------------------------------------------------
// Application
// ---------------------------------------------------------------------------

/// The two portal surfaces istawatch knows how to walk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Application {
    /// The classic distribution surface: client, programming data,
    /// interface firmware, pass-through driver.
    Ista,
    /// The open-source-stack variant: client and interface firmware only.
    IstaOss,
}

impl Application {
    /// Stable identifier used as the prefix of metadata store keys.
    pub fn as_str(&self) -> &'static str {
        match self {
            Application::Ista => "ista",
            Application::IstaOss => "istaoss",
        }
    }

    /// Subdirectory under the download root where this application's
    /// artifacts are stored.
    pub fn dir_name(&self) -> &'static str {
        match self {
            Application::Ista => "ista",
            Application::IstaOss => "ista-oss",
        }
    }

    /// All applications, in the order the orchestrator processes them.
    pub fn all() -> [Application; 2] {
        [Application::Ista, Application::IstaOss]
    }
}

impl std::fmt::Display for Application {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Composite metadata store key for an (application, category) pair.
pub fn record_key(application: Application, category: &str) -> String {
    format!("{}_{}", application.as_str(), category)
}

// ---------------------------------------------------------------------------
// Candidate
// ---------------------------------------------------------------------------

/// Which extraction rule produced a candidate. Diagnostic only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscoveryMethod {
    /// Anchor whose href matches a download-endpoint path marker.
    AnchorPath,
    /// Interactive element whose inline handler text contains a download keyword.
    HandlerKeyword,
    /// Anchor/button found inside a known download-region container.
    RegionScan,
    /// Element whose visible text contains a download keyword and which
    /// carries a resolvable action target.
    KeywordText,
}

/// A raw, unclassified link or button that might represent a downloadable
/// artifact. Produced fresh on every extraction pass; never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    /// Human-readable label (visible text, title, or aria-label).
    pub label: String,
    /// Resolved action target: an absolute URL, or the inline handler text
    /// when no URL could be pulled out of it. Never empty.
    pub target: String,
    /// Identifier of the frame the candidate was found in ("main" for the
    /// top document).
    pub source_frame: String,
    /// The extraction rule that produced this candidate.
    pub method: DiscoveryMethod,
}

// ---------------------------------------------------------------------------
// CategorizedDownload
// ---------------------------------------------------------------------------

/// A candidate that matched one of an application's category rules.
///
/// At most one exists per (application, category) within an extraction pass;
/// later candidates matching an already-filled category are dropped.
#[derive(Debug, Clone)]
pub struct CategorizedDownload {
    /// The underlying candidate.
    pub candidate: Candidate,
    /// Owning application surface.
    pub application: Application,
    /// Category name from the application's fixed set.
    pub category: String,
    /// Human-readable category label for logs and reports.
    pub display_name: String,
    /// Extracted version token, or [`UNKNOWN_VERSION`].
    pub version: String,
}

impl CategorizedDownload {
    /// The metadata store key this download is recorded under.
    pub fn key(&self) -> String {
        record_key(self.application, &self.category)
    }
}

// ---------------------------------------------------------------------------
// UpdateRecord
// ---------------------------------------------------------------------------

/// Durable record of the last successfully downloaded artifact for an
/// (application, category) pair. Each new successful download overwrites
/// the prior record for that key.
///
/// Persisted as JSON; fields may be added over time (with defaults for
/// forward readability) but existing keys are never removed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateRecord {
    /// Owning application surface.
    pub application: Application,
    /// Category name within the application.
    pub category: String,
    /// Final artifact file name.
    pub file_name: String,
    /// Absolute path the artifact was written to.
    pub file_path: String,
    /// Measured size of the verified artifact in bytes.
    pub file_size_bytes: u64,
    /// Version token the artifact was downloaded as.
    pub version: String,
    /// SHA-256 of the artifact contents (hex). Empty on records written by
    /// older versions.
    #[serde(default)]
    pub sha256: String,
    /// Completion timestamp of the verified download.
    pub downloaded_at: DateTime<Utc>,
    /// The target the artifact was fetched from.
    pub source_target: String,
}

// ---------------------------------------------------------------------------
// DocumentSnapshot
// ---------------------------------------------------------------------------

/// Rendered HTML of the main document or one accessible frame, captured by
/// the portal session after dynamic content has settled.
///
/// Cross-origin frames the session cannot read are simply absent from the
/// snapshot list; their absence is not an error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentSnapshot {
    /// Frame identifier: "main" for the top document, otherwise the frame's
    /// name or index.
    pub frame: String,
    /// The document's URL, used to resolve relative targets.
    pub url: String,
    /// Serialized outer HTML of the rendered document.
    pub html: String,
}

// ---------------------------------------------------------------------------
// SessionState
// ---------------------------------------------------------------------------

/// Authentication state threaded explicitly through the orchestrator.
#[derive(Debug, Clone, Copy, Default)]
pub struct SessionState {
    /// Whether the current browser session holds a valid portal login.
    pub authenticated: bool,
}
