//! Browser session abstraction for the service portal.
//!
//! Defines the [`PortalSession`] trait the pipeline drives (navigation,
//! rendered-document snapshots, form interaction, cookie export) and the
//! Chromium-backed implementation in [`chromium`]. The pipeline itself never
//! touches a browser API directly, which keeps the orchestrator testable
//! against an in-memory fake.

pub mod chromium;
mod login;

use std::time::Duration;

use async_trait::async_trait;

use istawatch_shared::{DocumentSnapshot, Result};

pub use chromium::{ChromiumSession, find_chromium};
pub use login::login;

/// An authenticated-capable browser session against the portal.
///
/// Snapshot semantics: `snapshot_documents` returns the rendered main
/// document plus every *accessible* nested frame. Cross-origin frames are
/// silently absent — partial results, never an error.
#[async_trait]
pub trait PortalSession: Send + Sync {
    /// Navigate to `url` and wait for the load to complete within `timeout`.
    /// Returns the URL the page settled on.
    async fn navigate(&self, url: &str, timeout: Duration) -> Result<String>;

    /// Capture the rendered main document and all accessible frames.
    async fn snapshot_documents(&self) -> Result<Vec<DocumentSnapshot>>;

    /// Click the first element matching `selector`.
    async fn click(&self, selector: &str) -> Result<()>;

    /// Focus the first element matching `selector` and type `value` into it.
    async fn fill(&self, selector: &str, value: &str) -> Result<()>;

    /// Poll until `selector` matches an element, or time out.
    async fn wait_for_selector(&self, selector: &str, timeout: Duration) -> Result<()>;

    /// Whether `selector` currently matches an element.
    async fn is_present(&self, selector: &str) -> Result<bool>;

    /// The page's current URL.
    async fn current_url(&self) -> Result<String>;

    /// Export the session's cookies so the transfer client can share the
    /// portal authentication.
    async fn export_cookies(&self) -> Result<Vec<SessionCookie>>;
}

/// A cookie exported from the browser session.
#[derive(Debug, Clone)]
pub struct SessionCookie {
    pub name: String,
    pub value: String,
    pub domain: String,
}

/// Render exported cookies as a `Cookie` request-header value.
pub fn cookie_header(cookies: &[SessionCookie]) -> String {
    cookies
        .iter()
        .map(|c| format!("{}={}", c.name, c.value))
        .collect::<Vec<_>>()
        .join("; ")
}
