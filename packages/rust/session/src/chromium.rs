//! Chromium-backed portal session using chromiumoxide.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::page::Page;
use futures::StreamExt;
use tracing::{debug, info, warn};

use istawatch_shared::{BrowserConfig as BrowserSettings, DocumentSnapshot, Result, WatchError};

use crate::{PortalSession, SessionCookie};

/// Poll interval for selector waits.
const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// In-page script that serializes the main document and every accessible
/// frame. Cross-origin frame access throws; those frames are skipped so the
/// result is always a partial-but-valid list.
const SNAPSHOT_SCRIPT: &str = r#"
(() => {
  const docs = [];
  const walk = (win, name) => {
    let doc;
    try {
      doc = win.document;
      docs.push({
        frame: name,
        url: doc.location.href,
        html: doc.documentElement ? doc.documentElement.outerHTML : "",
      });
    } catch (e) {
      return; // cross-origin frame
    }
    for (let i = 0; i < win.frames.length; i++) {
      let childName;
      try {
        childName = win.frames[i].name || String(i);
      } catch (e) {
        childName = String(i);
      }
      walk(win.frames[i], name === "main" ? "frame:" + childName : name + "." + childName);
    }
  };
  walk(window, "main");
  return docs;
})()
"#;

/// Find the Chromium binary path.
pub fn find_chromium(configured: &str) -> Option<PathBuf> {
    // 1. Explicit config value
    if !configured.is_empty() {
        let path = PathBuf::from(configured);
        if path.exists() {
            return Some(path);
        }
        warn!(?path, "configured chromium_path does not exist, falling back to auto-detect");
    }

    // 2. ISTAWATCH_CHROMIUM_PATH env
    if let Ok(p) = std::env::var("ISTAWATCH_CHROMIUM_PATH") {
        let path = PathBuf::from(&p);
        if path.exists() {
            return Some(path);
        }
    }

    // 3. ~/.istawatch/chromium/
    if let Some(home) = dirs::home_dir() {
        let candidates = [
            home.join(".istawatch/chromium/chrome-linux64/chrome"),
            home.join(".istawatch/chromium/chrome"),
        ];
        for c in candidates {
            if c.exists() {
                return Some(c);
            }
        }
    }

    // 4. System PATH
    for binary in ["google-chrome", "chromium", "chromium-browser"] {
        if let Ok(path) = which::which(binary) {
            return Some(path);
        }
    }

    // 5. Common macOS location
    if cfg!(target_os = "macos") {
        let common = PathBuf::from("/Applications/Google Chrome.app/Contents/MacOS/Google Chrome");
        if common.exists() {
            return Some(common);
        }
    }

    None
}

/// A headless Chromium session holding one page for the whole cycle.
///
/// The browser process is released when the session is dropped.
pub struct ChromiumSession {
    /// Held for its lifetime: dropping the handle releases the browser process.
    #[allow(dead_code)]
    browser: Browser,
    page: Page,
}

impl ChromiumSession {
    /// Launch a headless Chromium and open a blank page.
    ///
    /// Failing to acquire the browser here is the one fatal startup error of
    /// the whole process; everything after launch degrades per-step.
    pub async fn launch(settings: &BrowserSettings) -> Result<Self> {
        let chrome_path = find_chromium(&settings.chromium_path).ok_or_else(|| {
            WatchError::Session(
                "Chromium not found. Set [browser] chromium_path or install google-chrome.".into(),
            )
        })?;

        info!(path = %chrome_path.display(), headless = settings.headless, "launching browser");

        let mut builder = BrowserConfig::builder()
            .chrome_executable(chrome_path)
            .arg("--disable-gpu")
            .arg("--no-sandbox")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-extensions")
            .arg("--disable-background-networking");
        if settings.headless {
            builder = builder.arg("--headless=new");
        } else {
            builder = builder.with_head();
        }

        let config = builder
            .build()
            .map_err(|e| WatchError::Session(format!("failed to build browser config: {e}")))?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| WatchError::Session(format!("failed to launch Chromium: {e}")))?;

        // Drain CDP events for the lifetime of the browser.
        tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                let _ = event;
            }
        });

        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|e| WatchError::Session(format!("failed to create page: {e}")))?;

        Ok(Self { browser, page })
    }

    async fn find(&self, selector: &str) -> Result<chromiumoxide::element::Element> {
        self.page
            .find_element(selector)
            .await
            .map_err(|e| WatchError::Session(format!("element {selector} not found: {e}")))
    }
}

#[async_trait]
impl PortalSession for ChromiumSession {
    async fn navigate(&self, url: &str, timeout: Duration) -> Result<String> {
        debug!(%url, "navigating");

        let result = tokio::time::timeout(timeout, self.page.goto(url)).await;

        match result {
            Ok(Ok(_)) => {
                let _ = self.page.wait_for_navigation().await;
                self.current_url().await
            }
            Ok(Err(e)) => Err(WatchError::Session(format!("navigation to {url} failed: {e}"))),
            Err(_) => Err(WatchError::timeout(
                format!("navigation to {url}"),
                timeout.as_secs(),
            )),
        }
    }

    async fn snapshot_documents(&self) -> Result<Vec<DocumentSnapshot>> {
        let result = self
            .page
            .evaluate(SNAPSHOT_SCRIPT)
            .await
            .map_err(|e| WatchError::Session(format!("snapshot script failed: {e}")))?;

        let snapshots: Vec<DocumentSnapshot> = result
            .into_value()
            .map_err(|e| WatchError::Session(format!("snapshot result malformed: {e:?}")))?;

        debug!(documents = snapshots.len(), "captured document snapshots");
        Ok(snapshots)
    }

    async fn click(&self, selector: &str) -> Result<()> {
        let element = self.find(selector).await?;
        element
            .click()
            .await
            .map_err(|e| WatchError::Session(format!("click {selector} failed: {e}")))?;
        Ok(())
    }

    async fn fill(&self, selector: &str, value: &str) -> Result<()> {
        let element = self.find(selector).await?;
        element
            .click()
            .await
            .map_err(|e| WatchError::Session(format!("focus {selector} failed: {e}")))?;
        element
            .type_str(value)
            .await
            .map_err(|e| WatchError::Session(format!("type into {selector} failed: {e}")))?;
        Ok(())
    }

    async fn wait_for_selector(&self, selector: &str, timeout: Duration) -> Result<()> {
        let deadline = Instant::now() + timeout;
        loop {
            if self.page.find_element(selector).await.is_ok() {
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(WatchError::timeout(
                    format!("waiting for {selector}"),
                    timeout.as_secs(),
                ));
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    async fn is_present(&self, selector: &str) -> Result<bool> {
        Ok(self.page.find_element(selector).await.is_ok())
    }

    async fn current_url(&self) -> Result<String> {
        let url = self
            .page
            .url()
            .await
            .map_err(|e| WatchError::Session(format!("failed to read URL: {e}")))?
            .map(|u| u.to_string())
            .unwrap_or_default();
        Ok(url)
    }

    async fn export_cookies(&self) -> Result<Vec<SessionCookie>> {
        let cookies = self
            .page
            .get_cookies()
            .await
            .map_err(|e| WatchError::Session(format!("failed to export cookies: {e}")))?;

        Ok(cookies
            .into_iter()
            .map(|c| SessionCookie {
                name: c.name,
                value: c.value,
                domain: c.domain,
            })
            .collect())
    }
}
