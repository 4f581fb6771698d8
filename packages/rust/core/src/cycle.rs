//! Update cycle orchestration.
//!
//! One cycle: authenticate (skipped when the session already holds a login)
//! → per-application navigate/extract/categorize/decide → sequential,
//! rate-limited downloads → metadata commit. Failures are isolated per
//! application and per download; nothing in a running cycle terminates the
//! process. The watch loop repeats cycles on a timer and optionally replaces
//! the browser session between cycles.

use std::time::Duration;

use tracing::{debug, info, instrument, warn};

use istawatch_classify::categorize;
use istawatch_downloader::Downloader;
use istawatch_extractor::extract_candidates;
use istawatch_session::{PortalSession, login};
use istawatch_shared::{
    AppConfig, Application, CategorizedDownload, Result, RetryPolicy, SessionState,
    TransferSettings, UpdateRecord, WatchError, retry,
};
use istawatch_store::MetadataStore;

use crate::decision::decide;

/// Navigation attempts per application page.
const NAV_RETRY_ATTEMPTS: u32 = 2;

/// Back-off between navigation attempts.
const NAV_RETRY_BACKOFF: Duration = Duration::from_secs(2);

/// Selector used to wait for dynamically rendered download content.
const SETTLE_SELECTOR: &str = "a[href], button";

// ---------------------------------------------------------------------------
// Report & observer
// ---------------------------------------------------------------------------

/// Aggregate result of one update cycle.
#[derive(Debug, Clone, Copy, Default)]
pub struct CycleReport {
    /// Downloads completed, verified, and recorded.
    pub success_count: usize,
    /// Downloads that failed after retries or verification.
    pub fail_count: usize,
    /// Whether the cycle got past authentication.
    pub authenticated: bool,
}

/// Progress callbacks for reporting cycle status.
pub trait CycleObserver: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called when an application's pass begins.
    fn application(&self, application: Application);
    /// Called before a download starts.
    fn download_started(&self, download: &CategorizedDownload);
    /// Called after a verified, recorded download.
    fn download_succeeded(&self, record: &UpdateRecord);
    /// Called after a download fails.
    fn download_failed(&self, download: &CategorizedDownload, error: &WatchError);
    /// Called when the cycle completes.
    fn done(&self, report: &CycleReport);
}

/// No-op observer for headless/test usage.
pub struct SilentObserver;

impl CycleObserver for SilentObserver {
    fn phase(&self, _name: &str) {}
    fn application(&self, _application: Application) {}
    fn download_started(&self, _download: &CategorizedDownload) {}
    fn download_succeeded(&self, _record: &UpdateRecord) {}
    fn download_failed(&self, _download: &CategorizedDownload, _error: &WatchError) {}
    fn done(&self, _report: &CycleReport) {}
}

// ---------------------------------------------------------------------------
// Cycle
// ---------------------------------------------------------------------------

/// Run one full update cycle. Idempotent and safe to invoke repeatedly.
///
/// A failed authentication aborts the cycle (no applications are checked)
/// but not the process; the next cycle retries from scratch.
#[instrument(skip_all)]
pub async fn run_update_cycle(
    session: &dyn PortalSession,
    config: &AppConfig,
    store: &mut MetadataStore,
    state: &mut SessionState,
    observer: &dyn CycleObserver,
) -> CycleReport {
    let mut report = CycleReport::default();

    observer.phase("Authenticating");
    if let Err(e) = login(session, config, state).await {
        warn!(error = %e, "authentication failed, aborting cycle");
        state.authenticated = false;
        observer.done(&report);
        return report;
    }
    report.authenticated = true;

    let downloader = match Downloader::new(TransferSettings::from(config)) {
        Ok(d) => d,
        Err(e) => {
            warn!(error = %e, "cannot build transfer client, aborting cycle");
            observer.done(&report);
            return report;
        }
    };

    // Cookie export failure degrades to an unauthenticated transfer client;
    // the portal will reject it and the failure surfaces per download.
    let cookies = match session.export_cookies().await {
        Ok(cookies) => cookies,
        Err(e) => {
            warn!(error = %e, "cookie export failed, transfers run without session cookies");
            Vec::new()
        }
    };

    let courtesy_delay = Duration::from_secs(config.downloads.courtesy_delay_secs);

    for application in Application::all() {
        observer.application(application);

        let decided_new = match collect_new_downloads(session, config, store, application).await {
            Ok(list) => list,
            Err(e) => {
                // Failures do not cross application boundaries.
                warn!(app = %application, error = %e, "application pass failed, skipping");
                continue;
            }
        };

        observer.phase("DownloadingSequentially");
        for (i, download) in decided_new.iter().enumerate() {
            if i > 0 && !courtesy_delay.is_zero() {
                tokio::time::sleep(courtesy_delay).await;
            }

            observer.download_started(download);
            match downloader.download(download, &cookies).await {
                Ok(record) => match store.put(&download.key(), record.clone()) {
                    Ok(()) => {
                        observer.download_succeeded(&record);
                        report.success_count += 1;
                    }
                    Err(e) => {
                        warn!(key = %download.key(), error = %e, "metadata commit failed");
                        observer.download_failed(download, &e);
                        report.fail_count += 1;
                    }
                },
                Err(e) => {
                    warn!(
                        category = %download.category,
                        target = %download.candidate.target,
                        error = %e,
                        "download failed"
                    );
                    observer.download_failed(download, &e);
                    report.fail_count += 1;
                }
            }
        }
    }

    info!(
        successes = report.success_count,
        failures = report.fail_count,
        "update cycle complete"
    );
    observer.done(&report);
    report
}

/// Navigate to one application's downloads page, extract and categorize
/// candidates, and return the ones decided as new, in category order.
async fn collect_new_downloads(
    session: &dyn PortalSession,
    config: &AppConfig,
    store: &MetadataStore,
    application: Application,
) -> Result<Vec<CategorizedDownload>> {
    let url = config.application_url(application);
    let nav_timeout = Duration::from_secs(config.browser.nav_timeout_secs);
    let settle_timeout = Duration::from_secs(config.browser.settle_timeout_secs);

    let nav_policy = RetryPolicy::without_timeout(NAV_RETRY_ATTEMPTS, NAV_RETRY_BACKOFF);
    retry(&nav_policy, "navigation", |_| {
        session.navigate(&url, nav_timeout)
    })
    .await?;

    // A page with no interactive content after the settle window is still
    // snapshotted; extraction just comes back empty.
    if let Err(e) = session
        .wait_for_selector(SETTLE_SELECTOR, settle_timeout)
        .await
    {
        debug!(app = %application, error = %e, "page did not settle, snapshotting anyway");
    }

    let snapshots = session.snapshot_documents().await?;
    let candidates = extract_candidates(&snapshots);

    if candidates.is_empty() {
        info!(app = %application, "no download candidates found");
        return Ok(Vec::new());
    }

    let categorized = categorize(application, &candidates);
    let mut decided_new = Vec::new();

    for (category, download) in categorized {
        let key = download.key();
        let decision = decide(&download, store.last_version(&key));
        info!(
            app = %application,
            category = %category,
            version = %decision.display_version,
            is_new = decision.is_new,
            reason = ?decision.reason,
            "update decision"
        );
        if decision.is_new {
            decided_new.push(download);
        }
    }

    Ok(decided_new)
}

// ---------------------------------------------------------------------------
// Watch loop
// ---------------------------------------------------------------------------

/// Run update cycles forever, sleeping the configured interval between them.
///
/// Failing to create the first session is the only fatal error; afterwards
/// a failed session replacement keeps the current session and retries on
/// the next cycle. Terminates only by external cancellation.
pub async fn run_watch_loop<S, F, Fut>(
    make_session: F,
    config: &AppConfig,
    store: &mut MetadataStore,
    observer: &dyn CycleObserver,
) -> Result<()>
where
    S: PortalSession,
    F: Fn() -> Fut,
    Fut: Future<Output = Result<S>>,
{
    let interval = Duration::from_secs(config.schedule.interval_minutes * 60);

    let mut session = make_session().await?;
    let mut state = SessionState::default();

    loop {
        let report = run_update_cycle(&session, config, store, &mut state, observer).await;
        debug!(
            successes = report.success_count,
            failures = report.fail_count,
            sleep_secs = interval.as_secs(),
            "cycle finished, sleeping"
        );

        observer.phase("Sleeping");
        tokio::time::sleep(interval).await;

        // Replacing the session bounds browser resource growth across long
        // runs; a fresh session also re-authenticates on the next cycle.
        if config.schedule.refresh_session {
            match make_session().await {
                Ok(fresh) => {
                    session = fresh;
                    state = SessionState::default();
                }
                Err(e) => {
                    warn!(error = %e, "session replacement failed, keeping current session");
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
