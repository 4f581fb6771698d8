//! Portal login flow.
//!
//! Credentials are read from the env vars named in the config and typed into
//! the login form. The logged-in marker selector decides both "already
//! signed in" short-circuits and post-submit success.

use std::time::Duration;

use tracing::{debug, info, instrument};

use istawatch_shared::{AppConfig, Result, SessionState, WatchError};

use crate::PortalSession;

/// Authenticate the session against the portal.
///
/// Skipped entirely when `state.authenticated` is already set. On failure
/// the state is left unauthenticated and the error is returned to the
/// caller, which aborts the current cycle but not the process.
#[instrument(skip_all)]
pub async fn login(
    session: &dyn PortalSession,
    config: &AppConfig,
    state: &mut SessionState,
) -> Result<()> {
    if state.authenticated {
        debug!("session already authenticated, skipping login");
        return Ok(());
    }

    let nav_timeout = Duration::from_secs(config.browser.nav_timeout_secs);
    let settle_timeout = Duration::from_secs(config.browser.settle_timeout_secs);

    session.navigate(&config.login_url(), nav_timeout).await?;

    // A still-valid cookie session lands straight on a logged-in page.
    if session.is_present(&config.portal.logged_in_selector).await? {
        info!("portal session still valid, no login needed");
        state.authenticated = true;
        return Ok(());
    }

    let username = read_credential(&config.portal.username_env)?;
    let password = read_credential(&config.portal.password_env)?;

    session
        .wait_for_selector(&config.portal.username_selector, settle_timeout)
        .await?;
    session
        .fill(&config.portal.username_selector, &username)
        .await?;
    session
        .fill(&config.portal.password_selector, &password)
        .await?;
    session.click(&config.portal.submit_selector).await?;

    session
        .wait_for_selector(&config.portal.logged_in_selector, nav_timeout)
        .await?;

    info!("portal login succeeded");
    state.authenticated = true;
    Ok(())
}

fn read_credential(var_name: &str) -> Result<String> {
    match std::env::var(var_name) {
        Ok(value) if !value.is_empty() => Ok(value),
        _ => Err(WatchError::config(format!(
            "portal credentials not found. Set the {var_name} environment variable."
        ))),
    }
}
