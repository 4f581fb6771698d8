//! Application configuration for istawatch.
//!
//! User config lives at `~/.istawatch/istawatch.toml`.
//! CLI flags override config file values, which override defaults.
//! Credentials are referenced by environment variable *name* and never
//! stored in the file.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Result, WatchError};
use crate::types::Application;

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "istawatch.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".istawatch";

// ---------------------------------------------------------------------------
// Config structs (matching istawatch.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Portal endpoint and login selectors.
    #[serde(default)]
    pub portal: PortalConfig,

    /// Per-application download page paths.
    #[serde(default)]
    pub applications: ApplicationsConfig,

    /// Download directory and transfer policies.
    #[serde(default)]
    pub downloads: DownloadsConfig,

    /// Cycle scheduling.
    #[serde(default)]
    pub schedule: ScheduleConfig,

    /// Browser session settings.
    #[serde(default)]
    pub browser: BrowserConfig,
}

/// `[portal]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortalConfig {
    /// Portal origin, e.g. `https://portal.example.com`.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Path of the login page relative to `base_url`.
    #[serde(default = "default_login_path")]
    pub login_path: String,

    /// Name of the env var holding the portal username (never the value).
    #[serde(default = "default_username_env")]
    pub username_env: String,

    /// Name of the env var holding the portal password (never the value).
    #[serde(default = "default_password_env")]
    pub password_env: String,

    /// Selector of the username input on the login page.
    #[serde(default = "default_username_selector")]
    pub username_selector: String,

    /// Selector of the password input on the login page.
    #[serde(default = "default_password_selector")]
    pub password_selector: String,

    /// Selector of the login submit control.
    #[serde(default = "default_submit_selector")]
    pub submit_selector: String,

    /// Selector that is only present once the session is logged in.
    #[serde(default = "default_logged_in_selector")]
    pub logged_in_selector: String,
}

impl Default for PortalConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            login_path: default_login_path(),
            username_env: default_username_env(),
            password_env: default_password_env(),
            username_selector: default_username_selector(),
            password_selector: default_password_selector(),
            submit_selector: default_submit_selector(),
            logged_in_selector: default_logged_in_selector(),
        }
    }
}

fn default_base_url() -> String {
    "https://portal.example.com".into()
}
fn default_login_path() -> String {
    "/login".into()
}
fn default_username_env() -> String {
    "ISTAWATCH_USERNAME".into()
}
fn default_password_env() -> String {
    "ISTAWATCH_PASSWORD".into()
}
fn default_username_selector() -> String {
    "input[name='username']".into()
}
fn default_password_selector() -> String {
    "input[name='password']".into()
}
fn default_submit_selector() -> String {
    "button[type='submit']".into()
}
fn default_logged_in_selector() -> String {
    "nav .user-menu".into()
}

/// `[applications]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplicationsConfig {
    /// Downloads page path for the classic surface.
    #[serde(default = "default_ista_path")]
    pub ista_path: String,

    /// Downloads page path for the open-source-stack surface.
    #[serde(default = "default_istaoss_path")]
    pub istaoss_path: String,
}

impl Default for ApplicationsConfig {
    fn default() -> Self {
        Self {
            ista_path: default_ista_path(),
            istaoss_path: default_istaoss_path(),
        }
    }
}

fn default_ista_path() -> String {
    "/ista/downloads".into()
}
fn default_istaoss_path() -> String {
    "/ista-oss/downloads".into()
}

/// `[downloads]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadsConfig {
    /// Root directory for downloaded artifacts.
    #[serde(default = "default_download_root")]
    pub root: String,

    /// Transfer attempts before a download is reported failed.
    #[serde(default = "default_retry_attempts")]
    pub retry_attempts: u32,

    /// Fixed back-off between transfer attempts.
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,

    /// Per-attempt transfer deadline.
    #[serde(default = "default_transfer_timeout_secs")]
    pub transfer_timeout_secs: u64,

    /// Courtesy delay between successive downloads within one cycle.
    #[serde(default = "default_courtesy_delay_secs")]
    pub courtesy_delay_secs: u64,
}

impl Default for DownloadsConfig {
    fn default() -> Self {
        Self {
            root: default_download_root(),
            retry_attempts: default_retry_attempts(),
            retry_backoff_ms: default_retry_backoff_ms(),
            transfer_timeout_secs: default_transfer_timeout_secs(),
            courtesy_delay_secs: default_courtesy_delay_secs(),
        }
    }
}

fn default_download_root() -> String {
    "~/istawatch-artifacts".into()
}
fn default_retry_attempts() -> u32 {
    3
}
fn default_retry_backoff_ms() -> u64 {
    2000
}
fn default_transfer_timeout_secs() -> u64 {
    600
}
fn default_courtesy_delay_secs() -> u64 {
    5
}

/// `[schedule]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleConfig {
    /// Minutes between update cycles.
    #[serde(default = "default_interval_minutes")]
    pub interval_minutes: u64,

    /// Replace the browser session between cycles to bound resource growth.
    #[serde(default = "default_true")]
    pub refresh_session: bool,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            interval_minutes: default_interval_minutes(),
            refresh_session: default_true(),
        }
    }
}

fn default_interval_minutes() -> u64 {
    360
}
fn default_true() -> bool {
    true
}

/// `[browser]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrowserConfig {
    /// Explicit Chromium binary path. Empty = auto-detect.
    #[serde(default)]
    pub chromium_path: String,

    /// Run the browser headless.
    #[serde(default = "default_true")]
    pub headless: bool,

    /// Navigation deadline per page load.
    #[serde(default = "default_nav_timeout_secs")]
    pub nav_timeout_secs: u64,

    /// How long to wait for dynamically rendered content to settle.
    #[serde(default = "default_settle_timeout_secs")]
    pub settle_timeout_secs: u64,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            chromium_path: String::new(),
            headless: default_true(),
            nav_timeout_secs: default_nav_timeout_secs(),
            settle_timeout_secs: default_settle_timeout_secs(),
        }
    }
}

fn default_nav_timeout_secs() -> u64 {
    45
}
fn default_settle_timeout_secs() -> u64 {
    15
}

// ---------------------------------------------------------------------------
// Derived runtime settings
// ---------------------------------------------------------------------------

/// Runtime transfer settings — derived from config with the download root
/// expanded to an absolute path.
#[derive(Debug, Clone)]
pub struct TransferSettings {
    /// Expanded download root directory.
    pub root: PathBuf,
    /// Transfer attempts before a download is reported failed.
    pub retry_attempts: u32,
    /// Fixed back-off between attempts.
    pub retry_backoff: Duration,
    /// Per-attempt transfer deadline.
    pub timeout: Duration,
}

impl From<&AppConfig> for TransferSettings {
    fn from(config: &AppConfig) -> Self {
        Self {
            root: expand_home(&config.downloads.root),
            retry_attempts: config.downloads.retry_attempts,
            retry_backoff: Duration::from_millis(config.downloads.retry_backoff_ms),
            timeout: Duration::from_secs(config.downloads.transfer_timeout_secs),
        }
    }
}

impl AppConfig {
    /// Absolute URL of an application's downloads page.
    pub fn application_url(&self, application: Application) -> String {
        let path = match application {
            Application::Ista => &self.applications.ista_path,
            Application::IstaOss => &self.applications.istaoss_path,
        };
        format!(
            "{}/{}",
            self.portal.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    /// Absolute URL of the login page.
    pub fn login_url(&self) -> String {
        format!(
            "{}/{}",
            self.portal.base_url.trim_end_matches('/'),
            self.portal.login_path.trim_start_matches('/')
        )
    }
}

/// Expand a leading `~` to the user's home directory.
fn expand_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.istawatch/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| WatchError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.istawatch/istawatch.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| WatchError::io(path, e))?;

    toml::from_str(&content)
        .map_err(|e| WatchError::config(format!("failed to parse {}: {e}", path.display())))
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| WatchError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| WatchError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| WatchError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

/// Check that the credential env vars are set and non-empty.
pub fn validate_credentials(config: &AppConfig) -> Result<()> {
    for var_name in [&config.portal.username_env, &config.portal.password_env] {
        match std::env::var(var_name) {
            Ok(val) if !val.is_empty() => {}
            _ => {
                return Err(WatchError::config(format!(
                    "portal credentials not found. Set the {var_name} environment variable."
                )));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize default config");
        assert!(toml_str.contains("base_url"));
        assert!(toml_str.contains("ISTAWATCH_USERNAME"));
    }

    #[test]
    fn config_roundtrip() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize");
        let parsed: AppConfig = toml::from_str(&toml_str).expect("deserialize");
        assert_eq!(parsed.downloads.retry_attempts, 3);
        assert_eq!(parsed.schedule.interval_minutes, 360);
        assert_eq!(parsed.portal.username_env, "ISTAWATCH_USERNAME");
    }

    #[test]
    fn partial_config_fills_defaults() {
        let toml_str = r#"
[portal]
base_url = "https://aos.example.com"

[downloads]
root = "/srv/artifacts"
"#;
        let config: AppConfig = toml::from_str(toml_str).expect("parse");
        assert_eq!(config.portal.base_url, "https://aos.example.com");
        assert_eq!(config.downloads.root, "/srv/artifacts");
        // Unspecified sections still get defaults
        assert_eq!(config.downloads.retry_attempts, 3);
        assert_eq!(config.browser.nav_timeout_secs, 45);
    }

    #[test]
    fn application_urls_join_cleanly() {
        let mut config = AppConfig::default();
        config.portal.base_url = "https://aos.example.com/".into();
        config.applications.ista_path = "ista/downloads".into();

        assert_eq!(
            config.application_url(Application::Ista),
            "https://aos.example.com/ista/downloads"
        );
        assert_eq!(config.login_url(), "https://aos.example.com/login");
    }

    #[test]
    fn transfer_settings_from_config() {
        let mut config = AppConfig::default();
        config.downloads.root = "/srv/artifacts".into();
        let settings = TransferSettings::from(&config);
        assert_eq!(settings.root, PathBuf::from("/srv/artifacts"));
        assert_eq!(settings.retry_attempts, 3);
        assert_eq!(settings.retry_backoff, Duration::from_millis(2000));
    }

    #[test]
    fn credential_validation() {
        let mut config = AppConfig::default();
        // Use a unique env var name to avoid interfering with other tests
        config.portal.username_env = "ISTAWATCH_TEST_NONEXISTENT_USER_12345".into();
        let result = validate_credentials(&config);
        assert!(result.is_err());
        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("credentials not found")
        );
    }
}
