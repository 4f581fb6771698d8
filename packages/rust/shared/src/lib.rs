//! Shared types, error model, and configuration for istawatch.
//!
//! This crate is the foundation depended on by all other istawatch crates.
//! It provides:
//! - [`WatchError`] — the unified error type
//! - Domain types ([`Candidate`], [`CategorizedDownload`], [`UpdateRecord`], [`Application`])
//! - Configuration ([`AppConfig`], [`TransferSettings`], config loading)
//! - The bounded-retry combinator ([`retry`])

pub mod config;
pub mod error;
pub mod retry;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, ApplicationsConfig, BrowserConfig, DownloadsConfig, PortalConfig, ScheduleConfig,
    TransferSettings, config_dir, config_file_path, init_config, load_config, load_config_from,
    validate_credentials,
};
pub use error::{Result, WatchError};
pub use retry::{RetryPolicy, retry};
pub use types::{
    Application, Candidate, CategorizedDownload, DiscoveryMethod, DocumentSnapshot, SessionState,
    UNKNOWN_VERSION, UpdateRecord, record_key,
};
