//! Download executor: resolves destination names, performs retried streaming
//! transfers with the session's cookies, verifies the result, and builds the
//! UpdateRecord handed to the metadata store.
//!
//! Transfers run strictly sequentially — the orchestrator never invokes two
//! downloads concurrently, so the executor holds no synchronization.

mod naming;

use std::path::PathBuf;

use chrono::Utc;
use futures::StreamExt;
use sha2::{Digest, Sha256};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, instrument, warn};

use istawatch_session::{SessionCookie, cookie_header};
use istawatch_shared::{
    CategorizedDownload, Result, RetryPolicy, TransferSettings, UpdateRecord, WatchError, retry,
};

pub use naming::{filename_from_content_disposition, filename_from_url, resolve_file_name};

/// User-Agent string for transfer requests.
const USER_AGENT: &str = concat!("istawatch/", env!("CARGO_PKG_VERSION"));

/// Outcome of one completed (but not yet verified) transfer attempt.
struct TransferOutcome {
    path: PathBuf,
    file_name: String,
    bytes_written: u64,
    sha256: String,
}

/// Streaming artifact downloader sharing the portal session's cookies.
pub struct Downloader {
    client: reqwest::Client,
    settings: TransferSettings,
}

impl Downloader {
    /// Create a downloader with the given transfer settings.
    pub fn new(settings: TransferSettings) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()
            .map_err(|e| WatchError::Transfer(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { client, settings })
    }

    /// Download a decided-new artifact and return its UpdateRecord.
    ///
    /// Transient transfer failures are retried under the configured policy;
    /// a zero-byte result is an integrity failure: the partial file is
    /// removed (best-effort) and no record is produced.
    #[instrument(skip_all, fields(category = %download.category, target = %download.candidate.target))]
    pub async fn download(
        &self,
        download: &CategorizedDownload,
        cookies: &[SessionCookie],
    ) -> Result<UpdateRecord> {
        let target = download.candidate.target.as_str();
        if !target.starts_with("http://") && !target.starts_with("https://") {
            return Err(WatchError::validation(format!(
                "target is not a transferable URL: {target}"
            )));
        }

        let dest_dir = self.settings.root.join(download.application.dir_name());
        tokio::fs::create_dir_all(&dest_dir)
            .await
            .map_err(|e| WatchError::io(&dest_dir, e))?;

        let policy = RetryPolicy::new(
            self.settings.retry_attempts,
            self.settings.retry_backoff,
            self.settings.timeout,
        );

        let outcome = retry(&policy, "artifact transfer", |attempt| {
            debug!(attempt, "starting transfer attempt");
            self.transfer_once(download, cookies, &dest_dir)
        })
        .await?;

        if outcome.bytes_written == 0 {
            warn!(path = ?outcome.path, "zero-byte artifact, discarding");
            // Best-effort cleanup; a leftover empty file is harmless.
            let _ = tokio::fs::remove_file(&outcome.path).await;
            return Err(WatchError::validation(format!(
                "transfer of {target} produced a zero-byte file"
            )));
        }

        let metadata = tokio::fs::metadata(&outcome.path)
            .await
            .map_err(|e| WatchError::io(&outcome.path, e))?;

        let record = UpdateRecord {
            application: download.application,
            category: download.category.clone(),
            file_name: outcome.file_name,
            file_path: outcome.path.display().to_string(),
            file_size_bytes: metadata.len(),
            version: download.version.clone(),
            sha256: outcome.sha256,
            downloaded_at: Utc::now(),
            source_target: target.to_string(),
        };

        info!(
            file = %record.file_name,
            size_bytes = record.file_size_bytes,
            version = %record.version,
            "artifact downloaded"
        );
        Ok(record)
    }

    /// One streaming transfer attempt: GET, stream to disk, hash on the fly.
    async fn transfer_once(
        &self,
        download: &CategorizedDownload,
        cookies: &[SessionCookie],
        dest_dir: &std::path::Path,
    ) -> Result<TransferOutcome> {
        let target = download.candidate.target.as_str();

        let mut request = self.client.get(target);
        if !cookies.is_empty() {
            request = request.header(reqwest::header::COOKIE, cookie_header(cookies));
        }

        let response = request
            .send()
            .await
            .map_err(|e| WatchError::Transfer(format!("{target}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(WatchError::Transfer(format!("{target}: HTTP {status}")));
        }

        // Prefer the server-suggested name, then the URL path segment.
        let disposition_hint = response
            .headers()
            .get(reqwest::header::CONTENT_DISPOSITION)
            .and_then(|v| v.to_str().ok())
            .and_then(naming::filename_from_content_disposition);
        let hint = disposition_hint.or_else(|| naming::filename_from_url(target));

        let file_name = naming::resolve_file_name(
            hint.as_deref(),
            &download.category,
            &download.version,
            target,
        );
        let path = dest_dir.join(&file_name);

        let mut file = tokio::fs::File::create(&path)
            .await
            .map_err(|e| WatchError::io(&path, e))?;

        let mut hasher = Sha256::new();
        let mut bytes_written: u64 = 0;
        let mut stream = response.bytes_stream();

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| WatchError::Transfer(format!("{target}: {e}")))?;
            hasher.update(&chunk);
            bytes_written += chunk.len() as u64;
            file.write_all(&chunk)
                .await
                .map_err(|e| WatchError::io(&path, e))?;
        }

        file.flush().await.map_err(|e| WatchError::io(&path, e))?;

        Ok(TransferOutcome {
            path,
            file_name,
            bytes_written,
            sha256: format!("{:x}", hasher.finalize()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use istawatch_shared::{Application, Candidate, DiscoveryMethod};

    fn make_download(target: &str) -> CategorizedDownload {
        CategorizedDownload {
            candidate: Candidate {
                label: "Installationsdatei ISTA Client".into(),
                target: target.into(),
                source_frame: "main".into(),
                method: DiscoveryMethod::AnchorPath,
            },
            application: Application::IstaOss,
            category: "client".into(),
            display_name: "Client installation package".into(),
            version: "1.2.3.4".into(),
        }
    }

    fn make_settings(root: &std::path::Path) -> TransferSettings {
        TransferSettings {
            root: root.to_path_buf(),
            retry_attempts: 3,
            retry_backoff: Duration::from_millis(1),
            timeout: Duration::from_secs(5),
        }
    }

    #[tokio::test]
    async fn successful_transfer_builds_record() {
        let server = wiremock::MockServer::start().await;
        let body = vec![0xABu8; 4096];

        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .and(wiremock::matchers::path("/delivery/ISTAOSS_1.2.3.4.zip"))
            .respond_with(
                wiremock::ResponseTemplate::new(200)
                    .insert_header("content-disposition", r#"attachment; filename="ISTAOSS_1.2.3.4.zip""#)
                    .set_body_bytes(body.clone()),
            )
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().expect("tempdir");
        let downloader = Downloader::new(make_settings(dir.path())).expect("downloader");
        let download = make_download(&format!("{}/delivery/ISTAOSS_1.2.3.4.zip", server.uri()));

        let record = downloader.download(&download, &[]).await.expect("download");

        assert_eq!(record.file_name, "ISTAOSS_1.2.3.4.zip");
        assert_eq!(record.file_size_bytes, 4096);
        assert_eq!(record.version, "1.2.3.4");
        assert!(!record.sha256.is_empty());
        assert!(record.file_path.contains("ista-oss"));

        let on_disk = std::fs::read(&record.file_path).expect("artifact exists");
        assert_eq!(on_disk, body);
    }

    #[tokio::test]
    async fn zero_byte_result_fails_and_removes_partial_file() {
        let server = wiremock::MockServer::start().await;

        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .respond_with(wiremock::ResponseTemplate::new(200).set_body_bytes(Vec::<u8>::new()))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().expect("tempdir");
        let downloader = Downloader::new(make_settings(dir.path())).expect("downloader");
        let download = make_download(&format!("{}/delivery/empty.zip", server.uri()));

        let result = downloader.download(&download, &[]).await;
        assert!(result.is_err());

        // The partial file must be gone.
        let dest = dir.path().join("ista-oss");
        let leftovers: Vec<_> = std::fs::read_dir(&dest)
            .map(|entries| entries.filter_map(|e| e.ok()).collect())
            .unwrap_or_default();
        assert!(leftovers.is_empty(), "partial file was not removed");
    }

    #[tokio::test]
    async fn transient_http_failure_is_retried() {
        let server = wiremock::MockServer::start().await;

        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .respond_with(wiremock::ResponseTemplate::new(503))
            .up_to_n_times(2)
            .mount(&server)
            .await;
        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .respond_with(wiremock::ResponseTemplate::new(200).set_body_bytes(vec![1u8; 128]))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().expect("tempdir");
        let downloader = Downloader::new(make_settings(dir.path())).expect("downloader");
        let download = make_download(&format!("{}/delivery/fw.bin", server.uri()));

        let record = downloader.download(&download, &[]).await.expect("download");
        assert_eq!(record.file_size_bytes, 128);
    }

    #[tokio::test]
    async fn exhausted_retries_report_failure() {
        let server = wiremock::MockServer::start().await;

        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .respond_with(wiremock::ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().expect("tempdir");
        let downloader = Downloader::new(make_settings(dir.path())).expect("downloader");
        let download = make_download(&format!("{}/delivery/fw.bin", server.uri()));

        let err = downloader.download(&download, &[]).await.unwrap_err();
        assert!(matches!(err, WatchError::Transfer(_)));
    }

    #[tokio::test]
    async fn non_url_target_is_a_structural_failure() {
        let dir = tempfile::tempdir().expect("tempdir");
        let downloader = Downloader::new(make_settings(dir.path())).expect("downloader");
        let download = make_download("triggerFirmwareDownload()");

        let err = downloader.download(&download, &[]).await.unwrap_err();
        assert!(matches!(err, WatchError::Validation { .. }));
        assert!(!err.is_transient());
    }

    #[tokio::test]
    async fn cookies_are_forwarded_to_the_server() {
        let server = wiremock::MockServer::start().await;

        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .and(wiremock::matchers::header("cookie", "session=abc123"))
            .respond_with(wiremock::ResponseTemplate::new(200).set_body_bytes(vec![9u8; 64]))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().expect("tempdir");
        let downloader = Downloader::new(make_settings(dir.path())).expect("downloader");
        let download = make_download(&format!("{}/delivery/client.zip", server.uri()));

        let cookies = vec![SessionCookie {
            name: "session".into(),
            value: "abc123".into(),
            domain: "portal.example.com".into(),
        }];

        let record = downloader
            .download(&download, &cookies)
            .await
            .expect("download with cookies");
        assert_eq!(record.file_size_bytes, 64);
    }
}
