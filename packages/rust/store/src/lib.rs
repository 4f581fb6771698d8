//! Durable metadata store: one JSON mapping file under the download root.
//!
//! Keys are `<application>_<category>` strings, values are [`UpdateRecord`]s.
//! The file is loaded once at process start and rewritten in full after
//! every successful download (write-whole-file, not an incremental log).
//! A crash between download completion and the write causes a re-download
//! on the next run, which is idempotent.
//!
//! **Access rules:** the whole pipeline drives the store from a single
//! logical sequence, so no internal locking is needed.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use istawatch_shared::{Result, UpdateRecord, WatchError};

/// File name of the mapping file under the download root.
pub const STORE_FILE_NAME: &str = "manifest.json";

/// Durable mapping from `<application>_<category>` to the last successfully
/// downloaded artifact's record.
pub struct MetadataStore {
    path: PathBuf,
    records: BTreeMap<String, UpdateRecord>,
}

impl MetadataStore {
    /// Load the store from `<root>/manifest.json`.
    ///
    /// A missing or corrupt file is never fatal: the store starts empty and
    /// the first successful downloads rebuild it.
    pub fn load(root: &Path) -> Result<Self> {
        let path = root.join(STORE_FILE_NAME);

        let records = match std::fs::read_to_string(&path) {
            Ok(content) => match serde_json::from_str::<BTreeMap<String, UpdateRecord>>(&content) {
                Ok(records) => {
                    debug!(?path, entries = records.len(), "metadata store loaded");
                    records
                }
                Err(e) => {
                    warn!(?path, error = %e, "corrupt metadata store, starting empty");
                    BTreeMap::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!(?path, "no metadata store yet, starting empty");
                BTreeMap::new()
            }
            Err(e) => return Err(WatchError::io(&path, e)),
        };

        Ok(Self { path, records })
    }

    /// The stored record for a composite key, if any.
    pub fn get(&self, key: &str) -> Option<&UpdateRecord> {
        self.records.get(key)
    }

    /// The last-known version for a key, if any.
    pub fn last_version(&self, key: &str) -> Option<&str> {
        self.records.get(key).map(|r| r.version.as_str())
    }

    /// Overwrite the entry for `key` and immediately persist the whole
    /// mapping back to disk.
    pub fn put(&mut self, key: &str, record: UpdateRecord) -> Result<()> {
        self.records.insert(key.to_string(), record);
        self.persist()
    }

    /// Number of stored records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the store holds no records.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Iterate stored records in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &UpdateRecord)> {
        self.records.iter()
    }

    fn persist(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| WatchError::io(parent, e))?;
        }

        let content = serde_json::to_string_pretty(&self.records)
            .map_err(|e| WatchError::Store(format!("serialize metadata store: {e}")))?;

        std::fs::write(&self.path, content).map_err(|e| WatchError::io(&self.path, e))?;
        debug!(path = ?self.path, entries = self.records.len(), "metadata store written");
        Ok(())
    }
}
