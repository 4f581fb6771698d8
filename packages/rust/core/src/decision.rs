//! Update decision engine.
//!
//! Pure and synchronous: given a categorized candidate and the last recorded
//! version for its store key, decide whether the candidate is a new release.
//!
//! Versions are compared by exact string inequality, not semantic ordering —
//! a reformatting of the same release (e.g. leading zeros) is detected as
//! new. This matches the portal's behavior of never re-publishing an
//! artifact under a reformatted version, and is kept deliberately.

use istawatch_shared::{CategorizedDownload, UNKNOWN_VERSION};

/// Why a decision came out the way it did, for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecisionReason {
    /// Nothing recorded for this key yet; always download.
    NoPriorRecord,
    /// The candidate's version could not be extracted; never download, so a
    /// degraded extraction pass cannot trigger redundant transfers.
    UnknownVersion,
    /// Candidate version differs from the stored one.
    VersionChanged,
    /// Candidate version equals the stored one.
    VersionUnchanged,
}

/// Outcome of the update decision for one categorized candidate.
#[derive(Debug, Clone)]
pub struct Decision {
    /// Whether the candidate should be downloaded.
    pub is_new: bool,
    /// The reason, for diagnostics.
    pub reason: DecisionReason,
    /// The version string to display in logs and reports.
    pub display_version: String,
}

/// Decide whether `download` is new relative to the last stored version for
/// its (application, category) key.
pub fn decide(download: &CategorizedDownload, stored_version: Option<&str>) -> Decision {
    let version = download.version.as_str();

    let (is_new, reason) = match stored_version {
        None => (true, DecisionReason::NoPriorRecord),
        Some(_) if version == UNKNOWN_VERSION => (false, DecisionReason::UnknownVersion),
        Some(stored) if stored != version => (true, DecisionReason::VersionChanged),
        Some(_) => (false, DecisionReason::VersionUnchanged),
    };

    Decision {
        is_new,
        reason,
        display_version: version.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use istawatch_shared::{Application, Candidate, DiscoveryMethod};

    fn make_download(version: &str) -> CategorizedDownload {
        CategorizedDownload {
            candidate: Candidate {
                label: "ISTA Client".into(),
                target: "https://portal.example.com/delivery/client.zip".into(),
                source_frame: "main".into(),
                method: DiscoveryMethod::AnchorPath,
            },
            application: Application::Ista,
            category: "client".into(),
            display_name: "Diagnostic client".into(),
            version: version.into(),
        }
    }

    #[test]
    fn no_prior_record_is_always_new() {
        for version in ["1.0.0", "unknown", "2026-08-01"] {
            let decision = decide(&make_download(version), None);
            assert!(decision.is_new, "version {version}");
            assert_eq!(decision.reason, DecisionReason::NoPriorRecord);
        }
    }

    #[test]
    fn unknown_candidate_version_is_never_new_against_a_record() {
        let decision = decide(&make_download("unknown"), Some("1.0.0"));
        assert!(!decision.is_new);
        assert_eq!(decision.reason, DecisionReason::UnknownVersion);
    }

    #[test]
    fn equal_versions_are_not_new() {
        let decision = decide(&make_download("1.0.0"), Some("1.0.0"));
        assert!(!decision.is_new);
        assert_eq!(decision.reason, DecisionReason::VersionUnchanged);
    }

    #[test]
    fn differing_versions_are_new() {
        let decision = decide(&make_download("1.0.0"), Some("0.9.9"));
        assert!(decision.is_new);
        assert_eq!(decision.reason, DecisionReason::VersionChanged);
    }

    #[test]
    fn comparison_is_exact_string_inequality() {
        // "01.0.0" and "1.0.0" name the same release semantically, but the
        // engine compares strings only.
        let decision = decide(&make_download("01.0.0"), Some("1.0.0"));
        assert!(decision.is_new);
    }

    #[test]
    fn display_version_mirrors_the_candidate() {
        let decision = decide(&make_download("4.44.31.1"), Some("4.44.30.0"));
        assert_eq!(decision.display_version, "4.44.31.1");
    }
}
