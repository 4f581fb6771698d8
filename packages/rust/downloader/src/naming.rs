//! Destination filename resolution.
//!
//! The transfer mechanism's suggested name is preferred when plausible;
//! otherwise a name is synthesized from the category, version, and a fixed
//! suffix-sniffing table over the target string.

use istawatch_shared::UNKNOWN_VERSION;

/// Names shorter than this are treated as implausible server hints.
const MIN_PLAUSIBLE_LEN: usize = 5;

/// Suffix-sniffing table over the target string, checked in order.
/// Compound suffixes come before their tails.
const EXTENSION_TABLE: &[&str] = &[".tar.gz", ".zip", ".7z", ".exe", ".msi", ".img", ".bin"];

/// Generic fallback extension for targets the table does not recognize.
const FALLBACK_EXTENSION: &str = ".bin";

/// Resolve the final artifact filename.
///
/// `hint` is the name suggested by the transfer mechanism (Content-Disposition
/// first, URL path segment second). Empty, generic ("download"), or
/// implausibly short hints are replaced by `<category>[_<version>]<ext>`.
pub fn resolve_file_name(
    hint: Option<&str>,
    category: &str,
    version: &str,
    target: &str,
) -> String {
    if let Some(hint) = hint {
        let cleaned = sanitize(hint);
        if is_plausible(&cleaned) {
            return cleaned;
        }
    }

    let ext = sniff_extension(target);
    if version == UNKNOWN_VERSION {
        format!("{category}{ext}")
    } else {
        format!("{category}_{version}{ext}")
    }
}

/// Parse the filename out of a `Content-Disposition` header value.
pub fn filename_from_content_disposition(value: &str) -> Option<String> {
    let (_, rest) = value.split_once("filename=")?;
    let name = rest
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .trim_matches('"');
    if name.is_empty() {
        None
    } else {
        Some(name.to_string())
    }
}

/// Last non-empty path segment of a URL target, without query/fragment.
pub fn filename_from_url(target: &str) -> Option<String> {
    let parsed = url::Url::parse(target).ok()?;
    let segment = parsed.path_segments()?.filter(|s| !s.is_empty()).last()?;
    if segment.is_empty() {
        None
    } else {
        Some(segment.to_string())
    }
}

/// Strip any path components and quotes a server may have smuggled into a
/// suggested name.
fn sanitize(name: &str) -> String {
    name.trim()
        .trim_matches('"')
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or("")
        .to_string()
}

fn is_plausible(name: &str) -> bool {
    !name.is_empty() && name.len() >= MIN_PLAUSIBLE_LEN && !name.eq_ignore_ascii_case("download")
}

fn sniff_extension(target: &str) -> &'static str {
    let lower = target.to_lowercase();
    EXTENSION_TABLE
        .iter()
        .find(|ext| lower.ends_with(*ext))
        .copied()
        .unwrap_or(FALLBACK_EXTENSION)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plausible_hint_wins() {
        let name = resolve_file_name(
            Some("ISTAOSS_1.2.3.4.zip"),
            "client",
            "1.2.3.4",
            "https://portal.example.com/delivery/ISTAOSS_1.2.3.4.zip",
        );
        assert_eq!(name, "ISTAOSS_1.2.3.4.zip");
    }

    #[test]
    fn generic_hint_is_synthesized_over() {
        let name = resolve_file_name(
            Some("download"),
            "client",
            "1.2.3.4",
            "https://portal.example.com/delivery/ISTAOSS_1.2.3.4.zip",
        );
        assert_eq!(name, "client_1.2.3.4.zip");
    }

    #[test]
    fn short_hint_is_synthesized_over() {
        let name = resolve_file_name(
            Some("x.7z"),
            "icom_firmware",
            "4.5.6",
            "https://portal.example.com/fw/icom.7z",
        );
        assert_eq!(name, "icom_firmware_4.5.6.7z");
    }

    #[test]
    fn unknown_version_omits_the_suffix() {
        let name = resolve_file_name(None, "client", "unknown", "https://p.example.com/get/client");
        assert_eq!(name, "client.bin");
    }

    #[test]
    fn compound_extension_sniffed_before_tail() {
        let name = resolve_file_name(
            None,
            "programming_data",
            "4.44.31",
            "https://p.example.com/delivery/psdzdata_4.44.31.tar.gz",
        );
        assert_eq!(name, "programming_data_4.44.31.tar.gz");
    }

    #[test]
    fn content_disposition_parsing() {
        assert_eq!(
            filename_from_content_disposition(r#"attachment; filename="client_1.0.0.zip""#),
            Some("client_1.0.0.zip".into())
        );
        assert_eq!(
            filename_from_content_disposition("attachment; filename=fw.bin; size=42"),
            Some("fw.bin".into())
        );
        assert_eq!(filename_from_content_disposition("attachment"), None);
    }

    #[test]
    fn url_filename_ignores_query() {
        assert_eq!(
            filename_from_url("https://p.example.com/delivery/client_1.0.0.zip?session=abc"),
            Some("client_1.0.0.zip".into())
        );
        assert_eq!(filename_from_url("https://p.example.com/"), None);
    }

    #[test]
    fn hint_with_path_components_is_stripped() {
        let name = resolve_file_name(
            Some("../../etc/client_1.0.0.zip"),
            "client",
            "1.0.0",
            "https://p.example.com/delivery/client_1.0.0.zip",
        );
        assert_eq!(name, "client_1.0.0.zip");
    }
}
