//! Version token extraction from target strings.

use regex::Regex;

use istawatch_shared::UNKNOWN_VERSION;

/// Numeric patterns in priority order, most specific first: four
/// dot-separated integers, three dot-separated integers, then a
/// hyphen-separated date-like triple.
const VERSION_PATTERNS: &[&str] = &[
    r"\d+\.\d+\.\d+\.\d+",
    r"\d+\.\d+\.\d+",
    r"\d{4}-\d{2}-\d{2}",
];

/// Extract the first version token found in `target`, trying the patterns
/// in priority order. Returns [`UNKNOWN_VERSION`] when nothing matches.
pub fn extract_version(target: &str) -> String {
    for pattern in VERSION_PATTERNS {
        let Ok(re) = Regex::new(pattern) else { continue };
        if let Some(m) = re.find(target) {
            return m.as_str().to_string();
        }
    }
    UNKNOWN_VERSION.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn four_part_token() {
        assert_eq!(extract_version("ISTAOSS_1.2.3.4.zip"), "1.2.3.4");
    }

    #[test]
    fn three_part_token() {
        assert_eq!(extract_version("ICOM-Next-FW-4.5.6.bin"), "4.5.6");
    }

    #[test]
    fn date_like_token() {
        assert_eq!(extract_version("sdp_export_2026-08-01.tar.gz"), "2026-08-01");
    }

    #[test]
    fn four_part_wins_over_earlier_three_part() {
        // A three-part token occurs first in the string, but the four-part
        // pattern has priority over the whole string.
        assert_eq!(
            extract_version("tooling-9.8.7/pack_1.2.3.4.zip"),
            "1.2.3.4"
        );
    }

    #[test]
    fn no_token_yields_sentinel() {
        assert_eq!(extract_version("client-latest.zip"), UNKNOWN_VERSION);
        assert_eq!(extract_version(""), UNKNOWN_VERSION);
    }

    #[test]
    fn trailing_extension_does_not_extend_the_token() {
        // ".bin" after "4.5.6" must not turn it into a four-part match.
        assert_eq!(extract_version("FW-4.5.6.bin"), "4.5.6");
    }
}
