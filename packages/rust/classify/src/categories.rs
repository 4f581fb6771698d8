//! Per-application category rule tables.
//!
//! The tables are the single place the portal's labeling quirks live. Labels
//! appear in both English and German on the portal, so needles cover both.

use istawatch_shared::Application;

/// One substring check over a candidate's lower-cased label/target.
#[derive(Debug, Clone, Copy)]
pub enum Needle {
    /// Must appear in the label.
    Label(&'static str),
    /// Must appear in the target.
    Target(&'static str),
    /// Must appear in the label or the target.
    Either(&'static str),
}

/// A data-described category predicate.
///
/// `clauses` is a disjunction of conjunctions: the rule matches when any
/// clause has all of its needles present.
#[derive(Debug, Clone, Copy)]
pub struct CategoryRule {
    /// Stable category name (second half of the store key).
    pub category: &'static str,
    /// Human-readable label for logs and reports.
    pub display_name: &'static str,
    /// Disjunction of conjunctive needle clauses.
    pub clauses: &'static [&'static [Needle]],
}

use Needle::{Either, Label, Target};

/// Classic surface rules, in priority order.
///
/// Programming data is evaluated before the client because the client
/// heuristics ("installer", "setup") are broad enough to shadow it.
const ISTA_RULES: &[CategoryRule] = &[
    CategoryRule {
        category: "programming_data",
        display_name: "Programming data",
        clauses: &[
            &[Either("programming data")],
            &[Either("programmierdaten")],
            &[Either("psdzdata")],
            &[Either("sdp"), Either("data")],
        ],
    },
    CategoryRule {
        category: "client",
        display_name: "Diagnostic client",
        clauses: &[
            &[Either("client")],
            &[Label("installationsdatei")],
            &[Either("installer")],
            &[Either("setup")],
        ],
    },
    CategoryRule {
        category: "icom_firmware",
        display_name: "ICOM firmware",
        clauses: &[
            &[Either("icom"), Either("firmware")],
            &[Either("icom"), Target("fw")],
        ],
    },
    CategoryRule {
        category: "ptd_driver",
        display_name: "Pass-through driver",
        clauses: &[
            &[Either("ptd")],
            &[Either("passthru")],
            &[Either("pass-thru")],
            &[Either("driver")],
        ],
    },
];

/// Open-source-stack surface rules, in priority order.
const ISTA_OSS_RULES: &[CategoryRule] = &[
    CategoryRule {
        category: "client",
        display_name: "Client installation package",
        clauses: &[
            &[Either("client")],
            &[Label("installationsdatei")],
            &[Target("istaoss")],
            &[Either("installer")],
        ],
    },
    CategoryRule {
        category: "icom_firmware",
        display_name: "ICOM firmware",
        clauses: &[
            &[Either("icom"), Either("firmware")],
            &[Either("icom"), Target("fw")],
        ],
    },
];

/// The fixed, ordered rule table for an application surface.
pub fn rules_for(application: Application) -> &'static [CategoryRule] {
    match application {
        Application::Ista => ISTA_RULES,
        Application::IstaOss => ISTA_OSS_RULES,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tables_have_unique_categories() {
        for app in Application::all() {
            let rules = rules_for(app);
            for (i, rule) in rules.iter().enumerate() {
                for other in &rules[i + 1..] {
                    assert_ne!(rule.category, other.category, "{app}: duplicate category");
                }
            }
        }
    }

    #[test]
    fn ista_checks_programming_data_before_client() {
        let categories: Vec<_> = rules_for(Application::Ista)
            .iter()
            .map(|r| r.category)
            .collect();
        let data_pos = categories
            .iter()
            .position(|c| *c == "programming_data")
            .expect("programming_data rule present");
        let client_pos = categories
            .iter()
            .position(|c| *c == "client")
            .expect("client rule present");
        assert!(data_pos < client_pos);
    }

    #[test]
    fn every_rule_has_at_least_one_clause() {
        for app in Application::all() {
            for rule in rules_for(app) {
                assert!(!rule.clauses.is_empty(), "{}: empty rule", rule.category);
                assert!(rule.clauses.iter().all(|c| !c.is_empty()));
            }
        }
    }
}
