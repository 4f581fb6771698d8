//! Candidate categorization against per-application rule tables.
//!
//! Each application surface carries a fixed, ordered list of category rules
//! (see [`categories`]). A rule is a data-described predicate over the
//! lower-cased label and target of a candidate, evaluated by one generic
//! matcher — adding a category means adding a table row, not code.
//!
//! Rule order is priority order: a candidate matching several categories'
//! heuristics is assigned to the first. Within one pass, the first candidate
//! to fill a category wins; later matches for that category are dropped.

pub mod categories;
pub mod version;

use std::collections::BTreeMap;

use tracing::debug;

use istawatch_shared::{Application, Candidate, CategorizedDownload};

pub use categories::{CategoryRule, Needle, rules_for};
pub use version::extract_version;

/// Map candidates onto the application's category set (keep-first).
///
/// Returns at most one [`CategorizedDownload`] per category. Candidates that
/// match no rule are dropped.
pub fn categorize(
    application: Application,
    candidates: &[Candidate],
) -> BTreeMap<String, CategorizedDownload> {
    let rules = rules_for(application);
    let mut assigned: BTreeMap<String, CategorizedDownload> = BTreeMap::new();

    for candidate in candidates {
        let label = candidate.label.to_lowercase();
        let target = candidate.target.to_lowercase();

        let Some(rule) = rules.iter().find(|r| rule_matches(r, &label, &target)) else {
            debug!(label = %candidate.label, "candidate matched no category rule, dropped");
            continue;
        };

        if assigned.contains_key(rule.category) {
            // Keep-first: extraction order decides the winner for a category.
            debug!(
                category = rule.category,
                label = %candidate.label,
                "category already filled, dropping later match"
            );
            continue;
        }

        assigned.insert(
            rule.category.to_string(),
            CategorizedDownload {
                candidate: candidate.clone(),
                application,
                category: rule.category.to_string(),
                display_name: rule.display_name.to_string(),
                version: version::extract_version(&candidate.target),
            },
        );
    }

    assigned
}

/// A rule matches when any of its clauses matches; a clause matches when all
/// of its needles are found.
fn rule_matches(rule: &CategoryRule, label: &str, target: &str) -> bool {
    rule.clauses.iter().any(|clause| {
        clause.iter().all(|needle| match needle {
            Needle::Label(s) => label.contains(s),
            Needle::Target(s) => target.contains(s),
            Needle::Either(s) => label.contains(s) || target.contains(s),
        })
    })
}
