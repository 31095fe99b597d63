//! Search-source classification: the planning pipeline's only branch point.

use serde::{Deserialize, Serialize};

const EXTERNAL_TOKEN: &str = "EXTERNAL";

/// Outcome of the decide-search-source stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum SearchDecision {
    /// The codebase and task carry enough context; skip external search.
    Internal,
    /// Consult the web-search provider with `query`.
    External { query: String },
}

impl SearchDecision {
    pub fn is_external(&self) -> bool {
        matches!(self, SearchDecision::External { .. })
    }
}

/// True when the classifier's answer selects external search.
///
/// The first alphabetic token is compared against `EXTERNAL`
/// case-insensitively; anything else (including an empty answer) is internal.
pub fn wants_external(response: &str) -> bool {
    response
        .split(|ch: char| !ch.is_ascii_alphabetic())
        .find(|token| !token.is_empty())
        .is_some_and(|token| token.eq_ignore_ascii_case(EXTERNAL_TOKEN))
}

/// Build the branch outcome. An external decision carries the generated
/// query, falling back to the raw task when no query was produced.
pub fn classify_search_source(response: &str, query: Option<&str>, task: &str) -> SearchDecision {
    if !wants_external(response) {
        return SearchDecision::Internal;
    }
    let query = query
        .map(str::trim)
        .filter(|query| !query.is_empty())
        .unwrap_or(task)
        .to_string();
    SearchDecision::External { query }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_external_case_insensitively() {
        assert!(wants_external("EXTERNAL"));
        assert!(wants_external("external"));
        assert!(wants_external("  **External**: the task needs API docs"));
    }

    #[test]
    fn everything_else_is_internal() {
        assert!(!wants_external("INTERNAL"));
        assert!(!wants_external(""));
        assert!(!wants_external("Not external"));
        assert!(!wants_external("EXTERNALLY"));
    }

    #[test]
    fn external_falls_back_to_task_without_query() {
        assert_eq!(
            classify_search_source("EXTERNAL", Some("  "), "fetch weather"),
            SearchDecision::External {
                query: "fetch weather".to_string()
            }
        );
        assert_eq!(
            classify_search_source("EXTERNAL", None, "fetch weather"),
            SearchDecision::External {
                query: "fetch weather".to_string()
            }
        );
    }

    #[test]
    fn external_uses_generated_query() {
        let decision = classify_search_source("external", Some("requests get json"), "task");
        assert_eq!(
            decision,
            SearchDecision::External {
                query: "requests get json".to_string()
            }
        );
        assert!(decision.is_external());
    }

    #[test]
    fn internal_ignores_query() {
        assert_eq!(
            classify_search_source("INTERNAL", Some("q"), "task"),
            SearchDecision::Internal
        );
    }
}
