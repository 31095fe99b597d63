//! Web-search collaborator and its retry policy.

use std::process::Command;
use std::thread;
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use crate::core::types::SearchResult;
use crate::io::config::{RetryConfig, SearchConfig};
use crate::io::process::run_command_with_timeout;

#[derive(Debug, Error)]
pub enum SearchError {
    /// Transient; the only failure the retry policy retries.
    #[error("search timed out after {0:?}")]
    Timeout(Duration),
    #[error("search provider unavailable: {0}")]
    Unavailable(String),
    #[error("search failed: {0}")]
    Failed(String),
}

/// External search provider.
pub trait WebSearch {
    fn search(&self, query: &str, max_results: usize) -> Result<Vec<SearchResult>, SearchError>;
}

/// Bounded retry with a fixed delay between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff: Duration,
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts,
            backoff: Duration::from_millis(config.backoff_ms),
        }
    }
}

/// Results of a retried search plus how many provider calls it took.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchOutcome {
    pub results: Vec<SearchResult>,
    pub attempts: u32,
}

/// Search with retries on timeout. Never fails: when the budget is spent, or
/// on any non-timeout error, the outcome carries an empty result list.
#[instrument(skip_all, fields(query = %query, max_results, max_attempts = policy.max_attempts))]
pub fn search_with_retry<S: WebSearch>(
    searcher: &S,
    query: &str,
    max_results: usize,
    policy: &RetryPolicy,
) -> SearchOutcome {
    let max_attempts = policy.max_attempts.max(1);
    let mut attempts = 0;
    while attempts < max_attempts {
        attempts += 1;
        match searcher.search(query, max_results) {
            Ok(results) => {
                info!(attempts, results = results.len(), "search succeeded");
                return SearchOutcome { results, attempts };
            }
            Err(SearchError::Timeout(after)) if attempts < max_attempts => {
                warn!(attempts, ?after, backoff = ?policy.backoff, "search timed out, retrying");
                thread::sleep(policy.backoff);
            }
            Err(SearchError::Timeout(after)) => {
                warn!(attempts, ?after, "search timed out, retry budget spent");
            }
            Err(err @ SearchError::Unavailable(_)) => {
                debug!(err = %err, "search skipped");
                break;
            }
            Err(err) => {
                warn!(attempts, err = %err, "search failed, continuing without results");
                break;
            }
        }
    }
    SearchOutcome {
        results: Vec::new(),
        attempts,
    }
}

/// Searcher that runs a configured command with the query and result count
/// appended as arguments and expects a JSON array of `{title, url, content}`
/// on stdout. An empty command leaves search unavailable.
#[derive(Debug, Clone)]
pub struct CommandSearcher {
    command: Vec<String>,
    timeout: Duration,
    output_limit_bytes: usize,
}

impl CommandSearcher {
    pub fn new(config: &SearchConfig) -> Self {
        Self {
            command: config.command.clone(),
            timeout: Duration::from_secs(config.timeout_secs),
            output_limit_bytes: config.output_limit_bytes,
        }
    }
}

impl WebSearch for CommandSearcher {
    #[instrument(skip_all, fields(query = %query, max_results))]
    fn search(&self, query: &str, max_results: usize) -> Result<Vec<SearchResult>, SearchError> {
        let Some((program, args)) = self.command.split_first() else {
            return Err(SearchError::Unavailable(
                "search.command is not configured".to_string(),
            ));
        };
        let mut cmd = Command::new(program);
        cmd.args(args).arg(query).arg(max_results.to_string());

        let output = run_command_with_timeout(cmd, None, self.timeout, self.output_limit_bytes)
            .map_err(|err| SearchError::Failed(format!("{err:#}")))?;
        if output.timed_out {
            return Err(SearchError::Timeout(self.timeout));
        }
        if !output.status.success() {
            return Err(SearchError::Failed(format!(
                "`{program}` exited with {:?}: {}",
                output.status.code(),
                output.stderr_tail()
            )));
        }
        let mut results: Vec<SearchResult> = serde_json::from_slice(&output.stdout)
            .map_err(|err| SearchError::Failed(format!("parse search results: {err}")))?;
        results.truncate(max_results);
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{ScriptedSearch, ScriptedSearchReply, search_result};

    fn policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            backoff: Duration::ZERO,
        }
    }

    #[test]
    fn retries_timeouts_then_returns_results() {
        let searcher = ScriptedSearch::new(vec![
            ScriptedSearchReply::Timeout,
            ScriptedSearchReply::Timeout,
            ScriptedSearchReply::Results(vec![search_result("docs")]),
        ]);
        let outcome = search_with_retry(&searcher, "requests json", 5, &policy(3));
        assert_eq!(outcome.results, vec![search_result("docs")]);
        assert_eq!(outcome.attempts, 3);
        assert_eq!(searcher.calls().len(), 3);
    }

    #[test]
    fn gives_up_after_budget_with_empty_results() {
        let searcher = ScriptedSearch::new(vec![
            ScriptedSearchReply::Timeout,
            ScriptedSearchReply::Timeout,
            ScriptedSearchReply::Timeout,
            ScriptedSearchReply::Results(vec![search_result("late")]),
        ]);
        let outcome = search_with_retry(&searcher, "q", 5, &policy(3));
        assert!(outcome.results.is_empty());
        assert_eq!(outcome.attempts, 3);
        assert_eq!(searcher.calls().len(), 3);
    }

    #[test]
    fn other_failures_are_not_retried() {
        let searcher = ScriptedSearch::new(vec![
            ScriptedSearchReply::Fail("503".to_string()),
            ScriptedSearchReply::Results(vec![search_result("never")]),
        ]);
        let outcome = search_with_retry(&searcher, "q", 5, &policy(3));
        assert!(outcome.results.is_empty());
        assert_eq!(outcome.attempts, 1);
    }

    #[test]
    fn unconfigured_command_is_unavailable() {
        let searcher = CommandSearcher::new(&SearchConfig {
            command: Vec::new(),
            ..SearchConfig::default()
        });
        assert!(matches!(
            searcher.search("q", 3),
            Err(SearchError::Unavailable(_))
        ));
    }

    #[cfg(unix)]
    #[test]
    fn command_searcher_parses_json_results() {
        let script = r#"printf '[{"title":"A","url":"https://a","content":"x"},{"title":"B","url":"https://b"}]'"#;
        let searcher = CommandSearcher::new(&SearchConfig {
            command: vec!["sh".to_string(), "-c".to_string(), script.to_string()],
            ..SearchConfig::default()
        });
        let results = searcher.search("query", 1).expect("search");
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].title, "A");
    }
}
