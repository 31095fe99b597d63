//! Planning pipeline: task in, step queue out.
//!
//! Stages run in a fixed order; each returns its own value and the pipeline
//! threads them forward explicitly:
//!
//! ```text
//! summarize -> enhance -> generate_query -> decide --External--> search_external --+
//!                                                  \--Internal------------------------+-> generate_steps
//! ```
//!
//! Completion-service failures in any stage propagate. A step list that cannot
//! be parsed at all becomes an empty plan; a parsed entry that is not a valid
//! step aborts planning.

use anyhow::{Context, Result};
use tracing::{debug, info, instrument, warn};

use crate::core::decision::{SearchDecision, classify_search_source};
use crate::core::extract::parse_list_literal;
use crate::core::types::{PlanTrace, SearchResult, Step, StepQueue};
use crate::io::codebase::{Codebase, summarize};
use crate::io::completion::Completer;
use crate::io::config::EngineConfig;
use crate::io::prompt::PromptEngine;
use crate::io::search::{RetryPolicy, SearchOutcome, WebSearch, search_with_retry};

/// Knobs the planning stages read from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlanSettings {
    pub prompt_budget_bytes: usize,
    pub max_results: usize,
    pub retry: RetryPolicy,
}

impl From<&EngineConfig> for PlanSettings {
    fn from(config: &EngineConfig) -> Self {
        Self {
            prompt_budget_bytes: config.prompt_budget_bytes,
            max_results: config.search.max_results,
            retry: config.retry_policy(),
        }
    }
}

/// Rendered snapshot of the codebase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodebaseSummary(pub String);

/// The task as restated by the completion service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnhancedTask(pub String);

/// Query for the search provider; `None` when the service produced nothing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery(pub Option<String>);

pub struct PlanningPipeline<'a, C: Completer, S: WebSearch, B: Codebase> {
    completer: &'a C,
    searcher: &'a S,
    codebase: &'a B,
    prompts: &'a PromptEngine,
    settings: PlanSettings,
}

impl<'a, C: Completer, S: WebSearch, B: Codebase> PlanningPipeline<'a, C, S, B> {
    pub fn new(
        completer: &'a C,
        searcher: &'a S,
        codebase: &'a B,
        prompts: &'a PromptEngine,
        settings: PlanSettings,
    ) -> Self {
        Self {
            completer,
            searcher,
            codebase,
            prompts,
            settings,
        }
    }

    pub fn plan(&self, task: &str) -> Result<StepQueue> {
        Ok(self.plan_with_trace(task)?.steps.into_iter().collect())
    }

    /// Run every stage and keep what each produced.
    #[instrument(skip_all, fields(task_bytes = task.len()))]
    pub fn plan_with_trace(&self, task: &str) -> Result<PlanTrace> {
        let summary = self.summarize()?;
        let enhanced = self.enhance(task, &summary)?;
        let query = self.generate_query(&enhanced)?;
        let decision = self.decide(task, &enhanced, &summary, &query)?;
        let search = match &decision {
            SearchDecision::External { query } => self.search_external(query),
            SearchDecision::Internal => SearchOutcome::default(),
        };
        let steps = self.generate_steps(&enhanced, &summary, &search.results)?;
        info!(steps = steps.len(), external = decision.is_external(), "planning complete");

        Ok(PlanTrace {
            task: task.to_string(),
            codebase_summary: summary.0,
            enhanced_task: enhanced.0,
            search_query: query.0,
            decision,
            search_attempts: search.attempts,
            external_results: search.results,
            steps,
        })
    }

    pub fn summarize(&self) -> Result<CodebaseSummary> {
        let text = summarize(self.codebase, self.settings.prompt_budget_bytes)
            .context("summarize codebase")?;
        debug!(summary_bytes = text.len(), "codebase summarized");
        Ok(CodebaseSummary(text))
    }

    pub fn enhance(&self, task: &str, summary: &CodebaseSummary) -> Result<EnhancedTask> {
        let prompt = self.prompts.enhance(task, &summary.0)?;
        let response = self.completer.complete(&prompt).context("enhance task")?;
        let enhanced = response.trim();
        if enhanced.is_empty() {
            warn!("enhanced task is empty, using the original task");
            return Ok(EnhancedTask(task.trim().to_string()));
        }
        Ok(EnhancedTask(enhanced.to_string()))
    }

    pub fn generate_query(&self, enhanced: &EnhancedTask) -> Result<SearchQuery> {
        let prompt = self.prompts.query(&enhanced.0)?;
        let response = self
            .completer
            .complete(&prompt)
            .context("generate search query")?;
        let query = response.trim().trim_matches('"').trim();
        debug!(query, "search query generated");
        Ok(SearchQuery((!query.is_empty()).then(|| query.to_string())))
    }

    pub fn decide(
        &self,
        task: &str,
        enhanced: &EnhancedTask,
        summary: &CodebaseSummary,
        query: &SearchQuery,
    ) -> Result<SearchDecision> {
        let prompt = self.prompts.decide(&enhanced.0, &summary.0)?;
        let response = self
            .completer
            .complete(&prompt)
            .context("decide search source")?;
        let decision = classify_search_source(&response, query.0.as_deref(), task);
        info!(?decision, "search source decided");
        Ok(decision)
    }

    /// Never fails; an exhausted or broken provider yields no results.
    pub fn search_external(&self, query: &str) -> SearchOutcome {
        search_with_retry(
            self.searcher,
            query,
            self.settings.max_results,
            &self.settings.retry,
        )
    }

    pub fn generate_steps(
        &self,
        enhanced: &EnhancedTask,
        summary: &CodebaseSummary,
        results: &[SearchResult],
    ) -> Result<Vec<Step>> {
        let prompt = self.prompts.steps(&enhanced.0, &summary.0, results)?;
        let response = self.completer.complete(&prompt).context("generate steps")?;
        let descriptors = match parse_list_literal(&response) {
            Ok(descriptors) => descriptors,
            Err(err) => {
                warn!(%err, "step list unparseable, planning no steps");
                return Ok(Vec::new());
            }
        };
        descriptors
            .iter()
            .enumerate()
            .map(|(index, descriptor)| {
                Step::from_value(descriptor)
                    .with_context(|| format!("planned step {} is malformed: {descriptor}", index + 1))
            })
            .collect()
    }
}
