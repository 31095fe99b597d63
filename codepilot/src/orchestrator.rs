//! End-to-end runs: plan a task, then execute the plan.

use anyhow::Result;
use serde_json::Value;
use tracing::{error, info, instrument};

use crate::core::types::{ExecutionLog, PlanTrace, RunOutcome, RunStatus, StepQueue};
use crate::execute::ExecutionPipeline;
use crate::io::codebase::Codebase;
use crate::io::completion::Completer;
use crate::io::config::EngineConfig;
use crate::io::prompt::PromptEngine;
use crate::io::search::WebSearch;
use crate::plan::{PlanSettings, PlanningPipeline};

/// How far [`Orchestrator::run_with`] goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    Full,
    /// Stop after planning; nothing is dispatched.
    PlanOnly,
}

/// Owns the prompt templates and wires collaborators into fresh pipelines for
/// each call. Holds no state between runs.
pub struct Orchestrator<'a, C: Completer, S: WebSearch, B: Codebase> {
    completer: &'a C,
    searcher: &'a S,
    codebase: &'a B,
    prompts: PromptEngine,
    settings: PlanSettings,
}

impl<'a, C: Completer, S: WebSearch, B: Codebase> Orchestrator<'a, C, S, B> {
    pub fn new(
        completer: &'a C,
        searcher: &'a S,
        codebase: &'a B,
        config: &EngineConfig,
    ) -> Result<Self> {
        Ok(Self {
            completer,
            searcher,
            codebase,
            prompts: PromptEngine::new()?,
            settings: PlanSettings::from(config),
        })
    }

    fn planner(&self) -> PlanningPipeline<'_, C, S, B> {
        PlanningPipeline::new(
            self.completer,
            self.searcher,
            self.codebase,
            &self.prompts,
            self.settings,
        )
    }

    fn executor(&self) -> ExecutionPipeline<'_, C, B> {
        ExecutionPipeline::new(
            self.completer,
            self.codebase,
            &self.prompts,
            self.settings.prompt_budget_bytes,
        )
    }

    pub fn plan(&self, task: &str) -> Result<StepQueue> {
        self.planner().plan(task)
    }

    pub fn plan_with_trace(&self, task: &str) -> Result<PlanTrace> {
        self.planner().plan_with_trace(task)
    }

    pub fn execute(&self, steps: StepQueue) -> ExecutionLog {
        self.executor().execute(steps)
    }

    pub fn execute_descriptors(&self, descriptors: Vec<Value>) -> ExecutionLog {
        self.executor().execute_descriptors(descriptors)
    }

    pub fn run(&self, task: &str) -> RunOutcome {
        self.run_with(task, RunMode::Full)
    }

    /// Always returns an outcome. A planning failure becomes an `error` status
    /// with the failure chain as its message; step failures only show up as
    /// `[ERROR]` entries in the log.
    #[instrument(skip_all, fields(mode = ?mode))]
    pub fn run_with(&self, task: &str, mode: RunMode) -> RunOutcome {
        let trace = match self.plan_with_trace(task) {
            Ok(trace) => trace,
            Err(err) => {
                let message = format!("{err:#}");
                error!(%message, "planning failed");
                return RunOutcome {
                    task: task.to_string(),
                    status: RunStatus::Error,
                    message: Some(message),
                    steps: Vec::new(),
                    log: ExecutionLog::default(),
                    trace: None,
                };
            }
        };

        let steps = trace.steps.clone();
        let (status, log) = match mode {
            RunMode::PlanOnly => (RunStatus::PlanningComplete, ExecutionLog::default()),
            RunMode::Full => {
                let log = self.execute(steps.iter().cloned().collect());
                (RunStatus::DevelopmentComplete, log)
            }
        };
        info!(?status, steps = steps.len(), errors = log.error_count(), "run finished");
        RunOutcome {
            task: task.to_string(),
            status,
            message: None,
            steps,
            log,
            trace: Some(trace),
        }
    }
}
