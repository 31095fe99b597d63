//! Execution pipeline: drain a step queue through validate-then-dispatch.
//!
//! Every queued step yields exactly one log entry, in dispatch order. Step
//! failures are absorbed into the log as `[ERROR]` entries; the pipeline
//! itself only ever finishes by draining the queue.

use std::collections::VecDeque;

use serde_json::Value;
use tracing::{info, instrument, warn};

use crate::agents::validator::StepValidator;
use crate::core::types::{ERROR_TAG, ExecutionLog, QueuedStep, StepQueue, StepRecord};
use crate::dispatch::Dispatcher;
use crate::io::codebase::{Codebase, summarize};
use crate::io::completion::Completer;
use crate::io::prompt::PromptEngine;

pub struct ExecutionPipeline<'a, C: Completer, B: Codebase> {
    validator: StepValidator<'a, C>,
    dispatcher: Dispatcher<'a, B>,
    codebase: &'a B,
    prompt_budget_bytes: usize,
}

impl<'a, C: Completer, B: Codebase> ExecutionPipeline<'a, C, B> {
    pub fn new(
        completer: &'a C,
        codebase: &'a B,
        prompts: &'a PromptEngine,
        prompt_budget_bytes: usize,
    ) -> Self {
        Self {
            validator: StepValidator::new(completer, prompts),
            dispatcher: Dispatcher::new(codebase),
            codebase,
            prompt_budget_bytes,
        }
    }

    /// Execute a queue of typed steps.
    pub fn execute(&self, steps: StepQueue) -> ExecutionLog {
        self.drain(steps.into_iter().map(QueuedStep::Ready).collect())
    }

    /// Execute raw step descriptors. Descriptors that fail shape validation
    /// stay queued so the validator may repair them.
    pub fn execute_descriptors(&self, descriptors: Vec<Value>) -> ExecutionLog {
        self.drain(descriptors.into_iter().map(QueuedStep::from_value).collect())
    }

    #[instrument(skip_all, fields(queued = queue.len()))]
    pub fn drain(&self, mut queue: VecDeque<QueuedStep>) -> ExecutionLog {
        let mut log = ExecutionLog::default();
        while let Some(queued) = queue.pop_front() {
            // Earlier steps may have changed the codebase, so summarize per step.
            let summary = self.current_summary();
            let review = self.validator.review(&queued, &summary);
            let message = self.dispatch(&review.step);
            info!(index = log.len(), %message, "step executed");
            log.push(StepRecord {
                message,
                validation: review.outcome,
            });
        }
        info!(
            steps = log.len(),
            errors = log.error_count(),
            fallbacks = log.fallback_count(),
            "queue drained"
        );
        log
    }

    fn dispatch(&self, queued: &QueuedStep) -> String {
        match queued {
            QueuedStep::Ready(step) => match self.dispatcher.dispatch(step) {
                Ok(message) => message,
                Err(err) => error_entry(step.tool().as_str(), &step.file, &format!("{err:#}")),
            },
            QueuedStep::Malformed {
                file, tool, reason, ..
            } => error_entry(tool, file, reason),
        }
    }

    fn current_summary(&self) -> String {
        match summarize(self.codebase, self.prompt_budget_bytes) {
            Ok(summary) => summary,
            Err(err) => {
                warn!(err = %format!("{err:#}"), "codebase summary unavailable");
                format!("[codebase unavailable: {err:#}]")
            }
        }
    }
}

fn error_entry(tool: &str, file: &str, reason: &str) -> String {
    format!("{ERROR_TAG} {tool} on {file} failed: {reason}")
}
