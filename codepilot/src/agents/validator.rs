//! Step validator agent.
//!
//! Gives the completion service one chance to correct a step right before it
//! is dispatched. The policy is fail-open: whatever goes wrong (service error,
//! unparseable reply, reply that is not a well-formed step) the queued step is
//! handed back untouched and the reason is recorded in the outcome.

use anyhow::{Context, Result};
use tracing::{debug, instrument, warn};

use crate::core::extract::parse_object_literal;
use crate::core::types::{QueuedStep, Step, ValidationOutcome};
use crate::io::completion::Completer;
use crate::io::prompt::PromptEngine;

/// Result of reviewing one queued step.
#[derive(Debug, Clone, PartialEq)]
pub struct Review {
    pub step: QueuedStep,
    pub outcome: ValidationOutcome,
}

pub struct StepValidator<'a, C: Completer> {
    completer: &'a C,
    prompts: &'a PromptEngine,
}

impl<'a, C: Completer> StepValidator<'a, C> {
    pub fn new(completer: &'a C, prompts: &'a PromptEngine) -> Self {
        Self { completer, prompts }
    }

    /// Ask for a corrected version of `queued`, given the current codebase
    /// `summary`. Never fails.
    #[instrument(skip_all, fields(file = %queued.file()))]
    pub fn review(&self, queued: &QueuedStep, summary: &str) -> Review {
        match self.request_correction(queued, summary) {
            Ok(corrected) => {
                let outcome = match queued {
                    QueuedStep::Ready(original) if *original == corrected => {
                        ValidationOutcome::Unchanged
                    }
                    _ => ValidationOutcome::Repaired,
                };
                debug!(?outcome, "step reviewed");
                Review {
                    step: QueuedStep::Ready(corrected),
                    outcome,
                }
            }
            Err(err) => {
                let reason = format!("{err:#}");
                warn!(tag = "validator_fallback", %reason, "keeping original step");
                Review {
                    step: queued.clone(),
                    outcome: ValidationOutcome::FellBack { reason },
                }
            }
        }
    }

    fn request_correction(&self, queued: &QueuedStep, summary: &str) -> Result<Step> {
        let (step_json, problem) = match queued {
            QueuedStep::Ready(step) => (serde_json::to_string_pretty(step)?, None),
            QueuedStep::Malformed { raw, reason, .. } => {
                (serde_json::to_string_pretty(raw)?, Some(reason.as_str()))
            }
        };
        let prompt = self.prompts.validate(&step_json, problem, summary)?;
        let response = self
            .completer
            .complete(&prompt)
            .context("request step correction")?;
        let value = parse_object_literal(&response).context("parse corrected step")?;
        let step = Step::from_value(&value).context("corrected step is not a valid step")?;
        Ok(step)
    }
}
