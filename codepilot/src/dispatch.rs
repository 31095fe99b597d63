//! Tool dispatch: apply exactly one step to the codebase.

use anyhow::{Context, Result};
use tracing::{debug, instrument};

use crate::core::lines::apply_line_edit;
use crate::core::types::{Step, StepOp};
use crate::io::codebase::Codebase;

/// Applies typed steps to a codebase and reports a one-line outcome.
pub struct Dispatcher<'a, B: Codebase> {
    codebase: &'a B,
}

impl<'a, B: Codebase> Dispatcher<'a, B> {
    pub fn new(codebase: &'a B) -> Self {
        Self { codebase }
    }

    /// Run one step. Errors are returned for the caller's per-step boundary
    /// to record; nothing is retried here.
    #[instrument(skip_all, fields(file = %step.file, tool = %step.tool()))]
    pub fn dispatch(&self, step: &Step) -> Result<String> {
        let file = step.file.as_str();
        let message = match &step.op {
            StepOp::Write { content } => {
                let lines: Vec<String> = content.lines().map(str::to_string).collect();
                self.codebase.write(file, &lines)?;
                format!("[WRITE] {file} written")
            }
            StepOp::Read => {
                let count = self.codebase.read(file)?.len();
                format!("[READ] {file} has {count} lines")
            }
            StepOp::Delete => {
                self.codebase.delete(file)?;
                format!("[DELETE] {file} removed")
            }
            StepOp::ApplyChange(edit) => {
                // Read-modify-write of the whole file; no locking against other writers.
                let mut lines = self.codebase.read(file)?;
                apply_line_edit(&mut lines, edit)?;
                self.codebase
                    .write(file, &lines)
                    .with_context(|| format!("write back {file}"))?;
                format!(
                    "[CHANGE] {} at line {} in {file}",
                    edit.action(),
                    edit.line()
                )
            }
            StepOp::LlmModify => "[LLM_MODIFY] Skipped: not implemented yet".to_string(),
        };
        debug!(%message, "step dispatched");
        Ok(message)
    }
}
