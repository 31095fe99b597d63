//! Completion-service abstraction.
//!
//! The [`Completer`] trait decouples the pipelines from the text-generation
//! backend. Production runs use [`CommandCompleter`], which pipes the prompt to
//! a configured command; tests use scripted completers that replay canned
//! responses without spawning processes.

use std::process::Command;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use tracing::{debug, info, instrument, warn};

use crate::io::config::CompletionConfig;
use crate::io::process::run_command_with_timeout;

/// Text-completion backend. Responses carry no schema guarantee.
pub trait Completer {
    fn complete(&self, prompt: &str) -> Result<String>;
}

/// Completer that runs a command, writes the prompt to its stdin, and returns
/// its trimmed stdout.
#[derive(Debug, Clone)]
pub struct CommandCompleter {
    command: Vec<String>,
    timeout: Duration,
    output_limit_bytes: usize,
}

impl CommandCompleter {
    pub fn new(config: &CompletionConfig) -> Self {
        Self {
            command: config.command.clone(),
            timeout: Duration::from_secs(config.timeout_secs),
            output_limit_bytes: config.output_limit_bytes,
        }
    }
}

impl Completer for CommandCompleter {
    #[instrument(skip_all, fields(program = ?self.command.first(), prompt_bytes = prompt.len()))]
    fn complete(&self, prompt: &str) -> Result<String> {
        let (program, args) = self
            .command
            .split_first()
            .ok_or_else(|| anyhow!("completion.command is empty"))?;
        info!("requesting completion");

        let mut cmd = Command::new(program);
        cmd.args(args);
        let output = run_command_with_timeout(
            cmd,
            Some(prompt.as_bytes()),
            self.timeout,
            self.output_limit_bytes,
        )
        .with_context(|| format!("run completion command `{program}`"))?;

        if output.timed_out {
            warn!(timeout_secs = self.timeout.as_secs(), "completion timed out");
            return Err(anyhow!("completion timed out after {:?}", self.timeout));
        }
        if !output.status.success() {
            warn!(exit_code = ?output.status.code(), "completion command failed");
            return Err(anyhow!(
                "completion command failed with status {:?}: {}",
                output.status.code(),
                output.stderr_tail()
            ));
        }
        if output.stdout_truncated > 0 {
            warn!(
                truncated = output.stdout_truncated,
                "completion output exceeded limit"
            );
        }

        let text = String::from_utf8_lossy(&output.stdout).trim().to_string();
        debug!(response_bytes = text.len(), "completion received");
        Ok(text)
    }
}
