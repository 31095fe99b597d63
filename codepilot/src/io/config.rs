//! Engine configuration stored under `.codepilot/config.toml`.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

use crate::io::search::RetryPolicy;

/// Engine configuration (TOML).
///
/// Missing fields default to values suitable for a small local codebase.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct EngineConfig {
    /// Directory holding the codebase, relative to the working root.
    pub codebase_dir: PathBuf,

    /// Upper bound on the rendered codebase summary embedded in prompts.
    pub prompt_budget_bytes: usize,

    pub completion: CompletionConfig,

    pub search: SearchConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct CompletionConfig {
    /// Command that reads a prompt on stdin and prints the completion.
    pub command: Vec<String>,
    pub timeout_secs: u64,
    /// Completions longer than this are truncated.
    pub output_limit_bytes: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SearchConfig {
    /// Command invoked as `<command...> <query> <max_results>`; empty disables search.
    pub command: Vec<String>,
    pub max_results: usize,
    pub timeout_secs: u64,
    pub output_limit_bytes: usize,
    pub retry: RetryConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RetryConfig {
    /// Total provider calls allowed per search, including the first.
    pub max_attempts: u32,
    /// Fixed delay between attempts.
    pub backoff_ms: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            codebase_dir: PathBuf::from("codebase"),
            prompt_budget_bytes: 40_000,
            completion: CompletionConfig::default(),
            search: SearchConfig::default(),
        }
    }
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            command: vec!["llm".to_string()],
            timeout_secs: 5 * 60,
            output_limit_bytes: 200_000,
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            command: Vec::new(),
            max_results: 5,
            timeout_secs: 30,
            output_limit_bytes: 200_000,
            retry: RetryConfig::default(),
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_ms: 2_000,
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> Result<()> {
        if self.prompt_budget_bytes == 0 {
            return Err(anyhow!("prompt_budget_bytes must be > 0"));
        }
        if self.completion.command.is_empty() || self.completion.command[0].trim().is_empty() {
            return Err(anyhow!("completion.command must be a non-empty array"));
        }
        if self.completion.timeout_secs == 0 {
            return Err(anyhow!("completion.timeout_secs must be > 0"));
        }
        if self.completion.output_limit_bytes == 0 {
            return Err(anyhow!("completion.output_limit_bytes must be > 0"));
        }
        if self.search.command.first().is_some_and(|program| program.trim().is_empty()) {
            return Err(anyhow!("search.command must start with a program name"));
        }
        if self.search.max_results == 0 {
            return Err(anyhow!("search.max_results must be > 0"));
        }
        if self.search.timeout_secs == 0 {
            return Err(anyhow!("search.timeout_secs must be > 0"));
        }
        if self.search.retry.max_attempts == 0 {
            return Err(anyhow!("search.retry.max_attempts must be > 0"));
        }
        Ok(())
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::from(&self.search.retry)
    }

    /// Resolve the codebase directory against the working root.
    pub fn codebase_path(&self, root: &Path) -> PathBuf {
        root.join(&self.codebase_dir)
    }
}

/// Default config location for a working root.
pub fn default_config_path(root: &Path) -> PathBuf {
    root.join(".codepilot").join("config.toml")
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `EngineConfig::default()`.
pub fn load_config(path: &Path) -> Result<EngineConfig> {
    if !path.exists() {
        let cfg = EngineConfig::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: EngineConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()
        .with_context(|| format!("validate {}", path.display()))?;
    Ok(cfg)
}

/// Atomically write config to disk (temp file + rename).
pub fn write_config(path: &Path, cfg: &EngineConfig) -> Result<()> {
    cfg.validate()?;
    let mut buf = toml::to_string_pretty(cfg).context("serialize config toml")?;
    buf.push('\n');
    write_atomic(path, &buf)
}

fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    let parent = path
        .parent()
        .with_context(|| format!("config path missing parent {}", path.display()))?;
    fs::create_dir_all(parent).with_context(|| format!("create directory {}", parent.display()))?;
    let tmp_path = path.with_extension("toml.tmp");
    fs::write(&tmp_path, contents)
        .with_context(|| format!("write temp config {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path).with_context(|| format!("replace config {}", path.display()))?;
    Ok(())
}
