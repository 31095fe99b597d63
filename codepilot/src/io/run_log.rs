//! Run artifacts written by `codepilot run --out <dir>`.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;

use crate::core::types::{ExecutionLog, PlanTrace, RunOutcome, RunStatus};

/// Compact summary written next to the full plan and log.
#[derive(Debug, Clone, Serialize)]
pub struct RunMeta<'a> {
    pub task: &'a str,
    pub status: RunStatus,
    pub message: Option<&'a str>,
    pub step_count: usize,
    pub error_count: usize,
    pub validator_fallbacks: usize,
}

#[derive(Debug, Clone)]
pub struct RunPaths {
    pub dir: PathBuf,
    pub plan_path: PathBuf,
    pub log_path: PathBuf,
    pub outcome_path: PathBuf,
}

impl RunPaths {
    pub fn new(dir: &Path) -> Self {
        Self {
            dir: dir.to_path_buf(),
            plan_path: dir.join("plan.json"),
            log_path: dir.join("log.json"),
            outcome_path: dir.join("outcome.json"),
        }
    }
}

/// Write the plan trace (when planning got that far), the execution log, and
/// the outcome summary.
pub fn write_run(dir: &Path, outcome: &RunOutcome) -> Result<RunPaths> {
    let paths = RunPaths::new(dir);
    fs::create_dir_all(&paths.dir)
        .with_context(|| format!("create run dir {}", paths.dir.display()))?;

    // Write in deterministic order to keep artifacts stable.
    if let Some(trace) = &outcome.trace {
        write_plan(&paths.plan_path, trace)?;
    }
    write_log(&paths.log_path, &outcome.log)?;
    let meta = RunMeta {
        task: &outcome.task,
        status: outcome.status,
        message: outcome.message.as_deref(),
        step_count: outcome.steps.len(),
        error_count: outcome.log.error_count(),
        validator_fallbacks: outcome.log.fallback_count(),
    };
    write_json(&paths.outcome_path, &meta)?;

    Ok(paths)
}

fn write_plan(path: &Path, trace: &PlanTrace) -> Result<()> {
    write_json(path, trace)
}

fn write_log(path: &Path, log: &ExecutionLog) -> Result<()> {
    write_json(path, log)
}

fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let mut buf = serde_json::to_string_pretty(value).context("serialize json")?;
    buf.push('\n');
    fs::write(path, buf).with_context(|| format!("write {}", path.display()))
}
