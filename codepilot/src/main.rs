//! `codepilot` CLI: plan and apply code changes for a task.
//!
//! Results go to stdout as JSON (or one log line per step for `execute`);
//! diagnostics go to stderr via `RUST_LOG`.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use serde_json::Value;

use codepilot::core::types::{ExecutionLog, RunStatus, Step};
use codepilot::exit_codes;
use codepilot::io::codebase::DirCodebase;
use codepilot::io::completion::CommandCompleter;
use codepilot::io::config::{EngineConfig, default_config_path, load_config, write_config};
use codepilot::io::run_log::write_run;
use codepilot::io::search::CommandSearcher;
use codepilot::logging;
use codepilot::orchestrator::{Orchestrator, RunMode};

#[derive(Parser)]
#[command(
    name = "codepilot",
    version,
    about = "Plan and apply file-level code changes with a completion service"
)]
struct Cli {
    /// Working root holding the config directory and the codebase.
    #[arg(long, global = true, default_value = ".")]
    root: PathBuf,
    /// Config file (default: `<root>/.codepilot/config.toml`).
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Write the default config file and create the codebase directory.
    Init {
        /// Overwrite an existing config file.
        #[arg(short, long)]
        force: bool,
    },
    /// Plan a task and print the steps as JSON without executing them.
    Plan { task: String },
    /// Execute step descriptors loaded from a JSON array file.
    Execute {
        #[arg(long)]
        steps: PathBuf,
    },
    /// Plan a task and execute the plan.
    Run {
        task: String,
        /// Stop after planning.
        #[arg(long)]
        dry_run: bool,
        /// Write plan.json, log.json and outcome.json into this directory.
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

fn main() {
    logging::init();
    match run() {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("{err:#}");
            std::process::exit(exit_codes::INVALID);
        }
    }
}

fn run() -> Result<i32> {
    let cli = Cli::parse();
    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(|| default_config_path(&cli.root));
    match cli.command {
        Command::Init { force } => cmd_init(&cli.root, &config_path, force),
        Command::Plan { task } => {
            let config = load_config(&config_path)?;
            cmd_plan(&cli.root, &config, &task)
        }
        Command::Execute { steps } => {
            let config = load_config(&config_path)?;
            cmd_execute(&cli.root, &config, &steps)
        }
        Command::Run { task, dry_run, out } => {
            let config = load_config(&config_path)?;
            let mode = if dry_run {
                RunMode::PlanOnly
            } else {
                RunMode::Full
            };
            cmd_run(&cli.root, &config, &task, mode, out.as_deref())
        }
    }
}

struct Collaborators {
    completer: CommandCompleter,
    searcher: CommandSearcher,
    codebase: DirCodebase,
}

impl Collaborators {
    fn new(root: &Path, config: &EngineConfig) -> Self {
        Self {
            completer: CommandCompleter::new(&config.completion),
            searcher: CommandSearcher::new(&config.search),
            codebase: DirCodebase::new(config.codebase_path(root)),
        }
    }
}

fn cmd_init(root: &Path, config_path: &Path, force: bool) -> Result<i32> {
    if config_path.exists() && !force {
        bail!(
            "{} already exists (use --force to overwrite)",
            config_path.display()
        );
    }
    let config = EngineConfig::default();
    write_config(config_path, &config)?;
    let codebase_dir = config.codebase_path(root);
    fs::create_dir_all(&codebase_dir)
        .with_context(|| format!("create codebase dir {}", codebase_dir.display()))?;
    println!("{}", config_path.display());
    Ok(exit_codes::OK)
}

fn cmd_plan(root: &Path, config: &EngineConfig, task: &str) -> Result<i32> {
    let parts = Collaborators::new(root, config);
    let orchestrator =
        Orchestrator::new(&parts.completer, &parts.searcher, &parts.codebase, config)?;
    let steps: Vec<Step> = orchestrator.plan(task)?.into_iter().collect();
    println!("{}", serde_json::to_string_pretty(&steps)?);
    Ok(exit_codes::OK)
}

fn cmd_execute(root: &Path, config: &EngineConfig, steps_path: &Path) -> Result<i32> {
    let contents = fs::read_to_string(steps_path)
        .with_context(|| format!("read {}", steps_path.display()))?;
    let descriptors: Vec<Value> = serde_json::from_str(&contents)
        .with_context(|| format!("parse step list {}", steps_path.display()))?;

    let parts = Collaborators::new(root, config);
    let orchestrator =
        Orchestrator::new(&parts.completer, &parts.searcher, &parts.codebase, config)?;
    let log = orchestrator.execute_descriptors(descriptors);
    for message in log.messages() {
        println!("{message}");
    }
    Ok(log_exit_code(&log))
}

fn cmd_run(
    root: &Path,
    config: &EngineConfig,
    task: &str,
    mode: RunMode,
    out: Option<&Path>,
) -> Result<i32> {
    let parts = Collaborators::new(root, config);
    let orchestrator =
        Orchestrator::new(&parts.completer, &parts.searcher, &parts.codebase, config)?;
    let outcome = orchestrator.run_with(task, mode);
    if let Some(dir) = out {
        write_run(dir, &outcome)?;
    }
    println!("{}", serde_json::to_string_pretty(&outcome)?);
    if outcome.status == RunStatus::Error {
        return Ok(exit_codes::INVALID);
    }
    Ok(log_exit_code(&outcome.log))
}

fn log_exit_code(log: &ExecutionLog) -> i32 {
    if log.has_errors() {
        exit_codes::STEP_ERRORS
    } else {
        exit_codes::OK
    }
}
