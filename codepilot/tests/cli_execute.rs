//! CLI tests: spawn the codepilot binary and check exit codes and stdout.
#![cfg(unix)]

use std::fs;
use std::process::Command;

use codepilot::exit_codes;
use codepilot::io::config::{EngineConfig, load_config};
use codepilot::test_support::TempWorkspace;

/// Config whose completion command ignores the prompt and prints `reply`.
fn config_replying(reply: &str) -> EngineConfig {
    let mut config = EngineConfig::default();
    config.completion.command = vec![
        "sh".to_string(),
        "-c".to_string(),
        format!("cat >/dev/null; printf '%s' '{reply}'"),
    ];
    config
}

#[test]
fn init_writes_default_config_once() {
    let workspace = TempWorkspace::new().expect("workspace");

    let status = Command::new(env!("CARGO_BIN_EXE_codepilot"))
        .current_dir(workspace.root())
        .arg("init")
        .status()
        .expect("codepilot init");
    assert_eq!(status.code(), Some(exit_codes::OK));
    let config = load_config(&workspace.root().join(".codepilot/config.toml")).expect("config");
    assert_eq!(config, EngineConfig::default());
    assert!(workspace.codebase_dir().is_dir());

    let status = Command::new(env!("CARGO_BIN_EXE_codepilot"))
        .current_dir(workspace.root())
        .arg("init")
        .status()
        .expect("codepilot init again");
    assert_eq!(status.code(), Some(exit_codes::INVALID));
}

#[test]
fn execute_reports_step_errors_with_exit_code() {
    let workspace = TempWorkspace::new().expect("workspace");
    workspace
        .write_config(&config_replying("no changes"))
        .expect("config");
    let steps_path = workspace.root().join("steps.json");
    fs::write(
        &steps_path,
        r#"[
            {"file": "hello.py", "tool": "write", "args": {"content": "print('Hello')\n"}},
            {"file": "hello.py", "tool": "noop", "args": {}},
            {"file": "hello.py", "tool": "read", "args": {}}
        ]"#,
    )
    .expect("write steps");

    let output = Command::new(env!("CARGO_BIN_EXE_codepilot"))
        .arg("--root")
        .arg(workspace.root())
        .arg("execute")
        .arg("--steps")
        .arg(&steps_path)
        .output()
        .expect("codepilot execute");

    assert_eq!(output.status.code(), Some(exit_codes::STEP_ERRORS));
    let stdout = String::from_utf8_lossy(&output.stdout);
    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(lines.len(), 3);
    assert_eq!(lines[0], "[WRITE] hello.py written");
    assert!(lines[1].starts_with("[ERROR] noop on hello.py failed: "));
    assert_eq!(lines[2], "[READ] hello.py has 1 lines");
    assert_eq!(
        workspace.read_file("hello.py").expect("hello.py"),
        "print('Hello')\n"
    );
}

#[test]
fn dry_run_with_unparseable_plan_completes_planning() {
    let workspace = TempWorkspace::new().expect("workspace");
    workspace
        .write_config(&config_replying("INTERNAL"))
        .expect("config");
    let out_dir = workspace.root().join("artifacts");

    let output = Command::new(env!("CARGO_BIN_EXE_codepilot"))
        .arg("--root")
        .arg(workspace.root())
        .arg("run")
        .arg("Create hello.py printing Hello")
        .arg("--dry-run")
        .arg("--out")
        .arg(&out_dir)
        .output()
        .expect("codepilot run");

    assert_eq!(output.status.code(), Some(exit_codes::OK));
    let outcome: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("outcome json");
    assert_eq!(outcome["status"], "planning_complete");
    assert_eq!(outcome["steps"], serde_json::json!([]));
    assert!(out_dir.join("plan.json").is_file());
    assert!(out_dir.join("outcome.json").is_file());
}
