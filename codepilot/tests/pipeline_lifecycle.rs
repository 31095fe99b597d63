//! End-to-end runs against a directory-backed codebase.
//!
//! The completion service and search provider are scripted; the codebase is a
//! real temp directory so reads and writes go through `DirCodebase`.

use codepilot::core::types::{RunStatus, ValidationOutcome};
use codepilot::io::config::EngineConfig;
use codepilot::io::run_log::write_run;
use codepilot::orchestrator::Orchestrator;
use codepilot::test_support::{
    ScriptedCompleter, ScriptedSearch, ScriptedSearchReply, TempWorkspace, modify_step,
    search_result,
};
use serde_json::json;

fn config() -> EngineConfig {
    let mut config = EngineConfig::default();
    config.search.retry.backoff_ms = 0;
    config
}

/// Empty codebase, one planned write, validator echoes the step back.
#[test]
fn hello_world_run_creates_file() {
    let workspace = TempWorkspace::new().expect("workspace");
    let codebase = workspace.codebase();
    let completer = ScriptedCompleter::new([
        "Create hello.py containing a single print statement that outputs Hello.",
        "python print statement",
        "INTERNAL",
        "```json\n[{\"file\": \"hello.py\", \"tool\": \"write\", \"args\": {\"content\": \"print('Hello')\\n\"}}]\n```",
        "{\"file\": \"hello.py\", \"tool\": \"write\", \"args\": {\"content\": \"print('Hello')\\n\"}}",
    ]);
    let searcher = ScriptedSearch::new(Vec::new());
    let orchestrator =
        Orchestrator::new(&completer, &searcher, &codebase, &config()).expect("orchestrator");

    let outcome = orchestrator.run("Create hello.py printing Hello");

    assert_eq!(outcome.status, RunStatus::DevelopmentComplete);
    assert_eq!(outcome.steps.len(), 1);
    assert_eq!(outcome.log.messages(), vec!["[WRITE] hello.py written"]);
    assert_eq!(outcome.log.entries[0].validation, ValidationOutcome::Unchanged);
    let contents = workspace.read_file("hello.py").expect("hello.py");
    assert!(contents.contains("Hello"));
    assert_eq!(completer.remaining(), 0);
}

/// A modify step only touches its target line.
#[test]
fn modify_step_changes_only_line_one() {
    let workspace = TempWorkspace::new().expect("workspace");
    workspace
        .write_file("x.py", "print('Hello')\nname = 'world'\n")
        .expect("seed x.py");
    let codebase = workspace.codebase();
    let completer = ScriptedCompleter::new(["unparseable reply"]);
    let searcher = ScriptedSearch::new(Vec::new());
    let orchestrator =
        Orchestrator::new(&completer, &searcher, &codebase, &config()).expect("orchestrator");

    let log = orchestrator.execute(vec![modify_step("x.py", 1, "print('Updated')")].into());

    assert_eq!(log.messages(), vec!["[CHANGE] modify at line 1 in x.py"]);
    assert!(matches!(
        log.entries[0].validation,
        ValidationOutcome::FellBack { .. }
    ));
    assert_eq!(
        workspace.read_file("x.py").expect("x.py"),
        "print('Updated')\nname = 'world'\n"
    );
}

/// An unknown tool is logged as an error and the next step still runs.
#[test]
fn unknown_tool_does_not_stop_the_run() {
    let workspace = TempWorkspace::new().expect("workspace");
    workspace.write_file("x.py", "a\nb\n").expect("seed x.py");
    let codebase = workspace.codebase();
    let completer = ScriptedCompleter::new(["?", "?", "?"]);
    let searcher = ScriptedSearch::new(Vec::new());
    let orchestrator =
        Orchestrator::new(&completer, &searcher, &codebase, &config()).expect("orchestrator");

    let log = orchestrator.execute_descriptors(vec![
        json!({"file": "x.py", "tool": "noop", "args": {}}),
        json!({"file": "x.py", "tool": "apply_change", "args": {"action": "insert", "line": 0, "new_code": "c"}}),
        json!({"file": "x.py", "tool": "read"}),
    ]);

    let messages = log.messages();
    assert_eq!(messages.len(), 3);
    assert!(messages[0].starts_with("[ERROR] noop on x.py failed: "));
    assert_eq!(messages[1], "[CHANGE] insert at line 0 in x.py");
    assert_eq!(messages[2], "[READ] x.py has 3 lines");
    assert_eq!(log.error_count(), 1);
    assert_eq!(workspace.read_file("x.py").expect("x.py"), "a\nb\nc\n");
}

/// External branch: search times out twice, then results reach the step
/// prompt, and the run artifacts record the whole trace.
#[test]
fn external_run_retries_search_and_writes_artifacts() {
    let workspace = TempWorkspace::new().expect("workspace");
    workspace
        .write_file("app.py", "import json\n")
        .expect("seed app.py");
    let codebase = workspace.codebase();
    let completer = ScriptedCompleter::new([
        "Add an HTTP fetch helper to app.py using requests.",
        "python requests get json",
        "EXTERNAL",
        "[{'file': 'app.py', 'tool': 'apply_change', 'args': {'action': 'insert', 'line': 1, 'new_code': 'import requests'}}]",
        "ok",
    ]);
    let searcher = ScriptedSearch::new(vec![
        ScriptedSearchReply::Timeout,
        ScriptedSearchReply::Timeout,
        ScriptedSearchReply::Results(vec![search_result("requests quickstart")]),
    ]);
    let orchestrator =
        Orchestrator::new(&completer, &searcher, &codebase, &config()).expect("orchestrator");

    let outcome = orchestrator.run("fetch json from an API");

    assert_eq!(outcome.status, RunStatus::DevelopmentComplete);
    assert_eq!(searcher.calls().len(), 3);
    assert_eq!(outcome.log.messages(), vec!["[CHANGE] insert at line 1 in app.py"]);
    assert_eq!(
        workspace.read_file("app.py").expect("app.py"),
        "import requests\nimport json\n"
    );

    let out_dir = workspace.root().join("out");
    let paths = write_run(&out_dir, &outcome).expect("write run");
    let plan: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&paths.plan_path).expect("plan.json"))
            .expect("parse plan");
    assert_eq!(plan["decision"]["source"], "external");
    assert_eq!(plan["search_attempts"], 3);
    let meta: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&paths.outcome_path).expect("outcome.json"))
            .expect("parse outcome");
    assert_eq!(meta["status"], "development_complete");
    assert_eq!(meta["error_count"], 0);
    assert_eq!(meta["validator_fallbacks"], 1);
}
