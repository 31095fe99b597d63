//! Shared data model for planning and execution.
//!
//! A [`Step`] is validated once, when it crosses from model output into the
//! engine; everything downstream works on the typed form.

use std::collections::VecDeque;
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::core::decision::SearchDecision;

/// Prefix carried by every execution log entry that records a failed step.
pub const ERROR_TAG: &str = "[ERROR]";

/// Closed set of operations the dispatcher understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tool {
    Read,
    Write,
    Delete,
    ApplyChange,
    LlmModify,
}

impl Tool {
    pub const ALL: [Tool; 5] = [
        Tool::Read,
        Tool::Write,
        Tool::Delete,
        Tool::ApplyChange,
        Tool::LlmModify,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Tool::Read => "read",
            Tool::Write => "write",
            Tool::Delete => "delete",
            Tool::ApplyChange => "apply_change",
            Tool::LlmModify => "llm_modify",
        }
    }

    pub fn parse(name: &str) -> Option<Tool> {
        Tool::ALL.into_iter().find(|tool| tool.as_str() == name)
    }
}

impl fmt::Display for Tool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single-line mutation. Line numbers are 1-based; see
/// [`crate::core::lines::apply_line_edit`] for the boundary rules.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineEdit {
    Insert { line: usize, new_code: String },
    Modify { line: usize, new_code: String },
    Delete { line: usize },
}

impl LineEdit {
    pub fn action(&self) -> &'static str {
        match self {
            LineEdit::Insert { .. } => "insert",
            LineEdit::Modify { .. } => "modify",
            LineEdit::Delete { .. } => "delete",
        }
    }

    pub fn line(&self) -> usize {
        match self {
            LineEdit::Insert { line, .. } | LineEdit::Modify { line, .. } | LineEdit::Delete { line } => {
                *line
            }
        }
    }

    pub fn new_code(&self) -> Option<&str> {
        match self {
            LineEdit::Insert { new_code, .. } | LineEdit::Modify { new_code, .. } => Some(new_code),
            LineEdit::Delete { .. } => None,
        }
    }
}

/// Operation payload, one case per tool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOp {
    Write { content: String },
    Read,
    Delete,
    ApplyChange(LineEdit),
    LlmModify,
}

impl StepOp {
    pub fn tool(&self) -> Tool {
        match self {
            StepOp::Write { .. } => Tool::Write,
            StepOp::Read => Tool::Read,
            StepOp::Delete => Tool::Delete,
            StepOp::ApplyChange(_) => Tool::ApplyChange,
            StepOp::LlmModify => Tool::LlmModify,
        }
    }
}

/// One atomic file operation.
///
/// Serializes to (and deserializes from) the `{file, tool, args}` wire shape
/// produced by the completion service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "StepDescriptor", into = "StepDescriptor")]
pub struct Step {
    pub file: String,
    pub op: StepOp,
}

impl Step {
    pub fn new(file: impl Into<String>, op: StepOp) -> Self {
        Self {
            file: file.into(),
            op,
        }
    }

    pub fn tool(&self) -> Tool {
        self.op.tool()
    }
}

/// Untyped wire form of a [`Step`]: `args` is an open mapping whose required
/// keys depend on `tool`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepDescriptor {
    pub file: String,
    pub tool: String,
    #[serde(default, deserialize_with = "null_as_empty_map")]
    pub args: Map<String, Value>,
}

fn null_as_empty_map<'de, D>(deserializer: D) -> Result<Map<String, Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Map<String, Value>>::deserialize(deserializer)?.unwrap_or_default())
}

impl From<Step> for StepDescriptor {
    fn from(step: Step) -> Self {
        let mut args = Map::new();
        let tool = step.tool().as_str().to_string();
        match step.op {
            StepOp::Write { content } => {
                args.insert("content".to_string(), Value::String(content));
            }
            StepOp::ApplyChange(edit) => {
                args.insert("action".to_string(), Value::from(edit.action()));
                args.insert("line".to_string(), Value::from(edit.line() as u64));
                if let Some(code) = edit.new_code() {
                    args.insert("new_code".to_string(), Value::from(code));
                }
            }
            StepOp::Read | StepOp::Delete | StepOp::LlmModify => {}
        }
        Self {
            file: step.file,
            tool,
            args,
        }
    }
}

/// Ordered backlog of steps awaiting execution.
pub type StepQueue = VecDeque<Step>;

/// Entry in the execution queue.
///
/// Steps coming out of the planning pipeline are always `Ready`. Steps loaded
/// from elsewhere may fail shape validation; they stay queued as `Malformed`
/// so the validator gets a chance to repair them and, failing that, they are
/// recorded as a failed step instead of aborting the run.
#[derive(Debug, Clone, PartialEq)]
pub enum QueuedStep {
    Ready(Step),
    Malformed {
        raw: Value,
        file: String,
        tool: String,
        reason: String,
    },
}

impl QueuedStep {
    /// Validate a raw descriptor, keeping it queued even when it is malformed.
    pub fn from_value(raw: Value) -> Self {
        match Step::from_value(&raw) {
            Ok(step) => QueuedStep::Ready(step),
            Err(err) => {
                let field = |key: &str| {
                    raw.get(key)
                        .and_then(Value::as_str)
                        .filter(|text| !text.is_empty())
                        .unwrap_or("<missing>")
                        .to_string()
                };
                QueuedStep::Malformed {
                    file: field("file"),
                    tool: field("tool"),
                    reason: err.to_string(),
                    raw,
                }
            }
        }
    }

    pub fn file(&self) -> &str {
        match self {
            QueuedStep::Ready(step) => &step.file,
            QueuedStep::Malformed { file, .. } => file,
        }
    }
}

impl From<Step> for QueuedStep {
    fn from(step: Step) -> Self {
        QueuedStep::Ready(step)
    }
}

/// A result pulled from the external search provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult {
    pub title: String,
    pub url: String,
    #[serde(default)]
    pub content: String,
}

/// What the step validator did with a queued step before dispatch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ValidationOutcome {
    /// The completion service echoed the step back unchanged.
    Unchanged,
    /// The completion service returned a different well-formed step.
    Repaired,
    /// The correction could not be used; the original step was kept.
    FellBack { reason: String },
}

/// One execution log entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepRecord {
    pub message: String,
    pub validation: ValidationOutcome,
}

/// Ordered per-step results of one execution run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionLog {
    pub entries: Vec<StepRecord>,
}

impl ExecutionLog {
    pub fn push(&mut self, record: StepRecord) {
        self.entries.push(record);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn messages(&self) -> Vec<&str> {
        self.entries
            .iter()
            .map(|entry| entry.message.as_str())
            .collect()
    }

    pub fn error_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|entry| entry.message.starts_with(ERROR_TAG))
            .count()
    }

    pub fn has_errors(&self) -> bool {
        self.error_count() > 0
    }

    pub fn fallback_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|entry| matches!(entry.validation, ValidationOutcome::FellBack { .. }))
            .count()
    }
}

/// Terminal status reported by an end-to-end run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    PlanningComplete,
    DevelopmentComplete,
    Error,
}

/// Everything the planning stages produced, assembled once planning finishes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlanTrace {
    pub task: String,
    pub codebase_summary: String,
    pub enhanced_task: String,
    pub search_query: Option<String>,
    pub decision: SearchDecision,
    pub search_attempts: u32,
    pub external_results: Vec<SearchResult>,
    pub steps: Vec<Step>,
}

/// Result object handed back to callers of an end-to-end run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunOutcome {
    pub task: String,
    pub status: RunStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub steps: Vec<Step>,
    pub log: ExecutionLog,
    #[serde(skip)]
    pub trace: Option<PlanTrace>,
}
