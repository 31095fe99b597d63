//! Shape validation for planned steps.
//!
//! A descriptor is checked twice at the model boundary: once against the JSON
//! Schema in `schemas/step.schema.json`, then by the typed conversion into
//! [`Step`]. Past this point no code re-checks `args`.

use std::sync::LazyLock;

use jsonschema::{Draft, Validator};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::core::types::{LineEdit, Step, StepDescriptor, StepOp, Tool};

const STEP_SCHEMA: &str = include_str!("../../schemas/step.schema.json");

/// Compiled once; a broken embedded schema surfaces on every check.
static STEP_VALIDATOR: LazyLock<Result<Validator, String>> = LazyLock::new(|| {
    let schema: Value =
        serde_json::from_str(STEP_SCHEMA).map_err(|err| format!("parse step schema: {err}"))?;
    jsonschema::options()
        .with_draft(Draft::Draft202012)
        .build(&schema)
        .map_err(|err| format!("compile step schema: {err}"))
});

/// Why a descriptor could not become a [`Step`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StepShapeError {
    #[error("step schema violations: {}", .0.join("; "))]
    Schema(Vec<String>),
    #[error("step is not a mapping: {0}")]
    NotAMapping(String),
    #[error("`file` must be a non-empty path")]
    EmptyFile,
    #[error("unsupported tool `{0}`")]
    UnknownTool(String),
    #[error("{tool} requires argument `{key}`")]
    MissingArg { tool: Tool, key: &'static str },
    #[error("{tool} argument `{key}` must be {expected}")]
    InvalidArg {
        tool: Tool,
        key: &'static str,
        expected: &'static str,
    },
    #[error("unknown apply_change action `{0}`")]
    UnknownAction(String),
}

impl Step {
    /// Validate an arbitrary JSON value (typically one element of a parsed
    /// plan) and convert it into a typed step.
    pub fn from_value(value: &Value) -> Result<Step, StepShapeError> {
        check_schema(value)?;
        let descriptor: StepDescriptor = serde_json::from_value(value.clone())
            .map_err(|err| StepShapeError::NotAMapping(err.to_string()))?;
        Step::try_from(descriptor)
    }
}

fn check_schema(value: &Value) -> Result<(), StepShapeError> {
    let compiled = STEP_VALIDATOR
        .as_ref()
        .map_err(|err| StepShapeError::Schema(vec![err.clone()]))?;
    let messages: Vec<String> = compiled
        .iter_errors(value)
        .map(|err| err.to_string())
        .collect();
    if !messages.is_empty() {
        return Err(StepShapeError::Schema(messages));
    }
    Ok(())
}

impl TryFrom<StepDescriptor> for Step {
    type Error = StepShapeError;

    fn try_from(descriptor: StepDescriptor) -> Result<Self, Self::Error> {
        if descriptor.file.trim().is_empty() {
            return Err(StepShapeError::EmptyFile);
        }
        let tool = Tool::parse(&descriptor.tool)
            .ok_or_else(|| StepShapeError::UnknownTool(descriptor.tool.clone()))?;
        let args = &descriptor.args;
        let op = match tool {
            Tool::Read => StepOp::Read,
            Tool::Delete => StepOp::Delete,
            Tool::LlmModify => StepOp::LlmModify,
            Tool::Write => StepOp::Write {
                content: string_arg(tool, args, "content")?,
            },
            Tool::ApplyChange => StepOp::ApplyChange(line_edit(args)?),
        };
        Ok(Step {
            file: descriptor.file,
            op,
        })
    }
}

fn line_edit(args: &Map<String, Value>) -> Result<LineEdit, StepShapeError> {
    let tool = Tool::ApplyChange;
    let action = string_arg(tool, args, "action")?;
    let line = line_arg(args)?;
    match action.as_str() {
        "insert" => Ok(LineEdit::Insert {
            line,
            new_code: string_arg(tool, args, "new_code")?,
        }),
        "modify" => Ok(LineEdit::Modify {
            line,
            new_code: string_arg(tool, args, "new_code")?,
        }),
        "delete" => Ok(LineEdit::Delete { line }),
        other => Err(StepShapeError::UnknownAction(other.to_string())),
    }
}

fn string_arg(
    tool: Tool,
    args: &Map<String, Value>,
    key: &'static str,
) -> Result<String, StepShapeError> {
    match args.get(key) {
        None | Some(Value::Null) => Err(StepShapeError::MissingArg { tool, key }),
        Some(Value::String(text)) => Ok(text.clone()),
        Some(_) => Err(StepShapeError::InvalidArg {
            tool,
            key,
            expected: "a string",
        }),
    }
}

fn line_arg(args: &Map<String, Value>) -> Result<usize, StepShapeError> {
    let tool = Tool::ApplyChange;
    let invalid = StepShapeError::InvalidArg {
        tool,
        key: "line",
        expected: "a non-negative integer",
    };
    let value = match args.get("line") {
        None | Some(Value::Null) => return Err(StepShapeError::MissingArg { tool, key: "line" }),
        Some(value) => value,
    };
    // Python literals sometimes render integers as `3.0`.
    let line = match value.as_u64() {
        Some(line) => line,
        None => match value.as_f64() {
            Some(float) if float >= 0.0 && float.fract() == 0.0 => float as u64,
            _ => return Err(invalid),
        },
    };
    usize::try_from(line).map_err(|_| invalid)
}
