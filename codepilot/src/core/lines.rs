//! Line arithmetic for `apply_change`.
//!
//! Line numbers are 1-based. `insert` places the new code *before* the given
//! line, so the previous occupant moves down by one; `line = n + 1` and
//! `line = 0` both append after the last line. `modify` and `delete` require
//! an existing line. Multi-line `new_code` is spliced in as several lines so
//! positions stay consistent with what a later read of the file returns.

use thiserror::Error;

use crate::core::types::LineEdit;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{action} at line {line} is out of bounds (file has {len} lines)")]
pub struct LineEditError {
    pub action: &'static str,
    pub line: usize,
    pub len: usize,
}

/// Apply one edit to `lines` in place.
pub fn apply_line_edit(lines: &mut Vec<String>, edit: &LineEdit) -> Result<(), LineEditError> {
    let len = lines.len();
    let out_of_bounds = || LineEditError {
        action: edit.action(),
        line: edit.line(),
        len,
    };
    match edit {
        LineEdit::Insert { line, new_code } => {
            let index = match *line {
                0 => len,
                line if line <= len + 1 => line - 1,
                _ => return Err(out_of_bounds()),
            };
            lines.splice(index..index, split_code(new_code));
        }
        LineEdit::Modify { line, new_code } => {
            let index = existing_index(*line, len).ok_or_else(out_of_bounds)?;
            lines.splice(index..=index, split_code(new_code));
        }
        LineEdit::Delete { line } => {
            let index = existing_index(*line, len).ok_or_else(out_of_bounds)?;
            lines.remove(index);
        }
    }
    Ok(())
}

fn existing_index(line: usize, len: usize) -> Option<usize> {
    (1..=len).contains(&line).then(|| line - 1)
}

/// Split text into stored lines. Empty text still occupies one (blank) line.
fn split_code(code: &str) -> Vec<String> {
    let mut parts: Vec<String> = code.lines().map(str::to_string).collect();
    if parts.is_empty() {
        parts.push(String::new());
    }
    parts
}
