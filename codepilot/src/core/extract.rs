//! Helpers that pull structured payloads out of free-form completions.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

use crate::core::literal::{LiteralError, parse_literal};

static LEADING_FENCE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*```[A-Za-z0-9_+-]*[ \t]*\n?").expect("leading fence pattern is valid")
});

/// Remove Markdown code-fence artifacts: a leading fence with an optional
/// language tag, then every remaining triple backtick.
pub fn strip_code_fences(text: &str) -> String {
    let without_leading = LEADING_FENCE_RE.replace(text, "");
    without_leading.replace("```", "").trim().to_string()
}

/// Return the widest `open … close` span in `text`, or `None` if there is no
/// such pair.
fn widest_span(text: &str, open: char, close: char) -> Option<&str> {
    let start = text.find(open)?;
    let end = text.rfind(close)?;
    (end > start).then(|| &text[start..=end])
}

/// Parse the first list literal in a completion (fences stripped).
pub fn parse_list_literal(response: &str) -> Result<Vec<Value>, LiteralError> {
    let cleaned = strip_code_fences(response);
    let candidate = widest_span(&cleaned, '[', ']').unwrap_or(&cleaned);
    match parse_literal(candidate)? {
        Value::Array(items) => Ok(items),
        other => Err(LiteralError {
            offset: 0,
            reason: format!("expected a list, found {}", kind_of(&other)),
        }),
    }
}

/// Parse a single mapping literal from a completion (fences stripped).
///
/// The whole cleaned text is tried first; if that fails, the widest `{…}`
/// span is tried so prose around the object is tolerated.
pub fn parse_object_literal(response: &str) -> Result<Value, LiteralError> {
    let cleaned = strip_code_fences(response);
    let value = match parse_literal(&cleaned) {
        Ok(value) => value,
        Err(err) => match widest_span(&cleaned, '{', '}') {
            Some(span) if span.len() < cleaned.len() => parse_literal(span)?,
            _ => return Err(err),
        },
    };
    match value {
        Value::Object(_) => Ok(value),
        other => Err(LiteralError {
            offset: 0,
            reason: format!("expected a mapping, found {}", kind_of(&other)),
        }),
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "a mapping",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn strips_fences_with_language_tag() {
        assert_eq!(strip_code_fences("```python\nprint(1)\n```"), "print(1)");
        assert_eq!(strip_code_fences("```\n{}\n```\n"), "{}");
        assert_eq!(strip_code_fences("plain"), "plain");
    }

    #[test]
    fn extracts_list_from_prose() {
        let items = parse_list_literal(
            "Here is the plan:\n```python\n[{'file': 'a.py', 'tool': 'read'}]\n```\nDone.",
        )
        .expect("list");
        assert_eq!(items, vec![json!({"file": "a.py", "tool": "read"})]);
    }

    #[test]
    fn list_parse_failure_is_reported() {
        assert!(parse_list_literal("I cannot help with that").is_err());
        assert!(parse_list_literal("{'file': 'a.py'}").is_err());
    }

    #[test]
    fn extracts_object_from_fenced_json() {
        let value = parse_object_literal(
            "```json\n{\"file\": \"a.py\", \"tool\": \"read\", \"args\": {}}\n```",
        )
        .expect("object");
        assert_eq!(value, json!({"file": "a.py", "tool": "read", "args": {}}));
    }

    #[test]
    fn extracts_object_surrounded_by_prose() {
        let value = parse_object_literal("Corrected step: {'file': 'a.py', 'tool': 'delete'} ok")
            .expect("object");
        assert_eq!(value, json!({"file": "a.py", "tool": "delete"}));
    }

    #[test]
    fn rejects_non_objects() {
        assert!(parse_object_literal("[1, 2]").is_err());
        assert!(parse_object_literal("not json").is_err());
    }
}
