//! Parser for literal data structures in model output.
//!
//! Completion services answer with JSON about as often as with Python literal
//! syntax, so this accepts both: single- or double-quoted strings,
//! `True`/`False`/`None` alongside `true`/`false`/`null`, tuples (read as
//! arrays), and trailing commas. Anything else is an error; no expressions are
//! evaluated.

use serde_json::{Map, Number, Value};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid literal at byte {offset}: {reason}")]
pub struct LiteralError {
    pub offset: usize,
    pub reason: String,
}

/// Parse exactly one literal value from `input`, ignoring surrounding
/// whitespace.
pub fn parse_literal(input: &str) -> Result<Value, LiteralError> {
    let mut parser = Parser {
        src: input,
        pos: 0,
        depth: 0,
    };
    let value = parser.value()?;
    parser.skip_ws();
    if parser.pos != input.len() {
        return Err(parser.error("trailing characters after literal"));
    }
    Ok(value)
}

/// Deepest list/mapping nesting accepted, matching serde_json's recursion limit.
const MAX_DEPTH: usize = 128;

struct Parser<'a> {
    src: &'a str,
    pos: usize,
    depth: usize,
}

impl Parser<'_> {
    fn error(&self, reason: impl Into<String>) -> LiteralError {
        LiteralError {
            offset: self.pos,
            reason: reason.into(),
        }
    }

    fn peek(&self) -> Option<char> {
        self.src[self.pos..].chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos += ch.len_utf8();
        Some(ch)
    }

    fn skip_ws(&mut self) {
        while let Some(ch) = self.peek() {
            if ch.is_whitespace() {
                self.pos += ch.len_utf8();
            } else {
                break;
            }
        }
    }

    fn expect(&mut self, want: char) -> Result<(), LiteralError> {
        self.skip_ws();
        match self.bump() {
            Some(ch) if ch == want => Ok(()),
            Some(ch) => Err(self.error(format!("expected `{want}`, found `{ch}`"))),
            None => Err(self.error(format!("expected `{want}`, found end of input"))),
        }
    }

    fn value(&mut self) -> Result<Value, LiteralError> {
        self.skip_ws();
        match self.peek() {
            Some('[') => self.nested(|parser| parser.sequence('[', ']')),
            Some('(') => self.nested(|parser| parser.sequence('(', ')')),
            Some('{') => self.nested(Self::mapping),
            Some(quote @ ('"' | '\'')) => self.string(quote).map(Value::String),
            Some(ch) if ch == '-' || ch == '+' || ch.is_ascii_digit() => self.number(),
            Some(ch) if ch.is_ascii_alphabetic() => self.keyword(),
            Some(ch) => Err(self.error(format!("unexpected character `{ch}`"))),
            None => Err(self.error("unexpected end of input")),
        }
    }

    fn nested(
        &mut self,
        parse: impl FnOnce(&mut Self) -> Result<Value, LiteralError>,
    ) -> Result<Value, LiteralError> {
        if self.depth >= MAX_DEPTH {
            return Err(self.error("nesting too deep"));
        }
        self.depth += 1;
        let result = parse(self);
        self.depth -= 1;
        result
    }

    fn sequence(&mut self, open: char, close: char) -> Result<Value, LiteralError> {
        self.expect(open)?;
        let mut items = Vec::new();
        loop {
            self.skip_ws();
            if self.peek() == Some(close) {
                self.bump();
                return Ok(Value::Array(items));
            }
            items.push(self.value()?);
            self.skip_ws();
            match self.bump() {
                Some(',') => continue,
                Some(ch) if ch == close => return Ok(Value::Array(items)),
                _ => return Err(self.error(format!("expected `,` or `{close}`"))),
            }
        }
    }

    fn mapping(&mut self) -> Result<Value, LiteralError> {
        self.expect('{')?;
        let mut map = Map::new();
        loop {
            self.skip_ws();
            if self.peek() == Some('}') {
                self.bump();
                return Ok(Value::Object(map));
            }
            let key = match self.value()? {
                Value::String(key) => key,
                Value::Number(number) => number.to_string(),
                _ => return Err(self.error("mapping keys must be strings")),
            };
            self.expect(':')?;
            let value = self.value()?;
            map.insert(key, value);
            self.skip_ws();
            match self.bump() {
                Some(',') => continue,
                Some('}') => return Ok(Value::Object(map)),
                _ => return Err(self.error("expected `,` or `}`")),
            }
        }
    }

    fn string(&mut self, quote: char) -> Result<String, LiteralError> {
        self.bump();
        let mut out = String::new();
        loop {
            let ch = self
                .bump()
                .ok_or_else(|| self.error("unterminated string"))?;
            match ch {
                '\\' => {
                    let escaped = self
                        .bump()
                        .ok_or_else(|| self.error("unterminated escape"))?;
                    match escaped {
                        'n' => out.push('\n'),
                        't' => out.push('\t'),
                        'r' => out.push('\r'),
                        '0' => out.push('\0'),
                        'b' => out.push('\u{8}'),
                        'f' => out.push('\u{c}'),
                        'u' => out.push(self.unicode_escape()?),
                        '\n' => {}
                        other => out.push(other),
                    }
                }
                ch if ch == quote => return Ok(out),
                ch => out.push(ch),
            }
        }
    }

    fn unicode_escape(&mut self) -> Result<char, LiteralError> {
        let high = self.hex4()?;
        if (0xD800..0xDC00).contains(&high) && self.src[self.pos..].starts_with("\\u") {
            self.pos += 2;
            let low = self.hex4()?;
            let combined = 0x10000 + ((high - 0xD800) << 10) + (low.wrapping_sub(0xDC00) & 0x3FF);
            return char::from_u32(combined).ok_or_else(|| self.error("invalid surrogate pair"));
        }
        char::from_u32(high).ok_or_else(|| self.error("invalid unicode escape"))
    }

    fn hex4(&mut self) -> Result<u32, LiteralError> {
        let digits = self
            .src
            .get(self.pos..self.pos + 4)
            .ok_or_else(|| self.error("short unicode escape"))?;
        let code = u32::from_str_radix(digits, 16).map_err(|_| self.error("bad unicode escape"))?;
        self.pos += 4;
        Ok(code)
    }

    fn number(&mut self) -> Result<Value, LiteralError> {
        let start = self.pos;
        if matches!(self.peek(), Some('-' | '+')) {
            self.bump();
        }
        while let Some(ch) = self.peek() {
            if ch.is_ascii_digit() || matches!(ch, '.' | 'e' | 'E' | '_') {
                self.bump();
            } else if matches!(ch, '-' | '+')
                && matches!(self.src[..self.pos].chars().last(), Some('e' | 'E'))
            {
                self.bump();
            } else {
                break;
            }
        }
        let text: String = self.src[start..self.pos]
            .chars()
            .filter(|ch| *ch != '_' && *ch != '+')
            .collect();
        if let Ok(int) = text.parse::<i64>() {
            return Ok(Value::Number(Number::from(int)));
        }
        text.parse::<f64>()
            .ok()
            .and_then(Number::from_f64)
            .map(Value::Number)
            .ok_or_else(|| LiteralError {
                offset: start,
                reason: format!("invalid number `{text}`"),
            })
    }

    fn keyword(&mut self) -> Result<Value, LiteralError> {
        let start = self.pos;
        while let Some(ch) = self.peek() {
            if ch.is_ascii_alphanumeric() || ch == '_' {
                self.bump();
            } else {
                break;
            }
        }
        match &self.src[start..self.pos] {
            "True" | "true" => Ok(Value::Bool(true)),
            "False" | "false" => Ok(Value::Bool(false)),
            "None" | "null" => Ok(Value::Null),
            other => Err(LiteralError {
                offset: start,
                reason: format!("unknown name `{other}`"),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_json() {
        let value = parse_literal(r#"[{"file": "a.py", "tool": "read", "args": {}}]"#)
            .expect("parse");
        assert_eq!(value, json!([{"file": "a.py", "tool": "read", "args": {}}]));
    }

    #[test]
    fn parses_python_literals() {
        let value = parse_literal(
            "[\n  {'file': 'x.py', 'tool': 'apply_change', 'args': {'action': 'modify', 'line': 1, 'new_code': \"print('Updated')\"}},\n]",
        )
        .expect("parse");
        assert_eq!(
            value,
            json!([{
                "file": "x.py",
                "tool": "apply_change",
                "args": {"action": "modify", "line": 1, "new_code": "print('Updated')"}
            }])
        );
    }

    #[test]
    fn parses_keywords_tuples_and_escapes() {
        let value = parse_literal(r"(True, False, None, -2, 1.5, 'a\nb', 'it\'s')").expect("parse");
        assert_eq!(value, json!([true, false, null, -2, 1.5, "a\nb", "it's"]));
    }

    #[test]
    fn rejects_expressions_and_trailing_text() {
        assert!(parse_literal("[open('x')]").is_err());
        assert!(parse_literal("[1, 2] and more").is_err());
        assert!(parse_literal("{'a': 1").is_err());
    }

    #[test]
    fn decodes_unicode_escapes() {
        let value = parse_literal(r#""caf\u00e9 \ud83d\ude00""#).expect("parse");
        assert_eq!(value, json!("caf\u{e9} \u{1f600}"));
    }

    #[test]
    fn deep_nesting_is_an_error() {
        let deep = format!("{}{}", "[".repeat(5_000), "]".repeat(5_000));
        let err = parse_literal(&deep).unwrap_err();
        assert_eq!(err.reason, "nesting too deep");

        let deep_mapping = format!("{}1{}", "{'a': ".repeat(5_000), "}".repeat(5_000));
        assert!(parse_literal(&deep_mapping).is_err());
    }

    #[test]
    fn nesting_up_to_the_limit_parses() {
        let nested = format!("{}{}", "[".repeat(MAX_DEPTH), "]".repeat(MAX_DEPTH));
        assert!(parse_literal(&nested).is_ok());
    }
}
