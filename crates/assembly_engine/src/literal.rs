//! Bracketed literal syntax
//!
//! Accepts nested `[...]` / `(...)` sequences of quoted strings, numbers and
//! the keywords `True False None true false null`, with optional trailing
//! commas. This is the notation callers tend to produce when they hand over
//! table data without strict JSON quoting, e.g. `[('a', 1), ('b', 2)]`.

use serde_json::{Number, Value};

/// Deepest `[`/`(` nesting accepted, matching serde_json's recursion limit
const MAX_DEPTH: usize = 128;

/// Parse a complete literal. Trailing input other than whitespace is an error.
pub fn parse_literal(input: &str) -> Result<Value, String> {
    let mut parser = LiteralParser::new(input);
    let value = parser.value()?;
    parser.skip_ws();
    match parser.peek() {
        None => Ok(value),
        Some(c) => Err(format!("unexpected '{}' at offset {}", c, parser.pos)),
    }
}

struct LiteralParser<'a> {
    input: &'a str,
    /// Byte offset of the next unread char
    pos: usize,
    /// Open sequences enclosing the current position
    depth: usize,
}

impl<'a> LiteralParser<'a> {
    fn new(input: &'a str) -> Self {
        Self { input, pos: 0, depth: 0 }
    }

    fn peek(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn skip_ws(&mut self) {
        while matches!(self.peek(), Some(c) if c.is_whitespace()) {
            self.bump();
        }
    }

    fn value(&mut self) -> Result<Value, String> {
        self.skip_ws();
        match self.peek() {
            Some('[') => self.sequence(']'),
            Some('(') => self.sequence(')'),
            Some(q @ ('\'' | '"')) => self.string(q).map(Value::String),
            Some(c) if c == '-' || c == '+' || c == '.' || c.is_ascii_digit() => self.number(),
            Some(c) if c.is_alphabetic() => self.keyword(),
            Some(c) => Err(format!("unexpected '{}' at offset {}", c, self.pos)),
            None => Err("unexpected end of input".to_string()),
        }
    }

    fn sequence(&mut self, close: char) -> Result<Value, String> {
        if self.depth >= MAX_DEPTH {
            return Err(format!("nesting too deep at offset {}", self.pos));
        }
        self.depth += 1;
        let result = self.sequence_items(close);
        self.depth -= 1;
        result
    }

    fn sequence_items(&mut self, close: char) -> Result<Value, String> {
        self.bump();
        let mut items = Vec::new();
        let mut saw_comma = false;
        loop {
            self.skip_ws();
            if self.peek() == Some(close) {
                self.bump();
                break;
            }
            items.push(self.value()?);
            self.skip_ws();
            match self.bump() {
                Some(',') => saw_comma = true,
                Some(c) if c == close => break,
                Some(c) => return Err(format!("expected ',' or '{}' but found '{}'", close, c)),
                None => return Err(format!("unclosed '{}'", close)),
            }
        }

        // `(x)` is plain grouping, `(x,)` is a one-item tuple
        if close == ')' && items.len() == 1 && !saw_comma {
            return Ok(items.remove(0));
        }
        Ok(Value::Array(items))
    }

    fn string(&mut self, quote: char) -> Result<String, String> {
        self.bump();
        let mut out = String::new();
        loop {
            match self.bump() {
                None => return Err("unterminated string".to_string()),
                Some(c) if c == quote => return Ok(out),
                Some('\\') => match self.bump() {
                    Some('n') => out.push('\n'),
                    Some('t') => out.push('\t'),
                    Some('r') => out.push('\r'),
                    Some('0') => out.push('\0'),
                    Some('u') => out.push(self.unicode_escape()?),
                    Some(c @ ('\\' | '\'' | '"')) => out.push(c),
                    Some(c) => {
                        out.push('\\');
                        out.push(c);
                    }
                    None => return Err("unterminated escape".to_string()),
                },
                Some(c) => out.push(c),
            }
        }
    }

    fn unicode_escape(&mut self) -> Result<char, String> {
        let start = self.pos;
        let end = start + 4;
        let hex = self
            .input
            .get(start..end)
            .ok_or_else(|| "truncated \\u escape".to_string())?;
        let code = u32::from_str_radix(hex, 16).map_err(|_| format!("bad \\u escape '{}'", hex))?;
        self.pos = end;
        char::from_u32(code).ok_or_else(|| format!("invalid code point {:04x}", code))
    }

    fn number(&mut self) -> Result<Value, String> {
        let start = self.pos;
        if matches!(self.peek(), Some('-' | '+')) {
            self.bump();
        }
        let mut is_float = false;
        while let Some(c) = self.peek() {
            match c {
                '0'..='9' | '_' => {}
                '.' => is_float = true,
                'e' | 'E' => {
                    is_float = true;
                    self.bump();
                    if matches!(self.peek(), Some('-' | '+')) {
                        self.bump();
                    }
                    continue;
                }
                _ => break,
            }
            self.bump();
        }

        let text: String = self.input[start..self.pos].chars().filter(|c| *c != '_').collect();
        if !is_float {
            if let Ok(n) = text.parse::<i64>() {
                return Ok(Value::Number(n.into()));
            }
        }
        text.parse::<f64>()
            .ok()
            .and_then(Number::from_f64)
            .map(Value::Number)
            .ok_or_else(|| format!("invalid number '{}'", text))
    }

    fn keyword(&mut self) -> Result<Value, String> {
        let start = self.pos;
        while matches!(self.peek(), Some(c) if c.is_alphanumeric() || c == '_') {
            self.bump();
        }
        match &self.input[start..self.pos] {
            "True" | "true" => Ok(Value::Bool(true)),
            "False" | "false" => Ok(Value::Bool(false)),
            "None" | "null" => Ok(Value::Null),
            other => Err(format!("unknown name '{}'", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_single_quoted_rows() {
        let value = parse_literal("[['Name', 'Age'], ['Kim', 30]]").unwrap();
        assert_eq!(value, json!([["Name", "Age"], ["Kim", 30]]));
    }

    #[test]
    fn test_tuples_and_trailing_commas() {
        let value = parse_literal("[('a', 1.5,), ('b', None),]").unwrap();
        assert_eq!(value, json!([["a", 1.5], ["b", null]]));
    }

    #[test]
    fn test_grouping_parens_unwrap() {
        assert_eq!(parse_literal("(1)").unwrap(), json!(1));
        assert_eq!(parse_literal("(1,)").unwrap(), json!([1]));
    }

    #[test]
    fn test_escapes() {
        let value = parse_literal(r#"['it\'s', "line\nbreak", 'é']"#).unwrap();
        assert_eq!(value, json!(["it's", "line\nbreak", "é"]));
    }

    #[test]
    fn test_keywords_and_negative_numbers() {
        let value = parse_literal("[True, false, -3, 1e3]").unwrap();
        assert_eq!(value, json!([true, false, -3, 1000.0]));
    }

    #[test]
    fn test_rejects_garbage() {
        assert!(parse_literal("not json, not list").is_err());
        assert!(parse_literal("[1, 2").is_err());
        assert!(parse_literal("[1] trailing").is_err());
        assert!(parse_literal("'open").is_err());
    }

    #[test]
    fn test_nesting_limit() {
        let deep = "[".repeat(20_000);
        assert!(parse_literal(&deep).unwrap_err().contains("nesting too deep"));

        let nested = format!("{}1{}", "(".repeat(60), ",)".repeat(60));
        assert!(parse_literal(&nested).is_ok());
    }
}
