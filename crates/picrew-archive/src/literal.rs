//! Lenient parser for the JavaScript object-literal subset the maker page
//! embeds.
//!
//! The state blob is written by the site's client bundle, not by a JSON
//! encoder: keys are unquoted, strings may use single quotes, and the
//! minifier emits `!0`/`!1` for booleans and `void 0` for undefined. The
//! original tooling evaluated the expression in a script sandbox; this
//! parser accepts exactly that literal subset and nothing else, so there is
//! no code-execution surface at all.
//!
//! Grammar:
//! ```text
//! value  := object | array | string | number | 'true' | 'false' | 'null'
//!         | 'undefined' | 'void' value | '!0' | '!1'
//! object := '{' (key ':' value) % ',' [','] '}'
//! key    := identifier | string | number
//! array  := '[' value % ',' [','] ']'
//! string := '"' ... '"' | "'" ... "'"   (JSON escapes + \uXXXX pairs)
//! ```
//!
//! The output is a [`serde_json::Value`] whose object maps preserve key
//! insertion order (`preserve_order`), which downstream stages rely on.

use crate::error::ExtractionError;
use serde_json::{Map, Number, Value};

/// Parse a complete literal expression. Trailing input is an error.
pub fn parse(src: &str) -> Result<Value, ExtractionError> {
    let mut cursor = Cursor { src, pos: 0 };
    let value = cursor.parse_value()?;
    cursor.skip_ws();
    if cursor.pos < cursor.src.len() {
        return Err(cursor.err("trailing input after literal"));
    }
    Ok(value)
}

struct Cursor<'a> {
    src: &'a str,
    pos: usize,
}

impl Cursor<'_> {
    fn err(&self, message: impl Into<String>) -> ExtractionError {
        ExtractionError::Literal {
            offset: self.pos,
            message: message.into(),
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

    fn eat(&mut self, expected: char) -> Result<(), ExtractionError> {
        match self.bump() {
            Some(ch) if ch == expected => Ok(()),
            Some(ch) => Err(self.err(format!("expected '{expected}', found '{ch}'"))),
            None => Err(self.err(format!("expected '{expected}', found end of input"))),
        }
    }

    fn skip_ws(&mut self) {
        while matches!(self.peek(), Some(' ' | '\t' | '\n' | '\r')) {
            self.pos += 1;
        }
    }

    fn parse_value(&mut self) -> Result<Value, ExtractionError> {
        self.skip_ws();
        match self.peek() {
            Some('{') => self.parse_object(),
            Some('[') => self.parse_array(),
            Some('"') | Some('\'') => Ok(Value::String(self.parse_string()?)),
            Some('!') => self.parse_bang(),
            Some(ch) if ch.is_ascii_digit() || ch == '-' || ch == '.' => self.parse_number(),
            Some(ch) if is_ident_start(ch) => self.parse_word(),
            Some(ch) => Err(self.err(format!("unexpected character '{ch}'"))),
            None => Err(self.err("unexpected end of input")),
        }
    }

    fn parse_object(&mut self) -> Result<Value, ExtractionError> {
        self.eat('{')?;
        let mut map = Map::new();
        loop {
            self.skip_ws();
            match self.peek() {
                Some('}') => {
                    self.pos += 1;
                    break;
                }
                None => return Err(self.err("unterminated object")),
                _ => {}
            }

            let key = self.parse_key()?;
            self.skip_ws();
            self.eat(':')?;
            let value = self.parse_value()?;
            map.insert(key, value);

            self.skip_ws();
            match self.peek() {
                Some(',') => {
                    self.pos += 1; // trailing comma before '}' handled on next turn
                }
                Some('}') => {
                    self.pos += 1;
                    break;
                }
                Some(ch) => return Err(self.err(format!("expected ',' or '}}', found '{ch}'"))),
                None => return Err(self.err("unterminated object")),
            }
        }
        Ok(Value::Object(map))
    }

    fn parse_array(&mut self) -> Result<Value, ExtractionError> {
        self.eat('[')?;
        let mut items = Vec::new();
        loop {
            self.skip_ws();
            match self.peek() {
                Some(']') => {
                    self.pos += 1;
                    break;
                }
                None => return Err(self.err("unterminated array")),
                _ => {}
            }

            items.push(self.parse_value()?);

            self.skip_ws();
            match self.peek() {
                Some(',') => {
                    self.pos += 1;
                }
                Some(']') => {
                    self.pos += 1;
                    break;
                }
                Some(ch) => return Err(self.err(format!("expected ',' or ']', found '{ch}'"))),
                None => return Err(self.err("unterminated array")),
            }
        }
        Ok(Value::Array(items))
    }

    /// Object key: quoted string, bare identifier, or bare number.
    fn parse_key(&mut self) -> Result<String, ExtractionError> {
        match self.peek() {
            Some('"') | Some('\'') => self.parse_string(),
            Some(ch) if is_ident_start(ch) => Ok(self.take_ident()),
            Some(ch) if ch.is_ascii_digit() || ch == '-' => {
                let start = self.pos;
                while matches!(self.peek(), Some(c) if c.is_ascii_digit() || c == '.' || c == '-') {
                    self.pos += 1;
                }
                Ok(self.src[start..self.pos].to_owned())
            }
            Some(ch) => Err(self.err(format!("invalid object key starting with '{ch}'"))),
            None => Err(self.err("unexpected end of input in object key")),
        }
    }

    fn parse_string(&mut self) -> Result<String, ExtractionError> {
        let quote = self.bump().expect("caller checked quote");
        let mut out = String::new();
        loop {
            match self.bump() {
                None => return Err(self.err("unterminated string")),
                Some(ch) if ch == quote => return Ok(out),
                Some('\\') => out.push(self.parse_escape()?),
                Some(ch) => out.push(ch),
            }
        }
    }

    fn parse_escape(&mut self) -> Result<char, ExtractionError> {
        match self.bump() {
            None => Err(self.err("unterminated escape sequence")),
            Some('n') => Ok('\n'),
            Some('t') => Ok('\t'),
            Some('r') => Ok('\r'),
            Some('b') => Ok('\u{0008}'),
            Some('f') => Ok('\u{000C}'),
            Some('0') => Ok('\0'),
            Some('u') => self.parse_unicode_escape(),
            // Covers \\ \" \' \/ and JS's identity escapes of anything else.
            Some(ch) => Ok(ch),
        }
    }

    fn parse_unicode_escape(&mut self) -> Result<char, ExtractionError> {
        let high = self.parse_hex4()?;
        // Surrogate pair: a high surrogate must be followed by \uXXXX low.
        if (0xD800..0xDC00).contains(&high) {
            if self.peek() == Some('\\') {
                self.pos += 1;
                self.eat('u')?;
                let low = self.parse_hex4()?;
                if (0xDC00..0xE000).contains(&low) {
                    let c = 0x10000 + ((high - 0xD800) << 10) + (low - 0xDC00);
                    return char::from_u32(c).ok_or_else(|| self.err("invalid surrogate pair"));
                }
            }
            return Err(self.err("lone high surrogate in \\u escape"));
        }
        char::from_u32(high).ok_or_else(|| self.err("invalid \\u escape"))
    }

    fn parse_hex4(&mut self) -> Result<u32, ExtractionError> {
        let mut code = 0u32;
        for _ in 0..4 {
            let ch = self
                .bump()
                .ok_or_else(|| self.err("unterminated \\u escape"))?;
            let digit = ch
                .to_digit(16)
                .ok_or_else(|| self.err(format!("invalid hex digit '{ch}' in \\u escape")))?;
            code = code * 16 + digit;
        }
        Ok(code)
    }

    fn parse_number(&mut self) -> Result<Value, ExtractionError> {
        let start = self.pos;
        if self.peek() == Some('-') {
            self.pos += 1;
        }
        while matches!(
            self.peek(),
            Some(c) if c.is_ascii_digit() || matches!(c, '.' | 'e' | 'E' | '+' | '-')
        ) {
            // '+'/'-' only continue a number right after an exponent marker.
            if matches!(self.peek(), Some('+' | '-'))
                && !matches!(self.src.as_bytes().get(self.pos - 1), Some(b'e' | b'E'))
            {
                break;
            }
            self.pos += 1;
        }
        let text = &self.src[start..self.pos];

        if !text.contains(['.', 'e', 'E']) {
            if let Ok(int) = text.parse::<i64>() {
                return Ok(Value::Number(int.into()));
            }
        }
        let float: f64 = text
            .parse()
            .map_err(|_| self.err(format!("invalid number '{text}'")))?;
        Number::from_f64(float)
            .map(Value::Number)
            .ok_or_else(|| self.err(format!("non-finite number '{text}'")))
    }

    /// `!0` / `!1` — the minifier's spelling of `true` / `false`.
    fn parse_bang(&mut self) -> Result<Value, ExtractionError> {
        self.eat('!')?;
        match self.bump() {
            Some('0') => Ok(Value::Bool(true)),
            Some('1') => Ok(Value::Bool(false)),
            _ => Err(self.err("expected '!0' or '!1'")),
        }
    }

    fn parse_word(&mut self) -> Result<Value, ExtractionError> {
        let word_start = self.pos;
        let word = self.take_ident();
        match word.as_str() {
            "true" => Ok(Value::Bool(true)),
            "false" => Ok(Value::Bool(false)),
            "null" | "undefined" | "NaN" => Ok(Value::Null),
            // `void <expr>` evaluates to undefined; the operand is discarded.
            "void" => {
                self.parse_value()?;
                Ok(Value::Null)
            }
            _ => {
                self.pos = word_start;
                Err(self.err(format!(
                    "unsupported expression '{word}' (only literals are accepted)"
                )))
            }
        }
    }

    fn take_ident(&mut self) -> String {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if !is_ident_continue(c) {
                break;
            }
            self.pos += c.len_utf8();
        }
        self.src[start..self.pos].to_owned()
    }
}

fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_' || c == '$'
}

fn is_ident_continue(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_json_subset() {
        let v = parse(r#"{"a": 1, "b": [true, false, null], "c": "x"}"#).unwrap();
        assert_eq!(v, json!({"a": 1, "b": [true, false, null], "c": "x"}));
    }

    #[test]
    fn test_unquoted_and_numeric_keys() {
        let v = parse(r#"{state: {imageMakerId: 90160}, 12: "x", cpList: {1: []}}"#).unwrap();
        assert_eq!(v["state"]["imageMakerId"], json!(90160));
        assert_eq!(v["12"], json!("x"));
        assert_eq!(v["cpList"]["1"], json!([]));
    }

    #[test]
    fn test_minifier_forms() {
        let v = parse(r#"{a: !0, b: !1, c: void 0, d: undefined, e: null}"#).unwrap();
        assert_eq!(v, json!({"a": true, "b": false, "c": null, "d": null, "e": null}));
    }

    #[test]
    fn test_single_quoted_strings_and_escapes() {
        let v = parse(r#"{a: 'it\'s', b: "tab\there", c: "é😀"}"#).unwrap();
        assert_eq!(v["a"], json!("it's"));
        assert_eq!(v["b"], json!("tab\there"));
        assert_eq!(v["c"], json!("é😀"));
    }

    #[test]
    fn test_trailing_commas() {
        let v = parse(r#"{a: [1, 2, 3,], b: {c: 1,},}"#).unwrap();
        assert_eq!(v, json!({"a": [1, 2, 3], "b": {"c": 1}}));
    }

    #[test]
    fn test_numbers() {
        let v = parse(r#"[0, -7, 3.5, 1e3, 2.5e-2, -0.5]"#).unwrap();
        assert_eq!(v, json!([0, -7, 3.5, 1000.0, 0.025, -0.5]));
    }

    #[test]
    fn test_key_order_preserved() {
        let v = parse(r#"{z: 1, a: 2, m: 3}"#).unwrap();
        let keys: Vec<_> = v.as_object().unwrap().keys().cloned().collect();
        assert_eq!(keys, vec!["z", "a", "m"]);
    }

    #[test]
    fn test_rejects_non_literal_expressions() {
        assert!(parse("function(){}").is_err());
        assert!(parse("{a: window.x}").is_err());
        assert!(parse("(function(a){return {}})(1)").is_err());
    }

    #[test]
    fn test_rejects_trailing_input() {
        assert!(parse("{} extra").is_err());
    }

    #[test]
    fn test_error_carries_offset() {
        let err = parse(r#"{a: }"#).unwrap_err();
        match err {
            ExtractionError::Literal { offset, .. } => assert_eq!(offset, 4),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_unterminated_string() {
        assert!(parse(r#"{a: "oops}"#).is_err());
    }
}
