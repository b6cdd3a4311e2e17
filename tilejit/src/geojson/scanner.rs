//! Single-pass JSON token scanner.
//!
//! Produces a flat stream of token events from a byte slice without building
//! a tree. The scanner validates structural well-formedness (balanced
//! containers, comma/colon placement, token syntax) as it goes; the feature
//! state machine layered on top only ever sees a valid event stream.
//!
//! Two deliberate leniencies, matching the tile servers this datasource
//! talks to: `//` and `/* */` comments are skipped as whitespace, and any
//! bytes after the top-level value closes are ignored.

use thiserror::Error;

/// Malformed JSON token stream.
///
/// `offset` is the number of input bytes consumed when the error was
/// detected.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("invalid GeoJSON at byte {offset}: {message}")]
pub struct ParseError {
    pub message: String,
    pub offset: usize,
}

impl ParseError {
    pub(crate) fn new(message: impl Into<String>, offset: usize) -> Self {
        Self {
            message: message.into(),
            offset,
        }
    }
}

/// One token event.
///
/// String contents are escape-decoded but otherwise raw bytes: transcoding
/// from the payload's declared encoding happens in the feature parser, not
/// here. Object keys are decoded to UTF-8 eagerly since they are only ever
/// compared against known ASCII names.
#[derive(Debug, Clone, PartialEq)]
pub enum JsonEvent {
    StartObject,
    EndObject,
    StartArray,
    EndArray,
    Key(String),
    String(Vec<u8>),
    Number(f64),
    Bool(bool),
    Null,
    /// The top-level value is complete; trailing garbage is not inspected.
    End,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Container {
    Object,
    Array,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Expect {
    /// A value (after `:` or `,` in an array, or at document start)
    Value,
    /// A value or `]` (immediately after `[`)
    ValueOrClose,
    /// A key or `}` (immediately after `{`)
    KeyOrClose,
    /// A key (after `,` in an object)
    Key,
    /// `:` after a key
    Colon,
    /// `,` or the matching close bracket after a value
    CommaOrClose,
}

/// Pull-based token scanner over one payload.
pub struct JsonScanner<'a> {
    input: &'a [u8],
    pos: usize,
    stack: Vec<Container>,
    expect: Expect,
    done: bool,
}

impl<'a> JsonScanner<'a> {
    pub fn new(input: &'a [u8]) -> Self {
        Self {
            input,
            pos: 0,
            stack: Vec::new(),
            expect: Expect::Value,
            done: false,
        }
    }

    /// Bytes consumed so far.
    pub fn offset(&self) -> usize {
        self.pos
    }

    fn err(&self, message: impl Into<String>) -> ParseError {
        ParseError::new(message, self.pos)
    }

    fn peek(&self) -> Option<u8> {
        self.input.get(self.pos).copied()
    }

    /// Skips whitespace and comments.
    fn skip_filler(&mut self) -> Result<(), ParseError> {
        loop {
            match self.peek() {
                Some(b' ') | Some(b'\t') | Some(b'\n') | Some(b'\r') => self.pos += 1,
                Some(b'/') => match self.input.get(self.pos + 1) {
                    Some(b'/') => {
                        self.pos += 2;
                        while let Some(c) = self.peek() {
                            self.pos += 1;
                            if c == b'\n' {
                                break;
                            }
                        }
                    }
                    Some(b'*') => {
                        self.pos += 2;
                        loop {
                            match self.peek() {
                                Some(b'*') if self.input.get(self.pos + 1) == Some(&b'/') => {
                                    self.pos += 2;
                                    break;
                                }
                                Some(_) => self.pos += 1,
                                None => return Err(self.err("unterminated comment")),
                            }
                        }
                    }
                    _ => return Ok(()),
                },
                _ => return Ok(()),
            }
        }
    }

    /// A value just finished: either the document is done or a separator is
    /// expected next.
    fn value_complete(&mut self) {
        if self.stack.is_empty() {
            self.done = true;
        } else {
            self.expect = Expect::CommaOrClose;
        }
    }

    fn close_container(&mut self, closing: Container) -> Result<JsonEvent, ParseError> {
        match self.stack.pop() {
            Some(open) if open == closing => {
                self.pos += 1;
                self.value_complete();
                Ok(match closing {
                    Container::Object => JsonEvent::EndObject,
                    Container::Array => JsonEvent::EndArray,
                })
            }
            Some(_) => Err(self.err("mismatched closing bracket")),
            None => Err(self.err("unbalanced closing bracket")),
        }
    }

    /// Returns the next token event, or `End` once the top-level value has
    /// closed.
    pub fn next_event(&mut self) -> Result<JsonEvent, ParseError> {
        if self.done {
            return Ok(JsonEvent::End);
        }
        self.skip_filler()?;

        let Some(c) = self.peek() else {
            return Err(self.err("unexpected end of input"));
        };

        match self.expect {
            Expect::Value | Expect::ValueOrClose => {
                if c == b']' && self.expect == Expect::ValueOrClose {
                    return self.close_container(Container::Array);
                }
                self.scan_value(c)
            }
            Expect::KeyOrClose | Expect::Key => match c {
                b'"' => {
                    let bytes = self.scan_string_body()?;
                    self.expect = Expect::Colon;
                    Ok(JsonEvent::Key(String::from_utf8_lossy(&bytes).into_owned()))
                }
                b'}' if self.expect == Expect::KeyOrClose => {
                    self.close_container(Container::Object)
                }
                _ => Err(self.err("expected object key")),
            },
            Expect::Colon => {
                if c == b':' {
                    self.pos += 1;
                    self.expect = Expect::Value;
                    self.next_event()
                } else {
                    Err(self.err("expected ':' after object key"))
                }
            }
            Expect::CommaOrClose => match c {
                b',' => {
                    self.pos += 1;
                    self.expect = match self.stack.last() {
                        Some(Container::Object) => Expect::Key,
                        _ => Expect::Value,
                    };
                    self.next_event()
                }
                b'}' => self.close_container(Container::Object),
                b']' => self.close_container(Container::Array),
                _ => Err(self.err("expected ',' or closing bracket")),
            },
        }
    }

    fn scan_value(&mut self, c: u8) -> Result<JsonEvent, ParseError> {
        match c {
            b'{' => {
                self.pos += 1;
                self.stack.push(Container::Object);
                self.expect = Expect::KeyOrClose;
                Ok(JsonEvent::StartObject)
            }
            b'[' => {
                self.pos += 1;
                self.stack.push(Container::Array);
                self.expect = Expect::ValueOrClose;
                Ok(JsonEvent::StartArray)
            }
            b'"' => {
                let bytes = self.scan_string_body()?;
                self.value_complete();
                Ok(JsonEvent::String(bytes))
            }
            b't' => {
                self.scan_literal(b"true")?;
                self.value_complete();
                Ok(JsonEvent::Bool(true))
            }
            b'f' => {
                self.scan_literal(b"false")?;
                self.value_complete();
                Ok(JsonEvent::Bool(false))
            }
            b'n' => {
                self.scan_literal(b"null")?;
                self.value_complete();
                Ok(JsonEvent::Null)
            }
            b'-' | b'0'..=b'9' => {
                let n = self.scan_number()?;
                self.value_complete();
                Ok(JsonEvent::Number(n))
            }
            _ => Err(self.err("invalid token")),
        }
    }

    fn scan_literal(&mut self, literal: &'static [u8]) -> Result<(), ParseError> {
        if self.input[self.pos..].starts_with(literal) {
            self.pos += literal.len();
            Ok(())
        } else {
            Err(self.err("invalid token"))
        }
    }

    fn scan_number(&mut self) -> Result<f64, ParseError> {
        let start = self.pos;
        while let Some(c) = self.peek() {
            match c {
                b'-' | b'+' | b'.' | b'e' | b'E' | b'0'..=b'9' => self.pos += 1,
                _ => break,
            }
        }
        let text = std::str::from_utf8(&self.input[start..self.pos])
            .map_err(|_| self.err("invalid number"))?;
        text.parse::<f64>().map_err(|_| self.err("invalid number"))
    }

    /// Scans a string starting at the opening quote, returning the
    /// escape-decoded content bytes.
    fn scan_string_body(&mut self) -> Result<Vec<u8>, ParseError> {
        debug_assert_eq!(self.peek(), Some(b'"'));
        self.pos += 1;

        let mut out = Vec::new();
        loop {
            let Some(c) = self.peek() else {
                return Err(self.err("unterminated string"));
            };
            self.pos += 1;
            match c {
                b'"' => return Ok(out),
                b'\\' => {
                    let Some(esc) = self.peek() else {
                        return Err(self.err("unterminated string"));
                    };
                    self.pos += 1;
                    match esc {
                        b'"' => out.push(b'"'),
                        b'\\' => out.push(b'\\'),
                        b'/' => out.push(b'/'),
                        b'b' => out.push(0x08),
                        b'f' => out.push(0x0c),
                        b'n' => out.push(b'\n'),
                        b'r' => out.push(b'\r'),
                        b't' => out.push(b'\t'),
                        b'u' => {
                            let ch = self.scan_unicode_escape()?;
                            let mut buf = [0u8; 4];
                            out.extend_from_slice(ch.encode_utf8(&mut buf).as_bytes());
                        }
                        _ => return Err(self.err("invalid escape sequence")),
                    }
                }
                0x00..=0x1f => return Err(self.err("unescaped control character in string")),
                other => out.push(other),
            }
        }
    }

    fn scan_unicode_escape(&mut self) -> Result<char, ParseError> {
        let high = self.scan_hex4()?;
        if (0xd800..0xdc00).contains(&high) {
            // Surrogate pair: a second \uXXXX must follow.
            if self.peek() == Some(b'\\') && self.input.get(self.pos + 1) == Some(&b'u') {
                self.pos += 2;
                let low = self.scan_hex4()?;
                if !(0xdc00..0xe000).contains(&low) {
                    return Err(self.err("invalid low surrogate"));
                }
                let code = 0x10000 + ((high - 0xd800) << 10) + (low - 0xdc00);
                return char::from_u32(code).ok_or_else(|| self.err("invalid surrogate pair"));
            }
            return Err(self.err("unpaired surrogate"));
        }
        char::from_u32(high).ok_or_else(|| self.err("invalid unicode escape"))
    }

    fn scan_hex4(&mut self) -> Result<u32, ParseError> {
        let mut value = 0u32;
        for _ in 0..4 {
            let Some(c) = self.peek() else {
                return Err(self.err("truncated unicode escape"));
            };
            let digit = (c as char)
                .to_digit(16)
                .ok_or_else(|| self.err("invalid unicode escape"))?;
            value = value * 16 + digit;
            self.pos += 1;
        }
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn events(input: &str) -> Result<Vec<JsonEvent>, ParseError> {
        let mut scanner = JsonScanner::new(input.as_bytes());
        let mut out = Vec::new();
        loop {
            match scanner.next_event()? {
                JsonEvent::End => return Ok(out),
                event => out.push(event),
            }
        }
    }

    #[test]
    fn test_flat_object() {
        let got = events(r#"{"a": 1, "b": "x", "c": null, "d": true}"#).unwrap();
        assert_eq!(
            got,
            vec![
                JsonEvent::StartObject,
                JsonEvent::Key("a".to_string()),
                JsonEvent::Number(1.0),
                JsonEvent::Key("b".to_string()),
                JsonEvent::String(b"x".to_vec()),
                JsonEvent::Key("c".to_string()),
                JsonEvent::Null,
                JsonEvent::Key("d".to_string()),
                JsonEvent::Bool(true),
                JsonEvent::EndObject,
            ]
        );
    }

    #[test]
    fn test_nested_arrays() {
        let got = events("[[1.5, -2], []]").unwrap();
        assert_eq!(
            got,
            vec![
                JsonEvent::StartArray,
                JsonEvent::StartArray,
                JsonEvent::Number(1.5),
                JsonEvent::Number(-2.0),
                JsonEvent::EndArray,
                JsonEvent::StartArray,
                JsonEvent::EndArray,
                JsonEvent::EndArray,
            ]
        );
    }

    #[test]
    fn test_comments_are_skipped() {
        let got = events("{ // line comment\n \"a\" /* block */ : 1 }").unwrap();
        assert_eq!(
            got,
            vec![
                JsonEvent::StartObject,
                JsonEvent::Key("a".to_string()),
                JsonEvent::Number(1.0),
                JsonEvent::EndObject,
            ]
        );
    }

    #[test]
    fn test_trailing_garbage_is_ignored() {
        assert!(events("{\"a\": 1} trailing nonsense !!!").is_ok());
    }

    #[test]
    fn test_unbalanced_object_errors() {
        let input = r#"{"features":["#;
        let err = events(input).unwrap_err();
        assert_eq!(err.offset, input.len());
    }

    #[test]
    fn test_missing_colon_errors() {
        assert!(events(r#"{"a" 1}"#).is_err());
    }

    #[test]
    fn test_mismatched_brackets_error() {
        assert!(events(r#"{"a": [1}}"#).is_err());
    }

    #[test]
    fn test_invalid_token_errors() {
        assert!(events("{\"a\": qux}").is_err());
    }

    #[test]
    fn test_empty_input_errors() {
        assert!(events("").is_err());
        assert!(events("   ").is_err());
    }

    #[test]
    fn test_string_escapes() {
        let got = events(r#""a\n\t\"\\ bé""#).unwrap();
        assert_eq!(got, vec![JsonEvent::String("a\n\t\"\\ b\u{e9}".as_bytes().to_vec())]);
    }

    #[test]
    fn test_surrogate_pair() {
        let got = events(r#""\ud83d\ude00""#).unwrap();
        assert_eq!(got, vec![JsonEvent::String("\u{1f600}".as_bytes().to_vec())]);
    }

    #[test]
    fn test_unpaired_surrogate_errors() {
        assert!(events(r#""\ud83d""#).is_err());
    }

    #[test]
    fn test_scientific_numbers() {
        let got = events("[1e3, -2.5E-2]").unwrap();
        assert_eq!(
            got,
            vec![
                JsonEvent::StartArray,
                JsonEvent::Number(1000.0),
                JsonEvent::Number(-0.025),
                JsonEvent::EndArray,
            ]
        );
    }

    #[test]
    fn test_non_utf8_string_bytes_pass_through() {
        // 0xe9 is "é" in latin-1; the scanner must not mangle it.
        let input: Vec<u8> = [b"\"caf".as_ref(), &[0xe9], b"\""].concat();
        let mut scanner = JsonScanner::new(&input);
        let event = scanner.next_event().unwrap();
        assert_eq!(event, JsonEvent::String(vec![b'c', b'a', b'f', 0xe9]));
    }
}
