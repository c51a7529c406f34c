//! Source positions for every path in a raw JSON document.
//!
//! `serde_json` discards token positions, so the locator makes its own pass
//! over the text. For each path it records where the member's key token
//! starts (object members only) and where the value token starts. Lines and
//! columns are 1-based, and columns count characters, not bytes.
//!
//! # Examples
//!
//! ```
//! use frappe_diff::locator::{LocationKind, SourceLocator};
//! use frappe_diff::JsonPath;
//!
//! let text = "{\n  \"fields\": [\n    {\"fieldname\": \"title\"}\n  ]\n}";
//! let locator = SourceLocator::build(text).unwrap();
//!
//! let path = JsonPath::root().key("fields").index(0).key("fieldname");
//! assert_eq!(locator.line(&path, LocationKind::Key), Some(3));
//! ```

use crate::error::LocateError;
use crate::path::{JsonPath, Segment};
use std::collections::HashMap;

/// Line and column of a token start, both 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Position {
    pub line: usize,
    pub column: usize,
}

/// Which token of a member to locate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocationKind {
    Key,
    Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Entry {
    key: Option<Position>,
    value: Position,
}

/// Malformed input found while mapping positions.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message} at line {line} column {column}")]
pub struct ScanError {
    pub line: usize,
    pub column: usize,
    pub message: String,
}

/// Maps [`JsonPath`]s to their positions in one document's raw text.
#[derive(Debug, Clone, Default)]
pub struct SourceLocator {
    entries: HashMap<JsonPath, Entry>,
}

impl SourceLocator {
    /// Scans `raw` and records the position of every key and value.
    pub fn build(raw: &str) -> Result<Self, ScanError> {
        let mut scanner = Scanner::new(raw);
        let mut path = JsonPath::root();
        scanner.value(&mut path, None)?;
        scanner.skip_whitespace();
        if scanner.peek().is_some() {
            return Err(scanner.error("trailing characters"));
        }
        Ok(Self {
            entries: scanner.entries,
        })
    }

    /// Returns the start of the key or value token for `path`.
    ///
    /// List elements have no key token; asking for their `Key` position
    /// returns the value position.
    pub fn locate(&self, path: &JsonPath, kind: LocationKind) -> Result<Position, LocateError> {
        let entry = self
            .entries
            .get(path)
            .ok_or_else(|| LocateError::path_not_found(path))?;

        Ok(match kind {
            LocationKind::Key => entry.key.unwrap_or(entry.value),
            LocationKind::Value => entry.value,
        })
    }

    /// Line-only lookup; `None` when the path is unknown.
    pub fn line(&self, path: &JsonPath, kind: LocationKind) -> Option<usize> {
        self.locate(path, kind).ok().map(|pos| pos.line)
    }

    pub fn contains(&self, path: &JsonPath) -> bool {
        self.entries.contains_key(path)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

struct Scanner<'a> {
    bytes: &'a [u8],
    pos: usize,
    line: usize,
    column: usize,
    entries: HashMap<JsonPath, Entry>,
}

impl<'a> Scanner<'a> {
    fn new(raw: &'a str) -> Self {
        let raw = raw.strip_prefix('\u{feff}').unwrap_or(raw);
        Self {
            bytes: raw.as_bytes(),
            pos: 0,
            line: 1,
            column: 1,
            entries: HashMap::new(),
        }
    }

    fn position(&self) -> Position {
        Position {
            line: self.line,
            column: self.column,
        }
    }

    fn error(&self, message: impl Into<String>) -> ScanError {
        ScanError {
            line: self.line,
            column: self.column,
            message: message.into(),
        }
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<u8> {
        let byte = self.peek()?;
        self.pos += 1;
        if byte == b'\n' {
            self.line += 1;
            self.column = 1;
        } else if byte & 0xC0 != 0x80 {
            // UTF-8 continuation bytes belong to the previous character.
            self.column += 1;
        }
        Some(byte)
    }

    fn expect(&mut self, expected: u8) -> Result<(), ScanError> {
        match self.peek() {
            Some(byte) if byte == expected => {
                self.bump();
                Ok(())
            }
            Some(byte) => Err(self.error(format!(
                "expected '{}', found '{}'",
                expected as char, byte as char
            ))),
            None => Err(self.error(format!(
                "expected '{}', found end of input",
                expected as char
            ))),
        }
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.peek(), Some(b' ' | b'\t' | b'\n' | b'\r')) {
            self.bump();
        }
    }

    fn value(&mut self, path: &mut JsonPath, key: Option<Position>) -> Result<(), ScanError> {
        self.skip_whitespace();
        let start = self.position();
        self.entries.insert(path.clone(), Entry { key, value: start });

        match self.peek() {
            Some(b'{') => self.object(path),
            Some(b'[') => self.array(path),
            Some(b'"') => self.string().map(|_| ()),
            Some(b'-' | b'0'..=b'9') => self.number(),
            Some(b't') => self.literal("true"),
            Some(b'f') => self.literal("false"),
            Some(b'n') => self.literal("null"),
            Some(byte) => Err(self.error(format!("unexpected character '{}'", byte as char))),
            None => Err(self.error("unexpected end of input")),
        }
    }

    fn object(&mut self, path: &mut JsonPath) -> Result<(), ScanError> {
        self.expect(b'{')?;
        self.skip_whitespace();
        if self.peek() == Some(b'}') {
            self.bump();
            return Ok(());
        }

        loop {
            self.skip_whitespace();
            let key_start = self.position();
            let key = self.string()?;
            self.skip_whitespace();
            self.expect(b':')?;

            path.push(Segment::Key(key));
            self.value(path, Some(key_start))?;
            path.pop();

            self.skip_whitespace();
            match self.bump() {
                Some(b',') => continue,
                Some(b'}') => return Ok(()),
                _ => return Err(self.error("expected ',' or '}' in object")),
            }
        }
    }

    fn array(&mut self, path: &mut JsonPath) -> Result<(), ScanError> {
        self.expect(b'[')?;
        self.skip_whitespace();
        if self.peek() == Some(b']') {
            self.bump();
            return Ok(());
        }

        let mut index = 0;
        loop {
            path.push(Segment::Index(index));
            self.value(path, None)?;
            path.pop();
            index += 1;

            self.skip_whitespace();
            match self.bump() {
                Some(b',') => continue,
                Some(b']') => return Ok(()),
                _ => return Err(self.error("expected ',' or ']' in array")),
            }
        }
    }

    fn string(&mut self) -> Result<String, ScanError> {
        self.expect(b'"')?;
        let mut buf: Vec<u8> = Vec::new();

        loop {
            match self.bump() {
                Some(b'"') => break,
                Some(b'\\') => self.escape(&mut buf)?,
                Some(byte) if byte < 0x20 => {
                    return Err(self.error("control character in string"));
                }
                Some(byte) => buf.push(byte),
                None => return Err(self.error("unterminated string")),
            }
        }

        String::from_utf8(buf).map_err(|_| self.error("invalid UTF-8 in string"))
    }

    fn escape(&mut self, buf: &mut Vec<u8>) -> Result<(), ScanError> {
        let decoded = match self.bump() {
            Some(b'"') => '"',
            Some(b'\\') => '\\',
            Some(b'/') => '/',
            Some(b'b') => '\u{8}',
            Some(b'f') => '\u{c}',
            Some(b'n') => '\n',
            Some(b'r') => '\r',
            Some(b't') => '\t',
            Some(b'u') => self.unicode_escape()?,
            _ => return Err(self.error("invalid escape sequence")),
        };
        let mut tmp = [0u8; 4];
        buf.extend_from_slice(decoded.encode_utf8(&mut tmp).as_bytes());
        Ok(())
    }

    fn unicode_escape(&mut self) -> Result<char, ScanError> {
        let first = self.hex4()?;
        if (0xD800..0xDC00).contains(&first) && self.bytes[self.pos..].starts_with(b"\\u") {
            self.bump();
            self.bump();
            let second = self.hex4()?;
            if (0xDC00..0xE000).contains(&second) {
                let combined = 0x10000 + ((first - 0xD800) << 10) + (second - 0xDC00);
                return Ok(char::from_u32(combined).unwrap_or(char::REPLACEMENT_CHARACTER));
            }
            return Ok(char::REPLACEMENT_CHARACTER);
        }
        Ok(char::from_u32(first).unwrap_or(char::REPLACEMENT_CHARACTER))
    }

    fn hex4(&mut self) -> Result<u32, ScanError> {
        let mut value = 0u32;
        for _ in 0..4 {
            let digit = self
                .bump()
                .and_then(|b| (b as char).to_digit(16))
                .ok_or_else(|| self.error("invalid unicode escape"))?;
            value = value * 16 + digit;
        }
        Ok(value)
    }

    fn number(&mut self) -> Result<(), ScanError> {
        let start = self.pos;
        while matches!(
            self.peek(),
            Some(b'-' | b'+' | b'.' | b'e' | b'E' | b'0'..=b'9')
        ) {
            self.bump();
        }
        if self.pos == start || self.bytes[start..self.pos] == *b"-" {
            return Err(self.error("invalid number"));
        }
        Ok(())
    }

    fn literal(&mut self, word: &str) -> Result<(), ScanError> {
        if self.bytes[self.pos..].starts_with(word.as_bytes()) {
            for _ in 0..word.len() {
                self.bump();
            }
            Ok(())
        } else {
            Err(self.error(format!("expected '{}'", word)))
        }
    }
}
