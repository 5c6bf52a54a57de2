//! Well-formedness-only XML reader
//!
//! Produces the same owning tree the builders produce, with element
//! namespaces resolved against the in-scope `xmlns` declarations. No schema
//! validation is attempted.

use crate::cursor::Cursor;
use crate::error::{Error, Result};
use crate::tree::{is_name_char, is_name_start, Document, Element, Namespace};

/// Nesting ceiling applied even when `max_depth` is 0; the reader
/// recurses once per open element
pub const HARD_MAX_DEPTH: u16 = 256;

/// Reader limits
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ReaderConfig {
    /// Maximum element nesting depth (0 means up to [`HARD_MAX_DEPTH`])
    pub max_depth: u16,
    /// Maximum input size in bytes (0 means unlimited)
    pub max_size: usize,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            max_depth: 128,
            max_size: 10 * 1024 * 1024, // 10 MB default
        }
    }
}

impl ReaderConfig {
    /// Create a new config with unlimited size and depth up to [`HARD_MAX_DEPTH`]
    pub const fn unlimited() -> Self {
        Self {
            max_depth: 0,
            max_size: 0,
        }
    }

    pub const fn new(max_depth: u16, max_size: usize) -> Self {
        Self {
            max_depth,
            max_size,
        }
    }
}

/// XML reader
#[derive(Debug)]
pub struct Reader<'a> {
    cursor: Cursor<'a>,
    input_len: usize,
    config: ReaderConfig,
    depth: u16,
    /// In-scope namespace bindings, innermost last
    scope: Vec<Namespace>,
}

impl<'a> Reader<'a> {
    pub fn new(input: &'a [u8]) -> Self {
        Self::with_config(input, ReaderConfig::default())
    }

    pub fn with_config(input: &'a [u8], config: ReaderConfig) -> Self {
        Self {
            cursor: Cursor::new(input),
            input_len: input.len(),
            config,
            depth: 0,
            scope: Vec::new(),
        }
    }

    /// Parse a complete document
    pub fn parse(&mut self) -> Result<Document> {
        if self.config.max_size > 0 && self.input_len > self.config.max_size {
            return Err(self.error_here(format!(
                "input exceeds maximum size of {} bytes",
                self.config.max_size
            )));
        }

        self.skip_misc()?;
        if self.cursor.current() != Some(b'<') {
            return Err(self.error_here("expected root element"));
        }
        let root = self.parse_element()?;
        self.skip_misc()?;

        if !self.cursor.is_eof() {
            return Err(self.error_here("content after root element"));
        }

        Ok(Document::new(root))
    }

    /// Skip whitespace, comments, processing instructions and DOCTYPE
    fn skip_misc(&mut self) -> Result<()> {
        loop {
            self.cursor.skip_whitespace();
            if self.cursor.consume_bytes(b"<?") {
                self.skip_until(b"?>")?;
            } else if self.cursor.consume_bytes(b"<!--") {
                self.skip_until(b"-->")?;
            } else if self.cursor.consume_bytes(b"<!DOCTYPE") {
                self.skip_doctype()?;
            } else {
                return Ok(());
            }
        }
    }

    fn skip_doctype(&mut self) -> Result<()> {
        let mut bracket_depth = 0usize;
        while let Some(b) = self.cursor.current() {
            self.cursor.advance();
            match b {
                b'[' => bracket_depth += 1,
                b']' => bracket_depth = bracket_depth.saturating_sub(1),
                b'>' if bracket_depth == 0 => return Ok(()),
                _ => {}
            }
        }
        Err(self.error_here("unterminated DOCTYPE"))
    }

    fn parse_element(&mut self) -> Result<Element> {
        let limit = match self.config.max_depth {
            0 => HARD_MAX_DEPTH,
            max => max.min(HARD_MAX_DEPTH),
        };
        if self.depth >= limit {
            return Err(self.error_here(format!("max depth exceeded: {limit}")));
        }
        self.depth += 1;

        let scope_mark = self.scope.len();
        let element = self.parse_element_inner();
        self.scope.truncate(scope_mark);
        self.depth -= 1;
        element
    }

    fn parse_element_inner(&mut self) -> Result<Element> {
        self.expect_byte(b'<')?;
        let start = self.cursor.position();
        let tag = self.parse_name()?;
        let attributes = self.parse_attributes()?;

        let (prefix, local) = split_qname(&tag);
        let mut element =
            Element::new(local).map_err(|err| Error::malformed_at(start, err.message()))?;

        let mut plain = Vec::new();
        for (key, value) in attributes {
            if key == "xmlns" {
                if value.is_empty() {
                    // undeclares the default namespace for this subtree
                    self.scope.push(Namespace::default_ns(""));
                } else {
                    let ns = element
                        .declare_namespace(None, &value)
                        .map_err(|err| Error::malformed_at(start, err.message()))?;
                    self.scope.push(ns);
                }
            } else if let Some(ns_prefix) = key.strip_prefix("xmlns:") {
                let ns = element
                    .declare_namespace(Some(ns_prefix), &value)
                    .map_err(|err| Error::malformed_at(start, err.message()))?;
                self.scope.push(ns);
            } else {
                plain.push((key, value));
            }
        }

        let namespace = self.resolve(prefix).ok_or_else(|| {
            Error::malformed_at(start, format!("unbound namespace prefix in <{tag}>"))
        })?;
        element.set_namespace(namespace);

        for (key, value) in plain {
            if let (Some(attr_prefix), _) = split_qname(&key) {
                if attr_prefix != "xml" && self.resolve(Some(attr_prefix)).is_none() {
                    return Err(Error::malformed_at(
                        start,
                        format!("unbound namespace prefix in attribute {key}"),
                    ));
                }
            }
            element
                .set_attribute(&key, &value)
                .map_err(|err| Error::malformed_at(start, err.message()))?;
        }

        if self.cursor.consume(b'/') {
            self.expect_byte(b'>')?;
            return Ok(element);
        }
        self.expect_byte(b'>')?;

        loop {
            if self.cursor.consume_bytes(b"</") {
                let close = self.parse_name()?;
                if close != tag {
                    return Err(self.error_here(format!(
                        "mismatched closing tag: expected </{tag}>, found </{close}>"
                    )));
                }
                self.cursor.skip_whitespace();
                self.expect_byte(b'>')?;
                return Ok(element);
            }

            if self.cursor.consume_bytes(b"<!--") {
                self.skip_until(b"-->")?;
                continue;
            }

            if self.cursor.consume_bytes(b"<![CDATA[") {
                let text = self.take_until(b"]]>")?;
                element
                    .append_text(text)
                    .map_err(|err| self.error_here(err.message()))?;
                continue;
            }

            if self.cursor.consume_bytes(b"<?") {
                self.skip_until(b"?>")?;
                continue;
            }

            if self.cursor.current() == Some(b'<') {
                let child = self.parse_element()?;
                element.append_child(child).map_err(|err| err.within("parse"))?;
                continue;
            }

            if self.cursor.is_eof() {
                return Err(self.error_here(format!("unterminated element <{tag}>")));
            }

            if let Some(text) = self.parse_text()? {
                element
                    .append_text(text)
                    .map_err(|err| self.error_here(err.message()))?;
            }
        }
    }

    /// Resolve a prefix against the scope; the outer `None` means unbound
    fn resolve(&self, prefix: Option<&str>) -> Option<Option<Namespace>> {
        let found = self.scope.iter().rev().find(|ns| ns.prefix() == prefix);
        match (prefix, found) {
            (_, Some(ns)) if ns.uri().is_empty() => Some(None),
            (_, Some(ns)) => Some(Some(ns.clone())),
            (None, None) => Some(None),
            (Some(_), None) => None,
        }
    }

    fn parse_attributes(&mut self) -> Result<Vec<(String, String)>> {
        let mut attrs: Vec<(String, String)> = Vec::new();

        loop {
            self.cursor.skip_whitespace();
            match self.cursor.current() {
                Some(b'/') | Some(b'>') => break,
                Some(_) => {}
                None => return Err(self.error_here("unexpected end of input")),
            }

            let name = self.parse_name()?;
            self.cursor.skip_whitespace();
            self.expect_byte(b'=')?;
            self.cursor.skip_whitespace();
            let value = self.parse_attribute_value()?;

            if attrs.iter().any(|(existing, _)| *existing == name) {
                return Err(self.error_here(format!("duplicate attribute {name}")));
            }
            attrs.push((name, value));
        }

        Ok(attrs)
    }

    fn parse_attribute_value(&mut self) -> Result<String> {
        let quote = match self.cursor.current() {
            Some(q @ (b'"' | b'\'')) => q,
            _ => return Err(self.error_here("expected quoted attribute value")),
        };
        self.cursor.advance();

        let start = self.cursor.pos();
        while let Some(b) = self.cursor.current() {
            if b == quote {
                let raw = self.cursor.slice_from(start);
                self.cursor.advance();
                let text = self.bytes_to_string(raw)?;
                return self.decode_entities(&text);
            }
            if b == b'<' {
                return Err(self.error_here("'<' in attribute value"));
            }
            self.cursor.advance();
        }

        Err(self.error_here("unterminated attribute value"))
    }

    fn parse_text(&mut self) -> Result<Option<String>> {
        let start = self.cursor.pos();
        while let Some(b) = self.cursor.current() {
            if b == b'<' {
                break;
            }
            self.cursor.advance();
        }

        let raw = self.cursor.slice_from(start);
        let text = self.bytes_to_string(raw)?;
        let text = self.decode_entities(&text)?;

        if text.trim().is_empty() {
            Ok(None)
        } else {
            Ok(Some(text))
        }
    }

    fn parse_name(&mut self) -> Result<String> {
        let start = self.cursor.pos();

        match self.cursor.current() {
            Some(first) if is_name_start(first) => self.cursor.advance(),
            _ => return Err(self.error_here("expected name")),
        }
        while let Some(b) = self.cursor.current() {
            if is_name_char(b) || b == b':' {
                self.cursor.advance();
            } else {
                break;
            }
        }

        let raw = self.cursor.slice_from(start);
        self.bytes_to_string(raw)
    }

    fn skip_until(&mut self, pattern: &[u8]) -> Result<()> {
        self.take_until(pattern).map(|_| ())
    }

    /// Consume up to and including `pattern`, returning what came before it
    fn take_until(&mut self, pattern: &[u8]) -> Result<String> {
        let start = self.cursor.pos();
        while !self.cursor.is_eof() {
            if self.cursor.starts_with(pattern) {
                let raw = self.cursor.slice_from(start);
                self.cursor.advance_by(pattern.len());
                return self.bytes_to_string(raw);
            }
            self.cursor.advance();
        }
        Err(self.error_here("unterminated markup"))
    }

    fn expect_byte(&mut self, expected: u8) -> Result<()> {
        if self.cursor.consume(expected) {
            Ok(())
        } else {
            Err(self.error_here(format!("expected '{}'", char::from(expected))))
        }
    }

    fn error_here(&self, message: impl Into<String>) -> Error {
        Error::malformed_at(self.cursor.position(), message)
    }

    fn bytes_to_string(&self, bytes: &[u8]) -> Result<String> {
        std::str::from_utf8(bytes)
            .map(str::to_string)
            .map_err(|_| self.error_here("invalid utf-8"))
    }

    fn decode_entities(&self, input: &str) -> Result<String> {
        let mut result = String::with_capacity(input.len());
        let mut chars = input.chars();
        while let Some(ch) = chars.next() {
            if ch != '&' {
                result.push(ch);
                continue;
            }

            let mut entity = String::new();
            let mut terminated = false;
            for next in chars.by_ref() {
                if next == ';' {
                    terminated = true;
                    break;
                }
                entity.push(next);
            }

            let decoded = match entity.as_str() {
                _ if !terminated => None,
                "amp" => Some('&'),
                "lt" => Some('<'),
                "gt" => Some('>'),
                "quot" => Some('"'),
                "apos" => Some('\''),
                _ => decode_numeric_entity(&entity),
            };

            match decoded {
                Some(ch) => result.push(ch),
                None => return Err(self.error_here(format!("invalid xml entity '&{entity}'"))),
            }
        }

        Ok(result)
    }
}

fn split_qname(name: &str) -> (Option<&str>, &str) {
    match name.split_once(':') {
        Some((prefix, local)) => (Some(prefix), local),
        None => (None, name),
    }
}

fn decode_numeric_entity(entity: &str) -> Option<char> {
    if let Some(hex) = entity.strip_prefix("#x") {
        u32::from_str_radix(hex, 16).ok().and_then(char::from_u32)
    } else if let Some(dec) = entity.strip_prefix('#') {
        dec.parse::<u32>().ok().and_then(char::from_u32)
    } else {
        None
    }
}
