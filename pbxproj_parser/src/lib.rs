mod model;

pub use crate::model::{BuildConfiguration, BuildSettings, PbxProject};

use indexmap::IndexMap;
use std::ops::Range;
use thiserror::Error;

#[derive(Debug, Error)]
#[error("{message} at byte {offset}")]
pub struct ParseError {
    pub offset: usize,
    pub message: String,
}

/// Syntax node of the OpenStep property list, positions only.
enum Node {
    Scalar(Range<usize>),
    Dict {
        span: Range<usize>,
        entries: Vec<(Range<usize>, Node)>,
    },
    Array {
        span: Range<usize>,
    },
}

impl Node {
    fn span(&self) -> Range<usize> {
        match self {
            Node::Scalar(span) | Node::Dict { span, .. } | Node::Array { span } => span.clone(),
        }
    }

    fn field<'n>(&'n self, src: &str, name: &str) -> Option<&'n Node> {
        match self {
            Node::Dict { entries, .. } => entries
                .iter()
                .find(|(key, _)| unquote(&src[key.clone()]) == name)
                .map(|(_, value)| value),
            _ => None,
        }
    }

    fn scalar<'s>(&self, src: &'s str) -> Option<&'s str> {
        match self {
            Node::Scalar(span) => Some(&src[span.clone()]),
            _ => None,
        }
    }
}

struct Parser<'a> {
    src: &'a str,
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(src: &'a str) -> Self {
        Self {
            src,
            bytes: src.as_bytes(),
            pos: 0,
        }
    }

    fn error(&self, message: impl Into<String>) -> ParseError {
        ParseError {
            offset: self.pos,
            message: message.into(),
        }
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn starts_with(&self, pat: &str) -> bool {
        self.bytes[self.pos..].starts_with(pat.as_bytes())
    }

    /// 跳过空白与注释
    fn skip_trivia(&mut self) -> Result<(), ParseError> {
        loop {
            while matches!(self.peek(), Some(b) if b.is_ascii_whitespace()) {
                self.pos += 1;
            }
            if self.starts_with("/*") {
                match self.src[self.pos + 2..].find("*/") {
                    Some(end) => self.pos += end + 4,
                    None => return Err(self.error("unterminated comment")),
                }
            } else if self.starts_with("//") {
                match self.src[self.pos..].find('\n') {
                    Some(end) => self.pos += end + 1,
                    None => self.pos = self.bytes.len(),
                }
            } else {
                return Ok(());
            }
        }
    }

    fn expect(&mut self, byte: u8) -> Result<(), ParseError> {
        self.skip_trivia()?;
        if self.peek() == Some(byte) {
            self.pos += 1;
            Ok(())
        } else {
            Err(self.error(format!("expected '{}'", byte as char)))
        }
    }

    fn parse_value(&mut self) -> Result<Node, ParseError> {
        self.skip_trivia()?;
        match self.peek() {
            Some(b'{') => self.parse_dict(),
            Some(b'(') => self.parse_array(),
            Some(_) => self.parse_scalar().map(Node::Scalar),
            None => Err(self.error("unexpected end of input")),
        }
    }

    fn parse_dict(&mut self) -> Result<Node, ParseError> {
        let start = self.pos;
        self.pos += 1;
        let mut entries = Vec::new();
        loop {
            self.skip_trivia()?;
            if self.peek() == Some(b'}') {
                self.pos += 1;
                break;
            }
            let key = self.parse_scalar()?;
            self.expect(b'=')?;
            let value = self.parse_value()?;
            self.expect(b';')?;
            entries.push((key, value));
        }
        Ok(Node::Dict {
            span: start..self.pos,
            entries,
        })
    }

    fn parse_array(&mut self) -> Result<Node, ParseError> {
        let start = self.pos;
        self.pos += 1;
        loop {
            self.skip_trivia()?;
            if self.peek() == Some(b')') {
                self.pos += 1;
                break;
            }
            self.parse_value()?;
            self.skip_trivia()?;
            match self.peek() {
                Some(b',') => self.pos += 1,
                Some(b')') => {}
                _ => return Err(self.error("expected ',' or ')'")),
            }
        }
        Ok(Node::Array {
            span: start..self.pos,
        })
    }

    fn parse_scalar(&mut self) -> Result<Range<usize>, ParseError> {
        self.skip_trivia()?;
        let start = self.pos;
        if self.peek().is_none() {
            return Err(self.error("unexpected end of input"));
        }
        if self.peek() == Some(b'"') {
            self.pos += 1;
            while let Some(b) = self.peek() {
                match b {
                    b'\\' => self.pos += 2,
                    b'"' => {
                        self.pos += 1;
                        return Ok(start..self.pos);
                    }
                    _ => self.pos += 1,
                }
            }
            return Err(self.error("unterminated string"));
        }
        while let Some(b) = self.peek() {
            if !is_bare(b) || self.starts_with("/*") || self.starts_with("//") {
                break;
            }
            self.pos += 1;
        }
        if self.pos == start {
            return Err(self.error("unexpected character"));
        }
        Ok(start..self.pos)
    }
}

fn is_bare(b: u8) -> bool {
    !b.is_ascii_whitespace() && !b"{}()=;,\"".contains(&b)
}

/// Strips the quotes of a raw token and resolves its escapes.
pub fn unquote(raw: &str) -> String {
    if raw.len() < 2 || !raw.starts_with('"') || !raw.ends_with('"') {
        return raw.to_string();
    }
    let mut out = String::with_capacity(raw.len() - 2);
    let mut chars = raw[1..raw.len() - 1].chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}

fn line_indent(src: &str, at: usize) -> String {
    let line_start = src[..at].rfind('\n').map_or(0, |i| i + 1);
    src[line_start..at]
        .chars()
        .take_while(|c| c.is_whitespace())
        .collect()
}

fn collect_configurations(src: &str, root: &Node) -> Vec<BuildConfiguration> {
    let mut configurations = Vec::new();
    let Some(Node::Dict { entries: objects, .. }) = root.field(src, "objects") else {
        return configurations;
    };

    for (id, object) in objects {
        let isa = object.field(src, "isa").and_then(|n| n.scalar(src));
        if isa.map(unquote).as_deref() != Some("XCBuildConfiguration") {
            continue;
        }
        let Some(settings_node) = object.field(src, "buildSettings") else {
            continue;
        };
        let Node::Dict { span, entries } = settings_node else {
            continue;
        };

        let mut settings = IndexMap::new();
        for (key, value) in entries {
            settings.insert(src[key.clone()].to_string(), src[value.span()].to_string());
        }

        let key_start = match object {
            Node::Dict { entries, .. } => entries
                .iter()
                .find(|(key, _)| &src[key.clone()] == "buildSettings")
                .map_or(span.start, |(key, _)| key.start),
            _ => span.start,
        };

        configurations.push(BuildConfiguration {
            id: src[id.clone()].to_string(),
            name: object
                .field(src, "name")
                .and_then(|n| n.scalar(src))
                .map(unquote)
                .unwrap_or_default(),
            settings: BuildSettings {
                entries: settings,
                dirty: false,
            },
            span: span.clone(),
            indent: line_indent(src, key_start),
        });
    }
    configurations
}

/// 解析 project.pbxproj
pub fn parse_pbxproj(content: &str) -> Result<PbxProject, ParseError> {
    let mut parser = Parser::new(content);
    let root = parser.parse_value()?;
    parser.skip_trivia()?;
    if parser.pos != content.len() {
        return Err(parser.error("trailing content after root dictionary"));
    }
    if !matches!(root, Node::Dict { .. }) {
        return Err(ParseError {
            offset: 0,
            message: "root is not a dictionary".to_string(),
        });
    }

    Ok(PbxProject {
        configurations: collect_configurations(content, &root),
        source: content.to_string(),
    })
}
