/*
 * runtime/parser.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Directive scanner.
//!
//! Splits a document into literal text and block directives
//! (`{{#name}}body{{/name}}`). Only names accepted by the caller's predicate
//! become directives; every other tag is left in the literal text. Blocks of
//! the same name may nest; the scanner pairs each opening tag with its
//! matching closing tag.

use serde_json::{Map, Value};

use crate::error::{MacroError, MacroResult};
use crate::runtime::ast::{Directive, DirectiveNode, Literal};

/// A parsed document ready for evaluation.
#[derive(Debug, Clone)]
pub struct Template {
    /// The parsed nodes, in document order.
    pub(crate) nodes: Vec<DirectiveNode>,

    /// Original source.
    pub(crate) source: String,
}

impl Template {
    /// Parse `source`, treating `{{#name}}` as a directive when
    /// `is_directive(name)` holds.
    pub fn parse(source: &str, is_directive: impl Fn(&str) -> bool) -> Self {
        let mut nodes = Vec::new();
        let mut lines = LineTracker::new(source);
        let mut pos = 0;
        let mut literal_start = 0;

        while let Some(rel) = source[pos..].find("{{#") {
            let open_start = pos + rel;
            let name_start = open_start + 3;
            let name_len = source[name_start..]
                .find(|c: char| !is_name_char(c))
                .unwrap_or(source.len() - name_start);
            let name = &source[name_start..name_start + name_len];
            let tag_end = name_start + name_len;

            if name.is_empty() || !source[tag_end..].starts_with("}}") || !is_directive(name) {
                pos = name_start;
                continue;
            }

            push_literal(&mut nodes, &mut lines, source, literal_start, open_start);
            let line = lines.line_at(open_start);
            let body_start = tag_end + 2;

            match find_closing_tag(source, body_start, name) {
                Some((close_start, close_end)) => {
                    nodes.push(DirectiveNode::Directive(Directive {
                        name: name.to_string(),
                        body: Some(source[body_start..close_start].to_string()),
                        line,
                        source: source[open_start..close_end].to_string(),
                    }));
                    pos = close_end;
                }
                None => {
                    nodes.push(DirectiveNode::Directive(Directive {
                        name: name.to_string(),
                        body: None,
                        line,
                        source: source[open_start..body_start].to_string(),
                    }));
                    pos = body_start;
                }
            }
            literal_start = pos;
        }

        push_literal(&mut nodes, &mut lines, source, literal_start, source.len());

        Template {
            nodes,
            source: source.to_string(),
        }
    }

    /// The source this template was parsed from.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// The parsed nodes.
    pub fn nodes(&self) -> &[DirectiveNode] {
        &self.nodes
    }

    /// Iterate over the directives of this template.
    pub fn directives(&self) -> impl Iterator<Item = &Directive> {
        self.nodes.iter().filter_map(|node| match node {
            DirectiveNode::Directive(d) => Some(d),
            DirectiveNode::Literal(_) => None,
        })
    }
}

/// Parse a directive body: an inline JSON key/value list without braces.
///
/// An empty (or all-whitespace) body is an empty object.
pub fn parse_macro_body(body: &str) -> MacroResult<Value> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return Ok(Value::Object(Map::new()));
    }

    serde_json::from_str::<Map<String, Value>>(&format!("{{{}}}", trimmed))
        .map(Value::Object)
        .map_err(|e| MacroError::parse(format!("Invalid macro body: {}", e)))
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '-'
}

fn push_literal(
    nodes: &mut Vec<DirectiveNode>,
    lines: &mut LineTracker,
    source: &str,
    start: usize,
    end: usize,
) {
    if start < end {
        nodes.push(DirectiveNode::Literal(Literal {
            text: source[start..end].to_string(),
            line: lines.line_at(start),
        }));
    }
}

/// Find the closing tag matching an opening tag of `name` whose body starts
/// at `from`. Returns the start and end offsets of the closing tag.
fn find_closing_tag(source: &str, from: usize, name: &str) -> Option<(usize, usize)> {
    let open = format!("{{{{#{}}}}}", name);
    let close = format!("{{{{/{}}}}}", name);
    let mut depth = 1;
    let mut pos = from;

    loop {
        let close_start = source[pos..].find(&close)? + pos;
        match source[pos..close_start].find(&open) {
            Some(rel) => {
                depth += 1;
                pos += rel + open.len();
            }
            None => {
                depth -= 1;
                if depth == 0 {
                    return Some((close_start, close_start + close.len()));
                }
                pos = close_start + close.len();
            }
        }
    }
}

/// Converts byte offsets into 1-based line numbers.
///
/// Offsets must be queried in non-decreasing order.
struct LineTracker<'a> {
    source: &'a str,
    offset: usize,
    line: usize,
}

impl<'a> LineTracker<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            source,
            offset: 0,
            line: 1,
        }
    }

    fn line_at(&mut self, offset: usize) -> usize {
        if offset > self.offset {
            self.line += self.source[self.offset..offset].matches('\n').count();
            self.offset = offset;
        }
        self.line
    }
}
