/*
 * runtime/ast.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Directive template AST types.

/// A node of a parsed document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DirectiveNode {
    /// Text passed through unchanged.
    Literal(Literal),

    /// A block directive: `{{#name}}body{{/name}}`
    Directive(Directive),
}

/// Literal text node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Literal {
    /// The literal text content.
    pub text: String,
    /// 1-based line where the text starts.
    pub line: usize,
}

/// Block directive invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Directive {
    /// Directive (macro) name.
    pub name: String,
    /// Text between the opening and closing tags.
    ///
    /// `None` when the opening tag is never closed.
    pub body: Option<String>,
    /// 1-based line of the opening tag.
    pub line: usize,
    /// The directive as written, tags included.
    pub source: String,
}
