/*
 * runtime/mod.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Block-directive template runtime.
//!
//! Documents embed directives as `{{#name}}body{{/name}}`. The runtime
//! parses a document into literal text and directives ([`parser`]), then
//! renders it synchronously through registered [`BlockHelper`]s
//! ([`evaluator`]).

pub mod ast;
pub mod evaluator;
pub mod parser;

pub use ast::{Directive, DirectiveNode, Literal};
pub use evaluator::{BlockHelper, DirectiveRuntime};
pub use parser::{Template, parse_macro_body};
