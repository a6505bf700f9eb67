/*
 * runtime/evaluator.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Synchronous directive evaluation.
//!
//! [`DirectiveRuntime`] holds one [`BlockHelper`] per directive name. A
//! render pass walks a parsed [`Template`] once, copies literal text and asks
//! each directive's helper for its replacement text. Helpers never suspend:
//! work that needs asynchronous resolution is pushed onto the [`TaskQueue`]
//! handed to every helper call, and the helper returns a placeholder for it.

use std::collections::HashMap;

use crate::error::MacroResult;
use crate::queue::TaskQueue;
use crate::runtime::ast::{Directive, DirectiveNode};
use crate::runtime::parser::Template;

/// Handler for one kind of block directive.
pub trait BlockHelper: Send + Sync {
    /// Produce the text that replaces `directive` in the output.
    ///
    /// Returning an error aborts the whole render pass.
    fn render(&self, directive: &Directive, queue: &mut TaskQueue) -> MacroResult<String>;
}

/// Registry of block helpers and the render pass over a template.
#[derive(Default)]
pub struct DirectiveRuntime<'a> {
    helpers: HashMap<String, Box<dyn BlockHelper + 'a>>,
}

impl<'a> DirectiveRuntime<'a> {
    /// Create a runtime with no helpers.
    pub fn new() -> Self {
        Self {
            helpers: HashMap::new(),
        }
    }

    /// Register `helper` for directives named `name`, replacing any
    /// previous registration.
    pub fn register(&mut self, name: impl Into<String>, helper: Box<dyn BlockHelper + 'a>) {
        self.helpers.insert(name.into(), helper);
    }

    /// Whether a helper is registered for `name`.
    pub fn is_registered(&self, name: &str) -> bool {
        self.helpers.contains_key(name)
    }

    /// Parse `source`, recognizing the registered directive names.
    pub fn compile(&self, source: &str) -> Template {
        Template::parse(source, |name| self.is_registered(name))
    }

    /// Render a template, queueing deferred work on `queue`.
    pub fn render(&self, template: &Template, queue: &mut TaskQueue) -> MacroResult<String> {
        let mut output = String::with_capacity(template.source().len());
        for node in template.nodes() {
            match node {
                DirectiveNode::Literal(literal) => output.push_str(&literal.text),
                DirectiveNode::Directive(directive) => match self.helpers.get(&directive.name) {
                    Some(helper) => output.push_str(&helper.render(directive, queue)?),
                    None => output.push_str(&directive.source),
                },
            }
        }
        Ok(output)
    }
}
