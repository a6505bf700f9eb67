/*
 * engine.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Two-phase macro evaluation.
//!
//! [`evaluate_macros`] expands every macro of a document:
//!
//! 1. Raw blocks are extracted and replaced by sentinels.
//! 2. Every macro kind is registered on a fresh [`DirectiveRuntime`], bound
//!    to the generation context.
//! 3. One synchronous pass replaces each directive with a placeholder tag
//!    and queues a producer for its final text. Bodies are parsed and
//!    schema-checked during this pass.
//! 4. The [`TaskQueue`] is drained; producers run concurrently.
//! 5. Placeholder tags are replaced by their resolved text.
//! 6. Raw blocks are restored.
//!
//! Nested evaluations keep restored raw text bracketed by guard characters
//! (see [`raw_block::restore_guarded`]) until the outermost evaluation
//! returns.
//!
//! ## Error handling
//!
//! In validate mode every macro failure aborts the evaluation. In the other
//! modes a failure is rendered as a "Macro Error" admonition in place of the
//! offending directive, unless [`MacroError::is_fatal`] holds.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use crate::context::{GenerationContext, Mode};
use crate::error::{MacroError, MacroResult};
use crate::macros::{self, MacroKind, macro_error};
use crate::queue::TaskQueue;
use crate::raw_block;
use crate::runtime::{BlockHelper, Directive, DirectiveRuntime, parse_macro_body};
use crate::schema::validate_macro_content;
use crate::serialize::create_html_placeholder;

/// A self-closing tag carrying a `key="macro-N"` attribute.
static PLACEHOLDER_TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"<[a-zA-Z][\w-]*(?:\s[^>]*?)?\skey="(macro-\d+)"[^>]*?/>"#).unwrap());

/// Expand every macro in `source`.
///
/// ```
/// use std::sync::Arc;
/// use cards_macros::{GenerationContext, MemoryProject, Mode, Project, evaluate_macros_blocking};
///
/// let project = MemoryProject::with_cards([("c1", "Card One", "")]);
/// let ctx = GenerationContext::new(Mode::Static, "c1", Arc::new(Project::from_memory(project)));
///
/// let output = evaluate_macros_blocking("See {{#xref}}\"cardKey\":\"c1\"{{/xref}}.", &ctx).unwrap();
/// assert_eq!(output, "See <<c1>>.");
/// ```
pub async fn evaluate_macros(source: &str, context: &GenerationContext) -> MacroResult<String> {
    let guarded = evaluate_guarded(source, context).await?;
    Ok(raw_block::strip_guards(&guarded))
}

/// Expand every macro in `source`, leaving raw block text wrapped in guard
/// characters.
///
/// Nested evaluations (`include`) use this so that raw text from any depth
/// stays recognizable until the outermost [`evaluate_macros`] strips the
/// guards.
pub(crate) async fn evaluate_guarded(
    source: &str,
    context: &GenerationContext,
) -> MacroResult<String> {
    let extracted = raw_block::extract(source)?;

    let mut queue = TaskQueue::new();
    let expanded = {
        let mut runtime = DirectiveRuntime::new();
        for kind in MacroKind::all() {
            runtime.register(
                kind.metadata().name,
                Box::new(MacroBinding {
                    kind: *kind,
                    context,
                }),
            );
        }
        let template = runtime.compile(&extracted.text);
        runtime.render(&template, &mut queue)?
    };

    tracing::debug!(
        card_key = %context.card_key,
        mode = %context.mode,
        queued = queue.len(),
        "Directive pass complete"
    );

    let resolved = queue.drain().await?;
    let substituted = substitute_placeholders(&expanded, &resolved);

    Ok(raw_block::restore_guarded(&substituted, &extracted.raw_blocks))
}

/// Run [`evaluate_macros`] to completion on the current thread.
pub fn evaluate_macros_blocking(source: &str, context: &GenerationContext) -> MacroResult<String> {
    pollster::block_on(evaluate_macros(source, context))
}

/// Replace each placeholder tag with its resolved text.
///
/// Tags whose key has no result are left untouched.
fn substitute_placeholders(text: &str, resolved: &HashMap<String, String>) -> String {
    if resolved.is_empty() {
        return text.to_string();
    }
    PLACEHOLDER_TAG
        .replace_all(text, |caps: &Captures| match resolved.get(&caps[1]) {
            Some(replacement) => replacement.clone(),
            None => caps[0].to_string(),
        })
        .into_owned()
}

/// Apply the mode's error policy to a failed macro.
fn recover(macro_name: &str, context: &GenerationContext, error: MacroError) -> MacroResult<String> {
    if context.mode == Mode::Validate || error.is_fatal() {
        return Err(error);
    }
    tracing::warn!(
        macro_name,
        card_key = %context.card_key,
        error = %error,
        "Macro failed, rendering inline error"
    );
    Ok(macro_error(macro_name, &error))
}

/// A macro kind registered on the runtime for one evaluation.
struct MacroBinding<'a> {
    kind: MacroKind,
    context: &'a GenerationContext,
}

impl MacroBinding<'_> {
    /// Parse and validate the body, then queue generation.
    fn enqueue(&self, directive: &Directive, queue: &mut TaskQueue) -> MacroResult<String> {
        let metadata = self.kind.metadata();
        let body = directive.body.as_deref().ok_or_else(|| {
            MacroError::parse(format!(
                "Opening tag at line {} is never closed",
                directive.line
            ))
        })?;

        let data = parse_macro_body(body)?;
        let validated =
            validate_macro_content(metadata, &data, self.context.project.validator.as_ref())?;
        let placeholder = create_html_placeholder(metadata, &validated, &self.context.keys);

        let handler = self.kind.handler();
        let context = self.context.clone();
        queue.push(
            placeholder.key.clone(),
            Box::pin(async move {
                match macros::generate(handler, &context, &validated).await {
                    Ok(text) => Ok(text),
                    Err(error) => recover(handler.metadata().name, &context, error),
                }
            }),
        );

        tracing::debug!(
            macro_name = metadata.name,
            key = %placeholder.key,
            line = directive.line,
            "Queued macro"
        );
        Ok(placeholder.tag)
    }
}

impl BlockHelper for MacroBinding<'_> {
    fn render(&self, directive: &Directive, queue: &mut TaskQueue) -> MacroResult<String> {
        self.enqueue(directive, queue)
            .or_else(|error| recover(self.kind.metadata().name, self.context, error))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::macros::test_support::context;
    use crate::store::MemoryProject;
    use pretty_assertions::assert_eq;

    fn evaluate(mode: Mode, source: &str) -> MacroResult<String> {
        let ctx = context(mode, MemoryProject::with_cards([("c1", "Card One", "")]));
        evaluate_macros_blocking(source, &ctx)
    }

    #[test]
    fn test_plain_text_is_unchanged() {
        let source = "= Title\n\nSome *text* with {{braces}} and {{#unknown}}x{{/unknown}}.\n";
        assert_eq!(evaluate(Mode::Static, source).unwrap(), source);
    }

    #[test]
    fn test_placeholders_are_substituted_in_order() {
        let source = "a {{#xref}}\"cardKey\":\"c1\"{{/xref}} b {{#xref}}\"cardKey\":\"c1\"{{/xref}}";
        assert_eq!(
            evaluate(Mode::Inject, source).unwrap(),
            "a xref:c1.adoc[Card One] b xref:c1.adoc[Card One]"
        );
    }

    #[test]
    fn test_malformed_body_is_inline_error() {
        let output = evaluate(Mode::Static, "{{#xref}}\"cardKey\" \"c1\"{{/xref}}").unwrap();
        assert!(output.contains(".Macro Error"));
        assert!(output.contains("Invalid macro body"));
    }

    #[test]
    fn test_malformed_body_fails_validation() {
        let err = evaluate(Mode::Validate, "{{#xref}}\"cardKey\" \"c1\"{{/xref}}").unwrap_err();
        assert!(matches!(err, MacroError::Parse(_)));
    }

    #[test]
    fn test_unclosed_macro_is_scoped_to_opening_tag() {
        let output = evaluate(Mode::Static, "line\n{{#xref}}\"cardKey\":\"c1\"\nrest").unwrap();
        assert!(output.starts_with("line\n[WARNING]\n.Macro Error\n"));
        assert!(output.contains("Macro 'xref': Opening tag at line 2 is never closed"));
        assert!(output.ends_with("====\n\n\"cardKey\":\"c1\"\nrest"));
    }

    #[test]
    fn test_substitute_leaves_unknown_keys() {
        let mut resolved = HashMap::new();
        resolved.insert("macro-1".to_string(), "ONE".to_string());
        let text = "<x-macro cardKey=\"a\" key=\"macro-1\" options=\"e30=\" /> <y key=\"macro-2\" />";
        assert_eq!(
            substitute_placeholders(text, &resolved),
            "ONE <y key=\"macro-2\" />"
        );
    }

    #[test]
    fn test_card_key_attribute_is_not_a_placeholder_key() {
        let mut resolved = HashMap::new();
        resolved.insert("macro-1".to_string(), "ONE".to_string());
        let text = "<x-macro cardKey=\"macro-1\" />";
        assert_eq!(substitute_placeholders(text, &resolved), text);
    }
}
