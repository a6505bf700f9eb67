/*
 * macros/include.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! `include`: embed another card's document.
//!
//! Usage: `{{#include}}"cardKey": "c1", "levelOffset": "+1"{{/include}}`
//!
//! The included document is expanded through the full macro pipeline with
//! the context rebound to the included card, so its own macros resolve
//! against that card. The composed block is a title heading followed by the
//! expanded content, both shifted by `levelOffset`.
//!
//! Options:
//! - `levelOffset`: integer, or a string such as `"+1"` / `"-2"`
//! - `whitespace`: `keep` (default) or `trim` leading and trailing blank lines
//! - `title`: `include` (default), `exclude`, or `only` the title heading
//! - `escape`: `json` or `csv` escaping of the composed text
//!
//! `include` is structural: static, inject and static-site rendering are the
//! same.

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use serde_json::Value;

use crate::context::GenerationContext;
use crate::engine::evaluate_guarded;
use crate::error::{MacroError, MacroResult};
use crate::macros::{MacroHandler, MacroMetadata, find_card, options};
use crate::raw_block::guarded_lines;

pub static METADATA: MacroMetadata = MacroMetadata {
    name: "include",
    tag_name: "include-macro",
    schema_id: "includeMacroSchema",
};

/// Largest offset applied to the title heading.
pub const MAX_LEVEL_OFFSET: i64 = 5;

/// Deepest heading level; `=` through `======`.
const MAX_HEADING_LEVEL: i64 = MAX_LEVEL_OFFSET + 1;

static HEADING: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(={1,6})[ \t]+\S").unwrap());

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum LevelOffset {
    Number(i64),
    Text(String),
}

impl LevelOffset {
    fn resolve(&self) -> MacroResult<i64> {
        match self {
            LevelOffset::Number(n) => Ok(*n),
            LevelOffset::Text(s) => s
                .trim()
                .parse::<i64>()
                .map_err(|_| MacroError::parameter(format!("Invalid level offset: {}", s))),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
enum Whitespace {
    #[default]
    Keep,
    Trim,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
enum TitleMode {
    #[default]
    Include,
    Exclude,
    Only,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
enum Escape {
    Json,
    Csv,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IncludeOptions {
    card_key: String,
    level_offset: Option<LevelOffset>,
    #[serde(default)]
    whitespace: Whitespace,
    #[serde(default)]
    title: TitleMode,
    escape: Option<Escape>,
}

impl IncludeOptions {
    fn level_offset(&self) -> MacroResult<i64> {
        self.level_offset
            .as_ref()
            .map_or(Ok(0), LevelOffset::resolve)
    }
}

/// Heading line for the included card's title.
fn title_heading(title: &str, offset: i64) -> String {
    let level = 1i64.saturating_add(offset.min(MAX_LEVEL_OFFSET)).max(1);
    format!("{} {}", "=".repeat(level as usize), title)
}

/// Whether `line` opens or closes a delimited block whose content is not
/// parsed as AsciiDoc structure (listing, literal, passthrough, comment).
fn block_delimiter(line: &str) -> Option<&str> {
    let line = line.trim_end();
    let first = line.chars().next()?;
    let is_delimiter = matches!(first, '-' | '.' | '+' | '/')
        && line.len() >= 4
        && line.chars().all(|c| c == first);
    is_delimiter.then_some(line)
}

/// Shift every section heading in `content` by `offset` levels.
///
/// Levels are clamped to the valid range. Lines inside delimited blocks and
/// lines of restored raw blocks are left alone.
fn shift_headings(content: &str, offset: i64) -> String {
    if offset == 0 {
        return content.to_string();
    }

    let mut shifted = String::with_capacity(content.len() + 16);
    let mut open_block: Option<&str> = None;

    for (line, in_raw) in guarded_lines(content) {
        if in_raw {
            shifted.push_str(line);
            continue;
        }
        let delimiter = block_delimiter(line);
        match (open_block, delimiter) {
            (None, Some(d)) => open_block = Some(d),
            (Some(open), Some(d)) if open == d => open_block = None,
            _ => {}
        }

        if open_block.is_none() && delimiter.is_none() {
            if let Some(caps) = HEADING.captures(line) {
                let current = caps[1].len() as i64;
                let level = current.saturating_add(offset).clamp(1, MAX_HEADING_LEVEL);
                shifted.push_str(&"=".repeat(level as usize));
                shifted.push_str(&line[caps[1].len()..]);
                continue;
            }
        }
        shifted.push_str(line);
    }

    shifted
}

/// Drop leading and trailing blank lines.
///
/// Guard characters are not whitespace, so blank lines inside a raw block
/// survive.
fn trim_blank_lines(text: &str) -> String {
    let lines: Vec<&str> = text.lines().collect();
    let start = lines
        .iter()
        .position(|l| !l.trim().is_empty())
        .unwrap_or(lines.len());
    let end = lines
        .iter()
        .rposition(|l| !l.trim().is_empty())
        .map_or(start, |i| i + 1);
    lines[start..end].join("\n")
}

fn escape(text: &str, escape: Escape) -> String {
    match escape {
        Escape::Json => text
            .replace('\\', "\\\\")
            .replace('"', "\\\"")
            .replace('\n', "\\n"),
        Escape::Csv => text.replace('"', "\"\""),
    }
}

/// Handler for the `include` macro.
pub struct IncludeMacro;

#[async_trait]
impl MacroHandler for IncludeMacro {
    fn metadata(&self) -> &'static MacroMetadata {
        &METADATA
    }

    async fn handle_static(&self, ctx: &GenerationContext, data: &Value) -> MacroResult<String> {
        let options: IncludeOptions = options(&METADATA, data)?;
        let offset = options.level_offset()?;
        let card = find_card(ctx, &options.card_key).await?;

        let mut blocks = Vec::new();
        if options.title != TitleMode::Exclude {
            blocks.push(title_heading(&card.title, offset));
        }
        if options.title != TitleMode::Only {
            let child = ctx.for_included(&card.key)?;
            tracing::debug!(
                card_key = %card.key,
                depth = child.include_depth(),
                "Expanding included card"
            );
            let content = evaluate_guarded(&card.content, &child).await?;
            blocks.push(shift_headings(&content, offset));
        }

        let mut composed = format!("\n{}\n", blocks.join("\n\n"));
        if options.whitespace == Whitespace::Trim {
            composed = trim_blank_lines(&composed);
        }
        if let Some(mode) = options.escape {
            composed = escape(&composed, mode);
        }
        Ok(composed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Mode;
    use crate::macros::test_support::context;
    use crate::raw_block::strip_guards;
    use crate::store::MemoryProject;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn include(project: MemoryProject, data: Value) -> MacroResult<String> {
        let ctx = context(Mode::Static, project);
        pollster::block_on(IncludeMacro.handle_static(&ctx, &data))
    }

    fn project() -> MemoryProject {
        MemoryProject::with_cards([("c1", "Card One", "= Intro\n\nText.\n\n== Detail\n")])
    }

    #[test]
    fn test_level_offset_parsing() {
        assert_eq!(LevelOffset::Text("+1".to_string()).resolve().unwrap(), 1);
        assert_eq!(LevelOffset::Text("-2".to_string()).resolve().unwrap(), -2);
        assert_eq!(LevelOffset::Number(3).resolve().unwrap(), 3);

        let err = LevelOffset::Text("two".to_string()).resolve().unwrap_err();
        assert!(matches!(err, MacroError::Parameter(_)));
        assert_eq!(err.to_string(), "Invalid level offset: two");
    }

    #[test]
    fn test_title_heading_clamps() {
        assert_eq!(title_heading("T", 0), "= T");
        assert_eq!(title_heading("T", 2), "=== T");
        assert_eq!(title_heading("T", -4), "= T");
        assert_eq!(title_heading("T", 9), "====== T");
    }

    #[test]
    fn test_shift_headings_skips_delimited_blocks() {
        let content = "= A\n----\n= not a heading\n----\n== B\n";
        assert_eq!(
            shift_headings(content, 1),
            "== A\n----\n= not a heading\n----\n=== B\n"
        );
    }

    #[test]
    fn test_shift_headings_clamps() {
        assert_eq!(shift_headings("== A\n", -5), "= A\n");
        assert_eq!(shift_headings("===== A\n", 4), "====== A\n");
        assert_eq!(shift_headings("==not a heading\n", 1), "==not a heading\n");
        assert_eq!(shift_headings("= A\n", i64::MAX), "====== A\n");
        assert_eq!(shift_headings("== A\n", i64::MIN), "= A\n");
    }

    #[test]
    fn test_extreme_level_offsets() {
        assert_eq!(title_heading("T", i64::MAX), "====== T");
        assert_eq!(title_heading("T", i64::MIN), "= T");

        for offset in [json!(9223372036854775807i64), json!("+9223372036854775807")] {
            let output = include(project(), json!({"cardKey": "c1", "levelOffset": offset}))
                .unwrap();
            assert_eq!(
                output,
                "\n====== Card One\n\n====== Intro\n\nText.\n\n====== Detail\n\n"
            );
        }

        let output = include(
            project(),
            json!({"cardKey": "c1", "levelOffset": "-9223372036854775808"}),
        )
        .unwrap();
        assert_eq!(output, "\n= Card One\n\n= Intro\n\nText.\n\n= Detail\n\n");
    }

    #[test]
    fn test_raw_block_headings_are_not_shifted() {
        let project = MemoryProject::with_cards([(
            "c1",
            "Card One",
            "= Shifted\n{{#raw}}\n= Not a heading to shift\n{{/raw}}\n",
        )]);
        let output = include(project, json!({"cardKey": "c1", "levelOffset": "+1"})).unwrap();
        assert_eq!(
            strip_guards(&output),
            "\n== Card One\n\n== Shifted\n\n= Not a heading to shift\n\n\n"
        );
    }

    #[test]
    fn test_raw_block_from_nested_include_is_not_shifted() {
        let project = MemoryProject::with_cards([
            (
                "outer",
                "Outer",
                "{{#include}}\"cardKey\":\"inner\",\"title\":\"exclude\"{{/include}}",
            ),
            ("inner", "Inner", "{{#raw}}= Literal{{/raw}}\n= Real\n"),
        ]);
        let output = include(
            project,
            json!({"cardKey": "outer", "levelOffset": 2, "title": "exclude"}),
        )
        .unwrap();
        assert_eq!(strip_guards(&output), "\n\n= Literal\n=== Real\n\n\n");
    }

    #[test]
    fn test_include_with_offset() {
        let output = include(project(), json!({"cardKey": "c1", "levelOffset": "+1"})).unwrap();
        assert_eq!(output, "\n== Card One\n\n== Intro\n\nText.\n\n=== Detail\n\n");
    }

    #[test]
    fn test_title_exclude_and_trim() {
        let output = include(
            project(),
            json!({"cardKey": "c1", "title": "exclude", "whitespace": "trim"}),
        )
        .unwrap();
        assert_eq!(output, "= Intro\n\nText.\n\n== Detail");
    }

    #[test]
    fn test_title_only() {
        let output = include(project(), json!({"cardKey": "c1", "title": "only"})).unwrap();
        assert_eq!(output, "\n= Card One\n");
    }

    #[test]
    fn test_escape_json_and_csv() {
        let project = MemoryProject::with_cards([("q", "Say \"hi\"", "a\\b")]);
        let json_output = include(
            project.clone(),
            json!({"cardKey": "q", "title": "only", "whitespace": "trim", "escape": "json"}),
        )
        .unwrap();
        assert_eq!(json_output, "= Say \\\"hi\\\"");

        let csv_output = include(
            project,
            json!({"cardKey": "q", "title": "only", "escape": "csv"}),
        )
        .unwrap();
        assert_eq!(csv_output, "\n= Say \"\"hi\"\"\n");

        assert_eq!(escape("a\\b\n\"c\"", Escape::Json), "a\\\\b\\n\\\"c\\\"");
    }

    #[test]
    fn test_missing_card() {
        let err = include(MemoryProject::new(), json!({"cardKey": "ghost"})).unwrap_err();
        assert_eq!(err.to_string(), "Card key ghost not found");
    }

    #[test]
    fn test_nested_macros_resolve_against_included_card() {
        let mut project = MemoryProject::with_cards([
            ("c1", "Card One", "{{#xref}}\"cardKey\":\"c2\"{{/xref}}"),
            ("c2", "Card Two", ""),
        ]);
        project.add_card("root", "Root", "");
        let output = include(project, json!({"cardKey": "c1", "title": "exclude"})).unwrap();
        assert_eq!(output, "\n<<c2>>\n");
    }

    #[test]
    fn test_self_include_is_a_cycle() {
        let project = MemoryProject::with_cards([(
            "loop",
            "Loop",
            "{{#include}}\"cardKey\":\"loop\"{{/include}}",
        )]);
        let err = include(project, json!({"cardKey": "loop"})).unwrap_err();
        assert!(matches!(err, MacroError::IncludeCycle { .. }));
        assert_eq!(
            err.to_string(),
            "Circular include detected: root -> loop -> loop"
        );
    }
}
