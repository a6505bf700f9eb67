/*
 * raw_block.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Raw block extraction and restoration.
//!
//! Text between `{{#raw}}` and `{{/raw}}` must reach the output exactly as
//! written, even when it looks like a directive. [`extract`] removes every
//! raw block before macro evaluation and leaves a unique sentinel in its
//! place; [`restore`] puts the literal text back as the very last step.
//!
//! Markers may appear anywhere in a line, several times per line, and a
//! block may span lines. Raw blocks cannot nest, and every block must be
//! closed; both problems are reported with 1-based line numbers.
//!
//! Included documents are expanded inside the including one, and their text
//! is post-processed (heading shifts) before it reaches the final output.
//! [`restore_guarded`] brackets each restored block with guard characters so
//! that post-processing can recognize and skip it; [`strip_guards`] removes
//! them once the outermost evaluation is done.

use crate::error::{MacroError, MacroResult};

/// Marker opening a raw block.
pub const RAW_OPEN: &str = "{{#raw}}";

/// Marker closing a raw block.
pub const RAW_CLOSE: &str = "{{/raw}}";

/// A raw block removed from the source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawBlock {
    /// Sentinel left in the stripped source
    pub token: String,
    /// Text between the markers, unmodified
    pub literal_text: String,
    /// 1-based line of the opening marker
    pub start_line: usize,
    /// 1-based line of the closing marker
    pub end_line: usize,
}

/// Source with its raw blocks replaced by sentinels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extracted {
    /// The source with every raw block replaced by its token
    pub text: String,
    /// Extracted blocks in source order
    pub raw_blocks: Vec<RawBlock>,
}

/// Sentinel for the `index`-th raw block spanning `line_breaks` newlines.
///
/// Private-use code points keep the sentinel from colliding with authored
/// text and from looking like directive syntax. The sentinel carries as many
/// newlines as the block it replaces so that line numbers reported for the
/// stripped source match the original.
fn sentinel(index: usize, line_breaks: usize) -> String {
    format!(
        "\u{E000}raw-block-{}{}\u{E001}",
        index,
        "\n".repeat(line_breaks)
    )
}

/// Remove raw blocks from `source`.
pub fn extract(source: &str) -> MacroResult<Extracted> {
    let mut text = String::with_capacity(source.len());
    let mut raw_blocks = Vec::new();

    // Line of the currently open block, and its text so far.
    let mut open_line: Option<usize> = None;
    let mut buffer = String::new();

    for (index, line) in source.split_inclusive('\n').enumerate() {
        let line_no = index + 1;
        let mut rest = line;

        loop {
            match open_line {
                None => match rest.find(RAW_OPEN) {
                    Some(pos) => {
                        text.push_str(&rest[..pos]);
                        open_line = Some(line_no);
                        rest = &rest[pos + RAW_OPEN.len()..];
                    }
                    None => {
                        text.push_str(rest);
                        break;
                    }
                },
                Some(start_line) => {
                    let close = rest.find(RAW_CLOSE);
                    let nested = rest.find(RAW_OPEN);

                    if let Some(nested_pos) = nested {
                        if close.is_none_or(|close_pos| nested_pos < close_pos) {
                            return Err(MacroError::raw_block(
                                line_no,
                                format!(
                                    "Nested raw block: the raw block opened at line {} must be closed before another one opens",
                                    start_line
                                ),
                            ));
                        }
                    }

                    match close {
                        Some(pos) => {
                            buffer.push_str(&rest[..pos]);
                            let token = sentinel(raw_blocks.len(), line_no - start_line);
                            text.push_str(&token);
                            raw_blocks.push(RawBlock {
                                token,
                                literal_text: std::mem::take(&mut buffer),
                                start_line,
                                end_line: line_no,
                            });
                            open_line = None;
                            rest = &rest[pos + RAW_CLOSE.len()..];
                        }
                        None => {
                            buffer.push_str(rest);
                            break;
                        }
                    }
                }
            }
        }
    }

    if let Some(start_line) = open_line {
        return Err(MacroError::raw_block(
            start_line,
            format!("Unclosed raw block opened at line {}", start_line),
        ));
    }

    tracing::debug!(count = raw_blocks.len(), "Extracted raw blocks");
    Ok(Extracted { text, raw_blocks })
}

/// Put the literal text of every raw block back in place of its sentinel.
pub fn restore(text: &str, raw_blocks: &[RawBlock]) -> String {
    let mut restored = text.to_string();
    for block in raw_blocks {
        restored = restored.replacen(&block.token, &block.literal_text, 1);
    }
    restored
}

/// Opens a restored raw block in guarded text.
pub(crate) const GUARD_OPEN: char = '\u{E002}';

/// Closes a restored raw block in guarded text.
pub(crate) const GUARD_CLOSE: char = '\u{E003}';

/// Like [`restore`], with each block's text wrapped in guard characters.
pub(crate) fn restore_guarded(text: &str, raw_blocks: &[RawBlock]) -> String {
    let mut restored = text.to_string();
    for block in raw_blocks {
        let guarded = format!("{}{}{}", GUARD_OPEN, block.literal_text, GUARD_CLOSE);
        restored = restored.replacen(&block.token, &guarded, 1);
    }
    restored
}

/// Remove the guard characters left by [`restore_guarded`].
pub(crate) fn strip_guards(text: &str) -> String {
    text.chars()
        .filter(|c| *c != GUARD_OPEN && *c != GUARD_CLOSE)
        .collect()
}

/// Split guarded text into lines, flagging the lines that begin inside a
/// restored raw block.
pub(crate) fn guarded_lines(text: &str) -> Vec<(&str, bool)> {
    let mut depth = 0usize;
    let mut lines = Vec::new();
    for line in text.split_inclusive('\n') {
        lines.push((line, depth > 0));
        for c in line.chars() {
            match c {
                GUARD_OPEN => depth += 1,
                GUARD_CLOSE => depth = depth.saturating_sub(1),
                _ => {}
            }
        }
    }
    lines
}
