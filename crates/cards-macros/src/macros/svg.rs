/*
 * macros/svg.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Helpers for the SVG-rendering macros.

/// Wrap markup in an AsciiDoc passthrough block.
pub(crate) fn passthrough(markup: &str) -> String {
    format!("++++\n{}\n++++\n", markup)
}

/// Escape text for SVG element content and attribute values.
pub(crate) fn escape_xml(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Format a number for display; whole numbers have no fractional part.
pub(crate) fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    }
}
