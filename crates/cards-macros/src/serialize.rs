/*
 * serialize.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Serialization helpers shared by the engine and the macros.
//!
//! - [`create_admonition`] renders an AsciiDoc admonition block; every inline
//!   "Macro Error" goes through it.
//! - [`create_html_placeholder`] renders the self-closing tag that stands in
//!   for a directive between the synchronous pass and resolution, and the
//!   interactive elements emitted for connected clients.
//! - [`create_macro`] is the inverse of directive parsing: it writes the
//!   directive source for a macro name and its options.

use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use once_cell::sync::Lazy;
use serde::Serialize;
use serde_json::ser::Formatter;
use serde_json::{Map, Value};

use crate::macros::MacroMetadata;

/// Prefix of every placeholder key.
pub const PLACEHOLDER_KEY_PREFIX: &str = "macro-";

/// Attribute names the placeholder sets itself; data fields with these names
/// only travel inside `options`.
const RESERVED_ATTRIBUTES: &[&str] = &["key", "options"];

static GLOBAL_KEYS: Lazy<Arc<PlaceholderKeys>> = Lazy::new(|| Arc::new(PlaceholderKeys::new()));

/// Monotonically increasing source of placeholder keys (`macro-N`).
#[derive(Debug, Default)]
pub struct PlaceholderKeys {
    next: AtomicU64,
}

impl PlaceholderKeys {
    /// Create a counter starting at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide counter.
    pub fn global() -> Arc<PlaceholderKeys> {
        GLOBAL_KEYS.clone()
    }

    /// Allocate the next key.
    pub fn next_key(&self) -> String {
        let n = self.next.fetch_add(1, Ordering::Relaxed);
        format!("{}{}", PLACEHOLDER_KEY_PREFIX, n)
    }
}

/// A placeholder tag and the key it was allocated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HtmlPlaceholder {
    /// The `macro-N` key carried in the `key` attribute
    pub key: String,
    /// The rendered tag
    pub tag: String,
}

/// Render an AsciiDoc admonition block.
///
/// ```
/// use cards_macros::create_admonition;
///
/// assert_eq!(
///     create_admonition("WARNING", "Macro Error", "boom"),
///     "[WARNING]\n.Macro Error\n====\nboom\n====\n\n"
/// );
/// ```
pub fn create_admonition(kind: &str, title: &str, content: &str) -> String {
    format!("[{}]\n.{}\n====\n{}\n====\n\n", kind, title, content)
}

/// Render a self-closing placeholder tag for a macro invocation.
///
/// The tag is named after `metadata.tag_name` and carries one attribute per
/// primitive field of `data` (nested objects flattened to dotted names), a
/// fresh `key` from `keys`, and `options`, the base64 encoding of the JSON
/// serialization of `data`.
pub fn create_html_placeholder(
    metadata: &MacroMetadata,
    data: &Value,
    keys: &PlaceholderKeys,
) -> HtmlPlaceholder {
    let key = keys.next_key();

    let mut attributes = Vec::new();
    if let Value::Object(map) = data {
        flatten_attributes("", map, &mut attributes);
    }
    attributes.retain(|(name, _)| !RESERVED_ATTRIBUTES.contains(&name.as_str()));
    attributes.push(("key".to_string(), key.clone()));
    attributes.push(("options".to_string(), STANDARD.encode(data.to_string())));

    let mut tag = format!("<{}", metadata.tag_name);
    for (name, value) in &attributes {
        tag.push(' ');
        tag.push_str(name);
        tag.push_str("=\"");
        tag.push_str(&escape_attribute(value));
        tag.push('"');
    }
    tag.push_str(" />");

    HtmlPlaceholder { key, tag }
}

/// Write the directive source for `name` with `options`.
///
/// The result parses back to exactly `options`; empty options produce an
/// empty-bodied directive. Every `{` inside a string is written as `\u007b`,
/// so no value can close the directive or open a raw block.
///
/// ```
/// use cards_macros::create_macro;
/// use serde_json::json;
///
/// let options = json!({"cardKey": "c1"});
/// assert_eq!(
///     create_macro("xref", options.as_object().unwrap()),
///     "{{#xref}}\"cardKey\":\"c1\"{{/xref}}"
/// );
/// ```
pub fn create_macro(name: &str, options: &Map<String, Value>) -> String {
    let mut json = Vec::new();
    let mut serializer = serde_json::Serializer::with_formatter(&mut json, BraceEscaping);
    options
        .serialize(&mut serializer)
        .expect("serializing a JSON map into memory cannot fail");
    let json = String::from_utf8(json).expect("serde_json writes UTF-8");

    let body = &json[1..json.len() - 1];
    format!("{{{{#{}}}}}{}{{{{/{}}}}}", name, body, name)
}

/// Compact JSON with `{` escaped inside strings.
struct BraceEscaping;

impl Formatter for BraceEscaping {
    fn write_string_fragment<W>(&mut self, writer: &mut W, fragment: &str) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        for (i, part) in fragment.split('{').enumerate() {
            if i > 0 {
                writer.write_all(b"\\u007b")?;
            }
            writer.write_all(part.as_bytes())?;
        }
        Ok(())
    }
}

/// Flatten an object into `(attribute, value)` pairs.
///
/// Nested objects produce dotted names; arrays are kept as JSON text and
/// nulls are skipped.
fn flatten_attributes(prefix: &str, map: &Map<String, Value>, out: &mut Vec<(String, String)>) {
    for (name, value) in map {
        let full_name = format!("{}{}", prefix, name);
        match value {
            Value::Null => {}
            Value::String(s) => out.push((full_name, s.clone())),
            Value::Bool(_) | Value::Number(_) | Value::Array(_) => {
                out.push((full_name, value.to_string()))
            }
            Value::Object(nested) => flatten_attributes(&format!("{}.", full_name), nested, out),
        }
    }
}

/// Escape text for use inside a double-quoted attribute value.
pub(crate) fn escape_attribute(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '"' => escaped.push_str("&quot;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::parse_macro_body;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    const META: MacroMetadata = MacroMetadata {
        name: "testMacro",
        tag_name: "test-macro",
        schema_id: "testMacroSchema",
    };

    fn attribute<'a>(tag: &'a str, name: &str) -> Option<&'a str> {
        let needle = format!(" {}=\"", name);
        let start = tag.find(&needle)? + needle.len();
        let end = tag[start..].find('"')? + start;
        Some(&tag[start..end])
    }

    #[test]
    fn test_placeholder_keys_increase() {
        let keys = PlaceholderKeys::new();
        assert_eq!(keys.next_key(), "macro-0");
        assert_eq!(keys.next_key(), "macro-1");
        assert_eq!(keys.next_key(), "macro-2");
    }

    #[test]
    fn test_placeholder_carries_flattened_attributes() {
        let keys = PlaceholderKeys::new();
        let data = json!({
            "title": "T",
            "count": 3,
            "anotherKey": {"nested": {"deepValue": "deep"}}
        });
        let placeholder = create_html_placeholder(&META, &data, &keys);

        assert_eq!(placeholder.key, "macro-0");
        assert!(placeholder.tag.starts_with("<test-macro "));
        assert!(placeholder.tag.ends_with(" />"));
        assert!(placeholder.tag.contains(" anotherKey.nested.deepValue=\"deep\""));
        assert_eq!(attribute(&placeholder.tag, "title"), Some("T"));
        assert_eq!(attribute(&placeholder.tag, "count"), Some("3"));
        assert_eq!(attribute(&placeholder.tag, "key"), Some("macro-0"));
    }

    #[test]
    fn test_placeholder_options_decode_to_json() {
        let keys = PlaceholderKeys::new();
        let data = json!({"title": "Quotes \" and <tags>", "list": [1, 2]});
        let placeholder = create_html_placeholder(&META, &data, &keys);

        let options = attribute(&placeholder.tag, "options").unwrap();
        let decoded = STANDARD.decode(options).unwrap();
        assert_eq!(String::from_utf8(decoded).unwrap(), data.to_string());
    }

    #[test]
    fn test_placeholder_escapes_attribute_values() {
        let keys = PlaceholderKeys::new();
        let data = json!({"title": "a \"b\" <c>"});
        let placeholder = create_html_placeholder(&META, &data, &keys);
        assert_eq!(
            attribute(&placeholder.tag, "title"),
            Some("a &quot;b&quot; &lt;c&gt;")
        );
    }

    #[test]
    fn test_reserved_fields_do_not_shadow_key() {
        let keys = PlaceholderKeys::new();
        let data = json!({"key": "user-value"});
        let placeholder = create_html_placeholder(&META, &data, &keys);
        assert_eq!(placeholder.tag.matches(" key=\"").count(), 1);
        assert_eq!(attribute(&placeholder.tag, "key"), Some("macro-0"));
    }

    #[test]
    fn test_create_macro_empty_options() {
        assert_eq!(create_macro("report", &Map::new()), "{{#report}}{{/report}}");
    }

    #[test]
    fn test_create_macro_round_trip() {
        let options = json!({
            "title": "Multi\nline \"quoted\"",
            "value": 42.5,
            "nested": {"a": [1, {"b": null}]},
            "flag": true
        });
        let options = options.as_object().unwrap();
        let source = create_macro("scoreCard", options);

        let body = source
            .strip_prefix("{{#scoreCard}}")
            .and_then(|s| s.strip_suffix("{{/scoreCard}}"))
            .unwrap();
        let parsed = parse_macro_body(body).unwrap();
        assert_eq!(parsed, Value::Object(options.clone()));
    }

    #[test]
    fn test_create_macro_escapes_braces_in_strings() {
        let options = json!({
            "title": "see {{/scoreCard}} and {{#raw}}",
            "nested": {"a{b": ["{"]}
        });
        let options = options.as_object().unwrap();
        let source = create_macro("scoreCard", options);

        assert_eq!(source.matches("{{").count(), 2);
        assert!(source.contains("\"see \\u007b\\u007b/scoreCard}} and \\u007b\\u007b#raw}}\""));
        assert!(source.contains("{\"a\\u007bb\":[\"\\u007b\"]}"));

        let body = source
            .strip_prefix("{{#scoreCard}}")
            .and_then(|s| s.strip_suffix("{{/scoreCard}}"))
            .unwrap();
        assert_eq!(parse_macro_body(body).unwrap(), Value::Object(options.clone()));
    }

    #[test]
    fn test_admonition_format() {
        assert_eq!(
            create_admonition("NOTE", "Heads up", "line one\nline two"),
            "[NOTE]\n.Heads up\n====\nline one\nline two\n====\n\n"
        );
    }
}
