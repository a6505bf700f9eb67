/*
 * macros/percentage.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! `percentage`: a donut chart showing a share of 100.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

use crate::context::GenerationContext;
use crate::error::MacroResult;
use crate::macros::svg::{escape_xml, format_number, passthrough};
use crate::macros::{MacroHandler, MacroMetadata, options};

pub static METADATA: MacroMetadata = MacroMetadata {
    name: "percentage",
    tag_name: "percentage-macro",
    schema_id: "percentageMacroSchema",
};

const DEFAULT_COLOUR: &str = "#1976d2";

/// Radius giving the ring a circumference of 100 units, so the dash array
/// can be written in percent.
const RING_RADIUS: &str = "15.9155";

#[derive(Debug, Deserialize)]
struct PercentageOptions {
    title: String,
    value: f64,
    legend: String,
    colour: Option<String>,
}

fn render(options: &PercentageOptions) -> String {
    let filled = options.value.clamp(0.0, 100.0);
    let colour = escape_xml(options.colour.as_deref().unwrap_or(DEFAULT_COLOUR));

    let mut svg = String::from(
        "<svg xmlns=\"http://www.w3.org/2000/svg\" class=\"percentage\" width=\"200\" height=\"250\" viewBox=\"0 0 42 52\">\n",
    );
    svg.push_str(&format!(
        "  <text x=\"21\" y=\"4\" text-anchor=\"middle\" font-size=\"3.5\">{}</text>\n",
        escape_xml(&options.title)
    ));
    svg.push_str(&format!(
        "  <circle cx=\"21\" cy=\"27\" r=\"{}\" fill=\"transparent\" stroke=\"#e0e0e0\" stroke-width=\"3\"/>\n",
        RING_RADIUS
    ));
    svg.push_str(&format!(
        "  <circle cx=\"21\" cy=\"27\" r=\"{}\" fill=\"transparent\" stroke=\"{}\" stroke-width=\"3\" stroke-dasharray=\"{} {}\" stroke-dashoffset=\"25\"/>\n",
        RING_RADIUS,
        colour,
        format_number(filled),
        format_number(100.0 - filled)
    ));
    svg.push_str(&format!(
        "  <text x=\"21\" y=\"28.5\" text-anchor=\"middle\" font-size=\"6\" font-weight=\"bold\">{}%</text>\n",
        format_number(options.value)
    ));
    svg.push_str(&format!(
        "  <text x=\"21\" y=\"50\" text-anchor=\"middle\" font-size=\"3\">{}</text>\n",
        escape_xml(&options.legend)
    ));
    svg.push_str("</svg>");

    passthrough(&svg)
}

/// Handler for the `percentage` macro. Output is the same in every mode.
pub struct PercentageMacro;

#[async_trait]
impl MacroHandler for PercentageMacro {
    fn metadata(&self) -> &'static MacroMetadata {
        &METADATA
    }

    async fn handle_static(&self, _ctx: &GenerationContext, data: &Value) -> MacroResult<String> {
        let options: PercentageOptions = options(&METADATA, data)?;
        Ok(render(&options))
    }
}
