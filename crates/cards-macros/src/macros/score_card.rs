/*
 * macros/score_card.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! `scoreCard`: a single headline number with a title.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

use crate::context::GenerationContext;
use crate::error::MacroResult;
use crate::macros::svg::{escape_xml, format_number, passthrough};
use crate::macros::{MacroHandler, MacroMetadata, options};

pub static METADATA: MacroMetadata = MacroMetadata {
    name: "scoreCard",
    tag_name: "score-card",
    schema_id: "scoreCardMacroSchema",
};

#[derive(Debug, Deserialize)]
struct ScoreCardOptions {
    title: String,
    value: f64,
    unit: Option<String>,
    legend: Option<String>,
}

fn render(options: &ScoreCardOptions) -> String {
    let value = match &options.unit {
        Some(unit) => format!("{} {}", format_number(options.value), unit),
        None => format_number(options.value),
    };

    let mut svg = String::from(
        "<svg xmlns=\"http://www.w3.org/2000/svg\" class=\"score-card\" width=\"200\" height=\"120\" viewBox=\"0 0 200 120\">\n",
    );
    svg.push_str(
        "  <rect x=\"1\" y=\"1\" width=\"198\" height=\"118\" rx=\"8\" fill=\"#ffffff\" stroke=\"#d0d0d0\"/>\n",
    );
    svg.push_str(&format!(
        "  <text x=\"100\" y=\"28\" text-anchor=\"middle\" font-size=\"14\">{}</text>\n",
        escape_xml(&options.title)
    ));
    svg.push_str(&format!(
        "  <text x=\"100\" y=\"72\" text-anchor=\"middle\" font-size=\"32\" font-weight=\"bold\">{}</text>\n",
        escape_xml(&value)
    ));
    if let Some(legend) = &options.legend {
        svg.push_str(&format!(
            "  <text x=\"100\" y=\"102\" text-anchor=\"middle\" font-size=\"12\" fill=\"#666666\">{}</text>\n",
            escape_xml(legend)
        ));
    }
    svg.push_str("</svg>");

    passthrough(&svg)
}

/// Handler for the `scoreCard` macro. Output is the same in every mode.
pub struct ScoreCardMacro;

#[async_trait]
impl MacroHandler for ScoreCardMacro {
    fn metadata(&self) -> &'static MacroMetadata {
        &METADATA
    }

    async fn handle_static(&self, _ctx: &GenerationContext, data: &Value) -> MacroResult<String> {
        let options: ScoreCardOptions = options(&METADATA, data)?;
        Ok(render(&options))
    }
}
