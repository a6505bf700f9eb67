/*
 * macros/report.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! `report`: a live report fetched by a connected client.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

use crate::context::GenerationContext;
use crate::error::MacroResult;
use crate::macros::create_cards::with_card_key;
use crate::macros::{MacroHandler, MacroMetadata, find_card, options};
use crate::serialize::create_html_placeholder;

pub static METADATA: MacroMetadata = MacroMetadata {
    name: "report",
    tag_name: "report-macro",
    schema_id: "reportMacroSchema",
};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReportOptions {
    card_key: Option<String>,
}

/// Handler for the `report` macro.
pub struct ReportMacro;

#[async_trait]
impl MacroHandler for ReportMacro {
    fn metadata(&self) -> &'static MacroMetadata {
        &METADATA
    }

    async fn handle_validate(&self, ctx: &GenerationContext, data: &Value) -> MacroResult<String> {
        let options: ReportOptions = options(&METADATA, data)?;
        if let Some(card_key) = &options.card_key {
            find_card(ctx, card_key).await?;
        }
        Ok(String::new())
    }

    async fn handle_static(&self, _ctx: &GenerationContext, _data: &Value) -> MacroResult<String> {
        Ok(String::new())
    }

    async fn handle_inject(&self, ctx: &GenerationContext, data: &Value) -> MacroResult<String> {
        let data = with_card_key(data, ctx);
        Ok(create_html_placeholder(&METADATA, &data, &ctx.keys).tag)
    }

    async fn handle_static_site(
        &self,
        _ctx: &GenerationContext,
        _data: &Value,
    ) -> MacroResult<String> {
        Ok(String::new())
    }
}
