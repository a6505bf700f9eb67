/*
 * macros/xref.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! `xref`: cross-reference to another card.
//!
//! Usage: `{{#xref}}"cardKey": "c1"{{/xref}}`

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

use crate::context::GenerationContext;
use crate::error::MacroResult;
use crate::macros::{MacroHandler, MacroMetadata, find_card, options};

pub static METADATA: MacroMetadata = MacroMetadata {
    name: "xref",
    tag_name: "xref-macro",
    schema_id: "xrefMacroSchema",
};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct XrefOptions {
    card_key: String,
}

/// Handler for the `xref` macro.
pub struct XrefMacro;

#[async_trait]
impl MacroHandler for XrefMacro {
    fn metadata(&self) -> &'static MacroMetadata {
        &METADATA
    }

    async fn handle_static(&self, ctx: &GenerationContext, data: &Value) -> MacroResult<String> {
        let options: XrefOptions = options(&METADATA, data)?;
        let card = find_card(ctx, &options.card_key).await?;
        Ok(format!("<<{}>>", card.key))
    }

    async fn handle_inject(&self, ctx: &GenerationContext, data: &Value) -> MacroResult<String> {
        let options: XrefOptions = options(&METADATA, data)?;
        let card = find_card(ctx, &options.card_key).await?;
        Ok(format!("xref:{}.adoc[{}]", card.key, card.title))
    }
}
