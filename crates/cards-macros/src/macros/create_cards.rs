/*
 * macros/create_cards.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! `createCards`: a button that creates cards from a template.
//!
//! Only a connected client can act on the button, so the macro renders an
//! interactive element in inject mode and nothing otherwise.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

use crate::context::GenerationContext;
use crate::error::MacroResult;
use crate::macros::{MacroHandler, MacroMetadata, find_card, options};
use crate::serialize::create_html_placeholder;

pub static METADATA: MacroMetadata = MacroMetadata {
    name: "createCards",
    tag_name: "create-cards",
    schema_id: "createCardsMacroSchema",
};

/// The options the engine itself inspects; the rest are for the client.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateCardsOptions {
    card_key: Option<String>,
}

/// Copy of `data` with `cardKey` defaulted to the current card.
pub(crate) fn with_card_key(data: &Value, ctx: &GenerationContext) -> Value {
    let mut data = data.clone();
    if let Value::Object(map) = &mut data {
        map.entry("cardKey")
            .or_insert_with(|| Value::String(ctx.card_key.clone()));
    }
    data
}

/// Handler for the `createCards` macro.
pub struct CreateCardsMacro;

#[async_trait]
impl MacroHandler for CreateCardsMacro {
    fn metadata(&self) -> &'static MacroMetadata {
        &METADATA
    }

    async fn handle_validate(&self, ctx: &GenerationContext, data: &Value) -> MacroResult<String> {
        let options: CreateCardsOptions = options(&METADATA, data)?;
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
