/*
 * macros/image.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! `image`: display an attachment of a card.
//!
//! Static rendering embeds the attachment as a base64 data URI with an empty
//! attribute list, so the output is self-contained. Interactive and site
//! rendering reference the attachment through the API path instead, carrying
//! `alt` and `title` when given.

use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use serde::Deserialize;
use serde_json::Value;

use crate::context::GenerationContext;
use crate::error::{MacroError, MacroResult};
use crate::macros::{MacroHandler, MacroMetadata, find_card, options};
use crate::store::StoreError;

pub static METADATA: MacroMetadata = MacroMetadata {
    name: "image",
    tag_name: "image-macro",
    schema_id: "imageMacroSchema",
};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ImageOptions {
    file_name: String,
    card_key: Option<String>,
    alt: Option<String>,
    title: Option<String>,
}

impl ImageOptions {
    /// The card owning the attachment; defaults to the current card.
    fn card_key<'a>(&'a self, ctx: &'a GenerationContext) -> &'a str {
        self.card_key.as_deref().unwrap_or(ctx.card_key.as_str())
    }

    /// The AsciiDoc attribute list, e.g. `alt="Logo",title="Our logo"`.
    fn attributes(&self) -> String {
        let mut attributes = Vec::new();
        if let Some(alt) = &self.alt {
            attributes.push(format!("alt=\"{}\"", quote(alt)));
        }
        if let Some(title) = &self.title {
            attributes.push(format!("title=\"{}\"", quote(title)));
        }
        attributes.join(",")
    }
}

fn quote(value: &str) -> String {
    value.replace('"', "\\\"")
}

fn attachment_not_found(file_name: &str, card_key: &str) -> MacroError {
    MacroError::semantic(format!(
        "Attachment file '{}' not found in card '{}'",
        file_name, card_key
    ))
}

/// Check that the card exists and lists the attachment.
async fn resolve(ctx: &GenerationContext, options: &ImageOptions) -> MacroResult<()> {
    let card_key = options.card_key(ctx);
    let card = find_card(ctx, card_key).await?;
    if card.attachment(&options.file_name).is_none() {
        return Err(attachment_not_found(&options.file_name, card_key));
    }
    Ok(())
}

/// Handler for the `image` macro.
pub struct ImageMacro;

#[async_trait]
impl MacroHandler for ImageMacro {
    fn metadata(&self) -> &'static MacroMetadata {
        &METADATA
    }

    async fn handle_static(&self, ctx: &GenerationContext, data: &Value) -> MacroResult<String> {
        let options: ImageOptions = options(&METADATA, data)?;
        resolve(ctx, &options).await?;

        let card_key = options.card_key(ctx);
        let attachment = ctx
            .project
            .attachments
            .read(card_key, &options.file_name)
            .await
            .map_err(|e| match e {
                StoreError::NotFound(_) => attachment_not_found(&options.file_name, card_key),
                StoreError::Other(message) => MacroError::Store(message),
            })?;

        Ok(format!(
            "image::data:{};base64,{}[]",
            attachment.mime_type,
            STANDARD.encode(&attachment.bytes)
        ))
    }

    async fn handle_inject(&self, ctx: &GenerationContext, data: &Value) -> MacroResult<String> {
        let options: ImageOptions = options(&METADATA, data)?;
        resolve(ctx, &options).await?;

        let path = ctx
            .renderer
            .attachment_path(options.card_key(ctx), &options.file_name);
        Ok(format!("image::{}[{}]", path, options.attributes()))
    }
}
