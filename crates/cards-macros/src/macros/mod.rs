/*
 * macros/mod.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Macro implementations.
//!
//! The set of macros is closed: [`MacroKind`] enumerates every kind, and each
//! kind maps to a [`MacroMetadata`] (name, placeholder tag, schema id) and a
//! [`MacroHandler`] with one entry point per [`Mode`].
//!
//! ## Built-in macros
//!
//! - `include` - embed another card's document
//! - `xref` - cross-reference another card
//! - `image` - display a card attachment
//! - `scoreCard`, `percentage` - inline SVG graphics
//! - `createCards`, `report` - interactive elements for connected clients

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::context::{GenerationContext, Mode};
use crate::error::{MacroError, MacroResult};
use crate::serialize::create_admonition;
use crate::store::{Document, StoreError};

pub mod create_cards;
pub mod image;
pub mod include;
pub mod percentage;
pub mod report;
pub mod score_card;
mod svg;
pub mod xref;

/// Static description of a macro kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MacroMetadata {
    /// Directive name (`{{#name}}`)
    pub name: &'static str,
    /// Element name of the placeholder tag
    pub tag_name: &'static str,
    /// Id of the schema macro bodies are validated against
    pub schema_id: &'static str,
}

/// Every macro the engine knows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MacroKind {
    CreateCards,
    Image,
    Include,
    Percentage,
    Report,
    ScoreCard,
    Xref,
}

impl MacroKind {
    /// All macro kinds, in registration order.
    pub fn all() -> &'static [MacroKind] {
        &[
            MacroKind::CreateCards,
            MacroKind::Image,
            MacroKind::Include,
            MacroKind::Percentage,
            MacroKind::Report,
            MacroKind::ScoreCard,
            MacroKind::Xref,
        ]
    }

    /// Look up a macro kind by directive name.
    pub fn from_name(name: &str) -> Option<MacroKind> {
        MacroKind::all()
            .iter()
            .copied()
            .find(|kind| kind.metadata().name == name)
    }

    /// The handler implementing this kind.
    pub fn handler(self) -> &'static dyn MacroHandler {
        match self {
            MacroKind::CreateCards => &create_cards::CreateCardsMacro,
            MacroKind::Image => &image::ImageMacro,
            MacroKind::Include => &include::IncludeMacro,
            MacroKind::Percentage => &percentage::PercentageMacro,
            MacroKind::Report => &report::ReportMacro,
            MacroKind::ScoreCard => &score_card::ScoreCardMacro,
            MacroKind::Xref => &xref::XrefMacro,
        }
    }

    /// Metadata of this kind.
    pub fn metadata(self) -> &'static MacroMetadata {
        self.handler().metadata()
    }
}

/// Mode-specific generation for one macro kind.
///
/// `data` has already passed schema validation. Only
/// [`handle_static`](Self::handle_static) is required: inject falls back to
/// static, static-site falls back to inject, and validate runs the static
/// handler for its checks and discards the output.
#[async_trait]
pub trait MacroHandler: Send + Sync {
    /// Metadata of the macro this handler implements.
    fn metadata(&self) -> &'static MacroMetadata;

    async fn handle_validate(&self, ctx: &GenerationContext, data: &Value) -> MacroResult<String> {
        self.handle_static(ctx, data).await.map(|_| String::new())
    }

    async fn handle_static(&self, ctx: &GenerationContext, data: &Value) -> MacroResult<String>;

    async fn handle_inject(&self, ctx: &GenerationContext, data: &Value) -> MacroResult<String> {
        self.handle_static(ctx, data).await
    }

    async fn handle_static_site(
        &self,
        ctx: &GenerationContext,
        data: &Value,
    ) -> MacroResult<String> {
        self.handle_inject(ctx, data).await
    }
}

/// Run the handler entry point selected by the context's mode.
pub async fn generate(
    handler: &dyn MacroHandler,
    ctx: &GenerationContext,
    data: &Value,
) -> MacroResult<String> {
    match ctx.mode {
        Mode::Validate => handler.handle_validate(ctx, data).await,
        Mode::Static => handler.handle_static(ctx, data).await,
        Mode::Inject => handler.handle_inject(ctx, data).await,
        Mode::StaticSite => handler.handle_static_site(ctx, data).await,
    }
}

/// Render the inline "Macro Error" admonition for a failed macro.
pub fn macro_error(macro_name: &str, error: &MacroError) -> String {
    create_admonition(
        "WARNING",
        "Macro Error",
        &format!("Macro '{}': {}", macro_name, error),
    )
}

/// Deserialize validated macro data into a typed options struct.
pub(crate) fn options<T: DeserializeOwned>(
    metadata: &MacroMetadata,
    data: &Value,
) -> MacroResult<T> {
    serde_json::from_value(data.clone()).map_err(|e| {
        MacroError::schema(
            metadata.schema_id,
            format!("Invalid {} options: {}", metadata.name, e),
        )
    })
}

/// Resolve a card through the project's document store.
pub(crate) async fn find_card(ctx: &GenerationContext, card_key: &str) -> MacroResult<Document> {
    ctx.project
        .documents
        .find_by_key(card_key)
        .await
        .map_err(|e| match e {
            StoreError::NotFound(_) => MacroError::card_not_found(card_key),
            StoreError::Other(message) => MacroError::Store(message),
        })
}
