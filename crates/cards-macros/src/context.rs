/*
 * context.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Generation context for macro evaluation.
//!
//! A [`GenerationContext`] is threaded through the whole evaluation call
//! tree. It selects the rendering [`Mode`], names the card whose document is
//! being expanded, and gives macros access to the [`Project`] collaborators.
//! When `include` recurses into another card, the context is rebound to that
//! card with [`GenerationContext::for_included`].

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::config::EngineConfig;
use crate::error::{MacroError, MacroResult};
use crate::schema::{JsonSchemaValidator, SchemaValidator};
use crate::serialize::PlaceholderKeys;
use crate::store::{AttachmentStore, DocumentStore, MemoryProject};

/// The rendering target of an evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Mode {
    /// Pre-flight check: every macro failure aborts the evaluation.
    Validate,
    /// Self-contained static rendering (e.g. PDF export).
    Static,
    /// Rendering for a connected interactive client.
    Inject,
    /// Whole-site static export.
    StaticSite,
}

impl Mode {
    /// The mode name as used in configuration and logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Validate => "validate",
            Mode::Static => "static",
            Mode::Inject => "inject",
            Mode::StaticSite => "staticSite",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mode {
    type Err = MacroError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "validate" => Ok(Mode::Validate),
            "static" => Ok(Mode::Static),
            "inject" => Ok(Mode::Inject),
            "staticSite" => Ok(Mode::StaticSite),
            other => Err(MacroError::parameter(format!("Unknown mode: {}", other))),
        }
    }
}

/// Rendering inputs supplied by the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RendererContext {
    /// Prefix of API paths emitted for interactive and site rendering.
    pub api_base: String,
}

impl Default for RendererContext {
    fn default() -> Self {
        Self {
            api_base: "/api".to_string(),
        }
    }
}

impl RendererContext {
    /// Path under which a card attachment is served.
    pub fn attachment_path(&self, card_key: &str, file_name: &str) -> String {
        format!(
            "{}/cards/{}/a/{}",
            self.api_base.trim_end_matches('/'),
            card_key,
            file_name
        )
    }
}

/// The external collaborators macros resolve against.
#[derive(Clone)]
pub struct Project {
    /// Card lookup
    pub documents: Arc<dyn DocumentStore>,
    /// Attachment content lookup
    pub attachments: Arc<dyn AttachmentStore>,
    /// Schema validation for macro bodies
    pub validator: Arc<dyn SchemaValidator>,
}

impl Project {
    /// Create a project validating macro bodies against the built-in schemas.
    pub fn new(documents: Arc<dyn DocumentStore>, attachments: Arc<dyn AttachmentStore>) -> Self {
        Self {
            documents,
            attachments,
            validator: JsonSchemaValidator::shared(),
        }
    }

    /// Create a project backed by an in-memory store.
    pub fn from_memory(project: MemoryProject) -> Self {
        let store = Arc::new(project);
        Self::new(store.clone(), store)
    }

    /// Replace the schema validator.
    pub fn with_validator(mut self, validator: Arc<dyn SchemaValidator>) -> Self {
        self.validator = validator;
        self
    }
}

impl fmt::Debug for Project {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Project").finish_non_exhaustive()
    }
}

/// Context for one evaluation of a document.
#[derive(Debug, Clone)]
pub struct GenerationContext {
    /// Rendering target
    pub mode: Mode,

    /// Key of the card whose document is being expanded.
    pub card_key: String,

    /// Document, attachment and schema collaborators.
    pub project: Arc<Project>,

    /// Caller-supplied rendering inputs.
    pub renderer: RendererContext,

    /// Engine limits.
    pub config: Arc<EngineConfig>,

    /// Placeholder key source, shared with nested evaluations.
    pub keys: Arc<PlaceholderKeys>,

    /// Cards entered through `include`, outermost first.
    include_chain: Vec<String>,
}

impl GenerationContext {
    /// Create a context for the document of `card_key`.
    pub fn new(mode: Mode, card_key: impl Into<String>, project: Arc<Project>) -> Self {
        let card_key = card_key.into();
        Self {
            mode,
            include_chain: vec![card_key.clone()],
            card_key,
            project,
            renderer: RendererContext::default(),
            config: Arc::new(EngineConfig::default()),
            keys: PlaceholderKeys::global(),
        }
    }

    /// Set the renderer context.
    pub fn with_renderer(mut self, renderer: RendererContext) -> Self {
        self.renderer = renderer;
        self
    }

    /// Set the engine configuration.
    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = Arc::new(config);
        self
    }

    /// Use a dedicated placeholder key counter instead of the process-wide one.
    pub fn with_keys(mut self, keys: Arc<PlaceholderKeys>) -> Self {
        self.keys = keys;
        self
    }

    /// Number of `include` levels above this context.
    pub fn include_depth(&self) -> usize {
        self.include_chain.len().saturating_sub(1)
    }

    /// Rebind the context to an included card.
    ///
    /// Fails when the card is already being included further up the chain
    /// (if cycle detection is enabled) or when the include depth limit would
    /// be exceeded.
    pub fn for_included(&self, card_key: &str) -> MacroResult<Self> {
        if self.config.detect_include_cycles && self.include_chain.iter().any(|k| k == card_key) {
            let mut chain = self.include_chain.clone();
            chain.push(card_key.to_string());
            return Err(MacroError::IncludeCycle { chain });
        }

        if self.include_depth() + 1 > self.config.max_include_depth {
            return Err(MacroError::IncludeDepth {
                card_key: card_key.to_string(),
                max_depth: self.config.max_include_depth,
            });
        }

        let mut child = self.clone();
        child.card_key = card_key.to_string();
        child.include_chain.push(card_key.to_string());
        Ok(child)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context(mode: Mode) -> GenerationContext {
        let project = Project::from_memory(MemoryProject::new());
        GenerationContext::new(mode, "root", Arc::new(project))
    }

    #[test]
    fn test_mode_round_trip_through_str() {
        for mode in [Mode::Validate, Mode::Static, Mode::Inject, Mode::StaticSite] {
            assert_eq!(mode.as_str().parse::<Mode>().unwrap(), mode);
        }
        assert!("html".parse::<Mode>().is_err());
    }

    #[test]
    fn test_mode_serde_names() {
        assert_eq!(
            serde_json::to_string(&Mode::StaticSite).unwrap(),
            "\"staticSite\""
        );
        let mode: Mode = serde_json::from_str("\"inject\"").unwrap();
        assert_eq!(mode, Mode::Inject);
    }

    #[test]
    fn test_for_included_rebinds_card_key() {
        let ctx = context(Mode::Static);
        let child = ctx.for_included("c1").unwrap();
        assert_eq!(child.card_key, "c1");
        assert_eq!(child.include_depth(), 1);
        assert_eq!(ctx.card_key, "root");
        assert!(Arc::ptr_eq(&ctx.keys, &child.keys));
    }

    #[test]
    fn test_for_included_detects_cycle() {
        let ctx = context(Mode::Static);
        let child = ctx.for_included("a").unwrap();
        let err = child.for_included("root").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Circular include detected: root -> a -> root"
        );
    }

    #[test]
    fn test_for_included_depth_limit() {
        let ctx = context(Mode::Static).with_config(EngineConfig {
            max_include_depth: 1,
            detect_include_cycles: false,
        });
        let child = ctx.for_included("a").unwrap();
        let err = child.for_included("b").unwrap_err();
        assert!(matches!(err, MacroError::IncludeDepth { max_depth: 1, .. }));
    }

    #[test]
    fn test_attachment_path() {
        let renderer = RendererContext {
            api_base: "/api/".to_string(),
        };
        assert_eq!(
            renderer.attachment_path("c1", "pic.png"),
            "/api/cards/c1/a/pic.png"
        );
    }
}
