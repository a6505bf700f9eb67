/*
 * config.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Engine configuration.

use serde::Deserialize;

use crate::error::{MacroError, MacroResult};

/// Default maximum nesting of `include` macros.
pub const DEFAULT_MAX_INCLUDE_DEPTH: usize = 32;

/// Configuration for macro evaluation.
///
/// All fields have defaults, so an empty TOML document is a valid
/// configuration:
///
/// ```
/// use cards_macros::EngineConfig;
///
/// let config = EngineConfig::from_toml_str("max-include-depth = 4").unwrap();
/// assert_eq!(config.max_include_depth, 4);
/// assert!(config.detect_include_cycles);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct EngineConfig {
    /// Maximum nesting of `include` macros before evaluation fails.
    pub max_include_depth: usize,

    /// Fail when a card (transitively) includes itself.
    pub detect_include_cycles: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_include_depth: DEFAULT_MAX_INCLUDE_DEPTH,
            detect_include_cycles: true,
        }
    }
}

impl EngineConfig {
    /// Parse a configuration from TOML text.
    pub fn from_toml_str(text: &str) -> MacroResult<Self> {
        toml::from_str(text)
            .map_err(|e| MacroError::parameter(format!("Invalid engine configuration: {}", e)))
    }
}
