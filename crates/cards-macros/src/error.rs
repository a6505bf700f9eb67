/*
 * error.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Error types for macro expansion.
//!
//! Every failure the engine can produce is a [`MacroError`]. Whether an error
//! aborts the evaluation or is rendered inline as a "Macro Error" admonition
//! depends on the generation mode; see [`MacroError::is_fatal`].

use thiserror::Error;

/// Errors that can occur while expanding macros.
#[derive(Debug, Error)]
pub enum MacroError {
    /// A macro body failed schema validation.
    #[error("{message}")]
    Schema {
        /// Schema id the body was validated against
        schema_id: String,
        /// Human-readable validation failure
        message: String,
    },

    /// A referenced entity (card, attachment) does not exist.
    #[error("{0}")]
    Semantic(String),

    /// A parameter value is malformed (e.g. a non-numeric level offset).
    #[error("{0}")]
    Parameter(String),

    /// Nested or unclosed raw block. Always fatal.
    #[error("Raw block error at line {line}: {message}")]
    RawBlock {
        /// 1-based line of the offending marker
        line: usize,
        /// Description of the problem
        message: String,
    },

    /// A directive body could not be parsed.
    #[error("{0}")]
    Parse(String),

    /// A card includes one of its own ancestors.
    #[error("Circular include detected: {}", chain.join(" -> "))]
    IncludeCycle {
        /// Card keys from the outermost document to the repeated card
        chain: Vec<String>,
    },

    /// Includes are nested deeper than the configured maximum.
    #[error("Maximum include depth ({max_depth}) exceeded while including '{card_key}'")]
    IncludeDepth {
        /// The card that would have exceeded the limit
        card_key: String,
        /// Configured limit
        max_depth: usize,
    },

    /// A collaborator (document or attachment store) failed.
    #[error("Store error: {0}")]
    Store(String),
}

impl MacroError {
    /// Create a schema validation error.
    pub fn schema(schema_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Schema {
            schema_id: schema_id.into(),
            message: message.into(),
        }
    }

    /// Create a semantic (missing entity) error.
    pub fn semantic(message: impl Into<String>) -> Self {
        Self::Semantic(message.into())
    }

    /// Create a parameter error.
    pub fn parameter(message: impl Into<String>) -> Self {
        Self::Parameter(message.into())
    }

    /// Create a raw block error at a 1-based line.
    pub fn raw_block(line: usize, message: impl Into<String>) -> Self {
        Self::RawBlock {
            line,
            message: message.into(),
        }
    }

    /// Create a parse error.
    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse(message.into())
    }

    /// The error for a card key that the document store does not know.
    pub fn card_not_found(card_key: &str) -> Self {
        Self::Semantic(format!("Card key {} not found", card_key))
    }

    /// Whether this error aborts evaluation in every mode.
    ///
    /// Other errors only abort in validate mode and are otherwise rendered
    /// in place of the offending directive.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            MacroError::RawBlock { .. }
                | MacroError::IncludeCycle { .. }
                | MacroError::IncludeDepth { .. }
        )
    }
}

/// Result type for macro operations.
pub type MacroResult<T> = Result<T, MacroError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_card_not_found_message() {
        let err = MacroError::card_not_found("ghost");
        assert_eq!(err.to_string(), "Card key ghost not found");
        assert!(!err.is_fatal());
    }

    #[test]
    fn test_raw_block_message_and_fatality() {
        let err = MacroError::raw_block(7, "Unclosed raw block");
        assert_eq!(err.to_string(), "Raw block error at line 7: Unclosed raw block");
        assert!(err.is_fatal());
    }

    #[test]
    fn test_include_cycle_message() {
        let err = MacroError::IncludeCycle {
            chain: vec!["a".to_string(), "b".to_string(), "a".to_string()],
        };
        assert_eq!(err.to_string(), "Circular include detected: a -> b -> a");
        assert!(err.is_fatal());
    }

    #[test]
    fn test_schema_error_displays_message_only() {
        let err = MacroError::schema("xrefMacroSchema", "\"cardKey\" is a required property");
        assert_eq!(err.to_string(), "\"cardKey\" is a required property");
        assert!(!err.is_fatal());
    }
}
