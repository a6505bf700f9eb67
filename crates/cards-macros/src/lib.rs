/*
 * lib.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Macro expansion for card documents.
//!
//! Card documents are AsciiDoc sources that embed block directives
//! ("macros") such as `{{#include}}"cardKey": "c1"{{/include}}`. This crate
//! expands them. The output depends on the rendering [`Mode`]: a pre-flight
//! validation pass, self-contained static rendering, rendering for a
//! connected interactive client, or whole-site static export.
//!
//! Regions between `{{#raw}}` and `{{/raw}}` are passed through untouched.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use cards_macros::{GenerationContext, MemoryProject, Mode, Project, evaluate_macros_blocking};
//!
//! let project = MemoryProject::with_cards([
//!     ("intro", "Introduction", "= Welcome\n\nHello."),
//!     ("main", "Main", ""),
//! ]);
//! let ctx = GenerationContext::new(Mode::Static, "main", Arc::new(Project::from_memory(project)));
//!
//! let source = "{{#include}}\"cardKey\": \"intro\", \"levelOffset\": \"+1\", \"title\": \"exclude\"{{/include}}";
//! let output = evaluate_macros_blocking(source, &ctx).unwrap();
//! assert_eq!(output, "\n== Welcome\n\nHello.\n");
//! ```
//!
//! # Architecture
//!
//! - [`raw_block`] - raw block extraction and restoration
//! - [`runtime`] - directive parsing and the synchronous render pass
//! - [`queue`] - deferred asynchronous generation
//! - [`engine`] - the two-phase pipeline tying them together
//! - [`macros`] - the macro implementations
//! - [`store`] - the document and attachment lookups macros resolve against

pub mod config;
pub mod context;
pub mod engine;
pub mod error;
pub mod macros;
pub mod queue;
pub mod raw_block;
pub mod runtime;
pub mod schema;
pub mod serialize;
pub mod store;

pub use config::EngineConfig;
pub use context::{GenerationContext, Mode, Project, RendererContext};
pub use engine::{evaluate_macros, evaluate_macros_blocking};
pub use error::{MacroError, MacroResult};
pub use macros::{MacroHandler, MacroKind, MacroMetadata};
pub use queue::TaskQueue;
pub use schema::{JsonSchemaValidator, SchemaValidator, validate_macro_content};
pub use serialize::{
    HtmlPlaceholder, PlaceholderKeys, create_admonition, create_html_placeholder, create_macro,
};
pub use store::{
    AttachmentData, AttachmentInfo, AttachmentStore, Document, DocumentStore, MemoryProject,
    StoreError,
};
