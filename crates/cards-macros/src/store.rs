/*
 * store.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Document and attachment lookup.
//!
//! The engine never owns project storage. It resolves cards and attachments
//! through the [`DocumentStore`] and [`AttachmentStore`] traits, which the
//! embedding application implements on top of its own project tree.
//! [`MemoryProject`] implements both for tests and for callers that already
//! hold their documents in memory.

use std::collections::HashMap;

use async_trait::async_trait;
use thiserror::Error;

/// Errors reported by a store.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// No entity exists under the requested key.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Any other storage failure.
    #[error("{0}")]
    Other(String),
}

/// Metadata about a file attached to a card.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachmentInfo {
    /// File name, unique within the card
    pub file_name: String,
    /// MIME type of the file content
    pub mime_type: String,
}

/// A card document as returned by a [`DocumentStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    /// Card key
    pub key: String,
    /// Card title
    pub title: String,
    /// Document source (AsciiDoc with embedded macros)
    pub content: String,
    /// Attachments of the card
    pub attachments: Vec<AttachmentInfo>,
}

impl Document {
    /// Look up an attachment by file name.
    pub fn attachment(&self, file_name: &str) -> Option<&AttachmentInfo> {
        self.attachments.iter().find(|a| a.file_name == file_name)
    }
}

/// Bytes of an attachment together with their MIME type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachmentData {
    /// Raw file content
    pub bytes: Vec<u8>,
    /// MIME type of the content
    pub mime_type: String,
}

/// Lookup of card documents by key.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Find a card by key.
    ///
    /// Returns [`StoreError::NotFound`] for unknown keys.
    async fn find_by_key(&self, key: &str) -> Result<Document, StoreError>;
}

/// Lookup of attachment content.
#[async_trait]
pub trait AttachmentStore: Send + Sync {
    /// Read an attachment of a card.
    ///
    /// Returns [`StoreError::NotFound`] when the card or the file is unknown.
    async fn read(&self, card_key: &str, file_name: &str) -> Result<AttachmentData, StoreError>;
}

/// In-memory project holding cards and their attachments.
#[derive(Debug, Clone, Default)]
pub struct MemoryProject {
    documents: HashMap<String, Document>,
    files: HashMap<(String, String), AttachmentData>,
}

impl MemoryProject {
    /// Create an empty project.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add (or replace) a card.
    pub fn add_card(
        &mut self,
        key: impl Into<String>,
        title: impl Into<String>,
        content: impl Into<String>,
    ) -> &mut Self {
        let key = key.into();
        let attachments = self
            .documents
            .remove(&key)
            .map(|d| d.attachments)
            .unwrap_or_default();
        self.documents.insert(
            key.clone(),
            Document {
                key,
                title: title.into(),
                content: content.into(),
                attachments,
            },
        );
        self
    }

    /// Attach a file to an existing card.
    ///
    /// Attaching to an unknown card stores the bytes without listing them on
    /// any document, which is useful for simulating inconsistent stores.
    pub fn add_attachment(
        &mut self,
        card_key: impl Into<String>,
        file_name: impl Into<String>,
        mime_type: impl Into<String>,
        bytes: impl Into<Vec<u8>>,
    ) -> &mut Self {
        let card_key = card_key.into();
        let file_name = file_name.into();
        let mime_type = mime_type.into();
        if let Some(doc) = self.documents.get_mut(&card_key) {
            doc.attachments.retain(|a| a.file_name != file_name);
            doc.attachments.push(AttachmentInfo {
                file_name: file_name.clone(),
                mime_type: mime_type.clone(),
            });
        }
        self.files.insert(
            (card_key, file_name),
            AttachmentData {
                bytes: bytes.into(),
                mime_type,
            },
        );
        self
    }

    /// Create a project with the given `(key, title, content)` cards.
    pub fn with_cards(
        cards: impl IntoIterator<Item = (impl Into<String>, impl Into<String>, impl Into<String>)>,
    ) -> Self {
        let mut project = Self::new();
        for (key, title, content) in cards {
            project.add_card(key, title, content);
        }
        project
    }
}

#[async_trait]
impl DocumentStore for MemoryProject {
    async fn find_by_key(&self, key: &str) -> Result<Document, StoreError> {
        self.documents
            .get(key)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(key.to_string()))
    }
}

#[async_trait]
impl AttachmentStore for MemoryProject {
    async fn read(&self, card_key: &str, file_name: &str) -> Result<AttachmentData, StoreError> {
        self.files
            .get(&(card_key.to_string(), file_name.to_string()))
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("{}/{}", card_key, file_name)))
    }
}
