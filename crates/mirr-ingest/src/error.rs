//! Error types for the ingestion pipeline
//!
//! The variants follow the blast radius of a failure: item-level errors drop a
//! single document, batch-level errors lose one batch, and the rest abort the
//! run before or while the source is being enumerated.

use std::fmt::Display;
use thiserror::Error;

/// Result type alias for ingestion operations
pub type Result<T> = std::result::Result<T, IngestError>;

#[derive(Error, Debug)]
pub enum IngestError {
    /// The item source could not list its scope. Fatal to the run.
    #[error("Failed to enumerate {scope}: {message}")]
    SourceEnumeration { scope: String, message: String },

    /// One item could not be read. The item is dropped from its batch.
    #[error("Failed to fetch {key}: {message}")]
    ItemFetch { key: String, message: String },

    /// One document could not be turned into a record. The item is dropped.
    #[error("Malformed record: {0}")]
    MalformedRecord(String),

    /// A batch insert failed and its transaction was rolled back.
    #[error("Batch write failed and was rolled back: {0}")]
    BatchWrite(#[source] sqlx::Error),

    /// A worker could not open its destination connection or source reader.
    #[error("Failed to acquire {resource}: {message}")]
    ConnectionAcquisition { resource: String, message: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Credential lookup failed: {0}")]
    Credentials(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// How far a failure reaches
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorScope {
    Item,
    Batch,
    Run,
}

impl IngestError {
    pub fn enumeration(scope: impl Into<String>, message: impl Display) -> Self {
        Self::SourceEnumeration {
            scope: scope.into(),
            message: message.to_string(),
        }
    }

    pub fn item_fetch(key: impl Into<String>, message: impl Display) -> Self {
        Self::ItemFetch {
            key: key.into(),
            message: message.to_string(),
        }
    }

    pub fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedRecord(reason.into())
    }

    pub fn acquisition(resource: impl Into<String>, message: impl Display) -> Self {
        Self::ConnectionAcquisition {
            resource: resource.into(),
            message: message.to_string(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    pub fn scope(&self) -> ErrorScope {
        match self {
            Self::ItemFetch { .. } | Self::MalformedRecord(_) => ErrorScope::Item,
            Self::BatchWrite(_) | Self::ConnectionAcquisition { .. } => ErrorScope::Batch,
            Self::SourceEnumeration { .. }
            | Self::Config(_)
            | Self::Credentials(_)
            | Self::Database(_)
            | Self::Io(_) => ErrorScope::Run,
        }
    }
}
