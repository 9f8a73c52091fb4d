//! Error types for document generation

use thiserror::Error;

use crate::models::GeneratedSummary;

/// Failures reported by a [`crate::DocumentStore`] implementation
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Lead not found: {0}")]
    LeadNotFound(String),

    #[error("Storage backend error: {0}")]
    Backend(String),
}

/// Errors returned by [`crate::DocumentGenerator`]
#[derive(Error, Debug)]
pub enum GenerateError {
    #[error("Template not found: {0}")]
    TemplateNotFound(String),

    #[error("Lead not found: {0}")]
    LeadNotFound(String),

    #[error("Failed to load records: {0}")]
    Lookup(#[source] StoreError),

    #[error("Failed to persist generated document: {0}")]
    CreateFailed(#[source] StoreError),

    /// The document exists but the lead does not reference it yet.
    /// Retry with [`crate::DocumentGenerator::link`].
    #[error(
        "Document {} was created but could not be linked to lead {lead_id}: {source}",
        .document.id
    )]
    AssociationFailed {
        document: GeneratedSummary,
        lead_id: String,
        #[source]
        source: StoreError,
    },

    #[error("Failed to link document: {0}")]
    LinkFailed(#[source] StoreError),
}

impl GenerateError {
    /// True when a document was persisted despite the error
    pub fn is_partial_success(&self) -> bool {
        matches!(self, GenerateError::AssociationFailed { .. })
    }

    /// The persisted document, for partial successes
    pub fn document(&self) -> Option<&GeneratedSummary> {
        match self {
            GenerateError::AssociationFailed { document, .. } => Some(document),
            _ => None,
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Unknown timezone: {0}")]
    UnknownTimezone(String),
}
