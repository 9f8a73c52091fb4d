//! Template-driven document generation for freelance leads
//!
//! This crate turns markdown contract, proposal and invoice templates into
//! concrete documents for a specific lead:
//! - `variables`: scans `{{name}}` placeholders out of template content
//! - `format`: per-variable formatters (currency, zoned dates, addresses, labels)
//! - `substitute`: applies the formatters to template content in a fixed order
//! - `generator`: loads records, substitutes, persists and links the result
//!
//! Storage is abstracted behind [`DocumentStore`]; [`MemoryStore`] is provided
//! for tests and embedding.

pub mod config;
pub mod error;
pub mod format;
pub mod generator;
pub mod models;
pub mod store;
pub mod substitute;
pub mod variables;

pub use config::DocgenConfig;
pub use error::{ConfigError, GenerateError, StoreError};
pub use generator::DocumentGenerator;
pub use models::{
    Address, DocumentCategory, GeneratedDocument, GeneratedSummary, Lead, NewDocument, Template,
    TemplateDraft, VariableSet,
};
pub use store::{DocumentStore, MemoryStore};
pub use substitute::substitute;
pub use variables::{extract_variables, IMPLICIT_VARIABLES};
