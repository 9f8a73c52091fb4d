//! Storage collaborator used by the generator

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;
use uuid::Uuid;

use crate::error::StoreError;
use crate::models::{GeneratedDocument, Lead, NewDocument, Template};

/// Record store consumed by [`crate::DocumentGenerator`].
///
/// `append_association` must be idempotent: appending an id the lead
/// already references is a no-op.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn load_template(&self, id: &str) -> Result<Option<Template>, StoreError>;

    async fn load_lead(&self, id: &str) -> Result<Option<Lead>, StoreError>;

    /// Persist a generated document and return its id
    async fn create_document(&self, document: NewDocument) -> Result<String, StoreError>;

    async fn append_association(&self, lead_id: &str, document_id: &str)
        -> Result<(), StoreError>;
}

/// In-process store backed by hash maps
#[derive(Default)]
pub struct MemoryStore {
    templates: RwLock<HashMap<String, Template>>,
    leads: RwLock<HashMap<String, Lead>>,
    documents: RwLock<HashMap<String, GeneratedDocument>>,
}

fn poisoned<T>(_: T) -> StoreError {
    StoreError::Backend("memory store lock poisoned".to_string())
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_template(&self, template: Template) -> Result<(), StoreError> {
        self.templates
            .write()
            .map_err(poisoned)?
            .insert(template.id.clone(), template);
        Ok(())
    }

    pub fn insert_lead(&self, lead: Lead) -> Result<(), StoreError> {
        self.leads
            .write()
            .map_err(poisoned)?
            .insert(lead.id.clone(), lead);
        Ok(())
    }

    pub fn document(&self, id: &str) -> Result<Option<GeneratedDocument>, StoreError> {
        Ok(self.documents.read().map_err(poisoned)?.get(id).cloned())
    }

    pub fn document_count(&self) -> Result<usize, StoreError> {
        Ok(self.documents.read().map_err(poisoned)?.len())
    }

    /// Remove a document. Leads that reference it keep the id.
    pub fn delete_document(&self, id: &str) -> Result<bool, StoreError> {
        Ok(self.documents.write().map_err(poisoned)?.remove(id).is_some())
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn load_template(&self, id: &str) -> Result<Option<Template>, StoreError> {
        Ok(self.templates.read().map_err(poisoned)?.get(id).cloned())
    }

    async fn load_lead(&self, id: &str) -> Result<Option<Lead>, StoreError> {
        Ok(self.leads.read().map_err(poisoned)?.get(id).cloned())
    }

    async fn create_document(&self, document: NewDocument) -> Result<String, StoreError> {
        let id = Uuid::new_v4().to_string();
        self.documents
            .write()
            .map_err(poisoned)?
            .insert(id.clone(), document.into_document(id.clone()));
        Ok(id)
    }

    async fn append_association(
        &self,
        lead_id: &str,
        document_id: &str,
    ) -> Result<(), StoreError> {
        let mut leads = self.leads.write().map_err(poisoned)?;
        let lead = leads
            .get_mut(lead_id)
            .ok_or_else(|| StoreError::LeadNotFound(lead_id.to_string()))?;
        lead.attach_document(document_id);
        Ok(())
    }
}
