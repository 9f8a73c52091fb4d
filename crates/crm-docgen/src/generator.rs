//! Document generator
//!
//! Orchestrates a single generation request:
//! 1. load the template (`TemplateNotFound` if absent)
//! 2. load the lead (`LeadNotFound` if absent)
//! 3. substitute the template's stored variables against the lead
//! 4. persist a new non-template document (`CreateFailed` on error)
//! 5. append the document id to the lead (`AssociationFailed` on error)
//!
//! The two writes are not atomic. A failure in step 5 leaves a persisted,
//! unlinked document which [`DocumentGenerator::link`] can attach later.

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::config::DocgenConfig;
use crate::error::{GenerateError, StoreError};
use crate::models::{GeneratedSummary, Lead, NewDocument, Template};
use crate::store::DocumentStore;
use crate::substitute::{substitute, undeclared_placeholders};

pub struct DocumentGenerator<S> {
    store: S,
    config: DocgenConfig,
}

impl<S: DocumentStore> DocumentGenerator<S> {
    pub fn new(store: S, config: DocgenConfig) -> Self {
        Self { store, config }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &DocgenConfig {
        &self.config
    }

    /// Generate a document from `template_id` for `lead_id` at the current instant
    pub async fn generate(
        &self,
        template_id: &str,
        lead_id: &str,
        timezone: Option<&str>,
    ) -> Result<GeneratedSummary, GenerateError> {
        self.generate_at(template_id, lead_id, timezone, Utc::now())
            .await
    }

    /// Generate with an explicit generation instant
    pub async fn generate_at(
        &self,
        template_id: &str,
        lead_id: &str,
        timezone: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<GeneratedSummary, GenerateError> {
        let (template, lead) = self.load(template_id, lead_id).await?;
        let content = self.render(&template, &lead, timezone, now);

        let document = NewDocument {
            title: format!("{} - {}", template.title, lead.display_name()),
            description: template.description.clone(),
            content,
            category: template.category,
            variables: template.variables.clone(),
            lead_id: lead.id.clone(),
            created_at: now,
        };
        let title = document.title.clone();
        let content = document.content.clone();

        let id = self
            .store
            .create_document(document)
            .await
            .map_err(GenerateError::CreateFailed)?;

        let summary = GeneratedSummary { id, title, content };

        if let Err(source) = self.store.append_association(&lead.id, &summary.id).await {
            warn!(
                "Document {} created but not linked to lead {}: {}",
                summary.id, lead.id, source
            );
            return Err(GenerateError::AssociationFailed {
                document: summary,
                lead_id: lead.id,
                source,
            });
        }

        info!(
            "Generated document {} from template {} for lead {}",
            summary.id, template.id, lead.id
        );

        Ok(summary)
    }

    /// Resolve a template against a lead without persisting anything
    pub async fn preview(
        &self,
        template_id: &str,
        lead_id: &str,
        timezone: Option<&str>,
    ) -> Result<String, GenerateError> {
        let (template, lead) = self.load(template_id, lead_id).await?;
        Ok(self.render(&template, &lead, timezone, Utc::now()))
    }

    /// Retry the association step for an already persisted document
    pub async fn link(&self, lead_id: &str, document_id: &str) -> Result<(), GenerateError> {
        match self.store.append_association(lead_id, document_id).await {
            Ok(()) => {
                info!("Linked document {} to lead {}", document_id, lead_id);
                Ok(())
            }
            Err(StoreError::LeadNotFound(id)) => Err(GenerateError::LeadNotFound(id)),
            Err(e) => Err(GenerateError::LinkFailed(e)),
        }
    }

    async fn load(&self, template_id: &str, lead_id: &str) -> Result<(Template, Lead), GenerateError> {
        let template = self
            .store
            .load_template(template_id)
            .await
            .map_err(GenerateError::Lookup)?
            .ok_or_else(|| GenerateError::TemplateNotFound(template_id.to_string()))?;

        let mut lead = self
            .store
            .load_lead(lead_id)
            .await
            .map_err(GenerateError::Lookup)?
            .ok_or_else(|| GenerateError::LeadNotFound(lead_id.to_string()))?;

        if lead.id.is_empty() {
            lead.id = lead_id.to_string();
        }

        Ok((template, lead))
    }

    fn render(
        &self,
        template: &Template,
        lead: &Lead,
        timezone: Option<&str>,
        now: DateTime<Utc>,
    ) -> String {
        let zone = self.config.resolve_zone(timezone);
        let content = substitute(&template.content, &template.variables, lead, now, zone);

        let leftover = undeclared_placeholders(&template.content, &template.variables);
        if !leftover.is_empty() {
            // The template's variable set is likely stale
            warn!(
                "Template {} left undeclared placeholders unresolved: {:?}",
                template.id, leftover
            );
        }

        content
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DocumentCategory, TemplateDraft};
    use crate::store::MemoryStore;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 9, 1, 14, 0, 0).unwrap()
    }

    fn seeded() -> DocumentGenerator<MemoryStore> {
        let store = MemoryStore::new();
        store
            .insert_template(Template::with_id(
                "tpl-1",
                TemplateDraft {
                    title: "Service Agreement".to_string(),
                    description: "Standard terms".to_string(),
                    content: "Client: {{fullName}}\nBalance: {{remainingBalance}}".to_string(),
                    category: DocumentCategory::Agreement,
                },
                now(),
            ))
            .unwrap();
        store
            .insert_lead(Lead {
                id: "lead-1".to_string(),
                first_name: "Jane".to_string(),
                last_name: "Doe".to_string(),
                remaining_balance: Some(250.0),
                ..Default::default()
            })
            .unwrap();
        DocumentGenerator::new(store, DocgenConfig::new(chrono_tz::UTC))
    }

    #[tokio::test]
    async fn test_generate_persists_and_links() {
        let generator = seeded();
        let summary = generator
            .generate_at("tpl-1", "lead-1", None, now())
            .await
            .unwrap();

        assert_eq!(summary.title, "Service Agreement - Jane Doe");
        assert_eq!(summary.content, "Client: Jane Doe\nBalance: $250.00");

        let stored = generator.store().document(&summary.id).unwrap().unwrap();
        assert!(!stored.is_template);
        assert_eq!(stored.category, DocumentCategory::Agreement);
        assert_eq!(stored.description, "Standard terms");
        assert_eq!(stored.lead_id, "lead-1");

        let lead = generator.store().load_lead("lead-1").await.unwrap().unwrap();
        assert_eq!(lead.documents, vec![summary.id]);
    }

    #[tokio::test]
    async fn test_missing_template_has_no_side_effects() {
        let generator = seeded();
        let err = generator.generate("nope", "lead-1", None).await.unwrap_err();

        assert!(matches!(err, GenerateError::TemplateNotFound(ref id) if id == "nope"));
        assert_eq!(generator.store().document_count().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_missing_lead_has_no_side_effects() {
        let generator = seeded();
        let err = generator.generate("tpl-1", "ghost", None).await.unwrap_err();

        assert!(matches!(err, GenerateError::LeadNotFound(ref id) if id == "ghost"));
        assert_eq!(generator.store().document_count().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_preview_does_not_persist() {
        let generator = seeded();
        let content = generator.preview("tpl-1", "lead-1", None).await.unwrap();

        assert_eq!(content, "Client: Jane Doe\nBalance: $250.00");
        assert_eq!(generator.store().document_count().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_link_unknown_lead() {
        let generator = seeded();
        let err = generator.link("ghost", "doc-1").await.unwrap_err();
        assert!(matches!(err, GenerateError::LeadNotFound(_)));
    }
}
