//! SQLite-backed record store

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use crm_docgen::{
    DocumentCategory, DocumentStore, GeneratedDocument, Lead, NewDocument, StoreError, Template,
    VariableSet,
};
use sqlx::sqlite::SqlitePool;
use sqlx::FromRow;
use uuid::Uuid;

/// Template or generated document row
#[derive(Debug, Clone, FromRow)]
struct DbDocument {
    id: String,
    title: String,
    description: String,
    content: String,
    category: String,
    is_template: bool,
    variables_json: String,
    lead_id: Option<String>,
    created_at: DateTime<Utc>,
    last_modified: DateTime<Utc>,
}

impl DbDocument {
    fn variables(&self) -> Result<VariableSet, StoreError> {
        serde_json::from_str(&self.variables_json).map_err(|e| {
            StoreError::Backend(format!("Corrupt variables for document {}: {}", self.id, e))
        })
    }

    fn into_template(self) -> Result<Template, StoreError> {
        let variables = self.variables()?;
        Ok(Template {
            id: self.id,
            title: self.title,
            description: self.description,
            content: self.content,
            category: DocumentCategory::parse(&self.category),
            is_template: true,
            variables,
            created_at: self.created_at,
            last_modified: self.last_modified,
        })
    }

    fn into_generated(self) -> Result<GeneratedDocument, StoreError> {
        let variables = self.variables()?;
        Ok(GeneratedDocument {
            id: self.id,
            title: self.title,
            description: self.description,
            content: self.content,
            category: DocumentCategory::parse(&self.category),
            is_template: false,
            variables,
            lead_id: self.lead_id.unwrap_or_default(),
            created_at: self.created_at,
            last_modified: self.last_modified,
        })
    }
}

const SELECT_DOCUMENT: &str = r#"
    SELECT id, title, description, content, category, is_template, variables_json,
           lead_id, created_at, last_modified
    FROM documents
    WHERE id = ? AND is_template = ?
"#;

fn backend(e: sqlx::Error) -> StoreError {
    StoreError::Backend(e.to_string())
}

fn encode_variables(variables: &VariableSet) -> Result<String, StoreError> {
    serde_json::to_string(variables).map_err(|e| StoreError::Backend(e.to_string()))
}

#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    async fn fetch_document(
        &self,
        id: &str,
        is_template: bool,
    ) -> Result<Option<DbDocument>, StoreError> {
        sqlx::query_as(SELECT_DOCUMENT)
            .bind(id)
            .bind(is_template)
            .fetch_optional(&self.pool)
            .await
            .map_err(backend)
    }

    /// Insert or replace a template
    pub async fn save_template(&self, template: &Template) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT OR REPLACE INTO documents
                (id, title, description, content, category, is_template, variables_json,
                 lead_id, created_at, last_modified)
            VALUES (?, ?, ?, ?, ?, 1, ?, NULL, ?, ?)
            "#,
        )
        .bind(&template.id)
        .bind(&template.title)
        .bind(&template.description)
        .bind(&template.content)
        .bind(template.category.as_str())
        .bind(encode_variables(&template.variables)?)
        .bind(template.created_at.to_rfc3339())
        .bind(template.last_modified.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(backend)?;
        Ok(())
    }

    pub async fn generated_document(
        &self,
        id: &str,
    ) -> Result<Option<GeneratedDocument>, StoreError> {
        self.fetch_document(id, false)
            .await?
            .map(DbDocument::into_generated)
            .transpose()
    }

    /// Persist edited content. Returns false if the document does not exist.
    pub async fn update_document_content(
        &self,
        document: &GeneratedDocument,
    ) -> Result<bool, StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE documents
            SET content = ?, last_modified = ?
            WHERE id = ? AND is_template = 0
            "#,
        )
        .bind(&document.content)
        .bind(document.last_modified.to_rfc3339())
        .bind(&document.id)
        .execute(&self.pool)
        .await
        .map_err(backend)?;
        Ok(result.rows_affected() > 0)
    }

    /// Delete a generated document. Lead associations are left in place.
    pub async fn delete_document(&self, id: &str) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM documents WHERE id = ? AND is_template = 0")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(backend)?;
        Ok(result.rows_affected() > 0)
    }

    /// Insert or replace a lead. The association list is managed separately
    /// and is not taken from `lead.documents`.
    pub async fn save_lead(&self, lead: &Lead) -> Result<(), StoreError> {
        let mut record = lead.clone();
        record.documents.clear();
        let data_json =
            serde_json::to_string(&record).map_err(|e| StoreError::Backend(e.to_string()))?;
        let now = Utc::now().to_rfc3339();

        sqlx::query(
            r#"
            INSERT INTO leads (id, data_json, created_at, updated_at)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET data_json = excluded.data_json,
                                          updated_at = excluded.updated_at
            "#,
        )
        .bind(&lead.id)
        .bind(&data_json)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await
        .map_err(backend)?;
        Ok(())
    }

    async fn lead_exists(&self, id: &str) -> Result<bool, StoreError> {
        let row: Option<(i64,)> = sqlx::query_as("SELECT 1 FROM leads WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(backend)?;
        Ok(row.is_some())
    }
}

#[async_trait]
impl DocumentStore for SqliteStore {
    async fn load_template(&self, id: &str) -> Result<Option<Template>, StoreError> {
        self.fetch_document(id, true)
            .await?
            .map(DbDocument::into_template)
            .transpose()
    }

    async fn load_lead(&self, id: &str) -> Result<Option<Lead>, StoreError> {
        let row: Option<(String,)> = sqlx::query_as("SELECT data_json FROM leads WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(backend)?;

        let Some((data_json,)) = row else {
            return Ok(None);
        };

        // Lead records are lenient by construction; an unreadable blob still
        // yields a lead so generation can proceed with defaults.
        let mut lead: Lead = serde_json::from_str(&data_json).unwrap_or_else(|e| {
            tracing::warn!("Unreadable data for lead {}: {}", id, e);
            Lead::default()
        });
        lead.id = id.to_string();

        let documents: Vec<(String,)> = sqlx::query_as(
            "SELECT document_id FROM lead_documents WHERE lead_id = ? ORDER BY rowid",
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await
        .map_err(backend)?;
        lead.documents = documents.into_iter().map(|(d,)| d).collect();

        Ok(Some(lead))
    }

    async fn create_document(&self, document: NewDocument) -> Result<String, StoreError> {
        let id = Uuid::new_v4().to_string();
        let created_at = document.created_at.to_rfc3339();

        sqlx::query(
            r#"
            INSERT INTO documents
                (id, title, description, content, category, is_template, variables_json,
                 lead_id, created_at, last_modified)
            VALUES (?, ?, ?, ?, ?, 0, ?, ?, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(&document.title)
        .bind(&document.description)
        .bind(&document.content)
        .bind(document.category.as_str())
        .bind(encode_variables(&document.variables)?)
        .bind(&document.lead_id)
        .bind(&created_at)
        .bind(&created_at)
        .execute(&self.pool)
        .await
        .map_err(backend)?;

        Ok(id)
    }

    async fn append_association(
        &self,
        lead_id: &str,
        document_id: &str,
    ) -> Result<(), StoreError> {
        if !self.lead_exists(lead_id).await? {
            return Err(StoreError::LeadNotFound(lead_id.to_string()));
        }

        sqlx::query(
            r#"
            INSERT OR IGNORE INTO lead_documents (lead_id, document_id, linked_at)
            VALUES (?, ?, ?)
            "#,
        )
        .bind(lead_id)
        .bind(document_id)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(backend)?;

        Ok(())
    }
}
