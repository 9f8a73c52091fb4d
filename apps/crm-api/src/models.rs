//! Request and response bodies for the CRM API

use crm_docgen::{GeneratedSummary, Template};
use serde::{Deserialize, Serialize};

/// Template plus the tags an editor can insert
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateResponse {
    #[serde(flatten)]
    pub template: Template,
    pub insertable_tags: Vec<String>,
}

impl From<Template> for TemplateResponse {
    fn from(template: Template) -> Self {
        let insertable_tags = template.insertable_tags();
        Self {
            template,
            insertable_tags,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRequest {
    pub template_id: String,
    pub lead_id: String,
    #[serde(default)]
    pub timezone: Option<String>,
}

/// Generated document. `linked` is false when the document was stored but
/// the lead could not be updated; retry via the link endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateResponse {
    pub id: String,
    pub title: String,
    pub content: String,
    pub linked: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

impl GenerateResponse {
    pub fn linked(summary: GeneratedSummary) -> Self {
        Self {
            id: summary.id,
            title: summary.title,
            content: summary.content,
            linked: true,
            warning: None,
        }
    }

    pub fn unlinked(summary: GeneratedSummary, warning: String) -> Self {
        Self {
            linked: false,
            warning: Some(warning),
            ..Self::linked(summary)
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateContentRequest {
    pub content: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkResponse {
    pub lead_id: String,
    pub document_id: String,
    pub linked: bool,
}
