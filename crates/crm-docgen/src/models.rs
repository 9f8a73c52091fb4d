//! Data models for templates, generated documents and leads

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeSet;
use uuid::Uuid;

use crate::variables::{extract_variables, placeholder_tag};

/// Variable names declared by a template. Ordering carries no meaning;
/// a sorted set keeps serialization stable.
pub type VariableSet = BTreeSet<String>;

/// Document category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentCategory {
    Contract,
    Proposal,
    Invoice,
    Agreement,
    #[default]
    Other,
}

impl DocumentCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentCategory::Contract => "contract",
            DocumentCategory::Proposal => "proposal",
            DocumentCategory::Invoice => "invoice",
            DocumentCategory::Agreement => "agreement",
            DocumentCategory::Other => "other",
        }
    }

    /// Parse a stored category. Unrecognized values map to `Other`.
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "contract" => DocumentCategory::Contract,
            "proposal" => DocumentCategory::Proposal,
            "invoice" => DocumentCategory::Invoice,
            "agreement" => DocumentCategory::Agreement,
            _ => DocumentCategory::Other,
        }
    }
}

impl std::fmt::Display for DocumentCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl<'de> Deserialize<'de> for DocumentCategory {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Option::<String>::deserialize(deserializer)?;
        Ok(value.map(|v| Self::parse(&v)).unwrap_or_default())
    }
}

/// Authoring input for creating or editing a template
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateDraft {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub content: String,
    #[serde(default)]
    pub category: DocumentCategory,
}

/// Reusable markdown content with `{{name}}` placeholders
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Template {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub content: String,
    #[serde(default)]
    pub category: DocumentCategory,
    pub is_template: bool,
    #[serde(default)]
    pub variables: VariableSet,
    pub created_at: DateTime<Utc>,
    pub last_modified: DateTime<Utc>,
}

impl Template {
    /// Build a new template from a draft, assigning a fresh id
    pub fn from_draft(draft: TemplateDraft, now: DateTime<Utc>) -> Self {
        Self::with_id(Uuid::new_v4().to_string(), draft, now)
    }

    pub fn with_id(id: impl Into<String>, draft: TemplateDraft, now: DateTime<Utc>) -> Self {
        let variables = extract_variables(&draft.content);
        Self {
            id: id.into(),
            title: draft.title,
            description: draft.description,
            content: draft.content,
            category: draft.category,
            is_template: true,
            variables,
            created_at: now,
            last_modified: now,
        }
    }

    /// Apply an edit. Variables are re-extracted from the new content.
    pub fn apply_draft(&mut self, draft: TemplateDraft, now: DateTime<Utc>) {
        self.title = draft.title;
        self.description = draft.description;
        self.content = draft.content;
        self.category = draft.category;
        self.refresh_variables();
        self.last_modified = now;
    }

    pub fn refresh_variables(&mut self) {
        self.variables = extract_variables(&self.content);
    }

    /// `{{name}}` tags an editor can offer for insertion
    pub fn insertable_tags(&self) -> Vec<String> {
        self.variables.iter().map(|v| placeholder_tag(v)).collect()
    }
}

/// A document produced by the generator, ready to be persisted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewDocument {
    pub title: String,
    pub description: String,
    pub content: String,
    pub category: DocumentCategory,
    pub variables: VariableSet,
    pub lead_id: String,
    pub created_at: DateTime<Utc>,
}

impl NewDocument {
    pub fn into_document(self, id: impl Into<String>) -> GeneratedDocument {
        GeneratedDocument {
            id: id.into(),
            title: self.title,
            description: self.description,
            content: self.content,
            category: self.category,
            is_template: false,
            variables: self.variables,
            lead_id: self.lead_id,
            created_at: self.created_at,
            last_modified: self.created_at,
        }
    }
}

/// A template instance resolved against a lead
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedDocument {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub content: String,
    #[serde(default)]
    pub category: DocumentCategory,
    pub is_template: bool,
    /// Snapshot of the template's variables at generation time
    #[serde(default)]
    pub variables: VariableSet,
    pub lead_id: String,
    pub created_at: DateTime<Utc>,
    pub last_modified: DateTime<Utc>,
}

impl GeneratedDocument {
    /// Replace the content. The variable snapshot is left as generated.
    pub fn edit_content(&mut self, content: String, now: DateTime<Utc>) {
        self.content = content;
        self.last_modified = now;
    }

    pub fn summary(&self) -> GeneratedSummary {
        GeneratedSummary {
            id: self.id.clone(),
            title: self.title.clone(),
            content: self.content.clone(),
        }
    }
}

/// Result of a generation request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedSummary {
    pub id: String,
    pub title: String,
    pub content: String,
}

/// Postal address attached to a lead
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    #[serde(default, deserialize_with = "lenient::optional_text")]
    pub street: Option<String>,
    #[serde(default, deserialize_with = "lenient::optional_text")]
    pub apt_unit: Option<String>,
    #[serde(default, deserialize_with = "lenient::optional_text")]
    pub city: Option<String>,
    #[serde(default, deserialize_with = "lenient::optional_text")]
    pub state: Option<String>,
    #[serde(default, deserialize_with = "lenient::optional_text")]
    pub zip_code: Option<String>,
    #[serde(default, deserialize_with = "lenient::optional_text")]
    pub country: Option<String>,
}

impl Address {
    /// True when every subfield is absent or blank
    pub fn is_empty(&self) -> bool {
        [
            &self.street,
            &self.apt_unit,
            &self.city,
            &self.state,
            &self.zip_code,
            &self.country,
        ]
        .iter()
        .all(|part| part.as_deref().map_or(true, |p| p.trim().is_empty()))
    }
}

/// A freelance lead, the source of substituted values.
///
/// Deserialization is lenient: malformed money or date values become
/// absent rather than rejecting the whole record, and unknown fields are
/// kept in `extra` so templates can still reference them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lead {
    #[serde(default, deserialize_with = "lenient::text")]
    pub id: String,
    #[serde(default, deserialize_with = "lenient::text")]
    pub first_name: String,
    #[serde(default, deserialize_with = "lenient::text")]
    pub last_name: String,
    #[serde(
        default,
        deserialize_with = "lenient::optional_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub business_name: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient::optional_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub email: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient::optional_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub phone: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient::optional_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub business_email: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient::optional_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub business_phone: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient::amount",
        skip_serializing_if = "Option::is_none"
    )]
    pub total_budget: Option<f64>,
    #[serde(
        default,
        deserialize_with = "lenient::amount",
        skip_serializing_if = "Option::is_none"
    )]
    pub billed_amount: Option<f64>,
    #[serde(
        default,
        deserialize_with = "lenient::amount",
        skip_serializing_if = "Option::is_none"
    )]
    pub paid_amount: Option<f64>,
    #[serde(
        default,
        deserialize_with = "lenient::amount",
        skip_serializing_if = "Option::is_none"
    )]
    pub remaining_balance: Option<f64>,
    #[serde(
        default,
        deserialize_with = "lenient::object",
        skip_serializing_if = "Option::is_none"
    )]
    pub billing_address: Option<Address>,
    #[serde(
        default,
        deserialize_with = "lenient::timestamp",
        skip_serializing_if = "Option::is_none"
    )]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(
        default,
        deserialize_with = "lenient::timestamp",
        skip_serializing_if = "Option::is_none"
    )]
    pub last_contacted_at: Option<DateTime<Utc>>,
    #[serde(
        default,
        deserialize_with = "lenient::optional_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub preferred_contact: Option<String>,
    /// Ids of documents generated for this lead, oldest first
    #[serde(default)]
    pub documents: Vec<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Lead {
    /// Human-readable name used in generated document titles
    pub fn display_name(&self) -> String {
        let full = format!("{} {}", self.first_name, self.last_name);
        let full = full.trim();
        if !full.is_empty() {
            return full.to_string();
        }

        [&self.business_name, &self.email]
            .into_iter()
            .flatten()
            .map(|v| v.trim())
            .find(|v| !v.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| "Unnamed Lead".to_string())
    }

    /// All fields keyed by their camelCase names, including `extra`
    pub fn fields(&self) -> Map<String, Value> {
        match serde_json::to_value(self) {
            Ok(Value::Object(map)) => map,
            _ => Map::new(),
        }
    }

    /// Record a generated document. Returns false if it was already linked.
    pub fn attach_document(&mut self, document_id: &str) -> bool {
        if self.documents.iter().any(|d| d == document_id) {
            return false;
        }
        self.documents.push(document_id.to_string());
        true
    }
}

/// Tolerant field deserializers for lead records imported from the CRM
pub(crate) mod lenient {
    use chrono::{DateTime, NaiveDate, TimeZone, Utc};
    use serde::de::DeserializeOwned;
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    pub fn text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
        Ok(value_text(&Value::deserialize(deserializer)?).unwrap_or_default())
    }

    pub fn optional_text<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<String>, D::Error> {
        Ok(value_text(&Value::deserialize(deserializer)?))
    }

    pub fn amount<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<f64>, D::Error> {
        Ok(parse_amount(&Value::deserialize(deserializer)?))
    }

    pub fn timestamp<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<DateTime<Utc>>, D::Error> {
        Ok(parse_timestamp(&Value::deserialize(deserializer)?))
    }

    pub fn object<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
    where
        D: Deserializer<'de>,
        T: DeserializeOwned,
    {
        let value = Value::deserialize(deserializer)?;
        if !value.is_object() {
            return Ok(None);
        }
        Ok(serde_json::from_value(value).ok())
    }

    fn value_text(value: &Value) -> Option<String> {
        match value {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }

    pub fn parse_amount(value: &Value) -> Option<f64> {
        let amount = match value {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s
                .chars()
                .filter(|c| *c != '$' && *c != ',')
                .collect::<String>()
                .trim()
                .parse::<f64>()
                .ok(),
            _ => None,
        };
        amount.filter(|a| a.is_finite())
    }

    pub fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
        match value {
            Value::String(s) => {
                let s = s.trim();
                if let Ok(parsed) = DateTime::parse_from_rfc3339(s) {
                    return Some(parsed.with_timezone(&Utc));
                }
                NaiveDate::parse_from_str(s, "%Y-%m-%d")
                    .ok()
                    .and_then(|d| d.and_hms_opt(0, 0, 0))
                    .map(|dt| dt.and_utc())
            }
            Value::Number(n) => n
                .as_i64()
                .and_then(|millis| Utc.timestamp_millis_opt(millis).single()),
            _ => None,
        }
    }
}
