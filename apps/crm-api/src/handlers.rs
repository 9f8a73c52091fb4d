//! HTTP handlers for the CRM API

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use crm_docgen::{DocumentStore, GenerateError, GeneratedDocument, Lead, Template, TemplateDraft};
use std::sync::Arc;
use uuid::Uuid;

use crate::error::ApiError;
use crate::models::*;
use crate::state::AppState;

/// Health check endpoint
pub async fn health(State(state): State<Arc<AppState>>) -> (StatusCode, &'static str) {
    if state.is_initialized() {
        (StatusCode::OK, "OK")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "Starting")
    }
}

fn validate_draft(draft: &TemplateDraft) -> Result<(), ApiError> {
    if draft.title.trim().is_empty() {
        return Err(ApiError::InvalidRequest(
            "Template title must not be empty".into(),
        ));
    }
    Ok(())
}

/// Create a template. Variables are extracted from the content.
pub async fn create_template(
    State(state): State<Arc<AppState>>,
    Json(draft): Json<TemplateDraft>,
) -> Result<(StatusCode, Json<TemplateResponse>), ApiError> {
    validate_draft(&draft)?;

    let template = Template::from_draft(draft, Utc::now());
    state.store.save_template(&template).await?;

    tracing::info!(
        "Created template {} with {} variables",
        template.id,
        template.variables.len()
    );

    Ok((StatusCode::CREATED, Json(template.into())))
}

/// Get template by ID
pub async fn get_template(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<TemplateResponse>, ApiError> {
    let template = state
        .store
        .load_template(&id)
        .await?
        .ok_or_else(|| ApiError::TemplateNotFound(id.clone()))?;

    Ok(Json(template.into()))
}

/// Edit a template. Variables are re-extracted; documents generated
/// earlier keep their own snapshot.
pub async fn update_template(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(draft): Json<TemplateDraft>,
) -> Result<Json<TemplateResponse>, ApiError> {
    validate_draft(&draft)?;

    let mut template = state
        .store
        .load_template(&id)
        .await?
        .ok_or_else(|| ApiError::TemplateNotFound(id.clone()))?;

    template.apply_draft(draft, Utc::now());
    state.store.save_template(&template).await?;

    tracing::info!("Updated template {}", template.id);

    Ok(Json(template.into()))
}

/// Create or replace a lead
pub async fn create_lead(
    State(state): State<Arc<AppState>>,
    Json(mut lead): Json<Lead>,
) -> Result<(StatusCode, Json<Lead>), ApiError> {
    if lead.id.trim().is_empty() {
        lead.id = Uuid::new_v4().to_string();
    }
    if lead.created_at.is_none() {
        lead.created_at = Some(Utc::now());
    }

    state.store.save_lead(&lead).await?;

    // Associations live in their own table; report what is stored
    let lead = state
        .store
        .load_lead(&lead.id)
        .await?
        .ok_or_else(|| ApiError::LeadNotFound(lead.id.clone()))?;

    tracing::info!("Saved lead {}", lead.id);

    Ok((StatusCode::CREATED, Json(lead)))
}

/// Get lead by ID, including generated document ids
pub async fn get_lead(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Lead>, ApiError> {
    let lead = state
        .store
        .load_lead(&id)
        .await?
        .ok_or_else(|| ApiError::LeadNotFound(id.clone()))?;

    Ok(Json(lead))
}

/// Generate a document from a template for a lead
pub async fn generate_document(
    State(state): State<Arc<AppState>>,
    Json(req): Json<GenerateRequest>,
) -> Result<(StatusCode, Json<GenerateResponse>), ApiError> {
    let result = state
        .generator
        .generate(&req.template_id, &req.lead_id, req.timezone.as_deref())
        .await;

    match result {
        Ok(summary) => Ok((StatusCode::CREATED, Json(GenerateResponse::linked(summary)))),
        Err(GenerateError::AssociationFailed {
            document, source, ..
        }) => {
            tracing::warn!(
                "Document {} generated but not linked to lead {}",
                document.id,
                req.lead_id
            );
            Ok((
                StatusCode::MULTI_STATUS,
                Json(GenerateResponse::unlinked(
                    document,
                    format!("Document was saved but not linked to the lead: {}", source),
                )),
            ))
        }
        Err(e) => Err(e.into()),
    }
}

/// Retry linking a generated document to its lead
pub async fn link_document(
    State(state): State<Arc<AppState>>,
    Path((lead_id, document_id)): Path<(String, String)>,
) -> Result<Json<LinkResponse>, ApiError> {
    if state.store.generated_document(&document_id).await?.is_none() {
        return Err(ApiError::DocumentNotFound(document_id));
    }

    state.generator.link(&lead_id, &document_id).await?;

    Ok(Json(LinkResponse {
        lead_id,
        document_id,
        linked: true,
    }))
}

/// Get generated document by ID
pub async fn get_document(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<GeneratedDocument>, ApiError> {
    let document = state
        .store
        .generated_document(&id)
        .await?
        .ok_or_else(|| ApiError::DocumentNotFound(id.clone()))?;

    Ok(Json(document))
}

/// Replace the content of a generated document
pub async fn update_document_content(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<UpdateContentRequest>,
) -> Result<Json<GeneratedDocument>, ApiError> {
    let mut document = state
        .store
        .generated_document(&id)
        .await?
        .ok_or_else(|| ApiError::DocumentNotFound(id.clone()))?;

    document.edit_content(req.content, Utc::now());

    if !state.store.update_document_content(&document).await? {
        return Err(ApiError::DocumentNotFound(id));
    }

    Ok(Json(document))
}

/// Delete a generated document
pub async fn delete_document(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    if !state.store.delete_document(&id).await? {
        return Err(ApiError::DocumentNotFound(id));
    }

    tracing::info!("Deleted document {}", id);
    Ok(StatusCode::NO_CONTENT)
}
