//! Router tests against an in-memory SQLite database

use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
    Router,
};
use crm_docgen::{DocgenConfig, DocumentStore};
use http_body_util::BodyExt;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

use crate::build_router;
use crate::state::AppState;

async fn test_state() -> Arc<AppState> {
    let mut state = AppState::connect("sqlite::memory:", DocgenConfig::default())
        .await
        .unwrap();
    assert!(state.initialize().await.unwrap());
    Arc::new(state)
}

async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let request = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => request
            .header("content-type", "application/json")
            .body(Body::from(body.to_string())),
        None => request.body(Body::empty()),
    }
    .unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|_| {
            Value::String(String::from_utf8_lossy(&bytes).into_owned())
        })
    };
    (status, value)
}

async fn seed(app: &Router, content: &str) -> (String, String) {
    let (status, template) = send(
        app,
        Method::POST,
        "/api/templates",
        Some(json!({
            "title": "Web Design Contract",
            "content": content,
            "category": "contract"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, lead) = send(
        app,
        Method::POST,
        "/api/leads",
        Some(json!({
            "firstName": "Jane",
            "lastName": "Doe",
            "totalBudget": 1500,
            "lastContactedAt": "2024-03-15T12:00:00Z"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    (
        template["id"].as_str().unwrap().to_string(),
        lead["id"].as_str().unwrap().to_string(),
    )
}

#[tokio::test]
async fn test_initialize_runs_once() {
    let mut state = AppState::connect("sqlite::memory:", DocgenConfig::default())
        .await
        .unwrap();
    assert!(!state.is_initialized());
    assert!(state.initialize().await.unwrap());
    assert!(!state.initialize().await.unwrap());
    assert!(state.is_initialized());
}

#[tokio::test]
async fn test_health() {
    let app = build_router(test_state().await);
    let (status, body) = send(&app, Method::GET, "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, Value::String("OK".to_string()));
}

#[tokio::test]
async fn test_template_save_extracts_variables() {
    let app = build_router(test_state().await);
    let (status, template) = send(
        &app,
        Method::POST,
        "/api/templates",
        Some(json!({
            "title": "Proposal",
            "content": "For {{fullName}} at {{ billingAddress }}",
            "category": "proposal"
        })),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(template["isTemplate"], json!(true));
    assert_eq!(template["category"], json!("proposal"));
    assert_eq!(
        template["variables"],
        json!(["billingAddress", "fullName", "paidAmount", "remainingBalance"])
    );
    assert_eq!(
        template["insertableTags"],
        json!([
            "{{billingAddress}}",
            "{{fullName}}",
            "{{paidAmount}}",
            "{{remainingBalance}}"
        ])
    );
}

#[tokio::test]
async fn test_template_requires_title() {
    let app = build_router(test_state().await);
    let (status, body) = send(
        &app,
        Method::POST,
        "/api/templates",
        Some(json!({ "title": " ", "content": "{{fullName}}" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["status"], json!(400));
}

#[tokio::test]
async fn test_generate_document_end_to_end() {
    let app = build_router(test_state().await);
    let (template_id, lead_id) = seed(
        &app,
        "Hello {{fullName}}, total due {{totalBudget}}, seen {{lastContactedAt}}",
    )
    .await;

    let (status, generated) = send(
        &app,
        Method::POST,
        "/api/documents/generate",
        Some(json!({
            "templateId": template_id,
            "leadId": lead_id,
            "timezone": "UTC"
        })),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(
        generated["content"],
        json!("Hello Jane Doe, total due $1,500.00, seen March 15, 2024")
    );
    assert_eq!(generated["title"], json!("Web Design Contract - Jane Doe"));
    assert_eq!(generated["linked"], json!(true));

    let document_id = generated["id"].as_str().unwrap();
    let (status, lead) = send(&app, Method::GET, &format!("/api/leads/{}", lead_id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(lead["documents"], json!([document_id]));

    let (status, document) = send(
        &app,
        Method::GET,
        &format!("/api/documents/{}", document_id),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(document["isTemplate"], json!(false));
    assert_eq!(document["category"], json!("contract"));
    assert_eq!(document["leadId"], json!(lead_id));
}

#[tokio::test]
async fn test_generate_unknown_template_is_404() {
    let app = build_router(test_state().await);
    let (_, lead_id) = seed(&app, "{{fullName}}").await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/documents/generate",
        Some(json!({ "templateId": "missing", "leadId": lead_id })),
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], json!("Template not found: missing"));
}

#[tokio::test]
async fn test_generate_unknown_lead_is_404() {
    let app = build_router(test_state().await);
    let (template_id, _) = seed(&app, "{{fullName}}").await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/documents/generate",
        Some(json!({ "templateId": template_id, "leadId": "ghost" })),
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], json!("Lead not found: ghost"));
}

#[tokio::test]
async fn test_template_edit_does_not_change_generated_snapshot() {
    let app = build_router(test_state().await);
    let (template_id, lead_id) = seed(&app, "{{fullName}}").await;

    let (_, generated) = send(
        &app,
        Method::POST,
        "/api/documents/generate",
        Some(json!({ "templateId": template_id, "leadId": lead_id })),
    )
    .await;

    let (status, edited) = send(
        &app,
        Method::PUT,
        &format!("/api/templates/{}", template_id),
        Some(json!({
            "title": "Web Design Contract",
            "content": "{{fullName}} {{businessEmail}}",
            "category": "contract"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(edited["variables"]
        .as_array()
        .unwrap()
        .contains(&json!("businessEmail")));

    let (_, document) = send(
        &app,
        Method::GET,
        &format!("/api/documents/{}", generated["id"].as_str().unwrap()),
        None,
    )
    .await;
    assert_eq!(
        document["variables"],
        json!(["fullName", "paidAmount", "remainingBalance"])
    );
}

#[tokio::test]
async fn test_edit_and_delete_document() {
    let state = test_state().await;
    let app = build_router(state.clone());
    let (template_id, lead_id) = seed(&app, "{{fullName}}").await;

    let (_, generated) = send(
        &app,
        Method::POST,
        "/api/documents/generate",
        Some(json!({ "templateId": template_id, "leadId": lead_id })),
    )
    .await;
    let document_id = generated["id"].as_str().unwrap().to_string();

    let (status, edited) = send(
        &app,
        Method::PUT,
        &format!("/api/documents/{}/content", document_id),
        Some(json!({ "content": "Amended terms" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(edited["content"], json!("Amended terms"));

    let (status, _) = send(
        &app,
        Method::DELETE,
        &format!("/api/documents/{}", document_id),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = send(
        &app,
        Method::GET,
        &format!("/api/documents/{}", document_id),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // Deletion does not touch the lead's association list
    let lead = state.store.load_lead(&lead_id).await.unwrap().unwrap();
    assert_eq!(lead.documents, vec![document_id]);
}

#[tokio::test]
async fn test_link_retry_is_idempotent() {
    let state = test_state().await;
    let app = build_router(state.clone());
    let (template_id, lead_id) = seed(&app, "{{fullName}}").await;

    let (_, generated) = send(
        &app,
        Method::POST,
        "/api/documents/generate",
        Some(json!({ "templateId": template_id, "leadId": lead_id })),
    )
    .await;
    let document_id = generated["id"].as_str().unwrap().to_string();

    let uri = format!("/api/leads/{}/documents/{}", lead_id, document_id);
    let (status, body) = send(&app, Method::POST, &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["linked"], json!(true));

    let lead = state.store.load_lead(&lead_id).await.unwrap().unwrap();
    assert_eq!(lead.documents, vec![document_id]);
}

#[tokio::test]
async fn test_unlinked_document_is_multi_status_and_can_be_relinked() {
    let state = test_state().await;
    let app = build_router(state.clone());
    let (template_id, lead_id) = seed(&app, "Dear {{fullName}}").await;

    // Reject association writes only; lead reads and document inserts work
    sqlx::query(
        "CREATE TRIGGER reject_links BEFORE INSERT ON lead_documents \
         BEGIN SELECT RAISE(ABORT, 'associations offline'); END",
    )
    .execute(&state.db)
    .await
    .unwrap();

    let (status, generated) = send(
        &app,
        Method::POST,
        "/api/documents/generate",
        Some(json!({ "templateId": template_id, "leadId": lead_id })),
    )
    .await;

    assert_eq!(status, StatusCode::MULTI_STATUS);
    assert_eq!(generated["linked"], json!(false));
    assert_eq!(generated["content"], json!("Dear Jane Doe"));
    assert!(generated["warning"].as_str().unwrap().contains("not linked"));
    let document_id = generated["id"].as_str().unwrap().to_string();

    let (status, _) = send(
        &app,
        Method::GET,
        &format!("/api/documents/{}", document_id),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    sqlx::query("DROP TRIGGER reject_links")
        .execute(&state.db)
        .await
        .unwrap();

    let uri = format!("/api/leads/{}/documents/{}", lead_id, document_id);
    let (status, body) = send(&app, Method::POST, &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["linked"], json!(true));

    let (_, lead) = send(&app, Method::GET, &format!("/api/leads/{}", lead_id), None).await;
    assert_eq!(lead["documents"], json!([document_id]));
}

#[tokio::test]
async fn test_link_unknown_document_is_404() {
    let app = build_router(test_state().await);
    let (_, lead_id) = seed(&app, "{{fullName}}").await;

    let (status, _) = send(
        &app,
        Method::POST,
        &format!("/api/leads/{}/documents/nope", lead_id),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_lead_with_dirty_data_still_generates() {
    let app = build_router(test_state().await);
    let (status, template) = send(
        &app,
        Method::POST,
        "/api/templates",
        Some(json!({
            "title": "Invoice",
            "content": "{{totalBudget}} | {{createdAt}} | {{billingAddress}} | {{preferredContact}}",
            "category": "invoice"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let template_id = template["id"].clone();

    let (status, lead) = send(
        &app,
        Method::POST,
        "/api/leads",
        Some(json!({
            "id": "dirty-1",
            "firstName": "Sam",
            "totalBudget": "n/a",
            "createdAt": "yesterday",
            "billingAddress": {}
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(lead["id"], json!("dirty-1"));

    let (status, generated) = send(
        &app,
        Method::POST,
        "/api/documents/generate",
        Some(json!({ "templateId": template_id, "leadId": "dirty-1" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    // createdAt was unparseable, so the lead was stamped at creation time
    let content = generated["content"].as_str().unwrap();
    assert!(content.starts_with("$0.00 | "));
    assert!(content.ends_with(" | [No Address Provided] | N/A"));
}
