//! Freelance CRM API Server
//!
//! Provides REST endpoints for:
//! - Template authoring (variables extracted on every save)
//! - Lead records
//! - Document generation from templates, and edits to generated documents

use anyhow::Result;
use axum::{
    routing::{get, post, put},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

mod error;
mod handlers;
mod models;
mod state;
mod store;
#[cfg(test)]
mod tests;

use state::AppState;

pub fn build_router(state: Arc<AppState>) -> Router {
    // CORS configuration for the dashboard
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Health check
        .route("/health", get(handlers::health))
        // Template endpoints
        .route("/api/templates", post(handlers::create_template))
        .route(
            "/api/templates/:id",
            get(handlers::get_template).put(handlers::update_template),
        )
        // Lead endpoints
        .route("/api/leads", post(handlers::create_lead))
        .route("/api/leads/:id", get(handlers::get_lead))
        .route(
            "/api/leads/:id/documents/:document_id",
            post(handlers::link_document),
        )
        // Generated documents
        .route("/api/documents/generate", post(handlers::generate_document))
        .route(
            "/api/documents/:id",
            get(handlers::get_document).delete(handlers::delete_document),
        )
        .route(
            "/api/documents/:id/content",
            put(handlers::update_document_content),
        )
        // Add middleware
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("crm_api=info".parse()?)
                .add_directive("crm_docgen=info".parse()?)
                .add_directive("tower_http=debug".parse()?),
        )
        .init();

    // Initialize application state
    info!("Initializing CRM API...");
    let mut state = AppState::new().await?;
    state.initialize().await?;
    let state = Arc::new(state);

    let app = build_router(state);

    // Parse bind address
    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(3002);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!("Starting CRM API on http://{}", addr);

    // Start server
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
