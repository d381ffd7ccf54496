use axum::{
    routing::{delete, get, post, put},
    Router,
};
use sea_orm::DatabaseConnection;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use anyhow::Result;

use crate::crypto::SecretCipher;
use super::handlers::{clients, extraction, firm_config, health, snapshots, statuses};

#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub cipher: SecretCipher,
    pub scheduler_token: Option<String>,
}

pub async fn create_app(
    db: DatabaseConnection,
    cors_origin: Option<&str>,
    cipher: SecretCipher,
    scheduler_token: Option<String>,
) -> Result<Router> {
    let state = AppState {
        db,
        cipher,
        scheduler_token,
    };

    let cors = match cors_origin {
        Some(origin) => CorsLayer::new()
            .allow_origin(origin.parse::<axum::http::HeaderValue>()?)
            .allow_methods(Any)
            .allow_headers(Any),
        None => CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any),
    };

    let app = Router::new()
        .route("/health", get(health::health_check))
        .nest("/api/v1", api_v1_routes())
        .layer(ServiceBuilder::new().layer(cors))
        .with_state(state);

    Ok(app)
}

fn api_v1_routes() -> Router<AppState> {
    Router::new()
        // Extraction trigger (interactive or scheduler-gated)
        .route("/extractions/run", post(extraction::run_extraction))

        // Firm configuration (singleton)
        .route("/firm-config", get(firm_config::get_firm_config))
        .route("/firm-config", put(firm_config::put_firm_config))
        .route("/firm-config/collaborators", get(firm_config::list_collaborators))

        // Client configuration
        .route("/clients", get(clients::list_clients))
        .route("/clients", post(clients::create_client))
        .route("/clients/:id", get(clients::get_client))
        .route("/clients/:id", put(clients::update_client))
        .route("/clients/:id", delete(clients::delete_client))

        // Connection supervision
        .route("/clients/:id/status", get(statuses::get_client_status))
        .route("/statuses", get(statuses::list_statuses))

        // Dashboard read path
        .route("/snapshots/latest", get(snapshots::latest_snapshot))
}
