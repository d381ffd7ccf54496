use axum::{extract::State, http::StatusCode, response::Json};
use chrono::Utc;
use sea_orm::{ActiveModelTrait, EntityTrait, Set};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::error;

use crate::database::entities::firm_config;
use crate::server::app::AppState;
use crate::services::{ExtractionService, RunError};

/// The firm configuration is a singleton; the admin surface always writes
/// row 1.
const SINGLETON_ID: i32 = 1;

#[derive(Deserialize)]
pub struct PutFirmConfigRequest {
    pub url: String,
    pub db_name: String,
    pub api_user: String,
    /// Plaintext API key; omitted or empty keeps the stored ciphertext.
    pub plain_api_key: Option<String>,
}

pub async fn get_firm_config(
    State(state): State<AppState>,
) -> Result<Json<Value>, StatusCode> {
    let config = firm_config::Entity::find_by_id(SINGLETON_ID)
        .one(&state.db)
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
        .ok_or(StatusCode::NOT_FOUND)?;

    Ok(Json(json!({
        "url": config.url,
        "db_name": config.db_name,
        "api_user": config.api_user,
        "api_key_set": !config.encrypted_api_key.is_empty(),
        "updated_at": config.updated_at,
    })))
}

pub async fn put_firm_config(
    State(state): State<AppState>,
    Json(payload): Json<PutFirmConfigRequest>,
) -> Result<Json<Value>, StatusCode> {
    let existing = firm_config::Entity::find_by_id(SINGLETON_ID)
        .one(&state.db)
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    let encrypted_api_key = match payload.plain_api_key.as_deref() {
        Some(plain) if !plain.is_empty() => state.cipher.encrypt(plain).map_err(|e| {
            error!(error = %e, "firm API key encryption failed");
            StatusCode::INTERNAL_SERVER_ERROR
        })?,
        _ => existing
            .as_ref()
            .map(|c| c.encrypted_api_key.clone())
            .unwrap_or_default(),
    };

    let now = Utc::now();
    match existing {
        Some(config) => {
            let mut config: firm_config::ActiveModel = config.into();
            config.url = Set(payload.url);
            config.db_name = Set(payload.db_name);
            config.api_user = Set(payload.api_user);
            config.encrypted_api_key = Set(encrypted_api_key);
            config.updated_at = Set(now);
            config
                .update(&state.db)
                .await
                .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
        }
        None => {
            let config = firm_config::ActiveModel {
                id: Set(SINGLETON_ID),
                url: Set(payload.url),
                db_name: Set(payload.db_name),
                api_user: Set(payload.api_user),
                encrypted_api_key: Set(encrypted_api_key),
                updated_at: Set(now),
            };
            config
                .insert(&state.db)
                .await
                .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
        }
    }

    Ok(Json(json!({ "status": "ok" })))
}

/// Firm-side collaborator choices for assignment screens. An unreachable
/// firm Odoo yields an empty list, not an error.
pub async fn list_collaborators(
    State(state): State<AppState>,
) -> Result<Json<Value>, StatusCode> {
    let service = ExtractionService::new(state.db.clone(), state.cipher.clone());
    match service.list_collaborator_choices().await {
        Ok(choices) => {
            let choices: Vec<Value> = choices
                .into_iter()
                .map(|(id, name)| json!({ "id": id, "name": name }))
                .collect();
            Ok(Json(json!({ "collaborators": choices })))
        }
        Err(RunError::MissingFirmConfig) => Err(StatusCode::NOT_FOUND),
        Err(e) => {
            error!(error = %e, "collaborator listing failed");
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}
