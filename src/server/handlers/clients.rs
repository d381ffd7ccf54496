use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use chrono::Utc;
use sea_orm::{ActiveModelTrait, EntityTrait, Set};
use serde::Deserialize;
use tracing::error;

use crate::database::entities::{clients, clients::Entity as Clients};
use crate::server::app::AppState;

#[derive(Deserialize)]
pub struct ClientRequest {
    pub name: String,
    pub url: String,
    pub db_name: String,
    pub api_user: String,
    /// Plaintext API key, encrypted before storage. On update, omitted or
    /// empty keeps the existing ciphertext.
    pub plain_api_key: Option<String>,
    #[serde(default)]
    pub is_premium_tier: bool,
    pub contact_email: Option<String>,
}

pub async fn list_clients(
    State(state): State<AppState>,
) -> Result<Json<Vec<clients::Model>>, StatusCode> {
    let clients = Clients::find()
        .all(&state.db)
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    Ok(Json(clients))
}

pub async fn create_client(
    State(state): State<AppState>,
    Json(payload): Json<ClientRequest>,
) -> Result<Json<clients::Model>, StatusCode> {
    let encrypted_api_key = encrypt_key(&state, payload.plain_api_key.as_deref())?
        .unwrap_or_default();

    let now = Utc::now();
    let client = clients::ActiveModel {
        name: Set(payload.name),
        url: Set(payload.url),
        db_name: Set(payload.db_name),
        api_user: Set(payload.api_user),
        encrypted_api_key: Set(encrypted_api_key),
        is_premium_tier: Set(payload.is_premium_tier),
        contact_email: Set(payload.contact_email),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };

    let client = client.insert(&state.db).await.map_err(|e| {
        error!(error = %e, "client creation failed");
        StatusCode::INTERNAL_SERVER_ERROR
    })?;

    Ok(Json(client))
}

pub async fn get_client(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<clients::Model>, StatusCode> {
    let client = Clients::find_by_id(id)
        .one(&state.db)
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
        .ok_or(StatusCode::NOT_FOUND)?;

    Ok(Json(client))
}

pub async fn update_client(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(payload): Json<ClientRequest>,
) -> Result<Json<clients::Model>, StatusCode> {
    let client = Clients::find_by_id(id)
        .one(&state.db)
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
        .ok_or(StatusCode::NOT_FOUND)?;

    let encrypted_api_key = match encrypt_key(&state, payload.plain_api_key.as_deref())? {
        Some(fresh) => fresh,
        None => client.encrypted_api_key.clone(),
    };

    let mut client: clients::ActiveModel = client.into();
    client.name = Set(payload.name);
    client.url = Set(payload.url);
    client.db_name = Set(payload.db_name);
    client.api_user = Set(payload.api_user);
    client.encrypted_api_key = Set(encrypted_api_key);
    client.is_premium_tier = Set(payload.is_premium_tier);
    client.contact_email = Set(payload.contact_email);
    client.updated_at = Set(Utc::now());

    let client = client
        .update(&state.db)
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    Ok(Json(client))
}

pub async fn delete_client(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<StatusCode, StatusCode> {
    let result = Clients::delete_by_id(id)
        .exec(&state.db)
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    if result.rows_affected == 0 {
        return Err(StatusCode::NOT_FOUND);
    }
    Ok(StatusCode::NO_CONTENT)
}

fn encrypt_key(state: &AppState, plain: Option<&str>) -> Result<Option<String>, StatusCode> {
    match plain {
        Some(plain) if !plain.is_empty() => {
            let encrypted = state.cipher.encrypt(plain).map_err(|e| {
                error!(error = %e, "API key encryption failed");
                StatusCode::INTERNAL_SERVER_ERROR
            })?;
            Ok(Some(encrypted))
        }
        _ => Ok(None),
    }
}
