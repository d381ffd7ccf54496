use std::collections::HashMap;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};
use serde::Serialize;

use crate::database::entities::{client_statuses, clients};
use crate::server::app::AppState;

#[derive(Serialize)]
pub struct StatusResponse {
    pub client_id: i32,
    pub client_name: String,
    pub last_connection_attempt: String,
    pub connection_successful: bool,
    pub last_error_message: Option<String>,
}

fn to_response(status: client_statuses::Model, client_name: String) -> StatusResponse {
    StatusResponse {
        client_id: status.client_id,
        client_name,
        last_connection_attempt: status.last_connection_attempt.to_rfc3339(),
        connection_successful: status.connection_successful,
        last_error_message: status.last_error_message,
    }
}

pub async fn list_statuses(
    State(state): State<AppState>,
) -> Result<Json<Vec<StatusResponse>>, StatusCode> {
    let statuses = client_statuses::Entity::find()
        .all(&state.db)
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
    let names: HashMap<i32, String> = clients::Entity::find()
        .all(&state.db)
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
        .into_iter()
        .map(|c| (c.id, c.name))
        .collect();

    let response = statuses
        .into_iter()
        .map(|s| {
            let name = names.get(&s.client_id).cloned().unwrap_or_default();
            to_response(s, name)
        })
        .collect();
    Ok(Json(response))
}

pub async fn get_client_status(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<StatusResponse>, StatusCode> {
    let client = clients::Entity::find_by_id(id)
        .one(&state.db)
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
        .ok_or(StatusCode::NOT_FOUND)?;

    let status = client_statuses::Entity::find()
        .filter(client_statuses::Column::ClientId.eq(id))
        .one(&state.db)
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
        .ok_or(StatusCode::NOT_FOUND)?;

    Ok(Json(to_response(status, client.name)))
}
