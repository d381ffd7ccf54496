use std::collections::{BTreeMap, HashMap, HashSet};

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::Json,
};
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, QueryOrder};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::database::entities::{clients, indicator_snapshots};
use crate::server::app::AppState;

const CLOSING_DATE_KEY: &str = "date_cloture_annuelle";

#[derive(Deserialize)]
pub struct LatestQuery {
    /// Exact collaborator display name.
    pub collaborator: Option<String>,
    /// `DD/MM` closing date; keeps only clients whose closing-date
    /// indicator equals it in the latest run.
    pub closing_date: Option<String>,
}

/// Rows of the latest run (the shared extraction timestamp is the join
/// key), grouped per client, with the dashboard's two filters.
pub async fn latest_snapshot(
    State(state): State<AppState>,
    Query(query): Query<LatestQuery>,
) -> Result<Json<Value>, StatusCode> {
    let latest = indicator_snapshots::Entity::find()
        .order_by_desc(indicator_snapshots::Column::ExtractionTimestamp)
        .one(&state.db)
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    let Some(latest) = latest else {
        return Ok(Json(json!({ "run_timestamp": null, "clients": [] })));
    };
    let run_timestamp = latest.extraction_timestamp;

    let mut rows = indicator_snapshots::Entity::find()
        .filter(indicator_snapshots::Column::ExtractionTimestamp.eq(run_timestamp))
        .all(&state.db)
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    if let Some(collaborator) = &query.collaborator {
        rows.retain(|r| &r.collaborator_name == collaborator);
    }
    if let Some(closing_date) = &query.closing_date {
        let matching: HashSet<i32> = rows
            .iter()
            .filter(|r| r.indicator_name == CLOSING_DATE_KEY && &r.indicator_value == closing_date)
            .map(|r| r.client_id)
            .collect();
        rows.retain(|r| matching.contains(&r.client_id));
    }

    let names: HashMap<i32, String> = clients::Entity::find()
        .all(&state.db)
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
        .into_iter()
        .map(|c| (c.id, c.name))
        .collect();

    // BTreeMap keeps the per-client grouping stable in the response.
    let mut grouped: BTreeMap<i32, Vec<indicator_snapshots::Model>> = BTreeMap::new();
    for row in rows {
        grouped.entry(row.client_id).or_default().push(row);
    }

    let clients_json: Vec<Value> = grouped
        .into_iter()
        .map(|(client_id, rows)| {
            let collaborator_name = rows
                .first()
                .map(|r| r.collaborator_name.clone())
                .unwrap_or_default();
            let indicators: BTreeMap<String, String> = rows
                .into_iter()
                .map(|r| (r.indicator_name, r.indicator_value))
                .collect();
            json!({
                "client_id": client_id,
                "client_name": names.get(&client_id).cloned().unwrap_or_default(),
                "collaborator_name": collaborator_name,
                "indicators": indicators,
            })
        })
        .collect();

    Ok(Json(json!({
        "run_timestamp": run_timestamp,
        "clients": clients_json,
    })))
}
