use serde_json::json;
use tracing::{debug, warn};

use super::client::OdooExecutor;
use super::value::read_field;

/// Field on the firm-side partner record expected to hold the client's
/// endpoint URL, and the link to the assigned collaborator partner.
const CLIENT_URL_FIELD: &str = "x_odoo_database";
const COLLABORATOR_FIELD: &str = "x_collaborateur_1";

#[derive(Debug, Clone, PartialEq)]
pub struct CollaboratorRef {
    pub id: String,
    pub name: String,
}

impl Default for CollaboratorRef {
    fn default() -> Self {
        Self {
            id: "0".to_string(),
            name: "N/A".to_string(),
        }
    }
}

/// Looks up, on the firm's own Odoo, which collaborator is assigned to the
/// client identified by `client_url`. Every failure mode (no firm session,
/// empty lookup key, no matching partner, empty link field, remote error)
/// degrades to the neutral default rather than propagating.
pub async fn resolve_collaborator(
    firm: Option<&dyn OdooExecutor>,
    client_url: &str,
) -> CollaboratorRef {
    let Some(firm) = firm else {
        debug!("no firm session, collaborator attribution defaults");
        return CollaboratorRef::default();
    };
    if client_url.is_empty() {
        return CollaboratorRef::default();
    }

    match lookup(firm, client_url).await {
        Ok(Some(found)) => found,
        Ok(None) => CollaboratorRef::default(),
        Err(e) => {
            warn!(client_url, error = %e, "collaborator lookup failed");
            CollaboratorRef::default()
        }
    }
}

async fn lookup(
    firm: &dyn OdooExecutor,
    client_url: &str,
) -> Result<Option<CollaboratorRef>, super::client::OdooError> {
    let domain = json!([[CLIENT_URL_FIELD, "=", client_url]]);
    let partner_ids = firm
        .search("res.partner", domain, json!({ "limit": 1 }))
        .await?;
    let Some(partner_id) = partner_ids.first().copied() else {
        debug!(client_url, "no firm partner matches the client URL");
        return Ok(None);
    };

    let records = firm
        .read("res.partner", &[partner_id], &[COLLABORATOR_FIELD])
        .await?;
    let Some(record) = records.first() else {
        return Ok(None);
    };

    Ok(read_field(record, COLLABORATOR_FIELD)
        .as_pair()
        .map(|(id, name)| CollaboratorRef {
            id: id.to_string(),
            name: name.to_string(),
        }))
}

/// Lists firm-side partners considered collaborators, for the client admin
/// API to offer as assignment choices. Errors degrade to an empty list.
pub async fn list_firm_collaborators(firm: &dyn OdooExecutor) -> Vec<(String, String)> {
    let domain = json!([["partner_share", "=", false]]);
    let kwargs = json!({ "order": "name", "limit": 200 });
    match firm.search_read("res.partner", domain, &["name"], kwargs).await {
        Ok(records) => records
            .iter()
            .filter_map(|r| {
                let id = r.get("id")?.as_i64()?;
                let name = r.get("name")?.as_str()?;
                Some((id.to_string(), name.to_string()))
            })
            .collect(),
        Err(e) => {
            warn!(error = %e, "could not list firm collaborators");
            Vec::new()
        }
    }
}
