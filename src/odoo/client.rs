use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{debug, info};

/// One normalized error type for everything the remote side can do to us:
/// transport failures, protocol garbage, typed server faults, and rejected
/// credentials. No retry happens at this layer; a failed call is reported
/// upward immediately.
#[derive(Debug, Error)]
pub enum OdooError {
    #[error("transport error calling {url}: {message}")]
    Transport { url: String, message: String },
    #[error("malformed JSON-RPC response from {url}: {message}")]
    Protocol { url: String, message: String },
    #[error("Odoo fault {code}: {message}")]
    Fault { code: i64, message: String },
    #[error("authentication rejected for {user} on {db}@{url}")]
    AuthRejected {
        url: String,
        db: String,
        user: String,
    },
}

/// The remote call seam the capability prober, collaborator resolver, and
/// every indicator extractor run against. `OdooSession` is the production
/// implementation; tests substitute an in-memory mock.
#[async_trait]
pub trait OdooExecutor: Send + Sync {
    async fn execute_kw(
        &self,
        model: &str,
        method: &str,
        args: Value,
        kwargs: Value,
    ) -> Result<Value, OdooError>;

    async fn search_count(&self, model: &str, domain: Value) -> Result<i64, OdooError> {
        let result = self
            .execute_kw(model, "search_count", json!([domain]), json!({}))
            .await?;
        Ok(result.as_i64().unwrap_or(0))
    }

    async fn search(&self, model: &str, domain: Value, kwargs: Value) -> Result<Vec<i64>, OdooError> {
        let result = self.execute_kw(model, "search", json!([domain]), kwargs).await?;
        Ok(result
            .as_array()
            .map(|ids| ids.iter().filter_map(Value::as_i64).collect())
            .unwrap_or_default())
    }

    async fn read(&self, model: &str, ids: &[i64], fields: &[&str]) -> Result<Vec<Value>, OdooError> {
        let result = self
            .execute_kw(model, "read", json!([ids]), json!({ "fields": fields }))
            .await?;
        Ok(result.as_array().cloned().unwrap_or_default())
    }

    async fn search_read(
        &self,
        model: &str,
        domain: Value,
        fields: &[&str],
        kwargs: Value,
    ) -> Result<Vec<Value>, OdooError> {
        let mut kwargs = kwargs;
        kwargs["fields"] = json!(fields);
        let result = self
            .execute_kw(model, "search_read", json!([domain]), kwargs)
            .await?;
        Ok(result.as_array().cloned().unwrap_or_default())
    }

    async fn read_group(
        &self,
        model: &str,
        domain: Value,
        fields: &[&str],
        groupby: &[&str],
    ) -> Result<Vec<Value>, OdooError> {
        let result = self
            .execute_kw(
                model,
                "read_group",
                json!([domain, fields, groupby]),
                json!({ "lazy": false }),
            )
            .await?;
        Ok(result.as_array().cloned().unwrap_or_default())
    }
}

#[derive(Debug, Deserialize)]
struct JsonRpcResponse {
    result: Option<Value>,
    error: Option<JsonRpcError>,
}

#[derive(Debug, Deserialize)]
struct JsonRpcError {
    code: i64,
    message: String,
    data: Option<Value>,
}

/// Thin client over Odoo's `/jsonrpc` endpoint.
pub struct OdooClient {
    http: reqwest::Client,
}

impl OdooClient {
    pub fn new() -> Self {
        Self {
            http: reqwest::Client::new(),
        }
    }

    async fn call(&self, url: &str, service: &str, method: &str, args: Value) -> Result<Value, OdooError> {
        let endpoint = format!("{}/jsonrpc", url.trim_end_matches('/'));
        let body = json!({
            "jsonrpc": "2.0",
            "method": "call",
            "params": { "service": service, "method": method, "args": args },
            "id": 1,
        });
        debug!(url = %endpoint, service, method, "odoo rpc call");

        let response = self
            .http
            .post(&endpoint)
            .json(&body)
            .send()
            .await
            .map_err(|e| OdooError::Transport {
                url: url.to_string(),
                message: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(OdooError::Transport {
                url: url.to_string(),
                message: format!("HTTP {}", status),
            });
        }

        let envelope: JsonRpcResponse =
            response.json().await.map_err(|e| OdooError::Protocol {
                url: url.to_string(),
                message: e.to_string(),
            })?;

        if let Some(error) = envelope.error {
            // The server-side exception text usually lives in error.data.message.
            let message = error
                .data
                .as_ref()
                .and_then(|d| d.get("message"))
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or(error.message);
            return Err(OdooError::Fault {
                code: error.code,
                message,
            });
        }

        envelope.result.ok_or_else(|| OdooError::Protocol {
            url: url.to_string(),
            message: "response carries neither result nor error".to_string(),
        })
    }

    /// Version discovery, usable before authentication.
    pub async fn server_version(&self, url: &str) -> Result<String, OdooError> {
        let info = self.call(url, "common", "version", json!([])).await?;
        Ok(info
            .get("server_version")
            .and_then(Value::as_str)
            .unwrap_or("unknown")
            .to_string())
    }

    /// Opens an authenticated session: version discovery, then
    /// `common.authenticate`. A falsy uid means rejected credentials.
    pub async fn connect(
        &self,
        url: &str,
        db: &str,
        user: &str,
        secret: &str,
    ) -> Result<OdooSession, OdooError> {
        let server_version = self.server_version(url).await?;
        info!(url, version = %server_version, "connected to Odoo");

        let uid = self
            .call(url, "common", "authenticate", json!([db, user, secret, {}]))
            .await?;
        let uid = match uid.as_i64() {
            Some(uid) if uid > 0 => uid,
            _ => {
                return Err(OdooError::AuthRejected {
                    url: url.to_string(),
                    db: db.to_string(),
                    user: user.to_string(),
                })
            }
        };
        info!(user, uid, db, "Odoo authentication succeeded");

        Ok(OdooSession {
            http: self.http.clone(),
            url: url.to_string(),
            db: db.to_string(),
            uid,
            secret: secret.to_string(),
            server_version,
        })
    }
}

impl Default for OdooClient {
    fn default() -> Self {
        Self::new()
    }
}

/// An authenticated session against one Odoo instance. Holds the decrypted
/// secret in memory only for the lifetime of the remote calls.
pub struct OdooSession {
    http: reqwest::Client,
    pub url: String,
    pub db: String,
    pub uid: i64,
    secret: String,
    pub server_version: String,
}

#[async_trait]
impl OdooExecutor for OdooSession {
    async fn execute_kw(
        &self,
        model: &str,
        method: &str,
        args: Value,
        kwargs: Value,
    ) -> Result<Value, OdooError> {
        let client = OdooClient {
            http: self.http.clone(),
        };
        // execute_kw(db, uid, password, model, method, positional_args, kwargs)
        let call_args = vec![
            json!(self.db),
            json!(self.uid),
            json!(self.secret),
            json!(model),
            json!(method),
            args,
            kwargs,
        ];
        client
            .call(&self.url, "object", "execute_kw", Value::Array(call_args))
            .await
    }
}
