use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};
use serde::Serialize;
use thiserror::Error;
use tracing::{error, info, warn};

use crate::crypto::SecretCipher;
use crate::database::entities::{client_statuses, clients, firm_config, indicator_snapshots};
use crate::indicators::{run_catalog, ExtractionContext, IndicatorKey};
use crate::odoo::collaborator::{list_firm_collaborators, resolve_collaborator};
use crate::odoo::probe::{probe_modules, PROBED_MODULES};
use crate::odoo::{CollaboratorRef, OdooClient, OdooExecutor, OdooSession};

#[derive(Debug, Error)]
pub enum RunError {
    /// The only error that propagates to the trigger surface: without the
    /// firm configuration nothing can run.
    #[error("firm configuration not found; configure it via the admin API")]
    MissingFirmConfig,
    #[error("database error: {0}")]
    Database(#[from] sea_orm::DbErr),
}

#[derive(Debug, Default, Serialize)]
pub struct RunReport {
    pub run_timestamp: Option<DateTime<Utc>>,
    pub clients_processed: usize,
    pub clients_failed: usize,
    pub rows_written: usize,
    pub row_errors: usize,
}

/// Runs one full extraction pass over every configured client, strictly
/// sequentially. The firm session (for collaborator attribution) and the run
/// timestamp are the only state shared across clients.
pub struct ExtractionService {
    db: DatabaseConnection,
    cipher: SecretCipher,
}

impl ExtractionService {
    pub fn new(db: DatabaseConnection, cipher: SecretCipher) -> Self {
        Self { db, cipher }
    }

    pub async fn run(&self) -> Result<RunReport, RunError> {
        info!("starting indicator extraction run");

        let firm = firm_config::Entity::find()
            .one(&self.db)
            .await?
            .ok_or(RunError::MissingFirmConfig)?;

        let api = OdooClient::new();
        let firm_session = self.connect_firm(&api, &firm).await;

        // Captured once; every snapshot row of this run shares it.
        let run_timestamp = Utc::now();
        let mut report = RunReport {
            run_timestamp: Some(run_timestamp),
            ..Default::default()
        };

        let client_configs = clients::Entity::find()
            .order_by_asc(clients::Column::Name)
            .all(&self.db)
            .await?;
        if client_configs.is_empty() {
            info!("no client configured, nothing to extract");
            return Ok(report);
        }
        info!(clients = client_configs.len(), %run_timestamp, "processing clients");

        for client in &client_configs {
            self.process_client(&api, firm_session.as_ref(), client, run_timestamp, &mut report)
                .await?;
        }

        info!(
            processed = report.clients_processed,
            failed = report.clients_failed,
            rows = report.rows_written,
            "extraction run finished"
        );
        Ok(report)
    }

    /// Connects once to the firm's own Odoo. Failure only degrades
    /// collaborator attribution for the whole run, it never blocks
    /// indicator extraction.
    async fn connect_firm(&self, api: &OdooClient, firm: &firm_config::Model) -> Option<OdooSession> {
        let secret = match self.cipher.decrypt(&firm.encrypted_api_key) {
            Some(secret) if !secret.is_empty() => secret,
            Some(_) => {
                warn!("no firm API key configured, collaborator resolution disabled");
                return None;
            }
            None => {
                warn!("cannot decrypt the firm API key, collaborator resolution disabled");
                return None;
            }
        };
        match api.connect(&firm.url, &firm.db_name, &firm.api_user, &secret).await {
            Ok(session) => {
                info!(url = %firm.url, "connected to the firm Odoo");
                Some(session)
            }
            Err(e) => {
                warn!(url = %firm.url, error = %e, "firm connection failed, collaborator resolution disabled");
                None
            }
        }
    }

    async fn process_client(
        &self,
        api: &OdooClient,
        firm_session: Option<&OdooSession>,
        client: &clients::Model,
        run_timestamp: DateTime<Utc>,
        report: &mut RunReport,
    ) -> Result<(), RunError> {
        info!(client = %client.name, "processing client");
        let attempt_time = Utc::now();

        let secret = match self.cipher.decrypt(&client.encrypted_api_key) {
            Some(secret) if !secret.is_empty() => secret,
            Some(_) => {
                warn!(client = %client.name, "no API key configured, skipping");
                self.upsert_status(client.id, attempt_time, false, Some("Aucune clé API configurée."))
                    .await?;
                report.clients_failed += 1;
                return Ok(());
            }
            None => {
                warn!(client = %client.name, "cannot decrypt API key, skipping");
                self.upsert_status(
                    client.id,
                    attempt_time,
                    false,
                    Some("Impossible de déchiffrer la clé API."),
                )
                .await?;
                report.clients_failed += 1;
                return Ok(());
            }
        };

        // Gathered before authentication and saved even when auth fails.
        let mut preauth: Vec<(IndicatorKey, String)> = vec![
            (IndicatorKey::EndpointUrl, client.url.clone()),
            (IndicatorKey::DatabaseName, client.db_name.clone()),
        ];
        if let Ok(version) = api.server_version(&client.url).await {
            preauth.push((IndicatorKey::ServerVersion, version));
        }

        let session = match api
            .connect(&client.url, &client.db_name, &client.api_user, &secret)
            .await
        {
            Ok(session) => session,
            Err(e) => {
                warn!(client = %client.name, error = %e, "connection failed, skipping indicators");
                self.upsert_status(client.id, attempt_time, false, Some(&e.to_string()))
                    .await?;
                self.persist_rows(client, &preauth, &CollaboratorRef::default(), run_timestamp, report)
                    .await;
                report.clients_failed += 1;
                return Ok(());
            }
        };
        self.upsert_status(client.id, attempt_time, true, None).await?;

        let modules = probe_modules(&session, PROBED_MODULES).await;
        let firm_executor = firm_session.map(|s| s as &dyn OdooExecutor);
        let collaborator = resolve_collaborator(firm_executor, &client.url).await;
        info!(
            client = %client.name,
            collaborator_id = %collaborator.id,
            collaborator = %collaborator.name,
            "collaborator attribution resolved"
        );

        let company_id = self.fetch_company_id(&session).await;
        let ctx = ExtractionContext::new(
            client.url.clone(),
            client.db_name.clone(),
            client.api_user.clone(),
            session.server_version.clone(),
            company_id,
            modules,
            run_timestamp,
        );

        let values = run_catalog(&session, &ctx).await;
        self.persist_rows(client, &values, &collaborator, run_timestamp, report)
            .await;
        report.clients_processed += 1;
        Ok(())
    }

    /// Falls back to company 1 when the user record cannot be read.
    async fn fetch_company_id(&self, session: &OdooSession) -> i64 {
        let result = session
            .read("res.users", &[session.uid], &["company_id"])
            .await;
        match result {
            Ok(records) => records
                .first()
                .and_then(|r| crate::odoo::read_field(r, "company_id").as_pair())
                .map(|(id, _)| id)
                .unwrap_or(1),
            Err(e) => {
                warn!(error = %e, "cannot read company_id, defaulting to 1");
                1
            }
        }
    }

    /// ConnectionStatus is 1:1 per client and reflects only the most recent
    /// attempt, so this is an upsert, never an append.
    async fn upsert_status(
        &self,
        client_id: i32,
        attempt_time: DateTime<Utc>,
        successful: bool,
        error_message: Option<&str>,
    ) -> Result<(), sea_orm::DbErr> {
        let existing = client_statuses::Entity::find()
            .filter(client_statuses::Column::ClientId.eq(client_id))
            .one(&self.db)
            .await?;

        match existing {
            Some(status) => {
                let mut status: client_statuses::ActiveModel = status.into();
                status.last_connection_attempt = Set(attempt_time);
                status.connection_successful = Set(successful);
                status.last_error_message = Set(error_message.map(str::to_string));
                status.update(&self.db).await?;
            }
            None => {
                let status = client_statuses::ActiveModel {
                    client_id: Set(client_id),
                    last_connection_attempt: Set(attempt_time),
                    connection_successful: Set(successful),
                    last_error_message: Set(error_message.map(str::to_string)),
                    ..Default::default()
                };
                status.insert(&self.db).await?;
            }
        }
        Ok(())
    }

    /// Appends one snapshot row per extracted value. A row-level insert
    /// error is logged and counted but never aborts the client.
    async fn persist_rows(
        &self,
        client: &clients::Model,
        values: &[(IndicatorKey, String)],
        collaborator: &CollaboratorRef,
        run_timestamp: DateTime<Utc>,
        report: &mut RunReport,
    ) {
        for (key, value) in values {
            let row = indicator_snapshots::ActiveModel {
                client_id: Set(client.id),
                indicator_name: Set(key.key().to_string()),
                indicator_value: Set(value.clone()),
                extraction_timestamp: Set(run_timestamp),
                collaborator_id: Set(collaborator.id.clone()),
                collaborator_name: Set(collaborator.name.clone()),
                ..Default::default()
            };
            match indicator_snapshots::Entity::insert(row).exec(&self.db).await {
                Ok(_) => report.rows_written += 1,
                Err(e) => {
                    error!(client = %client.name, indicator = key.key(), error = %e, "snapshot insert failed");
                    report.row_errors += 1;
                }
            }
        }
    }

    /// Firm-side collaborator choices for the admin API. Mirrors the run
    /// path's degradation rules: any failure yields an empty list, except a
    /// missing firm configuration which is reported as such.
    pub async fn list_collaborator_choices(&self) -> Result<Vec<(String, String)>, RunError> {
        let firm = firm_config::Entity::find()
            .one(&self.db)
            .await?
            .ok_or(RunError::MissingFirmConfig)?;

        let api = OdooClient::new();
        let Some(session) = self.connect_firm(&api, &firm).await else {
            return Ok(Vec::new());
        };
        Ok(list_firm_collaborators(&session).await)
    }
}
