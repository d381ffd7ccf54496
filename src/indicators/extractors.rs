use std::collections::HashMap;

use chrono::{Duration, NaiveDate, NaiveDateTime};
use serde_json::{json, Value};
use tracing::warn;

use crate::odoo::{read_field, OdooError, OdooExecutor};

use super::format::{format_amount, format_inactive_users};
use super::{ExtractionContext, IndicatorKey};

/// Email domains of the firm's own staff. Used to classify hosting as
/// firm-managed and to keep staff accounts out of the inactive-user listing.
const INTERNAL_DOMAINS: &[&str] = &["prelium.fr", "prelium.com"];

/// Users with no login within this window count as inactive. A user who
/// never logged in at all is inactive by definition.
const INACTIVITY_DAYS: i64 = 90;

/// `Ok(Some(v))` stores `v`, `Ok(None)` omits the key for this run, and
/// `Err` is turned into the `"Erreur"` sentinel by the catalog loop.
pub type ExtractorResult = Result<Option<String>, OdooError>;

/// Dispatches one catalog entry to its extraction routine.
pub async fn extract(
    key: IndicatorKey,
    session: &dyn OdooExecutor,
    ctx: &ExtractionContext,
) -> ExtractorResult {
    match key {
        IndicatorKey::ServerVersion => Ok(Some(ctx.server_version.clone())),
        IndicatorKey::EndpointUrl => Ok(Some(ctx.url.clone())),
        IndicatorKey::DatabaseName => Ok(Some(ctx.db.clone())),
        IndicatorKey::HostingType => Ok(Some(hosting_type(ctx))),
        IndicatorKey::BaseType => base_type(session, ctx).await,
        IndicatorKey::InstalledApps => installed_apps(session).await,
        IndicatorKey::ActiveUsers => active_users(session).await,
        IndicatorKey::Companies => companies(session).await,
        IndicatorKey::ClosingDate => closing_date(session, ctx).await,
        IndicatorKey::MoveLinesCurrentYear => move_lines_current_year(session, ctx).await,
        IndicatorKey::ReceivablesOutstanding => outstanding_invoices(session, "out_invoice", false).await,
        IndicatorKey::PayablesOutstanding => outstanding_invoices(session, "in_invoice", true).await,
        IndicatorKey::RevenueYtd => revenue_ytd(session, ctx).await,
        IndicatorKey::ExpensesYtd => expenses_ytd(session, ctx).await,
        IndicatorKey::ProvisionalResult => provisional_result(session, ctx).await,
        IndicatorKey::DraftInvoices => draft_invoices(session).await,
        IndicatorKey::QuotesSent30d => quotes_sent_30d(session, ctx).await,
        IndicatorKey::Orders30d => orders_30d(session, ctx).await,
        IndicatorKey::LateDeliveries => late_deliveries(session, ctx).await,
        IndicatorKey::StockValue => stock_value(session).await,
        IndicatorKey::OutOfStockProducts => out_of_stock_products(session, ctx).await,
        IndicatorKey::OpenOpportunities => open_opportunities(session).await,
        IndicatorKey::DuplicateContacts => duplicate_contacts(session).await,
        IndicatorKey::InactiveUsers => inactive_users(session, ctx).await,
    }
}

/// Classifies hosting from the endpoint URL, flagging instances whose API
/// user belongs to the firm as firm-managed.
fn hosting_type(ctx: &ExtractionContext) -> String {
    let url = ctx.url.to_lowercase();
    let platform = if url.contains("odoo.sh") {
        "Odoo.sh"
    } else if url.contains("odoo.com") {
        "Odoo Online"
    } else {
        "On-premise / Partenaire"
    };
    let firm_managed = INTERNAL_DOMAINS
        .iter()
        .any(|d| ctx.api_user.to_lowercase().ends_with(&format!("@{}", d)));
    if firm_managed {
        format!("{} (géré)", platform)
    } else {
        platform.to_string()
    }
}

/// A customized base wins over the app-count rule; otherwise a single
/// installed application marks the free tier.
async fn base_type(session: &dyn OdooExecutor, ctx: &ExtractionContext) -> ExtractorResult {
    if ctx.module_installed("studio") {
        return Ok(Some("Personnalisée".to_string()));
    }
    let count = count_installed_apps(session).await?;
    let label = if count == 1 { "Gratuite" } else { "Standard" };
    Ok(Some(label.to_string()))
}

async fn count_installed_apps(session: &dyn OdooExecutor) -> Result<i64, OdooError> {
    session
        .search_count(
            "ir.module.module",
            json!([["application", "=", true], ["state", "=", "installed"]]),
        )
        .await
}

async fn installed_apps(session: &dyn OdooExecutor) -> ExtractorResult {
    let count = count_installed_apps(session).await?;
    Ok(Some(count.to_string()))
}

async fn active_users(session: &dyn OdooExecutor) -> ExtractorResult {
    let count = session
        .search_count(
            "res.users",
            json!([["share", "=", false], ["active", "=", true]]),
        )
        .await?;
    Ok(Some(count.to_string()))
}

async fn companies(session: &dyn OdooExecutor) -> ExtractorResult {
    let count = session.search_count("res.company", json!([])).await?;
    Ok(Some(count.to_string()))
}

/// Fiscal-year closing date, recombined as `DD/MM` from the two company
/// sub-fields. Either sub-field absent (Odoo sends `false`) means the
/// company never configured it: the key is omitted, which is neither an
/// error nor a capability gap.
async fn closing_date(session: &dyn OdooExecutor, ctx: &ExtractionContext) -> ExtractorResult {
    let records = session
        .read(
            "res.company",
            &[ctx.company_id],
            &["fiscalyear_last_day", "fiscalyear_last_month"],
        )
        .await?;
    let Some(record) = records.first() else {
        return Ok(None);
    };
    let day = read_field(record, "fiscalyear_last_day").as_i64();
    let month = read_field(record, "fiscalyear_last_month").as_i64();
    match (day, month) {
        (Some(day), Some(month)) => Ok(Some(format!("{:02}/{:02}", day, month))),
        _ => Ok(None),
    }
}

async fn move_lines_current_year(
    session: &dyn OdooExecutor,
    ctx: &ExtractionContext,
) -> ExtractorResult {
    let domain = json!([
        ["date", ">=", ctx.first_day_of_year],
        [ctx.fields.posted_state, "=", "posted"],
    ]);
    let count = session.search_count("account.move.line", domain).await?;
    Ok(Some(count.to_string()))
}

/// Open customer or supplier invoices, summed over the signed residual.
/// Supplier totals are reported as a positive amount.
async fn outstanding_invoices(
    session: &dyn OdooExecutor,
    move_type: &str,
    absolute: bool,
) -> ExtractorResult {
    let domain = json!([
        ["move_type", "=", move_type],
        ["state", "=", "posted"],
        ["payment_state", "!=", "paid"],
    ]);
    let groups = session
        .read_group(
            "account.move",
            domain,
            &["amount_residual_signed"],
            &["move_type"],
        )
        .await?;
    let total = groups
        .first()
        .and_then(|g| read_field(g, "amount_residual_signed").as_f64());
    match total {
        Some(total) => {
            let total = if absolute { total.abs() } else { total };
            Ok(Some(format_amount(total)))
        }
        None => Ok(Some("0.00".to_string())),
    }
}

/// Builds a journal-item domain restricted to posted entries in `[from, to]`
/// whose account code matches any of the given prefixes (logical OR).
fn account_prefix_domain(
    prefixes: &[&str],
    from: &str,
    to: &str,
    posted_state: &str,
) -> Value {
    let mut domain = vec![
        json!(["date", ">=", from]),
        json!(["date", "<=", to]),
        json!([posted_state, "=", "posted"]),
    ];
    for _ in 1..prefixes.len() {
        domain.push(json!("|"));
    }
    for prefix in prefixes {
        domain.push(json!(["account_id.code", "=like", format!("{}%", prefix)]));
    }
    Value::Array(domain)
}

async fn balance_sum(
    session: &dyn OdooExecutor,
    ctx: &ExtractionContext,
    prefixes: &[&str],
) -> Result<f64, OdooError> {
    let domain = account_prefix_domain(
        prefixes,
        &ctx.first_day_of_year,
        &ctx.today_str(),
        ctx.fields.posted_state,
    );
    let groups = session
        .read_group("account.move.line", domain, &["balance"], &[])
        .await?;
    Ok(groups
        .iter()
        .filter_map(|g| read_field(g, "balance").as_f64())
        .sum())
}

/// Year-to-date revenue over the sales account prefixes. Income accounts
/// carry credit balances, hence the sign flip.
async fn revenue_ytd(session: &dyn OdooExecutor, ctx: &ExtractionContext) -> ExtractorResult {
    let balance = balance_sum(session, ctx, &["70", "71", "72"]).await?;
    Ok(Some(format_amount(-balance)))
}

async fn expenses_ytd(session: &dyn OdooExecutor, ctx: &ExtractionContext) -> ExtractorResult {
    let balance = balance_sum(session, ctx, &["6"]).await?;
    Ok(Some(format_amount(balance)))
}

/// Provisional result for the calendar year to date:
/// `-(income balance) - (expense balance)` over the two disjoint groups.
async fn provisional_result(
    session: &dyn OdooExecutor,
    ctx: &ExtractionContext,
) -> ExtractorResult {
    let income = balance_sum(session, ctx, &["7"]).await?;
    let expense = balance_sum(session, ctx, &["6"]).await?;
    Ok(Some(format_amount(-income - expense)))
}

async fn draft_invoices(session: &dyn OdooExecutor) -> ExtractorResult {
    let domain = json!([["move_type", "=", "out_invoice"], ["state", "=", "draft"]]);
    let count = session.search_count("account.move", domain).await?;
    Ok(Some(count.to_string()))
}

async fn quotes_sent_30d(session: &dyn OdooExecutor, ctx: &ExtractionContext) -> ExtractorResult {
    let domain = json!([
        ["state", "=", "sent"],
        ["date_order", ">=", ctx.date_30_days_ago],
    ]);
    let count = session.search_count("sale.order", domain).await?;
    Ok(Some(count.to_string()))
}

async fn orders_30d(session: &dyn OdooExecutor, ctx: &ExtractionContext) -> ExtractorResult {
    let domain = json!([
        ["state", "in", ["sale", "done"]],
        ["date_order", ">=", ctx.date_30_days_ago],
    ]);
    let count = session.search_count("sale.order", domain).await?;
    Ok(Some(count.to_string()))
}

/// Outgoing pickings past their scheduled date. Historically this indicator
/// records `0` on failure instead of the error sentinel, and dashboard
/// consumers rely on that.
async fn late_deliveries(session: &dyn OdooExecutor, ctx: &ExtractionContext) -> ExtractorResult {
    let domain = json!([
        ["picking_type_code", "=", "outgoing"],
        ["state", "not in", ["done", "cancel"]],
        ["scheduled_date", "<", ctx.now_str()],
    ]);
    match session.search_count("stock.picking", domain).await {
        Ok(count) => Ok(Some(count.to_string())),
        Err(e) => {
            warn!(error = %e, "late-delivery count failed, recording 0");
            Ok(Some("0".to_string()))
        }
    }
}

async fn stock_value(session: &dyn OdooExecutor) -> ExtractorResult {
    let groups = session
        .read_group("stock.valuation.layer", json!([]), &["value"], &[])
        .await?;
    let total: f64 = groups
        .iter()
        .filter_map(|g| read_field(g, "value").as_f64())
        .sum();
    Ok(Some(format_amount(total)))
}

async fn out_of_stock_products(
    session: &dyn OdooExecutor,
    ctx: &ExtractionContext,
) -> ExtractorResult {
    let domain = json!([
        [ctx.fields.available_qty, "<=", 0],
        ["type", "=", "product"],
    ]);
    let count = session.search_count("product.product", domain).await?;
    Ok(Some(count.to_string()))
}

async fn open_opportunities(session: &dyn OdooExecutor) -> ExtractorResult {
    let domain = json!([
        ["type", "=", "opportunity"],
        ["active", "=", true],
        ["probability", "<", 100],
    ]);
    let count = session.search_count("crm.lead", domain).await?;
    Ok(Some(count.to_string()))
}

/// Duplicate-contact detection over the deduplication queue, tenant-wide.
///
/// Records sharing a group id are duplicates of each other, but a group
/// whose other members were already merged away keeps one surviving record:
/// only members of groups with more than one entry are counted.
async fn duplicate_contacts(session: &dyn OdooExecutor) -> ExtractorResult {
    let records = session
        .search_read("data_merge.record", json!([]), &["group_id"], json!({}))
        .await?;

    let mut group_sizes: HashMap<i64, i64> = HashMap::new();
    for record in &records {
        let group = read_field(record, "group_id")
            .as_pair()
            .map(|(id, _)| id)
            .or_else(|| read_field(record, "group_id").as_i64());
        if let Some(group) = group {
            *group_sizes.entry(group).or_insert(0) += 1;
        }
    }
    let duplicates: i64 = group_sizes.values().filter(|&&n| n > 1).sum();
    Ok(Some(duplicates.to_string()))
}

/// Internal users with no recent login, staff accounts excluded, rendered
/// as a count plus up to five sample logins.
async fn inactive_users(session: &dyn OdooExecutor, ctx: &ExtractionContext) -> ExtractorResult {
    let domain = json!([["share", "=", false], ["active", "=", true]]);
    let records = session
        .search_read("res.users", domain, &["login", "login_date"], json!({}))
        .await?;

    let threshold = ctx.today - Duration::days(INACTIVITY_DAYS);
    let mut inactive: Vec<String> = Vec::new();
    for record in &records {
        let Some(login) = read_field(record, "login").as_str() else {
            continue;
        };
        let login_lower = login.to_lowercase();
        if INTERNAL_DOMAINS
            .iter()
            .any(|d| login_lower.ends_with(&format!("@{}", d)))
        {
            continue;
        }
        let last_login = read_field(record, "login_date")
            .as_str()
            .and_then(parse_remote_date);
        // Never logged in counts as inactive.
        let is_inactive = match last_login {
            Some(date) => date < threshold,
            None => true,
        };
        if is_inactive {
            inactive.push(login.to_string());
        }
    }
    Ok(Some(format_inactive_users(&inactive)))
}

fn parse_remote_date(raw: &str) -> Option<NaiveDate> {
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
        .map(|dt| dt.date())
        .or_else(|_| NaiveDate::parse_from_str(raw, "%Y-%m-%d"))
        .ok()
}

#[cfg(test)]
mod tests {
    use std::collections::{HashMap, HashSet};
    use std::sync::Mutex;

    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};
    use serde_json::{json, Value};

    use super::*;
    use crate::indicators::{run_catalog, IndicatorKey, SENTINEL_ERROR, SENTINEL_NOT_APPLICABLE};
    use crate::odoo::OdooError;

    /// Programmable stand-in for an authenticated session. Responses are
    /// keyed by (model, method); unknown calls succeed with an empty result
    /// of the right shape, and listed models fail with a remote fault.
    #[derive(Default)]
    struct MockExecutor {
        responses: HashMap<(String, String), Value>,
        failing_models: HashSet<String>,
        calls: Mutex<Vec<(String, String)>>,
    }

    impl MockExecutor {
        fn respond(mut self, model: &str, method: &str, value: Value) -> Self {
            self.responses
                .insert((model.to_string(), method.to_string()), value);
            self
        }

        fn fail_model(mut self, model: &str) -> Self {
            self.failing_models.insert(model.to_string());
            self
        }

        fn called_models(&self) -> HashSet<String> {
            self.calls
                .lock()
                .unwrap()
                .iter()
                .map(|(m, _)| m.clone())
                .collect()
        }
    }

    #[async_trait]
    impl OdooExecutor for MockExecutor {
        async fn execute_kw(
            &self,
            model: &str,
            method: &str,
            _args: Value,
            _kwargs: Value,
        ) -> Result<Value, OdooError> {
            self.calls
                .lock()
                .unwrap()
                .push((model.to_string(), method.to_string()));
            if self.failing_models.contains(model) {
                return Err(OdooError::Fault {
                    code: 1,
                    message: format!("simulated fault on {}", model),
                });
            }
            if let Some(value) = self
                .responses
                .get(&(model.to_string(), method.to_string()))
            {
                return Ok(value.clone());
            }
            Ok(match method {
                "search_count" => json!(0),
                _ => json!([]),
            })
        }
    }

    fn ctx_with_modules(modules: &[(&str, bool)]) -> ExtractionContext {
        let modules = modules
            .iter()
            .map(|(name, on)| (name.to_string(), *on))
            .collect();
        ExtractionContext::new(
            "https://client.example.com".to_string(),
            "client_db".to_string(),
            "api@client.example.com".to_string(),
            "16.0".to_string(),
            1,
            modules,
            Utc.with_ymd_and_hms(2026, 8, 30, 12, 0, 0).unwrap(),
        )
    }

    fn full_ctx() -> ExtractionContext {
        ctx_with_modules(&[
            ("account", true),
            ("sale_management", true),
            ("stock", true),
            ("crm", true),
            ("studio", false),
        ])
    }

    fn values_by_key(results: Vec<(IndicatorKey, String)>) -> HashMap<&'static str, String> {
        results.into_iter().map(|(k, v)| (k.key(), v)).collect()
    }

    #[tokio::test]
    async fn failure_in_one_indicator_leaves_the_rest_intact() {
        let mock = MockExecutor::default().fail_model("sale.order");
        let ctx = full_ctx();

        let values = values_by_key(run_catalog(&mock, &ctx).await);

        assert_eq!(values["nb_devis_envoyes_30j"], SENTINEL_ERROR);
        assert_eq!(values["nb_commandes_30j"], SENTINEL_ERROR);
        for (key, value) in &values {
            if *key != "nb_devis_envoyes_30j" && *key != "nb_commandes_30j" {
                assert_ne!(value, SENTINEL_ERROR, "indicator {} was affected", key);
            }
        }
        assert_eq!(values["nb_societes"], "0");
        assert_eq!(values["total_fact_clients_attente_paiement"], "0.00");
    }

    #[tokio::test]
    async fn absent_stock_module_gates_without_remote_calls() {
        let mock = MockExecutor::default();
        let ctx = ctx_with_modules(&[
            ("account", true),
            ("sale_management", true),
            ("stock", false),
            ("crm", true),
        ]);

        let values = values_by_key(run_catalog(&mock, &ctx).await);

        for key in ["nb_livraisons_en_retard", "valeur_stock", "nb_produits_rupture"] {
            assert_eq!(values[key], SENTINEL_NOT_APPLICABLE);
        }
        let models = mock.called_models();
        assert!(!models.contains("stock.picking"));
        assert!(!models.contains("stock.valuation.layer"));
        assert!(!models.contains("product.product"));
    }

    #[tokio::test]
    async fn closing_date_recombines_day_and_month() {
        let mock = MockExecutor::default().respond(
            "res.company",
            "read",
            json!([{"id": 1, "fiscalyear_last_day": 31, "fiscalyear_last_month": 12}]),
        );
        let ctx = full_ctx();

        let value = extract(IndicatorKey::ClosingDate, &mock, &ctx).await.unwrap();
        assert_eq!(value.as_deref(), Some("31/12"));
    }

    #[tokio::test]
    async fn closing_date_with_false_day_is_omitted_not_an_error() {
        let mock = MockExecutor::default().respond(
            "res.company",
            "read",
            json!([{"id": 1, "fiscalyear_last_day": false, "fiscalyear_last_month": 12}]),
        );
        let ctx = full_ctx();

        let value = extract(IndicatorKey::ClosingDate, &mock, &ctx).await.unwrap();
        assert_eq!(value, None);

        let values = values_by_key(run_catalog(&mock, &ctx).await);
        assert!(!values.contains_key("date_cloture_annuelle"));
    }

    #[tokio::test]
    async fn single_member_duplicate_groups_are_not_duplicates() {
        let mock = MockExecutor::default().respond(
            "data_merge.record",
            "search_read",
            json!([
                {"id": 1, "group_id": [10, "groupe A"]},
                {"id": 2, "group_id": [10, "groupe A"]},
                {"id": 3, "group_id": [10, "groupe A"]},
                {"id": 4, "group_id": [11, "groupe B"]},
            ]),
        );
        let ctx = full_ctx();

        let value = extract(IndicatorKey::DuplicateContacts, &mock, &ctx)
            .await
            .unwrap();
        assert_eq!(value.as_deref(), Some("3"));
    }

    #[tokio::test]
    async fn inactive_users_redacts_staff_and_truncates() {
        let mock = MockExecutor::default().respond(
            "res.users",
            "search_read",
            json!([
                {"id": 1, "login": "u1@client.com", "login_date": false},
                {"id": 2, "login": "u2@client.com", "login_date": "2020-01-01 08:00:00"},
                {"id": 3, "login": "u3@client.com", "login_date": false},
                {"id": 4, "login": "u4@client.com", "login_date": "2019-06-15 08:00:00"},
                {"id": 5, "login": "u5@client.com", "login_date": false},
                {"id": 6, "login": "u6@client.com", "login_date": false},
                {"id": 7, "login": "staff@prelium.fr", "login_date": false},
                {"id": 8, "login": "recent@client.com", "login_date": "2026-08-29 08:00:00"},
            ]),
        );
        let ctx = full_ctx();

        let value = extract(IndicatorKey::InactiveUsers, &mock, &ctx)
            .await
            .unwrap()
            .unwrap();
        assert!(value.starts_with("6 inactif(s) :"), "got {}", value);
        assert!(value.ends_with("et 1 autre(s)..."), "got {}", value);
        assert!(!value.contains("prelium.fr"));
        assert!(!value.contains("recent@client.com"));
    }

    #[tokio::test]
    async fn late_deliveries_records_zero_on_failure() {
        let mock = MockExecutor::default().fail_model("stock.picking");
        let ctx = full_ctx();

        let value = extract(IndicatorKey::LateDeliveries, &mock, &ctx)
            .await
            .unwrap();
        assert_eq!(value.as_deref(), Some("0"));

        let values = values_by_key(run_catalog(&mock, &ctx).await);
        assert_eq!(values["nb_livraisons_en_retard"], "0");
    }

    #[tokio::test]
    async fn receivables_format_with_thousands_separators() {
        let mock = MockExecutor::default().respond(
            "account.move",
            "read_group",
            json!([{"move_type": "out_invoice", "amount_residual_signed": 1234567.891}]),
        );
        let ctx = full_ctx();

        let value = extract(IndicatorKey::ReceivablesOutstanding, &mock, &ctx)
            .await
            .unwrap();
        assert_eq!(value.as_deref(), Some("1,234,567.89"));
    }

    #[tokio::test]
    async fn base_type_prefers_customization_marker() {
        let mock = MockExecutor::default();
        let mut ctx = full_ctx();
        ctx.modules.insert("studio".to_string(), true);

        let value = extract(IndicatorKey::BaseType, &mock, &ctx).await.unwrap();
        assert_eq!(value.as_deref(), Some("Personnalisée"));

        // Without studio, a single installed app marks the free tier.
        let mock = MockExecutor::default().respond("ir.module.module", "search_count", json!(1));
        let ctx = full_ctx();
        let value = extract(IndicatorKey::BaseType, &mock, &ctx).await.unwrap();
        assert_eq!(value.as_deref(), Some("Gratuite"));
    }

    #[test]
    fn hosting_type_classification() {
        let mut ctx = full_ctx();
        ctx.url = "https://acme.odoo.com".to_string();
        assert_eq!(hosting_type(&ctx), "Odoo Online");

        ctx.url = "https://acme.odoo.sh".to_string();
        assert_eq!(hosting_type(&ctx), "Odoo.sh");

        ctx.url = "https://erp.acme.fr".to_string();
        assert_eq!(hosting_type(&ctx), "On-premise / Partenaire");

        ctx.api_user = "backoffice@prelium.fr".to_string();
        assert_eq!(hosting_type(&ctx), "On-premise / Partenaire (géré)");
    }

    #[test]
    fn or_domain_over_account_prefixes() {
        let domain = account_prefix_domain(&["70", "71", "72"], "2026-01-01", "2026-08-30", "parent_state");
        let items = domain.as_array().unwrap();
        // three AND criteria, two OR operators, three prefix criteria
        assert_eq!(items.len(), 8);
        assert_eq!(items[3], json!("|"));
        assert_eq!(items[4], json!("|"));
        assert_eq!(items[5], json!(["account_id.code", "=like", "70%"]));
    }
}
