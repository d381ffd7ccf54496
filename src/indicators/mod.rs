pub mod context;
pub mod extractors;
pub mod fields;
pub mod format;

use tracing::{debug, warn};

use crate::odoo::OdooExecutor;

pub use context::ExtractionContext;

/// Stored for an indicator whose gating module is not installed.
pub const SENTINEL_NOT_APPLICABLE: &str = "N/A";
/// Stored for an indicator whose extraction raised.
pub const SENTINEL_ERROR: &str = "Erreur";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndicatorCategory {
    Connection,
    Platform,
    Accounting,
    Sales,
    Stock,
    Crm,
    Contacts,
    Users,
}

/// The catalog of indicators, one variant per stored metric key.
///
/// Keys are the string contract the dashboard consumes and stay as the
/// original French names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndicatorKey {
    ServerVersion,
    EndpointUrl,
    DatabaseName,
    HostingType,
    BaseType,
    InstalledApps,
    ActiveUsers,
    Companies,
    ClosingDate,
    MoveLinesCurrentYear,
    ReceivablesOutstanding,
    PayablesOutstanding,
    RevenueYtd,
    ExpensesYtd,
    ProvisionalResult,
    DraftInvoices,
    QuotesSent30d,
    Orders30d,
    LateDeliveries,
    StockValue,
    OutOfStockProducts,
    OpenOpportunities,
    DuplicateContacts,
    InactiveUsers,
}

impl IndicatorKey {
    /// Catalog order, which is also persistence order within a run.
    pub const ALL: &'static [IndicatorKey] = &[
        IndicatorKey::ServerVersion,
        IndicatorKey::EndpointUrl,
        IndicatorKey::DatabaseName,
        IndicatorKey::HostingType,
        IndicatorKey::BaseType,
        IndicatorKey::InstalledApps,
        IndicatorKey::ActiveUsers,
        IndicatorKey::Companies,
        IndicatorKey::ClosingDate,
        IndicatorKey::MoveLinesCurrentYear,
        IndicatorKey::ReceivablesOutstanding,
        IndicatorKey::PayablesOutstanding,
        IndicatorKey::RevenueYtd,
        IndicatorKey::ExpensesYtd,
        IndicatorKey::ProvisionalResult,
        IndicatorKey::DraftInvoices,
        IndicatorKey::QuotesSent30d,
        IndicatorKey::Orders30d,
        IndicatorKey::LateDeliveries,
        IndicatorKey::StockValue,
        IndicatorKey::OutOfStockProducts,
        IndicatorKey::OpenOpportunities,
        IndicatorKey::DuplicateContacts,
        IndicatorKey::InactiveUsers,
    ];

    pub fn key(&self) -> &'static str {
        match self {
            IndicatorKey::ServerVersion => "version_odoo",
            IndicatorKey::EndpointUrl => "url_odoo",
            IndicatorKey::DatabaseName => "base_de_donnees",
            IndicatorKey::HostingType => "type_hebergement",
            IndicatorKey::BaseType => "type_base",
            IndicatorKey::InstalledApps => "nb_applications_installees",
            IndicatorKey::ActiveUsers => "nb_utilisateurs_actifs",
            IndicatorKey::Companies => "nb_societes",
            IndicatorKey::ClosingDate => "date_cloture_annuelle",
            IndicatorKey::MoveLinesCurrentYear => "nb_lignes_ecritures_annee_courante",
            IndicatorKey::ReceivablesOutstanding => "total_fact_clients_attente_paiement",
            IndicatorKey::PayablesOutstanding => "total_fact_fourn_attente_paiement",
            IndicatorKey::RevenueYtd => "ca_annee_courante",
            IndicatorKey::ExpensesYtd => "charges_annee_courante",
            IndicatorKey::ProvisionalResult => "resultat_provisoire",
            IndicatorKey::DraftInvoices => "nb_factures_brouillon",
            IndicatorKey::QuotesSent30d => "nb_devis_envoyes_30j",
            IndicatorKey::Orders30d => "nb_commandes_30j",
            IndicatorKey::LateDeliveries => "nb_livraisons_en_retard",
            IndicatorKey::StockValue => "valeur_stock",
            IndicatorKey::OutOfStockProducts => "nb_produits_rupture",
            IndicatorKey::OpenOpportunities => "nb_opportunites_ouvertes",
            IndicatorKey::DuplicateContacts => "nb_contacts_dupliques",
            IndicatorKey::InactiveUsers => "utilisateurs_inactifs",
        }
    }

    pub fn category(&self) -> IndicatorCategory {
        match self {
            IndicatorKey::ServerVersion | IndicatorKey::EndpointUrl | IndicatorKey::DatabaseName => {
                IndicatorCategory::Connection
            }
            IndicatorKey::HostingType
            | IndicatorKey::BaseType
            | IndicatorKey::InstalledApps
            | IndicatorKey::Companies => IndicatorCategory::Platform,
            IndicatorKey::ClosingDate
            | IndicatorKey::MoveLinesCurrentYear
            | IndicatorKey::ReceivablesOutstanding
            | IndicatorKey::PayablesOutstanding
            | IndicatorKey::RevenueYtd
            | IndicatorKey::ExpensesYtd
            | IndicatorKey::ProvisionalResult
            | IndicatorKey::DraftInvoices => IndicatorCategory::Accounting,
            IndicatorKey::QuotesSent30d | IndicatorKey::Orders30d => IndicatorCategory::Sales,
            IndicatorKey::LateDeliveries
            | IndicatorKey::StockValue
            | IndicatorKey::OutOfStockProducts => IndicatorCategory::Stock,
            IndicatorKey::OpenOpportunities => IndicatorCategory::Crm,
            IndicatorKey::DuplicateContacts => IndicatorCategory::Contacts,
            IndicatorKey::ActiveUsers | IndicatorKey::InactiveUsers => IndicatorCategory::Users,
        }
    }

    /// Module whose absence turns this indicator into `"N/A"` without any
    /// remote call being attempted.
    pub fn required_module(&self) -> Option<&'static str> {
        match self {
            IndicatorKey::MoveLinesCurrentYear
            | IndicatorKey::ReceivablesOutstanding
            | IndicatorKey::PayablesOutstanding
            | IndicatorKey::RevenueYtd
            | IndicatorKey::ExpensesYtd
            | IndicatorKey::ProvisionalResult
            | IndicatorKey::DraftInvoices => Some("account"),
            IndicatorKey::QuotesSent30d | IndicatorKey::Orders30d => Some("sale_management"),
            IndicatorKey::LateDeliveries
            | IndicatorKey::StockValue
            | IndicatorKey::OutOfStockProducts => Some("stock"),
            IndicatorKey::OpenOpportunities => Some("crm"),
            _ => None,
        }
    }
}

/// Runs the whole catalog against one client session.
///
/// Each indicator is evaluated in isolation: a gated indicator whose module
/// is absent stores `"N/A"` without a remote call, an extraction error stores
/// `"Erreur"`, and an extractor returning `None` omits the key from the run
/// entirely. No indicator's failure affects any other indicator.
pub async fn run_catalog(
    session: &dyn OdooExecutor,
    ctx: &ExtractionContext,
) -> Vec<(IndicatorKey, String)> {
    let mut values = Vec::new();
    for key in IndicatorKey::ALL {
        if let Some(module) = key.required_module() {
            if !ctx.module_installed(module) {
                debug!(indicator = key.key(), module, "module absent, storing N/A");
                values.push((*key, SENTINEL_NOT_APPLICABLE.to_string()));
                continue;
            }
        }
        match extractors::extract(*key, session, ctx).await {
            Ok(Some(value)) => {
                debug!(indicator = key.key(), value = %value, "extracted");
                values.push((*key, value));
            }
            Ok(None) => {
                debug!(indicator = key.key(), "no value for this run, key omitted");
            }
            Err(e) => {
                warn!(indicator = key.key(), error = %e, "extraction failed");
                values.push((*key, SENTINEL_ERROR.to_string()));
            }
        }
    }
    values
}
