use std::collections::HashMap;

use serde_json::json;
use tracing::warn;

use super::client::OdooExecutor;

/// Modules whose presence gates groups of indicators, plus the customization
/// marker consulted by the base-type classifier.
pub const PROBED_MODULES: &[&str] = &["account", "sale_management", "stock", "crm", "studio"];

/// Checks which optional modules are installed on the remote instance.
///
/// A remote error while probing one name degrades that entry to `false`
/// (capability absent) and never aborts the rest of the batch.
pub async fn probe_modules(
    session: &dyn OdooExecutor,
    names: &[&str],
) -> HashMap<String, bool> {
    let mut installed = HashMap::new();
    for name in names {
        let domain = json!([["name", "=", name], ["state", "=", "installed"]]);
        let present = match session.search_count("ir.module.module", domain).await {
            Ok(count) => count > 0,
            Err(e) => {
                warn!(module = name, error = %e, "module probe failed, treating as absent");
                false
            }
        };
        installed.insert(name.to_string(), present);
    }
    installed
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use async_trait::async_trait;
    use serde_json::Value;

    use super::*;
    use crate::odoo::OdooError;

    /// Answers module probes by name: listed names count as installed,
    /// failing names raise a remote fault.
    struct ModuleMock {
        installed: HashSet<&'static str>,
        failing: HashSet<&'static str>,
    }

    #[async_trait]
    impl OdooExecutor for ModuleMock {
        async fn execute_kw(
            &self,
            model: &str,
            method: &str,
            args: Value,
            _kwargs: Value,
        ) -> Result<Value, OdooError> {
            assert_eq!(model, "ir.module.module");
            assert_eq!(method, "search_count");
            // args is [domain], domain is [["name","=",name],["state","=","installed"]]
            let name = args[0][0][2].as_str().unwrap().to_string();
            if self.failing.contains(name.as_str()) {
                return Err(OdooError::Fault {
                    code: 2,
                    message: format!("access denied probing {}", name),
                });
            }
            let count = if self.installed.contains(name.as_str()) { 1 } else { 0 };
            Ok(serde_json::json!(count))
        }
    }

    #[tokio::test]
    async fn probe_reports_installed_and_missing_modules() {
        let mock = ModuleMock {
            installed: ["account", "stock"].into_iter().collect(),
            failing: HashSet::new(),
        };

        let modules = probe_modules(&mock, PROBED_MODULES).await;

        assert_eq!(modules.len(), PROBED_MODULES.len());
        assert_eq!(modules["account"], true);
        assert_eq!(modules["stock"], true);
        assert_eq!(modules["sale_management"], false);
        assert_eq!(modules["crm"], false);
        assert_eq!(modules["studio"], false);
    }

    #[tokio::test]
    async fn probe_error_degrades_one_entry_without_aborting_the_batch() {
        let mock = ModuleMock {
            installed: ["account", "crm"].into_iter().collect(),
            failing: ["sale_management"].into_iter().collect(),
        };

        let modules = probe_modules(&mock, PROBED_MODULES).await;

        // The failing name is present as absent, every later name still
        // got probed.
        assert_eq!(modules.len(), PROBED_MODULES.len());
        assert_eq!(modules["sale_management"], false);
        assert_eq!(modules["account"], true);
        assert_eq!(modules["crm"], true);
    }
}
