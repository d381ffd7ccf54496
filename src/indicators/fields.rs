/// Remote field names that were renamed across Odoo server versions.
///
/// The same conceptual field lives under different names depending on the
/// server: the posted-state filter on journal items moved from the related
/// `move_id.state` to the stored `parent_state`, and product availability is
/// read from a different computed field on old servers.
#[derive(Debug, PartialEq)]
pub struct FieldMap {
    /// Filter field selecting posted journal items on `account.move.line`.
    pub posted_state: &'static str,
    /// Availability field on `product.product` for the stock-out count.
    pub available_qty: &'static str,
}

const DEFAULT: FieldMap = FieldMap {
    posted_state: "parent_state",
    available_qty: "qty_available",
};

const LEGACY: FieldMap = FieldMap {
    posted_state: "move_id.state",
    available_qty: "virtual_available",
};

/// Resolves the field map for a server version string ("16.0", "12.0+e",
/// "saas~17.2"...). Unrecognized versions fall back to the default entry.
pub fn resolve_fields(server_version: &str) -> &'static FieldMap {
    match normalize_version(server_version).as_str() {
        "11.0" | "12.0" => &LEGACY,
        _ => &DEFAULT,
    }
}

/// Reduces a server version to its `major.minor` form, stripping the
/// `saas~` prefix and any edition suffix.
pub fn normalize_version(server_version: &str) -> String {
    let trimmed = server_version
        .trim()
        .trim_start_matches("saas~")
        .split('+')
        .next()
        .unwrap_or("");
    let mut parts = trimmed.split('.');
    match (parts.next(), parts.next()) {
        (Some(major), Some(minor)) if !major.is_empty() => format!("{}.{}", major, minor),
        (Some(major), None) if !major.is_empty() => format!("{}.0", major),
        _ => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_versions_resolve() {
        assert_eq!(resolve_fields("12.0").posted_state, "move_id.state");
        assert_eq!(resolve_fields("12.0+e").available_qty, "virtual_available");
        assert_eq!(resolve_fields("16.0").posted_state, "parent_state");
        assert_eq!(resolve_fields("17.0").available_qty, "qty_available");
    }

    #[test]
    fn unknown_versions_fall_back_to_default() {
        for v in ["", "unknown", "99.9", "saas~17.2"] {
            assert_eq!(resolve_fields(v), &DEFAULT);
        }
    }

    #[test]
    fn version_normalization() {
        assert_eq!(normalize_version("16.0"), "16.0");
        assert_eq!(normalize_version("12.0+e"), "12.0");
        assert_eq!(normalize_version("saas~17.2"), "17.2");
        assert_eq!(normalize_version("14.0.1.2"), "14.0");
        assert_eq!(normalize_version(""), "");
    }
}
