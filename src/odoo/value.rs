use serde_json::Value;

/// A field read from an Odoo record.
///
/// Odoo serializes "no value" as JSON `false`, which must never be confused
/// with a typed value. `Absent` covers a missing key, `null`, and `false`;
/// everything else is `Present`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldValue<'a> {
    Present(&'a Value),
    Absent,
}

pub fn read_field<'a>(record: &'a Value, name: &str) -> FieldValue<'a> {
    match record.get(name) {
        None | Some(Value::Null) | Some(Value::Bool(false)) => FieldValue::Absent,
        Some(v) => FieldValue::Present(v),
    }
}

impl<'a> FieldValue<'a> {
    pub fn is_present(&self) -> bool {
        matches!(self, FieldValue::Present(_))
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            FieldValue::Present(v) => v
                .as_i64()
                .or_else(|| v.as_str().and_then(|s| s.parse().ok())),
            FieldValue::Absent => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FieldValue::Present(v) => v.as_f64(),
            FieldValue::Absent => None,
        }
    }

    pub fn as_str(&self) -> Option<&'a str> {
        match self {
            FieldValue::Present(v) => v.as_str(),
            FieldValue::Absent => None,
        }
    }

    /// Decodes a many2one field, serialized by Odoo as `[id, display_name]`.
    pub fn as_pair(&self) -> Option<(i64, &'a str)> {
        match self {
            FieldValue::Present(Value::Array(items)) if items.len() >= 2 => {
                let id = items[0].as_i64()?;
                let name = items[1].as_str()?;
                Some((id, name))
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn false_and_missing_are_absent() {
        let record = json!({"a": false, "b": null, "c": 3});
        assert_eq!(read_field(&record, "a"), FieldValue::Absent);
        assert_eq!(read_field(&record, "b"), FieldValue::Absent);
        assert_eq!(read_field(&record, "missing"), FieldValue::Absent);
        assert!(read_field(&record, "c").is_present());
    }

    #[test]
    fn numeric_fields_parse_from_strings_too() {
        // fiscalyear_last_day comes back as a string on some server versions
        let record = json!({"day": "31", "month": 12});
        assert_eq!(read_field(&record, "day").as_i64(), Some(31));
        assert_eq!(read_field(&record, "month").as_i64(), Some(12));
    }

    #[test]
    fn many2one_pair_decodes() {
        let record = json!({"company_id": [7, "Ma Société"], "bad": [1]});
        assert_eq!(
            read_field(&record, "company_id").as_pair(),
            Some((7, "Ma Société"))
        );
        assert_eq!(read_field(&record, "bad").as_pair(), None);
    }
}
