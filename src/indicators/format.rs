/// Formats a monetary amount with two decimals and thousands separators,
/// matching the `{:,.2f}` rendering the dashboard already consumes.
pub fn format_amount(amount: f64) -> String {
    let negative = amount < 0.0;
    let fixed = format!("{:.2}", amount.abs());
    let (int_part, dec_part) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));

    let mut grouped = String::new();
    let digits: Vec<char> = int_part.chars().collect();
    for (i, c) in digits.iter().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(*c);
    }

    let sign = if negative { "-" } else { "" };
    format!("{}{}.{}", sign, grouped, dec_part)
}

/// Renders the inactive-user indicator: a count plus up to five sample
/// logins, with an overflow counter for the rest.
pub fn format_inactive_users(logins: &[String]) -> String {
    if logins.is_empty() {
        return "0".to_string();
    }
    let sample: Vec<&str> = logins.iter().take(5).map(String::as_str).collect();
    let mut out = format!("{} inactif(s) : {}", logins.len(), sample.join(", "));
    if logins.len() > 5 {
        out.push_str(&format!(" et {} autre(s)...", logins.len() - 5));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn amounts_get_thousands_separators() {
        assert_eq!(format_amount(0.0), "0.00");
        assert_eq!(format_amount(1234.5), "1,234.50");
        assert_eq!(format_amount(1234567.891), "1,234,567.89");
        assert_eq!(format_amount(-9876543.2), "-9,876,543.20");
        assert_eq!(format_amount(999.999), "1,000.00");
    }

    #[test]
    fn inactive_user_listing_truncates_at_five() {
        assert_eq!(format_inactive_users(&[]), "0");

        let three: Vec<String> = ["a", "b", "c"].iter().map(|s| s.to_string()).collect();
        assert_eq!(format_inactive_users(&three), "3 inactif(s) : a, b, c");

        let six: Vec<String> = ["a", "b", "c", "d", "e", "f"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(
            format_inactive_users(&six),
            "6 inactif(s) : a, b, c, d, e et 1 autre(s)..."
        );
    }
}
