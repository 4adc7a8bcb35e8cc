use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use crate::models::PermitRecord;

static AMOUNT_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^-?\d+(\.\d+)?$").expect("Invalid amount regex"));

/// Date formats accepted for `issue_date`, tried in order after RFC 3339.
const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%m/%d/%Y",
    "%m/%d/%y",
    "%m-%d-%Y",
    "%B %d, %Y",
    "%b %d, %Y",
    "%d %B %Y",
    "%d %b %Y",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
];

/// Collapse runs of whitespace to single spaces and trim.
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Parse a currency string into a number.
///
/// Strips a leading currency symbol and grouping commas, then parses the
/// remainder as a float. Empty or unparsable strings are `None`, not zero.
pub fn parse_currency(text: &str) -> Option<f64> {
    let cleaned = text
        .trim()
        .trim_start_matches(['$', '€', '£'])
        .replace(',', "");
    let cleaned = cleaned.trim();
    if cleaned.is_empty() || !AMOUNT_REGEX.is_match(cleaned) {
        return None;
    }
    cleaned.parse().ok()
}

/// Parse a human-readable date string and re-serialize it as `YYYY-MM-DD`.
///
/// Unparsable input is returned unchanged rather than dropped, so the raw
/// value survives into the output for manual inspection.
pub fn parse_date(text: &str) -> Option<String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt.date_naive().format("%Y-%m-%d").to_string());
    }
    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(trimmed, format) {
            return Some(date.format("%Y-%m-%d").to_string());
        }
        if let Ok(dt) = chrono::NaiveDateTime::parse_from_str(trimmed, format) {
            return Some(dt.date().format("%Y-%m-%d").to_string());
        }
    }
    // Best effort: keep the original string instead of losing the value.
    Some(trimmed.to_string())
}

fn coerce_string(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => normalize_whitespace(s),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        _ => String::new(),
    }
}

fn coerce_value(value: Option<&Value>) -> Option<f64> {
    match value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => parse_currency(s),
        _ => None,
    }
}

fn coerce_date(value: Option<&Value>) -> Option<String> {
    match value {
        Some(Value::String(s)) => parse_date(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    }
}

/// Build a canonical [`PermitRecord`] from raw field values.
///
/// This never fails: malformed values fall back to their documented
/// defaults (empty string, or `None` for `issue_date`/`estimated_value`).
/// `hash_id` is always recomputed here; any value supplied upstream is
/// ignored.
pub fn normalize(fields: &HashMap<String, Value>, source_name: &str) -> PermitRecord {
    let mut record = PermitRecord {
        permit_number: coerce_string(fields.get("permit_number")),
        issue_date: coerce_date(fields.get("issue_date")),
        work_class: coerce_string(fields.get("work_class")),
        description: coerce_string(fields.get("description")),
        address: coerce_string(fields.get("address")),
        city: coerce_string(fields.get("city")),
        state: coerce_string(fields.get("state")),
        zip: coerce_string(fields.get("zip")),
        contractor: coerce_string(fields.get("contractor")),
        owner: coerce_string(fields.get("owner")),
        estimated_value: coerce_value(fields.get("estimated_value")),
        source_name: source_name.to_string(),
        hash_id: String::new(),
        scraped_at: Utc::now().to_rfc3339(),
    };
    record.hash_id = record.compute_hash();
    record
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn fields(pairs: &[(&str, Value)]) -> HashMap<String, Value> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn currency_with_symbol_and_grouping() {
        assert_eq!(parse_currency("$1,234.56"), Some(1234.56));
    }

    #[test]
    fn currency_empty_is_none() {
        assert_eq!(parse_currency(""), None);
        assert_eq!(parse_currency("   "), None);
    }

    #[test]
    fn currency_unparsable_is_none() {
        assert_eq!(parse_currency("N/A"), None);
        assert_eq!(parse_currency("$1,2x4"), None);
    }

    #[test]
    fn numeric_estimated_value_passes_through() {
        let rec = normalize(&fields(&[("estimated_value", json!(5000))]), "src");
        assert_eq!(rec.estimated_value, Some(5000.0));
    }

    #[test]
    fn string_estimated_value_is_parsed() {
        let rec = normalize(&fields(&[("estimated_value", json!("$1,234.56"))]), "src");
        assert_eq!(rec.estimated_value, Some(1234.56));
    }

    #[test]
    fn iso_date_round_trips() {
        assert_eq!(parse_date("2024-01-15"), Some("2024-01-15".to_string()));
    }

    #[test]
    fn long_form_date_is_normalized() {
        assert_eq!(parse_date("January 15, 2024"), Some("2024-01-15".to_string()));
        assert_eq!(parse_date("Jan 15, 2024"), Some("2024-01-15".to_string()));
    }

    #[test]
    fn us_slash_date_is_normalized() {
        assert_eq!(parse_date("01/15/2024"), Some("2024-01-15".to_string()));
    }

    #[test]
    fn timestamp_keeps_date_part() {
        assert_eq!(
            parse_date("2024-01-15T08:30:00"),
            Some("2024-01-15".to_string())
        );
    }

    #[test]
    fn unparsable_date_is_kept_verbatim() {
        assert_eq!(parse_date("pending review"), Some("pending review".to_string()));
    }

    #[test]
    fn empty_date_is_absent() {
        assert_eq!(parse_date(""), None);
        let rec = normalize(&fields(&[("issue_date", json!(""))]), "src");
        assert_eq!(rec.issue_date, None);
    }

    #[test]
    fn missing_fields_default_to_empty_strings() {
        let rec = normalize(&HashMap::new(), "TestSource");
        assert_eq!(rec.permit_number, "");
        assert_eq!(rec.address, "");
        assert_eq!(rec.city, "");
        assert_eq!(rec.issue_date, None);
        assert_eq!(rec.estimated_value, None);
        assert_eq!(rec.source_name, "TestSource");
    }

    #[test]
    fn null_fields_default_to_empty_strings() {
        let rec = normalize(&fields(&[("address", Value::Null)]), "src");
        assert_eq!(rec.address, "");
    }

    #[test]
    fn strings_are_whitespace_normalized() {
        let rec = normalize(&fields(&[("address", json!("  123   Main\n St "))]), "src");
        assert_eq!(rec.address, "123 Main St");
    }

    #[test]
    fn hash_is_set_and_ignores_upstream_value() {
        let rec = normalize(
            &fields(&[
                ("permit_number", json!("123")),
                ("address", json!("123 Main St")),
                ("hash_id", json!("bogus")),
            ]),
            "TestSource",
        );
        assert_eq!(rec.hash_id, rec.compute_hash());
        assert_ne!(rec.hash_id, "bogus");
    }

    #[test]
    fn scraped_at_is_set() {
        let rec = normalize(&HashMap::new(), "src");
        assert!(!rec.scraped_at.is_empty());
    }
}
