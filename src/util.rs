// Utility helpers for parsing, coercion and loose value comparison.
//
// Rows arrive as loosely typed JSON values (from CSV files or a host query
// layer), so the rest of the crate leans on these helpers instead of matching
// on `serde_json::Value` everywhere.
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use num_format::{Locale, ToFormattedString};
use serde::{Deserialize, Deserializer};
use serde_json::{Number, Value};

/// Suffix marking identifier-like fields that never become chart series.
pub const IDENTIFIER_SUFFIX: &str = "_id";

pub fn is_identifier(field: &str) -> bool {
    field.ends_with(IDENTIFIER_SUFFIX)
}

/// Lenient decimal parse for cell text such as `" 1,250.5 "`. Anything with
/// letters in it, or that is not finite, is `None`.
pub fn parse_f64_safe(s: Option<&str>) -> Option<f64> {
    let s = s?.trim();
    if s.is_empty() {
        return None;
    }
    if s.chars().any(|c| c.is_ascii_alphabetic()) {
        return None;
    }
    let s = s.replace(',', "");
    s.parse::<f64>().ok().filter(|v| v.is_finite())
}

pub fn parse_i64_safe(s: Option<&str>) -> Option<i64> {
    let s = s?.trim();
    if s.is_empty() {
        return None;
    }
    s.parse::<i64>().ok()
}

/// Parse a date in `YYYY-MM-DD` form, or the date part of a timestamp.
pub fn parse_date_safe(s: Option<&str>) -> Option<NaiveDate> {
    let s = s?.trim();
    if s.is_empty() {
        return None;
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .or_else(|| parse_datetime_safe(Some(s)).map(|dt| dt.date()))
}

/// Parse a timestamp. Accepts `YYYY-MM-DD HH:MM:SS`, the `T`-separated
/// variant, RFC 3339, and bare dates (taken as midnight).
pub fn parse_datetime_safe(s: Option<&str>) -> Option<NaiveDateTime> {
    let s = s?.trim();
    if s.is_empty() {
        return None;
    }
    for fmt in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt);
        }
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_utc());
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

/// Interpret a row value as a timestamp, if it looks like one.
pub fn value_datetime(v: &Value) -> Option<NaiveDateTime> {
    match v {
        Value::String(s) => parse_datetime_safe(Some(s)),
        _ => None,
    }
}

/// Type a raw CSV cell: empty cells become null, integers and decimals
/// become numbers, everything else stays text.
pub fn cell_value(raw: &str) -> Value {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Value::Null;
    }
    if let Some(i) = parse_i64_safe(Some(trimmed)) {
        return Value::from(i);
    }
    // Only plain decimals; "1,234" style cells stay text so labels survive.
    if !trimmed.contains(',') {
        if let Some(f) = parse_f64_safe(Some(trimmed)) {
            return number_value(f);
        }
    }
    Value::String(trimmed.to_string())
}

/// Numeric reading of a value: numbers and numeric strings count, anything
/// else (null, booleans, text) does not.
pub fn as_number(v: &Value) -> Option<f64> {
    match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => {
            let s = s.trim();
            if s.is_empty() {
                None
            } else {
                s.parse::<f64>().ok().filter(|f| f.is_finite())
            }
        }
        _ => None,
    }
}

/// Build a JSON number, keeping integral values as integers so `5` does not
/// render as `5.0`.
pub fn number_value(n: f64) -> Value {
    if n.fract() == 0.0 && n.abs() < i64::MAX as f64 {
        Value::from(n as i64)
    } else {
        Number::from_f64(n).map(Value::Number).unwrap_or(Value::Null)
    }
}

/// Render a scalar as a display label.
pub fn value_label(v: &Value) -> String {
    match v {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        other => other.to_string(),
    }
}

/// Equality that tolerates numbers stored as text and vice versa.
pub fn loose_eq(a: &Value, b: &Value) -> bool {
    if a == b {
        return true;
    }
    match (as_number(a), as_number(b)) {
        (Some(x), Some(y)) => x == y,
        _ => !a.is_null() && !b.is_null() && value_label(a) == value_label(b),
    }
}

pub fn is_blank(v: Option<&Value>) -> bool {
    match v {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.trim().is_empty(),
        _ => false,
    }
}

/// Deserialize a loosely truthy flag: booleans, non-zero numbers and any
/// string other than `""`, `"0"` and `"false"`.
pub fn truthy<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let v = Option::<Value>::deserialize(deserializer)?;
    Ok(match v {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => b,
        Some(Value::Number(n)) => n.as_f64().map(|f| f != 0.0).unwrap_or(false),
        Some(Value::String(s)) => !matches!(s.trim(), "" | "0" | "false"),
        Some(Value::Array(a)) => !a.is_empty(),
        Some(Value::Object(o)) => !o.is_empty(),
    })
}

/// Deserialize a value that config files write either as `"6"` or `6`.
pub fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let v = Value::deserialize(deserializer)?;
    match v {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number, found {}",
            other
        ))),
    }
}

pub fn format_int<T>(n: T) -> String
where
    T: ToFormattedString,
{
    // Thin wrapper around `num-format` for counts in console messages
    // (e.g., `9,855 rows loaded`).
    n.to_formatted_string(&Locale::en)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn cells_are_typed() {
        assert_eq!(cell_value(""), Value::Null);
        assert_eq!(cell_value(" 42 "), json!(42));
        assert_eq!(cell_value("2.5"), json!(2.5));
        assert_eq!(cell_value("male"), json!("male"));
        assert_eq!(cell_value("2024-01-02"), json!("2024-01-02"));
    }

    #[test]
    fn numeric_reading_matches_loose_rules() {
        assert_eq!(as_number(&json!(3)), Some(3.0));
        assert_eq!(as_number(&json!("7")), Some(7.0));
        assert_eq!(as_number(&json!("abc")), None);
        assert_eq!(as_number(&json!(null)), None);
        assert_eq!(as_number(&json!(true)), None);
    }

    #[test]
    fn integral_numbers_stay_integers() {
        assert_eq!(number_value(5.0), json!(5));
        assert_eq!(number_value(2.5), json!(2.5));
    }

    #[test]
    fn loose_equality() {
        assert!(loose_eq(&json!(1), &json!("1")));
        assert!(loose_eq(&json!("male"), &json!("male")));
        assert!(!loose_eq(&json!(null), &json!("")));
    }

    #[test]
    fn timestamps_parse_in_common_shapes() {
        let expected = NaiveDate::from_ymd_opt(2024, 3, 1)
            .and_then(|d| d.and_hms_opt(10, 30, 0))
            .unwrap();
        assert_eq!(parse_datetime_safe(Some("2024-03-01 10:30:00")), Some(expected));
        assert_eq!(parse_datetime_safe(Some("2024-03-01T10:30:00")), Some(expected));
        assert_eq!(
            parse_date_safe(Some("2024-03-01 10:30:00")),
            NaiveDate::from_ymd_opt(2024, 3, 1)
        );
        assert_eq!(parse_datetime_safe(Some("")), None);
    }

    #[test]
    fn identifier_suffix() {
        assert!(is_identifier("user_id"));
        assert!(!is_identifier("count"));
    }
}
