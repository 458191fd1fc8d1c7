// src/table/coerce.rs

use serde_json::Value;

/// Trim whitespace + strip outer quotes if present.
pub fn clean_str(raw: &str) -> &str {
    let trimmed = raw.trim();
    if trimmed.len() >= 2 && trimmed.starts_with('"') && trimmed.ends_with('"') {
        &trimmed[1..trimmed.len() - 1]
    } else {
        trimmed
    }
}

/// Numeric coercion of an API value: numbers pass, numeric strings are
/// parsed, everything else (null, text, bools, non-finite) is missing.
pub fn coerce_value(v: &Value) -> Option<f64> {
    let n = match v {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => clean_str(s).parse::<f64>().ok()?,
        _ => return None,
    };
    n.is_finite().then_some(n)
}

/// Annual dates come back as `"2022"`.
pub fn parse_year(date: &str) -> Option<i32> {
    clean_str(date).parse().ok()
}
