//! Lenient field parsing for backend records.
//!
//! Backend feeds send money and quantities either as JSON numbers or as
//! strings (`"118.00"`), and occasionally as junk (`""`, `"N/A"`, `null`).
//! Everything that cannot be read as a non-negative number becomes zero so
//! that aggregation and display stay renderable. Text and id fields get the
//! same treatment: a value of the wrong JSON type is coerced or dropped, never
//! rejected.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::str::FromStr;

/// Parses a decimal, returning zero for anything unparseable or negative.
pub fn parse_decimal_or_zero(raw: &str) -> Decimal {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Decimal::ZERO;
    }
    Decimal::from_str(trimmed)
        .or_else(|_| Decimal::from_scientific(trimmed))
        .map(clamp_non_negative)
        .unwrap_or(Decimal::ZERO)
}

/// Parses a whole quantity, returning zero for anything unparseable or negative.
///
/// Fractional input such as `"3.0"` is truncated toward zero.
pub fn parse_quantity_or_zero(raw: &str) -> u64 {
    let trimmed = raw.trim();
    if let Ok(value) = trimmed.parse::<u64>() {
        return value;
    }
    let decimal = parse_decimal_or_zero(trimmed);
    decimal.trunc().to_u64().unwrap_or(0)
}

pub fn clamp_non_negative(value: Decimal) -> Decimal {
    if value.is_sign_negative() {
        Decimal::ZERO
    } else {
        value
    }
}

fn value_to_decimal(value: &Value) -> Option<Decimal> {
    match value {
        Value::Number(n) => Some(parse_decimal_or_zero(&n.to_string())),
        Value::String(s) => Some(parse_decimal_or_zero(s)),
        Value::Null => None,
        _ => Some(Decimal::ZERO),
    }
}

/// `deserialize_with` target for required decimal fields.
pub fn lenient_decimal<'de, D>(deserializer: D) -> Result<Decimal, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(value_to_decimal(&value).unwrap_or(Decimal::ZERO))
}

/// `deserialize_with` target for optional decimal fields; `null` stays `None`.
pub fn lenient_optional_decimal<'de, D>(deserializer: D) -> Result<Option<Decimal>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(value_to_decimal(&value))
}

/// `deserialize_with` target for quantities.
pub fn lenient_quantity<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Number(n) => n
            .as_u64()
            .unwrap_or_else(|| parse_quantity_or_zero(&n.to_string())),
        Value::String(s) => parse_quantity_or_zero(&s),
        _ => 0,
    })
}

fn value_to_text(value: Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

/// `deserialize_with` target for required text fields; `null` and non-scalar
/// values become `""`, numbers are stringified.
pub fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(value_to_text(value).unwrap_or_default())
}

/// `deserialize_with` target for optional text fields.
pub fn lenient_optional_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(value_to_text(value))
}

/// `deserialize_with` target for backend ids sent as numbers or numeric
/// strings. Anything else is `None`.
pub fn lenient_optional_id<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    })
}

/// `deserialize_with` target for optional nested records; a nested value that
/// does not fit `T` is dropped.
pub fn lenient_optional_record<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    if value.is_null() {
        return Ok(None);
    }
    Ok(serde_json::from_value(value).ok())
}

/// `deserialize_with` target for record lists. Elements that do not fit `T`
/// are skipped; a non-array value reads as an empty list.
pub fn lenient_list<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    Ok(records_from_value(value))
}

/// Reads every element of a JSON array that fits `T`, skipping the rest.
pub fn records_from_value<T: DeserializeOwned>(value: Value) -> Vec<T> {
    match value {
        Value::Array(elements) => {
            let total = elements.len();
            let records: Vec<T> = elements
                .into_iter()
                .filter_map(|element| serde_json::from_value(element).ok())
                .collect();
            let skipped = total - records.len();
            if skipped > 0 {
                tracing::warn!(skipped, total, "skipped unreadable records");
            }
            records
        }
        _ => Vec::new(),
    }
}
