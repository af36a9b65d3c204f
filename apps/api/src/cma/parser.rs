//! Turns the model's completion text into a typed CMA result.
//!
//! Three steps: strip markdown fences the model sometimes adds anyway,
//! decode the JSON strictly, then convert the decoded value into
//! [`CmaResult`] permissively. The permissive step exists because the model
//! occasionally drops fields or emits numbers as strings; a partial result
//! still renders, with placeholders for whatever is missing. The untyped
//! value never leaves this module except as the verbatim `raw_json` that
//! gets persisted.

use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use thiserror::Error;

/// Raised when the completion cannot become a CMA result. `raw` always
/// holds the full completion text as received so the caller can log it.
#[derive(Debug, Error)]
#[error("CMA response could not be parsed ({reason})")]
pub struct ParseError {
    pub reason: &'static str,
    pub raw: String,
}

impl ParseError {
    fn invalid_json(raw: &str) -> Self {
        Self {
            reason: "invalid-json",
            raw: raw.to_string(),
        }
    }
}

/// A successfully parsed completion: the typed view plus the decoded JSON
/// exactly as the model produced it.
#[derive(Debug, Clone)]
pub struct ParsedCma {
    pub result: CmaResult,
    pub raw_json: Value,
}

/// Typed view of the model's response. Field names follow the Spanish wire
/// schema the system prompt demands; the Rust names are ours.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct CmaResult {
    #[serde(rename = "precio_minimo", default, deserialize_with = "flexible_decimal")]
    pub min_price: Option<Decimal>,
    #[serde(rename = "precio_sugerido", default, deserialize_with = "flexible_decimal")]
    pub suggested_price: Option<Decimal>,
    #[serde(rename = "precio_maximo", default, deserialize_with = "flexible_decimal")]
    pub max_price: Option<Decimal>,
    #[serde(rename = "ponderacion", default, deserialize_with = "lenient_entries")]
    pub weighting: Vec<WeightEntry>,
    #[serde(rename = "ajustes", default, deserialize_with = "lenient_entries")]
    pub adjustments: Vec<AdjustmentEntry>,
    #[serde(
        rename = "precio_m2_comparables",
        default,
        deserialize_with = "lenient_entries"
    )]
    pub price_per_area: Vec<PricePerAreaEntry>,
    #[serde(rename = "justificacion", default, deserialize_with = "lenient_string")]
    pub justification: String,
    #[serde(rename = "consideraciones", default, deserialize_with = "lenient_string")]
    pub considerations: String,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct WeightEntry {
    #[serde(default, deserialize_with = "flexible_int")]
    pub comparable: Option<i64>,
    #[serde(rename = "peso_pct", default, deserialize_with = "flexible_decimal")]
    pub weight_pct: Option<Decimal>,
    #[serde(rename = "razon", default, deserialize_with = "lenient_string")]
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct AdjustmentEntry {
    #[serde(default, deserialize_with = "flexible_int")]
    pub comparable: Option<i64>,
    #[serde(rename = "detalle", default, deserialize_with = "lenient_string")]
    pub detail: String,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct PricePerAreaEntry {
    #[serde(default, deserialize_with = "flexible_int")]
    pub comparable: Option<i64>,
    #[serde(rename = "precio_m2", default, deserialize_with = "flexible_decimal")]
    pub price_m2: Option<Decimal>,
}

/// Parses a raw completion. The price band is stored as the model produced
/// it: an inverted band or weights that do not sum to 100 are NOT rejected
/// here, the agent reviews the numbers in the report.
pub fn parse(raw: &str) -> Result<ParsedCma, ParseError> {
    let cleaned = strip_json_fences(raw);

    let raw_json: Value =
        serde_json::from_str(cleaned).map_err(|_| ParseError::invalid_json(raw))?;

    if !raw_json.is_object() {
        return Err(ParseError::invalid_json(raw));
    }

    let result: CmaResult =
        serde_json::from_value(raw_json.clone()).map_err(|_| ParseError::invalid_json(raw))?;

    Ok(ParsedCma { result, raw_json })
}

/// Strips ```json ... ``` or ``` ... ``` fences from a completion. Takes the
/// segment between the first fence pair; anything after the closing fence is
/// discarded.
fn strip_json_fences(text: &str) -> &str {
    let text = text.trim();
    let Some(after_open) = text.strip_prefix("```") else {
        return text;
    };
    let inner = after_open.split("```").next().unwrap_or(after_open);
    let inner = inner.strip_prefix("json").unwrap_or(inner);
    inner.trim()
}

fn flexible_decimal<'de, D>(deserializer: D) -> Result<Option<Decimal>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(decimal_from_value(&value))
}

fn decimal_from_value(value: &Value) -> Option<Decimal> {
    let text = match value {
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.trim().to_string(),
        _ => return None,
    };
    // from_str covers plain notation, from_scientific covers 1.35e5 style
    Decimal::from_str(&text)
        .or_else(|_| Decimal::from_scientific(&text))
        .ok()
}

fn flexible_int<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    let parsed = match &value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    };
    Ok(parsed)
}

fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::String(s) => s,
        _ => String::new(),
    })
}

/// Decodes a list field element by element, dropping entries that do not
/// decode. A non-array value decodes as an empty list.
fn lenient_entries<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: serde::de::DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    let Value::Array(items) = value else {
        return Ok(Vec::new());
    };
    Ok(items
        .into_iter()
        .filter_map(|item| serde_json::from_value(item).ok())
        .collect())
}
