use bigdecimal::BigDecimal;
use serde::Serialize;
use serde_json::{Number, Value};
use std::collections::BTreeMap;
use std::str::FromStr;

use crate::error::RecorderError;

// DynamoDB number limits: 38 significant digits, magnitude 1E-130 to 9.9E+125.
const MAX_SIGNIFICANT_DIGITS: u64 = 38;
const MIN_EXPONENT: i64 = -130;
const MAX_EXPONENT: i64 = 125;

/// A payload value ready for the table: floats have already been turned
/// into exact decimals, everything else keeps its shape.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum StoredValue {
    Null,
    Bool(bool),
    Integer(Number),
    Decimal(BigDecimal),
    Text(String),
    List(Vec<StoredValue>),
    Map(BTreeMap<String, StoredValue>),
}

impl StoredValue {
    pub fn empty_map() -> Self {
        StoredValue::Map(BTreeMap::new())
    }

    #[allow(dead_code)]
    pub fn as_decimal(&self) -> Option<&BigDecimal> {
        match self {
            StoredValue::Decimal(value) => Some(value),
            _ => None,
        }
    }

    #[allow(dead_code)]
    pub fn get(&self, key: &str) -> Option<&StoredValue> {
        match self {
            StoredValue::Map(entries) => entries.get(key),
            _ => None,
        }
    }
}

pub fn normalize(value: &Value) -> Result<StoredValue, RecorderError> {
    match value {
        Value::Null => Ok(StoredValue::Null),
        Value::Bool(flag) => Ok(StoredValue::Bool(*flag)),
        Value::Number(number) => normalize_number(number),
        Value::String(text) => Ok(StoredValue::Text(text.clone())),
        Value::Array(items) => items
            .iter()
            .map(normalize)
            .collect::<Result<Vec<_>, _>>()
            .map(StoredValue::List),
        Value::Object(entries) => entries
            .iter()
            .map(|(key, item)| normalize(item).map(|stored| (key.clone(), stored)))
            .collect::<Result<BTreeMap<_, _>, _>>()
            .map(StoredValue::Map),
    }
}

fn normalize_number(number: &Number) -> Result<StoredValue, RecorderError> {
    if number.is_i64() || number.is_u64() {
        return Ok(StoredValue::Integer(number.clone()));
    }
    let float = number
        .as_f64()
        .ok_or_else(|| RecorderError::Normalization(format!("unsupported number {number}")))?;
    float_to_decimal(float).map(StoredValue::Decimal)
}

/// Parses the float's shortest round-trip text, so 0.1 stays 0.1 instead of
/// picking up the binary expansion. The result is exact; values the table
/// cannot hold are rejected rather than rounded.
pub fn float_to_decimal(value: f64) -> Result<BigDecimal, RecorderError> {
    if !value.is_finite() {
        return Err(RecorderError::Normalization(format!(
            "cannot store non-finite number {value}"
        )));
    }
    let text = value.to_string();
    let decimal = BigDecimal::from_str(&text).map_err(|err| {
        RecorderError::Normalization(format!("cannot convert {text} to decimal: {err}"))
    })?;
    if value != 0.0 {
        check_table_range(&decimal, value)?;
    }
    Ok(decimal)
}

fn check_table_range(decimal: &BigDecimal, value: f64) -> Result<(), RecorderError> {
    let trimmed = decimal.normalized();
    let digits = trimmed.digits();
    let (_, scale) = trimmed.as_bigint_and_exponent();
    // Exponent of the leading digit in scientific notation.
    let exponent = digits as i64 - scale - 1;

    if digits > MAX_SIGNIFICANT_DIGITS {
        return Err(RecorderError::Normalization(format!(
            "number {value:e} has {digits} significant digits, table allows {MAX_SIGNIFICANT_DIGITS}"
        )));
    }
    if !(MIN_EXPONENT..=MAX_EXPONENT).contains(&exponent) {
        return Err(RecorderError::Normalization(format!(
            "number {value:e} is outside the storable range 1e{MIN_EXPONENT}..1e{}",
            MAX_EXPONENT + 1
        )));
    }
    Ok(())
}
