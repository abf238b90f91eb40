use aws_sdk_dynamodb::types::AttributeValue;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Number, Value};
use std::collections::HashMap;

use crate::error::RecorderError;
use crate::normalize::{normalize, StoredValue};

pub const UNKNOWN_DEVICE: &str = "unknown";
const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6f";

/// One telemetry sample as written to the table, keyed by
/// (`device_id`, `timestamp`).
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TelemetryRecord {
    pub device_id: String,
    pub timestamp: String,
    pub machine_details: StoredValue,
    pub engine_rpm: StoredValue,
    pub engine_temp: StoredValue,
    pub oil_pressure: StoredValue,
    pub battery_monitor: StoredValue,
    pub location: StoredValue,
    pub mpu6050: StoredValue,
    pub gnss: StoredValue,
    pub on_off_time: StoredValue,
}

impl TelemetryRecord {
    pub fn from_event(event: &Value, now: DateTime<Utc>) -> Result<Self, RecorderError> {
        let payload = event.as_object().ok_or_else(|| {
            RecorderError::Validation("event payload must be a JSON object".to_string())
        })?;

        let device_id = match payload.get("device_id") {
            None | Some(Value::Null) => return Err(RecorderError::missing_field("device_id")),
            Some(Value::String(id)) => id.clone(),
            Some(_) => {
                return Err(RecorderError::Validation(
                    "Field device_id must be a string".to_string(),
                ))
            }
        };

        // Null and absent both mean "stamp with processing time".
        let timestamp = match payload.get("timestamp") {
            None | Some(Value::Null) => default_timestamp(now),
            Some(Value::String(ts)) => ts.clone(),
            Some(_) => {
                return Err(RecorderError::Validation(
                    "Field timestamp must be a string".to_string(),
                ))
            }
        };

        let text = || StoredValue::Text(String::new());
        let zero = || StoredValue::Integer(Number::from(0));

        Ok(Self {
            device_id,
            timestamp,
            machine_details: field(payload, "machine_details", text)?,
            engine_rpm: field(payload, "engine_rpm", zero)?,
            engine_temp: field(payload, "engine_temp", zero)?,
            oil_pressure: field(payload, "oil_pressure", zero)?,
            battery_monitor: field(payload, "battery_monitor", zero)?,
            location: field(payload, "location", StoredValue::empty_map)?,
            mpu6050: field(payload, "mpu6050", StoredValue::empty_map)?,
            gnss: field(payload, "gnss", StoredValue::empty_map)?,
            on_off_time: field(payload, "on_off_time", text)?,
        })
    }

    pub fn to_attributes(&self) -> HashMap<String, AttributeValue> {
        HashMap::from([
            ("device_id".to_string(), AttributeValue::S(self.device_id.clone())),
            ("timestamp".to_string(), AttributeValue::S(self.timestamp.clone())),
            ("machine_details".to_string(), to_attribute(&self.machine_details)),
            ("engine_rpm".to_string(), to_attribute(&self.engine_rpm)),
            ("engine_temp".to_string(), to_attribute(&self.engine_temp)),
            ("oil_pressure".to_string(), to_attribute(&self.oil_pressure)),
            ("battery_monitor".to_string(), to_attribute(&self.battery_monitor)),
            ("location".to_string(), to_attribute(&self.location)),
            ("mpu6050".to_string(), to_attribute(&self.mpu6050)),
            ("gnss".to_string(), to_attribute(&self.gnss)),
            ("on_off_time".to_string(), to_attribute(&self.on_off_time)),
        ])
    }
}

/// Best-effort device id for failure responses: whatever the event carried,
/// even when it failed validation.
pub fn device_id_hint(event: &Value) -> Value {
    match event.get("device_id") {
        None | Some(Value::Null) => Value::from(UNKNOWN_DEVICE),
        Some(raw) => raw.clone(),
    }
}

pub fn default_timestamp(now: DateTime<Utc>) -> String {
    now.naive_utc().format(TIMESTAMP_FORMAT).to_string()
}

fn field(
    payload: &Map<String, Value>,
    key: &str,
    default: impl Fn() -> StoredValue,
) -> Result<StoredValue, RecorderError> {
    match payload.get(key) {
        Some(value) => normalize(value),
        None => Ok(default()),
    }
}

fn to_attribute(value: &StoredValue) -> AttributeValue {
    match value {
        StoredValue::Null => AttributeValue::Null(true),
        StoredValue::Bool(flag) => AttributeValue::Bool(*flag),
        StoredValue::Integer(number) => AttributeValue::N(number.to_string()),
        StoredValue::Decimal(decimal) => AttributeValue::N(decimal.to_string()),
        StoredValue::Text(text) => AttributeValue::S(text.clone()),
        StoredValue::List(items) => AttributeValue::L(items.iter().map(to_attribute).collect()),
        StoredValue::Map(entries) => AttributeValue::M(
            entries
                .iter()
                .map(|(key, item)| (key.clone(), to_attribute(item)))
                .collect(),
        ),
    }
}
