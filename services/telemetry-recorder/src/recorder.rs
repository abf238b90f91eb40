use chrono::Utc;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

use crate::error::RecorderError;
use crate::models::{FailureBody, RecorderResponse, StoredBody};
use crate::record::{device_id_hint, TelemetryRecord, UNKNOWN_DEVICE};
use crate::store::TelemetryStore;

pub const STORED_MESSAGE: &str = "Data stored successfully";

#[derive(Clone)]
pub struct Recorder {
    store: Arc<dyn TelemetryStore>,
}

impl Recorder {
    pub fn new(store: Arc<dyn TelemetryStore>) -> Self {
        Self { store }
    }

    /// Validates, normalizes and upserts one event. Never fails: every error
    /// is logged and folded into a 500 response.
    pub async fn handle(&self, event: Value) -> RecorderResponse {
        tracing::info!(event = %pretty(&event), "received telemetry event");

        match self.record(&event).await {
            Ok(record) => {
                tracing::info!(
                    device_id = %record.device_id,
                    timestamp = %record.timestamp,
                    store = %self.store.describe(),
                    "stored telemetry record"
                );
                respond(
                    200,
                    &StoredBody {
                        message: STORED_MESSAGE.to_string(),
                        device_id: record.device_id,
                        timestamp: record.timestamp,
                    },
                )
            }
            Err(err) => failure(&err, device_id_hint(&event)),
        }
    }

    /// Same as [`Recorder::handle`] for a raw body; unparsable JSON becomes
    /// a 500 with an unknown device.
    pub async fn handle_bytes(&self, raw: &[u8]) -> RecorderResponse {
        match serde_json::from_slice::<Value>(raw) {
            Ok(event) => self.handle(event).await,
            Err(err) => {
                let err = RecorderError::Validation(format!("Malformed event payload: {err}"));
                failure(&err, Value::from(UNKNOWN_DEVICE))
            }
        }
    }

    async fn record(&self, event: &Value) -> Result<TelemetryRecord, RecorderError> {
        let record = TelemetryRecord::from_event(event, Utc::now())?;
        tracing::info!(record = %pretty(&record), "writing telemetry record");
        self.store.put_record(&record).await?;
        Ok(record)
    }
}

fn failure(err: &RecorderError, device_id: Value) -> RecorderResponse {
    tracing::error!(
        error_type = err.kind(),
        error = %err,
        trace = %err.trace(),
        "failed to store telemetry event"
    );
    respond(
        500,
        &FailureBody {
            error: err.to_string(),
            device_id,
        },
    )
}

fn respond(status_code: u16, body: &impl Serialize) -> RecorderResponse {
    let body = serde_json::to_string(body).unwrap_or_else(|err| {
        tracing::error!(error = %err, "response body serialization failed");
        String::from("{}")
    });
    RecorderResponse { status_code, body }
}

fn pretty(value: &impl Serialize) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|err| format!("<unprintable: {err}>"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use async_trait::async_trait;
    use chrono::NaiveDateTime;
    use serde_json::json;
    use std::io;

    struct FailingStore;

    #[async_trait]
    impl TelemetryStore for FailingStore {
        async fn put_record(&self, _record: &TelemetryRecord) -> Result<(), RecorderError> {
            Err(RecorderError::persistence(
                "put item failed",
                io::Error::new(
                    io::ErrorKind::Other,
                    "ProvisionedThroughputExceededException: rate exceeded",
                ),
            ))
        }

        fn describe(&self) -> String {
            "failing table".to_string()
        }
    }

    fn recorder_with_memory() -> (Recorder, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        (Recorder::new(store.clone()), store)
    }

    fn body(response: &RecorderResponse) -> Value {
        serde_json::from_str(&response.body).unwrap()
    }

    #[tokio::test]
    async fn stores_event_and_defaults_timestamp() {
        let (recorder, store) = recorder_with_memory();
        let before = Utc::now().naive_utc();

        let response = recorder
            .handle(json!({"device_id": "dev-1", "engine_rpm": 1500.5}))
            .await;

        let after = Utc::now().naive_utc();
        assert_eq!(response.status_code, 200);
        let body = body(&response);
        assert_eq!(body["message"], STORED_MESSAGE);
        assert_eq!(body["device_id"], "dev-1");

        let timestamp = body["timestamp"].as_str().unwrap();
        let parsed = NaiveDateTime::parse_from_str(timestamp, "%Y-%m-%dT%H:%M:%S%.f").unwrap();
        // Stored timestamps are truncated to microseconds.
        assert!(parsed >= before - chrono::Duration::milliseconds(1) && parsed <= after);

        let record = store.get("dev-1", timestamp).await.unwrap();
        assert_eq!(record.engine_rpm.as_decimal().unwrap().to_string(), "1500.5");
        assert_eq!(record.machine_details, crate::normalize::StoredValue::Text(String::new()));
    }

    #[tokio::test]
    async fn missing_device_id_yields_unknown_failure() {
        let (recorder, store) = recorder_with_memory();

        let response = recorder
            .handle(json!({"timestamp": "2024-01-01T00:00:00"}))
            .await;

        assert_eq!(response.status_code, 500);
        let body = body(&response);
        assert!(body["error"].as_str().unwrap().contains("device_id"));
        assert_eq!(body["device_id"], "unknown");
        assert_eq!(store.len().await, 0);
    }

    #[tokio::test]
    async fn nested_location_keeps_literal_decimals() {
        let (recorder, store) = recorder_with_memory();

        let response = recorder
            .handle(json!({
                "device_id": "dev-2",
                "timestamp": "2024-01-01T00:00:00",
                "location": {"lat": 12.34, "lng": 56.78},
                "mpu6050": {"accel": {"x": 0.1}},
                "gnss": {"fixes": [{"hdop": 0.9}]}
            }))
            .await;

        assert_eq!(response.status_code, 200);
        let record = store.get("dev-2", "2024-01-01T00:00:00").await.unwrap();
        let lat = record.location.get("lat").unwrap().as_decimal().unwrap();
        let lng = record.location.get("lng").unwrap().as_decimal().unwrap();
        assert_eq!(lat.to_string(), "12.34");
        assert_eq!(lng.to_string(), "56.78");
        let accel_x = record.mpu6050.get("accel").unwrap().get("x").unwrap();
        assert_eq!(accel_x.as_decimal().unwrap().to_string(), "0.1");
    }

    #[tokio::test]
    async fn same_key_is_last_write_wins() {
        let (recorder, store) = recorder_with_memory();
        let ts = "2024-05-05T10:00:00";

        let first = recorder
            .handle(json!({"device_id": "dev-3", "timestamp": ts, "engine_temp": 80.5}))
            .await;
        let second = recorder
            .handle(json!({"device_id": "dev-3", "timestamp": ts, "engine_temp": 95.25}))
            .await;

        assert_eq!(first.status_code, 200);
        assert_eq!(second.status_code, 200);
        assert_eq!(store.len().await, 1);
        let record = store.get("dev-3", ts).await.unwrap();
        assert_eq!(record.engine_temp.as_decimal().unwrap().to_string(), "95.25");
    }

    #[tokio::test]
    async fn persistence_failure_echoes_device_id() {
        let recorder = Recorder::new(Arc::new(FailingStore));

        let response = recorder.handle(json!({"device_id": "dev-4"})).await;

        assert_eq!(response.status_code, 500);
        let body = body(&response);
        assert_eq!(body["device_id"], "dev-4");
        assert!(body["error"]
            .as_str()
            .unwrap()
            .contains("ProvisionedThroughputExceededException"));
    }

    #[test]
    fn response_serializes_status_code_in_camel_case() {
        let response = respond(200, &json!({"ok": true}));
        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value["statusCode"], 200);
        assert_eq!(value["body"], "{\"ok\":true}");
    }

    #[tokio::test]
    async fn non_string_device_id_is_echoed_as_sent() {
        let (recorder, store) = recorder_with_memory();

        let response = recorder.handle(json!({"device_id": 42})).await;

        assert_eq!(response.status_code, 500);
        assert_eq!(body(&response)["device_id"], 42);
        assert_eq!(store.len().await, 0);
    }

    #[tokio::test]
    async fn malformed_bytes_yield_failure_body() {
        let (recorder, store) = recorder_with_memory();

        let response = recorder.handle_bytes(b"{\"device_id\": \"dev-5\",").await;

        assert_eq!(response.status_code, 500);
        let body = body(&response);
        assert!(body["error"].as_str().unwrap().starts_with("Malformed event payload"));
        assert_eq!(body["device_id"], "unknown");
        assert_eq!(store.len().await, 0);

        let response = recorder
            .handle_bytes(br#"{"device_id": "dev-5", "timestamp": "t1"}"#)
            .await;
        assert_eq!(response.status_code, 200);
        assert!(store.get("dev-5", "t1").await.is_some());
    }
}
