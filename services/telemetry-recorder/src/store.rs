use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_dynamodb::{error::DisplayErrorContext, Client};
use std::collections::HashMap;
use tokio::sync::Mutex;

use crate::error::RecorderError;
use crate::record::TelemetryRecord;

#[async_trait]
pub trait TelemetryStore: Send + Sync {
    /// Unconditional upsert: an existing item with the same
    /// (`device_id`, `timestamp`) is replaced wholesale.
    async fn put_record(&self, record: &TelemetryRecord) -> Result<(), RecorderError>;

    fn describe(&self) -> String;
}

#[derive(Clone)]
pub struct DynamoStore {
    client: Client,
    table: String,
}

impl DynamoStore {
    pub async fn new(table: String, endpoint: Option<String>) -> Self {
        let mut loader = aws_config::defaults(BehaviorVersion::latest());
        if let Some(endpoint) = endpoint {
            loader = loader.endpoint_url(endpoint);
        }
        let shared = loader.load().await;
        Self {
            client: Client::new(&shared),
            table,
        }
    }
}

#[async_trait]
impl TelemetryStore for DynamoStore {
    async fn put_record(&self, record: &TelemetryRecord) -> Result<(), RecorderError> {
        let output = self
            .client
            .put_item()
            .table_name(self.table.as_str())
            .set_item(Some(record.to_attributes()))
            .send()
            .await
            .map_err(|err| RecorderError::Persistence {
                message: format!("put item failed: {}", DisplayErrorContext(&err)),
                source: Box::new(err),
            })?;
        tracing::debug!(table = %self.table, consumed = ?output.consumed_capacity(), "put item accepted");
        Ok(())
    }

    fn describe(&self) -> String {
        format!("dynamodb table {}", self.table)
    }
}

/// In-process table used for local runs and tests.
#[derive(Default)]
pub struct MemoryStore {
    items: Mutex<HashMap<(String, String), TelemetryRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    #[allow(dead_code)]
    pub async fn get(&self, device_id: &str, timestamp: &str) -> Option<TelemetryRecord> {
        let items = self.items.lock().await;
        items
            .get(&(device_id.to_string(), timestamp.to_string()))
            .cloned()
    }

    #[allow(dead_code)]
    pub async fn len(&self) -> usize {
        self.items.lock().await.len()
    }
}

#[async_trait]
impl TelemetryStore for MemoryStore {
    async fn put_record(&self, record: &TelemetryRecord) -> Result<(), RecorderError> {
        let mut items = self.items.lock().await;
        items.insert(
            (record.device_id.clone(), record.timestamp.clone()),
            record.clone(),
        );
        Ok(())
    }

    fn describe(&self) -> String {
        "in-memory table".to_string()
    }
}
