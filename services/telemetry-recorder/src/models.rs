use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Handler result in the shape the ingestion host expects; `body` carries
/// JSON text, not a nested object.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct RecorderResponse {
    #[serde(rename = "statusCode")]
    pub status_code: u16,
    pub body: String,
}

#[derive(Serialize, Deserialize)]
pub struct StoredBody {
    pub message: String,
    pub device_id: String,
    pub timestamp: String,
}

#[derive(Serialize, Deserialize)]
pub struct FailureBody {
    pub error: String,
    /// Echoed as sent when present, otherwise `"unknown"`.
    pub device_id: Value,
}
