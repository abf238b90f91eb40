use devicedata_common::{env_or, env_string};
use std::{env, fmt};

pub const DEFAULT_TABLE: &str = "DeviceDataTable";

#[derive(Clone, Debug)]
pub struct RecorderConfig {
    pub table: String,
    pub store: StoreBackend,
    pub endpoint: Option<String>,
    pub port: u16,
    pub lambda: bool,
}

impl RecorderConfig {
    pub fn from_env() -> Self {
        let store = match env::var("TELEMETRY_STORE") {
            Ok(value) => value.parse().unwrap_or_else(|_| {
                tracing::warn!(value = %value, "unknown TELEMETRY_STORE, using dynamodb");
                StoreBackend::DynamoDb
            }),
            Err(_) => StoreBackend::DynamoDb,
        };

        Self {
            table: env_string("TELEMETRY_TABLE", DEFAULT_TABLE),
            store,
            endpoint: env::var("AWS_ENDPOINT_URL")
                .ok()
                .filter(|value| !value.is_empty()),
            port: env_or("PORT", 8080u16),
            lambda: env::var("AWS_LAMBDA_RUNTIME_API").is_ok(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StoreBackend {
    DynamoDb,
    Memory,
}

impl fmt::Display for StoreBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = match self {
            StoreBackend::DynamoDb => "dynamodb",
            StoreBackend::Memory => "memory",
        };
        write!(f, "{value}")
    }
}

impl StoreBackend {
    /// Whether records outlive the process. The in-memory map keeps every
    /// record until exit, so it is only meant for local runs and tests.
    pub fn is_durable(&self) -> bool {
        matches!(self, StoreBackend::DynamoDb)
    }
}

impl std::str::FromStr for StoreBackend {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "dynamodb" | "dynamo" => Ok(StoreBackend::DynamoDb),
            "memory" | "mem" => Ok(StoreBackend::Memory),
            _ => Err(()),
        }
    }
}
