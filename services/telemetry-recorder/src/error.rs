use std::error::Error as StdError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RecorderError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    Normalization(String),
    #[error("{message}")]
    Persistence {
        message: String,
        #[source]
        source: Box<dyn StdError + Send + Sync>,
    },
}

impl RecorderError {
    pub fn missing_field(field: &str) -> Self {
        RecorderError::Validation(format!("Missing required field: {field}"))
    }

    #[allow(dead_code)]
    pub fn persistence(context: &str, source: impl StdError + Send + Sync + 'static) -> Self {
        RecorderError::Persistence {
            message: format!("{context}: {source}"),
            source: Box::new(source),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            RecorderError::Validation(_) => "ValidationError",
            RecorderError::Normalization(_) => "NormalizationError",
            RecorderError::Persistence { .. } => "PersistenceError",
        }
    }

    /// The error followed by every underlying cause, outermost first.
    pub fn trace(&self) -> String {
        let mut chain = vec![self.to_string()];
        let mut current = self.source();
        while let Some(cause) = current {
            chain.push(cause.to_string());
            current = cause.source();
        }
        chain.join(" <- ")
    }
}
