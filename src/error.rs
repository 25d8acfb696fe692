use thiserror::Error;

#[derive(Error, Debug)]
pub enum PayoffError {
    #[error("Unknown payoff strategy '{0}'. Expected 'avalanche' or 'snowball'.")]
    UnknownStrategy(String),

    #[error("Invalid {field}: {reason}")]
    InvalidInput { field: String, reason: String },

    #[error("Invalid timestamp '{0}'. Expected RFC 3339 (e.g., '2025-01-31T00:00:00Z')")]
    InvalidTimestamp(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

impl PayoffError {
    pub fn invalid(field: &str, reason: impl Into<String>) -> Self {
        PayoffError::InvalidInput {
            field: field.to_string(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, PayoffError>;
