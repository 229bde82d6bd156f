use thiserror::Error;

use crate::storage::wells::StoreError;

/// Centralized error types for the application
///
/// Request-scoped failures are turned into chat replies before they reach this
/// type; what remains here is mostly startup and transport failures.
#[derive(Error, Debug)]
pub enum AppError {
    /// Required setting missing or unparsable. Fatal at startup.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Record store errors
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Wrong argument count or delimiter in a single-message command
    #[error("Malformed command: {0}")]
    MalformedCommand(String),

    /// Webhook payload could not be parsed
    #[error("Failed to deserialize update: {0}")]
    Deserialization(#[from] serde_json::Error),

    /// Database connection pool errors
    #[error("Database pool error: {0}")]
    DatabasePool(#[from] r2d2::Error),

    /// Schema migration errors
    #[error("Migration error: {0}")]
    Migration(#[from] refinery::Error),

    /// Telegram API errors
    #[error("Telegram error: {0}")]
    Telegram(#[from] teloxide::RequestError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV export errors
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

/// Type alias for Result with AppError
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::telegram::types::WebhookUpdate;

    #[test]
    fn test_malformed_update_maps_to_deserialization() {
        let err = AppError::from(serde_json::from_str::<WebhookUpdate>("{not json").unwrap_err());
        assert!(matches!(err, AppError::Deserialization(_)));
        assert!(err.to_string().starts_with("Failed to deserialize update"));
    }

    #[test]
    fn test_store_errors_stay_transparent() {
        let err = AppError::from(StoreError::NotFound("С-999".to_string()));
        assert_eq!(err.to_string(), "well С-999 not found");
    }
}
