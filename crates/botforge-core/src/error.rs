use thiserror::Error;

#[derive(Debug, Error)]
pub enum BotforgeError {
    // Visibility errors
    #[error("Not found: {0}")]
    NotFound(String),

    // Tenant uniqueness errors
    #[error("Conflict: {0}")]
    Conflict(String),

    // Mutation-rights errors
    #[error("Forbidden: {0}")]
    Forbidden(String),

    // Invalid lifecycle transitions and malformed input
    #[error("Bad request: {0}")]
    BadRequest(String),

    // Storage errors
    #[error("Database error: {0}")]
    Database(String),

    // I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // JSON errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // Anything that escaped classification
    #[error("Internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, BotforgeError>;
