//! Error types for the company research assistant

use thiserror::Error;
use uuid::Uuid;

/// Result type alias for assistant operations
pub type Result<T> = std::result::Result<T, AssistantError>;

#[derive(Error, Debug)]
pub enum AssistantError {
    // =============================
    // Domain Errors
    // =============================

    #[error("Session not found: {0}")]
    SessionNotFound(Uuid),

    /// Text generation failed. Callers recover this into placeholder text,
    /// it never reaches a client.
    #[error("Generator error: {0}")]
    Generator(String),

    #[error("Invalid source: {0}")]
    InvalidSource(String),

    #[error("Configuration error: {0}")]
    Config(String),

    // =============================
    // External Library Conversions
    // =============================

    #[error("HTTP client error: {0}")]
    HttpError(#[from] reqwest::Error),
}
