//! Auth transport error types.

use thiserror::Error;

/// Error type for auth endpoint operations.
#[derive(Error, Debug)]
pub enum AuthError {
    /// Bad input shape; detected client-side, no network call was made
    #[error("{0}")]
    Validation(String),

    /// Transport failure or timeout
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The server answered `ok: false` with a message
    #[error("{0}")]
    Server(String),

    /// Malformed JSON, or required fields missing despite `ok: true`
    #[error("Protocol error: {0}")]
    Protocol(String),
}

/// Result type for auth endpoint operations.
pub type AuthResult<T> = Result<T, AuthError>;
