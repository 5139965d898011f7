//! Session lifecycle error types.

use thiserror::Error;

/// Error type for session lifecycle operations.
#[derive(Error, Debug)]
pub enum SessionError {
    /// Auth endpoint failure
    #[error(transparent)]
    Auth(#[from] auth_client::AuthError),

    /// Credential storage failure
    #[error(transparent)]
    Store(#[from] credential_store::StoreError),

    /// Configuration, paths, or persisted-state failure
    #[error(transparent)]
    Core(#[from] client_core::CoreError),

    /// Biometric login was requested without a stored refresh token
    #[error("No biometric login set up yet. Use the email code once.")]
    RefreshTokenMissing,

    /// The session changed while this operation was in flight; its result
    /// was discarded
    #[error("Session changed while the operation was in flight")]
    Stale,

    /// The requested operation is not legal in the current session state
    #[error("Illegal session transition: {0}")]
    Transition(String),

    /// A background task failed to complete
    #[error("Background task failed: {0}")]
    Task(String),
}

/// Result type for session lifecycle operations.
pub type SessionResult<T> = Result<T, SessionError>;
