//! Secure credential storage for the Homegrid mobile client.
//!
//! This crate provides:
//! - A [`SecureStore`] backend trait with in-memory and encrypted-file
//!   implementations
//! - A [`BiometricGate`] capability for gating reads behind a live
//!   biometric check
//! - The two-tier [`CredentialStore`]: `Standard` values are always
//!   readable, `BiometricGated` values are sealed to the current biometric
//!   enrollment and require a challenge to read

mod file;
mod gate;
mod keys;
mod memory;
mod sealed;
mod store;
mod traits;

pub use file::FileStore;
pub use gate::{BiometricGate, EnrollmentFileGate, GateError};
pub use keys::StorageKeys;
pub use memory::MemoryStore;
pub use sealed::{derive_key, is_sealed, seal, unseal, SealError};
pub use store::{CredentialKind, CredentialStore, Protection};
pub use traits::SecureStore;

use thiserror::Error;

/// Error type for credential storage operations.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Platform/backend storage error
    #[error("Platform storage error: {0}")]
    Platform(String),

    /// Encoding/decoding error
    #[error("Encoding error: {0}")]
    Encoding(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// No biometric hardware or enrollment, or the enrollment changed since
    /// the credential was stored
    #[error("Biometric authentication is unavailable")]
    BiometricUnavailable,

    /// The user cancelled or failed the biometric check
    #[error("Biometric authentication was denied")]
    BiometricDenied,

    /// A biometric prompt is already in flight
    #[error("A biometric prompt is already in progress")]
    PromptInFlight,
}

impl From<GateError> for StoreError {
    fn from(err: GateError) -> Self {
        match err {
            GateError::Unavailable => StoreError::BiometricUnavailable,
            GateError::Denied => StoreError::BiometricDenied,
            GateError::PromptInFlight => StoreError::PromptInFlight,
            GateError::Platform(msg) => StoreError::Platform(msg),
        }
    }
}

/// Result type for credential storage operations.
pub type StoreResult<T> = Result<T, StoreError>;
