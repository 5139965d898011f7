//! Biometric gate capability.
//!
//! The gate abstracts the platform's biometric re-authentication check
//! (Face ID / Touch ID / fingerprint). Implementations expose an enrollment
//! secret used to seal gated credentials, and a challenge that releases the
//! same secret only after a live biometric check.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use thiserror::Error;
use tracing::debug;

/// Errors from biometric gate operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GateError {
    /// No biometric hardware, no enrollment, or the enrollment was removed
    #[error("biometric hardware or enrollment unavailable")]
    Unavailable,
    /// The user cancelled the prompt or the biometric match failed
    #[error("biometric check denied")]
    Denied,
    /// A prompt is already outstanding; prompts are single-flight
    #[error("a biometric prompt is already in flight")]
    PromptInFlight,
    /// Platform-specific error
    #[error("platform gate error: {0}")]
    Platform(String),
}

/// Capability interface for the platform biometric check.
pub trait BiometricGate: Send + Sync {
    /// The secret bound to the current biometric enrollment.
    ///
    /// Used to seal gated credentials at save time; must not trigger a
    /// challenge. When the enrollment changes, this returns a different
    /// secret, so previously sealed values become unreadable.
    fn enrollment_secret(&self) -> Result<Vec<u8>, GateError>;

    /// Run the biometric challenge with a human-readable reason.
    ///
    /// Returns the enrollment secret after a successful check. A second
    /// call while a prompt is outstanding must fail with
    /// [`GateError::PromptInFlight`] rather than stacking prompts.
    fn evaluate(&self, reason: &str) -> Result<Vec<u8>, GateError>;
}

const ENROLLMENT_SECRET_SIZE: usize = 32;

/// Software-backed gate for platforms without a hardware keystore.
///
/// The enrollment secret is a random 32-byte file under the client base
/// directory; rotating or deleting it invalidates every credential sealed
/// against it, mirroring what an OS does when biometric enrollment changes.
/// Platform implementations replace `evaluate` with the real OS prompt and
/// report `Denied` on cancel or mismatch; this gate treats an intact
/// enrollment secret as a passed check.
pub struct EnrollmentFileGate {
    secret_path: PathBuf,
    prompting: AtomicBool,
}

impl EnrollmentFileGate {
    /// Create a gate backed by the given enrollment secret file.
    pub fn new(secret_path: PathBuf) -> Self {
        Self {
            secret_path,
            prompting: AtomicBool::new(false),
        }
    }

    fn read_secret(&self) -> Result<Vec<u8>, GateError> {
        match std::fs::read(&self.secret_path) {
            Ok(bytes) if bytes.len() == ENROLLMENT_SECRET_SIZE => Ok(bytes),
            Ok(bytes) => Err(GateError::Platform(format!(
                "enrollment secret has unexpected length: {}",
                bytes.len()
            ))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(GateError::Unavailable),
            Err(e) => Err(GateError::Platform(e.to_string())),
        }
    }

    /// Claim the single prompt slot. Fails while another challenge holds it;
    /// the slot frees itself when the returned guard drops.
    fn begin_prompt(&self) -> Result<PromptSlot<'_>, GateError> {
        if self
            .prompting
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(GateError::PromptInFlight);
        }
        Ok(PromptSlot(&self.prompting))
    }

    fn create_secret(&self) -> Result<Vec<u8>, GateError> {
        use rand::RngCore;

        if let Some(parent) = self.secret_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| GateError::Platform(e.to_string()))?;
        }

        let mut bytes = vec![0u8; ENROLLMENT_SECRET_SIZE];
        rand::thread_rng().fill_bytes(&mut bytes);

        std::fs::write(&self.secret_path, &bytes)
            .map_err(|e| GateError::Platform(e.to_string()))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let _ = std::fs::set_permissions(
                &self.secret_path,
                std::fs::Permissions::from_mode(0o600),
            );
        }

        debug!(path = %self.secret_path.display(), "created enrollment secret");
        Ok(bytes)
    }
}

impl BiometricGate for EnrollmentFileGate {
    fn enrollment_secret(&self) -> Result<Vec<u8>, GateError> {
        match self.read_secret() {
            Ok(secret) => Ok(secret),
            Err(GateError::Unavailable) => self.create_secret(),
            Err(e) => Err(e),
        }
    }

    fn evaluate(&self, reason: &str) -> Result<Vec<u8>, GateError> {
        let _slot = self.begin_prompt()?;

        debug!(reason = %reason, "biometric challenge (software gate)");
        self.read_secret()
    }
}

/// Holds the gate's prompt slot for the duration of one challenge.
struct PromptSlot<'a>(&'a AtomicBool);

impl Drop for PromptSlot<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}
