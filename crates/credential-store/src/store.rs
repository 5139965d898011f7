//! Two-tier credential store.

use crate::sealed::{derive_key, is_sealed, seal, unseal, SealError};
use crate::{BiometricGate, SecureStore, StorageKeys, StoreError, StoreResult};
use std::sync::Arc;
use tracing::{debug, warn};

const GATED_SEAL_INFO: &[u8] = b"homegrid-credential-sealing-v1";
const DEFAULT_PROMPT: &str = "Unlock to continue";

/// The credential kinds managed by the store. At most one live value per
/// kind per device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialKind {
    /// Short-lived bearer token, standard tier
    Access,
    /// Long-lived refresh token, biometric tier
    Refresh,
}

impl CredentialKind {
    fn storage_key(&self) -> &'static str {
        match self {
            CredentialKind::Access => StorageKeys::ACCESS_TOKEN,
            CredentialKind::Refresh => StorageKeys::REFRESH_TOKEN,
        }
    }
}

/// Protection tier for a stored credential.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Protection {
    /// Always readable
    Standard,
    /// Readable only after a live biometric check, bound to the current
    /// enrollment
    BiometricGated,
}

/// High-level credential store over a [`SecureStore`] backend and a
/// [`BiometricGate`].
///
/// `Standard` values pass through to the backend. `BiometricGated` values
/// are sealed with a key derived from the gate's enrollment secret, so a
/// changed enrollment makes them permanently unreadable.
pub struct CredentialStore {
    storage: Box<dyn SecureStore>,
    gate: Arc<dyn BiometricGate>,
}

impl CredentialStore {
    /// Create a store over the given backend and gate.
    pub fn new(storage: Box<dyn SecureStore>, gate: Arc<dyn BiometricGate>) -> Self {
        Self { storage, gate }
    }

    /// Store a credential, replacing any prior value for the kind.
    ///
    /// Never prompts: gated values are sealed with the enrollment secret,
    /// which is readable without a challenge.
    pub fn save(
        &self,
        kind: CredentialKind,
        value: &str,
        protection: Protection,
    ) -> StoreResult<()> {
        debug!(kind = ?kind, protection = ?protection, "saving credential");

        match protection {
            Protection::Standard => self.storage.set(kind.storage_key(), value),
            Protection::BiometricGated => {
                let secret = self.gate.enrollment_secret()?;
                let key = derive_key(&secret, GATED_SEAL_INFO);
                let sealed =
                    seal(&key, value).map_err(|e| StoreError::Encoding(e.to_string()))?;
                self.storage.set(kind.storage_key(), &sealed)
            }
        }
    }

    /// Load a credential.
    ///
    /// Standard-tier values return directly. Gated values run the biometric
    /// challenge using `prompt` as the user-facing reason. A value sealed
    /// under a different enrollment fails as
    /// [`StoreError::BiometricUnavailable`] — callers treat that as "no
    /// credential", not as fatal.
    pub fn load(&self, kind: CredentialKind, prompt: Option<&str>) -> StoreResult<Option<String>> {
        let Some(raw) = self.storage.get(kind.storage_key())? else {
            return Ok(None);
        };

        if !is_sealed(&raw) {
            return Ok(Some(raw));
        }

        let reason = prompt.unwrap_or(DEFAULT_PROMPT);
        let secret = self.gate.evaluate(reason)?;
        let key = derive_key(&secret, GATED_SEAL_INFO);

        match unseal(&key, &raw) {
            Ok(value) => Ok(Some(value)),
            Err(SealError::Crypto) => {
                // Enrollment changed since the value was sealed
                warn!(kind = ?kind, "credential sealed under a different enrollment");
                Err(StoreError::BiometricUnavailable)
            }
            Err(SealError::Format(e)) => Err(StoreError::Encoding(e)),
        }
    }

    /// Delete a credential. Returns true if one existed.
    pub fn delete(&self, kind: CredentialKind) -> StoreResult<bool> {
        debug!(kind = ?kind, "deleting credential");
        self.storage.delete(kind.storage_key())
    }

    /// Check whether a credential is present.
    ///
    /// A pure presence check: never decrypts, never prompts.
    pub fn exists(&self, kind: CredentialKind) -> StoreResult<bool> {
        self.storage.has(kind.storage_key())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{EnrollmentFileGate, GateError, MemoryStore};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::tempdir;

    /// Gate that counts challenges and answers with a fixed secret.
    struct CountingGate {
        secret: Vec<u8>,
        challenges: AtomicUsize,
    }

    impl CountingGate {
        fn new() -> Self {
            Self {
                secret: vec![7u8; 32],
                challenges: AtomicUsize::new(0),
            }
        }
    }

    impl BiometricGate for CountingGate {
        fn enrollment_secret(&self) -> Result<Vec<u8>, GateError> {
            Ok(self.secret.clone())
        }

        fn evaluate(&self, _reason: &str) -> Result<Vec<u8>, GateError> {
            self.challenges.fetch_add(1, Ordering::SeqCst);
            Ok(self.secret.clone())
        }
    }

    /// Gate that always denies the challenge.
    struct DenyingGate;

    impl BiometricGate for DenyingGate {
        fn enrollment_secret(&self) -> Result<Vec<u8>, GateError> {
            Ok(vec![7u8; 32])
        }

        fn evaluate(&self, _reason: &str) -> Result<Vec<u8>, GateError> {
            Err(GateError::Denied)
        }
    }

    fn store_with(gate: Arc<dyn BiometricGate>) -> CredentialStore {
        CredentialStore::new(Box::new(MemoryStore::new()), gate)
    }

    #[test]
    fn standard_tier_never_challenges() {
        let gate = Arc::new(CountingGate::new());
        let store = store_with(gate.clone());

        store
            .save(CredentialKind::Access, "A1", Protection::Standard)
            .unwrap();
        let value = store.load(CredentialKind::Access, None).unwrap();

        assert_eq!(value, Some("A1".to_string()));
        assert_eq!(gate.challenges.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn gated_tier_challenges_on_load_only() {
        let gate = Arc::new(CountingGate::new());
        let store = store_with(gate.clone());

        store
            .save(CredentialKind::Refresh, "R1", Protection::BiometricGated)
            .unwrap();
        assert_eq!(gate.challenges.load(Ordering::SeqCst), 0);

        let value = store
            .load(CredentialKind::Refresh, Some("Unlock to sign in"))
            .unwrap();
        assert_eq!(value, Some("R1".to_string()));
        assert_eq!(gate.challenges.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn exists_never_challenges() {
        let gate = Arc::new(CountingGate::new());
        let store = store_with(gate.clone());

        store
            .save(CredentialKind::Refresh, "R1", Protection::BiometricGated)
            .unwrap();

        assert!(store.exists(CredentialKind::Refresh).unwrap());
        assert!(!store.exists(CredentialKind::Access).unwrap());
        assert_eq!(gate.challenges.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn denied_challenge_surfaces_biometric_denied() {
        let store = store_with(Arc::new(DenyingGate));

        store
            .save(CredentialKind::Refresh, "R1", Protection::BiometricGated)
            .unwrap();

        let err = store
            .load(CredentialKind::Refresh, Some("Unlock"))
            .unwrap_err();
        assert!(matches!(err, StoreError::BiometricDenied));
    }

    #[test]
    fn save_is_replace_not_append() {
        let store = store_with(Arc::new(CountingGate::new()));

        store
            .save(CredentialKind::Access, "X", Protection::Standard)
            .unwrap();
        store
            .save(CredentialKind::Access, "Y", Protection::Standard)
            .unwrap();

        assert_eq!(
            store.load(CredentialKind::Access, None).unwrap(),
            Some("Y".to_string())
        );
    }

    #[test]
    fn missing_credential_loads_as_none() {
        let store = store_with(Arc::new(CountingGate::new()));
        assert_eq!(store.load(CredentialKind::Refresh, None).unwrap(), None);
    }

    #[test]
    fn enrollment_change_makes_gated_value_unavailable() {
        let dir = tempdir().unwrap();
        let enrollment = dir.path().join("enrollment.key");

        let store = CredentialStore::new(
            Box::new(MemoryStore::new()),
            Arc::new(EnrollmentFileGate::new(enrollment.clone())),
        );

        store
            .save(CredentialKind::Refresh, "R1", Protection::BiometricGated)
            .unwrap();

        // Simulate re-enrollment: the secret rotates
        std::fs::remove_file(&enrollment).unwrap();
        let gate = EnrollmentFileGate::new(enrollment);
        gate.enrollment_secret().unwrap();

        let err = store
            .load(CredentialKind::Refresh, Some("Unlock"))
            .unwrap_err();
        assert!(matches!(err, StoreError::BiometricUnavailable));

        // The entry is still present; only its contents are unreadable
        assert!(store.exists(CredentialKind::Refresh).unwrap());
    }

    #[test]
    fn delete_is_scoped_to_kind() {
        let store = store_with(Arc::new(CountingGate::new()));

        store
            .save(CredentialKind::Access, "A1", Protection::Standard)
            .unwrap();
        store
            .save(CredentialKind::Refresh, "R1", Protection::BiometricGated)
            .unwrap();

        assert!(store.delete(CredentialKind::Access).unwrap());
        assert!(!store.exists(CredentialKind::Access).unwrap());
        assert!(store.exists(CredentialKind::Refresh).unwrap());
    }
}
