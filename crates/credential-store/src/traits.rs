//! Storage trait definitions.

use crate::StoreResult;

/// Trait for secure storage backends.
pub trait SecureStore: Send + Sync {
    /// Store a value. Replaces any existing value for the key.
    fn set(&self, key: &str, value: &str) -> StoreResult<()>;

    /// Retrieve a value.
    fn get(&self, key: &str) -> StoreResult<Option<String>>;

    /// Delete a value. Returns true if the key existed.
    fn delete(&self, key: &str) -> StoreResult<bool>;

    /// Check if a key exists. Must never trigger a biometric challenge.
    fn has(&self, key: &str) -> StoreResult<bool> {
        Ok(self.get(key)?.is_some())
    }
}
