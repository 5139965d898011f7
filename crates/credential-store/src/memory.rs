//! In-memory storage backend.

use crate::{SecureStore, StoreResult};
use std::collections::HashMap;
use std::sync::Mutex;

/// In-memory secure storage.
///
/// Holds values for the lifetime of the process only. Used in tests and as
/// a last-resort fallback when no persistent backend can be opened.
pub struct MemoryStore {
    data: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self {
            data: Mutex::new(HashMap::new()),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SecureStore for MemoryStore {
    fn set(&self, key: &str, value: &str) -> StoreResult<()> {
        let mut data = self.data.lock().unwrap();
        data.remove(key);
        data.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn get(&self, key: &str) -> StoreResult<Option<String>> {
        let data = self.data.lock().unwrap();
        Ok(data.get(key).cloned())
    }

    fn delete(&self, key: &str) -> StoreResult<bool> {
        let mut data = self.data.lock().unwrap();
        Ok(data.remove(key).is_some())
    }
}
