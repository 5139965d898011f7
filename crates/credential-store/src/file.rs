//! Encrypted-file storage backend.
//!
//! Fallback for platforms without a hardware-backed keystore: values are
//! encrypted at rest with a key derived from a per-install master key file.

use crate::sealed::{derive_key, seal, unseal, SealError, KEY_SIZE};
use crate::{SecureStore, StoreError, StoreResult};
use rand::RngCore;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;
use tracing::debug;

const AT_REST_INFO: &[u8] = b"homegrid-store-at-rest-v1";
const MASTER_KEY_SIZE: usize = 32;

/// File-backed secure storage with encrypted values.
pub struct FileStore {
    path: PathBuf,
    sealing_key: [u8; KEY_SIZE],
    // Serializes read-modify-write cycles on the backing file.
    write_lock: Mutex<()>,
}

impl FileStore {
    /// Open a store at `path`, loading or creating the master key at
    /// `key_path`.
    pub fn open(path: PathBuf, key_path: PathBuf) -> StoreResult<Self> {
        let master = Self::load_or_create_master_key(&key_path)?;
        Ok(Self {
            path,
            sealing_key: derive_key(&master, AT_REST_INFO),
            write_lock: Mutex::new(()),
        })
    }

    fn load_or_create_master_key(key_path: &PathBuf) -> StoreResult<Vec<u8>> {
        match std::fs::read(key_path) {
            Ok(bytes) if bytes.len() == MASTER_KEY_SIZE => Ok(bytes),
            Ok(bytes) => Err(StoreError::Platform(format!(
                "master key has unexpected length: {}",
                bytes.len()
            ))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                if let Some(parent) = key_path.parent() {
                    std::fs::create_dir_all(parent)?;
                }

                let mut bytes = vec![0u8; MASTER_KEY_SIZE];
                rand::thread_rng().fill_bytes(&mut bytes);
                std::fs::write(key_path, &bytes)?;

                #[cfg(unix)]
                {
                    use std::os::unix::fs::PermissionsExt;
                    let _ = std::fs::set_permissions(
                        key_path,
                        std::fs::Permissions::from_mode(0o600),
                    );
                }

                debug!(path = %key_path.display(), "created store master key");
                Ok(bytes)
            }
            Err(e) => Err(StoreError::Io(e)),
        }
    }

    fn read_entries(&self) -> StoreResult<HashMap<String, String>> {
        match std::fs::read_to_string(&self.path) {
            Ok(content) => {
                serde_json::from_str(&content).map_err(|e| StoreError::Encoding(e.to_string()))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(HashMap::new()),
            Err(e) => Err(StoreError::Io(e)),
        }
    }

    fn write_entries(&self, entries: &HashMap<String, String>) -> StoreResult<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(entries)
            .map_err(|e| StoreError::Encoding(e.to_string()))?;

        // Write-then-rename so a crash never leaves a truncated store
        let tmp = self.path.with_extension("tmp");
        std::fs::write(&tmp, content)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let _ = std::fs::set_permissions(&tmp, std::fs::Permissions::from_mode(0o600));
        }

        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl SecureStore for FileStore {
    fn set(&self, key: &str, value: &str) -> StoreResult<()> {
        let _guard = self.write_lock.lock().unwrap();

        let sealed = seal(&self.sealing_key, value)
            .map_err(|e| StoreError::Encoding(e.to_string()))?;

        let mut entries = self.read_entries()?;
        entries.remove(key);
        entries.insert(key.to_string(), sealed);
        self.write_entries(&entries)
    }

    fn get(&self, key: &str) -> StoreResult<Option<String>> {
        let entries = self.read_entries()?;
        let Some(sealed) = entries.get(key) else {
            return Ok(None);
        };

        match unseal(&self.sealing_key, sealed) {
            Ok(value) => Ok(Some(value)),
            Err(SealError::Crypto) => Err(StoreError::Platform(
                "stored credential does not match the store master key".to_string(),
            )),
            Err(SealError::Format(e)) => Err(StoreError::Encoding(e)),
        }
    }

    fn delete(&self, key: &str) -> StoreResult<bool> {
        let _guard = self.write_lock.lock().unwrap();

        let mut entries = self.read_entries()?;
        if entries.remove(key).is_none() {
            return Ok(false);
        }
        self.write_entries(&entries)?;
        Ok(true)
    }

    fn has(&self, key: &str) -> StoreResult<bool> {
        // Presence only, without decrypting the value
        Ok(self.read_entries()?.contains_key(key))
    }
}
