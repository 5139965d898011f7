//! Persisted client state.
//!
//! A small JSON record that survives restarts: the install's device id,
//! the logged-in flag, and the last-seen profile. Credentials never land
//! here; they belong to the credential store.

use crate::Profile;
use chrono::Utc;
use client_core::{CoreError, CoreResult, Paths};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;
use tracing::debug;

/// The on-disk client state record.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct PersistedState {
    /// Stable per-install device id; set once, never rotated
    #[serde(default)]
    pub device_id: Option<String>,
    /// Whether the user was signed in when the process last ran
    #[serde(default)]
    pub logged_in: bool,
    /// Last profile the server reported
    #[serde(default)]
    pub profile: Option<Profile>,
    /// RFC 3339 timestamp of the last write
    #[serde(default)]
    pub updated_at: Option<String>,
}

/// Handle to the state file. All mutation goes through [`StateFile::update`],
/// which holds an internal lock across the read-modify-write.
pub struct StateFile {
    path: PathBuf,
    state: Mutex<PersistedState>,
}

impl StateFile {
    /// Open the state file at the standard location, creating an empty
    /// record if none exists yet.
    pub fn load(paths: &Paths) -> CoreResult<Self> {
        Self::open(paths.state_file())
    }

    /// Open the state file at an explicit path.
    pub fn open(path: PathBuf) -> CoreResult<Self> {
        let state = if path.exists() {
            let contents = fs::read_to_string(&path)?;
            serde_json::from_str(&contents)?
        } else {
            PersistedState::default()
        };
        debug!(path = %path.display(), "loaded client state");
        Ok(Self {
            path,
            state: Mutex::new(state),
        })
    }

    /// Snapshot the current state.
    pub fn snapshot(&self) -> PersistedState {
        self.lock().clone()
    }

    pub fn device_id(&self) -> Option<String> {
        self.lock().device_id.clone()
    }

    pub fn logged_in(&self) -> bool {
        self.lock().logged_in
    }

    pub fn profile(&self) -> Option<Profile> {
        self.lock().profile.clone()
    }

    /// Apply a mutation and persist the result, returning the new state.
    ///
    /// The lock is held across the whole read-modify-write, so concurrent
    /// updates serialize rather than clobber each other.
    pub fn update<F>(&self, mutate: F) -> CoreResult<PersistedState>
    where
        F: FnOnce(&mut PersistedState),
    {
        let mut guard = self.lock();
        mutate(&mut guard);
        guard.updated_at = Some(Utc::now().to_rfc3339());
        self.write(&guard)?;
        Ok(guard.clone())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, PersistedState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    // Write to a temp file then rename, so a crash never leaves a torn record.
    fn write(&self, state: &PersistedState) -> CoreResult<()> {
        let json = serde_json::to_string_pretty(state)?;
        let tmp = self.path.with_extension("tmp");
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&tmp, json)?;
        fs::rename(&tmp, &self.path).map_err(CoreError::Io)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn missing_file_loads_as_defaults() {
        let dir = tempdir().unwrap();
        let state = StateFile::open(dir.path().join("state.json")).unwrap();

        let snap = state.snapshot();
        assert_eq!(snap.device_id, None);
        assert!(!snap.logged_in);
        assert_eq!(snap.profile, None);
    }

    #[test]
    fn update_persists_across_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("state.json");

        let state = StateFile::open(path.clone()).unwrap();
        state
            .update(|s| {
                s.device_id = Some("d".repeat(32));
                s.logged_in = true;
            })
            .unwrap();

        let reopened = StateFile::open(path).unwrap();
        assert_eq!(reopened.device_id(), Some("d".repeat(32)));
        assert!(reopened.logged_in());
    }

    #[test]
    fn update_stamps_updated_at() {
        let dir = tempdir().unwrap();
        let state = StateFile::open(dir.path().join("state.json")).unwrap();

        let snap = state.update(|s| s.logged_in = true).unwrap();
        let stamp = snap.updated_at.expect("updated_at should be set");
        assert!(chrono::DateTime::parse_from_rfc3339(&stamp).is_ok());
    }

    #[test]
    fn unknown_fields_in_file_are_ignored() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("state.json");
        fs::write(&path, r#"{ "logged_in": true, "future_field": 7 }"#).unwrap();

        let state = StateFile::open(path).unwrap();
        assert!(state.logged_in());
    }
}
