//! Per-install device identity.

use crate::state::StateFile;
use client_core::{CoreError, CoreResult};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

/// Stable per-install device id, minted on first use and persisted in the
/// client state record. Never rotated; survives sign-out.
pub struct DeviceIdentity {
    state: Arc<StateFile>,
}

impl DeviceIdentity {
    pub fn new(state: Arc<StateFile>) -> Self {
        Self { state }
    }

    /// Return the device id, minting one if this install has none yet.
    ///
    /// Creation happens inside the state file's update lock, so concurrent
    /// first calls observe the same id.
    pub fn get(&self) -> CoreResult<String> {
        if let Some(id) = self.state.device_id() {
            return Ok(id);
        }

        let updated = self.state.update(|s| {
            if s.device_id.is_none() {
                let id = generate_device_id();
                info!(device_id = %id, "minted device id for this install");
                s.device_id = Some(id);
            }
        })?;

        updated
            .device_id
            .ok_or_else(|| CoreError::Config("device id missing after mint".to_string()))
    }
}

/// 32 lowercase hex characters: a v4 UUID without dashes.
fn generate_device_id() -> String {
    Uuid::new_v4().simple().to_string()
}
