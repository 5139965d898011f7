//! Storage key constants.

/// Storage keys used by the credential store.
pub struct StorageKeys;

impl StorageKeys {
    /// Access token (standard tier)
    pub const ACCESS_TOKEN: &'static str = "access_token";

    /// Refresh token (biometric tier)
    pub const REFRESH_TOKEN: &'static str = "refresh_token";
}
