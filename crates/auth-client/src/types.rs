//! Wire types for the unified auth endpoint.

use serde::{Deserialize, Serialize};

/// Required length of a one-time code.
pub const CODE_LENGTH: usize = 6;

/// Request body for the auth endpoint. The variant name becomes the
/// `action` field on the wire.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum AuthRequest {
    SendCode {
        email: String,
    },
    VerifyCode {
        email: String,
        code: String,
        device_id: String,
        device_name: String,
        platform: String,
    },
    Refresh {
        device_id: String,
        refresh_token: String,
    },
}

/// User fields in an auth response. The server may omit either field.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq, Default)]
pub struct UserInfo {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub franchise_id: Option<String>,
}

/// Token fields in an auth response.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq, Default)]
pub struct TokenPayload {
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub refresh_token: Option<String>,
}

/// Response body from the auth endpoint.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct AuthResponse {
    pub ok: bool,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub user: Option<UserInfo>,
    #[serde(default)]
    pub tokens: Option<TokenPayload>,
}

/// A successful `verify_code` exchange: profile plus a full token pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedCredentials {
    pub user: UserInfo,
    pub access_token: String,
    pub refresh_token: String,
}

/// A successful `refresh` exchange. The refresh token is only present when
/// the server chose to rotate it; absence means the stored token remains
/// authoritative.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshedCredentials {
    pub user: UserInfo,
    pub access_token: String,
    pub refresh_token: Option<String>,
}

/// Normalize an email the way the endpoint expects: trimmed, lowercased.
pub fn normalize_email(raw: &str) -> String {
    raw.trim().to_lowercase()
}
