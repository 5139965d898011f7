//! Auth endpoint client.

use crate::error::{AuthError, AuthResult};
use crate::types::{
    normalize_email, AuthRequest, AuthResponse, RefreshedCredentials, VerifiedCredentials,
    CODE_LENGTH,
};
use async_trait::async_trait;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use tracing::{debug, error};

/// Device fields sent with a `verify_code` request. Token issuance is
/// scoped to this device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceContext {
    pub device_id: String,
    pub device_name: String,
    pub platform: String,
}

impl DeviceContext {
    /// Create a context for the given device, detecting the platform from
    /// the build target.
    pub fn new(device_id: impl Into<String>, device_name: impl Into<String>) -> Self {
        Self {
            device_id: device_id.into(),
            device_name: device_name.into(),
            platform: std::env::consts::OS.to_string(),
        }
    }
}

/// The auth operations the session manager depends on.
///
/// Implemented by [`AuthClient`]; tests substitute their own transport.
#[async_trait]
pub trait AuthApi: Send + Sync {
    /// Request a one-time code for `email`. Success carries no tokens.
    async fn send_code(&self, email: &str) -> AuthResult<()>;

    /// Exchange an emailed code for a token pair bound to `device`.
    async fn verify_code(
        &self,
        email: &str,
        code: &str,
        device: &DeviceContext,
    ) -> AuthResult<VerifiedCredentials>;

    /// Exchange a refresh token for a fresh access token.
    async fn refresh(
        &self,
        device_id: &str,
        refresh_token: &str,
    ) -> AuthResult<RefreshedCredentials>;
}

/// Client for the unified auth endpoint.
#[derive(Clone)]
pub struct AuthClient {
    http_client: reqwest::Client,
    auth_url: String,
}

impl AuthClient {
    /// Create a new client for the given endpoint URL.
    pub fn new(auth_url: impl Into<String>) -> Self {
        Self {
            http_client: reqwest::Client::new(),
            auth_url: auth_url.into(),
        }
    }

    /// POST a request body and parse the tagged response.
    async fn post(&self, request: &AuthRequest) -> AuthResult<AuthResponse> {
        let response = self
            .http_client
            .post(&self.auth_url)
            .json(request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            let body_summary = summarize_response_body(&body);
            error!(status = %status, body_summary = %body_summary, "auth endpoint returned error status");
            return Err(AuthError::Server(format!(
                "auth endpoint returned {}",
                status
            )));
        }

        serde_json::from_str(&body).map_err(|e| {
            let body_summary = summarize_response_body(&body);
            error!(body_summary = %body_summary, "invalid auth response body");
            AuthError::Protocol(format!("invalid response body: {}", e))
        })
    }
}

#[async_trait]
impl AuthApi for AuthClient {
    async fn send_code(&self, email: &str) -> AuthResult<()> {
        let email = validate_email(email)?;

        debug!("requesting one-time code");
        let response = self.post(&AuthRequest::SendCode { email }).await?;

        if response.ok {
            Ok(())
        } else {
            Err(server_error(response, "Could not send code"))
        }
    }

    async fn verify_code(
        &self,
        email: &str,
        code: &str,
        device: &DeviceContext,
    ) -> AuthResult<VerifiedCredentials> {
        let email = validate_email(email)?;
        let code = validate_code(code)?;

        debug!(device_id = %device.device_id, "verifying one-time code");
        let response = self
            .post(&AuthRequest::VerifyCode {
                email,
                code,
                device_id: device.device_id.clone(),
                device_name: device.device_name.clone(),
                platform: device.platform.clone(),
            })
            .await?;

        verified_from_response(response)
    }

    async fn refresh(
        &self,
        device_id: &str,
        refresh_token: &str,
    ) -> AuthResult<RefreshedCredentials> {
        debug!(device_id = %device_id, "refreshing access token");
        let response = self
            .post(&AuthRequest::Refresh {
                device_id: device_id.to_string(),
                refresh_token: refresh_token.to_string(),
            })
            .await?;

        refreshed_from_response(response)
    }
}

fn validate_email(raw: &str) -> AuthResult<String> {
    let email = normalize_email(raw);
    if !email.contains('@') {
        return Err(AuthError::Validation(
            "Enter a valid email address".to_string(),
        ));
    }
    Ok(email)
}

fn validate_code(raw: &str) -> AuthResult<String> {
    let code = raw.trim().to_string();
    if code.len() != CODE_LENGTH {
        return Err(AuthError::Validation(format!(
            "Enter the {}-digit code",
            CODE_LENGTH
        )));
    }
    Ok(code)
}

fn server_error(response: AuthResponse, fallback: &str) -> AuthError {
    AuthError::Server(response.error.unwrap_or_else(|| fallback.to_string()))
}

/// Enforce the `verify_code` response contract: `ok: true` must carry a
/// user plus both tokens.
fn verified_from_response(response: AuthResponse) -> AuthResult<VerifiedCredentials> {
    if !response.ok {
        return Err(server_error(response, "Verification failed"));
    }

    let user = response
        .user
        .ok_or_else(|| AuthError::Protocol("missing user in verify response".to_string()))?;
    let tokens = response
        .tokens
        .ok_or_else(|| AuthError::Protocol("missing tokens in verify response".to_string()))?;

    let access_token = tokens
        .access_token
        .ok_or_else(|| AuthError::Protocol("missing access token in verify response".to_string()))?;
    let refresh_token = tokens.refresh_token.ok_or_else(|| {
        AuthError::Protocol("missing refresh token in verify response".to_string())
    })?;

    Ok(VerifiedCredentials {
        user,
        access_token,
        refresh_token,
    })
}

/// Enforce the `refresh` response contract: `ok: true` must carry a user
/// and an access token; a rotated refresh token is optional.
fn refreshed_from_response(response: AuthResponse) -> AuthResult<RefreshedCredentials> {
    if !response.ok {
        return Err(server_error(response, "Refresh failed"));
    }

    let user = response
        .user
        .ok_or_else(|| AuthError::Protocol("missing user in refresh response".to_string()))?;
    let tokens = response
        .tokens
        .ok_or_else(|| AuthError::Protocol("missing tokens in refresh response".to_string()))?;

    let access_token = tokens.access_token.ok_or_else(|| {
        AuthError::Protocol("missing access token in refresh response".to_string())
    })?;

    Ok(RefreshedCredentials {
        user,
        access_token,
        refresh_token: tokens.refresh_token,
    })
}

/// Summarize a response body for logs without leaking token material.
fn summarize_response_body(body: &str) -> String {
    let mut hasher = DefaultHasher::new();
    body.hash(&mut hasher);
    format!("len={},digest={:016x}", body.len(), hasher.finish())
}
