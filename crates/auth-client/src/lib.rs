//! Transport for the unified auth endpoint.
//!
//! One HTTPS endpoint, POST JSON, with the verb carried in the body's
//! `action` field: `send_code`, `verify_code`, `refresh`. This crate owns
//! the wire types, client-side shape validation, and the response
//! requirements for each action.

mod client;
mod error;
mod types;

pub use client::{AuthApi, AuthClient, DeviceContext};
pub use error::{AuthError, AuthResult};
pub use types::{
    normalize_email, AuthRequest, AuthResponse, RefreshedCredentials, TokenPayload, UserInfo,
    VerifiedCredentials, CODE_LENGTH,
};
