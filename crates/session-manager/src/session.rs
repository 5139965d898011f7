//! Session snapshot types.

use auth_client::UserInfo;
use serde::{Deserialize, Serialize};

/// The signed-in user's profile. Missing server fields are filled with
/// client-side defaults so the UI always has something to show.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Profile {
    pub username: String,
    pub franchise_id: String,
}

impl Profile {
    /// Build a profile from server user fields, filling gaps with defaults.
    pub fn from_user(user: UserInfo, default_franchise_id: &str) -> Self {
        Self {
            username: user.username.unwrap_or_else(|| "User".to_string()),
            franchise_id: user
                .franchise_id
                .unwrap_or_else(|| default_franchise_id.to_string()),
        }
    }

    /// Placeholder profile for a warm start when no profile was persisted.
    pub fn fallback(default_franchise_id: &str) -> Self {
        Self {
            username: "User".to_string(),
            franchise_id: default_franchise_id.to_string(),
        }
    }
}

/// Where the session currently stands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    /// No live session
    LoggedOut,
    /// A code was sent to this email; waiting for the user to enter it
    AwaitingVerification { email: String },
    /// A refresh exchange is in flight
    Refreshing,
    /// Live session with a usable access token
    Authenticated { profile: Profile },
}

/// A committed session snapshot, broadcast to observers on every change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub state: SessionState,
    /// User-facing status or error message, if any
    pub message: Option<String>,
    /// The persisted logged-in flag; survives restarts independently of
    /// `state`
    pub logged_in: bool,
}

impl Session {
    pub fn is_authenticated(&self) -> bool {
        matches!(self.state, SessionState::Authenticated { .. })
    }

    pub fn profile(&self) -> Option<&Profile> {
        match &self.state {
            SessionState::Authenticated { profile } => Some(profile),
            _ => None,
        }
    }
}
