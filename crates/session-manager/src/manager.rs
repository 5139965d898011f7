//! Session orchestration.
//!
//! [`SessionManager`] owns the session state machine, the credential store,
//! and the persisted client state, and exposes the lifecycle entry points
//! the UI calls. Entry points queue on an operation lock; `logout` alone
//! bypasses it so sign-out applies immediately, and an epoch counter
//! discards completions from operations that were in flight when the
//! session changed underneath them.

use crate::error::{SessionError, SessionResult};
use crate::fsm::{SessionMachine, SessionMachineInput};
use crate::identity::DeviceIdentity;
use crate::session::{Profile, Session, SessionState};
use crate::state::StateFile;
use auth_client::{normalize_email, AuthApi, AuthClient, DeviceContext, RefreshedCredentials, VerifiedCredentials};
use client_core::{Config, Paths};
use credential_store::{
    CredentialKind, CredentialStore, EnrollmentFileGate, FileStore, Protection,
};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

const MSG_CODE_SENT: &str = "Code sent. Check your email (and spam).";
const MSG_NO_BIOMETRIC_SETUP: &str = "No biometric login set up yet. Use the email code once.";
const DEFAULT_REFRESH_PROMPT: &str = "Unlock to sign in";

const EVENT_CHANNEL_CAPACITY: usize = 16;

/// What `logout` does with the stored refresh token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogoutPolicy {
    /// Keep it, so the user can sign back in with a biometric check alone
    RetainRefreshToken,
    /// Remove it, forcing a fresh email code on the next sign-in
    ClearRefreshToken,
}

/// Behavior knobs for a [`SessionManager`].
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Human-readable device name sent with verify requests
    pub device_name: String,
    /// Franchise id used when the server omits one
    pub default_franchise_id: String,
    /// User-facing reason shown on the biometric prompt during refresh
    pub refresh_prompt: String,
    pub logout_policy: LogoutPolicy,
}

impl SessionConfig {
    pub fn from_config(config: &Config) -> Self {
        Self {
            device_name: config.device_name.clone(),
            default_franchise_id: config.default_franchise_id.clone(),
            refresh_prompt: DEFAULT_REFRESH_PROMPT.to_string(),
            logout_policy: LogoutPolicy::RetainRefreshToken,
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

struct Inner {
    machine: SessionMachine,
    session: Session,
    /// Bumped on every committed change; in-flight operations capture it
    /// before their network call and recheck it before committing
    epoch: u64,
}

/// Owns the client's session lifecycle.
pub struct SessionManager {
    api: Arc<dyn AuthApi>,
    store: Arc<CredentialStore>,
    state: Arc<StateFile>,
    identity: DeviceIdentity,
    config: SessionConfig,
    inner: Mutex<Inner>,
    /// Serializes the async entry points; `logout` does not take it
    op_lock: tokio::sync::Mutex<()>,
    events: broadcast::Sender<Session>,
}

impl SessionManager {
    pub fn new(
        api: Arc<dyn AuthApi>,
        store: Arc<CredentialStore>,
        state: Arc<StateFile>,
        config: SessionConfig,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let logged_in = state.logged_in();
        Self {
            api,
            store,
            identity: DeviceIdentity::new(Arc::clone(&state)),
            state,
            config,
            inner: Mutex::new(Inner {
                machine: SessionMachine::new(),
                session: Session {
                    state: SessionState::LoggedOut,
                    message: None,
                    logged_in,
                },
                epoch: 0,
            }),
            op_lock: tokio::sync::Mutex::new(()),
            events,
        }
    }

    /// Wire up a manager over the standard on-disk backends.
    pub fn open(paths: &Paths, config: &Config) -> SessionResult<Self> {
        paths.ensure_dirs()?;
        let storage = FileStore::open(paths.credentials_file(), paths.store_key_file())?;
        let gate = Arc::new(EnrollmentFileGate::new(paths.enrollment_file()));
        let store = Arc::new(CredentialStore::new(Box::new(storage), gate));
        let state = Arc::new(StateFile::load(paths)?);
        let api = Arc::new(AuthClient::new(config.auth_url.clone()));
        Ok(Self::new(api, store, state, SessionConfig::from_config(config)))
    }

    /// Subscribe to committed session snapshots, one per transition.
    pub fn subscribe(&self) -> broadcast::Receiver<Session> {
        self.events.subscribe()
    }

    /// Snapshot the current session.
    pub fn current_session(&self) -> Session {
        self.lock_inner().session.clone()
    }

    /// The access token for API calls, if a session is live.
    pub fn access_token(&self) -> SessionResult<Option<String>> {
        if !self.lock_inner().session.is_authenticated() {
            return Ok(None);
        }
        Ok(self.store.load(CredentialKind::Access, None)?)
    }

    /// Resume the session at process start.
    ///
    /// Prefers a biometric-gated refresh when a refresh token is stored;
    /// falls back to the stored access token as an optimistic warm start;
    /// otherwise stays logged out.
    pub async fn bootstrap(&self) -> SessionResult<Session> {
        let _op = self.op_lock.lock().await;

        if self.store.exists(CredentialKind::Refresh)? {
            return self.refresh_with_gate().await;
        }

        if self.store.exists(CredentialKind::Access)? {
            let profile = self
                .state
                .profile()
                .unwrap_or_else(|| Profile::fallback(&self.config.default_franchise_id));
            info!("warm start from stored access token");
            let mut inner = self.lock_inner();
            return Self::transition_locked(&mut inner, &self.events, SessionMachineInput::WarmStart, |s| {
                s.state = SessionState::Authenticated { profile };
                s.message = None;
            });
        }

        debug!("no stored credentials; starting logged out");
        Ok(self.current_session())
    }

    /// Request a one-time code for `email`.
    ///
    /// During the login flow a success moves the session to awaiting
    /// verification; from any other state it only posts the status message.
    pub async fn request_code(&self, email: &str) -> SessionResult<Session> {
        let _op = self.op_lock.lock().await;

        match self.api.send_code(email).await {
            Ok(()) => {
                let email = normalize_email(email);
                let mut inner = self.lock_inner();
                let in_login_flow = matches!(
                    inner.session.state,
                    SessionState::LoggedOut | SessionState::AwaitingVerification { .. }
                );
                if in_login_flow {
                    Self::transition_locked(&mut inner, &self.events, SessionMachineInput::CodeSent, |s| {
                        s.state = SessionState::AwaitingVerification { email };
                        s.message = Some(MSG_CODE_SENT.to_string());
                    })
                } else {
                    Ok(Self::apply_locked(&mut inner, &self.events, |s| {
                        s.message = Some(MSG_CODE_SENT.to_string());
                    }))
                }
            }
            Err(err) => {
                self.post_message(err.to_string());
                Err(err.into())
            }
        }
    }

    /// Exchange an emailed code for a token pair and open a session.
    pub async fn verify_code(&self, email: &str, code: &str) -> SessionResult<Session> {
        let _op = self.op_lock.lock().await;

        let device_id = self.identity.get()?;
        let device = DeviceContext::new(device_id, self.config.device_name.clone());
        let epoch = self.lock_inner().epoch;

        match self.api.verify_code(email, code, &device).await {
            Ok(credentials) => self.complete_verify(epoch, credentials),
            Err(err) => {
                self.post_message(err.to_string());
                Err(err.into())
            }
        }
    }

    /// Open a session from the stored refresh token, gated by a biometric
    /// check. Fails fast with guidance when no refresh token is stored.
    pub async fn biometric_login(&self) -> SessionResult<Session> {
        let _op = self.op_lock.lock().await;

        if !self.store.exists(CredentialKind::Refresh)? {
            self.post_message(MSG_NO_BIOMETRIC_SETUP.to_string());
            return Err(SessionError::RefreshTokenMissing);
        }

        self.refresh_with_gate().await
    }

    /// Sign out now.
    ///
    /// Clears the access token and the persisted logged-in flag. The
    /// refresh token's fate follows [`LogoutPolicy`]. Deliberately does not
    /// queue behind the operation lock; any in-flight operation's
    /// completion is discarded by the epoch check.
    pub fn logout(&self) -> SessionResult<Session> {
        let mut inner = self.lock_inner();

        self.store.delete(CredentialKind::Access)?;
        if self.config.logout_policy == LogoutPolicy::ClearRefreshToken {
            self.store.delete(CredentialKind::Refresh)?;
        }
        self.state.update(|s| s.logged_in = false)?;

        info!("signed out");
        Self::transition_locked(&mut inner, &self.events, SessionMachineInput::Logout, |s| {
            s.state = SessionState::LoggedOut;
            s.logged_in = false;
            s.message = None;
        })
    }

    /// Run the refresh exchange: mark the session refreshing, read the
    /// gated refresh token off the async runtime, call the endpoint, and
    /// commit the outcome unless the session moved on in the meantime.
    async fn refresh_with_gate(&self) -> SessionResult<Session> {
        let epoch = {
            let mut inner = self.lock_inner();
            Self::transition_locked(&mut inner, &self.events, SessionMachineInput::BeginRefresh, |s| {
                s.state = SessionState::Refreshing;
                s.message = None;
            })?;
            inner.epoch
        };

        // The gated load can block on the user answering the prompt
        let store = Arc::clone(&self.store);
        let prompt = self.config.refresh_prompt.clone();
        let loaded =
            tokio::task::spawn_blocking(move || store.load(CredentialKind::Refresh, Some(&prompt)))
                .await
                .map_err(|e| SessionError::Task(e.to_string()))?;

        let refresh_token = match loaded {
            Ok(Some(token)) => token,
            Ok(None) => {
                return self.fail_refresh(
                    epoch,
                    MSG_NO_BIOMETRIC_SETUP.to_string(),
                    SessionError::RefreshTokenMissing,
                )
            }
            Err(err) => {
                let message = err.to_string();
                return self.fail_refresh(epoch, message, err.into());
            }
        };

        let device_id = self.identity.get()?;
        match self.api.refresh(&device_id, &refresh_token).await {
            Ok(credentials) => self.complete_refresh(epoch, credentials),
            Err(err) => {
                let message = err.to_string();
                self.fail_refresh(epoch, message, err.into())
            }
        }
    }

    fn complete_verify(
        &self,
        epoch: u64,
        credentials: VerifiedCredentials,
    ) -> SessionResult<Session> {
        let mut inner = self.lock_inner();
        if inner.epoch != epoch {
            debug!("discarding stale verify completion");
            return Err(SessionError::Stale);
        }

        // Both tokens and the state record are written before the session
        // transition commits; a later failure rolls back the earlier write
        if let Err(err) = self
            .store
            .save(CredentialKind::Access, &credentials.access_token, Protection::Standard)
        {
            Self::apply_locked(&mut inner, &self.events, |s| s.message = Some(err.to_string()));
            return Err(err.into());
        }
        if let Err(err) = self.store.save(
            CredentialKind::Refresh,
            &credentials.refresh_token,
            Protection::BiometricGated,
        ) {
            let _ = self.store.delete(CredentialKind::Access);
            Self::apply_locked(&mut inner, &self.events, |s| s.message = Some(err.to_string()));
            return Err(err.into());
        }

        let profile = Profile::from_user(credentials.user, &self.config.default_franchise_id);
        self.state.update(|s| {
            s.logged_in = true;
            s.profile = Some(profile.clone());
        })?;

        info!(username = %profile.username, "signed in with one-time code");
        Self::transition_locked(&mut inner, &self.events, SessionMachineInput::VerifyOk, |s| {
            s.state = SessionState::Authenticated { profile };
            s.logged_in = true;
            s.message = None;
        })
    }

    fn complete_refresh(
        &self,
        epoch: u64,
        credentials: RefreshedCredentials,
    ) -> SessionResult<Session> {
        let mut inner = self.lock_inner();
        if inner.epoch != epoch {
            debug!("discarding stale refresh completion");
            return Err(SessionError::Stale);
        }

        if let Err(err) = self
            .store
            .save(CredentialKind::Access, &credentials.access_token, Protection::Standard)
        {
            let message = err.to_string();
            Self::transition_locked(&mut inner, &self.events, SessionMachineInput::RefreshErr, |s| {
                s.state = SessionState::LoggedOut;
                s.message = Some(message);
            })?;
            return Err(err.into());
        }

        // The stored refresh token stays authoritative unless the server
        // rotated it
        if let Some(rotated) = &credentials.refresh_token {
            if let Err(err) =
                self.store
                    .save(CredentialKind::Refresh, rotated, Protection::BiometricGated)
            {
                let message = err.to_string();
                Self::transition_locked(&mut inner, &self.events, SessionMachineInput::RefreshErr, |s| {
                    s.state = SessionState::LoggedOut;
                    s.message = Some(message);
                })?;
                return Err(err.into());
            }
        }

        let profile = Profile::from_user(credentials.user, &self.config.default_franchise_id);
        self.state.update(|s| {
            s.logged_in = true;
            s.profile = Some(profile.clone());
        })?;

        info!(username = %profile.username, "session refreshed");
        Self::transition_locked(&mut inner, &self.events, SessionMachineInput::RefreshOk, |s| {
            s.state = SessionState::Authenticated { profile };
            s.logged_in = true;
            s.message = None;
        })
    }

    /// Commit a failed refresh: back to logged out with a message. The
    /// refresh token is left in place so a later attempt can retry.
    fn fail_refresh(
        &self,
        epoch: u64,
        message: String,
        err: SessionError,
    ) -> SessionResult<Session> {
        let mut inner = self.lock_inner();
        if inner.epoch != epoch {
            debug!("discarding stale refresh failure");
            return Err(SessionError::Stale);
        }

        warn!(error = %err, "refresh failed");
        Self::transition_locked(&mut inner, &self.events, SessionMachineInput::RefreshErr, |s| {
            s.state = SessionState::LoggedOut;
            s.message = Some(message);
        })?;
        Err(err)
    }

    /// Post a user-facing message without moving the state machine.
    fn post_message(&self, message: String) {
        let mut inner = self.lock_inner();
        Self::apply_locked(&mut inner, &self.events, |s| s.message = Some(message));
    }

    fn lock_inner(&self) -> MutexGuard<'_, Inner> {
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Consume a state-machine input, then commit the session mutation.
    /// An impossible transition aborts before anything is mutated.
    fn transition_locked(
        inner: &mut Inner,
        events: &broadcast::Sender<Session>,
        input: SessionMachineInput,
        mutate: impl FnOnce(&mut Session),
    ) -> SessionResult<Session> {
        let from = format!("{:?}", inner.machine.state());
        inner
            .machine
            .consume(&input)
            .map_err(|_| SessionError::Transition(format!("{input:?} from {from}")))?;
        Ok(Self::apply_locked(inner, events, mutate))
    }

    /// Commit a session mutation: bump the epoch and broadcast the snapshot.
    fn apply_locked(
        inner: &mut Inner,
        events: &broadcast::Sender<Session>,
        mutate: impl FnOnce(&mut Session),
    ) -> Session {
        mutate(&mut inner.session);
        inner.epoch += 1;
        let snapshot = inner.session.clone();
        let _ = events.send(snapshot.clone());
        snapshot
    }
}
