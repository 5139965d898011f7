//! Session and credential lifecycle for the Homegrid mobile client.
//!
//! Ties the auth endpoint, the credential store, and the persisted client
//! state together behind one orchestrator:
//! - [`DeviceIdentity`]: stable per-install device id
//! - [`StateFile`]: small persisted record (device id, logged-in flag,
//!   profile)
//! - [`SessionMachine`]: the legal lifecycle transitions
//! - [`SessionManager`]: the entry points the UI calls, with committed
//!   snapshots broadcast to subscribers

mod error;
mod fsm;
mod identity;
mod manager;
mod session;
mod state;

pub use error::{SessionError, SessionResult};
pub use fsm::{SessionMachine, SessionMachineInput, SessionMachineState};
pub use identity::DeviceIdentity;
pub use manager::{LogoutPolicy, SessionConfig, SessionManager};
pub use session::{Profile, Session, SessionState};
pub use state::{PersistedState, StateFile};
