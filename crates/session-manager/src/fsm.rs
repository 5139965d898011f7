//! Session lifecycle state machine using rust-fsm.
//!
//! The transition table is the single source of truth for which lifecycle
//! moves are legal. [`crate::SessionManager`] consumes an input here before
//! committing any state change; an impossible transition aborts the commit.
//!
//! ## State Diagram
//!
//! ```text
//! ┌─────────────────┐
//! │    LoggedOut    │ (initial)
//! └────────┬────────┘
//!          │ CodeSent                 │ BeginRefresh
//!          ▼                          ▼
//! ┌───────────────────────┐   ┌─────────────────┐
//! │ AwaitingVerification  │   │   Refreshing    │
//! └────────┬──────────────┘   └────────┬────────┘
//!          │ VerifyOk                  │ RefreshOk / RefreshErr
//!          ▼                           ▼
//! ┌─────────────────┐          Authenticated / LoggedOut
//! │  Authenticated  │
//! └────────┬────────┘
//!          │ Logout (legal from every state)
//!          ▼
//!      LoggedOut
//! ```
//!
//! Payloads (the pending email, the profile) live on
//! [`crate::SessionState`]; the machine only tracks shape.

use rust_fsm::*;

state_machine! {
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub session_machine(LoggedOut)

    LoggedOut => {
        CodeSent => AwaitingVerification,
        VerifyOk => Authenticated,
        BeginRefresh => Refreshing,
        WarmStart => Authenticated,
        Logout => LoggedOut
    },
    AwaitingVerification => {
        // Resending a code stays put
        CodeSent => AwaitingVerification,
        VerifyOk => Authenticated,
        BeginRefresh => Refreshing,
        Logout => LoggedOut
    },
    Refreshing => {
        RefreshOk => Authenticated,
        RefreshErr => LoggedOut,
        Logout => LoggedOut
    },
    Authenticated => {
        // Re-verifying replaces the live session
        VerifyOk => Authenticated,
        Logout => LoggedOut
    }
}

// Re-export the generated types with clearer names
pub use session_machine::Input as SessionMachineInput;
pub use session_machine::State as SessionMachineState;
pub use session_machine::StateMachine as SessionMachine;
