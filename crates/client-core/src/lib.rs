//! Core types, configuration, and utilities for the Homegrid mobile client.

mod config;
mod error;
mod logging;
mod paths;

pub use config::{Config, DEFAULT_AUTH_URL, DEFAULT_FRANCHISE_ID, DEFAULT_LOG_LEVEL};
pub use error::{CoreError, CoreResult};
pub use logging::{init_logging, parse_level};
pub use paths::Paths;
