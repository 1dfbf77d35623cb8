//! UWB session model
//!
//! - [`params`]: bounded parameter collections and entry builders
//! - [`config`]: typed ranging, application and vendor parameter sets
//! - [`types`]: handles, session types and states, addresses, data packets
//! - [`lifecycle`]: one session and its hardware lifecycle
//! - [`registry`]: bounded, compacting session table
//! - [`profiles`]: ready-made session configurations

pub mod config;
pub mod lifecycle;
pub mod params;
pub mod profiles;
pub mod registry;
pub mod types;

pub use config::{AppConfigId, AppParams, RangingParams, VendorParams};
pub use lifecycle::Session;
pub use registry::{SessionRegistry, MAX_SESSIONS};
pub use types::{MacAddress, SessionHandle, SessionState, SessionType, INVALID_HANDLE};
