//! Core infrastructure
//!
//! Logging macros plus the synchronization and time primitives shared by the
//! session registry and the BLE control channel.

pub mod logging;
pub mod traits;
