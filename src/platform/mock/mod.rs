//! Mock platform implementation for testing
//!
//! This module provides mock implementations of the platform traits that can be
//! used for unit and integration testing without a radio or BLE stack.
//!
//! # Feature Gate
//!
//! This module is available in two contexts:
//! - During test builds (`#[cfg(test)]`)
//! - When the `mock` feature is enabled (host only, links `std`)
//!
//! # Example
//!
//! ```ignore
//! use nearby_uwb::platform::mock::{MockUwbHal, UwbOp};
//! use nearby_uwb::platform::traits::UwbHal;
//! use nearby_uwb::session::types::SessionType;
//!
//! let mut hal = MockUwbHal::new();
//! let handle = hal.session_init(7, SessionType::Ranging)?;
//!
//! hal.fail_on(UwbOp::StartRanging, UwbError::InvalidState);
//! assert!(hal.start_ranging(handle).is_err());
//! ```

#![cfg(any(test, feature = "mock"))]

mod ble;
mod uwb;

pub use ble::MockBleLink;
pub use uwb::{MockUwbHal, UwbCall, UwbOp, SESSION_NOT_EXIST};
