//! Platform abstraction layer
//!
//! Hardware seams consumed by the session layer: the UWB radio driver and the
//! BLE stack. Board bring-up and the concrete drivers live outside this crate.

pub mod error;
pub mod traits;

#[cfg(any(test, feature = "mock"))]
pub mod mock;

// Re-export commonly used types
pub use error::{Result, UwbError};
pub use traits::{BleLink, PeerId, UwbHal};
