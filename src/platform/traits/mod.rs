//! Platform abstraction traits
//!
//! This module defines the traits that the radio driver and BLE stack glue
//! must provide.

pub mod ble;
pub mod uwb;

// Re-export trait interfaces
pub use ble::{
    BleLink, CharacteristicProps, CharacteristicSpec, GattLayout, PeerId, MAX_CHARACTERISTIC_LEN,
};
pub use uwb::UwbHal;
