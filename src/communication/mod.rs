//! Communication Protocols
//!
//! # Protocols
//!
//! - **Nearby accessory protocol**: TLV commands written by a phone to a BLE
//!   characteristic drive the UWB session lifecycle; status and errors come
//!   back as notifications.

pub mod nearby;
