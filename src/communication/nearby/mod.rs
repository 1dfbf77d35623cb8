//! Nearby accessory control protocol over BLE
//!
//! # Architecture
//!
//! ```text
//! BLE stack ──connect/disconnect (ISR)──┐
//!           ──command write (task)──────┤
//!                                       ▼
//!                              ControlChannel
//!                     ┌──────── BinaryLock ────────┐
//!                     │ SessionRegistry  PeerTable │
//!                     │ UwbHal                     │
//!                     └────────────────────────────┘
//!                                       │
//!           ◄──notify (UwbDidStart/Stop, Error)
//! ```
//!
//! - [`tlv`]: record codec and tag space
//! - [`peers`]: connected phones and the session each one controls
//! - [`channel`]: the orchestrator

pub mod channel;
pub mod peers;
pub mod tlv;

pub use channel::{ChannelState, ControlChannel, PeerCallback};
pub use peers::{LinkState, PeerLink, PeerTable};
pub use tlv::{Command, Notification};
