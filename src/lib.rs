#![cfg_attr(not(test), no_std)]

//! nearby_uwb - UWB ranging session orchestration over a BLE control channel
//!
//! This library keeps a bounded registry of UWB ranging sessions, drives each
//! session through its hardware configuration and ranging lifecycle, and lets a
//! phone trigger that lifecycle through TLV commands written to a BLE
//! characteristic.
//!
//! The radio driver and the BLE stack are external collaborators reached through
//! the traits in [`platform::traits`].

// Mocks use std collections on the host
#[cfg(all(feature = "mock", not(test)))]
extern crate std;

// Logging, synchronization and time primitives
pub mod core;

// Hardware seams (UWB HAL, BLE link) and their test doubles
pub mod platform;

// Build-time configuration
pub mod config;

// Session model: parameter builders, sessions, registry
pub mod session;

// BLE control protocol
pub mod communication;
