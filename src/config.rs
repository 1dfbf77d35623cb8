//! Build-time configuration
//!
//! Defaults are baked in by `build.rs` from environment variables:
//! - `NEARBY_DEVICE_NAME` - advertised name (default "UWB Accessory")
//! - `NEARBY_LOCK_TIMEOUT_TICKS` - bounded wait for task-context registry
//!   access (default 100)
//!
//! # Example
//!
//! ```ignore
//! use nearby_uwb::config::NearbyConfig;
//!
//! let config = NearbyConfig::from_build_env().with_accessory_config(&blob)?;
//! ```

use crate::platform::{error::UwbError, traits::MAX_CHARACTERISTIC_LEN, Result};
use heapless::{String, Vec};

pub use crate::session::registry::MAX_SESSIONS;

/// Maximum simultaneously connected phones
pub const MAX_PEERS: usize = 5;

/// Maximum device name length
pub const MAX_DEVICE_NAME_LEN: usize = 32;

/// Longest accessory configuration blob; leaves room for the record header
/// when the blob is sent as a notification
pub const MAX_ACCESSORY_CONFIG_LEN: usize = MAX_CHARACTERISTIC_LEN - 2;

/// Fallback when `NEARBY_LOCK_TIMEOUT_TICKS` does not parse
pub const DEFAULT_LOCK_TIMEOUT_TICKS: u64 = 100;

const DEFAULT_DEVICE_NAME: &str = "UWB Accessory";

/// Control channel configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NearbyConfig {
    /// Advertised device name
    pub device_name: String<MAX_DEVICE_NAME_LEN>,
    /// Bounded wait, in time-source ticks, for task-context lock acquisition
    pub lock_timeout_ticks: u64,
    /// Value served on the read-only accessory configuration characteristic
    pub accessory_config: Vec<u8, MAX_ACCESSORY_CONFIG_LEN>,
}

impl NearbyConfig {
    /// Load defaults captured at build time
    ///
    /// Falls back to the built-in defaults for values that do not parse or do
    /// not fit.
    pub fn from_build_env() -> Self {
        let name = env!("NEARBY_DEVICE_NAME");
        let ticks = env!("NEARBY_LOCK_TIMEOUT_TICKS");

        Self {
            device_name: parse_device_name(name),
            lock_timeout_ticks: parse_ticks(ticks),
            accessory_config: Vec::new(),
        }
    }

    /// Replace the accessory configuration blob
    ///
    /// # Errors
    ///
    /// `CapacityExceeded` if `data` is longer than [`MAX_ACCESSORY_CONFIG_LEN`].
    pub fn with_accessory_config(mut self, data: &[u8]) -> Result<Self> {
        self.accessory_config =
            Vec::from_slice(data).map_err(|_| UwbError::CapacityExceeded)?;
        Ok(self)
    }

    pub fn with_lock_timeout(mut self, ticks: u64) -> Self {
        self.lock_timeout_ticks = ticks;
        self
    }
}

impl Default for NearbyConfig {
    fn default() -> Self {
        Self {
            device_name: parse_device_name(DEFAULT_DEVICE_NAME),
            lock_timeout_ticks: DEFAULT_LOCK_TIMEOUT_TICKS,
            accessory_config: Vec::new(),
        }
    }
}

fn parse_device_name(name: &str) -> String<MAX_DEVICE_NAME_LEN> {
    String::try_from(name)
        .or_else(|_| String::try_from(DEFAULT_DEVICE_NAME))
        .unwrap_or_else(|_| String::new())
}

fn parse_ticks(ticks: &str) -> u64 {
    ticks.trim().parse().unwrap_or(DEFAULT_LOCK_TIMEOUT_TICKS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = NearbyConfig::default();
        assert_eq!(config.device_name.as_str(), "UWB Accessory");
        assert_eq!(config.lock_timeout_ticks, 100);
        assert!(config.accessory_config.is_empty());
    }

    #[test]
    fn test_from_build_env_parses() {
        let config = NearbyConfig::from_build_env();
        assert!(!config.device_name.is_empty());
        assert!(config.lock_timeout_ticks > 0);
    }

    #[test]
    fn test_parse_ticks_fallback() {
        assert_eq!(parse_ticks(" 250 "), 250);
        assert_eq!(parse_ticks("soon"), DEFAULT_LOCK_TIMEOUT_TICKS);
        assert_eq!(parse_ticks(""), DEFAULT_LOCK_TIMEOUT_TICKS);
    }

    #[test]
    fn test_parse_device_name_too_long() {
        let long = "x".repeat(MAX_DEVICE_NAME_LEN + 1);
        assert_eq!(parse_device_name(&long).as_str(), DEFAULT_DEVICE_NAME);
    }

    #[test]
    fn test_accessory_config_capacity() {
        let config = NearbyConfig::default()
            .with_accessory_config(&[1, 2, 3])
            .unwrap();
        assert_eq!(config.accessory_config.as_slice(), &[1, 2, 3]);

        let oversized = [0u8; MAX_ACCESSORY_CONFIG_LEN + 1];
        assert_eq!(
            NearbyConfig::default().with_accessory_config(&oversized),
            Err(UwbError::CapacityExceeded)
        );
    }
}
