//! BLE peripheral link
//!
//! The GATT server, advertising and bonding belong to the BLE stack. The
//! control channel only needs to publish the accessory configuration and push
//! notifications to a connected central.

use crate::platform::Result;
use bitflags::bitflags;
use core::fmt;

/// Largest value written to or notified from a characteristic
pub const MAX_CHARACTERISTIC_LEN: usize = 128;

/// BLE address of a connected central
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PeerId(pub [u8; 6]);

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let a = self.0;
        write!(
            f,
            "{:02X}:{:02X}:{:02X}:{:02X}:{:02X}:{:02X}",
            a[5], a[4], a[3], a[2], a[1], a[0]
        )
    }
}

bitflags! {
    /// GATT characteristic properties
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct CharacteristicProps: u8 {
        const READ = 0x02;
        const WRITE_WITHOUT_RESPONSE = 0x04;
        const WRITE = 0x08;
        const NOTIFY = 0x10;
    }
}

/// One characteristic of the control surface
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CharacteristicSpec {
    pub uuid: &'static str,
    pub props: CharacteristicProps,
    pub max_len: usize,
}

/// Control surface shape: one read-only accessory characteristic, one command
/// input, one notify output. UUIDs are deployment constants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GattLayout {
    pub accessory_service: &'static str,
    pub accessory_config: CharacteristicSpec,
    pub command_service: &'static str,
    pub command_rx: CharacteristicSpec,
    pub status_tx: CharacteristicSpec,
}

impl GattLayout {
    /// Layout used by the reference accessory firmware
    pub const fn nearby() -> Self {
        Self {
            accessory_service: "48FE3E40-0817-4BB2-8633-3073689C2DBA",
            accessory_config: CharacteristicSpec {
                uuid: "95E8D9D5-D8EF-4721-9A4E-807375F53328",
                props: CharacteristicProps::READ,
                max_len: MAX_CHARACTERISTIC_LEN,
            },
            command_service: "6E400001-B5A3-F393-E0A9-E50E24DCCA9E",
            command_rx: CharacteristicSpec {
                uuid: "6E400002-B5A3-F393-E0A9-E50E24DCCA9E",
                props: CharacteristicProps::WRITE
                    .union(CharacteristicProps::WRITE_WITHOUT_RESPONSE),
                max_len: MAX_CHARACTERISTIC_LEN,
            },
            status_tx: CharacteristicSpec {
                uuid: "6E400003-B5A3-F393-E0A9-E50E24DCCA9E",
                props: CharacteristicProps::NOTIFY,
                max_len: MAX_CHARACTERISTIC_LEN,
            },
        }
    }
}

/// Outbound side of the BLE control surface
pub trait BleLink {
    /// Set the value of the read-only accessory configuration characteristic
    fn set_accessory_config(&mut self, data: &[u8]) -> Result<()>;

    /// Notify `peer` on the status characteristic
    fn notify(&mut self, peer: PeerId, data: &[u8]) -> Result<()>;
}
