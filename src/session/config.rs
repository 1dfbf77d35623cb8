//! Typed ranging, application and vendor parameter sets
//!
//! Identifiers follow the FiRa UCI application configuration numbering.
//! Setters only populate the collection; legality of values is checked by the
//! hardware when the collection is pushed.

use super::params::{ParamBytes, ParamCollection};
use super::types::MacAddress;
use crate::platform::error::{Result, UwbError};

/// Ranging parameter capacity per session
pub const RANGING_PARAM_CAPACITY: usize = 8;

/// Application parameter capacity per session
pub const APP_PARAM_CAPACITY: usize = 20;

/// Vendor parameter capacity per session
pub const VENDOR_PARAM_CAPACITY: usize = 4;

/// Core ranging parameters (addressing and role), pushed first
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum RangingParamId {
    DeviceType = 0x00,
    RangingRoundUsage = 0x01,
    MultiNodeMode = 0x03,
    DeviceMacAddress = 0x06,
    DeviceRole = 0x11,
    ScheduledMode = 0x22,
}

/// Application configuration parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum AppConfigId {
    StsConfig = 0x02,
    Channel = 0x04,
    NumControlees = 0x05,
    PeerAddress = 0x07,
    SlotDuration = 0x08,
    RangingDuration = 0x09,
    MacFcsType = 0x0B,
    RangingRoundControl = 0x0C,
    RFrameConfig = 0x12,
    PreambleCodeIndex = 0x14,
    SfdId = 0x15,
    SlotsPerRound = 0x1B,
    NumStsSegments = 0x29,
    MaxRrRetry = 0x2A,
    UlTdoaTxInterval = 0x33,
    UlTdoaDeviceId = 0x38,
    UlTdoaTxTimestamp = 0x39,
}

/// Vendor-specific parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum VendorConfigId {
    AntennaeConfigurationTx = 0x60,
    AntennaeConfigurationRx = 0x61,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum DeviceRole {
    Responder = 0,
    Initiator = 1,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum DeviceType {
    Controlee = 0,
    Controller = 1,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum MultiNodeMode {
    Unicast = 0,
    Multicast = 1,
    ManyToMany = 2,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum RangingMethod {
    OwrTdoa = 0,
    SsTwr = 1,
    DsTwr = 2,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum ScheduledMode {
    ContentionBased = 0,
    TimeScheduled = 1,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum StsConfig {
    StaticSts = 0,
    DynamicSts = 1,
    DynamicStsIndividualKey = 2,
    ProvisionedSts = 3,
    ProvisionedStsIndividualKey = 4,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum RfFrameConfig {
    Sp0 = 0,
    Sp1 = 1,
    Sp3 = 3,
}

pub type RangingParams = ParamCollection<RangingParamId, RANGING_PARAM_CAPACITY>;
pub type AppParams = ParamCollection<AppConfigId, APP_PARAM_CAPACITY>;
pub type VendorParams = ParamCollection<VendorConfigId, VENDOR_PARAM_CAPACITY>;

impl RangingParams {
    pub fn device_role(&mut self, role: DeviceRole) -> Result<()> {
        self.set_scalar(RangingParamId::DeviceRole, role as u32)
    }

    pub fn device_type(&mut self, device_type: DeviceType) -> Result<()> {
        self.set_scalar(RangingParamId::DeviceType, device_type as u32)
    }

    pub fn multi_node_mode(&mut self, mode: MultiNodeMode) -> Result<()> {
        self.set_scalar(RangingParamId::MultiNodeMode, mode as u32)
    }

    pub fn ranging_round_usage(&mut self, method: RangingMethod) -> Result<()> {
        self.set_scalar(RangingParamId::RangingRoundUsage, method as u32)
    }

    pub fn scheduled_mode(&mut self, mode: ScheduledMode) -> Result<()> {
        self.set_scalar(RangingParamId::ScheduledMode, mode as u32)
    }

    pub fn device_mac_address(&mut self, addr: MacAddress) -> Result<()> {
        self.set_array(RangingParamId::DeviceMacAddress, addr.as_bytes())
    }
}

impl AppParams {
    /// UWB channel (5 or 9 on most radios)
    pub fn channel(&mut self, channel: u32) -> Result<()> {
        self.set_scalar(AppConfigId::Channel, channel)
    }

    pub fn preamble_code_index(&mut self, index: u32) -> Result<()> {
        self.set_scalar(AppConfigId::PreambleCodeIndex, index)
    }

    pub fn sfd_id(&mut self, sfd_id: u32) -> Result<()> {
        self.set_scalar(AppConfigId::SfdId, sfd_id)
    }

    /// Ranging interval in milliseconds
    pub fn ranging_duration(&mut self, duration_ms: u32) -> Result<()> {
        self.set_scalar(AppConfigId::RangingDuration, duration_ms)
    }

    pub fn slots_per_round(&mut self, slots: u32) -> Result<()> {
        self.set_scalar(AppConfigId::SlotsPerRound, slots)
    }

    /// Slot duration in RSTU
    pub fn slot_duration(&mut self, duration: u32) -> Result<()> {
        self.set_scalar(AppConfigId::SlotDuration, duration)
    }

    pub fn sts_config(&mut self, sts: StsConfig) -> Result<()> {
        self.set_scalar(AppConfigId::StsConfig, sts as u32)
    }

    pub fn sts_segments(&mut self, segments: u8) -> Result<()> {
        self.set_scalar(AppConfigId::NumStsSegments, segments.into())
    }

    pub fn frame_config(&mut self, config: RfFrameConfig) -> Result<()> {
        self.set_scalar(AppConfigId::RFrameConfig, config as u32)
    }

    pub fn ranging_round_control(&mut self, control: u8) -> Result<()> {
        self.set_scalar(AppConfigId::RangingRoundControl, control.into())
    }

    pub fn max_retries(&mut self, retries: u16) -> Result<()> {
        self.set_scalar(AppConfigId::MaxRrRetry, retries.into())
    }

    pub fn uplink_tdoa_timestamp(&mut self, mode: u8) -> Result<()> {
        self.set_scalar(AppConfigId::UlTdoaTxTimestamp, mode.into())
    }

    pub fn tdoa_device_id(&mut self, id: &[u8]) -> Result<()> {
        self.set_array(AppConfigId::UlTdoaDeviceId, id)
    }

    pub fn tdoa_tx_interval(&mut self, interval: u32) -> Result<()> {
        self.set_scalar(AppConfigId::UlTdoaTxInterval, interval)
    }

    pub fn mac_fcs_type(&mut self, fcs_type: u8) -> Result<()> {
        self.set_scalar(AppConfigId::MacFcsType, fcs_type.into())
    }

    pub fn num_controlees(&mut self, count: u8) -> Result<()> {
        self.set_scalar(AppConfigId::NumControlees, count.into())
    }

    pub fn destination_mac_address(&mut self, addr: MacAddress) -> Result<()> {
        self.set_array(AppConfigId::PeerAddress, addr.as_bytes())
    }

    /// Concatenated destination list for one-to-many sessions
    ///
    /// # Errors
    ///
    /// `CapacityExceeded` if the concatenated addresses do not fit in one
    /// array parameter.
    pub fn destination_mac_addresses(&mut self, addrs: &[MacAddress]) -> Result<()> {
        let mut bytes = ParamBytes::new();
        for addr in addrs {
            bytes
                .extend_from_slice(addr.as_bytes())
                .map_err(|_| UwbError::CapacityExceeded)?;
        }
        self.set_array(AppConfigId::PeerAddress, &bytes)
    }
}

impl VendorParams {
    pub fn antennae_configuration_rx(&mut self, config: &[u8]) -> Result<()> {
        self.set_array(VendorConfigId::AntennaeConfigurationRx, config)
    }

    pub fn antennae_configuration_tx(&mut self, config: &[u8]) -> Result<()> {
        self.set_array(VendorConfigId::AntennaeConfigurationTx, config)
    }
}
