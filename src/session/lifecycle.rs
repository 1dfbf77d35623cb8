//! UWB ranging session
//!
//! A `Session` owns one ranging configuration and forwards its lifecycle to the
//! hardware abstraction. It never retries: every hardware status is returned
//! to the caller unchanged.
//!
//! # Lifecycle
//!
//! ```text
//! new ──set_id/set_type──> configured ──initialize──> initialized
//!                                                     │  start ▲ stop
//!                                                     ▼        │
//!                                                   active ────┘
//! initialized/active ──deinitialize──> handle = INVALID_HANDLE
//! ```

use super::config::{AppConfigId, AppParams, RangingParams, RfFrameConfig, StsConfig, VendorParams};
use super::types::{
    DataPacket, SessionHandle, SessionState, SessionType, DATA_MAC_ADDRESS_LEN, INVALID_HANDLE,
    MAX_DATA_LEN,
};
use crate::platform::{error::UwbError, traits::UwbHal, Result};

/// Receive antenna configuration every new session starts with
pub const DEFAULT_ANTENNAE_CONFIGURATION_RX: [u8; 3] = [1, 0x01, 1];

/// One UWB ranging session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    id: u32,
    handle: SessionHandle,
    session_type: SessionType,
    active: bool,
    /// Addressing and role; pushed first
    pub ranging_params: RangingParams,
    /// Application parameters; optional stage
    pub app_params: AppParams,
    /// Vendor parameters; optional stage
    pub vendor_params: VendorParams,
}

impl Session {
    /// Create an unconfigured ranging session with id 0
    pub fn new() -> Self {
        let mut vendor_params = VendorParams::new();
        // Fits: empty collection, 3-byte value
        let _ = vendor_params.antennae_configuration_rx(&DEFAULT_ANTENNAE_CONFIGURATION_RX);

        Self {
            id: 0,
            handle: INVALID_HANDLE,
            session_type: SessionType::Ranging,
            active: false,
            ranging_params: RangingParams::new(),
            app_params: AppParams::new(),
            vendor_params,
        }
    }

    /// Create a session with the given identity
    pub fn with_identity(id: u32, session_type: SessionType) -> Self {
        let mut session = Self::new();
        session.set_id(id);
        session.set_type(session_type);
        session
    }

    /// Fresh session carrying only this session's identity
    pub fn identity_clone(&self) -> Self {
        Self::with_identity(self.id, self.session_type)
    }

    pub fn set_id(&mut self, id: u32) {
        self.id = id;
    }

    pub fn set_type(&mut self, session_type: SessionType) {
        self.session_type = session_type;
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    /// Hardware handle, `INVALID_HANDLE` until initialized
    pub fn handle(&self) -> SessionHandle {
        self.handle
    }

    pub fn session_type(&self) -> SessionType {
        self.session_type
    }

    /// True between a successful `start` and the next successful `stop`
    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn is_initialized(&self) -> bool {
        self.handle != INVALID_HANDLE
    }

    /// Create the hardware session and push its configuration
    ///
    /// Stages, in order:
    /// 1. `session_init`, storing the returned handle
    /// 2. ranging parameters (role and addressing; everything else depends on them)
    /// 3. application parameters, skipped with a warning when empty
    /// 4. vendor parameters, skipped with a warning when empty
    ///
    /// # Errors
    ///
    /// The first failing stage's status. Later stages are not attempted.
    pub fn initialize<H: UwbHal>(&mut self, hal: &mut H) -> Result<()> {
        self.handle = hal
            .session_init(self.id, self.session_type)
            .inspect_err(|e| crate::log_error!("session {}: init failed: {}", self.id, e))?;

        hal.set_ranging_params(self.handle, &self.ranging_params)
            .inspect_err(|e| {
                crate::log_error!("session {}: ranging params rejected: {}", self.id, e)
            })?;

        if self.app_params.is_empty() {
            crate::log_warn!("session {}: no app params", self.id);
        } else {
            hal.set_app_config_multiple(self.handle, &self.app_params)
                .inspect_err(|e| {
                    crate::log_error!("session {}: app params rejected: {}", self.id, e)
                })?;
        }

        if self.vendor_params.is_empty() {
            crate::log_warn!("session {}: no vendor params", self.id);
        } else {
            hal.set_vendor_app_config(self.handle, &self.vendor_params)
                .inspect_err(|e| {
                    crate::log_error!("session {}: vendor params rejected: {}", self.id, e)
                })?;
        }

        crate::log_info!("session {}: initialized, handle {}", self.id, self.handle);
        Ok(())
    }

    /// Release the hardware session
    ///
    /// Not idempotent: a second call forwards `INVALID_HANDLE` and returns
    /// whatever the hardware reports for it.
    pub fn deinitialize<H: UwbHal>(&mut self, hal: &mut H) -> Result<()> {
        hal.session_deinit(self.handle)?;
        self.handle = INVALID_HANDLE;
        self.active = false;
        Ok(())
    }

    pub fn start<H: UwbHal>(&mut self, hal: &mut H) -> Result<()> {
        hal.start_ranging(self.handle)?;
        self.active = true;
        Ok(())
    }

    pub fn stop<H: UwbHal>(&mut self, hal: &mut H) -> Result<()> {
        hal.stop_ranging(self.handle)?;
        self.active = false;
        Ok(())
    }

    /// Send in-band data to `destination`
    ///
    /// # Errors
    ///
    /// `ParameterRejected` if `data` exceeds [`MAX_DATA_LEN`]; otherwise the
    /// hardware status.
    pub fn send_data<H: UwbHal>(
        &self,
        hal: &mut H,
        data: &[u8],
        sequence_number: u8,
        destination: &[u8; DATA_MAC_ADDRESS_LEN],
    ) -> Result<()> {
        if data.len() > MAX_DATA_LEN {
            return Err(UwbError::ParameterRejected);
        }
        let packet = DataPacket {
            session_handle: self.handle,
            sequence_number,
            mac_address: *destination,
            data,
        };
        hal.send_data(&packet)
    }

    /// Push one application parameter directly to the hardware
    pub fn app_config<H: UwbHal>(&self, hal: &mut H, id: AppConfigId, value: u32) -> Result<()> {
        hal.set_app_config(self.handle, id, value)
    }

    pub fn enable_ranging_notifications<H: UwbHal>(
        &self,
        hal: &mut H,
        mode: u8,
        near_cm: u16,
        far_cm: u16,
    ) -> Result<()> {
        hal.enable_ranging_notifications(self.handle, mode, near_cm, far_cm)
    }

    /// Configure static STS with a 6-byte IV
    pub fn static_sts<H: UwbHal>(&self, hal: &mut H, vendor_id: u16, iv: &[u8; 6]) -> Result<()> {
        hal.set_static_sts(self.handle, vendor_id, iv)
    }

    /// Query the hardware session state
    pub fn state<H: UwbHal>(&self, hal: &mut H) -> Result<SessionState> {
        hal.session_state(self.handle)
    }

    /// Baseline two-way-ranging profile
    ///
    /// SFD 2, 25 slots per round, 200 ms ranging interval, static STS with one
    /// segment, SP3 frames. Override individual parameters afterwards for other
    /// profiles.
    pub fn apply_defaults(&mut self) -> Result<()> {
        self.app_params.sfd_id(2)?;
        self.app_params.slots_per_round(25)?;
        self.app_params.ranging_duration(25 * 8)?;
        self.app_params.sts_config(StsConfig::StaticSts)?;
        self.app_params.sts_segments(1)?;
        self.app_params.frame_config(RfFrameConfig::Sp3)
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}
