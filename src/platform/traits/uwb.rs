//! UWB hardware abstraction
//!
//! Boundary to the vendor radio driver/firmware. Wire formats, timing and
//! STS generation live behind this trait.

use crate::platform::Result;
use crate::session::config::{AppConfigId, AppParams, RangingParams, VendorParams};
use crate::session::types::{DataPacket, SessionHandle, SessionState, SessionType};

/// UWB radio session control interface
///
/// Every operation reports its outcome as `Result`; implementations map vendor
/// status codes onto `UwbError`. Callers never retry.
///
/// # Example
///
/// ```ignore
/// fn bring_up<H: UwbHal>(hal: &mut H) -> Result<SessionHandle> {
///     let handle = hal.session_init(0x1234, SessionType::Ranging)?;
///     hal.start_ranging(handle)?;
///     Ok(handle)
/// }
/// ```
pub trait UwbHal {
    /// Create a hardware session for `session_id` and return its handle
    ///
    /// # Errors
    ///
    /// Typically `UwbError::HardwareInitFailure`.
    fn session_init(&mut self, session_id: u32, session_type: SessionType)
        -> Result<SessionHandle>;

    /// Release the hardware session
    fn session_deinit(&mut self, handle: SessionHandle) -> Result<()>;

    /// Push core ranging parameters (role, addressing)
    fn set_ranging_params(&mut self, handle: SessionHandle, params: &RangingParams) -> Result<()>;

    /// Push application parameters in collection order
    fn set_app_config_multiple(&mut self, handle: SessionHandle, params: &AppParams)
        -> Result<()>;

    /// Push vendor parameters in collection order
    fn set_vendor_app_config(&mut self, handle: SessionHandle, params: &VendorParams)
        -> Result<()>;

    /// Push a single scalar application parameter
    fn set_app_config(&mut self, handle: SessionHandle, id: AppConfigId, value: u32)
        -> Result<()>;

    /// Configure range data notifications
    ///
    /// `mode` selects always/never/proximity; `near_cm`/`far_cm` bound the
    /// proximity window.
    fn enable_ranging_notifications(
        &mut self,
        handle: SessionHandle,
        mode: u8,
        near_cm: u16,
        far_cm: u16,
    ) -> Result<()>;

    /// Configure static STS with vendor id and 6-byte IV
    fn set_static_sts(&mut self, handle: SessionHandle, vendor_id: u16, iv: &[u8; 6])
        -> Result<()>;

    /// Query the session state
    fn session_state(&mut self, handle: SessionHandle) -> Result<SessionState>;

    fn start_ranging(&mut self, handle: SessionHandle) -> Result<()>;

    fn stop_ranging(&mut self, handle: SessionHandle) -> Result<()>;

    /// Queue an in-band data packet
    fn send_data(&mut self, packet: &DataPacket<'_>) -> Result<()>;
}
