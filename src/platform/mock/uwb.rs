//! Mock UWB hardware for testing

use crate::platform::{error::UwbError, traits::UwbHal, Result};
use crate::session::config::{AppConfigId, AppParams, RangingParams, VendorParams};
use crate::session::types::{DataPacket, SessionHandle, SessionState, SessionType};
use std::vec::Vec;

/// Status reported for operations on a handle the mock does not know
pub const SESSION_NOT_EXIST: UwbError = UwbError::Hardware(0x11);

/// First handle handed out by `session_init`
const FIRST_HANDLE: SessionHandle = 0x100;

/// Hardware operation selector for failure injection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UwbOp {
    SessionInit,
    SessionDeinit,
    SetRangingParams,
    SetAppConfigMultiple,
    SetVendorAppConfig,
    SetAppConfig,
    EnableRangingNotifications,
    SetStaticSts,
    SessionState,
    StartRanging,
    StopRanging,
    SendData,
}

/// Journal entry for one hardware call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UwbCall {
    SessionInit {
        session_id: u32,
        session_type: SessionType,
    },
    SessionDeinit(SessionHandle),
    SetRangingParams {
        handle: SessionHandle,
        count: usize,
    },
    SetAppConfigMultiple {
        handle: SessionHandle,
        count: usize,
    },
    SetVendorAppConfig {
        handle: SessionHandle,
        count: usize,
    },
    SetAppConfig {
        handle: SessionHandle,
        id: AppConfigId,
        value: u32,
    },
    EnableRangingNotifications {
        handle: SessionHandle,
        mode: u8,
        near_cm: u16,
        far_cm: u16,
    },
    SetStaticSts {
        handle: SessionHandle,
        vendor_id: u16,
        iv: [u8; 6],
    },
    SessionState(SessionHandle),
    StartRanging(SessionHandle),
    StopRanging(SessionHandle),
    SendData {
        handle: SessionHandle,
        sequence_number: u8,
        mac_address: [u8; 8],
        len: usize,
    },
}

impl UwbCall {
    /// Operation this call belongs to
    pub fn op(&self) -> UwbOp {
        match self {
            UwbCall::SessionInit { .. } => UwbOp::SessionInit,
            UwbCall::SessionDeinit(_) => UwbOp::SessionDeinit,
            UwbCall::SetRangingParams { .. } => UwbOp::SetRangingParams,
            UwbCall::SetAppConfigMultiple { .. } => UwbOp::SetAppConfigMultiple,
            UwbCall::SetVendorAppConfig { .. } => UwbOp::SetVendorAppConfig,
            UwbCall::SetAppConfig { .. } => UwbOp::SetAppConfig,
            UwbCall::EnableRangingNotifications { .. } => UwbOp::EnableRangingNotifications,
            UwbCall::SetStaticSts { .. } => UwbOp::SetStaticSts,
            UwbCall::SessionState(_) => UwbOp::SessionState,
            UwbCall::StartRanging(_) => UwbOp::StartRanging,
            UwbCall::StopRanging(_) => UwbOp::StopRanging,
            UwbCall::SendData { .. } => UwbOp::SendData,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Failure {
    op: UwbOp,
    handle: Option<SessionHandle>,
    error: UwbError,
}

#[derive(Debug, Clone, Copy)]
struct HwSession {
    handle: SessionHandle,
    session_id: u32,
    state: SessionState,
}

/// Mock UWB radio
///
/// Tracks hardware sessions by handle, journals every call, and fails
/// operations on request so tests can drive each error path.
///
/// Rules mirrored from a FiRa radio:
/// - `session_init` on an id that already has a hardware session fails with
///   `InvalidState`
/// - any call with an unknown handle fails with [`SESSION_NOT_EXIST`]
/// - `start_ranging` while active, or `stop_ranging` while not active, fails
///   with `InvalidState`
#[derive(Debug)]
pub struct MockUwbHal {
    calls: Vec<UwbCall>,
    failures: Vec<Failure>,
    sessions: Vec<HwSession>,
    next_handle: SessionHandle,
}

impl MockUwbHal {
    /// Create a mock radio with no sessions
    pub fn new() -> Self {
        Self {
            calls: Vec::new(),
            failures: Vec::new(),
            sessions: Vec::new(),
            next_handle: FIRST_HANDLE,
        }
    }

    /// Fail every call of `op` with `error`
    pub fn fail_on(&mut self, op: UwbOp, error: UwbError) {
        self.failures.push(Failure {
            op,
            handle: None,
            error,
        });
    }

    /// Fail calls of `op` on `handle` only
    pub fn fail_on_handle(&mut self, op: UwbOp, handle: SessionHandle, error: UwbError) {
        self.failures.push(Failure {
            op,
            handle: Some(handle),
            error,
        });
    }

    /// Remove all injected failures
    pub fn clear_failures(&mut self) {
        self.failures.clear();
    }

    /// Call journal (for test verification)
    pub fn calls(&self) -> &[UwbCall] {
        &self.calls
    }

    /// Number of journaled calls of `op`
    pub fn count(&self, op: UwbOp) -> usize {
        self.calls.iter().filter(|c| c.op() == op).count()
    }

    /// Clear the call journal
    pub fn clear_calls(&mut self) {
        self.calls.clear();
    }

    /// State of the hardware session behind `handle`
    pub fn state_of(&self, handle: SessionHandle) -> Option<SessionState> {
        self.find(handle).map(|s| s.state)
    }

    /// Number of live hardware sessions
    pub fn live_sessions(&self) -> usize {
        self.sessions.len()
    }

    fn injected(&self, op: UwbOp, handle: Option<SessionHandle>) -> Result<()> {
        let hit = self
            .failures
            .iter()
            .find(|f| f.op == op && (f.handle.is_none() || f.handle == handle));
        match hit {
            Some(f) => Err(f.error),
            None => Ok(()),
        }
    }

    fn find(&self, handle: SessionHandle) -> Option<&HwSession> {
        self.sessions.iter().find(|s| s.handle == handle)
    }

    fn find_mut(&mut self, handle: SessionHandle) -> Result<&mut HwSession> {
        self.sessions
            .iter_mut()
            .find(|s| s.handle == handle)
            .ok_or(SESSION_NOT_EXIST)
    }

    fn checked(&mut self, call: UwbCall, handle: SessionHandle) -> Result<()> {
        let op = call.op();
        self.calls.push(call);
        self.injected(op, Some(handle))?;
        self.find_mut(handle).map(|_| ())
    }
}

impl Default for MockUwbHal {
    fn default() -> Self {
        Self::new()
    }
}

impl UwbHal for MockUwbHal {
    fn session_init(
        &mut self,
        session_id: u32,
        session_type: SessionType,
    ) -> Result<SessionHandle> {
        self.calls.push(UwbCall::SessionInit {
            session_id,
            session_type,
        });
        self.injected(UwbOp::SessionInit, None)?;
        if self.sessions.iter().any(|s| s.session_id == session_id) {
            return Err(UwbError::InvalidState);
        }

        let handle = self.next_handle;
        self.next_handle += 1;
        self.sessions.push(HwSession {
            handle,
            session_id,
            state: SessionState::Init,
        });
        Ok(handle)
    }

    fn session_deinit(&mut self, handle: SessionHandle) -> Result<()> {
        self.checked(UwbCall::SessionDeinit(handle), handle)?;
        self.sessions.retain(|s| s.handle != handle);
        Ok(())
    }

    fn set_ranging_params(&mut self, handle: SessionHandle, params: &RangingParams) -> Result<()> {
        let count = params.len();
        self.checked(UwbCall::SetRangingParams { handle, count }, handle)?;
        self.find_mut(handle)?.state = SessionState::Idle;
        Ok(())
    }

    fn set_app_config_multiple(
        &mut self,
        handle: SessionHandle,
        params: &AppParams,
    ) -> Result<()> {
        let count = params.len();
        self.checked(UwbCall::SetAppConfigMultiple { handle, count }, handle)
    }

    fn set_vendor_app_config(
        &mut self,
        handle: SessionHandle,
        params: &VendorParams,
    ) -> Result<()> {
        let count = params.len();
        self.checked(UwbCall::SetVendorAppConfig { handle, count }, handle)
    }

    fn set_app_config(
        &mut self,
        handle: SessionHandle,
        id: AppConfigId,
        value: u32,
    ) -> Result<()> {
        self.checked(UwbCall::SetAppConfig { handle, id, value }, handle)
    }

    fn enable_ranging_notifications(
        &mut self,
        handle: SessionHandle,
        mode: u8,
        near_cm: u16,
        far_cm: u16,
    ) -> Result<()> {
        self.checked(
            UwbCall::EnableRangingNotifications {
                handle,
                mode,
                near_cm,
                far_cm,
            },
            handle,
        )
    }

    fn set_static_sts(
        &mut self,
        handle: SessionHandle,
        vendor_id: u16,
        iv: &[u8; 6],
    ) -> Result<()> {
        self.checked(
            UwbCall::SetStaticSts {
                handle,
                vendor_id,
                iv: *iv,
            },
            handle,
        )
    }

    fn session_state(&mut self, handle: SessionHandle) -> Result<SessionState> {
        self.checked(UwbCall::SessionState(handle), handle)?;
        Ok(self.find_mut(handle)?.state)
    }

    fn start_ranging(&mut self, handle: SessionHandle) -> Result<()> {
        self.checked(UwbCall::StartRanging(handle), handle)?;
        let session = self.find_mut(handle)?;
        if session.state == SessionState::Active {
            return Err(UwbError::InvalidState);
        }
        session.state = SessionState::Active;
        Ok(())
    }

    fn stop_ranging(&mut self, handle: SessionHandle) -> Result<()> {
        self.checked(UwbCall::StopRanging(handle), handle)?;
        let session = self.find_mut(handle)?;
        if session.state != SessionState::Active {
            return Err(UwbError::InvalidState);
        }
        session.state = SessionState::Idle;
        Ok(())
    }

    fn send_data(&mut self, packet: &DataPacket<'_>) -> Result<()> {
        let handle = packet.session_handle;
        self.checked(
            UwbCall::SendData {
                handle,
                sequence_number: packet.sequence_number,
                mac_address: packet.mac_address,
                len: packet.data.len(),
            },
            handle,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_session_lifecycle() {
        let mut hal = MockUwbHal::new();
        let handle = hal.session_init(1, SessionType::Ranging).unwrap();
        assert_eq!(handle, FIRST_HANDLE);
        assert_eq!(hal.state_of(handle), Some(SessionState::Init));

        hal.set_ranging_params(handle, &RangingParams::new()).unwrap();
        assert_eq!(hal.state_of(handle), Some(SessionState::Idle));

        hal.start_ranging(handle).unwrap();
        assert_eq!(hal.session_state(handle), Ok(SessionState::Active));
        assert_eq!(hal.start_ranging(handle), Err(UwbError::InvalidState));

        hal.stop_ranging(handle).unwrap();
        assert_eq!(hal.stop_ranging(handle), Err(UwbError::InvalidState));

        hal.session_deinit(handle).unwrap();
        assert_eq!(hal.session_deinit(handle), Err(SESSION_NOT_EXIST));
        assert_eq!(hal.live_sessions(), 0);
    }

    #[test]
    fn test_mock_rejects_duplicate_session_id() {
        let mut hal = MockUwbHal::new();
        hal.session_init(1, SessionType::Ranging).unwrap();
        assert_eq!(
            hal.session_init(1, SessionType::Ranging),
            Err(UwbError::InvalidState)
        );
    }

    #[test]
    fn test_mock_handle_scoped_failure() {
        let mut hal = MockUwbHal::new();
        let h1 = hal.session_init(1, SessionType::Ranging).unwrap();
        let h2 = hal.session_init(2, SessionType::Ranging).unwrap();
        hal.fail_on_handle(UwbOp::StartRanging, h2, UwbError::ParameterRejected);

        assert!(hal.start_ranging(h1).is_ok());
        assert_eq!(hal.start_ranging(h2), Err(UwbError::ParameterRejected));
        assert_eq!(hal.count(UwbOp::StartRanging), 2);

        hal.clear_failures();
        assert!(hal.start_ranging(h2).is_ok());
    }

    #[test]
    fn test_mock_global_failure_journals_call() {
        let mut hal = MockUwbHal::new();
        hal.fail_on(UwbOp::SessionInit, UwbError::HardwareInitFailure);

        assert_eq!(
            hal.session_init(3, SessionType::Ranging),
            Err(UwbError::HardwareInitFailure)
        );
        assert_eq!(hal.calls().len(), 1);
        assert_eq!(hal.live_sessions(), 0);
    }
}
