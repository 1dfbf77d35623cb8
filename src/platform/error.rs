//! Session layer error types
//!
//! One status enumeration is shared by the UWB hardware abstraction, the
//! session registry and the BLE control channel. Success is `Ok(..)`.

use core::fmt;

/// Result type for session and hardware operations
pub type Result<T> = core::result::Result<T, UwbError>;

/// Session-layer errors
///
/// Hardware implementations map their vendor status codes to these variants.
/// Anything without a closer match travels as `Hardware(code)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum UwbError {
    /// Hardware could not create or initialize the session
    HardwareInitFailure,
    /// Hardware rejected a parameter (range or legality failure)
    ParameterRejected,
    /// Registry, peer table or parameter collection is full
    CapacityExceeded,
    /// Lookup miss
    NotFound,
    /// Registry lock not acquired within the bound
    LockTimeout,
    /// Malformed TLV record
    ProtocolDecodeError,
    /// A session with the same local id is already registered
    DuplicateSession,
    /// Hardware refused the operation in the session's current state
    InvalidState,
    /// Vendor-specific hardware status
    Hardware(u8),
}

impl UwbError {
    /// One-byte code carried in the error TLV record sent to the phone
    pub fn code(self) -> u8 {
        match self {
            UwbError::HardwareInitFailure => 0x01,
            UwbError::ParameterRejected => 0x02,
            UwbError::CapacityExceeded => 0x03,
            UwbError::NotFound => 0x04,
            UwbError::LockTimeout => 0x05,
            UwbError::ProtocolDecodeError => 0x06,
            UwbError::DuplicateSession => 0x07,
            UwbError::InvalidState => 0x08,
            UwbError::Hardware(_) => 0xFF,
        }
    }

    /// True for failures where resending the same command may succeed
    pub fn is_transient(self) -> bool {
        matches!(self, UwbError::LockTimeout)
    }
}

impl fmt::Display for UwbError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UwbError::HardwareInitFailure => write!(f, "Hardware session init failed"),
            UwbError::ParameterRejected => write!(f, "Parameter rejected by hardware"),
            UwbError::CapacityExceeded => write!(f, "Capacity exceeded"),
            UwbError::NotFound => write!(f, "Not found"),
            UwbError::LockTimeout => write!(f, "Lock timeout"),
            UwbError::ProtocolDecodeError => write!(f, "Malformed TLV record"),
            UwbError::DuplicateSession => write!(f, "Duplicate session id"),
            UwbError::InvalidState => write!(f, "Invalid session state"),
            UwbError::Hardware(code) => write!(f, "Hardware status 0x{:02X}", code),
        }
    }
}
