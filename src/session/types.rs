//! Session value types shared with the hardware abstraction

/// Hardware session handle; `INVALID_HANDLE` until the session is initialized
pub type SessionHandle = u32;

/// Handle value of a session that has not been initialized (or was deinitialized)
pub const INVALID_HANDLE: SessionHandle = 0;

/// Length of the destination address carried by a data packet
pub const DATA_MAC_ADDRESS_LEN: usize = 8;

/// Maximum application payload of one data packet (one-byte length field)
pub const MAX_DATA_LEN: usize = u8::MAX as usize;

/// FiRa session type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum SessionType {
    #[default]
    Ranging = 0x00,
    RangingAndInBandData = 0x01,
    DataTransfer = 0x02,
    DeviceTestMode = 0xD0,
}

/// Hardware-reported session state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum SessionState {
    Init = 0x00,
    Deinit = 0x01,
    Active = 0x02,
    Idle = 0x03,
    Error = 0xFF,
}

impl SessionState {
    /// Convert from raw state value
    pub fn from_u8(value: u8) -> Self {
        match value {
            0x00 => Self::Init,
            0x01 => Self::Deinit,
            0x02 => Self::Active,
            0x03 => Self::Idle,
            _ => Self::Error,
        }
    }
}

/// MAC address used in ranging configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MacAddress {
    /// 2-byte short address
    Short([u8; 2]),
    /// 8-byte extended address
    Extended([u8; 8]),
}

impl MacAddress {
    /// Parse a 2- or 8-byte address
    pub fn from_slice(bytes: &[u8]) -> Option<Self> {
        match bytes.len() {
            2 => Some(Self::Short([bytes[0], bytes[1]])),
            8 => {
                let mut addr = [0u8; 8];
                addr.copy_from_slice(bytes);
                Some(Self::Extended(addr))
            }
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        match self {
            MacAddress::Short(addr) => addr,
            MacAddress::Extended(addr) => addr,
        }
    }

    pub fn is_extended(&self) -> bool {
        matches!(self, MacAddress::Extended(_))
    }
}

/// Outbound in-band data packet
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DataPacket<'a> {
    pub session_handle: SessionHandle,
    pub sequence_number: u8,
    pub mac_address: [u8; DATA_MAC_ADDRESS_LEN],
    pub data: &'a [u8],
}
