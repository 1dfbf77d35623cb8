//! TLV record codec
//!
//! Every characteristic value is a sequence of `tag: u8, length: u8,
//! value[length]` records.
//!
//! Decoding is lazy: [`records`] yields records until the buffer is exhausted
//! or a record claims more bytes than remain, in which case it yields one
//! `ProtocolDecodeError` and stops. Records before the malformed one have
//! already been handed to the caller.

use crate::platform::{error::UwbError, traits::MAX_CHARACTERISTIC_LEN, Result};
use heapless::Vec;

/// Size of the tag and length fields
pub const RECORD_HEADER_LEN: usize = 2;

/// Encoded outbound message
pub type Message = Vec<u8, MAX_CHARACTERISTIC_LEN>;

/// Commands written by the phone
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Command {
    /// Request the accessory configuration data
    Initialize = 0x0A,
    /// `session_id: u32 LE`, optionally followed by the phone's 2- or 8-byte
    /// UWB address
    ConfigureAndStart = 0x0B,
    /// Stop the session bound to this phone
    Stop = 0x0C,
    /// Delete the bound session, or the session id given as `u32 LE`
    DeleteSession = 0x0D,
}

impl Command {
    /// `None` for tags this accessory does not handle
    pub fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            0x0A => Some(Command::Initialize),
            0x0B => Some(Command::ConfigureAndStart),
            0x0C => Some(Command::Stop),
            0x0D => Some(Command::DeleteSession),
            _ => None,
        }
    }
}

/// Notifications sent to the phone
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Notification {
    AccessoryConfigurationData = 0x01,
    UwbDidStart = 0x02,
    UwbDidStop = 0x03,
    /// `[request tag, error code]`
    Error = 0x7F,
}

/// One decoded record, borrowing from the input buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Record<'a> {
    pub tag: u8,
    pub value: &'a [u8],
}

/// Iterator over the records of a buffer
#[derive(Debug, Clone)]
pub struct Records<'a> {
    buf: &'a [u8],
    done: bool,
}

/// Decode the records in `buf`
pub fn records(buf: &[u8]) -> Records<'_> {
    Records { buf, done: false }
}

impl<'a> Iterator for Records<'a> {
    type Item = Result<Record<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done || self.buf.is_empty() {
            return None;
        }

        let (tag, len) = match self.buf {
            [tag, len, ..] => (*tag, usize::from(*len)),
            _ => {
                self.done = true;
                return Some(Err(UwbError::ProtocolDecodeError));
            }
        };
        let rest = &self.buf[RECORD_HEADER_LEN..];
        if len > rest.len() {
            self.done = true;
            return Some(Err(UwbError::ProtocolDecodeError));
        }

        let (value, tail) = rest.split_at(len);
        self.buf = tail;
        Some(Ok(Record { tag, value }))
    }
}

/// Append one record to `out`
///
/// # Errors
///
/// `CapacityExceeded` if the value is longer than 255 bytes or the record
/// does not fit; `out` is unchanged.
pub fn push_record(out: &mut Message, tag: u8, value: &[u8]) -> Result<()> {
    let len = u8::try_from(value.len()).map_err(|_| UwbError::CapacityExceeded)?;
    if out.len() + RECORD_HEADER_LEN + value.len() > out.capacity() {
        return Err(UwbError::CapacityExceeded);
    }
    out.extend_from_slice(&[tag, len])
        .and_then(|_| out.extend_from_slice(value))
        .map_err(|_| UwbError::CapacityExceeded)
}

/// Single-record message
pub fn encode(tag: u8, value: &[u8]) -> Result<Message> {
    let mut out = Message::new();
    push_record(&mut out, tag, value)?;
    Ok(out)
}

/// `UwbDidStart` / `UwbDidStop` style record carrying a session id
pub fn encode_session_event(notification: Notification, session_id: u32) -> Result<Message> {
    encode(notification as u8, &session_id.to_le_bytes())
}

/// Error record answering the command with tag `request`
pub fn encode_error(request: u8, error: UwbError) -> Result<Message> {
    encode(Notification::Error as u8, &[request, error.code()])
}

/// Leading little-endian `u32` of a record value
pub fn read_u32_le(value: &[u8]) -> Result<u32> {
    match value {
        [a, b, c, d, ..] => Ok(u32::from_le_bytes([*a, *b, *c, *d])),
        _ => Err(UwbError::ProtocolDecodeError),
    }
}
