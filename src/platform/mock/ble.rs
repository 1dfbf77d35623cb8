//! Mock BLE link for testing

use crate::platform::{
    error::UwbError,
    traits::{BleLink, PeerId},
    Result,
};
use std::vec::Vec;

/// Mock BLE link
///
/// Records every notification and the accessory characteristic value so tests
/// can inspect what the phone would have received.
#[derive(Debug, Default)]
pub struct MockBleLink {
    accessory_config: Vec<u8>,
    notifications: Vec<(PeerId, Vec<u8>)>,
    fail_notify: bool,
}

impl MockBleLink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current accessory characteristic value
    pub fn accessory_config(&self) -> &[u8] {
        &self.accessory_config
    }

    /// All notifications sent, oldest first
    pub fn notifications(&self) -> &[(PeerId, Vec<u8>)] {
        &self.notifications
    }

    /// Notifications sent to `peer`, oldest first
    pub fn notifications_to(&self, peer: PeerId) -> Vec<&[u8]> {
        self.notifications
            .iter()
            .filter(|(p, _)| *p == peer)
            .map(|(_, data)| data.as_slice())
            .collect()
    }

    pub fn clear_notifications(&mut self) {
        self.notifications.clear();
    }

    /// Make subsequent notifications fail (e.g. peer unsubscribed)
    pub fn set_fail_notify(&mut self, fail: bool) {
        self.fail_notify = fail;
    }
}

impl BleLink for MockBleLink {
    fn set_accessory_config(&mut self, data: &[u8]) -> Result<()> {
        self.accessory_config.clear();
        self.accessory_config.extend_from_slice(data);
        Ok(())
    }

    fn notify(&mut self, peer: PeerId, data: &[u8]) -> Result<()> {
        if self.fail_notify {
            return Err(UwbError::Hardware(0x0D));
        }
        self.notifications.push((peer, data.to_vec()));
        Ok(())
    }
}
