//! Connected-peer table
//!
//! Associates each connected phone with the session it controls. A missing
//! entry means the peer is disconnected.

use crate::config::MAX_PEERS;
use crate::platform::{error::UwbError, traits::PeerId, Result};
use heapless::Vec;

/// Per-peer protocol state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LinkState {
    /// Idle, waiting for a command
    Connected,
    /// A command write is being handled
    Processing,
}

/// One connected peer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeerLink {
    pub peer: PeerId,
    pub state: LinkState,
    /// Local id of the session this peer controls
    pub session: Option<u32>,
}

/// Bounded table of connected peers
#[derive(Debug, Default)]
pub struct PeerTable<const N: usize = MAX_PEERS> {
    links: Vec<PeerLink, N>,
}

impl<const N: usize> PeerTable<N> {
    pub const fn new() -> Self {
        Self { links: Vec::new() }
    }

    /// Register `peer` as connected
    ///
    /// Reconnecting a known peer is a no-op and keeps its session binding.
    ///
    /// # Errors
    ///
    /// `CapacityExceeded` if `N` peers are already connected.
    pub fn connect(&mut self, peer: PeerId) -> Result<()> {
        if self.get(peer).is_some() {
            return Ok(());
        }
        self.links
            .push(PeerLink {
                peer,
                state: LinkState::Connected,
                session: None,
            })
            .map_err(|_| UwbError::CapacityExceeded)
    }

    /// Forget `peer`, returning its last link state
    pub fn disconnect(&mut self, peer: PeerId) -> Option<PeerLink> {
        let index = self.links.iter().position(|l| l.peer == peer)?;
        Some(self.links.remove(index))
    }

    pub fn get(&self, peer: PeerId) -> Option<&PeerLink> {
        self.links.iter().find(|l| l.peer == peer)
    }

    pub fn get_mut(&mut self, peer: PeerId) -> Option<&mut PeerLink> {
        self.links.iter_mut().find(|l| l.peer == peer)
    }

    /// Bind `peer` to `session_id`, replacing any previous binding
    pub fn bind(&mut self, peer: PeerId, session_id: u32) -> Result<()> {
        let link = self.get_mut(peer).ok_or(UwbError::NotFound)?;
        link.session = Some(session_id);
        Ok(())
    }

    /// Clear the binding of `peer`, returning the session it had
    pub fn unbind(&mut self, peer: PeerId) -> Option<u32> {
        self.get_mut(peer).and_then(|l| l.session.take())
    }

    /// Clear every binding to `session_id`
    pub fn unbind_session(&mut self, session_id: u32) {
        for link in self.links.iter_mut() {
            if link.session == Some(session_id) {
                link.session = None;
            }
        }
    }

    pub fn unbind_all(&mut self) {
        for link in self.links.iter_mut() {
            link.session = None;
        }
    }

    pub fn session_of(&self, peer: PeerId) -> Option<u32> {
        self.get(peer).and_then(|l| l.session)
    }

    /// Peer controlling `session_id`, if any
    pub fn peer_of(&self, session_id: u32) -> Option<PeerId> {
        self.links
            .iter()
            .find(|l| l.session == Some(session_id))
            .map(|l| l.peer)
    }

    pub fn set_state(&mut self, peer: PeerId, state: LinkState) {
        if let Some(link) = self.get_mut(peer) {
            link.state = state;
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &PeerLink> {
        self.links.iter()
    }

    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    pub fn clear(&mut self) {
        self.links.clear();
    }
}
