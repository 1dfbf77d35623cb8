//! Bounded session registry
//!
//! Fixed-capacity table of owned sessions. Occupied slots are always the
//! prefix `0..len()`: removal shifts later entries left so there are no holes
//! and relative order is kept. Ids are unique.
//!
//! The registry itself is not synchronized; share it through a
//! [`BinaryLock`](crate::core::traits::BinaryLock) when task and interrupt
//! contexts both touch it.

use super::lifecycle::Session;
use super::types::{SessionHandle, INVALID_HANDLE};
use crate::platform::{error::UwbError, traits::UwbHal, Result};

/// Default registry capacity
pub const MAX_SESSIONS: usize = 5;

/// Registry of up to `N` sessions
#[derive(Debug)]
pub struct SessionRegistry<const N: usize = MAX_SESSIONS> {
    slots: [Option<Session>; N],
    count: usize,
}

impl<const N: usize> SessionRegistry<N> {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            slots: core::array::from_fn(|_| None),
            count: 0,
        }
    }

    /// Register a fresh session carrying `session`'s id and type
    ///
    /// The registry owns its own copy; configuration and hardware state of
    /// the argument are not carried over. Returns the slot index.
    ///
    /// # Errors
    ///
    /// - `DuplicateSession` if the id is already registered
    /// - `CapacityExceeded` if the registry is full
    pub fn add(&mut self, session: &Session) -> Result<usize> {
        self.insert(session.identity_clone())
    }

    /// Register `session` as-is, keeping its configuration and handle
    pub fn adopt(&mut self, session: Session) -> Result<usize> {
        self.insert(session)
    }

    fn insert(&mut self, session: Session) -> Result<usize> {
        let id = session.id();
        if self.contains(id) {
            crate::log_warn!("registry: session {} already registered", id);
            return Err(UwbError::DuplicateSession);
        }
        if self.is_full() {
            crate::log_warn!("registry: full, session {} rejected", id);
            return Err(UwbError::CapacityExceeded);
        }

        let index = self.count;
        self.slots[index] = Some(session);
        self.count += 1;
        crate::log_debug!("registry: session {} in slot {}", id, index);
        Ok(index)
    }

    /// Remove the session with `id`, compacting later slots
    ///
    /// The removed session is returned to the caller; no hardware
    /// deinitialization is performed.
    pub fn remove(&mut self, id: u32) -> Result<Session> {
        let index = self.position(id).ok_or(UwbError::NotFound)?;
        let removed = self.slots[index].take().ok_or(UwbError::NotFound)?;

        for i in index..self.count - 1 {
            self.slots[i] = self.slots[i + 1].take();
        }
        self.count -= 1;
        crate::log_debug!("registry: session {} removed from slot {}", id, index);
        Ok(removed)
    }

    pub fn find_by_id(&self, id: u32) -> Option<&Session> {
        self.iter().find(|s| s.id() == id)
    }

    pub fn find_by_id_mut(&mut self, id: u32) -> Option<&mut Session> {
        self.iter_mut().find(|s| s.id() == id)
    }

    /// Find by hardware handle; `INVALID_HANDLE` never matches
    pub fn find_by_handle(&self, handle: SessionHandle) -> Option<&Session> {
        if handle == INVALID_HANDLE {
            return None;
        }
        self.iter().find(|s| s.handle() == handle)
    }

    pub fn find_by_handle_mut(&mut self, handle: SessionHandle) -> Option<&mut Session> {
        if handle == INVALID_HANDLE {
            return None;
        }
        self.iter_mut().find(|s| s.handle() == handle)
    }

    /// Start every session in slot order
    ///
    /// All sessions are attempted. Returns `Ok` if every start succeeded,
    /// otherwise the status of the last failing session.
    pub fn start_all<H: UwbHal>(&mut self, hal: &mut H) -> Result<()> {
        self.for_each_session(|s| s.start(hal))
    }

    /// Stop every session in slot order; same aggregation as [`start_all`](Self::start_all)
    pub fn stop_all<H: UwbHal>(&mut self, hal: &mut H) -> Result<()> {
        self.for_each_session(|s| s.stop(hal))
    }

    /// Deinitialize every session in slot order; same aggregation as
    /// [`start_all`](Self::start_all)
    pub fn deinitialize_all<H: UwbHal>(&mut self, hal: &mut H) -> Result<()> {
        self.for_each_session(|s| s.deinitialize(hal))
    }

    fn for_each_session<F>(&mut self, mut f: F) -> Result<()>
    where
        F: FnMut(&mut Session) -> Result<()>,
    {
        let mut status = Ok(());
        for session in self.iter_mut() {
            if let Err(e) = f(session) {
                crate::log_warn!("registry: session {} failed: {}", session.id(), e);
                status = Err(e);
            }
        }
        status
    }

    /// Drop every session without touching the hardware
    pub fn clear(&mut self) {
        for slot in self.slots.iter_mut() {
            *slot = None;
        }
        self.count = 0;
    }

    /// Session in slot `index`, `None` past the occupied prefix
    pub fn slot(&self, index: usize) -> Option<&Session> {
        self.slots.get(index).and_then(Option::as_ref)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Session> {
        self.slots[..self.count].iter().flatten()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Session> {
        self.slots[..self.count].iter_mut().flatten()
    }

    pub fn contains(&self, id: u32) -> bool {
        self.position(id).is_some()
    }

    fn position(&self, id: u32) -> Option<usize> {
        self.iter().position(|s| s.id() == id)
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn is_full(&self) -> bool {
        self.count == N
    }

    pub const fn capacity(&self) -> usize {
        N
    }
}

impl<const N: usize> Default for SessionRegistry<N> {
    fn default() -> Self {
        Self::new()
    }
}
