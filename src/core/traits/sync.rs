//! Binary lock with task-context and interrupt-context entry points.
//!
//! BLE stack callbacks can arrive from an interrupt handler while an
//! application task is walking the session registry. Both paths go through
//! [`BinaryLock`], but they acquire it differently:
//!
//! - [`BinaryLock::lock_task`] spins for a bounded number of scheduler ticks
//!   and fails with `LockTimeout` if the holder does not release in time.
//! - [`BinaryLock::lock_isr`] makes exactly one attempt. An interrupt handler
//!   must never wait on the code it preempted.
//!
//! The caller picks the entry point from the context it knows it runs in; no
//! processor state is inspected.
//!
//! The held flag lives in a `critical_section::Mutex`, so the test-and-set is
//! atomic on single-core targets without CAS instructions and on the host
//! (via the `critical-section/std` implementation).

use crate::core::traits::time::TimeSource;
use crate::platform::error::{Result, UwbError};
use core::cell::{Cell, UnsafeCell};
use core::marker::PhantomData;
use core::ops::{Deref, DerefMut};
use critical_section::Mutex;

/// Mutual-exclusion cell protecting a value shared between tasks and
/// interrupt handlers.
///
/// Constructed eagerly together with the value it protects; there is no lazy
/// creation path.
pub struct BinaryLock<T> {
    held: Mutex<Cell<bool>>,
    value: UnsafeCell<T>,
}

// Safety: access to `value` is only handed out through `BinaryLockGuard`,
// and at most one guard exists at a time (enforced by `held`).
unsafe impl<T: Send> Sync for BinaryLock<T> {}

impl<T> BinaryLock<T> {
    /// Creates an unlocked `BinaryLock` owning `value`.
    ///
    /// This is a const fn, allowing static initialization.
    pub const fn new(value: T) -> Self {
        Self {
            held: Mutex::new(Cell::new(false)),
            value: UnsafeCell::new(value),
        }
    }

    /// Acquire from task context, waiting at most `timeout_ticks`.
    ///
    /// # Errors
    ///
    /// Returns `UwbError::LockTimeout` if the lock is still held once the
    /// timeout has elapsed. Nothing protected by the lock has been touched.
    pub fn lock_task<C: TimeSource>(
        &self,
        time: &C,
        timeout_ticks: u64,
    ) -> Result<BinaryLockGuard<'_, T>> {
        let start = time.now_ticks();
        loop {
            if self.try_acquire() {
                return Ok(BinaryLockGuard::new(self));
            }
            if time.elapsed_since(start) >= timeout_ticks {
                crate::log_warn!("lock not acquired within {} ticks", timeout_ticks);
                return Err(UwbError::LockTimeout);
            }
            time.relax();
        }
    }

    /// Acquire from interrupt context with a single non-blocking attempt.
    ///
    /// # Errors
    ///
    /// Returns `UwbError::LockTimeout` if the lock is currently held.
    pub fn lock_isr(&self) -> Result<BinaryLockGuard<'_, T>> {
        if self.try_acquire() {
            Ok(BinaryLockGuard::new(self))
        } else {
            crate::log_warn!("lock busy in interrupt context");
            Err(UwbError::LockTimeout)
        }
    }

    /// Run `f` on the protected value from task context.
    pub fn with_task<C, F, R>(&self, time: &C, timeout_ticks: u64, f: F) -> Result<R>
    where
        C: TimeSource,
        F: FnOnce(&mut T) -> R,
    {
        let mut guard = self.lock_task(time, timeout_ticks)?;
        Ok(f(&mut guard))
    }

    /// Run `f` on the protected value from interrupt context.
    pub fn with_isr<F, R>(&self, f: F) -> Result<R>
    where
        F: FnOnce(&mut T) -> R,
    {
        let mut guard = self.lock_isr()?;
        Ok(f(&mut guard))
    }

    /// Returns true while a guard is alive.
    pub fn is_locked(&self) -> bool {
        critical_section::with(|cs| self.held.borrow(cs).get())
    }

    /// Exclusive access without locking; the borrow checker proves no guard exists.
    pub fn get_mut(&mut self) -> &mut T {
        self.value.get_mut()
    }

    /// Consumes the lock, returning the protected value.
    pub fn into_inner(self) -> T {
        self.value.into_inner()
    }

    fn try_acquire(&self) -> bool {
        critical_section::with(|cs| {
            let held = self.held.borrow(cs);
            if held.get() {
                false
            } else {
                held.set(true);
                true
            }
        })
    }

    fn release(&self) {
        critical_section::with(|cs| self.held.borrow(cs).set(false));
    }
}

/// Scoped access to the value inside a [`BinaryLock`]; releases on drop.
pub struct BinaryLockGuard<'a, T> {
    lock: &'a BinaryLock<T>,
    _marker: PhantomData<&'a mut T>,
}

impl<'a, T> BinaryLockGuard<'a, T> {
    fn new(lock: &'a BinaryLock<T>) -> Self {
        Self {
            lock,
            _marker: PhantomData,
        }
    }
}

impl<T> Deref for BinaryLockGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        // Safety: the guard holds the lock.
        unsafe { &*self.lock.value.get() }
    }
}

impl<T> DerefMut for BinaryLockGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        // Safety: the guard holds the lock exclusively.
        unsafe { &mut *self.lock.value.get() }
    }
}

impl<T> Drop for BinaryLockGuard<'_, T> {
    fn drop(&mut self) {
        self.lock.release();
    }
}
