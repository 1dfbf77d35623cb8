//! Time abstraction for bounded waits.
//!
//! The task-context registry lock waits a bounded number of scheduler ticks
//! before giving up. This module provides the `TimeSource` trait that abstracts
//! over the tick provider (Embassy, mock) so the wait can be tested on host.

/// Platform-agnostic scheduler tick source.
///
/// - `EmbassyTime` for embedded targets using the Embassy time driver
/// - `MockTime` for host testing with controllable time
pub trait TimeSource {
    /// Returns current scheduler ticks since system start.
    fn now_ticks(&self) -> u64;

    /// Called between lock acquisition attempts while waiting.
    fn relax(&self) {
        core::hint::spin_loop();
    }

    /// Returns elapsed ticks since a reference point.
    ///
    /// Uses saturating subtraction to handle a reference in the future.
    fn elapsed_since(&self, reference: u64) -> u64 {
        self.now_ticks().saturating_sub(reference)
    }
}

impl<T: TimeSource + ?Sized> TimeSource for &T {
    fn now_ticks(&self) -> u64 {
        (**self).now_ticks()
    }

    fn relax(&self) {
        (**self).relax()
    }
}

// ============================================================================
// Embassy Implementation
// ============================================================================

/// Embassy tick source backed by the global time driver.
#[cfg(feature = "embassy")]
#[derive(Debug, Clone, Copy, Default)]
pub struct EmbassyTime;

#[cfg(feature = "embassy")]
impl TimeSource for EmbassyTime {
    fn now_ticks(&self) -> u64 {
        embassy_time::Instant::now().as_ticks()
    }
}

// ============================================================================
// Mock Implementation
// ============================================================================

#[cfg(any(test, feature = "mock"))]
use core::sync::atomic::{AtomicU64, Ordering};

/// Mock tick source with controllable advancement.
///
/// Every `relax()` call advances time by `step` ticks, so a bounded wait on a
/// lock that is never released terminates deterministically.
///
/// # Example
///
/// ```ignore
/// use nearby_uwb::core::traits::{MockTime, TimeSource};
///
/// let time = MockTime::new();
/// assert_eq!(time.now_ticks(), 0);
///
/// time.advance(10);
/// assert_eq!(time.now_ticks(), 10);
///
/// time.relax();
/// assert_eq!(time.now_ticks(), 11);
/// ```
#[cfg(any(test, feature = "mock"))]
#[derive(Debug)]
pub struct MockTime {
    ticks: AtomicU64,
    step: u64,
}

#[cfg(any(test, feature = "mock"))]
impl MockTime {
    /// Creates a new `MockTime` at tick 0 advancing one tick per `relax()`.
    pub fn new() -> Self {
        Self::with_step(1)
    }

    /// Creates a new `MockTime` advancing `step` ticks per `relax()`.
    pub fn with_step(step: u64) -> Self {
        Self {
            ticks: AtomicU64::new(0),
            step,
        }
    }

    /// Sets the current tick count.
    pub fn set(&self, ticks: u64) {
        self.ticks.store(ticks, Ordering::SeqCst);
    }

    /// Advances the current tick count.
    pub fn advance(&self, ticks: u64) {
        self.ticks.fetch_add(ticks, Ordering::SeqCst);
    }
}

#[cfg(any(test, feature = "mock"))]
impl Default for MockTime {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(any(test, feature = "mock"))]
impl TimeSource for MockTime {
    fn now_ticks(&self) -> u64 {
        self.ticks.load(Ordering::SeqCst)
    }

    fn relax(&self) {
        self.advance(self.step);
    }
}
