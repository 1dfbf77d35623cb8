//! Core traits and primitives for platform-agnostic concurrency.
//!
//! This module decouples the session layer from the scheduler it runs under.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │              ControlChannel / SessionRegistry                │
//! │                            │                                 │
//! │                            ▼                                 │
//! │  ┌──────────────────────────────────────────────────────┐   │
//! │  │ BinaryLock<T>                                         │   │
//! │  │ + lock_task(time, timeout)  (bounded wait)            │   │
//! │  │ + lock_isr()                (single attempt)          │   │
//! │  └──────────────────────────────────────────────────────┘   │
//! │                            │                                 │
//! │            ┌───────────────┴───────────────┐                 │
//! │            ▼                               ▼                 │
//! │  ┌──────────────────────┐    ┌──────────────────────────┐   │
//! │  │ EmbassyTime          │    │ MockTime                  │   │
//! │  │ #[cfg(feature =      │    │ #[cfg(any(test,           │   │
//! │  │   "embassy")]        │    │   feature = "mock"))]     │   │
//! │  └──────────────────────┘    └──────────────────────────┘   │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Features
//!
//! - **`embassy`**: Enables `EmbassyTime`
//! - **`mock`**: Exposes `MockTime` outside of unit tests

pub mod sync;
pub mod time;

pub use sync::{BinaryLock, BinaryLockGuard};
pub use time::TimeSource;

#[cfg(any(test, feature = "mock"))]
pub use time::MockTime;

#[cfg(feature = "embassy")]
pub use time::EmbassyTime;
