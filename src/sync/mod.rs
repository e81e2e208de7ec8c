//! Synchronization primitives
//!
//! The mailbox store is shared with the monitor by physical address, so
//! its lock must be a plain flag word with a fixed layout.

pub mod spinlock;

pub use spinlock::{RawSpinlock, SpinLock, SpinLockGuard};
