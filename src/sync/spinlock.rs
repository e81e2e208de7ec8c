//! Flag-Word Spinlock
//!
//! A test-and-set lock over a single 32-bit word. The monitor takes the
//! same word when it inserts records, so the layout is `#[repr(C)]` and
//! the states are fixed: `0` unlocked, `1` locked.
//!
//! # Properties
//! - No fairness, no owner tracking, no reentrancy
//! - Re-acquiring on the same thread deadlocks
//! - Release happens in `Drop`, so every exit path unlocks

use core::cell::UnsafeCell;
use core::ops::{Deref, DerefMut};
use core::sync::atomic::{AtomicU32, Ordering};

const UNLOCKED: u32 = 0;
const LOCKED: u32 = 1;

/// The raw lock word.
#[derive(Debug)]
#[repr(transparent)]
pub struct RawSpinlock {
    flag: AtomicU32,
}

impl RawSpinlock {
    /// Create an unlocked flag.
    pub const fn new() -> Self {
        Self {
            flag: AtomicU32::new(UNLOCKED),
        }
    }

    /// Spin until the flag moves 0 -> 1.
    #[inline]
    pub fn acquire(&self) {
        loop {
            if self
                .flag
                .compare_exchange_weak(UNLOCKED, LOCKED, Ordering::Acquire, Ordering::Relaxed)
                .is_ok()
            {
                return;
            }
            // Read-only spin keeps the cache line shared until release.
            while self.flag.load(Ordering::Relaxed) == LOCKED {
                core::hint::spin_loop();
            }
        }
    }

    /// Try a single 0 -> 1 transition.
    #[inline]
    pub fn try_acquire(&self) -> bool {
        self.flag
            .compare_exchange(UNLOCKED, LOCKED, Ordering::Acquire, Ordering::Relaxed)
            .is_ok()
    }

    /// Clear the flag.
    #[inline]
    pub fn release(&self) {
        self.flag.store(UNLOCKED, Ordering::Release);
    }

    /// Whether the flag is currently set.
    #[inline]
    pub fn is_locked(&self) -> bool {
        self.flag.load(Ordering::Relaxed) == LOCKED
    }
}

impl Default for RawSpinlock {
    fn default() -> Self {
        Self::new()
    }
}

/// Data guarded by a [`RawSpinlock`].
#[repr(C)]
pub struct SpinLock<T> {
    raw: RawSpinlock,
    data: UnsafeCell<T>,
}

// SAFETY: the flag serializes all access to `data`
unsafe impl<T: Send> Send for SpinLock<T> {}
unsafe impl<T: Send> Sync for SpinLock<T> {}

impl<T> SpinLock<T> {
    /// Wrap a value in an unlocked lock.
    pub const fn new(value: T) -> Self {
        Self {
            raw: RawSpinlock::new(),
            data: UnsafeCell::new(value),
        }
    }

    /// Acquire the lock, spinning while it is held.
    pub fn lock(&self) -> SpinLockGuard<'_, T> {
        self.raw.acquire();
        SpinLockGuard { lock: self }
    }

    /// Acquire the lock only if it is free right now.
    pub fn try_lock(&self) -> Option<SpinLockGuard<'_, T>> {
        if self.raw.try_acquire() {
            Some(SpinLockGuard { lock: self })
        } else {
            None
        }
    }

    /// Whether some caller holds the lock.
    pub fn is_locked(&self) -> bool {
        self.raw.is_locked()
    }
}

/// RAII guard; releases the flag on drop.
pub struct SpinLockGuard<'a, T> {
    lock: &'a SpinLock<T>,
}

impl<T> Deref for SpinLockGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        // SAFETY: the guard exists only while the flag is held
        unsafe { &*self.lock.data.get() }
    }
}

impl<T> DerefMut for SpinLockGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        // SAFETY: the guard exists only while the flag is held
        unsafe { &mut *self.lock.data.get() }
    }
}

impl<T> Drop for SpinLockGuard<'_, T> {
    fn drop(&mut self) {
        self.lock.raw.release();
    }
}
