//! Secure Memory Zeroization
//!
//! Clears message bytes that must not linger:
//! - Records extracted from the mailbox store
//! - The free tail left behind by compaction
//! - Outgoing messages once the monitor has copied them
//!
//! # Design
//! - `Zeroize` trait for byte storage that can be securely cleared
//! - `Zeroizing<T>` RAII type that zeros on drop
//! - Volatile writes prevent compiler optimization of zeroing

use core::ops::{Deref, DerefMut};
use core::ptr;
use core::sync::atomic::{compiler_fence, Ordering};

/// Trait for byte storage that can be securely zeroed.
pub trait Zeroize {
    /// Overwrite this value with zeros.
    ///
    /// This operation is guaranteed to not be optimized away.
    fn zeroize(&mut self);
}

impl Zeroize for [u8] {
    fn zeroize(&mut self) {
        for byte in self.iter_mut() {
            // SAFETY: `byte` is a valid, exclusive reference
            unsafe { ptr::write_volatile(byte, 0) };
        }
        compiler_fence(Ordering::SeqCst);
    }
}

impl<const N: usize> Zeroize for [u8; N] {
    fn zeroize(&mut self) {
        self.as_mut_slice().zeroize();
    }
}

/// A value that is zeroized when dropped.
///
/// # Example
/// ```
/// use panther_mailbox::security::Zeroizing;
///
/// let mut staging = Zeroizing::new([0u8; 64]);
/// staging[..2].copy_from_slice(b"hi");
/// // bytes are cleared when `staging` goes out of scope
/// ```
#[derive(Debug)]
pub struct Zeroizing<T: Zeroize> {
    inner: T,
}

impl<T: Zeroize> Zeroizing<T> {
    /// Wrap a value.
    #[inline]
    pub fn new(value: T) -> Self {
        Self { inner: value }
    }

    /// Clear the contents now, keeping the wrapper usable.
    #[inline]
    pub fn clear(&mut self) {
        self.inner.zeroize();
    }
}

impl<T: Zeroize> Deref for Zeroizing<T> {
    type Target = T;

    #[inline]
    fn deref(&self) -> &T {
        &self.inner
    }
}

impl<T: Zeroize> DerefMut for Zeroizing<T> {
    #[inline]
    fn deref_mut(&mut self) -> &mut T {
        &mut self.inner
    }
}

impl<T: Zeroize> Drop for Zeroizing<T> {
    fn drop(&mut self) {
        self.inner.zeroize();
    }
}
