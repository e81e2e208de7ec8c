//! Monitor Call Surface
//!
//! The two privileged calls the mailbox issues. How the call crosses the
//! boundary is the implementor's business; the mailbox only sees a raw
//! status word.

use crate::mailbox::Identity;
use crate::mm::PhysAddr;

/// Raw status words returned by monitor calls.
pub mod status {
    /// The call succeeded.
    pub const SUCCESS: isize = 0;
    /// The call failed; monitors carry no richer taxonomy.
    pub const ERROR: isize = -1;
}

/// Privileged calls into the security monitor.
pub trait Monitor {
    /// Register the mailbox store located at `mailbox`.
    ///
    /// Called once per mailbox at initialization.
    fn register_mailbox(&self, mailbox: PhysAddr) -> isize;

    /// Ask the monitor to deliver `len` bytes staged at `buf` into the
    /// store owned by `dest`.
    fn dispatch_message(&self, dest: Identity, buf: PhysAddr, len: usize) -> isize;
}

impl<M: Monitor + ?Sized> Monitor for &M {
    #[inline]
    fn register_mailbox(&self, mailbox: PhysAddr) -> isize {
        (**self).register_mailbox(mailbox)
    }

    #[inline]
    fn dispatch_message(&self, dest: Identity, buf: PhysAddr, len: usize) -> isize {
        (**self).dispatch_message(dest, buf, len)
    }
}
