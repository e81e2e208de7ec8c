//! Enclave Mailbox
//!
//! A fixed-capacity store of framed records, filled by the monitor and
//! drained by the enclave.
//!
//! # Structure
//! ```text
//! ┌──────────────────────── Mailbox<CAP> ────────────────────────┐
//! │ capacity │ identity │ arrivals │ lock │ size │ data[CAP]     │
//! └──────────────────────────────────────────────────────────────┘
//!                                               │
//!      data[0..size): ┌────────┬─────┬─────────┐┌────────┬─────┬──
//!                     │ sender │ len │ payload ││ sender │ len │ ..
//!                     └────────┴─────┴─────────┘└────────┴─────┴──
//! ```
//!
//! # Paths
//! - Registration: [`Endpoint::init`], once per mailbox
//! - Receive: scan, copy out, compact; the only local mutation
//! - Send: validate, stage per call, dispatch through the monitor

mod codec;
mod endpoint;
mod store;
mod wait;

use core::fmt;

pub use codec::{encode_record, Record, RecordHeader, Records};
pub use endpoint::{Board, Endpoint, Platform};
pub use store::Mailbox;
pub use wait::{CancelToken, Timeout, WaitOptions};

/// Addressable identity of a mailbox owner.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct Identity(u64);

impl Identity {
    /// Create an identity from its raw value.
    #[inline]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Get the raw value.
    #[inline]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Debug for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Identity({})", self.0)
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "uid:{}", self.0)
    }
}
