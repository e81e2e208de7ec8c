//! PantherOS Enclave Mailbox
//!
//! A bounded, shared-memory mailbox for one-directional message passing
//! between an enclave and the security monitor that mediates every
//! cross-boundary transfer.
//!
//! # Layout
//! - `sync`: flag-word spinlock guarding the store
//! - `mm`: physical/virtual address types and translation
//! - `security`: volatile zeroization of message bytes
//! - `boundary`: monitor call surface and trust-domain copy primitives
//! - `mailbox`: record codec, store, send/receive endpoint
//!
//! # Security Features
//! - Every foreign address range is validated before bytes move
//! - Outgoing messages are staged per call, never in a shared buffer
//! - Extracted records are cleared from the store with volatile writes
//! - All store mutations happen under the lock, released on every path

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_op_in_unsafe_fn)]

pub mod boundary;
pub mod config;
pub mod error;
pub mod mailbox;
pub mod mm;
pub mod security;
pub mod sync;

pub use boundary::{
    Access, AccessError, LoopbackMonitor, LoopbackPort, Monitor, RegionCopy, UserMemory,
    UserRegion,
};
pub use error::MailboxError;
pub use mailbox::{
    Board, CancelToken, Endpoint, Identity, Mailbox, Platform, Timeout, WaitOptions,
};
pub use mm::{AddressTranslation, IdentityTranslation, OffsetTranslation, PhysAddr, VirtAddr};
