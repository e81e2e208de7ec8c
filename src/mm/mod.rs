//! Memory addressing for the mailbox
//!
//! Provides:
//! - Physical and virtual address newtypes
//! - Translation between the two for monitor calls
//!
//! # Security Principles
//! - Physical addresses are never dereferenced by the enclave
//! - Translation is an explicit capability passed in, never ambient

mod address;

pub use address::{AddressTranslation, IdentityTranslation, OffsetTranslation, PhysAddr, VirtAddr};
