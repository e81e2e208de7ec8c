//! Trust Boundary Interface
//!
//! Everything the mailbox consumes from outside the enclave:
//! - the monitor call surface (registration and dispatch)
//! - copy primitives for ranges owned by another trust domain
//!
//! # Security Model
//! - Foreign ranges are validated before any byte moves
//! - Invalid inputs return errors, never panic
//! - Monitor statuses are passed through unmodified

mod loopback;
mod monitor;
mod validate;

pub use loopback::{LoopbackMonitor, LoopbackPort};
pub use monitor::{status, Monitor};
pub use validate::{
    validate_user_read, validate_user_write, Access, AccessError, RegionCopy, UserBuffer,
    UserBufferMut, UserMemory, UserRegion,
};
