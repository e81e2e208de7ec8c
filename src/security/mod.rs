//! Security Primitives Module
//!
//! Message bytes pass through the store and the per-call staging
//! buffers; neither is allowed to keep them after use.
//!
//! # Security Properties
//! - Memory is cleared using volatile writes to prevent optimization
//! - Staging buffers clear themselves on drop

pub mod zeroize;

pub use zeroize::{Zeroize, Zeroizing};
