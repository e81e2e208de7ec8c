//! Mailbox configuration constants
//!
//! Both sides of the boundary must agree on these values; the monitor
//! sizes its admission checks from the same numbers.

/// Default capacity of a mailbox store in bytes.
pub const MAILBOX_SIZE: usize = 256;

/// Largest single message that can be staged for dispatch.
pub const MAX_MESSAGE_SIZE: usize = 256;

/// Width of the sender identity field in a record header.
pub const IDENTITY_FIELD: usize = 8;

/// Width of the payload length field in a record header.
pub const LENGTH_FIELD: usize = 8;

/// Framed record header size (identity + length, no padding).
pub const HEADER_SIZE: usize = IDENTITY_FIELD + LENGTH_FIELD;
