//! Mailbox error kinds
//!
//! Each kind is surfaced verbatim to the caller. Nothing is retried
//! locally and nothing is treated as fatal here.

use core::fmt;

use crate::boundary::{status, AccessError};

/// Error type for mailbox operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MailboxError {
    /// No queued message from the requested sender.
    NotFound,
    /// Destination buffer too small, or message over the staging bound.
    MessageTooLarge,
    /// A monitor call returned a non-success status (raw value kept).
    TransportFailure(isize),
    /// A cross-domain address range failed validation.
    BadAddress,
    /// The record does not fit in the store's free space, or a table is full.
    NoSpace,
    /// The identity already owns an attached mailbox.
    IdentityInUse,
    /// A waiting receive ran out of budget.
    TimedOut,
    /// A waiting receive was cancelled.
    Cancelled,
}

impl MailboxError {
    /// Map a raw monitor status to a result.
    #[inline]
    pub fn from_status(raw: isize) -> Result<(), Self> {
        if raw == status::SUCCESS {
            Ok(())
        } else {
            Err(Self::TransportFailure(raw))
        }
    }
}

impl fmt::Display for MailboxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "no message from sender"),
            Self::MessageTooLarge => write!(f, "message too large"),
            Self::TransportFailure(raw) => write!(f, "monitor call failed (status {})", raw),
            Self::BadAddress => write!(f, "bad address"),
            Self::NoSpace => write!(f, "mailbox full"),
            Self::IdentityInUse => write!(f, "identity already attached"),
            Self::TimedOut => write!(f, "timed out waiting for message"),
            Self::Cancelled => write!(f, "wait cancelled"),
        }
    }
}

impl From<AccessError> for MailboxError {
    fn from(_: AccessError) -> Self {
        Self::BadAddress
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(MailboxError::from_status(status::SUCCESS), Ok(()));
        assert_eq!(
            MailboxError::from_status(status::ERROR),
            Err(MailboxError::TransportFailure(status::ERROR))
        );
        assert_eq!(
            MailboxError::from_status(-7),
            Err(MailboxError::TransportFailure(-7))
        );
    }

    #[test]
    fn test_access_error_is_bad_address() {
        let err: MailboxError = AccessError::Overflow.into();
        assert_eq!(err, MailboxError::BadAddress);
    }
}
