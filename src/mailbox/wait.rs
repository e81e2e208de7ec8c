//! Waiting for Arrivals
//!
//! Layers a wait on top of the non-blocking scan. A waiter snapshots the
//! mailbox's arrival counter, scans once, and on a miss spins until the
//! counter moves, a cancel token is raised, or its budget runs out.
//!
//! Snapshotting before the scan closes the window where a record lands
//! between a miss and the start of the wait.

use core::sync::atomic::{AtomicBool, Ordering};

use log::debug;

use super::store::Mailbox;
use crate::error::MailboxError;

/// How long a waiting receive may spin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Timeout {
    /// Wait until a matching record arrives or the wait is cancelled.
    Never,
    /// Give up after this many spin iterations without an arrival.
    Spins(u64),
}

/// Cancellation flag shared between a waiter and whoever may abort it.
#[derive(Debug, Default)]
pub struct CancelToken {
    cancelled: AtomicBool,
}

impl CancelToken {
    /// Create a token that is not cancelled.
    pub const fn new() -> Self {
        Self {
            cancelled: AtomicBool::new(false),
        }
    }

    /// Ask every waiter holding this token to stop.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    /// Whether `cancel` has been called.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

/// Options for a waiting receive.
#[derive(Debug, Clone, Copy)]
pub struct WaitOptions<'a> {
    /// Spin budget.
    pub timeout: Timeout,
    /// Optional cancellation.
    pub cancel: Option<&'a CancelToken>,
}

impl<'a> WaitOptions<'a> {
    /// Wait with no limit and no cancellation.
    pub const fn forever() -> Self {
        Self {
            timeout: Timeout::Never,
            cancel: None,
        }
    }

    /// Wait for at most `spins` iterations.
    pub const fn spins(spins: u64) -> Self {
        Self {
            timeout: Timeout::Spins(spins),
            cancel: None,
        }
    }

    /// Attach a cancel token.
    pub const fn with_cancel(mut self, token: &'a CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }
}

impl Default for WaitOptions<'_> {
    fn default() -> Self {
        Self::forever()
    }
}

struct Budget {
    remaining: Option<u64>,
}

impl Budget {
    fn new(timeout: Timeout) -> Self {
        Self {
            remaining: match timeout {
                Timeout::Never => None,
                Timeout::Spins(n) => Some(n),
            },
        }
    }

    /// Spend one iteration; `false` once exhausted.
    fn tick(&mut self) -> bool {
        match &mut self.remaining {
            None => true,
            Some(0) => false,
            Some(n) => {
                *n -= 1;
                true
            }
        }
    }
}

/// Run `attempt` until it stops reporting `NotFound`, waiting for an
/// arrival between tries.
pub(crate) fn retry_on_arrival<const CAP: usize>(
    mailbox: &Mailbox<CAP>,
    options: &WaitOptions<'_>,
    mut attempt: impl FnMut() -> Result<usize, MailboxError>,
) -> Result<usize, MailboxError> {
    let mut budget = Budget::new(options.timeout);

    loop {
        let seen = mailbox.arrivals();
        match attempt() {
            Err(MailboxError::NotFound) => {}
            other => return other,
        }

        loop {
            if options.cancel.is_some_and(CancelToken::is_cancelled) {
                debug!("[MAILBOX] wait on {} cancelled", mailbox.identity());
                return Err(MailboxError::Cancelled);
            }
            if mailbox.arrivals() != seen {
                break;
            }
            if !budget.tick() {
                debug!("[MAILBOX] wait on {} timed out", mailbox.identity());
                return Err(MailboxError::TimedOut);
            }
            core::hint::spin_loop();
        }
    }
}
