//! Loopback Monitor
//!
//! An in-process stand-in for the security monitor. It keeps a table of
//! attached mailboxes, accepts registrations by physical address, and
//! delivers dispatched messages straight into the destination store.
//!
//! Each enclave talks to the monitor through its own [`LoopbackPort`],
//! which plays the role of the calling hart's context: the monitor learns
//! the sender identity from the port, never from the message.

use log::{debug, warn};
use spin::Mutex;

use super::monitor::{status, Monitor};
use crate::config::{MAILBOX_SIZE, MAX_MESSAGE_SIZE};
use crate::error::MailboxError;
use crate::mailbox::{Identity, Mailbox};
use crate::mm::{AddressTranslation, PhysAddr, VirtAddr};

/// Default number of mailboxes a loopback monitor can track.
pub const LOOPBACK_SLOTS: usize = 8;

#[derive(Clone, Copy)]
struct Slot<'a, const CAP: usize> {
    mailbox: &'a Mailbox<CAP>,
    registered: bool,
}

/// In-process monitor over a fixed table of mailboxes.
pub struct LoopbackMonitor<
    'a,
    T: AddressTranslation,
    const CAP: usize = MAILBOX_SIZE,
    const N: usize = LOOPBACK_SLOTS,
> {
    translation: T,
    slots: Mutex<[Option<Slot<'a, CAP>>; N]>,
}

impl<'a, T: AddressTranslation, const CAP: usize, const N: usize> LoopbackMonitor<'a, T, CAP, N> {
    /// Create a monitor with an empty table.
    ///
    /// # Safety
    /// Every physical range later passed to `dispatch_message` must, under
    /// `translation`, name memory readable for the duration of the call.
    pub const unsafe fn new(translation: T) -> Self {
        Self {
            translation,
            slots: Mutex::new([None; N]),
        }
    }

    /// Make a mailbox reachable. It accepts messages once registered.
    ///
    /// # Errors
    /// - `IdentityInUse`: another mailbox with the same owner is attached
    /// - `NoSpace`: the table is full
    pub fn attach(&self, mailbox: &'a Mailbox<CAP>) -> Result<(), MailboxError> {
        let mut slots = self.slots.lock();

        if slots
            .iter()
            .flatten()
            .any(|slot| slot.mailbox.identity() == mailbox.identity())
        {
            warn!("[MONITOR] identity {} already attached", mailbox.identity());
            return Err(MailboxError::IdentityInUse);
        }

        let free = slots
            .iter_mut()
            .find(|slot| slot.is_none())
            .ok_or(MailboxError::NoSpace)?;
        *free = Some(Slot {
            mailbox,
            registered: false,
        });
        Ok(())
    }

    /// Whether the mailbox owned by `identity` has registered.
    pub fn is_registered(&self, identity: Identity) -> bool {
        self.slots
            .lock()
            .iter()
            .flatten()
            .any(|slot| slot.registered && slot.mailbox.identity() == identity)
    }

    /// Call surface for the enclave owning `caller`.
    pub fn port(&self, caller: Identity) -> LoopbackPort<'_, 'a, T, CAP, N> {
        LoopbackPort {
            monitor: self,
            caller,
        }
    }

    fn register(&self, caller: Identity, phys: PhysAddr) -> isize {
        let mut slots = self.slots.lock();
        let slot = slots.iter_mut().flatten().find(|slot| {
            slot.mailbox.identity() == caller
                && self.translation.virt_to_phys(VirtAddr::of(slot.mailbox)) == phys
        });

        match slot {
            Some(slot) => {
                slot.registered = true;
                debug!("[MONITOR] {} registered mailbox at {}", caller, phys);
                status::SUCCESS
            }
            None => {
                warn!("[MONITOR] {} registered unknown mailbox {}", caller, phys);
                status::ERROR
            }
        }
    }

    fn dispatch(&self, caller: Identity, dest: Identity, buf: PhysAddr, len: usize) -> isize {
        if len > MAX_MESSAGE_SIZE {
            warn!("[MONITOR] {} -> {}: {} bytes over limit", caller, dest, len);
            return status::ERROR;
        }

        let target = self
            .slots
            .lock()
            .iter()
            .flatten()
            .find(|slot| slot.registered && slot.mailbox.identity() == dest)
            .map(|slot| slot.mailbox);

        let Some(mailbox) = target else {
            warn!("[MONITOR] {} -> {}: no registered mailbox", caller, dest);
            return status::ERROR;
        };

        let src = self.translation.phys_to_virt(buf);
        let bytes: &[u8] = if len == 0 {
            &[]
        } else {
            // SAFETY: guaranteed readable by the contract of `new`
            unsafe { core::slice::from_raw_parts(src.as_ptr::<u8>(), len) }
        };

        match mailbox.deliver(caller, bytes) {
            Ok(()) => status::SUCCESS,
            Err(e) => {
                warn!("[MONITOR] {} -> {}: delivery refused: {}", caller, dest, e);
                status::ERROR
            }
        }
    }
}

/// One enclave's view of a [`LoopbackMonitor`].
pub struct LoopbackPort<'m, 'a, T: AddressTranslation, const CAP: usize, const N: usize> {
    monitor: &'m LoopbackMonitor<'a, T, CAP, N>,
    caller: Identity,
}

impl<T: AddressTranslation, const CAP: usize, const N: usize> Monitor
    for LoopbackPort<'_, '_, T, CAP, N>
{
    fn register_mailbox(&self, mailbox: PhysAddr) -> isize {
        self.monitor.register(self.caller, mailbox)
    }

    fn dispatch_message(&self, dest: Identity, buf: PhysAddr, len: usize) -> isize {
        self.monitor.dispatch(self.caller, dest, buf, len)
    }
}
