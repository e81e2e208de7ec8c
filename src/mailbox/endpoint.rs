//! Mailbox Endpoint
//!
//! Binds a mailbox to the services it needs from outside the enclave and
//! exposes the three paths: registration, receive, and send.
//!
//! # Security Considerations
//! - Destination and source buffers are foreign and only touched through
//!   the platform's validated copy primitives
//! - Send stages into a per-call buffer that is cleared on every exit
//! - Monitor statuses are reported verbatim; nothing is retried

use log::{error, info, warn};

use super::store::Mailbox;
use super::wait::{self, WaitOptions};
use super::Identity;
use crate::boundary::{Monitor, UserMemory};
use crate::config::{MAILBOX_SIZE, MAX_MESSAGE_SIZE};
use crate::error::MailboxError;
use crate::mm::{AddressTranslation, VirtAddr};
use crate::security::Zeroizing;

/// Services a mailbox consumes from its environment.
pub trait Platform {
    /// Privileged call surface.
    type Monitor: Monitor;
    /// Cross-domain copy primitives.
    type Memory: UserMemory;
    /// Virtual to physical translation.
    type Translation: AddressTranslation;

    /// The monitor.
    fn monitor(&self) -> &Self::Monitor;
    /// The copy primitives.
    fn memory(&self) -> &Self::Memory;
    /// The translation.
    fn translation(&self) -> &Self::Translation;
}

/// A [`Platform`] assembled from its three parts.
#[derive(Debug, Clone, Copy)]
pub struct Board<M, U, T> {
    pub monitor: M,
    pub memory: U,
    pub translation: T,
}

impl<M: Monitor, U: UserMemory, T: AddressTranslation> Platform for Board<M, U, T> {
    type Monitor = M;
    type Memory = U;
    type Translation = T;

    #[inline]
    fn monitor(&self) -> &M {
        &self.monitor
    }

    #[inline]
    fn memory(&self) -> &U {
        &self.memory
    }

    #[inline]
    fn translation(&self) -> &T {
        &self.translation
    }
}

/// A registered mailbox plus the platform it talks through.
///
/// Created once by [`Endpoint::init`] and passed to whoever needs to send
/// or receive; there is no global mailbox.
pub struct Endpoint<'a, P: Platform, const CAP: usize = MAILBOX_SIZE> {
    mailbox: &'a Mailbox<CAP>,
    platform: &'a P,
}

impl<'a, P: Platform, const CAP: usize> Endpoint<'a, P, CAP> {
    /// Reset `mailbox` and register it with the monitor.
    ///
    /// A failed registration is not retried; the mailbox is unusable and
    /// the raw status is returned in `TransportFailure`.
    pub fn init(mailbox: &'a Mailbox<CAP>, platform: &'a P) -> Result<Self, MailboxError> {
        mailbox.reset();

        let phys = platform.translation().virt_to_phys(VirtAddr::of(mailbox));
        let status = platform.monitor().register_mailbox(phys);

        match MailboxError::from_status(status) {
            Ok(()) => {
                info!(
                    "[MAILBOX] {} registered ({} bytes at {})",
                    mailbox.identity(),
                    mailbox.capacity(),
                    phys
                );
                Ok(Self { mailbox, platform })
            }
            Err(e) => {
                error!("[MAILBOX] {} registration failed: {}", mailbox.identity(), e);
                Err(e)
            }
        }
    }

    /// The owner's identity.
    #[inline]
    pub fn identity(&self) -> Identity {
        self.mailbox.identity()
    }

    /// The underlying mailbox.
    #[inline]
    pub fn mailbox(&self) -> &'a Mailbox<CAP> {
        self.mailbox
    }

    /// Take the first message from `sender` into the foreign buffer
    /// `[dst, dst + dst_len)`.
    ///
    /// Non-blocking. Returns the payload length.
    ///
    /// # Errors
    /// - `NotFound`: nothing queued from `sender`
    /// - `MessageTooLarge`: payload exceeds `dst_len`; message stays queued
    /// - `BadAddress`: destination range rejected; message stays queued
    pub fn receive(
        &self,
        sender: Identity,
        dst: VirtAddr,
        dst_len: usize,
    ) -> Result<usize, MailboxError> {
        let memory = self.platform.memory();
        self.mailbox.take_with(sender, dst_len, |payload| {
            memory.copy_to_user(dst, payload).map_err(MailboxError::from)
        })
    }

    /// [`receive`](Self::receive), waiting for arrivals on a miss.
    ///
    /// # Errors
    /// As `receive`, plus `TimedOut` and `Cancelled` from `options`.
    pub fn receive_wait(
        &self,
        sender: Identity,
        dst: VirtAddr,
        dst_len: usize,
        options: &WaitOptions<'_>,
    ) -> Result<usize, MailboxError> {
        wait::retry_on_arrival(self.mailbox, options, || self.receive(sender, dst, dst_len))
    }

    /// Send `len` bytes from the foreign buffer at `src` to `dest`.
    ///
    /// Only the absolute bound (mailbox capacity, capped by the staging
    /// buffer) is checked here; the monitor owns admission into the
    /// destination store and may still refuse.
    ///
    /// # Errors
    /// - `MessageTooLarge`: `len` exceeds the bound; nothing copied
    /// - `BadAddress`: source range rejected; nothing dispatched
    /// - `TransportFailure`: the monitor refused the message
    pub fn send(&self, dest: Identity, src: VirtAddr, len: usize) -> Result<(), MailboxError> {
        if len > CAP.min(MAX_MESSAGE_SIZE) {
            warn!("[SEND] {} -> {}: {} bytes over limit", self.identity(), dest, len);
            return Err(MailboxError::MessageTooLarge);
        }

        let mut staging = Zeroizing::new([0u8; MAX_MESSAGE_SIZE]);
        self.platform
            .memory()
            .copy_from_user(&mut staging[..len], src)?;

        let phys = self
            .platform
            .translation()
            .virt_to_phys(VirtAddr::of(&*staging));
        let status = self.platform.monitor().dispatch_message(dest, phys, len);

        MailboxError::from_status(status).map_err(|e| {
            warn!("[SEND] {} -> {}: {}", self.identity(), dest, e);
            e
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::boundary::{status, Access, RegionCopy, UserRegion};
    use crate::mm::{IdentityTranslation, PhysAddr};
    use core::cell::{Cell, RefCell};

    #[derive(Default)]
    struct RecordingMonitor {
        register_status: isize,
        dispatch_status: isize,
        registered: Cell<Option<PhysAddr>>,
        sent: RefCell<Vec<(Identity, Vec<u8>)>>,
    }

    impl Monitor for RecordingMonitor {
        fn register_mailbox(&self, mailbox: PhysAddr) -> isize {
            self.registered.set(Some(mailbox));
            self.register_status
        }

        fn dispatch_message(&self, dest: Identity, buf: PhysAddr, len: usize) -> isize {
            // SAFETY: identity translation over a live staging buffer
            let bytes = unsafe { core::slice::from_raw_parts(buf.as_usize() as *const u8, len) };
            self.sent.borrow_mut().push((dest, bytes.to_vec()));
            self.dispatch_status
        }
    }

    fn board<'r>(
        monitor: RecordingMonitor,
        regions: &'r [UserRegion],
    ) -> Board<RecordingMonitor, RegionCopy<'r>, IdentityTranslation> {
        Board {
            monitor,
            // SAFETY: tests only describe live local buffers
            memory: unsafe { RegionCopy::new(regions) },
            translation: IdentityTranslation,
        }
    }

    #[test]
    fn test_init_registers_physical_address() {
        let mailbox: Mailbox = Mailbox::new(Identity::new(1));
        mailbox.deliver(Identity::new(9), b"stale").unwrap();
        let board = board(RecordingMonitor::default(), &[]);

        let endpoint = Endpoint::init(&mailbox, &board).unwrap();
        assert_eq!(endpoint.identity(), Identity::new(1));
        assert!(mailbox.is_empty());
        assert_eq!(
            board.monitor.registered.get(),
            Some(PhysAddr::new(&mailbox as *const Mailbox as usize))
        );
    }

    #[test]
    fn test_init_failure_keeps_raw_status() {
        let mailbox: Mailbox = Mailbox::new(Identity::new(1));
        let monitor = RecordingMonitor {
            register_status: -3,
            ..Default::default()
        };
        let board = board(monitor, &[]);
        assert!(matches!(
            Endpoint::init(&mailbox, &board),
            Err(MailboxError::TransportFailure(-3))
        ));
    }

    #[test]
    fn test_send_oversize_touches_nothing() {
        let mailbox: Mailbox = Mailbox::new(Identity::new(1));
        let src = [0u8; MAX_MESSAGE_SIZE + 1];
        let regions = [UserRegion::new(src.as_ptr() as usize, src.len(), Access::READ).unwrap()];
        let board = board(RecordingMonitor::default(), &regions);
        let endpoint = Endpoint::init(&mailbox, &board).unwrap();

        assert_eq!(
            endpoint.send(Identity::new(9), VirtAddr::of(&src), MAILBOX_SIZE + 1),
            Err(MailboxError::MessageTooLarge)
        );
        assert!(board.monitor.sent.borrow().is_empty());
    }

    #[test]
    fn test_send_over_small_capacity_touches_nothing() {
        let mailbox: Mailbox<40> = Mailbox::new(Identity::new(1));
        let src = [0x5Au8; 41];
        let regions = [UserRegion::new(src.as_ptr() as usize, src.len(), Access::READ).unwrap()];
        let board = board(RecordingMonitor::default(), &regions);
        let endpoint = Endpoint::init(&mailbox, &board).unwrap();

        assert_eq!(
            endpoint.send(Identity::new(9), VirtAddr::of(&src), 41),
            Err(MailboxError::MessageTooLarge)
        );
        assert!(board.monitor.sent.borrow().is_empty());

        endpoint
            .send(Identity::new(9), VirtAddr::of(&src), 40)
            .unwrap();
        assert_eq!(board.monitor.sent.borrow()[0].1.len(), 40);
    }

    #[test]
    fn test_send_stages_and_dispatches() {
        let mailbox: Mailbox = Mailbox::new(Identity::new(1));
        let src = *b"hello monitor";
        let regions = [UserRegion::new(src.as_ptr() as usize, src.len(), Access::READ).unwrap()];
        let board = board(RecordingMonitor::default(), &regions);
        let endpoint = Endpoint::init(&mailbox, &board).unwrap();

        endpoint
            .send(Identity::new(9), VirtAddr::of(&src), 5)
            .unwrap();
        let sent = board.monitor.sent.borrow();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, Identity::new(9));
        assert_eq!(sent[0].1, b"hello");
    }

    #[test]
    fn test_send_rejects_unmapped_source() {
        let mailbox: Mailbox = Mailbox::new(Identity::new(1));
        let src = [1u8; 8];
        let board = board(RecordingMonitor::default(), &[]);
        let endpoint = Endpoint::init(&mailbox, &board).unwrap();

        assert_eq!(
            endpoint.send(Identity::new(9), VirtAddr::of(&src), 8),
            Err(MailboxError::BadAddress)
        );
        assert!(board.monitor.sent.borrow().is_empty());
    }

    #[test]
    fn test_send_reports_transport_failure() {
        let mailbox: Mailbox = Mailbox::new(Identity::new(1));
        let src = [1u8; 8];
        let regions = [UserRegion::new(src.as_ptr() as usize, src.len(), Access::READ).unwrap()];
        let monitor = RecordingMonitor {
            dispatch_status: status::ERROR,
            ..Default::default()
        };
        let board = board(monitor, &regions);
        let endpoint = Endpoint::init(&mailbox, &board).unwrap();

        assert_eq!(
            endpoint.send(Identity::new(9), VirtAddr::of(&src), 8),
            Err(MailboxError::TransportFailure(status::ERROR))
        );
    }

    #[test]
    fn test_receive_into_read_only_window_keeps_record() {
        let mailbox: Mailbox = Mailbox::new(Identity::new(1));
        let dst = [0u8; 16];
        let regions = [UserRegion::new(dst.as_ptr() as usize, dst.len(), Access::READ).unwrap()];
        let board = board(RecordingMonitor::default(), &regions);
        let endpoint = Endpoint::init(&mailbox, &board).unwrap();
        mailbox.deliver(Identity::new(7), b"hi").unwrap();

        assert_eq!(
            endpoint.receive(Identity::new(7), VirtAddr::of(&dst), dst.len()),
            Err(MailboxError::BadAddress)
        );
        assert_eq!(mailbox.pending_from(Identity::new(7)), 1);
    }
}
