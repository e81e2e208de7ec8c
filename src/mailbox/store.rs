//! Mailbox Store
//!
//! The byte region shared with the monitor by physical address.
//!
//! # Invariants
//! - `data[0..size)` holds back-to-back records in arrival order
//! - The framed lengths of those records sum to `size`
//! - `size <= capacity`, and `capacity` never changes
//! - `data[size..capacity)` is free and always zero
//! - Every mutation of `size` or `data` happens under the lock

use core::sync::atomic::{AtomicU64, Ordering};

use log::{debug, trace, warn};

use super::codec::{encode_record, RecordHeader, Records};
use super::wait::{self, WaitOptions};
use super::Identity;
use crate::config::{HEADER_SIZE, MAILBOX_SIZE, MAX_MESSAGE_SIZE};
use crate::error::MailboxError;
use crate::security::Zeroize;
use crate::sync::SpinLock;

#[repr(C)]
struct Store<const CAP: usize> {
    size: usize,
    data: [u8; CAP],
}

impl<const CAP: usize> Store<CAP> {
    const fn new() -> Self {
        Self {
            size: 0,
            data: [0; CAP],
        }
    }

    #[inline]
    fn occupied(&self) -> &[u8] {
        &self.data[..self.size]
    }

    fn find(&self, sender: Identity) -> Option<(usize, RecordHeader)> {
        Records::new(self.occupied())
            .inspect(|record| {
                trace!(
                    "[MAILBOX] scan offset {}: {} ({} bytes)",
                    record.offset,
                    record.header.sender,
                    record.header.len
                )
            })
            .find(|record| record.header.sender == sender)
            .map(|record| (record.offset, record.header))
    }

    /// Erase the record at `offset` and close the gap.
    fn remove(&mut self, offset: usize, framed: usize) {
        let end = offset + framed;
        debug_assert!(end <= self.size);

        self.data[offset..end].zeroize();
        self.data.copy_within(end..self.size, offset);

        let new_size = self.size - framed;
        self.data[new_size..self.size].zeroize();
        self.size = new_size;
    }

    fn append(&mut self, sender: Identity, payload: &[u8]) -> Result<(), MailboxError> {
        let free = CAP - self.size;
        if HEADER_SIZE + payload.len() > free {
            return Err(MailboxError::NoSpace);
        }
        let framed = encode_record(&mut self.data[self.size..], sender, payload)
            .ok_or(MailboxError::NoSpace)?;
        self.size += framed;
        Ok(())
    }

    fn reset(&mut self) {
        self.data.zeroize();
        self.size = 0;
    }
}

/// A bounded mailbox owned by one enclave.
///
/// The layout is `#[repr(C)]` because the monitor locates the store by
/// physical address and takes the same lock word when it inserts.
#[repr(C)]
pub struct Mailbox<const CAP: usize = MAILBOX_SIZE> {
    capacity: usize,
    identity: Identity,
    arrivals: AtomicU64,
    store: SpinLock<Store<CAP>>,
}

impl<const CAP: usize> Mailbox<CAP> {
    /// Create an empty mailbox owned by `identity`.
    pub const fn new(identity: Identity) -> Self {
        Self {
            capacity: CAP,
            identity,
            arrivals: AtomicU64::new(0),
            store: SpinLock::new(Store::new()),
        }
    }

    /// The owner's identity.
    #[inline]
    pub const fn identity(&self) -> Identity {
        self.identity
    }

    /// Maximum bytes the store can hold.
    #[inline]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Occupied bytes.
    pub fn size(&self) -> usize {
        self.store.lock().size
    }

    /// Unoccupied bytes.
    pub fn free(&self) -> usize {
        self.capacity - self.size()
    }

    /// Whether no records are queued.
    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }

    /// Number of queued records from `sender`.
    pub fn pending_from(&self, sender: Identity) -> usize {
        let store = self.store.lock();
        Records::new(store.occupied())
            .filter(|record| record.header.sender == sender)
            .count()
    }

    /// Run `f` over the occupied bytes with the lock held.
    pub fn inspect<R>(&self, f: impl FnOnce(&[u8]) -> R) -> R {
        let store = self.store.lock();
        f(store.occupied())
    }

    /// Empty the store and clear every byte.
    pub fn reset(&self) {
        self.store.lock().reset();
    }

    /// Insert a record at the tail. This is the monitor's side of the
    /// mailbox; the enclave itself only ever drains.
    pub fn deliver(&self, sender: Identity, payload: &[u8]) -> Result<(), MailboxError> {
        if payload.len() > MAX_MESSAGE_SIZE {
            warn!("[MAILBOX] {} bytes from {} over limit", payload.len(), sender);
            return Err(MailboxError::MessageTooLarge);
        }

        self.store.lock().append(sender, payload)?;
        trace!("[MAILBOX] {} queued {} bytes for {}", sender, payload.len(), self.identity);
        self.notify_arrival();
        Ok(())
    }

    /// Signal that the monitor inserted a record behind our back.
    #[inline]
    pub fn notify_arrival(&self) {
        self.arrivals.fetch_add(1, Ordering::Release);
    }

    /// Arrival counter; moves on every insertion notification.
    #[inline]
    pub fn arrivals(&self) -> u64 {
        self.arrivals.load(Ordering::Acquire)
    }

    /// Take the first record from `sender` into a local buffer.
    ///
    /// Non-blocking: a miss returns `NotFound` immediately. Returns the
    /// payload length on success.
    pub fn receive(&self, sender: Identity, dst: &mut [u8]) -> Result<usize, MailboxError> {
        self.take_with(sender, dst.len(), |payload| {
            dst[..payload.len()].copy_from_slice(payload);
            Ok(())
        })
    }

    /// [`receive`](Self::receive), waiting for arrivals on a miss.
    pub fn receive_wait(
        &self,
        sender: Identity,
        dst: &mut [u8],
        options: &WaitOptions<'_>,
    ) -> Result<usize, MailboxError> {
        wait::retry_on_arrival(self, options, || self.receive(sender, dst))
    }

    /// Core receive: locate the first record from `sender`, hand its
    /// payload to `copy`, then erase and compact.
    ///
    /// The record stays queued if it is larger than `dst_capacity` or if
    /// `copy` fails. The lock is released on every return.
    pub(crate) fn take_with<F>(
        &self,
        sender: Identity,
        dst_capacity: usize,
        copy: F,
    ) -> Result<usize, MailboxError>
    where
        F: FnOnce(&[u8]) -> Result<(), MailboxError>,
    {
        let mut store = self.store.lock();

        let (offset, header) = store.find(sender).ok_or(MailboxError::NotFound)?;

        if header.len > dst_capacity {
            debug!(
                "[MAILBOX] {} byte message from {} exceeds {} byte buffer",
                header.len, sender, dst_capacity
            );
            return Err(MailboxError::MessageTooLarge);
        }

        let start = offset + HEADER_SIZE;
        copy(&store.data[start..start + header.len])?;

        store.remove(offset, header.framed_len());
        trace!("[MAILBOX] took {} bytes from {}, {} left", header.len, sender, store.size);
        Ok(header.len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot<const CAP: usize>(mailbox: &Mailbox<CAP>) -> Vec<u8> {
        mailbox.inspect(|bytes| bytes.to_vec())
    }

    #[test]
    fn test_empty_store_not_found() {
        let mailbox: Mailbox = Mailbox::new(Identity::new(1));
        let mut buf = [0u8; 16];
        assert_eq!(
            mailbox.receive(Identity::new(7), &mut buf),
            Err(MailboxError::NotFound)
        );
    }

    #[test]
    fn test_receive_single() {
        let mailbox: Mailbox = Mailbox::new(Identity::new(1));
        mailbox.deliver(Identity::new(7), b"hi").unwrap();
        assert_eq!(mailbox.size(), HEADER_SIZE + 2);

        let mut buf = [0u8; 16];
        assert_eq!(mailbox.receive(Identity::new(7), &mut buf), Ok(2));
        assert_eq!(&buf[..2], b"hi");
        assert_eq!(mailbox.size(), 0);
        assert!(mailbox.is_empty());
    }

    #[test]
    fn test_too_large_leaves_store_untouched() {
        let mailbox: Mailbox = Mailbox::new(Identity::new(1));
        mailbox.deliver(Identity::new(3), b"abcdefgh").unwrap();
        let before = snapshot(&mailbox);

        let mut small = [0u8; 4];
        assert_eq!(
            mailbox.receive(Identity::new(3), &mut small),
            Err(MailboxError::MessageTooLarge)
        );
        assert_eq!(small, [0u8; 4]);
        assert_eq!(snapshot(&mailbox), before);

        let mut big = [0u8; 8];
        assert_eq!(mailbox.receive(Identity::new(3), &mut big), Ok(8));
    }

    #[test]
    fn test_failed_copy_leaves_record_queued() {
        let mailbox: Mailbox = Mailbox::new(Identity::new(1));
        mailbox.deliver(Identity::new(3), b"keep").unwrap();
        let result = mailbox.take_with(Identity::new(3), 16, |_| Err(MailboxError::BadAddress));
        assert_eq!(result, Err(MailboxError::BadAddress));
        assert_eq!(mailbox.pending_from(Identity::new(3)), 1);
        assert!(!mailbox.store.is_locked());
    }

    #[test]
    fn test_middle_extraction_compacts() {
        let mailbox: Mailbox = Mailbox::new(Identity::new(1));
        mailbox.deliver(Identity::new(3), b"first").unwrap();
        mailbox.deliver(Identity::new(5), b"middle").unwrap();
        mailbox.deliver(Identity::new(4), b"last").unwrap();

        let mut buf = [0u8; 16];
        assert_eq!(mailbox.receive(Identity::new(5), &mut buf), Ok(6));

        let mut expected = vec![0u8; 2 * HEADER_SIZE + 9];
        let used = encode_record(&mut expected, Identity::new(3), b"first").unwrap();
        encode_record(&mut expected[used..], Identity::new(4), b"last").unwrap();
        assert_eq!(snapshot(&mailbox), expected);
        assert_eq!(mailbox.size(), expected.len());

        // freed tail is cleared
        let store = mailbox.store.lock();
        assert!(store.data[store.size..].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_fifo_within_sender() {
        let mailbox: Mailbox = Mailbox::new(Identity::new(1));
        mailbox.deliver(Identity::new(3), b"a").unwrap();
        mailbox.deliver(Identity::new(5), b"x").unwrap();
        mailbox.deliver(Identity::new(3), b"b").unwrap();
        mailbox.deliver(Identity::new(3), b"c").unwrap();

        let mut buf = [0u8; 1];
        for expected in [b"a", b"b", b"c"] {
            assert_eq!(mailbox.receive(Identity::new(3), &mut buf), Ok(1));
            assert_eq!(&buf, expected);
        }
        assert_eq!(mailbox.pending_from(Identity::new(5)), 1);
    }

    #[test]
    fn test_zero_length_payload() {
        let mailbox: Mailbox = Mailbox::new(Identity::new(1));
        mailbox.deliver(Identity::new(2), b"").unwrap();
        mailbox.deliver(Identity::new(2), b"z").unwrap();

        let mut buf = [0u8; 0];
        assert_eq!(mailbox.receive(Identity::new(2), &mut buf), Ok(0));
        assert_eq!(mailbox.size(), HEADER_SIZE + 1);
    }

    #[test]
    fn test_deliver_respects_capacity() {
        let mailbox: Mailbox<40> = Mailbox::new(Identity::new(1));
        mailbox.deliver(Identity::new(2), &[1u8; 20]).unwrap();
        assert_eq!(
            mailbox.deliver(Identity::new(2), &[1u8; 1]),
            Err(MailboxError::NoSpace)
        );
        assert_eq!(mailbox.free(), 4);
        assert_eq!(
            mailbox.deliver(Identity::new(2), &[0u8; MAX_MESSAGE_SIZE + 1]),
            Err(MailboxError::MessageTooLarge)
        );
    }

    #[test]
    fn test_reset_clears_everything() {
        let mailbox: Mailbox = Mailbox::new(Identity::new(1));
        mailbox.deliver(Identity::new(2), b"secret").unwrap();
        mailbox.reset();
        assert!(mailbox.is_empty());
        assert!(mailbox.store.lock().data.iter().all(|&b| b == 0));
        assert_eq!(mailbox.capacity(), MAILBOX_SIZE);
    }
}
