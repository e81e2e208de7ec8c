//! Cross-Domain Range Validation
//!
//! Provides the copy primitives the mailbox uses for caller-supplied
//! buffers that live in a less-trusted domain.
//!
//! # Security Principles
//! - Validate ALL ranges before use
//! - Fail-secure: a range outside every window is denied
//! - Prevent common vulnerabilities:
//!   - Buffer overflows (bounds checking)
//!   - Wrap-around (checked end computation)
//!   - TOCTOU races (bytes are copied, never borrowed long-term)
//!   - Null pointer dereference (explicit checks)

use core::fmt;

use bitflags::bitflags;
use log::warn;

use crate::mm::VirtAddr;

bitflags! {
    /// Permissions a window grants to the enclave.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Access: u8 {
        /// Enclave may read from the window.
        const READ = 1 << 0;
        /// Enclave may write into the window.
        const WRITE = 1 << 1;
        /// Both directions.
        const READ_WRITE = Self::READ.bits() | Self::WRITE.bits();
    }
}

/// Range validation failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessError {
    /// Null pointer with a non-zero length.
    Null,
    /// Range is not fully inside one window.
    OutOfRange,
    /// `ptr + len` wraps the address space.
    Overflow,
    /// The window does not grant the needed access.
    Denied,
}

impl fmt::Display for AccessError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "null pointer"),
            Self::OutOfRange => write!(f, "range outside accessible memory"),
            Self::Overflow => write!(f, "range overflows address space"),
            Self::Denied => write!(f, "access not permitted"),
        }
    }
}

/// A window of foreign memory the enclave may touch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UserRegion {
    start: VirtAddr,
    end: VirtAddr,
    access: Access,
}

impl UserRegion {
    /// Window `[start, start + len)`; `None` if it wraps.
    pub const fn new(start: usize, len: usize, access: Access) -> Option<Self> {
        match start.checked_add(len) {
            Some(end) => Some(Self {
                start: VirtAddr::new(start),
                end: VirtAddr::new(end),
                access,
            }),
            None => None,
        }
    }

    /// Start of the window.
    #[inline]
    pub const fn start(&self) -> VirtAddr {
        self.start
    }

    /// One past the last byte of the window.
    #[inline]
    pub const fn end(&self) -> VirtAddr {
        self.end
    }

    /// Granted access.
    #[inline]
    pub const fn access(&self) -> Access {
        self.access
    }

    #[inline]
    fn contains(&self, addr: VirtAddr) -> bool {
        addr >= self.start() && addr < self.end()
    }
}

fn validate(
    regions: &[UserRegion],
    ptr: VirtAddr,
    len: usize,
    needed: Access,
) -> Result<(), AccessError> {
    // Zero-length ranges never touch memory
    if len == 0 {
        return Ok(());
    }

    if ptr.is_null() {
        return Err(AccessError::Null);
    }

    let end = ptr.checked_add(len).ok_or(AccessError::Overflow)?;

    let region = regions
        .iter()
        .find(|r| r.contains(ptr))
        .ok_or(AccessError::OutOfRange)?;

    if end > region.end() {
        return Err(AccessError::OutOfRange);
    }

    if !region.access().contains(needed) {
        return Err(AccessError::Denied);
    }

    Ok(())
}

/// A validated readable foreign buffer.
#[derive(Debug)]
pub struct UserBuffer {
    ptr: *const u8,
    len: usize,
}

impl UserBuffer {
    /// View the buffer's bytes.
    ///
    /// The contents may change underneath if the other domain writes
    /// concurrently, so callers copy out immediately.
    pub fn as_bytes(&self) -> &[u8] {
        if self.len == 0 {
            return &[];
        }
        // SAFETY:
        // - Range was validated against a readable window
        // - Length is validated to not overflow
        unsafe { core::slice::from_raw_parts(self.ptr, self.len) }
    }
}

/// A validated writable foreign buffer.
#[derive(Debug)]
pub struct UserBufferMut {
    ptr: *mut u8,
    len: usize,
}

impl UserBufferMut {
    /// View the buffer's bytes mutably.
    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        if self.len == 0 {
            return &mut [];
        }
        // SAFETY: range was validated against a writable window
        unsafe { core::slice::from_raw_parts_mut(self.ptr, self.len) }
    }
}

/// Validate a foreign range for reading.
///
/// # Security Checks
/// 1. Pointer is not null (unless `len == 0`)
/// 2. Pointer + length doesn't overflow
/// 3. The whole range sits inside one window
/// 4. That window grants `READ`
pub fn validate_user_read(
    regions: &[UserRegion],
    ptr: VirtAddr,
    len: usize,
) -> Result<UserBuffer, AccessError> {
    validate(regions, ptr, len, Access::READ)?;
    Ok(UserBuffer {
        // SAFETY: only turned into a slice after validation
        ptr: unsafe { ptr.as_ptr() },
        len,
    })
}

/// Validate a foreign range for writing.
///
/// Same checks as [`validate_user_read`], requiring `WRITE`.
pub fn validate_user_write(
    regions: &[UserRegion],
    ptr: VirtAddr,
    len: usize,
) -> Result<UserBufferMut, AccessError> {
    validate(regions, ptr, len, Access::WRITE)?;
    Ok(UserBufferMut {
        // SAFETY: only turned into a slice after validation
        ptr: unsafe { ptr.as_mut_ptr() },
        len,
    })
}

/// Copy primitives for memory owned by another trust domain.
///
/// Implementations validate the foreign range themselves; callers
/// never pre-check.
pub trait UserMemory {
    /// Copy `dst.len()` bytes from foreign `src` into local `dst`.
    fn copy_from_user(&self, dst: &mut [u8], src: VirtAddr) -> Result<(), AccessError>;

    /// Copy local `src` into foreign memory at `dst`.
    fn copy_to_user(&self, dst: VirtAddr, src: &[u8]) -> Result<(), AccessError>;
}

/// [`UserMemory`] backed by a fixed table of windows.
#[derive(Debug, Clone, Copy)]
pub struct RegionCopy<'a> {
    regions: &'a [UserRegion],
}

impl<'a> RegionCopy<'a> {
    /// Create a copier over the given windows.
    ///
    /// # Safety
    /// Every window must describe memory that is mapped and accessible
    /// with the stated permissions for as long as the copier is used.
    pub const unsafe fn new(regions: &'a [UserRegion]) -> Self {
        Self { regions }
    }
}

impl UserMemory for RegionCopy<'_> {
    fn copy_from_user(&self, dst: &mut [u8], src: VirtAddr) -> Result<(), AccessError> {
        let user = validate_user_read(self.regions, src, dst.len()).map_err(|e| {
            warn!("[BOUNDARY] read of {} bytes at {} rejected: {}", dst.len(), src, e);
            e
        })?;
        dst.copy_from_slice(user.as_bytes());
        Ok(())
    }

    fn copy_to_user(&self, dst: VirtAddr, src: &[u8]) -> Result<(), AccessError> {
        let mut user = validate_user_write(self.regions, dst, src.len()).map_err(|e| {
            warn!("[BOUNDARY] write of {} bytes at {} rejected: {}", src.len(), dst, e);
            e
        })?;
        user.as_bytes_mut().copy_from_slice(src);
        Ok(())
    }
}
