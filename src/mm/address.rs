//! Physical and Virtual Address Types
//!
//! Type-safe wrappers that keep the addresses handed to the monitor
//! (physical) apart from the addresses the enclave dereferences
//! (virtual).
//!
//! # Security Properties
//! - Physical addresses cannot be dereferenced directly
//! - Virtual addresses require explicit unsafe conversion to pointers

use core::fmt;

/// A physical memory address.
///
/// This is the only form in which the mailbox store and the staging
/// buffers are ever named to the monitor.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct PhysAddr(usize);

impl PhysAddr {
    /// Create a physical address.
    #[inline]
    pub const fn new(addr: usize) -> Self {
        Self(addr)
    }

    /// Get the raw address value.
    #[inline]
    pub const fn as_usize(self) -> usize {
        self.0
    }

    /// Get the raw address as u64 (monitor call argument width).
    #[inline]
    pub const fn as_u64(self) -> u64 {
        self.0 as u64
    }
}

impl fmt::Debug for PhysAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PhysAddr({:#018x})", self.0)
    }
}

impl fmt::Display for PhysAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#018x}", self.0)
    }
}

/// A virtual memory address in some trust domain.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct VirtAddr(usize);

impl VirtAddr {
    /// Create a virtual address.
    #[inline]
    pub const fn new(addr: usize) -> Self {
        Self(addr)
    }

    /// Address of a local object.
    #[inline]
    pub fn of<T: ?Sized>(value: &T) -> Self {
        Self(value as *const T as *const u8 as usize)
    }

    /// Get the raw address value.
    #[inline]
    pub const fn as_usize(self) -> usize {
        self.0
    }

    /// Whether this is the null address.
    #[inline]
    pub const fn is_null(self) -> bool {
        self.0 == 0
    }

    /// Add an offset, returning `None` on overflow.
    #[inline]
    pub const fn checked_add(self, offset: usize) -> Option<Self> {
        match self.0.checked_add(offset) {
            Some(addr) => Some(Self(addr)),
            None => None,
        }
    }

    /// Convert to a raw pointer.
    ///
    /// # Safety
    /// The caller must ensure the address is valid and properly mapped.
    #[inline]
    pub const unsafe fn as_ptr<T>(self) -> *const T {
        self.0 as *const T
    }

    /// Convert to a mutable raw pointer.
    ///
    /// # Safety
    /// The caller must ensure the address is valid, properly mapped,
    /// and that mutable access is safe.
    #[inline]
    pub const unsafe fn as_mut_ptr<T>(self) -> *mut T {
        self.0 as *mut T
    }
}

impl fmt::Debug for VirtAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "VirtAddr({:#018x})", self.0)
    }
}

impl fmt::Display for VirtAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#018x}", self.0)
    }
}

/// Translation between the enclave's virtual view and physical memory.
pub trait AddressTranslation {
    /// Physical address backing a local virtual address.
    fn virt_to_phys(&self, virt: VirtAddr) -> PhysAddr;

    /// Local virtual address for a physical address.
    fn phys_to_virt(&self, phys: PhysAddr) -> VirtAddr;
}

/// Direct-mapped window: `phys = virt - virt_base + phys_base`.
#[derive(Debug, Clone, Copy)]
pub struct OffsetTranslation {
    virt_base: usize,
    phys_base: usize,
}

impl OffsetTranslation {
    /// Create a translation for a linear window.
    pub const fn new(virt_base: usize, phys_base: usize) -> Self {
        Self {
            virt_base,
            phys_base,
        }
    }
}

impl AddressTranslation for OffsetTranslation {
    #[inline]
    fn virt_to_phys(&self, virt: VirtAddr) -> PhysAddr {
        debug_assert!(virt.as_usize() >= self.virt_base);
        PhysAddr::new(virt.as_usize().wrapping_sub(self.virt_base).wrapping_add(self.phys_base))
    }

    #[inline]
    fn phys_to_virt(&self, phys: PhysAddr) -> VirtAddr {
        debug_assert!(phys.as_usize() >= self.phys_base);
        VirtAddr::new(phys.as_usize().wrapping_sub(self.phys_base).wrapping_add(self.virt_base))
    }
}

/// Physical equals virtual. Used on hosts where the monitor shares the
/// enclave's address space.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityTranslation;

impl AddressTranslation for IdentityTranslation {
    #[inline]
    fn virt_to_phys(&self, virt: VirtAddr) -> PhysAddr {
        PhysAddr::new(virt.as_usize())
    }

    #[inline]
    fn phys_to_virt(&self, phys: PhysAddr) -> VirtAddr {
        VirtAddr::new(phys.as_usize())
    }
}
