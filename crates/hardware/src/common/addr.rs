//! Guest virtual and physical address types.
//!
//! The translator and the engine pass addresses around as raw `u64` on the hot
//! path; these newtypes are used at the seams where mixing the two spaces would
//! be a bug:
//! 1. **Translation:** `Mmu::translate` takes a `VirtAddr` and yields a `PhysAddr`.
//! 2. **Page arithmetic:** VPN slicing for the Sv39 walk and page-offset masking.

use super::constants::{PAGE_SHIFT, PAGE_SIZE, VPN_BITS_PER_LEVEL, VPN_INDEX_MASK};

/// A guest virtual address.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VirtAddr(pub u64);

/// A guest physical address (an offset into guest memory).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PhysAddr(pub u64);

impl VirtAddr {
    /// Creates a new virtual address from a raw 64-bit value.
    #[inline(always)]
    pub const fn new(addr: u64) -> Self {
        Self(addr)
    }

    /// Returns the raw 64-bit address value.
    #[inline(always)]
    pub const fn val(self) -> u64 {
        self.0
    }

    /// Byte offset within a 4 KiB page.
    #[inline(always)]
    pub const fn page_offset(self) -> u64 {
        self.0 & (PAGE_SIZE - 1)
    }

    /// Extracts the 9-bit virtual page number slice used at `level` of an
    /// Sv39 walk.
    ///
    /// # Arguments
    ///
    /// * `level` - Walk level, 2 (root) down to 0.
    ///
    /// # Returns
    ///
    /// `(va >> (12 + 9 * level)) & 0x1FF`.
    #[inline(always)]
    pub const fn vpn(self, level: usize) -> u64 {
        (self.0 >> (PAGE_SHIFT + VPN_BITS_PER_LEVEL * level as u64)) & VPN_INDEX_MASK
    }
}

impl PhysAddr {
    /// Creates a new physical address from a raw 64-bit value.
    #[inline(always)]
    pub const fn new(addr: u64) -> Self {
        Self(addr)
    }

    /// Returns the raw 64-bit address value.
    #[inline(always)]
    pub const fn val(self) -> u64 {
        self.0
    }

    /// Physical page number (address shifted right by the page shift).
    #[inline(always)]
    pub const fn ppn(self) -> u64 {
        self.0 >> PAGE_SHIFT
    }
}

impl std::fmt::Display for VirtAddr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "va:{:#x}", self.0)
    }
}

impl std::fmt::Display for PhysAddr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "pa:{:#x}", self.0)
    }
}
