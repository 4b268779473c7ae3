//! Sv39 page-table walker.
//!
//! Walks the three-level radix table rooted at `satp.PPN * 4096`:
//!
//! ```text
//!  38        30 29        21 20        12 11           0
//! +------------+------------+------------+--------------+
//! |   VPN[2]   |   VPN[1]   |   VPN[0]   |  page offset |
//! +------------+------------+------------+--------------+
//! ```
//!
//! A PTE is a leaf when R or X is set. A leaf above level 0 maps a superpage; the
//! PPN slices below the leaf level come from the virtual address.

use crate::common::constants::{
    GIGAPAGE_SIZE, MEGAPAGE_SIZE, PAGE_SHIFT, PAGE_SIZE, PTE_SIZE, SATP_PPN_MASK, SV39_LEVELS,
    VPN_BITS_PER_LEVEL, VPN_INDEX_MASK,
};
use crate::common::{AccessType, EngineError, VirtAddr};
use crate::soc::GuestMemory;

use super::TranslationContext;

const PTE_VALID_BIT: u64 = 1;
const PTE_READ_BIT: u64 = 1 << 1;
const PTE_WRITE_BIT: u64 = 1 << 2;
const PTE_EXEC_BIT: u64 = 1 << 3;
const PTE_PPN_SHIFT: u64 = 10;

/// A raw Sv39 page-table entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PageTableEntry(pub u64);

impl PageTableEntry {
    /// V bit.
    pub const fn is_valid(self) -> bool {
        self.0 & PTE_VALID_BIT != 0
    }

    /// R bit.
    pub const fn can_read(self) -> bool {
        self.0 & PTE_READ_BIT != 0
    }

    /// W bit.
    pub const fn can_write(self) -> bool {
        self.0 & PTE_WRITE_BIT != 0
    }

    /// X bit.
    pub const fn can_exec(self) -> bool {
        self.0 & PTE_EXEC_BIT != 0
    }

    /// W without R is a reserved encoding.
    pub const fn is_reserved(self) -> bool {
        self.can_write() && !self.can_read()
    }

    /// Leaf entries carry R or X.
    pub const fn is_leaf(self) -> bool {
        self.can_read() || self.can_exec()
    }

    /// Physical page number (bits 53-10).
    pub const fn ppn(self) -> u64 {
        (self.0 >> PTE_PPN_SHIFT) & SATP_PPN_MASK
    }
}

/// A successful walk.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WalkResult {
    /// Translated physical address.
    pub paddr: u64,
    /// Size of the mapping page (4 KiB, 2 MiB or 1 GiB).
    pub page_size: u64,
}

/// Page size mapped by a leaf found at `level`.
const fn page_size_at(level: usize) -> u64 {
    match level {
        0 => PAGE_SIZE,
        1 => MEGAPAGE_SIZE,
        _ => GIGAPAGE_SIZE,
    }
}

/// Walks the page table for `va`.
///
/// # Arguments
///
/// * `memory` - Guest memory holding the tables.
/// * `va` - Address to translate.
/// * `access` - Access kind, reported in the fault.
/// * `ctx` - Root table address and mode.
///
/// # Errors
///
/// Returns `PageFault` if an entry on the path is invalid or reserved, if no leaf
/// is found by level 0, or if an entry address falls outside guest memory.
pub fn page_table_walk(
    memory: &GuestMemory,
    va: VirtAddr,
    access: AccessType,
    ctx: &TranslationContext,
) -> Result<WalkResult, EngineError> {
    let fault = || EngineError::PageFault {
        va: va.val(),
        access,
    };

    let mut base = ctx.root_table;
    for level in (0..SV39_LEVELS).rev() {
        let pte_addr = base + va.vpn(level) * PTE_SIZE;
        let pte = PageTableEntry(memory.load(pte_addr, PTE_SIZE as usize).map_err(|_| fault())?);

        if !pte.is_valid() || pte.is_reserved() {
            return Err(fault());
        }

        if pte.is_leaf() {
            let mut ppn = pte.ppn();
            for lower in 0..level {
                let shift = VPN_BITS_PER_LEVEL * lower as u64;
                ppn = (ppn & !(VPN_INDEX_MASK << shift)) | (va.vpn(lower) << shift);
            }
            return Ok(WalkResult {
                paddr: (ppn << PAGE_SHIFT) | va.page_offset(),
                page_size: page_size_at(level),
            });
        }

        base = pte.ppn() * PAGE_SIZE;
    }

    Err(fault())
}
