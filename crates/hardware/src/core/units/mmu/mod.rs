//! Memory Management Unit (MMU).
//!
//! This module implements virtual-to-physical address translation. It provides:
//! 1. **Bare Mode:** `satp.MODE == 0` returns the address unchanged without touching a TLB.
//! 2. **Sv39:** A three-level page-table walk (`ptw`).
//! 3. **TLBs:** Three direct-mapped TLBs (`tlb`), one each for fetches, loads and stores.
//!
//! Any MODE other than bare or Sv39 is a page fault. Writes to `satp` do not flush
//! the TLBs; callers that remap must call [`Mmu::flush`].

/// Sv39 page-table walker.
pub mod ptw;

/// Translation lookaside buffer.
pub mod tlb;

use crate::common::constants::{SATP_MODE_BARE, SATP_MODE_SV39};
use crate::common::{AccessType, EngineError, PhysAddr, TranslationResult, VirtAddr};
use crate::core::arch::PrivilegeMode;
use crate::core::arch::csr::Satp;
use crate::soc::GuestMemory;

use self::tlb::Tlb;

/// Translation inputs taken from the hart.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TranslationContext {
    /// Physical address of the root page table.
    pub root_table: u64,
    /// `satp.MODE`.
    pub mode: u64,
    /// Current privilege level.
    pub privilege: PrivilegeMode,
}

impl TranslationContext {
    /// Derives the context from a `satp` value.
    pub const fn from_satp(satp: u64, privilege: PrivilegeMode) -> Self {
        let satp = Satp(satp);
        Self {
            root_table: satp.root_table(),
            mode: satp.mode(),
            privilege,
        }
    }
}

/// Address translator with per-access-kind TLBs.
#[derive(Debug)]
pub struct Mmu {
    /// Instruction fetch TLB.
    pub itlb: Tlb,
    /// Load TLB.
    pub load_tlb: Tlb,
    /// Store TLB.
    pub store_tlb: Tlb,
}

impl Mmu {
    /// Creates an MMU whose TLBs have `tlb_size` entries each.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` unless `tlb_size` is a non-zero power of two.
    pub fn new(tlb_size: usize) -> Result<Self, EngineError> {
        Ok(Self {
            itlb: Tlb::new(tlb_size)?,
            load_tlb: Tlb::new(tlb_size)?,
            store_tlb: Tlb::new(tlb_size)?,
        })
    }

    /// TLB consulted for an access kind.
    pub const fn tlb(&self, access: AccessType) -> &Tlb {
        match access {
            AccessType::Fetch => &self.itlb,
            AccessType::Load => &self.load_tlb,
            AccessType::Store => &self.store_tlb,
        }
    }

    const fn tlb_mut(&mut self, access: AccessType) -> &mut Tlb {
        match access {
            AccessType::Fetch => &mut self.itlb,
            AccessType::Load => &mut self.load_tlb,
            AccessType::Store => &mut self.store_tlb,
        }
    }

    /// Translates `va` for an access of kind `access`.
    ///
    /// # Arguments
    ///
    /// * `memory` - Guest memory holding the page tables.
    /// * `va` - Virtual address.
    /// * `access` - Fetch, load or store; selects the TLB.
    /// * `ctx` - Root table, mode and privilege.
    ///
    /// # Returns
    ///
    /// The physical address, or a `PageFault` for an unsupported mode or a failed walk.
    /// A successful walk fills the selected TLB.
    pub fn translate(
        &mut self,
        memory: &GuestMemory,
        va: VirtAddr,
        access: AccessType,
        ctx: &TranslationContext,
    ) -> TranslationResult {
        if ctx.mode == SATP_MODE_BARE {
            return TranslationResult::success(PhysAddr::new(va.val()));
        }
        if ctx.mode != SATP_MODE_SV39 {
            return TranslationResult::fault(EngineError::PageFault {
                va: va.val(),
                access,
            });
        }

        if let Some(pa) = self.tlb(access).lookup(va.val()) {
            return TranslationResult::success(PhysAddr::new(pa));
        }

        match ptw::page_table_walk(memory, va, access, ctx) {
            Ok(walk) => {
                self.tlb_mut(access)
                    .insert(va.val(), walk.paddr, walk.page_size);
                TranslationResult::success(PhysAddr::new(walk.paddr))
            }
            Err(err) => TranslationResult::fault(err),
        }
    }

    /// Invalidates all three TLBs.
    pub fn flush(&mut self) {
        self.itlb.flush();
        self.load_tlb.flush();
        self.store_tlb.flush();
    }
}
