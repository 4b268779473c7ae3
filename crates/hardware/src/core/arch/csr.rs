//! Control and status registers.
//!
//! Only `satp` is implemented. Its fields:
//!
//! ```text
//! 63    60 59        44 43                    0
//! +-------+------------+-----------------------+
//! | MODE  |    ASID    |       root PPN        |
//! +-------+------------+-----------------------+
//! ```
//!
//! MODE 0 is bare (no translation), 8 is Sv39; the root table lives at `PPN * 4096`.

use crate::common::EngineError;
use crate::common::constants::{
    CSR_SATP, CSR_SPACE, PAGE_SIZE, SATP_MODE_BARE, SATP_MODE_MASK, SATP_MODE_SHIFT,
    SATP_PPN_MASK,
};

/// `satp` CSR number.
pub const SATP: u16 = CSR_SATP;

/// Typed view of a `satp` value.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Satp(pub u64);

impl Satp {
    /// Builds a `satp` value from a mode and a root page number.
    pub const fn new(mode: u64, root_ppn: u64) -> Self {
        Self(((mode & SATP_MODE_MASK) << SATP_MODE_SHIFT) | (root_ppn & SATP_PPN_MASK))
    }

    /// MODE field.
    #[inline(always)]
    pub const fn mode(self) -> u64 {
        (self.0 >> SATP_MODE_SHIFT) & SATP_MODE_MASK
    }

    /// Root page-table page number.
    #[inline(always)]
    pub const fn root_ppn(self) -> u64 {
        self.0 & SATP_PPN_MASK
    }

    /// Physical address of the root page table.
    #[inline(always)]
    pub const fn root_table(self) -> u64 {
        self.root_ppn() * PAGE_SIZE
    }

    /// `true` when translation is off.
    #[inline(always)]
    pub const fn is_bare(self) -> bool {
        self.mode() == SATP_MODE_BARE
    }
}

/// Checks that `csr` names an implemented register.
///
/// # Errors
///
/// Returns `UnsupportedControlRegister` for any number other than `satp`,
/// including numbers outside the 12-bit CSR space.
#[inline]
pub const fn check_csr(csr: u16) -> Result<(), EngineError> {
    if (csr as u32) < CSR_SPACE && csr == SATP {
        Ok(())
    } else {
        Err(EngineError::UnsupportedControlRegister(csr))
    }
}
