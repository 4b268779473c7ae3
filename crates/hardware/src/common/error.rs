//! Engine error taxonomy and translation results.
//!
//! This module defines how failures surface from the engine. It provides:
//! 1. **Error Taxonomy:** `EngineError`, covering translation faults, undecodable or
//!    uncompilable instructions, bad register indices, unimplemented CSRs,
//!    unusable configuration and unloadable images.
//! 2. **Translation Results:** The `(pa, exception)` pair returned by the translator.
//!
//! None of these errors is recoverable: there is no trap vector. Interpreted code
//! propagates them to the caller of `Hart::step`; native code cannot unwind, so its
//! trampolines report and abort (see `core::hart::trap`).

use thiserror::Error;

use super::addr::PhysAddr;
use super::data::AccessType;

/// Every way the engine can fail.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum EngineError {
    /// Address translation failed: invalid or reserved PTE, unsupported satp
    /// mode, or a walk that found no leaf by level 0.
    #[error("page fault on {access} at va {va:#x}")]
    PageFault {
        /// Faulting virtual address.
        va: u64,
        /// Kind of access that faulted.
        access: AccessType,
    },

    /// The decoder produced no opcode for a word, or the native backend has no
    /// translation for an opcode.
    #[error("unknown instruction {raw:#010x} at pc {pc:#x}")]
    UnknownInstruction {
        /// Address of the instruction.
        pc: u64,
        /// Raw 32-bit encoding.
        raw: u32,
    },

    /// A general-purpose register index outside 0..32.
    #[error("invalid register index {0}")]
    InvalidRegisterIndex(usize),

    /// Any CSR other than `satp` (0x180).
    #[error("unsupported control register {0:#x}")]
    UnsupportedControlRegister(u16),

    /// A physical access outside the guest memory backing store.
    #[error("access fault: {size}-byte access at pa {addr:#x} is outside guest memory")]
    AccessFault {
        /// Physical address of the access.
        addr: u64,
        /// Access width in bytes.
        size: usize,
    },

    /// The host refused to map guest memory.
    #[error("failed to allocate {size} bytes of guest memory")]
    MemoryAllocation {
        /// Requested size in bytes.
        size: usize,
    },

    /// A configuration value the engine cannot be built with.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// A guest image that is not a loadable 64-bit RISC-V ELF, or cannot be read.
    #[error("invalid ELF image: {0}")]
    InvalidImage(String),

    /// The host refused to map or protect an executable code buffer.
    #[error("executable code buffer: {0}")]
    CodeBuffer(String),
}

/// Result of a virtual-to-physical translation.
///
/// Mirrors the translator contract `translate(va, kind, ctx) -> (pa, exception)`:
/// on failure `paddr` is zero and `fault` carries the page fault.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TranslationResult {
    /// Translated physical address (zero on failure).
    pub paddr: PhysAddr,
    /// The fault, if translation failed.
    pub fault: Option<EngineError>,
}

impl TranslationResult {
    /// Builds a successful translation.
    #[inline(always)]
    pub const fn success(paddr: PhysAddr) -> Self {
        Self { paddr, fault: None }
    }

    /// Builds a failed translation.
    #[inline(always)]
    pub const fn fault(err: EngineError) -> Self {
        Self {
            paddr: PhysAddr(0),
            fault: Some(err),
        }
    }

    /// Returns `true` if no fault was raised.
    #[inline(always)]
    pub const fn is_ok(&self) -> bool {
        self.fault.is_none()
    }

    /// Converts into a `Result`, yielding the fault if one was raised.
    ///
    /// # Errors
    ///
    /// Returns the stored fault when translation failed.
    #[inline]
    pub fn into_result(self) -> Result<PhysAddr, EngineError> {
        match self.fault {
            None => Ok(self.paddr),
            Some(err) => Err(err),
        }
    }
}
