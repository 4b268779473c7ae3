//! Engine-wide constants.
//!
//! 1. **Paging:** Sv39 page geometry and satp field layout.
//! 2. **Instructions:** Instruction width and register-file shape.
//! 3. **Control registers:** The one implemented CSR number.

/// Page size in bytes (4 KiB).
pub const PAGE_SIZE: u64 = 4096;

/// Number of bits to shift to convert between bytes and pages.
pub const PAGE_SHIFT: u64 = 12;

/// Megapage size (level-1 leaf, 2 MiB).
pub const MEGAPAGE_SIZE: u64 = 1 << 21;

/// Gigapage size (level-2 leaf, 1 GiB).
pub const GIGAPAGE_SIZE: u64 = 1 << 30;

/// Number of VPN bits consumed per Sv39 level.
pub const VPN_BITS_PER_LEVEL: u64 = 9;

/// Mask for one 9-bit VPN / PPN slice.
pub const VPN_INDEX_MASK: u64 = 0x1FF;

/// Number of levels in an Sv39 page table.
pub const SV39_LEVELS: usize = 3;

/// Size of a page-table entry in bytes.
pub const PTE_SIZE: u64 = 8;

/// Bit position of the satp MODE field.
pub const SATP_MODE_SHIFT: u64 = 60;

/// Mask for the satp MODE field after shifting.
pub const SATP_MODE_MASK: u64 = 0xF;

/// Mask for the satp root PPN field (bits 43:0).
pub const SATP_PPN_MASK: u64 = (1 << 44) - 1;

/// satp MODE value for bare (untranslated) addressing.
pub const SATP_MODE_BARE: u64 = 0;

/// satp MODE value for Sv39.
pub const SATP_MODE_SV39: u64 = 8;

/// Width of a standard (uncompressed) RISC-V instruction in bytes.
pub const INSTRUCTION_SIZE: u64 = 4;

/// Number of general-purpose registers.
pub const GPR_COUNT: usize = 32;

/// CSR number of `satp`, the only control register the engine implements.
pub const CSR_SATP: u16 = 0x180;

/// Size of the CSR address space (12-bit numbers).
pub const CSR_SPACE: u32 = 1 << 12;
