//! Instruction field extraction and the decoded instruction record.
//!
//! 1. **Field Extraction:** `InstructionBits` pulls the fixed-position fields out of
//!    a raw 32-bit word.
//! 2. **Decoded Form:** `Instruction` is the immutable record the decoder produces
//!    and the block cache, executor and compiler consume.

use super::opcode::{Format, Opcode};

/// Mask for the major opcode field (bits 6-0).
pub const OPCODE_MASK: u32 = 0x7F;
/// Mask for a 5-bit register field.
pub const REG_MASK: u32 = 0x1F;
/// Mask for the funct3 field.
pub const FUNCT3_MASK: u32 = 0x7;
/// Mask for the funct7 field.
pub const FUNCT7_MASK: u32 = 0x7F;
/// Mask for the 12-bit CSR number.
pub const CSR_MASK: u32 = 0xFFF;

/// Fixed-position field accessors for raw instruction words.
pub trait InstructionBits {
    /// Major opcode (bits 6-0).
    fn opcode(&self) -> u32;

    /// Destination register (bits 11-7).
    fn rd(&self) -> u8;

    /// First source register (bits 19-15). Also the 5-bit CSR immediate.
    fn rs1(&self) -> u8;

    /// Second source register (bits 24-20). Also the 5-bit shift amount.
    fn rs2(&self) -> u8;

    /// funct3 (bits 14-12).
    fn funct3(&self) -> u32;

    /// funct7 (bits 31-25).
    fn funct7(&self) -> u32;

    /// CSR number (bits 31-20).
    fn csr(&self) -> u32;
}

impl InstructionBits for u32 {
    #[inline(always)]
    fn opcode(&self) -> u32 {
        self & OPCODE_MASK
    }

    #[inline(always)]
    fn rd(&self) -> u8 {
        ((self >> 7) & REG_MASK) as u8
    }

    #[inline(always)]
    fn rs1(&self) -> u8 {
        ((self >> 15) & REG_MASK) as u8
    }

    #[inline(always)]
    fn rs2(&self) -> u8 {
        ((self >> 20) & REG_MASK) as u8
    }

    #[inline(always)]
    fn funct3(&self) -> u32 {
        (self >> 12) & FUNCT3_MASK
    }

    #[inline(always)]
    fn funct7(&self) -> u32 {
        (self >> 25) & FUNCT7_MASK
    }

    #[inline(always)]
    fn csr(&self) -> u32 {
        (self >> 20) & CSR_MASK
    }
}

/// A decoded instruction.
///
/// Operand slots an opcode does not use are `None`; `Some(0)` always means the
/// real register `x0`. For CSR instructions `imm` holds the CSR number and the
/// 5-bit immediate of the `*I` forms is read back from `raw` via [`Instruction::zimm`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Instruction {
    /// Raw 32-bit encoding.
    pub raw: u32,
    /// Decoded operation.
    pub opcode: Opcode,
    /// Destination register.
    pub rd: Option<u8>,
    /// First source register.
    pub rs1: Option<u8>,
    /// Second source register.
    pub rs2: Option<u8>,
    /// Sign-extended immediate (shift amount for shifts, CSR number for CSR ops).
    pub imm: i64,
}

impl Instruction {
    /// The record the decoder produces for words it does not recognise.
    pub const fn unknown(raw: u32) -> Self {
        Self {
            raw,
            opcode: Opcode::Unknown,
            rd: None,
            rs1: None,
            rs2: None,
            imm: 0,
        }
    }

    /// Encoding format of the opcode.
    #[inline(always)]
    pub const fn format(&self) -> Format {
        self.opcode.format()
    }

    /// CSR number of a CSR instruction.
    #[inline]
    pub const fn csr(&self) -> u16 {
        (self.imm as u64 & CSR_MASK as u64) as u16
    }

    /// Zero-extended 5-bit immediate of `CSRRWI` / `CSRRSI` / `CSRRCI`.
    #[inline]
    pub const fn zimm(&self) -> u64 {
        ((self.raw >> 15) & REG_MASK) as u64
    }

    /// `jalr x0, 0(x1)`, the canonical return.
    #[inline]
    pub const fn is_return(&self) -> bool {
        matches!(self.opcode, Opcode::Jalr)
            && matches!(self.rd, Some(0))
            && matches!(self.rs1, Some(1))
            && self.imm == 0
    }

    /// A jump that writes a link register (`jal`/`jalr` with `rd != x0`).
    #[inline]
    pub const fn is_call(&self) -> bool {
        matches!(self.opcode, Opcode::Jal | Opcode::Jalr) && !matches!(self.rd, Some(0) | None)
    }
}

impl std::fmt::Display for Instruction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.opcode)?;
        let mut sep = " ";
        for reg in [self.rd, self.rs1, self.rs2].into_iter().flatten() {
            write!(f, "{sep}x{reg}")?;
            sep = ", ";
        }
        write!(f, "{sep}{}", self.imm)
    }
}
