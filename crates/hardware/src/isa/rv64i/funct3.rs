//! RV64I minor opcodes (funct3, bits 14-12).
//!
//! The same value means different things under different major opcodes, so the
//! constants are grouped by the opcode they qualify.

/// Load byte (signed).
pub const LB: u32 = 0b000;
/// Load halfword (signed).
pub const LH: u32 = 0b001;
/// Load word (signed).
pub const LW: u32 = 0b010;
/// Load doubleword.
pub const LD: u32 = 0b011;
/// Load byte unsigned.
pub const LBU: u32 = 0b100;
/// Load halfword unsigned.
pub const LHU: u32 = 0b101;
/// Load word unsigned.
pub const LWU: u32 = 0b110;

/// Store byte.
pub const SB: u32 = 0b000;
/// Store halfword.
pub const SH: u32 = 0b001;
/// Store word.
pub const SW: u32 = 0b010;
/// Store doubleword.
pub const SD: u32 = 0b011;

/// Branch if equal.
pub const BEQ: u32 = 0b000;
/// Branch if not equal.
pub const BNE: u32 = 0b001;
/// Branch if less than (signed).
pub const BLT: u32 = 0b100;
/// Branch if greater or equal (signed).
pub const BGE: u32 = 0b101;
/// Branch if less than (unsigned).
pub const BLTU: u32 = 0b110;
/// Branch if greater or equal (unsigned).
pub const BGEU: u32 = 0b111;

/// Add / subtract.
pub const ADD_SUB: u32 = 0b000;
/// Shift left logical.
pub const SLL: u32 = 0b001;
/// Set less than (signed).
pub const SLT: u32 = 0b010;
/// Set less than (unsigned).
pub const SLTU: u32 = 0b011;
/// Exclusive or.
pub const XOR: u32 = 0b100;
/// Shift right logical / arithmetic.
pub const SRL_SRA: u32 = 0b101;
/// Or.
pub const OR: u32 = 0b110;
/// And.
pub const AND: u32 = 0b111;

/// ECALL / EBREAK (distinguished by imm).
pub const PRIV: u32 = 0b000;
/// CSR read-write.
pub const CSRRW: u32 = 0b001;
/// CSR read-set.
pub const CSRRS: u32 = 0b010;
/// CSR read-clear.
pub const CSRRC: u32 = 0b011;
/// CSR read-write immediate.
pub const CSRRWI: u32 = 0b101;
/// CSR read-set immediate.
pub const CSRRSI: u32 = 0b110;
/// CSR read-clear immediate.
pub const CSRRCI: u32 = 0b111;

/// Fence.
pub const FENCE: u32 = 0b000;
