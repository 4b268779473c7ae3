//! RV64I funct7 values (bits 31-25).

/// Default encoding (ADD, SRL, SLL, ...).
pub const DEFAULT: u32 = 0b000_0000;

/// Alternate encoding selecting SUB over ADD and SRA over SRL.
pub const ALT: u32 = 0b010_0000;

/// Upper six bits of a 64-bit shift-immediate (funct6) selecting SRAI.
pub const SRAI_FUNCT6: u32 = 0b01_0000;
