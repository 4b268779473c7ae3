//! RISC-V base integer instruction set (RV64I) plus Zicsr field values.
//!
//! - `opcodes`: Major opcodes.
//! - `funct3`: Minor opcodes within a major opcode.
//! - `funct7`: Alternate-encoding selectors for R-type and shift-immediate forms.

/// Function code 3 definitions.
pub mod funct3;

/// Function code 7 definitions.
pub mod funct7;

/// Major opcodes.
pub mod opcodes;
