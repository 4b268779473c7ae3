//! Instruction set: encoding, decoding and interpretation.
//!
//! The engine supports RV64I plus the Zicsr CSR instructions, which is what
//! the block cache, the native compiler and the interpreter all agree on.
//!
//! * `rv64i`: Major opcodes and function-code constants.
//! * `instruction`: Field extraction and the decoded `Instruction` record.
//! * `opcode`: The dense `Opcode` enumeration and instruction formats.
//! * `decode`: Raw word to `Instruction` (total).
//! * `execute`: `Instruction` to architectural effect, returning a reusable handler.

/// ABI register indices.
pub mod abi;

/// Raw word decoder.
pub mod decode;

/// Per-opcode interpreter.
pub mod execute;

/// Instruction fields and the decoded record.
pub mod instruction;

/// Opcode enumeration and formats.
pub mod opcode;

/// Base integer instruction set constants.
pub mod rv64i;

pub use decode::decode;
pub use execute::{ExecFn, execute};
pub use instruction::Instruction;
pub use opcode::{Format, Opcode};
