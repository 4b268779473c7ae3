//! RISC-V 64-bit hart emulator.
//!
//! This crate runs a single RV64I + Zicsr hart with the following:
//! 1. **Core:** Architectural state, the step machine, threaded replay of cached
//!    blocks, and promotion of hot blocks and whole functions to native code.
//! 2. **Memory:** Flat guest memory and Sv39 translation with per-access-kind TLBs.
//! 3. **JIT:** x86-64 and AArch64 code generation behind one emission interface.
//! 4. **ISA:** Decoding and interpretation.
//! 5. **Instrumentation:** Per-opcode, block, memory and translation callbacks.
//! 6. **Driver:** Configuration, ELF loading, an opcode profile and a `Machine`
//!    that runs with a step budget.

/// Common types and constants (addresses, access kinds, errors).
pub mod common;
/// Engine configuration (defaults, JSON parsing, validation).
pub mod config;
/// Hart, caches, MMU, native compiler and hooks.
pub mod core;
/// Instruction set (decode, opcode table, interpreter).
pub mod isa;
/// Run driver.
pub mod sim;
/// Guest memory.
pub mod soc;

/// Root configuration type; use `Config::default()` or `Config::from_json`.
pub use crate::config::Config;
/// The engine's error type.
pub use crate::common::EngineError;
/// The hart; owns state, caches and compiler.
pub use crate::core::Hart;
/// Top-level driver.
pub use crate::sim::Machine;
