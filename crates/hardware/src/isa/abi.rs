//! RISC-V ABI register indices used by the engine.
//!
//! The engine only needs the link register (for return detection) and the
//! stack pointer (set by the driver from `general.stack_top`).

/// x0, hard-wired zero.
pub const REG_ZERO: usize = 0;
/// x1, return address (`ra`).
pub const REG_RA: usize = 1;
/// x2, stack pointer (`sp`).
pub const REG_SP: usize = 2;
/// x10, first argument / return value (`a0`).
pub const REG_A0: usize = 10;
/// x17, system call number (`a7`).
pub const REG_A7: usize = 17;

/// ABI names indexed by register number, for register dumps.
pub const ABI_NAMES: [&str; 32] = [
    "zero", "ra", "sp", "gp", "tp", "t0", "t1", "t2", "s0", "s1", "a0", "a1", "a2", "a3", "a4",
    "a5", "a6", "a7", "s2", "s3", "s4", "s5", "s6", "s7", "s8", "s9", "s10", "s11", "t3", "t4",
    "t5", "t6",
];
