//! Architectural state with a fixed memory layout.
//!
//! Native code reads and writes the register file, the program counters and the
//! instruction counter directly, at addresses baked in when it is compiled. The
//! state therefore has a `#[repr(C)]` layout with the byte offsets below, and the
//! hart keeps it boxed so its address never changes while compiled code that
//! references it is alive.

use std::mem::offset_of;

use super::gpr::Gpr;
use super::mode::PrivilegeMode;

/// Register file, program counters, counters and translation state.
#[derive(Clone, Debug, Default)]
#[repr(C)]
pub struct ArchState {
    /// `x0`-`x31`.
    pub gpr: Gpr,
    /// Address of the instruction being executed.
    pub pc: u64,
    /// Staged successor; handlers overwrite it on control transfer.
    pub next_pc: u64,
    /// Retired instruction count.
    pub instr_counter: u64,
    /// `satp` CSR.
    pub satp: u64,
    /// Set by ECALL/EBREAK; execution stops at the next instruction boundary.
    pub halted: bool,
    /// Current privilege level.
    pub privilege: PrivilegeMode,
}

/// Byte offset of `x0`; register `n` lives at `GPR_OFFSET + 8 * n`.
pub const GPR_OFFSET: i32 = offset_of!(ArchState, gpr) as i32;
/// Byte offset of `pc`.
pub const PC_OFFSET: i32 = offset_of!(ArchState, pc) as i32;
/// Byte offset of `next_pc`.
pub const NEXT_PC_OFFSET: i32 = offset_of!(ArchState, next_pc) as i32;
/// Byte offset of `instr_counter`.
pub const COUNTER_OFFSET: i32 = offset_of!(ArchState, instr_counter) as i32;
/// Byte offset of `satp`.
pub const SATP_OFFSET: i32 = offset_of!(ArchState, satp) as i32;

/// Byte offset of register `reg` from the state base.
#[inline(always)]
pub const fn reg_offset(reg: u8) -> i32 {
    GPR_OFFSET + 8 * reg as i32
}

const _: () = assert!(GPR_OFFSET == 0);
const _: () = assert!(PC_OFFSET == 256);
const _: () = assert!(NEXT_PC_OFFSET == 264);
const _: () = assert!(COUNTER_OFFSET == 272);
const _: () = assert!(SATP_OFFSET == 280);
