//! Architectural State Layout Tests.
//!
//! Native code addresses the state at fixed byte offsets; these pin the layout.

use std::mem::offset_of;

use rvjit_core::core::arch::ArchState;
use rvjit_core::core::arch::state::{
    COUNTER_OFFSET, GPR_OFFSET, NEXT_PC_OFFSET, PC_OFFSET, SATP_OFFSET, reg_offset,
};

#[test]
fn offsets() {
    assert_eq!(GPR_OFFSET, 0);
    assert_eq!(PC_OFFSET, 256);
    assert_eq!(NEXT_PC_OFFSET, 264);
    assert_eq!(COUNTER_OFFSET, 272);
    assert_eq!(SATP_OFFSET, 280);
    assert_eq!(offset_of!(ArchState, satp), 280);
}

#[test]
fn register_offsets() {
    assert_eq!(reg_offset(0), 0);
    assert_eq!(reg_offset(1), 8);
    assert_eq!(reg_offset(31), 248);
}

#[test]
fn reset_state() {
    let state = ArchState::default();
    assert_eq!(state.pc, 0);
    assert_eq!(state.instr_counter, 0);
    assert!(!state.halted);
    assert_eq!(state.gpr.snapshot(), [0; 32]);
}
