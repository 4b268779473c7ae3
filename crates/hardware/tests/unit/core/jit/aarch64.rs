//! AArch64 Encoding Tests.

use pretty_assertions::assert_eq;
use rstest::rstest;
use rvjit_core::EngineError;
use rvjit_core::core::jit::aarch64::A64Assembler;
use rvjit_core::core::jit::emit::{AluOp, Arg, Assembler, Cond, Tmp};

/// Emits with `f` and returns the instruction words.
fn words(f: impl FnOnce(&mut A64Assembler)) -> Vec<u32> {
    let mut asm = A64Assembler::new();
    f(&mut asm);
    let code = asm.finish().expect("labels bound");
    assert_eq!(code.len() % 4, 0);
    code.chunks_exact(4)
        .map(|w| u32::from_le_bytes([w[0], w[1], w[2], w[3]]))
        .collect()
}

#[test]
fn frame_setup_and_teardown() {
    assert_eq!(
        words(|a| a.prologue(0, 0)),
        [
            0xA9BF_7BFD, // stp x29, x30, [sp, #-16]!
            0x9100_03FD, // mov x29, sp
            0xA9BF_53F3, // stp x19, x20, [sp, #-16]!
            0xA9BF_5BF5, // stp x21, x22, [sp, #-16]!
            0xD280_0013, // movz x19, #0
            0xAA00_03F4, // mov x20, x0
            0xD280_0015, // movz x21, #0
        ]
    );
    assert_eq!(
        words(|a| a.epilogue()),
        [0xA8C1_5BF5, 0xA8C1_53F3, 0xA8C1_7BFD, 0xD65F_03C0]
    );
}

#[test]
fn state_accesses_scale_the_offset() {
    assert_eq!(words(|a| a.load_state(Tmp::T0, 256)), [0xF940_8269]);
    assert_eq!(
        words(|a| a.add_state_imm(272, 1)),
        [0xF940_8A70, 0x9100_0610, 0xF900_8A70]
    );
}

#[rstest]
#[case::zero(Tmp::T0, 0, vec![0xD280_0009])]
#[case::skips_zero_halfwords(Tmp::T0, 0x1_0000_0005, vec![0xD280_00A9, 0xF2C0_0029])]
#[case::top_halfword(Tmp::T1, 0xFFFF_0000_0000_1234, vec![0xD282_468A, 0xF2FF_FFEA])]
fn load_imm_uses_movz_movk(#[case] dst: Tmp, #[case] imm: u64, #[case] expected: Vec<u32>) {
    assert_eq!(words(|a| a.load_imm(dst, imm)), expected);
}

#[rstest]
#[case::add(AluOp::Add, vec![0x8B0A_0129])]
#[case::sub(AluOp::Sub, vec![0xCB0A_0129])]
#[case::slt(AluOp::Slt, vec![0xEB0A_013F, 0x9A9F_A7E9])]
#[case::addw_sign_extends(AluOp::AddW, vec![0x0B0A_0129, 0x9340_7D29])]
fn alu_encodings(#[case] op: AluOp, #[case] expected: Vec<u32>) {
    assert_eq!(words(|a| a.alu(op, Tmp::T0, Tmp::T1)), expected);
}

#[test]
fn shift_right_immediate_is_ubfm() {
    assert_eq!(words(|a| a.shr_imm(Tmp::T0, 3)), [0xD343_FD29]);
}

#[test]
fn guest_memory_is_indexed_off_x21() {
    assert_eq!(words(|a| a.load_mem(Tmp::T0, Tmp::T2, 8, false)), [0xF86B_6AA9]);
    assert_eq!(words(|a| a.store_mem(Tmp::T2, Tmp::T0, 4)), [0xB82B_6AA9]);
}

#[test]
fn call_goes_through_x16_and_returns_in_t0() {
    assert_eq!(
        words(|a| a.call(0x40, &[Arg::Hart])),
        [0xAA14_03E0, 0xD280_0810, 0xD63F_0200, 0xAA00_03E9]
    );
}

#[test]
fn branches_are_patched() {
    let code = words(|a| {
        let top = a.new_label();
        let out = a.new_label();
        a.bind(top);
        a.jump(out);
        a.jump(top);
        a.branch_if(Cond::Ne, Tmp::T0, Tmp::T1, out);
        a.jump_if_zero(Tmp::T0, out);
        a.bind(out);
    });
    assert_eq!(
        code,
        [
            0x1400_0005, // b +5
            0x17FF_FFFF, // b -1
            0xEB0A_013F, // cmp x9, x10
            0x5400_0041, // b.ne +2
            0xB400_0029, // cbz x9, +1
        ]
    );
}

#[test]
fn unbound_label_is_an_error() {
    let mut asm = A64Assembler::new();
    let nowhere = asm.new_label();
    asm.jump_if_nonzero(Tmp::T1, nowhere);
    assert!(matches!(asm.finish(), Err(EngineError::CodeBuffer(_))));
}
