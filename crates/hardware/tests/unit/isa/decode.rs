//! Instruction Decode Tests.
//!
//! Verifies that `decode()` selects the right opcode, fills only the operand
//! slots the format uses, and sign-extends immediates:
//!
//! - R-type:  OP_REG, OP_REG_32
//! - I-type:  OP_IMM, OP_IMM_32, OP_LOAD, OP_JALR, OP_SYSTEM
//! - S-type:  OP_STORE
//! - B-type:  OP_BRANCH
//! - U-type:  OP_LUI, OP_AUIPC
//! - J-type:  OP_JAL

use crate::common::builder::instruction::asm;
use pretty_assertions::assert_eq;
use rstest::rstest;
use rvjit_core::isa::{Format, Instruction, Opcode, decode};

// ══════════════════════════════════════════════════════════
// 1. Opcode selection
// ══════════════════════════════════════════════════════════

#[rstest]
#[case(asm().add(1, 2, 3).build(), Opcode::Add)]
#[case(asm().sub(1, 2, 3).build(), Opcode::Sub)]
#[case(asm().sra(1, 2, 3).build(), Opcode::Sra)]
#[case(asm().sltu(1, 2, 3).build(), Opcode::Sltu)]
#[case(asm().addw(1, 2, 3).build(), Opcode::Addw)]
#[case(asm().subw(1, 2, 3).build(), Opcode::Subw)]
#[case(asm().sraw(1, 2, 3).build(), Opcode::Sraw)]
#[case(asm().addi(1, 2, -1).build(), Opcode::Addi)]
#[case(asm().sltiu(1, 2, 5).build(), Opcode::Sltiu)]
#[case(asm().slli(1, 2, 63).build(), Opcode::Slli)]
#[case(asm().srli(1, 2, 32).build(), Opcode::Srli)]
#[case(asm().srai(1, 2, 7).build(), Opcode::Srai)]
#[case(asm().addiw(1, 2, 7).build(), Opcode::Addiw)]
#[case(asm().slliw(1, 2, 31).build(), Opcode::Slliw)]
#[case(asm().lb(1, 2, 0).build(), Opcode::Lb)]
#[case(asm().lwu(1, 2, 0).build(), Opcode::Lwu)]
#[case(asm().ld(1, 2, 0).build(), Opcode::Ld)]
#[case(asm().sb(2, 3, 0).build(), Opcode::Sb)]
#[case(asm().sd(2, 3, 0).build(), Opcode::Sd)]
#[case(asm().beq(1, 2, 8).build(), Opcode::Beq)]
#[case(asm().bgeu(1, 2, 8).build(), Opcode::Bgeu)]
#[case(asm().lui(1, 0x12345).build(), Opcode::Lui)]
#[case(asm().auipc(1, 1).build(), Opcode::Auipc)]
#[case(asm().jal(1, 16).build(), Opcode::Jal)]
#[case(asm().jalr(0, 1, 0).build(), Opcode::Jalr)]
#[case(asm().fence().build(), Opcode::Fence)]
#[case(asm().ecall().build(), Opcode::Ecall)]
#[case(asm().ebreak().build(), Opcode::Ebreak)]
#[case(asm().csrrw(1, 0x180, 2).build(), Opcode::Csrrw)]
#[case(asm().csrrs(1, 0x180, 0).build(), Opcode::Csrrs)]
#[case(asm().csrrwi(1, 0x180, 5).build(), Opcode::Csrrwi)]
fn selects_opcode(#[case] raw: u32, #[case] expected: Opcode) {
    let instr = decode(raw);
    assert_eq!(instr.opcode, expected);
    assert_eq!(instr.raw, raw);
}

#[rstest]
#[case(0x0000_0000)]
#[case(0xFFFF_FFFF)]
#[case(0x0000_0007)] // LOAD-FP, not supported
#[case(0x0200_00B3)] // MUL
#[case(asm().opcode(0b110_0011).funct3(0b010).build())] // branch funct3 hole
#[case(asm().opcode(0b000_0011).funct3(0b111).build())] // load funct3 hole
fn unsupported_words_decode_to_unknown(#[case] raw: u32) {
    assert_eq!(decode(raw), Instruction::unknown(raw));
    assert_eq!(decode(raw).opcode, Opcode::Unknown);
}

// ══════════════════════════════════════════════════════════
// 2. Operand slots
// ══════════════════════════════════════════════════════════

#[test]
fn r_type_uses_all_three_registers() {
    let i = decode(asm().add(5, 6, 7).build());
    assert_eq!((i.rd, i.rs1, i.rs2), (Some(5), Some(6), Some(7)));
    assert_eq!(i.format(), Format::R);
}

#[test]
fn i_type_has_no_rs2() {
    let i = decode(asm().addi(5, 6, 100).build());
    assert_eq!((i.rd, i.rs1, i.rs2), (Some(5), Some(6), None));
    assert_eq!(i.imm, 100);
}

#[test]
fn stores_and_branches_have_no_rd() {
    let s = decode(asm().sw(2, 3, 12).build());
    assert_eq!((s.rd, s.rs1, s.rs2), (None, Some(2), Some(3)));
    let b = decode(asm().bne(4, 5, -8).build());
    assert_eq!((b.rd, b.rs1, b.rs2), (None, Some(4), Some(5)));
    assert_eq!(b.format(), Format::B);
}

#[test]
fn upper_immediates_have_only_rd() {
    let i = decode(asm().lui(3, 1).build());
    assert_eq!((i.rd, i.rs1, i.rs2), (Some(3), None, None));
}

#[test]
fn csr_forms() {
    let reg = decode(asm().csrrw(1, 0x180, 2).build());
    assert_eq!((reg.rd, reg.rs1), (Some(1), Some(2)));
    assert_eq!(reg.csr(), 0x180);

    let imm = decode(asm().csrrsi(3, 0x180, 0x1F).build());
    assert_eq!((imm.rd, imm.rs1), (Some(3), None));
    assert_eq!(imm.zimm(), 0x1F);
    assert_eq!(imm.csr(), 0x180);
}

// ══════════════════════════════════════════════════════════
// 3. Immediates
// ══════════════════════════════════════════════════════════

#[rstest]
#[case(-2048)]
#[case(-1)]
#[case(0)]
#[case(2047)]
fn i_immediate_sign_extends(#[case] imm: i32) {
    assert_eq!(decode(asm().addi(1, 1, imm).build()).imm, i64::from(imm));
    assert_eq!(decode(asm().ld(1, 1, imm).build()).imm, i64::from(imm));
    assert_eq!(decode(asm().sd(1, 1, imm).build()).imm, i64::from(imm));
}

#[rstest]
#[case(-4096)]
#[case(-8)]
#[case(8)]
#[case(4094)]
fn branch_immediate(#[case] imm: i32) {
    assert_eq!(decode(asm().beq(1, 2, imm).build()).imm, i64::from(imm));
}

#[rstest]
#[case(-(1 << 20))]
#[case(-4)]
#[case(2048)]
#[case((1 << 20) - 2)]
fn jal_immediate(#[case] imm: i32) {
    assert_eq!(decode(asm().jal(1, imm).build()).imm, i64::from(imm));
}

#[test]
fn lui_immediate_is_shifted_and_sign_extended() {
    assert_eq!(decode(asm().lui(1, 0x12345).build()).imm, 0x1234_5000);
    assert_eq!(decode(asm().lui(1, 0xFFFFF).build()).imm, -4096);
}

#[test]
fn shift_immediates_carry_only_shamt() {
    assert_eq!(decode(asm().srai(1, 2, 63).build()).imm, 63);
    assert_eq!(decode(asm().srli(1, 2, 1).build()).imm, 1);
}

// ══════════════════════════════════════════════════════════
// 4. Control-flow classification
// ══════════════════════════════════════════════════════════

#[test]
fn call_and_return_shapes() {
    let ret = decode(asm().ret().build());
    assert!(ret.is_return());
    assert!(!ret.is_call());

    let call = decode(asm().jal(1, 64).build());
    assert!(call.is_call());
    assert!(!call.is_return());

    let indirect_call = decode(asm().jalr(1, 5, 0).build());
    assert!(indirect_call.is_call());

    let jump = decode(asm().jal(0, 64).build());
    assert!(!jump.is_call());

    let tail = decode(asm().jalr(0, 5, 0).build());
    assert!(!tail.is_call());
    assert!(!tail.is_return());
}

#[test]
fn branch_or_jump_classification() {
    assert!(Opcode::Beq.is_branch_or_jump());
    assert!(Opcode::Jal.is_branch_or_jump());
    assert!(Opcode::Jalr.is_branch_or_jump());
    assert!(!Opcode::Add.is_branch_or_jump());
    assert!(!Opcode::Ecall.is_branch_or_jump());
}

#[test]
fn access_widths() {
    assert_eq!(Opcode::Lb.load_width(), Some((1, true)));
    assert_eq!(Opcode::Lhu.load_width(), Some((2, false)));
    assert_eq!(Opcode::Lw.load_width(), Some((4, true)));
    assert_eq!(Opcode::Ld.load_width(), Some((8, false)));
    assert_eq!(Opcode::Sh.store_width(), Some(2));
    assert_eq!(Opcode::Add.load_width(), None);
    assert_eq!(Opcode::Add.store_width(), None);
}

#[test]
fn opcode_indices_are_dense() {
    for (i, op) in Opcode::ALL.iter().enumerate() {
        assert_eq!(op.index(), i);
    }
    assert_eq!(Opcode::COUNT, Opcode::ALL.len());
}
