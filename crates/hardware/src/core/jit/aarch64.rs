//! AArch64 backend (AAPCS64).
//!
//! Register assignment:
//!
//! | role            | register |
//! |-----------------|----------|
//! | state base      | `x19`    |
//! | `*mut Hart`     | `x20`    |
//! | guest memory    | `x21`    |
//! | `T0` / result   | `x9`     |
//! | `T1`            | `x10`    |
//! | `T2`            | `x11`    |
//! | call target     | `x16`    |
//!
//! `x19`-`x22` are saved in the prologue together with the frame record, so
//! they survive trampoline calls.

use super::emit::{AluOp, Arg, Assembler, Cond, Label, Labels, Tmp};
use crate::common::EngineError;

const X0: u32 = 0;
const X16: u32 = 16;
const STATE: u32 = 19;
const HART: u32 = 20;
const MEM: u32 = 21;

const fn reg(t: Tmp) -> u32 {
    match t {
        Tmp::T0 => 9,
        Tmp::T1 => 10,
        Tmp::T2 => 11,
    }
}

/// Condition field values.
mod cc {
    pub const EQ: u32 = 0x0;
    pub const NE: u32 = 0x1;
    pub const HS: u32 = 0x2;
    pub const LO: u32 = 0x3;
    pub const GE: u32 = 0xA;
    pub const LT: u32 = 0xB;
}

#[derive(Clone, Copy, Debug)]
enum Fixup {
    /// `b`: imm26 at bits 25..0.
    Branch,
    /// `b.cond`, `cbz`, `cbnz`: imm19 at bits 23..5.
    Imm19,
}

/// Emits AArch64 machine code into a growable buffer.
#[derive(Debug, Default)]
pub struct A64Assembler {
    code: Vec<u8>,
    labels: Labels,
    fixups: Vec<(usize, Label, Fixup)>,
}

impl A64Assembler {
    /// Creates an empty assembler.
    pub fn new() -> Self {
        Self::default()
    }

    fn emit(&mut self, word: u32) {
        self.code.extend_from_slice(&word.to_le_bytes());
    }

    fn mov(&mut self, rd: u32, rm: u32) {
        if rd != rm {
            self.emit(0xAA00_03E0 | (rm << 16) | rd);
        }
    }

    /// `movz` followed by a `movk` for every other non-zero halfword.
    fn mov_imm(&mut self, rd: u32, imm: u64) {
        self.emit(0xD280_0000 | (((imm & 0xFFFF) as u32) << 5) | rd);
        for hw in 1..4u32 {
            let chunk = ((imm >> (16 * hw)) & 0xFFFF) as u32;
            if chunk != 0 {
                self.emit(0xF280_0000 | (hw << 21) | (chunk << 5) | rd);
            }
        }
    }

    fn ldr(&mut self, rt: u32, rn: u32, offset: i32) {
        self.emit(0xF940_0000 | (((offset as u32) / 8) << 10) | (rn << 5) | rt);
    }

    fn str(&mut self, rt: u32, rn: u32, offset: i32) {
        self.emit(0xF900_0000 | (((offset as u32) / 8) << 10) | (rn << 5) | rt);
    }

    fn rrr(&mut self, base: u32, rd: u32, rn: u32, rm: u32) {
        self.emit(base | (rm << 16) | (rn << 5) | rd);
    }

    fn sxtw(&mut self, rd: u32) {
        self.emit(0x9340_7C00 | (rd << 5) | rd);
    }

    fn cmp(&mut self, rn: u32, rm: u32) {
        self.emit(0xEB00_001F | (rm << 16) | (rn << 5));
    }

    /// `cset rd, cond` (`csinc rd, xzr, xzr, !cond`).
    fn cset(&mut self, rd: u32, cond: u32) {
        self.emit(0x9A9F_07E0 | ((cond ^ 1) << 12) | rd);
    }

    fn fixup(&mut self, word: u32, label: Label, kind: Fixup) {
        self.fixups.push((self.code.len(), label, kind));
        self.emit(word);
    }
}

impl Assembler for A64Assembler {
    fn prologue(&mut self, state: u64, mem_base: u64) {
        self.emit(0xA9BF_7BFD); // stp x29, x30, [sp, #-16]!
        self.emit(0x9100_03FD); // mov x29, sp
        self.emit(0xA9BF_53F3); // stp x19, x20, [sp, #-16]!
        self.emit(0xA9BF_5BF5); // stp x21, x22, [sp, #-16]!
        self.mov_imm(STATE, state);
        self.mov(HART, X0);
        self.mov_imm(MEM, mem_base);
    }

    fn epilogue(&mut self) {
        self.emit(0xA8C1_5BF5); // ldp x21, x22, [sp], #16
        self.emit(0xA8C1_53F3); // ldp x19, x20, [sp], #16
        self.emit(0xA8C1_7BFD); // ldp x29, x30, [sp], #16
        self.emit(0xD65F_03C0); // ret
    }

    fn load_state(&mut self, dst: Tmp, offset: i32) {
        self.ldr(reg(dst), STATE, offset);
    }

    fn store_state(&mut self, offset: i32, src: Tmp) {
        self.str(reg(src), STATE, offset);
    }

    fn add_state_imm(&mut self, offset: i32, imm: u8) {
        self.ldr(X16, STATE, offset);
        self.emit(0x9100_0000 | (u32::from(imm) << 10) | (X16 << 5) | X16);
        self.str(X16, STATE, offset);
    }

    fn load_imm(&mut self, dst: Tmp, imm: u64) {
        self.mov_imm(reg(dst), imm);
    }

    fn alu(&mut self, op: AluOp, a: Tmp, b: Tmp) {
        let (a, b) = (reg(a), reg(b));
        match op {
            AluOp::Add => self.rrr(0x8B00_0000, a, a, b),
            AluOp::Sub => self.rrr(0xCB00_0000, a, a, b),
            AluOp::And => self.rrr(0x8A00_0000, a, a, b),
            AluOp::Or => self.rrr(0xAA00_0000, a, a, b),
            AluOp::Xor => self.rrr(0xCA00_0000, a, a, b),
            AluOp::Sll => self.rrr(0x9AC0_2000, a, a, b),
            AluOp::Srl => self.rrr(0x9AC0_2400, a, a, b),
            AluOp::Sra => self.rrr(0x9AC0_2800, a, a, b),
            AluOp::Slt => {
                self.cmp(a, b);
                self.cset(a, cc::LT);
            }
            AluOp::Sltu => {
                self.cmp(a, b);
                self.cset(a, cc::LO);
            }
            AluOp::AddW | AluOp::SubW | AluOp::SllW | AluOp::SrlW | AluOp::SraW => {
                let base = match op {
                    AluOp::AddW => 0x0B00_0000,
                    AluOp::SubW => 0x4B00_0000,
                    AluOp::SllW => 0x1AC0_2000,
                    AluOp::SrlW => 0x1AC0_2400,
                    _ => 0x1AC0_2800,
                };
                self.rrr(base, a, a, b);
                self.sxtw(a);
            }
        }
    }

    fn shr_imm(&mut self, a: Tmp, amount: u8) {
        let a = reg(a);
        self.emit(0xD340_FC00 | (u32::from(amount & 0x3F) << 16) | (a << 5) | a);
    }

    fn load_mem(&mut self, dst: Tmp, addr: Tmp, width: usize, signed: bool) {
        let base = match (width, signed) {
            (1, false) => 0x3860_6800,
            (1, true) => 0x38A0_6800,
            (2, false) => 0x7860_6800,
            (2, true) => 0x78A0_6800,
            (4, false) => 0xB860_6800,
            (4, true) => 0xB8A0_6800,
            _ => 0xF860_6800,
        };
        self.emit(base | (reg(addr) << 16) | (MEM << 5) | reg(dst));
    }

    fn store_mem(&mut self, addr: Tmp, src: Tmp, width: usize) {
        let base = match width {
            1 => 0x3820_6800,
            2 => 0x7820_6800,
            4 => 0xB820_6800,
            _ => 0xF820_6800,
        };
        self.emit(base | (reg(addr) << 16) | (MEM << 5) | reg(src));
    }

    fn call(&mut self, target: u64, args: &[Arg]) {
        for (n, arg) in (0u32..).zip(args) {
            match *arg {
                Arg::Hart => self.mov(n, HART),
                Arg::Tmp(t) => self.mov(n, reg(t)),
                Arg::Imm(v) => self.mov_imm(n, v),
            }
        }
        self.mov_imm(X16, target);
        self.emit(0xD63F_0000 | (X16 << 5)); // blr x16
        self.mov(reg(Tmp::T0), X0);
    }

    fn new_label(&mut self) -> Label {
        self.labels.create()
    }

    fn bind(&mut self, label: Label) {
        self.labels.bind(label, self.code.len());
    }

    fn jump(&mut self, label: Label) {
        self.fixup(0x1400_0000, label, Fixup::Branch);
    }

    fn branch_if(&mut self, cond: Cond, a: Tmp, b: Tmp, label: Label) {
        self.cmp(reg(a), reg(b));
        let cond = match cond {
            Cond::Eq => cc::EQ,
            Cond::Ne => cc::NE,
            Cond::Lt => cc::LT,
            Cond::Ge => cc::GE,
            Cond::Ltu => cc::LO,
            Cond::Geu => cc::HS,
        };
        self.fixup(0x5400_0000 | cond, label, Fixup::Imm19);
    }

    fn jump_if_zero(&mut self, t: Tmp, label: Label) {
        self.fixup(0xB400_0000 | reg(t), label, Fixup::Imm19);
    }

    fn jump_if_nonzero(&mut self, t: Tmp, label: Label) {
        self.fixup(0xB500_0000 | reg(t), label, Fixup::Imm19);
    }

    fn position(&self) -> usize {
        self.code.len()
    }

    fn finish(mut self) -> Result<Vec<u8>, EngineError> {
        for &(pos, label, kind) in &self.fixups {
            let target = self.labels.resolve(label)?;
            let delta = (target as i64 - pos as i64) / 4;
            let (bits, shift) = match kind {
                Fixup::Branch => (26, 0),
                Fixup::Imm19 => (19, 5),
            };
            let limit = 1i64 << (bits - 1);
            if delta < -limit || delta >= limit {
                return Err(EngineError::CodeBuffer(format!(
                    "branch displacement {delta} out of range"
                )));
            }
            let field = ((delta as u32) & ((1u32 << bits) - 1)) << shift;
            let mut word = [0u8; 4];
            word.copy_from_slice(&self.code[pos..pos + 4]);
            let patched = u32::from_le_bytes(word) | field;
            self.code[pos..pos + 4].copy_from_slice(&patched.to_le_bytes());
        }
        Ok(self.code)
    }
}
