//! x86-64 backend (System V ABI).
//!
//! Register assignment:
//!
//! | role            | register |
//! |-----------------|----------|
//! | state base      | `rbx`    |
//! | `*mut Hart`     | `r12`    |
//! | guest memory    | `r13`    |
//! | `T0` / result   | `rax`    |
//! | `T1` / shift    | `rcx`    |
//! | `T2`            | `r11`    |
//!
//! `rbx`, `r12` and `r13` are callee-saved, so they survive trampoline calls.
//! Three pushes on entry leave `rsp` 16-byte aligned at every call site.

use super::emit::{AluOp, Arg, Assembler, Cond, Label, Labels, Tmp};
use crate::common::EngineError;

const RAX: u8 = 0;
const RCX: u8 = 1;
const RDX: u8 = 2;
const RBX: u8 = 3;
const RSI: u8 = 6;
const RDI: u8 = 7;
const R11: u8 = 11;
const R12: u8 = 12;
const R13: u8 = 13;

const STATE: u8 = RBX;
const HART: u8 = R12;
const MEM: u8 = R13;

/// Integer argument registers, in order.
const ARG_REGS: [u8; 4] = [RDI, RSI, RDX, RCX];

const fn reg(t: Tmp) -> u8 {
    match t {
        Tmp::T0 => RAX,
        Tmp::T1 => RCX,
        Tmp::T2 => R11,
    }
}

#[inline(always)]
const fn rex(w: bool, r: u8, x: u8, b: u8) -> u8 {
    0x40 | ((w as u8) << 3) | ((r >> 3) << 2) | ((x >> 3) << 1) | (b >> 3)
}

#[inline(always)]
const fn modrm(md: u8, reg: u8, rm: u8) -> u8 {
    (md << 6) | ((reg & 7) << 3) | (rm & 7)
}

/// Emits x86-64 machine code into a growable buffer.
#[derive(Debug, Default)]
pub struct X64Assembler {
    code: Vec<u8>,
    labels: Labels,
    /// `(rel32 position, target)` pairs awaiting `finish`.
    fixups: Vec<(usize, Label)>,
}

impl X64Assembler {
    /// Creates an empty assembler.
    pub fn new() -> Self {
        Self::default()
    }

    fn bytes(&mut self, b: &[u8]) {
        self.code.extend_from_slice(b);
    }

    fn imm32(&mut self, v: i32) {
        self.code.extend_from_slice(&v.to_le_bytes());
    }

    fn rel32(&mut self, label: Label) {
        self.fixups.push((self.code.len(), label));
        self.imm32(0);
    }

    /// `mov dst, src` (64-bit).
    fn mov_rr(&mut self, dst: u8, src: u8) {
        if dst != src {
            self.bytes(&[rex(true, src, 0, dst), 0x89, modrm(3, src, dst)]);
        }
    }

    /// `mov dst, imm`, choosing the shortest encoding.
    fn mov_ri(&mut self, dst: u8, imm: u64) {
        if let Ok(v) = u32::try_from(imm) {
            if dst > 7 {
                self.code.push(rex(false, 0, 0, dst));
            }
            self.code.push(0xB8 + (dst & 7));
            self.code.extend_from_slice(&v.to_le_bytes());
        } else if let Ok(v) = i32::try_from(imm as i64) {
            self.bytes(&[rex(true, 0, 0, dst), 0xC7, modrm(3, 0, dst)]);
            self.imm32(v);
        } else {
            self.bytes(&[rex(true, 0, 0, dst), 0xB8 + (dst & 7)]);
            self.code.extend_from_slice(&imm.to_le_bytes());
        }
    }

    /// `movsxd dst, dst32`.
    fn sext32(&mut self, dst: u8) {
        self.bytes(&[rex(true, dst, 0, dst), 0x63, modrm(3, dst, dst)]);
    }

    /// Optional REX for a 32-bit register-register form.
    fn rex32(&mut self, r: u8, b: u8) {
        if (r | b) > 7 {
            self.code.push(rex(false, r, 0, b));
        }
    }

    /// ModRM + SIB for `[r13 + idx]` with a zero disp8 (`r13` needs a displacement).
    fn mem_operand(&mut self, reg: u8, idx: u8) {
        self.bytes(&[modrm(1, reg, 4), ((idx & 7) << 3) | (MEM & 7), 0]);
    }

    fn shift(&mut self, a: u8, ext: u8, wide: bool) {
        if wide {
            self.bytes(&[rex(true, 0, 0, a), 0xD3, modrm(3, ext, a)]);
        } else {
            self.rex32(0, a);
            self.bytes(&[0xD3, modrm(3, ext, a)]);
            self.sext32(a);
        }
    }

    fn set_cmp(&mut self, a: u8, b: u8, cc: u8) {
        // cmp a, b ; setcc a8 ; movzx a32, a8
        self.bytes(&[rex(true, b, 0, a), 0x39, modrm(3, b, a)]);
        self.bytes(&[rex(false, 0, 0, a), 0x0F, cc, modrm(3, 0, a)]);
        self.bytes(&[rex(false, a, 0, a), 0x0F, 0xB6, modrm(3, a, a)]);
    }
}

impl Assembler for X64Assembler {
    fn prologue(&mut self, state: u64, mem_base: u64) {
        self.bytes(&[0x53, 0x41, 0x54, 0x41, 0x55]); // push rbx; push r12; push r13
        self.bytes(&[rex(true, 0, 0, STATE), 0xB8 + (STATE & 7)]);
        self.code.extend_from_slice(&state.to_le_bytes());
        self.mov_rr(HART, RDI);
        self.bytes(&[rex(true, 0, 0, MEM), 0xB8 + (MEM & 7)]);
        self.code.extend_from_slice(&mem_base.to_le_bytes());
    }

    fn epilogue(&mut self) {
        self.bytes(&[0x41, 0x5D, 0x41, 0x5C, 0x5B, 0xC3]); // pop r13; pop r12; pop rbx; ret
    }

    fn load_state(&mut self, dst: Tmp, offset: i32) {
        let d = reg(dst);
        self.bytes(&[rex(true, d, 0, STATE), 0x8B, modrm(2, d, STATE)]);
        self.imm32(offset);
    }

    fn store_state(&mut self, offset: i32, src: Tmp) {
        let s = reg(src);
        self.bytes(&[rex(true, s, 0, STATE), 0x89, modrm(2, s, STATE)]);
        self.imm32(offset);
    }

    fn add_state_imm(&mut self, offset: i32, imm: u8) {
        // add qword [rbx + disp32], imm8
        self.bytes(&[rex(true, 0, 0, STATE), 0x83, modrm(2, 0, STATE)]);
        self.imm32(offset);
        self.code.push(imm & 0x7F);
    }

    fn load_imm(&mut self, dst: Tmp, imm: u64) {
        self.mov_ri(reg(dst), imm);
    }

    fn alu(&mut self, op: AluOp, a: Tmp, b: Tmp) {
        let (a, b) = (reg(a), reg(b));
        let rr = |asm: &mut Self, opc: u8| asm.bytes(&[rex(true, b, 0, a), opc, modrm(3, b, a)]);
        let rr32 = |asm: &mut Self, opc: u8| {
            asm.rex32(b, a);
            asm.bytes(&[opc, modrm(3, b, a)]);
            asm.sext32(a);
        };
        let is_shift = matches!(
            op,
            AluOp::Sll | AluOp::Srl | AluOp::Sra | AluOp::SllW | AluOp::SrlW | AluOp::SraW
        );
        if is_shift && b != RCX {
            self.mov_rr(RCX, b);
        }
        match op {
            AluOp::Add => rr(self, 0x01),
            AluOp::Sub => rr(self, 0x29),
            AluOp::And => rr(self, 0x21),
            AluOp::Or => rr(self, 0x09),
            AluOp::Xor => rr(self, 0x31),
            AluOp::Sll => self.shift(a, 4, true),
            AluOp::Srl => self.shift(a, 5, true),
            AluOp::Sra => self.shift(a, 7, true),
            AluOp::Slt => self.set_cmp(a, b, 0x9C),
            AluOp::Sltu => self.set_cmp(a, b, 0x92),
            AluOp::AddW => rr32(self, 0x01),
            AluOp::SubW => rr32(self, 0x29),
            AluOp::SllW => self.shift(a, 4, false),
            AluOp::SrlW => self.shift(a, 5, false),
            AluOp::SraW => self.shift(a, 7, false),
        }
    }

    fn shr_imm(&mut self, a: Tmp, amount: u8) {
        let a = reg(a);
        self.bytes(&[rex(true, 0, 0, a), 0xC1, modrm(3, 5, a), amount & 0x3F]);
    }

    fn load_mem(&mut self, dst: Tmp, addr: Tmp, width: usize, signed: bool) {
        let (d, i) = (reg(dst), reg(addr));
        let (wide, opc): (bool, &[u8]) = match (width, signed) {
            (1, false) => (false, &[0x0F, 0xB6]),
            (1, true) => (true, &[0x0F, 0xBE]),
            (2, false) => (false, &[0x0F, 0xB7]),
            (2, true) => (true, &[0x0F, 0xBF]),
            (4, false) => (false, &[0x8B]),
            (4, true) => (true, &[0x63]),
            _ => (true, &[0x8B]),
        };
        self.code.push(rex(wide, d, i, MEM));
        self.bytes(opc);
        self.mem_operand(d, i);
    }

    fn store_mem(&mut self, addr: Tmp, src: Tmp, width: usize) {
        let (s, i) = (reg(src), reg(addr));
        match width {
            1 => self.bytes(&[rex(false, s, i, MEM), 0x88]),
            2 => self.bytes(&[0x66, rex(false, s, i, MEM), 0x89]),
            4 => self.bytes(&[rex(false, s, i, MEM), 0x89]),
            _ => self.bytes(&[rex(true, s, i, MEM), 0x89]),
        }
        self.mem_operand(s, i);
    }

    fn call(&mut self, target: u64, args: &[Arg]) {
        debug_assert!(args.len() <= ARG_REGS.len());
        // Register sources first: every source is read before an argument
        // register that aliases it (rcx) is written.
        for (arg, &dst) in args.iter().zip(ARG_REGS.iter()) {
            match *arg {
                Arg::Hart => self.mov_rr(dst, HART),
                Arg::Tmp(t) => self.mov_rr(dst, reg(t)),
                Arg::Imm(_) => {}
            }
        }
        for (arg, &dst) in args.iter().zip(ARG_REGS.iter()) {
            if let Arg::Imm(v) = *arg {
                self.mov_ri(dst, v);
            }
        }
        self.mov_ri(RAX, target);
        self.bytes(&[0xFF, 0xD0]); // call rax
    }

    fn new_label(&mut self) -> Label {
        self.labels.create()
    }

    fn bind(&mut self, label: Label) {
        self.labels.bind(label, self.code.len());
    }

    fn jump(&mut self, label: Label) {
        self.code.push(0xE9);
        self.rel32(label);
    }

    fn branch_if(&mut self, cond: Cond, a: Tmp, b: Tmp, label: Label) {
        let (a, b) = (reg(a), reg(b));
        self.bytes(&[rex(true, b, 0, a), 0x39, modrm(3, b, a)]);
        let cc = match cond {
            Cond::Eq => 0x84,
            Cond::Ne => 0x85,
            Cond::Lt => 0x8C,
            Cond::Ge => 0x8D,
            Cond::Ltu => 0x82,
            Cond::Geu => 0x83,
        };
        self.bytes(&[0x0F, cc]);
        self.rel32(label);
    }

    fn jump_if_zero(&mut self, t: Tmp, label: Label) {
        let r = reg(t);
        self.bytes(&[rex(true, r, 0, r), 0x85, modrm(3, r, r), 0x0F, 0x84]);
        self.rel32(label);
    }

    fn jump_if_nonzero(&mut self, t: Tmp, label: Label) {
        let r = reg(t);
        self.bytes(&[rex(true, r, 0, r), 0x85, modrm(3, r, r), 0x0F, 0x85]);
        self.rel32(label);
    }

    fn position(&self) -> usize {
        self.code.len()
    }

    fn finish(mut self) -> Result<Vec<u8>, EngineError> {
        for &(pos, label) in &self.fixups {
            let target = self.labels.resolve(label)?;
            let rel = i32::try_from(target as i64 - (pos as i64 + 4))
                .map_err(|_| EngineError::CodeBuffer("rel32 displacement overflow".into()))?;
            self.code[pos..pos + 4].copy_from_slice(&rel.to_le_bytes());
        }
        Ok(self.code)
    }
}
