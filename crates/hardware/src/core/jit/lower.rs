//! Lowering of cached blocks to host code.
//!
//! One pass over the members, generic over the [`Assembler`] backend:
//!
//! 1. **Leaf Units:** Members run in order; each non-control member advances the
//!    staged `pc` by 4. The engine credits the instruction counter afterwards.
//! 2. **Function Units:** Every member gets a label and bumps the instruction
//!    counter inline. Branches and direct jumps land on the label of their
//!    target when it is a member, otherwise on an exit stub that stores the
//!    target into `pc`. Calls go through the call trampoline and continue at the
//!    return label only if control came back there; a return-shaped `jalr`
//!    always exits.
//! 3. **Memory:** Loads and stores go through the translator trampolines. When
//!    direct access is allowed, a runtime check of `satp.MODE == 0` plus a bounds
//!    check selects `base + addr` instead.
//! 4. **System:** CSR access, ECALL and EBREAK call the interpreter handler.

use std::collections::HashMap;

use super::emit::{AluOp, Arg, Assembler, Cond, Label, Tmp};
use super::trampolines::Trampolines;
use crate::common::constants::SATP_MODE_SHIFT;
use crate::common::{EngineError, INSTRUCTION_SIZE};
use crate::core::arch::state::{COUNTER_OFFSET, PC_OFFSET, SATP_OFFSET, reg_offset};
use crate::core::units::cache::Block;
use crate::isa::{Instruction, Opcode};

/// Compile-time environment of a unit.
#[derive(Clone, Copy, Debug)]
pub struct LowerCtx {
    /// Address of the hart's `ArchState`.
    pub state: u64,
    /// Host address of guest physical address 0.
    pub mem_base: u64,
    /// Guest memory size in bytes.
    pub mem_size: u64,
    /// Emit the direct-access fast path for loads and stores.
    pub direct_memory: bool,
    /// Trampoline addresses.
    pub tramps: Trampolines,
}

/// What follows a lowered member.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Flow {
    /// Control continues at `pc + 4`.
    Next,
    /// The member emitted its own successors.
    Done,
}

struct Lowering<'a, A: Assembler> {
    asm: &'a mut A,
    ctx: &'a LowerCtx,
    function: bool,
    exit: Label,
    labels: HashMap<u64, Label>,
    stubs: HashMap<u64, Label>,
}

/// Emits `block` into `asm`.
///
/// # Errors
///
/// Returns `UnknownInstruction` for a member with no native translation, which
/// aborts the whole unit.
pub fn lower_block<A: Assembler>(
    asm: &mut A,
    ctx: &LowerCtx,
    block: &Block,
) -> Result<(), EngineError> {
    let pcs: Vec<u64> = if block.is_function_block {
        block.instr_pcs.clone()
    } else {
        (0..block.len() as u64)
            .map(|i| block.start_pc.wrapping_add(i * INSTRUCTION_SIZE))
            .collect()
    };
    if pcs.len() != block.len() {
        return Err(EngineError::CodeBuffer(format!(
            "unit at {:#x} lists {} addresses for {} instructions",
            block.start_pc,
            pcs.len(),
            block.len()
        )));
    }

    asm.prologue(ctx.state, ctx.mem_base);
    let exit = asm.new_label();
    let mut lw = Lowering {
        asm,
        ctx,
        function: block.is_function_block,
        exit,
        labels: HashMap::new(),
        stubs: HashMap::new(),
    };
    if lw.function {
        lw.labels
            .extend(pcs.iter().map(|&pc| (pc, lw.asm.new_label())));
    }

    for (i, (&pc, instr)) in pcs.iter().zip(&block.instrs).enumerate() {
        if lw.function {
            lw.asm.bind(lw.labels[&pc]);
            lw.asm.add_state_imm(COUNTER_OFFSET, 1);
        }
        if lw.member(pc, instr)? == Flow::Next {
            let next = pc.wrapping_add(INSTRUCTION_SIZE);
            if !lw.function {
                lw.asm.add_state_imm(PC_OFFSET, INSTRUCTION_SIZE as u8);
            } else if pcs.get(i + 1) != Some(&next) {
                lw.goto(next);
            }
        }
    }

    lw.asm.bind(exit);
    lw.asm.epilogue();

    let mut stubs: Vec<(u64, Label)> = lw.stubs.iter().map(|(&pc, &l)| (pc, l)).collect();
    stubs.sort_unstable_by_key(|&(pc, _)| pc);
    for (pc, label) in stubs {
        lw.asm.bind(label);
        lw.set_pc(pc);
        lw.asm.jump(exit);
    }
    Ok(())
}

const fn alu_op(op: Opcode) -> Option<AluOp> {
    Some(match op {
        Opcode::Add | Opcode::Addi => AluOp::Add,
        Opcode::Sub => AluOp::Sub,
        Opcode::And | Opcode::Andi => AluOp::And,
        Opcode::Or | Opcode::Ori => AluOp::Or,
        Opcode::Xor | Opcode::Xori => AluOp::Xor,
        Opcode::Sll | Opcode::Slli => AluOp::Sll,
        Opcode::Srl | Opcode::Srli => AluOp::Srl,
        Opcode::Sra | Opcode::Srai => AluOp::Sra,
        Opcode::Slt | Opcode::Slti => AluOp::Slt,
        Opcode::Sltu | Opcode::Sltiu => AluOp::Sltu,
        Opcode::Addw | Opcode::Addiw => AluOp::AddW,
        Opcode::Subw => AluOp::SubW,
        Opcode::Sllw | Opcode::Slliw => AluOp::SllW,
        Opcode::Srlw | Opcode::Srliw => AluOp::SrlW,
        Opcode::Sraw | Opcode::Sraiw => AluOp::SraW,
        _ => return None,
    })
}

const fn branch_cond(op: Opcode) -> Option<Cond> {
    Some(match op {
        Opcode::Beq => Cond::Eq,
        Opcode::Bne => Cond::Ne,
        Opcode::Blt => Cond::Lt,
        Opcode::Bge => Cond::Ge,
        Opcode::Bltu => Cond::Ltu,
        Opcode::Bgeu => Cond::Geu,
        _ => return None,
    })
}

impl<A: Assembler> Lowering<'_, A> {
    fn read(&mut self, t: Tmp, slot: Option<u8>) {
        match slot {
            Some(r) => self.asm.load_state(t, reg_offset(r)),
            None => self.asm.load_imm(t, 0),
        }
    }

    fn write(&mut self, slot: Option<u8>, t: Tmp) {
        if let Some(r) = slot.filter(|&r| r != 0) {
            self.asm.store_state(reg_offset(r), t);
        }
    }

    fn set_pc(&mut self, pc: u64) {
        self.asm.load_imm(Tmp::T2, pc);
        self.asm.store_state(PC_OFFSET, Tmp::T2);
    }

    fn stub(&mut self, pc: u64) -> Label {
        *self
            .stubs
            .entry(pc)
            .or_insert_with(|| self.asm.new_label())
    }

    /// Where control transfers to `pc` land.
    fn target(&mut self, pc: u64) -> Label {
        if self.function
            && let Some(&label) = self.labels.get(&pc)
        {
            return label;
        }
        self.stub(pc)
    }

    fn goto(&mut self, pc: u64) {
        let label = self.target(pc);
        self.asm.jump(label);
    }

    fn member(&mut self, pc: u64, instr: &Instruction) -> Result<Flow, EngineError> {
        let imm = instr.imm as u64;
        let link = pc.wrapping_add(INSTRUCTION_SIZE);

        if let Some(op) = alu_op(instr.opcode) {
            self.read(Tmp::T0, instr.rs1);
            match instr.rs2 {
                Some(_) => self.read(Tmp::T1, instr.rs2),
                None => self.asm.load_imm(Tmp::T1, imm),
            }
            self.asm.alu(op, Tmp::T0, Tmp::T1);
            self.write(instr.rd, Tmp::T0);
            return Ok(Flow::Next);
        }

        if let Some(cond) = branch_cond(instr.opcode) {
            self.read(Tmp::T0, instr.rs1);
            self.read(Tmp::T1, instr.rs2);
            let taken = self.target(pc.wrapping_add(imm));
            self.asm.branch_if(cond, Tmp::T0, Tmp::T1, taken);
            return Ok(Flow::Next);
        }

        if let Some((width, signed)) = instr.opcode.load_width() {
            self.effective_address(instr);
            self.load(pc, width, signed);
            self.write(instr.rd, Tmp::T0);
            return Ok(Flow::Next);
        }

        if let Some(width) = instr.opcode.store_width() {
            self.effective_address(instr);
            self.read(Tmp::T1, instr.rs2);
            self.store(pc, width);
            return Ok(Flow::Next);
        }

        match instr.opcode {
            Opcode::Lui => {
                self.asm.load_imm(Tmp::T0, imm);
                self.write(instr.rd, Tmp::T0);
                Ok(Flow::Next)
            }
            Opcode::Auipc => {
                self.asm.load_imm(Tmp::T0, pc.wrapping_add(imm));
                self.write(instr.rd, Tmp::T0);
                Ok(Flow::Next)
            }
            Opcode::Jal => {
                let target = pc.wrapping_add(imm);
                self.asm.load_imm(Tmp::T0, link);
                self.write(instr.rd, Tmp::T0);
                if self.function && instr.is_call() {
                    self.call(Arg::Imm(target), link);
                } else {
                    self.goto(target);
                }
                Ok(Flow::Done)
            }
            Opcode::Jalr => {
                // Target first: rd may alias rs1.
                self.effective_address(instr);
                self.asm.load_imm(Tmp::T1, !1);
                self.asm.alu(AluOp::And, Tmp::T0, Tmp::T1);
                self.asm.load_imm(Tmp::T1, link);
                self.write(instr.rd, Tmp::T1);
                if self.function && instr.is_call() {
                    self.call(Arg::Tmp(Tmp::T0), link);
                } else {
                    self.asm.store_state(PC_OFFSET, Tmp::T0);
                    self.asm.jump(self.exit);
                }
                Ok(Flow::Done)
            }
            Opcode::Fence => Ok(Flow::Next),
            Opcode::Ecall | Opcode::Ebreak => {
                self.system(pc, instr);
                self.set_pc(link);
                self.asm.jump(self.exit);
                Ok(Flow::Done)
            }
            op if op.is_csr() => {
                self.system(pc, instr);
                Ok(Flow::Next)
            }
            _ => Err(EngineError::UnknownInstruction { pc, raw: instr.raw }),
        }
    }

    /// `T0 = rs1 + imm`.
    fn effective_address(&mut self, instr: &Instruction) {
        self.read(Tmp::T0, instr.rs1);
        self.asm.load_imm(Tmp::T1, instr.imm as u64);
        self.asm.alu(AluOp::Add, Tmp::T0, Tmp::T1);
    }

    /// Emits the direct-access guard for an access of `width` bytes at `T0`;
    /// jumps to `slow` unless translation is off and the access is in bounds.
    /// Returns `false` when no direct path can be emitted.
    fn guard(&mut self, width: usize, slow: Label) -> bool {
        let width = width as u64;
        if !self.ctx.direct_memory || self.ctx.mem_size < width {
            return false;
        }
        self.asm.load_state(Tmp::T2, SATP_OFFSET);
        self.asm.shr_imm(Tmp::T2, SATP_MODE_SHIFT as u8);
        self.asm.jump_if_nonzero(Tmp::T2, slow);
        self.asm.load_imm(Tmp::T2, self.ctx.mem_size - width);
        self.asm.branch_if(Cond::Ltu, Tmp::T2, Tmp::T0, slow);
        true
    }

    /// `T0 = load(T0)`.
    fn load(&mut self, pc: u64, width: usize, signed: bool) {
        let slow = self.asm.new_label();
        let done = self.asm.new_label();
        if self.guard(width, slow) {
            self.asm.load_mem(Tmp::T0, Tmp::T0, width, signed);
            self.asm.jump(done);
        }
        self.asm.bind(slow);
        self.set_pc(pc);
        self.asm.call(
            self.ctx.tramps.load,
            &[
                Arg::Hart,
                Arg::Tmp(Tmp::T0),
                Arg::Imm(width as u64),
                Arg::Imm(u64::from(signed)),
            ],
        );
        self.asm.bind(done);
    }

    /// `store(T0, T1)`.
    fn store(&mut self, pc: u64, width: usize) {
        let slow = self.asm.new_label();
        let done = self.asm.new_label();
        if self.guard(width, slow) {
            self.asm.store_mem(Tmp::T0, Tmp::T1, width);
            self.asm.jump(done);
        }
        self.asm.bind(slow);
        self.set_pc(pc);
        self.asm.call(
            self.ctx.tramps.store,
            &[
                Arg::Hart,
                Arg::Tmp(Tmp::T0),
                Arg::Tmp(Tmp::T1),
                Arg::Imm(width as u64),
            ],
        );
        self.asm.bind(done);
    }

    fn system(&mut self, pc: u64, instr: &Instruction) {
        self.set_pc(pc);
        self.asm.call(
            self.ctx.tramps.system,
            &[Arg::Hart, Arg::Imm(u64::from(instr.raw))],
        );
    }

    /// Call through the trampoline; continue at `link` if the callee came back.
    fn call(&mut self, target: Arg, link: u64) {
        self.asm.call(
            self.ctx.tramps.call,
            &[Arg::Hart, target, Arg::Imm(link)],
        );
        self.asm.jump_if_zero(Tmp::T0, self.exit);
        self.goto(link);
    }
}
