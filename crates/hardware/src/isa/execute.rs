//! Per-opcode interpreter.
//!
//! `execute` performs one instruction against a hart and hands back the handler it
//! used, so the block cache can replay the same instruction later without decoding
//! or dispatching on the opcode again (threaded code).
//!
//! Handlers follow one convention: on entry `hart.pc()` is the instruction's own
//! address and `hart.next_pc()` is `pc + 4`. Control transfers overwrite
//! `next_pc`; nothing else touches the program counter.

use crate::common::EngineError;
use crate::core::Hart;
use crate::isa::instruction::Instruction;
use crate::isa::opcode::Opcode;

/// A per-instruction handler, reusable for threaded re-execution.
pub type ExecFn = fn(&Instruction, &mut Hart) -> Result<(), EngineError>;

/// Executes `instr` on `hart` and returns its handler.
///
/// Registered pre/post-execute callbacks for the opcode are invoked around the
/// handler.
///
/// # Errors
///
/// Returns `UnknownInstruction` for `Opcode::Unknown`, and any fault the handler
/// raises (page faults, unsupported CSRs).
pub fn execute(instr: &Instruction, hart: &mut Hart) -> Result<ExecFn, EngineError> {
    let handler = handler_for(instr.opcode);
    hart.dispatch(handler, instr)?;
    Ok(handler)
}

/// Returns the handler for an opcode.
pub fn handler_for(opcode: Opcode) -> ExecFn {
    match opcode {
        Opcode::Lui => lui,
        Opcode::Auipc => auipc,
        Opcode::Jal => jal,
        Opcode::Jalr => jalr,
        Opcode::Beq => beq,
        Opcode::Bne => bne,
        Opcode::Blt => blt,
        Opcode::Bge => bge,
        Opcode::Bltu => bltu,
        Opcode::Bgeu => bgeu,
        Opcode::Lb => lb,
        Opcode::Lh => lh,
        Opcode::Lw => lw,
        Opcode::Ld => ld,
        Opcode::Lbu => lbu,
        Opcode::Lhu => lhu,
        Opcode::Lwu => lwu,
        Opcode::Sb => sb,
        Opcode::Sh => sh,
        Opcode::Sw => sw,
        Opcode::Sd => sd,
        Opcode::Addi => addi,
        Opcode::Slti => slti,
        Opcode::Sltiu => sltiu,
        Opcode::Xori => xori,
        Opcode::Ori => ori,
        Opcode::Andi => andi,
        Opcode::Slli => slli,
        Opcode::Srli => srli,
        Opcode::Srai => srai,
        Opcode::Add => add,
        Opcode::Sub => sub,
        Opcode::Sll => sll,
        Opcode::Slt => slt,
        Opcode::Sltu => sltu,
        Opcode::Xor => xor,
        Opcode::Srl => srl,
        Opcode::Sra => sra,
        Opcode::Or => or,
        Opcode::And => and,
        Opcode::Addiw => addiw,
        Opcode::Slliw => slliw,
        Opcode::Srliw => srliw,
        Opcode::Sraiw => sraiw,
        Opcode::Addw => addw,
        Opcode::Subw => subw,
        Opcode::Sllw => sllw,
        Opcode::Srlw => srlw,
        Opcode::Sraw => sraw,
        Opcode::Fence => fence,
        Opcode::Ecall | Opcode::Ebreak => ecall,
        Opcode::Csrrw => csrrw,
        Opcode::Csrrs => csrrs,
        Opcode::Csrrc => csrrc,
        Opcode::Csrrwi => csrrwi,
        Opcode::Csrrsi => csrrsi,
        Opcode::Csrrci => csrrci,
        Opcode::Unknown => unknown,
    }
}

/// Reads an operand register; an absent slot reads as zero.
#[inline(always)]
fn src(hart: &Hart, slot: Option<u8>) -> Result<u64, EngineError> {
    slot.map_or(Ok(0), |r| hart.get_reg(usize::from(r)))
}

/// Writes the destination register; an absent slot discards the value.
#[inline(always)]
fn dst(hart: &mut Hart, slot: Option<u8>, val: u64) -> Result<(), EngineError> {
    match slot {
        Some(r) => hart.set_reg(usize::from(r), val),
        None => Ok(()),
    }
}

#[inline(always)]
const fn sext32(val: u64) -> u64 {
    val as i32 as i64 as u64
}

macro_rules! reg_reg {
    ($($name:ident => |$a:ident, $b:ident| $body:expr;)*) => {$(
        fn $name(i: &Instruction, hart: &mut Hart) -> Result<(), EngineError> {
            let $a = src(hart, i.rs1)?;
            let $b = src(hart, i.rs2)?;
            dst(hart, i.rd, $body)
        }
    )*};
}

macro_rules! reg_imm {
    ($($name:ident => |$a:ident, $imm:ident| $body:expr;)*) => {$(
        fn $name(i: &Instruction, hart: &mut Hart) -> Result<(), EngineError> {
            let $a = src(hart, i.rs1)?;
            let $imm = i.imm as u64;
            dst(hart, i.rd, $body)
        }
    )*};
}

macro_rules! branch {
    ($($name:ident => |$a:ident, $b:ident| $cond:expr;)*) => {$(
        fn $name(i: &Instruction, hart: &mut Hart) -> Result<(), EngineError> {
            let $a = src(hart, i.rs1)?;
            let $b = src(hart, i.rs2)?;
            if $cond {
                hart.set_next_pc(hart.pc().wrapping_add(i.imm as u64));
            }
            Ok(())
        }
    )*};
}

macro_rules! load {
    ($($name:ident => $size:literal, $signed:literal;)*) => {$(
        fn $name(i: &Instruction, hart: &mut Hart) -> Result<(), EngineError> {
            let addr = src(hart, i.rs1)?.wrapping_add(i.imm as u64);
            let raw = hart.load(addr, $size)?;
            dst(hart, i.rd, extend(raw, $size, $signed))
        }
    )*};
}

macro_rules! store {
    ($($name:ident => $size:literal;)*) => {$(
        fn $name(i: &Instruction, hart: &mut Hart) -> Result<(), EngineError> {
            let addr = src(hart, i.rs1)?.wrapping_add(i.imm as u64);
            let val = src(hart, i.rs2)?;
            hart.store(addr, val, $size)
        }
    )*};
}

/// Zero- or sign-extends a loaded value of `size` bytes.
#[inline(always)]
pub(crate) const fn extend(raw: u64, size: usize, signed: bool) -> u64 {
    match (size, signed) {
        (1, true) => raw as i8 as i64 as u64,
        (2, true) => raw as i16 as i64 as u64,
        (4, true) => raw as i32 as i64 as u64,
        (1, false) => raw & 0xFF,
        (2, false) => raw & 0xFFFF,
        (4, false) => raw & 0xFFFF_FFFF,
        _ => raw,
    }
}

reg_reg! {
    add => |a, b| a.wrapping_add(b);
    sub => |a, b| a.wrapping_sub(b);
    sll => |a, b| a << (b & 0x3F);
    slt => |a, b| u64::from((a as i64) < (b as i64));
    sltu => |a, b| u64::from(a < b);
    xor => |a, b| a ^ b;
    srl => |a, b| a >> (b & 0x3F);
    sra => |a, b| ((a as i64) >> (b & 0x3F)) as u64;
    or => |a, b| a | b;
    and => |a, b| a & b;
    addw => |a, b| sext32(a.wrapping_add(b));
    subw => |a, b| sext32(a.wrapping_sub(b));
    sllw => |a, b| sext32(u64::from((a as u32) << (b & 0x1F)));
    srlw => |a, b| sext32(u64::from((a as u32) >> (b & 0x1F)));
    sraw => |a, b| ((a as i32) >> (b & 0x1F)) as i64 as u64;
}

reg_imm! {
    addi => |a, imm| a.wrapping_add(imm);
    slti => |a, imm| u64::from((a as i64) < (imm as i64));
    sltiu => |a, imm| u64::from(a < imm);
    xori => |a, imm| a ^ imm;
    ori => |a, imm| a | imm;
    andi => |a, imm| a & imm;
    slli => |a, imm| a << (imm & 0x3F);
    srli => |a, imm| a >> (imm & 0x3F);
    srai => |a, imm| ((a as i64) >> (imm & 0x3F)) as u64;
    addiw => |a, imm| sext32(a.wrapping_add(imm));
    slliw => |a, imm| sext32(u64::from((a as u32) << (imm & 0x1F)));
    srliw => |a, imm| sext32(u64::from((a as u32) >> (imm & 0x1F)));
    sraiw => |a, imm| ((a as i32) >> (imm & 0x1F)) as i64 as u64;
}

branch! {
    beq => |a, b| a == b;
    bne => |a, b| a != b;
    blt => |a, b| (a as i64) < (b as i64);
    bge => |a, b| (a as i64) >= (b as i64);
    bltu => |a, b| a < b;
    bgeu => |a, b| a >= b;
}

load! {
    lb => 1, true;
    lh => 2, true;
    lw => 4, true;
    ld => 8, false;
    lbu => 1, false;
    lhu => 2, false;
    lwu => 4, false;
}

store! {
    sb => 1;
    sh => 2;
    sw => 4;
    sd => 8;
}

fn lui(i: &Instruction, hart: &mut Hart) -> Result<(), EngineError> {
    dst(hart, i.rd, i.imm as u64)
}

fn auipc(i: &Instruction, hart: &mut Hart) -> Result<(), EngineError> {
    let val = hart.pc().wrapping_add(i.imm as u64);
    dst(hart, i.rd, val)
}

fn jal(i: &Instruction, hart: &mut Hart) -> Result<(), EngineError> {
    let pc = hart.pc();
    dst(hart, i.rd, pc.wrapping_add(4))?;
    hart.set_next_pc(pc.wrapping_add(i.imm as u64));
    Ok(())
}

fn jalr(i: &Instruction, hart: &mut Hart) -> Result<(), EngineError> {
    // Target is computed before rd is written: rd may alias rs1.
    let target = src(hart, i.rs1)?.wrapping_add(i.imm as u64) & !1;
    let link = hart.pc().wrapping_add(4);
    dst(hart, i.rd, link)?;
    hart.set_next_pc(target);
    Ok(())
}

#[allow(clippy::unnecessary_wraps)]
fn fence(_i: &Instruction, _hart: &mut Hart) -> Result<(), EngineError> {
    Ok(())
}

#[allow(clippy::unnecessary_wraps)]
fn ecall(_i: &Instruction, hart: &mut Hart) -> Result<(), EngineError> {
    hart.do_ecall();
    Ok(())
}

const fn csr_replace(_old: u64, operand: u64) -> u64 {
    operand
}

const fn csr_set(old: u64, operand: u64) -> u64 {
    old | operand
}

const fn csr_clear(old: u64, operand: u64) -> u64 {
    old & !operand
}

/// Shared CSR read-modify-write. `write` is `None` when the instruction only
/// reads: CSRRS/CSRRC with `rs1 = x0` and their immediate forms with a zero
/// immediate never write.
fn csr_rmw(
    i: &Instruction,
    hart: &mut Hart,
    write: Option<fn(u64, u64) -> u64>,
    operand: u64,
) -> Result<(), EngineError> {
    let csr = i.csr();
    let old = hart.get_csr(csr)?;
    if let Some(op) = write {
        hart.set_csr(csr, op(old, operand))?;
    }
    dst(hart, i.rd, old)
}

fn csrrw(i: &Instruction, hart: &mut Hart) -> Result<(), EngineError> {
    let operand = src(hart, i.rs1)?;
    csr_rmw(i, hart, Some(csr_replace), operand)
}

fn csrrs(i: &Instruction, hart: &mut Hart) -> Result<(), EngineError> {
    let operand = src(hart, i.rs1)?;
    let write = (i.rs1 != Some(0)).then_some(csr_set as fn(u64, u64) -> u64);
    csr_rmw(i, hart, write, operand)
}

fn csrrc(i: &Instruction, hart: &mut Hart) -> Result<(), EngineError> {
    let operand = src(hart, i.rs1)?;
    let write = (i.rs1 != Some(0)).then_some(csr_clear as fn(u64, u64) -> u64);
    csr_rmw(i, hart, write, operand)
}

fn csrrwi(i: &Instruction, hart: &mut Hart) -> Result<(), EngineError> {
    csr_rmw(i, hart, Some(csr_replace), i.zimm())
}

fn csrrsi(i: &Instruction, hart: &mut Hart) -> Result<(), EngineError> {
    let write = (i.zimm() != 0).then_some(csr_set as fn(u64, u64) -> u64);
    csr_rmw(i, hart, write, i.zimm())
}

fn csrrci(i: &Instruction, hart: &mut Hart) -> Result<(), EngineError> {
    let write = (i.zimm() != 0).then_some(csr_clear as fn(u64, u64) -> u64);
    csr_rmw(i, hart, write, i.zimm())
}

fn unknown(i: &Instruction, hart: &mut Hart) -> Result<(), EngineError> {
    Err(EngineError::UnknownInstruction {
        pc: hart.pc(),
        raw: i.raw,
    })
}
