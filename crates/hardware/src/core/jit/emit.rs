//! Code emission interface.
//!
//! Lowering (`lower`) speaks only this trait; each host backend implements it
//! with its own register assignment and encodings. The model is small on purpose:
//!
//! 1. **Temporaries:** Three caller-saved scratch registers, `T0`..`T2`. Nothing
//!    survives a `call`; the result of a call lands in `T0`.
//! 2. **State Slots:** Loads and stores at fixed byte offsets from the
//!    architectural state, whose address is baked in by `prologue`.
//! 3. **Guest Memory:** Direct accesses at `base + T` once lowering has emitted
//!    the bounds and translation guards.
//! 4. **Labels:** Forward and backward references, patched by `finish`.

use crate::common::EngineError;

/// Scratch register.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Tmp {
    /// First operand and call result.
    T0,
    /// Second operand.
    T1,
    /// Guard and address scratch.
    T2,
}

/// Two-operand integer operations, `a = a op b`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AluOp {
    /// Wrapping add.
    Add,
    /// Wrapping subtract.
    Sub,
    /// Bitwise and.
    And,
    /// Bitwise or.
    Or,
    /// Bitwise xor.
    Xor,
    /// Left shift by `b & 63`.
    Sll,
    /// Logical right shift by `b & 63`.
    Srl,
    /// Arithmetic right shift by `b & 63`.
    Sra,
    /// `(a as i64) < (b as i64)` as 0/1.
    Slt,
    /// `a < b` as 0/1.
    Sltu,
    /// 32-bit add, sign-extended.
    AddW,
    /// 32-bit subtract, sign-extended.
    SubW,
    /// 32-bit left shift by `b & 31`, sign-extended.
    SllW,
    /// 32-bit logical right shift by `b & 31`, sign-extended.
    SrlW,
    /// 32-bit arithmetic right shift by `b & 31`, sign-extended.
    SraW,
}

/// Branch conditions on `a ? b`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Cond {
    /// Equal.
    Eq,
    /// Not equal.
    Ne,
    /// Signed less than.
    Lt,
    /// Signed greater or equal.
    Ge,
    /// Unsigned less than.
    Ltu,
    /// Unsigned greater or equal.
    Geu,
}

/// Call argument, in SysV / AAPCS64 argument order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Arg {
    /// The `*mut Hart` the unit was invoked with.
    Hart,
    /// A scratch register.
    Tmp(Tmp),
    /// A constant.
    Imm(u64),
}

/// Opaque label handle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Label(pub(crate) usize);

/// A host code emitter.
pub trait Assembler {
    /// Saves callee-saved registers and pins the state and guest memory bases.
    fn prologue(&mut self, state: u64, mem_base: u64);

    /// Restores callee-saved registers and returns.
    fn epilogue(&mut self);

    /// `dst = state[offset]` (64-bit).
    fn load_state(&mut self, dst: Tmp, offset: i32);

    /// `state[offset] = src` (64-bit).
    fn store_state(&mut self, offset: i32, src: Tmp);

    /// `state[offset] += imm`.
    fn add_state_imm(&mut self, offset: i32, imm: u8);

    /// `dst = imm`.
    fn load_imm(&mut self, dst: Tmp, imm: u64);

    /// `a = a op b`.
    fn alu(&mut self, op: AluOp, a: Tmp, b: Tmp);

    /// `a >>= amount` (logical).
    fn shr_imm(&mut self, a: Tmp, amount: u8);

    /// `dst = guest[addr]`, `width` bytes, zero- or sign-extended.
    fn load_mem(&mut self, dst: Tmp, addr: Tmp, width: usize, signed: bool);

    /// `guest[addr] = src`, low `width` bytes.
    fn store_mem(&mut self, addr: Tmp, src: Tmp, width: usize);

    /// Calls the host function at `target`; the result lands in `T0`.
    fn call(&mut self, target: u64, args: &[Arg]);

    /// Allocates an unbound label.
    fn new_label(&mut self) -> Label;

    /// Binds `label` to the current position.
    fn bind(&mut self, label: Label);

    /// Unconditional jump.
    fn jump(&mut self, label: Label);

    /// Jumps if `a cond b`.
    fn branch_if(&mut self, cond: Cond, a: Tmp, b: Tmp, label: Label);

    /// Jumps if `t == 0`.
    fn jump_if_zero(&mut self, t: Tmp, label: Label);

    /// Jumps if `t != 0`.
    fn jump_if_nonzero(&mut self, t: Tmp, label: Label);

    /// Current code size in bytes.
    fn position(&self) -> usize;

    /// Patches label references and returns the code.
    ///
    /// # Errors
    ///
    /// Returns `CodeBuffer` if a referenced label was never bound or a
    /// displacement does not fit its encoding.
    fn finish(self) -> Result<Vec<u8>, EngineError>;
}

/// Label bookkeeping shared by the backends.
#[derive(Debug, Default)]
pub(crate) struct Labels {
    bound: Vec<Option<usize>>,
}

impl Labels {
    pub(crate) fn create(&mut self) -> Label {
        self.bound.push(None);
        Label(self.bound.len() - 1)
    }

    pub(crate) fn bind(&mut self, label: Label, pos: usize) {
        self.bound[label.0] = Some(pos);
    }

    pub(crate) fn resolve(&self, label: Label) -> Result<usize, EngineError> {
        self.bound
            .get(label.0)
            .copied()
            .flatten()
            .ok_or_else(|| EngineError::CodeBuffer(format!("label {} never bound", label.0)))
    }
}
