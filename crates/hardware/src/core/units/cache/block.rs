//! Cached instruction blocks.
//!
//! A `Block` is either a straight-line run collected by the interpreter (a basic
//! block, replayed through its per-instruction handlers) or a function-shaped unit
//! discovered by control-flow exploration, whose members are listed in `instr_pcs`.
//! Both kinds may carry native code once compiled.

use std::cell::{Cell, OnceCell};

use crate::core::jit::CompiledUnit;
use crate::isa::{ExecFn, Instruction};

/// A decoded instruction sequence keyed by its entry address.
#[derive(Debug)]
pub struct Block {
    /// Address of the first instruction.
    pub start_pc: u64,
    /// Set on construction; the cache never hands out an invalid block.
    pub valid: bool,
    /// Decoded members, in execution order for basic blocks and in layout order
    /// (entry first) for function units.
    pub instrs: Vec<Instruction>,
    /// Handlers for threaded replay; empty for function units.
    pub exec_fns: Vec<ExecFn>,
    /// Guest address of each member of a function unit.
    pub instr_pcs: Vec<u64>,
    /// Distinguishes a linked subgraph from a single basic block.
    pub is_function_block: bool,
    hits: Cell<u64>,
    compiled: OnceCell<CompiledUnit>,
}

impl Block {
    /// Creates a basic block from a collected run.
    pub fn basic(start_pc: u64, instrs: Vec<Instruction>, exec_fns: Vec<ExecFn>) -> Self {
        Self {
            start_pc,
            valid: true,
            instrs,
            exec_fns,
            instr_pcs: Vec::new(),
            is_function_block: false,
            hits: Cell::new(0),
            compiled: OnceCell::new(),
        }
    }

    /// Creates a function unit from discovered members.
    ///
    /// # Arguments
    ///
    /// * `start_pc` - Function entry.
    /// * `instrs` - Decoded members, parallel to `instr_pcs`.
    /// * `instr_pcs` - Member addresses, entry first.
    pub fn function(start_pc: u64, instrs: Vec<Instruction>, instr_pcs: Vec<u64>) -> Self {
        Self {
            start_pc,
            valid: true,
            instrs,
            exec_fns: Vec::new(),
            instr_pcs,
            is_function_block: true,
            hits: Cell::new(0),
            compiled: OnceCell::new(),
        }
    }

    /// Number of member instructions.
    #[inline(always)]
    pub fn len(&self) -> usize {
        self.instrs.len()
    }

    /// Returns `true` for a block with no members.
    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.instrs.is_empty()
    }

    /// Lookups since installation.
    #[inline(always)]
    pub fn hits(&self) -> u64 {
        self.hits.get()
    }

    /// Counts one lookup and returns the new total.
    #[inline(always)]
    pub(crate) fn record_hit(&self) {
        self.hits.set(self.hits.get().wrapping_add(1));
    }

    /// Native code, if the block has been compiled.
    #[inline(always)]
    pub fn compiled(&self) -> Option<&CompiledUnit> {
        self.compiled.get()
    }

    /// Returns `true` once native code is attached.
    #[inline(always)]
    pub fn is_compiled(&self) -> bool {
        self.compiled.get().is_some()
    }

    /// Attaches native code. A block is compiled at most once; a second unit is
    /// dropped.
    pub(crate) fn attach(&self, unit: CompiledUnit) {
        if self.compiled.set(unit).is_err() {
            tracing::debug!(pc = format_args!("{:#x}", self.start_pc), "block already compiled");
        }
    }

    /// Returns `true` if no member is a branch or jump, the precondition for
    /// leaf compilation.
    pub fn is_straight_line(&self) -> bool {
        self.instrs.iter().all(|i| !i.opcode.is_branch_or_jump())
    }
}
