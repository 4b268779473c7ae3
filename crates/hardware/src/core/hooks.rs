//! Instrumentation callbacks.
//!
//! Observers register with a hart and are invoked, in registration order, at:
//! 1. **Pre/Post Execute:** Around the interpreter handler of selected opcodes.
//!    Lists are indexed by the dense opcode number.
//! 2. **Block Start/End:** On entry to a cached block and when it runs to its end.
//! 3. **Memory Access:** After every load and store that reaches guest memory.
//! 4. **Translation:** After every translation decision, faulting or not.
//!
//! Each category has a boolean gate, so a hart with nothing registered pays one
//! branch per event. Callbacks observe; they cannot change the outcome of the
//! event they are told about. Native code does not call per-instruction
//! callbacks, and emits no direct memory path while memory or translation
//! observers exist.

use std::fmt;
use std::rc::Rc;

use crate::common::{AccessType, EngineError};
use crate::core::Hart;
use crate::isa::{Instruction, Opcode};

/// Identifies the party that registered a callback.
pub type OwnerId = usize;

/// An observer.
pub type HookFn = Rc<dyn Fn(&mut Hart, &HookEvent<'_>, OwnerId)>;

/// Operand values after an instruction's handler ran.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PostExecInfo {
    /// `rs1` index and value read before execution.
    pub rs1: Option<(u8, u64)>,
    /// `rs2` index and value read before execution.
    pub rs2: Option<(u8, u64)>,
    /// `rd` index and value after execution.
    pub rd: Option<(u8, u64)>,
    /// Immediate.
    pub imm: i64,
}

/// A completed guest memory access.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MemAccessInfo {
    /// Load or store.
    pub kind: AccessType,
    /// Virtual address.
    pub va: u64,
    /// Physical address.
    pub pa: u64,
    /// Width in bytes.
    pub size: usize,
    /// Value loaded or stored.
    pub value: u64,
}

/// A translation decision.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TranslateHookInfo {
    /// Access kind.
    pub kind: AccessType,
    /// Virtual address.
    pub va: u64,
    /// Resulting physical address, zero on fault.
    pub pa: u64,
    /// The fault, if any.
    pub fault: Option<EngineError>,
}

/// Block entry or exit.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BlockHookInfo {
    /// Entry address of the block.
    pub pc: u64,
}

/// What a callback is told about.
#[derive(Debug)]
pub enum HookEvent<'a> {
    /// Before an instruction's handler runs.
    PreExec(&'a Instruction),
    /// After an instruction's handler ran.
    PostExec(&'a Instruction, PostExecInfo),
    /// A cached block is entered.
    BlockStart(BlockHookInfo),
    /// A cached block ran to its last member.
    BlockEnd(BlockHookInfo),
    /// A load or store completed.
    MemAccess(MemAccessInfo),
    /// An address was translated.
    Translate(TranslateHookInfo),
}

/// A registered callback and its owner.
#[derive(Clone)]
pub struct HookRecord {
    /// Registering party.
    pub owner: OwnerId,
    /// The callback.
    pub callback: HookFn,
}

impl fmt::Debug for HookRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HookRecord")
            .field("owner", &self.owner)
            .finish_non_exhaustive()
    }
}

/// An ordered callback list, shared so it can be walked while the hart is
/// mutably borrowed by the callbacks themselves.
pub type HookList = Rc<Vec<HookRecord>>;

fn push(list: &mut HookList, owner: OwnerId, callback: HookFn) {
    Rc::make_mut(list).push(HookRecord { owner, callback });
}

/// Per-hart callback registry.
#[derive(Debug)]
pub struct Hooks {
    pre: Vec<HookList>,
    post: Vec<HookList>,
    block_start: HookList,
    block_end: HookList,
    mem_access: HookList,
    translate: HookList,
    any_pre: bool,
    any_post: bool,
    any_block_start: bool,
    any_block_end: bool,
    any_mem_access: bool,
    any_translate: bool,
}

impl Default for Hooks {
    fn default() -> Self {
        Self::new()
    }
}

impl Hooks {
    /// Creates an empty registry with one slot per opcode.
    pub fn new() -> Self {
        Self {
            pre: vec![HookList::default(); Opcode::COUNT],
            post: vec![HookList::default(); Opcode::COUNT],
            block_start: HookList::default(),
            block_end: HookList::default(),
            mem_access: HookList::default(),
            translate: HookList::default(),
            any_pre: false,
            any_post: false,
            any_block_start: false,
            any_block_end: false,
            any_mem_access: false,
            any_translate: false,
        }
    }

    /// Registers a pre-execute callback for each opcode in `ops`.
    pub fn register_pre_execute(&mut self, owner: OwnerId, ops: &[Opcode], callback: HookFn) {
        for op in ops {
            push(&mut self.pre[op.index()], owner, Rc::clone(&callback));
        }
        self.any_pre |= !ops.is_empty();
    }

    /// Registers a post-execute callback for each opcode in `ops`.
    pub fn register_post_execute(&mut self, owner: OwnerId, ops: &[Opcode], callback: HookFn) {
        for op in ops {
            push(&mut self.post[op.index()], owner, Rc::clone(&callback));
        }
        self.any_post |= !ops.is_empty();
    }

    /// Registers a block-start callback.
    pub fn register_block_start(&mut self, owner: OwnerId, callback: HookFn) {
        push(&mut self.block_start, owner, callback);
        self.any_block_start = true;
    }

    /// Registers a block-end callback.
    pub fn register_block_end(&mut self, owner: OwnerId, callback: HookFn) {
        push(&mut self.block_end, owner, callback);
        self.any_block_end = true;
    }

    /// Registers a memory-access callback.
    pub fn register_memory_access(&mut self, owner: OwnerId, callback: HookFn) {
        push(&mut self.mem_access, owner, callback);
        self.any_mem_access = true;
    }

    /// Registers a translation callback.
    pub fn register_translate(&mut self, owner: OwnerId, callback: HookFn) {
        push(&mut self.translate, owner, callback);
        self.any_translate = true;
    }

    /// Pre-execute callbacks for `op`, if any.
    #[inline(always)]
    pub fn pre(&self, op: Opcode) -> Option<HookList> {
        if !self.any_pre {
            return None;
        }
        let list = &self.pre[op.index()];
        (!list.is_empty()).then(|| Rc::clone(list))
    }

    /// Post-execute callbacks for `op`, if any.
    #[inline(always)]
    pub fn post(&self, op: Opcode) -> Option<HookList> {
        if !self.any_post {
            return None;
        }
        let list = &self.post[op.index()];
        (!list.is_empty()).then(|| Rc::clone(list))
    }

    /// Block-start callbacks, if any.
    #[inline(always)]
    pub fn block_start(&self) -> Option<HookList> {
        self.any_block_start.then(|| Rc::clone(&self.block_start))
    }

    /// Block-end callbacks, if any.
    #[inline(always)]
    pub fn block_end(&self) -> Option<HookList> {
        self.any_block_end.then(|| Rc::clone(&self.block_end))
    }

    /// Memory-access callbacks, if any.
    #[inline(always)]
    pub fn mem_access(&self) -> Option<HookList> {
        self.any_mem_access.then(|| Rc::clone(&self.mem_access))
    }

    /// Translation callbacks, if any.
    #[inline(always)]
    pub fn translate(&self) -> Option<HookList> {
        self.any_translate.then(|| Rc::clone(&self.translate))
    }

    /// Returns `true` if any memory or translation observer is registered;
    /// native code must then route every access through the translator.
    pub const fn observes_memory(&self) -> bool {
        self.any_mem_access || self.any_translate
    }
}
