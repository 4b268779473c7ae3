//! Main Execution Loop.
//!
//! One `step` dispatches on the block cache:
//! 1. **Compiled Hit:** Run the native unit. A function unit counts its own
//!    instructions; a leaf unit is credited with its length.
//! 2. **Threaded Hit:** Replay the block through its stored handlers, following
//!    fall-through and looping back on a jump to the block's own entry.
//! 3. **Promotion:** The lookup that brings a straight-line block to exactly
//!    `jit_bound` hits compiles it in place.
//! 4. **Miss:** With the JIT on, try to discover and compile the function at `pc`.
//!    Otherwise interpret one instruction at a time while collecting a new block,
//!    until a halt, a control transfer, or the length limit, then install it.

use std::rc::Rc;

use super::Hart;
use crate::common::{EngineError, INSTRUCTION_SIZE};
use crate::core::hooks::{BlockHookInfo, HookEvent};
use crate::core::jit::UnitKind;
use crate::core::units::cache::Block;
use crate::isa::{decode, execute};

impl Hart {
    /// Executes one dispatch of the step machine.
    ///
    /// # Returns
    ///
    /// The number of instructions retired by this step; zero once halted.
    ///
    /// # Errors
    ///
    /// Any fault raised while interpreting, and compilation failures during
    /// promotion. None of them is recoverable.
    pub fn step(&mut self) -> Result<u64, EngineError> {
        if self.state.halted {
            return Ok(0);
        }
        let pc = self.state.pc;

        if let Some(block) = self.lookup(pc)? {
            return self.execute_block(&block);
        }

        if self.compiler.is_some()
            && let Some(block) = self.build_function_block(pc)?
            && self.install_and_jit(block)?
            && let Some(block) = self.lookup(pc)?
        {
            return self.execute_block(&block);
        }

        self.collect()
    }

    /// Runs until halted or until at least `max_instrs` instructions have retired.
    ///
    /// # Arguments
    ///
    /// * `max_instrs` - Instruction budget; 0 means unbounded. A step is never
    ///   split, so the budget may be overshot by one block.
    ///
    /// # Returns
    ///
    /// Instructions retired by this call.
    ///
    /// # Errors
    ///
    /// The first fault, as returned by [`Hart::step`].
    pub fn run(&mut self, max_instrs: u64) -> Result<u64, EngineError> {
        let mut executed = 0u64;
        while !self.state.halted && (max_instrs == 0 || executed < max_instrs) {
            executed += self.step()?;
        }
        Ok(executed)
    }

    /// Looks `pc` up in the block cache and applies the promotion policy.
    pub(crate) fn lookup(&mut self, pc: u64) -> Result<Option<Rc<Block>>, EngineError> {
        self.sync_observers();
        let Some(block) = self.cache.lookup(pc) else {
            return Ok(None);
        };
        if let Some(compiler) = &self.compiler
            && block.hits() == self.jit_bound
            && !block.is_compiled()
            && block.is_straight_line()
        {
            let unit = compiler.compile(&block, !self.hooks.observes_memory())?;
            block.attach(unit);
            tracing::debug!(
                pc = format_args!("{pc:#x}"),
                len = block.len(),
                "promoted block"
            );
        }
        Ok(Some(block))
    }

    fn execute_block(&mut self, block: &Rc<Block>) -> Result<u64, EngineError> {
        if block.is_compiled() {
            tracing::trace!(pc = format_args!("{:#x}", block.start_pc), "compiled hit");
            Ok(self.execute_compiled(block))
        } else {
            tracing::trace!(pc = format_args!("{:#x}", block.start_pc), "threaded hit");
            self.execute_threaded(block)
        }
    }

    fn block_event(&mut self, start_pc: u64, start: bool) {
        let list = if start {
            self.hooks.block_start()
        } else {
            self.hooks.block_end()
        };
        if let Some(list) = list {
            let info = BlockHookInfo { pc: start_pc };
            let event = if start {
                HookEvent::BlockStart(info)
            } else {
                HookEvent::BlockEnd(info)
            };
            self.fire(&list, &event);
        }
    }

    /// Runs a block's native code.
    pub(crate) fn execute_compiled(&mut self, block: &Rc<Block>) -> u64 {
        let Some(unit) = block.compiled() else {
            return 0;
        };
        self.block_event(block.start_pc, true);

        let before = self.state.instr_counter;
        let hart: *mut Self = self;
        // SAFETY: the unit was compiled against this hart's boxed state and guest
        // memory, both of which outlive it; `self` is not used until it returns.
        // `block` keeps the unit alive even if the call evicts it from the cache.
        unsafe { unit.invoke(hart) };

        let executed = match unit.kind() {
            UnitKind::Function => self.state.instr_counter.wrapping_sub(before),
            UnitKind::Leaf => {
                let len = block.len() as u64;
                self.state.instr_counter += len;
                len
            }
        };

        self.block_event(block.start_pc, false);
        executed
    }

    /// Replays a block through its stored handlers.
    fn execute_threaded(&mut self, block: &Block) -> Result<u64, EngineError> {
        let start = block.start_pc;
        let mut executed = 0u64;
        let mut idx = 0usize;

        self.block_event(start, true);

        while let (Some(&handler), Some(instr)) = (block.exec_fns.get(idx), block.instrs.get(idx)) {
            let pc = self.state.pc;
            let expected = pc.wrapping_add(INSTRUCTION_SIZE);
            self.state.next_pc = expected;

            if let Err(err) = self.dispatch(handler, instr) {
                self.state.instr_counter += executed;
                return Err(err);
            }
            executed += 1;

            let next = self.state.next_pc;
            self.state.pc = next;

            if self.state.halted {
                break;
            }
            if next == expected {
                idx += 1;
            } else if next == start {
                idx = 0;
                continue;
            } else {
                break;
            }

            if idx >= block.len() {
                self.block_event(start, false);
                break;
            }
        }

        self.state.instr_counter += executed;
        Ok(executed)
    }

    /// Interprets from `pc`, collecting a new block.
    fn collect(&mut self) -> Result<u64, EngineError> {
        let start = self.state.pc;
        let mut instrs = Vec::new();
        let mut exec_fns = Vec::new();
        let mut collected = 0u64;

        while instrs.len() < self.max_block_len {
            let pc = self.state.pc;
            let expected = pc.wrapping_add(INSTRUCTION_SIZE);
            let fetched = self.fetch(pc).map(decode);
            self.state.next_pc = expected;

            let result = fetched.and_then(|instr| execute(&instr, self).map(|h| (instr, h)));
            let (instr, handler) = match result {
                Ok(pair) => pair,
                Err(err) => {
                    self.state.instr_counter += collected;
                    return Err(err);
                }
            };
            collected += 1;

            let next = self.state.next_pc;
            self.state.pc = next;

            // The halting or redirecting instruction ends the block without
            // joining it.
            if self.state.halted || next != expected {
                break;
            }
            instrs.push(instr);
            exec_fns.push(handler);
        }

        self.state.instr_counter += collected;
        tracing::trace!(
            pc = format_args!("{start:#x}"),
            len = instrs.len(),
            collected,
            "collected block"
        );
        if self.cache.install(Block::basic(start, instrs, exec_fns)).is_none() {
            tracing::trace!(pc = format_args!("{start:#x}"), "nothing to install");
        }
        Ok(collected)
    }
}
