//! Function discovery and function-level compilation.
//!
//! Discovery explores the control-flow graph reachable from an entry address,
//! restricted to the executable ranges:
//! 1. **Fall-through:** Ordinary instructions continue at `pc + 4`.
//! 2. **Branches:** Both arms are followed.
//! 3. **Jumps:** `jal x0` follows its target. A call (`jal` with a link register)
//!    records its target as a callee and continues at the return address.
//! 4. **Exits:** `ecall`, `ebreak`, the canonical return and any other `jalr x0` end a path;
//!    `jalr` with a link register continues at the return address.
//!
//! Members are laid out entry first, then the remaining addresses in ascending
//! order with those above the entry before those below it.

use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};

use super::Hart;
use crate::common::{EngineError, INSTRUCTION_SIZE};
use crate::core::units::cache::Block;
use crate::isa::{Format, Instruction, Opcode, decode};

/// A discovered function and the callees it names.
#[derive(Debug)]
pub struct Discovered {
    /// Function unit, not yet compiled.
    pub block: Block,
    /// Executable targets of direct calls, in discovery order.
    pub callees: Vec<u64>,
}

impl Hart {
    /// Explores the function at `entry`.
    ///
    /// # Returns
    ///
    /// `None` if `entry` is outside every executable range.
    ///
    /// # Errors
    ///
    /// Fetch faults on member addresses.
    pub fn discover_function(&mut self, entry: u64) -> Result<Option<Discovered>, EngineError> {
        if !self.is_exec_pc(entry) {
            return Ok(None);
        }

        let mut members: HashMap<u64, Instruction> = HashMap::new();
        let mut callees = Vec::new();
        let mut worklist = vec![entry];

        while let Some(pc) = worklist.pop() {
            if !self.is_exec_pc(pc) {
                continue;
            }
            let instr = match members.entry(pc) {
                Entry::Occupied(_) => continue,
                Entry::Vacant(slot) => *slot.insert(decode(self.fetch(pc)?)),
            };
            let next = pc.wrapping_add(INSTRUCTION_SIZE);

            match instr.opcode {
                Opcode::Ecall | Opcode::Ebreak => {}
                Opcode::Jal => {
                    let target = pc.wrapping_add(instr.imm as u64);
                    if instr.is_call() {
                        if self.is_exec_pc(target) {
                            callees.push(target);
                        }
                        worklist.push(next);
                    } else if self.is_exec_pc(target) {
                        worklist.push(target);
                    }
                }
                Opcode::Jalr => {
                    if !instr.is_return() && instr.is_call() {
                        worklist.push(next);
                    }
                }
                _ if instr.format() == Format::B => {
                    let target = pc.wrapping_add(instr.imm as u64);
                    if self.is_exec_pc(target) {
                        worklist.push(target);
                    }
                    worklist.push(next);
                }
                _ => worklist.push(next),
            }
        }

        let mut pcs: Vec<u64> = members.keys().copied().collect();
        pcs.sort_unstable();
        let split = pcs.partition_point(|&pc| pc <= entry);
        let ordered: Vec<u64> = std::iter::once(entry)
            .chain(pcs[split..].iter().copied())
            .chain(pcs[..split].iter().copied().filter(|&pc| pc != entry))
            .collect();
        let instrs = ordered.iter().map(|pc| members[pc]).collect();

        Ok(Some(Discovered {
            block: Block::function(entry, instrs, ordered),
            callees,
        }))
    }

    /// Builds the function unit rooted at `entry`.
    ///
    /// # Errors
    ///
    /// Fetch faults on member addresses.
    pub fn build_function_block(&mut self, entry: u64) -> Result<Option<Block>, EngineError> {
        Ok(self.discover_function(entry)?.map(|d| d.block))
    }

    /// Compiles `block` and installs it.
    ///
    /// # Returns
    ///
    /// `false` if the block is empty or the JIT is off.
    ///
    /// # Errors
    ///
    /// Compilation failures; the unit is then not installed.
    pub fn install_and_jit(&mut self, block: Block) -> Result<bool, EngineError> {
        if block.is_empty() {
            return Ok(false);
        }
        self.sync_observers();
        let Some(compiler) = &self.compiler else {
            return Ok(false);
        };
        let unit = compiler.compile(&block, !self.hooks.observes_memory())?;
        block.attach(unit);
        tracing::debug!(
            entry = format_args!("{:#x}", block.start_pc),
            len = block.len(),
            function = block.is_function_block,
            "installed compiled unit"
        );
        Ok(self.cache.install(block).is_some())
    }

    /// Compiles the function at the current pc and every function it reaches
    /// through direct calls, if they all fit the cache.
    ///
    /// # Returns
    ///
    /// `true` if everything was compiled and installed. `false` (with nothing
    /// installed) when the JIT is off, no executable ranges are set, or the
    /// functions exceed the cache capacity or `capacity * cached_bb_size`
    /// instructions.
    ///
    /// # Errors
    ///
    /// Fetch faults during discovery and compilation failures.
    pub fn predecode_and_jit_if_small(&mut self) -> Result<bool, EngineError> {
        if self.compiler.is_none() || self.exec_ranges.is_empty() {
            return Ok(false);
        }

        let mut worklist = vec![self.state.pc];
        let mut seen = HashSet::new();
        let mut blocks = Vec::new();
        let mut total_instrs = 0usize;

        while let Some(entry) = worklist.pop() {
            if !self.is_exec_pc(entry) || !seen.insert(entry) {
                continue;
            }
            let Some(found) = self.discover_function(entry)? else {
                continue;
            };
            total_instrs += found.block.len();
            blocks.push(found.block);
            worklist.extend(found.callees.into_iter().filter(|c| !seen.contains(c)));
        }

        let capacity = self.cache.capacity();
        let budget = capacity.saturating_mul(self.max_block_len);
        if capacity == 0 || blocks.len() > capacity || total_instrs > budget {
            tracing::debug!(
                functions = blocks.len(),
                total_instrs,
                capacity,
                "eager compilation skipped"
            );
            return Ok(false);
        }

        tracing::debug!(functions = blocks.len(), total_instrs, "eager compilation");
        for block in blocks {
            let entry = block.start_pc;
            if !self.install_and_jit(block)? {
                tracing::debug!(entry = format_args!("{entry:#x}"), "function not installed");
            }
        }
        Ok(true)
    }

    /// Makes sure a compiled unit exists for `entry`.
    ///
    /// # Returns
    ///
    /// `true` if `entry` has native code afterwards; `false` if the JIT is off
    /// or `entry` is not executable.
    ///
    /// # Errors
    ///
    /// Fetch faults during discovery and compilation failures.
    pub fn ensure_jit_function(&mut self, entry: u64) -> Result<bool, EngineError> {
        if self.compiler.is_none() {
            return Ok(false);
        }
        if self.cache.peek(entry).is_some_and(|b| b.is_compiled()) {
            return Ok(true);
        }
        match self.build_function_block(entry)? {
            Some(block) => self.install_and_jit(block),
            None => Ok(false),
        }
    }

    /// Runs the compiled unit at `entry`, if there is one.
    ///
    /// # Returns
    ///
    /// Instructions retired by the unit.
    ///
    /// # Errors
    ///
    /// Compilation failures if the lookup promotes a block.
    pub fn execute_jitted_function(&mut self, entry: u64) -> Result<u64, EngineError> {
        match self.lookup(entry)? {
            Some(block) if block.is_compiled() => Ok(self.execute_compiled(&block)),
            _ => Ok(0),
        }
    }

    /// Steps until the hart halts or reaches `target`.
    ///
    /// # Errors
    ///
    /// The first fault raised by a step.
    pub fn run_until_pc(&mut self, target: u64) -> Result<(), EngineError> {
        let mut retired = 0u64;
        while !self.state.halted && self.state.pc != target {
            retired += self.step()?;
        }
        tracing::trace!(pc = format_args!("{target:#x}"), retired, "run until pc");
        Ok(())
    }
}
