//! Hart Definition and Initialization.
//!
//! This module defines the `Hart`, the single hardware thread the engine runs. It
//! coordinates the following:
//! 1. **State Management:** Owns the fixed-address architectural state, the halt
//!    flag and the instruction counter.
//! 2. **Execution:** The step machine over the block cache, threaded replay and
//!    promotion to native code (`execution`).
//! 3. **Memory Path:** Fetch, load and store through the MMU and its observers (`memory`).
//! 4. **Function Discovery:** Control-flow exploration and eager/lazy function
//!    compilation (`discovery`).
//! 5. **Faults:** Diagnostics and process termination for errors native code
//!    cannot propagate (`trap`).

/// Function discovery and function-level compilation.
pub mod discovery;

/// Step machine.
pub mod execution;

/// Translated memory access.
pub mod memory;

/// Fatal fault reporting.
pub mod trap;

use crate::common::EngineError;
use crate::config::{Config, ExecRange};
use crate::core::arch::ArchState;
use crate::core::arch::csr::{Satp, check_csr};
use crate::core::hooks::{HookEvent, HookList, Hooks, PostExecInfo};
use crate::core::jit::{self, Compiler};
use crate::core::units::cache::BlockCache;
use crate::core::units::mmu::Mmu;
use crate::isa::{ExecFn, Instruction};
use crate::soc::GuestMemory;

/// A RISC-V hart: architectural state plus the caches and compiler that run it.
#[derive(Debug)]
pub struct Hart {
    /// Boxed so compiled code can address it at a fixed location.
    state: Box<ArchState>,
    memory: GuestMemory,
    mmu: Mmu,
    cache: BlockCache,
    compiler: Option<Compiler>,
    jit_bound: u64,
    max_block_len: usize,
    exec_ranges: Vec<ExecRange>,
    hooks: Hooks,
    /// Whether existing native code was compiled with memory observers present.
    observed_memory: bool,
}

impl Hart {
    /// Creates a hart over fresh guest memory.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if `config` fails [`Config::validate`], and
    /// `MemoryAllocation` if guest memory cannot be mapped.
    pub fn new(config: &Config) -> Result<Self, EngineError> {
        config.validate()?;
        let memory = GuestMemory::new(config.memory.size)?;
        Self::with_memory(config, memory)
    }

    /// Creates a hart over an existing guest memory.
    ///
    /// # Arguments
    ///
    /// * `config` - Initial pc and register value, TLB and cache geometry, JIT settings.
    /// * `memory` - Guest physical memory, typically already loaded with an image.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if `config` fails [`Config::validate`].
    pub fn with_memory(config: &Config, memory: GuestMemory) -> Result<Self, EngineError> {
        config.validate()?;
        let mut state = Box::new(ArchState::default());
        state.pc = config.general.initial_pc;
        state.next_pc = config.general.initial_pc;
        state.gpr.fill(config.general.initial_reg_val);

        let compiler = match (config.jit.use_jit, jit::AVAILABLE) {
            (true, true) => Some(Compiler::new(
                std::ptr::from_mut(state.as_mut()),
                memory.as_mut_ptr(),
                memory.len(),
            )),
            (true, false) => {
                tracing::warn!("native code is unavailable on this host; using threaded code");
                None
            }
            (false, _) => None,
        };

        Ok(Self {
            state,
            memory,
            mmu: Mmu::new(config.memory.tlb_size)?,
            cache: BlockCache::new(config.cache.bb_cache_size)?,
            compiler,
            jit_bound: config.jit.jit_bound,
            max_block_len: config.cache.cached_bb_size,
            exec_ranges: config.exec_ranges.clone(),
            hooks: Hooks::new(),
            observed_memory: false,
        })
    }

    /// Program counter.
    #[inline(always)]
    pub fn pc(&self) -> u64 {
        self.state.pc
    }

    /// Sets the program counter.
    #[inline(always)]
    pub fn set_pc(&mut self, pc: u64) {
        self.state.pc = pc;
    }

    /// Staged successor of the current instruction.
    #[inline(always)]
    pub fn next_pc(&self) -> u64 {
        self.state.next_pc
    }

    /// Redirects the staged successor (taken branches and jumps).
    #[inline(always)]
    pub fn set_next_pc(&mut self, pc: u64) {
        self.state.next_pc = pc;
    }

    /// Reads a general-purpose register.
    ///
    /// # Errors
    ///
    /// Returns `InvalidRegisterIndex` for `idx >= 32`.
    #[inline(always)]
    pub fn get_reg(&self, idx: usize) -> Result<u64, EngineError> {
        self.state.gpr.read(idx)
    }

    /// Writes a general-purpose register; writes to `x0` are dropped.
    ///
    /// # Errors
    ///
    /// Returns `InvalidRegisterIndex` for `idx >= 32`.
    #[inline(always)]
    pub fn set_reg(&mut self, idx: usize, val: u64) -> Result<(), EngineError> {
        self.state.gpr.write(idx, val)
    }

    /// Reads a CSR. Only `satp` exists.
    ///
    /// # Errors
    ///
    /// Returns `UnsupportedControlRegister` for any other number.
    pub fn get_csr(&self, csr: u16) -> Result<u64, EngineError> {
        check_csr(csr)?;
        Ok(self.state.satp)
    }

    /// Writes a CSR. Only `satp` exists.
    ///
    /// The TLBs and the block cache are left as they are; a guest that remaps
    /// must be paired with [`Hart::flush_tlbs`].
    ///
    /// # Errors
    ///
    /// Returns `UnsupportedControlRegister` for any other number.
    pub fn set_csr(&mut self, csr: u16, val: u64) -> Result<(), EngineError> {
        check_csr(csr)?;
        self.state.satp = val;
        Ok(())
    }

    /// Typed view of `satp`.
    pub fn satp(&self) -> Satp {
        Satp(self.state.satp)
    }

    /// Invalidates every TLB entry.
    pub fn flush_tlbs(&mut self) {
        self.mmu.flush();
    }

    /// ECALL and EBREAK: stop at the next instruction boundary.
    pub fn do_ecall(&mut self) {
        self.set_halt(true);
    }

    /// Returns `true` once the hart has stopped.
    #[inline(always)]
    pub fn is_halted(&self) -> bool {
        self.state.halted
    }

    /// Sets or clears the halt flag.
    pub fn set_halt(&mut self, halted: bool) {
        self.state.halted = halted;
    }

    /// Instructions retired so far.
    #[inline(always)]
    pub fn instr_counter(&self) -> u64 {
        self.state.instr_counter
    }

    /// Guest memory.
    pub const fn memory(&self) -> &GuestMemory {
        &self.memory
    }

    /// Guest memory, for loading images.
    ///
    /// Cached and compiled blocks are not invalidated by writes made here.
    pub const fn memory_mut(&mut self) -> &mut GuestMemory {
        &mut self.memory
    }

    /// The translator.
    pub const fn mmu(&self) -> &Mmu {
        &self.mmu
    }

    /// The block cache.
    pub const fn cache(&self) -> &BlockCache {
        &self.cache
    }

    /// Drops every cached block and its native code.
    pub fn invalidate_blocks(&mut self) {
        self.cache.invalidate_all();
    }

    /// Returns `true` if native compilation is active.
    pub const fn jit_enabled(&self) -> bool {
        self.compiler.is_some()
    }

    /// Instrumentation registry.
    ///
    /// Native code compiled before the first memory or translation observer
    /// bypasses them; the next block lookup or compilation drops every cached
    /// block so that code is rebuilt through the observed path.
    pub const fn hooks_mut(&mut self) -> &mut Hooks {
        &mut self.hooks
    }

    /// Drops cached blocks once memory or translation observers first appear.
    pub(crate) fn sync_observers(&mut self) {
        let observed = self.hooks.observes_memory();
        if observed != self.observed_memory {
            self.observed_memory = observed;
            self.invalidate_blocks();
            tracing::debug!(observed, "memory observers changed; blocks invalidated");
        }
    }

    /// Runs `handler` for `instr`, surrounded by any pre/post-execute callbacks
    /// registered for its opcode.
    ///
    /// # Errors
    ///
    /// Propagates the handler's error; post callbacks do not run in that case.
    #[inline(always)]
    pub fn dispatch(&mut self, handler: ExecFn, instr: &Instruction) -> Result<(), EngineError> {
        let pre = self.hooks.pre(instr.opcode);
        let post = self.hooks.post(instr.opcode);
        if pre.is_none() && post.is_none() {
            return handler(instr, self);
        }

        if let Some(list) = pre {
            self.fire(&list, &HookEvent::PreExec(instr));
        }
        let rs1 = self.operand(instr.rs1);
        let rs2 = self.operand(instr.rs2);
        handler(instr, self)?;
        if let Some(list) = post {
            let info = PostExecInfo {
                rs1,
                rs2,
                rd: self.operand(instr.rd),
                imm: instr.imm,
            };
            self.fire(&list, &HookEvent::PostExec(instr, info));
        }
        Ok(())
    }

    fn operand(&self, slot: Option<u8>) -> Option<(u8, u64)> {
        let reg = slot?;
        self.get_reg(usize::from(reg)).ok().map(|v| (reg, v))
    }

    /// Invokes every callback in `list`, in registration order.
    pub(crate) fn fire(&mut self, list: &HookList, event: &HookEvent<'_>) {
        for record in list.iter() {
            (record.callback)(self, event, record.owner);
        }
    }

    /// Executable ranges consulted by function discovery.
    pub fn exec_ranges(&self) -> &[ExecRange] {
        &self.exec_ranges
    }

    /// Replaces the executable ranges.
    pub fn set_exec_ranges(&mut self, ranges: Vec<ExecRange>) {
        self.exec_ranges = ranges;
    }

    /// Returns `true` if `pc` lies inside an executable range.
    pub fn is_exec_pc(&self, pc: u64) -> bool {
        self.exec_ranges.iter().any(|r| r.contains(pc))
    }

    /// Formats the program counter, counters, `satp` and the register file.
    pub fn dump_regs(&self) -> String {
        format!(
            "pc={:#018x} instret={} satp={:#018x} {}{}\n{}",
            self.state.pc,
            self.state.instr_counter,
            self.state.satp,
            self.state.privilege,
            if self.state.halted { " halted" } else { "" },
            self.state.gpr.dump()
        )
    }

    /// Copy of `x0`..`x31`.
    pub fn regs(&self) -> [u64; 32] {
        self.state.gpr.snapshot()
    }
}
