//! Machine driver.
//!
//! This module ties configuration to a running hart. It performs:
//! 1. **Setup:** Builds guest memory and the hart, and seeds `sp` from `general.stack_top`.
//! 2. **Image Placement:** Loads ELF executables, or copies raw segments into guest
//!    memory and clears `.bss`-style ranges.
//! 3. **Run:** Optionally compiles the entry function and its callees up front,
//!    then steps until halted or `general.max_steps` instructions have retired.

use std::path::Path;

use super::loader::{self, LoadedImage};
use crate::common::EngineError;
use crate::config::Config;
use crate::core::Hart;
use crate::core::hart::trap;
use crate::isa::abi;

/// A configured hart ready to run.
#[derive(Debug)]
pub struct Machine {
    config: Config,
    hart: Hart,
}

impl Machine {
    /// Creates a machine.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if `config` fails validation, and
    /// `MemoryAllocation` if guest memory cannot be mapped.
    pub fn new(config: Config) -> Result<Self, EngineError> {
        config.validate()?;
        let mut hart = Hart::new(&config)?;
        if let Some(sp) = config.general.stack_top {
            hart.set_reg(abi::REG_SP, sp)?;
        }
        Ok(Self { config, hart })
    }

    /// The configuration the machine was built from.
    pub const fn config(&self) -> &Config {
        &self.config
    }

    /// The hart.
    pub const fn hart(&self) -> &Hart {
        &self.hart
    }

    /// The hart, for setting registers or registering hooks.
    pub const fn hart_mut(&mut self) -> &mut Hart {
        &mut self.hart
    }

    /// Copies `bytes` into guest memory at physical address `addr`.
    ///
    /// # Errors
    ///
    /// Returns `AccessFault` if the range is outside guest memory.
    pub fn load_data(&mut self, addr: u64, bytes: &[u8]) -> Result<(), EngineError> {
        self.hart.memory_mut().load_data(addr, bytes)
    }

    /// Loads an ELF executable and points the hart at its entry.
    ///
    /// Cached blocks are dropped and the halt flag is cleared. When no
    /// executable ranges were configured, the image's `PF_X` segments become
    /// the ranges.
    ///
    /// # Errors
    ///
    /// Returns `InvalidImage` if `image` is not a 64-bit RISC-V ELF, and
    /// `AccessFault` if a segment does not fit in guest memory.
    pub fn load_elf(&mut self, image: &[u8]) -> Result<LoadedImage, EngineError> {
        let loaded = loader::load_elf(self.hart.memory_mut(), image)?;
        self.hart.invalidate_blocks();
        self.hart.set_pc(loaded.entry);
        self.hart.set_halt(false);
        if self.hart.exec_ranges().is_empty() {
            self.hart.set_exec_ranges(loaded.exec_ranges());
        }
        tracing::info!(
            entry = format_args!("{:#x}", loaded.entry),
            segments = loaded.segments.len(),
            "loaded ELF image"
        );
        Ok(loaded)
    }

    /// Reads an ELF executable from `path` and loads it like [`Machine::load_elf`].
    ///
    /// # Errors
    ///
    /// Returns `InvalidImage` if the file cannot be read or parsed, and
    /// `AccessFault` if a segment does not fit in guest memory.
    pub fn load_elf_file(&mut self, path: impl AsRef<Path>) -> Result<LoadedImage, EngineError> {
        let image = loader::load_binary(path.as_ref())?;
        self.load_elf(&image)
    }

    /// Clears `len` bytes of guest memory at physical address `addr`.
    ///
    /// # Errors
    ///
    /// Returns `AccessFault` if the range is outside guest memory.
    pub fn zero_init(&mut self, addr: u64, len: usize) -> Result<(), EngineError> {
        self.hart.memory_mut().zero_init(addr, len)
    }

    /// Runs until the hart halts or the instruction budget is spent.
    ///
    /// # Returns
    ///
    /// Instructions retired.
    ///
    /// # Errors
    ///
    /// The fault that stopped the run, after it has been reported.
    pub fn run(&mut self) -> Result<u64, EngineError> {
        let result = self.try_run();
        if let Err(err) = &result {
            trap::report(&self.hart, err);
        }
        result
    }

    fn try_run(&mut self) -> Result<u64, EngineError> {
        if self.hart.jit_enabled() && !self.hart.exec_ranges().is_empty() {
            let eager = self.hart.predecode_and_jit_if_small()?;
            tracing::debug!(
                entry = format_args!("{:#x}", self.hart.pc()),
                eager,
                "eager compilation"
            );
        }
        let executed = self.hart.run(self.config.general.max_steps)?;
        tracing::info!(
            executed,
            a0 = self.hart.get_reg(abi::REG_A0)?,
            halted = self.hart.is_halted(),
            "run finished"
        );
        Ok(executed)
    }

    /// Formats the hart's registers.
    pub fn dump_regs(&self) -> String {
        self.hart.dump_regs()
    }
}
