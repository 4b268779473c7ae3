//! Native compiler.
//!
//! Turns cached blocks into host machine code. It provides:
//! 1. **Backends:** One [`emit::Assembler`] per host architecture (`x86_64`, `aarch64`).
//!    Both are always built; [`HostAssembler`] selects the one for this host.
//! 2. **Lowering:** A shared, backend-independent pass (`lower`) for leaf and
//!    function units.
//! 3. **Executable Memory:** W^X code buffers (`buffer`).
//! 4. **Trampolines:** `extern "C"` entry points native code calls for translated
//!    memory access, system instructions and calls (`trampolines`).
//!
//! Compiled code addresses the hart's `ArchState` and the guest memory base at
//! addresses baked in at compile time. Neither may move while a unit referencing
//! them is alive.

/// AArch64 backend.
pub mod aarch64;

/// Executable code buffers.
pub mod buffer;

/// Backend interface.
pub mod emit;

/// Block lowering.
pub mod lower;

/// Host entry points called from native code.
pub mod trampolines;

/// x86-64 backend.
pub mod x86_64;

use crate::common::EngineError;
use crate::core::Hart;
use crate::core::arch::ArchState;
use crate::core::units::cache::Block;

use self::buffer::ExecutableMemory;
use self::emit::Assembler;
use self::lower::{LowerCtx, lower_block};
use self::trampolines::Trampolines;

/// Whether native code can be generated and run on this host.
pub const AVAILABLE: bool = cfg!(all(
    any(target_os = "linux", target_os = "android"),
    any(target_arch = "x86_64", target_arch = "aarch64"),
    not(feature = "no-jit")
));

/// Backend for the host architecture.
#[cfg(target_arch = "aarch64")]
pub type HostAssembler = aarch64::A64Assembler;

/// Backend for the host architecture.
#[cfg(not(target_arch = "aarch64"))]
pub type HostAssembler = x86_64::X64Assembler;

/// Signature of a compiled unit.
pub type EntryFn = unsafe extern "C" fn(*mut Hart);

/// Shape of a compiled unit.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UnitKind {
    /// One straight-line block; the engine credits the instruction counter.
    Leaf,
    /// A linked subgraph that counts its own instructions.
    Function,
}

/// An executable compiled unit.
#[derive(Debug)]
pub struct CompiledUnit {
    code: ExecutableMemory,
    entry: EntryFn,
    kind: UnitKind,
}

impl CompiledUnit {
    /// Leaf or function.
    pub const fn kind(&self) -> UnitKind {
        self.kind
    }

    /// Size of the native code in bytes.
    pub const fn code_size(&self) -> usize {
        self.code.len()
    }

    /// Runs the unit.
    ///
    /// # Safety
    ///
    /// `hart` must point to the hart whose state and guest memory the unit was
    /// compiled against, and no reference to that hart may be in use for the
    /// duration of the call.
    pub unsafe fn invoke(&self, hart: *mut Hart) {
        // SAFETY: guaranteed by the caller; `entry` points into `self.code`,
        // which lives as long as `self`.
        unsafe { (self.entry)(hart) }
    }
}

/// Compiles blocks against one hart's state and memory.
#[derive(Debug)]
pub struct Compiler {
    state: u64,
    mem_base: u64,
    mem_size: u64,
    tramps: Trampolines,
}

impl Compiler {
    /// Creates a compiler for a hart.
    ///
    /// # Arguments
    ///
    /// * `state` - Stable address of the hart's architectural state.
    /// * `mem_base` - Host address of guest physical address 0.
    /// * `mem_size` - Guest memory size in bytes.
    pub fn new(state: *mut ArchState, mem_base: *mut u8, mem_size: usize) -> Self {
        Self {
            state: state as u64,
            mem_base: mem_base as u64,
            mem_size: mem_size as u64,
            tramps: Trampolines::resolve(),
        }
    }

    fn ctx(&self, direct_memory: bool) -> LowerCtx {
        LowerCtx {
            state: self.state,
            mem_base: self.mem_base,
            mem_size: self.mem_size,
            direct_memory,
            tramps: self.tramps,
        }
    }

    /// Lowers `block` with the given backend and returns the raw code.
    ///
    /// # Errors
    ///
    /// Returns `UnknownInstruction` for a member without a native translation
    /// and `CodeBuffer` for an out-of-range branch.
    pub fn assemble<A: Assembler>(
        &self,
        mut asm: A,
        block: &Block,
        direct_memory: bool,
    ) -> Result<Vec<u8>, EngineError> {
        lower_block(&mut asm, &self.ctx(direct_memory), block)?;
        asm.finish()
    }

    /// Compiles `block` for the host.
    ///
    /// # Arguments
    ///
    /// * `block` - A straight-line block, or a function unit.
    /// * `direct_memory` - Allow loads and stores to bypass the translator when
    ///   `satp` is bare at run time.
    ///
    /// # Errors
    ///
    /// Returns `CodeBuffer` when native code is unavailable on this host or
    /// cannot be mapped, and any lowering error.
    pub fn compile(&self, block: &Block, direct_memory: bool) -> Result<CompiledUnit, EngineError> {
        if !AVAILABLE {
            return Err(EngineError::CodeBuffer(
                "native code generation is not available on this host".into(),
            ));
        }
        let bytes = self.assemble(HostAssembler::new(), block, direct_memory)?;
        let code = ExecutableMemory::from_code(&bytes)?;
        // SAFETY: the buffer holds a complete function with the `EntryFn` ABI,
        // emitted by the host backend.
        let entry = unsafe { std::mem::transmute::<*const u8, EntryFn>(code.as_ptr()) };
        let kind = if block.is_function_block {
            UnitKind::Function
        } else {
            UnitKind::Leaf
        };
        tracing::debug!(
            entry = format_args!("{:#x}", block.start_pc),
            len = block.len(),
            bytes = bytes.len(),
            ?kind,
            "compiled unit"
        );
        Ok(CompiledUnit { code, entry, kind })
    }
}
