//! Host functions called from native code.
//!
//! Every trampoline has a plain `extern "C"` signature whose first argument is
//! the `*mut Hart` the unit was invoked with. Their addresses are resolved once,
//! when the compiler is built, and baked into the code as immediates.
//!
//! Native code cannot unwind, so a trampoline that hits an engine error reports
//! it and aborts the process (see [`crate::core::hart::trap::fatal`]).

use crate::core::Hart;
use crate::core::hart::trap;
use crate::isa::decode;
use crate::isa::execute::{extend, handler_for};

/// Addresses of the trampolines.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Trampolines {
    /// [`jit_load`].
    pub load: u64,
    /// [`jit_store`].
    pub store: u64,
    /// [`jit_system`].
    pub system: u64,
    /// [`jit_call`].
    pub call: u64,
}

impl Trampolines {
    /// Resolves the trampoline addresses.
    pub fn resolve() -> Self {
        Self {
            load: jit_load as usize as u64,
            store: jit_store as usize as u64,
            system: jit_system as usize as u64,
            call: jit_call as usize as u64,
        }
    }
}

/// Borrows the hart behind a native-code argument.
///
/// # Safety
///
/// `hart` must be the pointer the running unit was invoked with; the invoking
/// frame does not touch the hart until the unit returns.
#[inline(always)]
unsafe fn hart_mut<'a>(hart: *mut Hart) -> &'a mut Hart {
    // SAFETY: guaranteed by the caller.
    unsafe { &mut *hart }
}

/// Translated load of `width` bytes, extended to 64 bits.
pub extern "C" fn jit_load(hart: *mut Hart, addr: u64, width: u64, signed: u64) -> u64 {
    // SAFETY: called only from native code with its invocation pointer.
    let hart = unsafe { hart_mut(hart) };
    let width = width as usize;
    match hart.load(addr, width) {
        Ok(raw) => extend(raw, width, signed != 0),
        Err(err) => trap::fatal(hart, &err),
    }
}

/// Translated store of the low `width` bytes of `value`.
pub extern "C" fn jit_store(hart: *mut Hart, addr: u64, value: u64, width: u64) -> u64 {
    // SAFETY: called only from native code with its invocation pointer.
    let hart = unsafe { hart_mut(hart) };
    if let Err(err) = hart.store(addr, value, width as usize) {
        trap::fatal(hart, &err);
    }
    0
}

/// Runs the interpreter handler of a SYSTEM instruction (CSR access, ECALL, EBREAK).
///
/// The word is decoded again here; these instructions are rare enough that
/// carrying a pointer to the decoded form is not worth its lifetime bookkeeping.
pub extern "C" fn jit_system(hart: *mut Hart, raw: u64) -> u64 {
    // SAFETY: called only from native code with its invocation pointer.
    let hart = unsafe { hart_mut(hart) };
    let instr = decode(raw as u32);
    if let Err(err) = handler_for(instr.opcode)(&instr, hart) {
        trap::fatal(hart, &err);
    }
    0
}

/// Executes a call from function-compiled code.
///
/// Compiles the callee on first use and runs it natively; a callee outside the
/// executable ranges is interpreted until control reaches `ret`.
///
/// # Returns
///
/// 1 if control came back to `ret` and the hart is still running, so the caller
/// may continue at its return label; 0 if the caller must exit to the engine.
pub extern "C" fn jit_call(hart: *mut Hart, target: u64, ret: u64) -> u64 {
    // SAFETY: called only from native code with its invocation pointer.
    let hart = unsafe { hart_mut(hart) };
    hart.set_pc(target);
    let result = match hart.ensure_jit_function(target) {
        Ok(true) => hart.execute_jitted_function(target).map(|_| ()),
        Ok(false) => hart.run_until_pc(ret),
        Err(err) => Err(err),
    };
    if let Err(err) = result {
        trap::fatal(hart, &err);
    }
    u64::from(hart.pc() == ret && !hart.is_halted())
}
