//! Fault reporting.
//!
//! The engine has no trap vector: every `EngineError` ends the run. Interpreted
//! paths return the error to the caller of `step`/`run`, which reports it with
//! [`report`]. Native code cannot unwind through its own frames, so trampolines
//! call [`fatal`], which reports and aborts the process.

use super::Hart;
use crate::common::EngineError;

/// Logs `err` with the hart's pc and a register dump.
pub fn report(hart: &Hart, err: &EngineError) {
    tracing::error!(
        pc = format_args!("{:#x}", hart.pc()),
        instret = hart.instr_counter(),
        cause = %err,
        "fatal engine error"
    );
    eprintln!("Exception: {err}");
    eprintln!("PC: {:#x}", hart.pc());
    eprint!("{}", hart.dump_regs());
}

/// Reports `err` and aborts the process.
pub fn fatal(hart: &Hart, err: &EngineError) -> ! {
    report(hart, err);
    std::process::abort()
}
