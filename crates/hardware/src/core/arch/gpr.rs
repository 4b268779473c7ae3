//! General-purpose register file.
//!
//! 1. **Storage:** 32 integer registers (`x0`-`x31`), laid out as a plain array so
//!    native code can address register `n` at byte offset `8 * n`.
//! 2. **Invariant:** `x0` reads as zero and ignores writes.
//! 3. **Debugging:** A formatted dump of the whole file.

use crate::common::EngineError;
use crate::common::constants::GPR_COUNT;
use crate::isa::abi::ABI_NAMES;

/// General-purpose register file.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[repr(transparent)]
pub struct Gpr {
    regs: [u64; GPR_COUNT],
}

impl Gpr {
    /// Creates a register file with every register zero.
    pub const fn new() -> Self {
        Self {
            regs: [0; GPR_COUNT],
        }
    }

    /// Reads register `idx`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidRegisterIndex` for `idx >= 32`.
    #[inline(always)]
    pub fn read(&self, idx: usize) -> Result<u64, EngineError> {
        match self.regs.get(idx) {
            Some(_) if idx == 0 => Ok(0),
            Some(v) => Ok(*v),
            None => Err(EngineError::InvalidRegisterIndex(idx)),
        }
    }

    /// Writes register `idx`; writes to `x0` are dropped.
    ///
    /// # Errors
    ///
    /// Returns `InvalidRegisterIndex` for `idx >= 32`.
    #[inline(always)]
    pub fn write(&mut self, idx: usize, val: u64) -> Result<(), EngineError> {
        match self.regs.get_mut(idx) {
            Some(_) if idx == 0 => Ok(()),
            Some(slot) => {
                *slot = val;
                Ok(())
            }
            None => Err(EngineError::InvalidRegisterIndex(idx)),
        }
    }

    /// Sets x1..x31 to `val`; x0 stays zero.
    pub fn fill(&mut self, val: u64) {
        self.regs[1..].fill(val);
        self.regs[0] = 0;
    }

    /// Copy of the whole file.
    pub const fn snapshot(&self) -> [u64; GPR_COUNT] {
        self.regs
    }

    /// Base pointer of the array, for native code.
    pub const fn as_mut_ptr(&mut self) -> *mut u64 {
        self.regs.as_mut_ptr()
    }

    /// Formats the file two registers per line with ABI names.
    pub fn dump(&self) -> String {
        (0..GPR_COUNT)
            .step_by(2)
            .map(|i| {
                format!(
                    "x{:<2} {:>4}={:#018x}  x{:<2} {:>4}={:#018x}\n",
                    i,
                    ABI_NAMES[i],
                    self.regs[i],
                    i + 1,
                    ABI_NAMES[i + 1],
                    self.regs[i + 1]
                )
            })
            .collect()
    }
}
