//! Common types shared across the engine.
//!
//! 1. **Address Types:** Strong types for virtual and physical addresses.
//! 2. **Constants:** Page geometry, satp layout, register-file shape.
//! 3. **Memory Access:** Fetch/Load/Store access kinds.
//! 4. **Error Handling:** The engine error taxonomy and translation results.

/// Address type definitions (physical and virtual addresses).
pub mod addr;

/// Engine-wide constants.
pub mod constants;

/// Memory access type definitions.
pub mod data;

/// Error taxonomy and translation results.
pub mod error;

pub use addr::{PhysAddr, VirtAddr};
pub use constants::{INSTRUCTION_SIZE, PAGE_SHIFT, PAGE_SIZE};
pub use data::AccessType;
pub use error::{EngineError, TranslationResult};
