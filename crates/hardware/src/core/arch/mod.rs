//! Architectural state of a hart.
//!
//! 1. **State:** The fixed-layout `ArchState` native code addresses directly.
//! 2. **GPRs:** The integer register file.
//! 3. **CSRs:** `satp` field access and CSR number validation.
//! 4. **Modes:** Privilege level definitions.

/// Control and status registers.
pub mod csr;

/// General-purpose register file.
pub mod gpr;

/// Privilege levels.
pub mod mode;

/// Fixed-layout architectural state.
pub mod state;

pub use self::gpr::Gpr;
pub use self::mode::PrivilegeMode;
pub use self::state::ArchState;
