//! Guest-side system components.
//!
//! The engine models a single flat physical address space starting at zero, so
//! the only component is guest memory.

/// Guest physical memory.
pub mod memory;

pub use memory::GuestMemory;
