//! # Unit Components
//!
//! Tests grouped the way the crate is laid out: shared types, configuration,
//! the core (architectural state, hart, hooks, JIT, caches and MMU), the ISA,
//! guest memory and the run driver.



/// Hart, hooks, native compiler, block cache and MMU.
pub mod core;


/// Run driver.
pub mod sim;
