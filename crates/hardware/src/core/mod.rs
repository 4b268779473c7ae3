//! Hart execution engine.
//!
//! This module contains the engine proper: architectural state, the translation
//! and block caches, the native compiler, the hart's step machine, and the
//! instrumentation registry the hart consults while it runs.

/// Architectural state (register file, `satp`, privilege).
pub mod arch;

/// The hart: step machine, memory path, discovery and fault reporting.
pub mod hart;

/// Instrumentation callbacks.
pub mod hooks;

/// Native compiler for host x86-64 and AArch64.
pub mod jit;

/// MMU and block cache.
pub mod units;

pub use self::hart::Hart;
