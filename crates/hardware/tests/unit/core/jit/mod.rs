//! Native compiler tests.
//!
//! The backends are plain byte emitters and are tested on every host. Tests that
//! execute native code are gated on `jit::AVAILABLE`.

/// AArch64 encodings.
pub mod aarch64;
