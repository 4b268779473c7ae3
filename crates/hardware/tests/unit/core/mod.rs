//! Core tests.




/// Native compiler.
pub mod jit;
