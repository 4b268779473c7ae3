//! Shared test infrastructure.
//!
//! - **Builders**: A fluent API for encoding RISC-V instruction words.
//! - **Harness**: A `TestContext` that owns a hart, loads programs and runs them.
