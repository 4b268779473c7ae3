//! Run driver.
//!
//! A `Machine` owns the configuration and the hart, places guest images in
//! memory, and runs with the configured instruction budget. `loader` reads ELF
//! executables; `profile` counts what a run executed through the hook API.

/// ELF image loading.
pub mod loader;

/// The machine driver.
pub mod machine;

/// Per-opcode and memory statistics gathered from hooks.
pub mod profile;

pub use self::loader::LoadedImage;
pub use self::machine::Machine;
pub use self::profile::OpcodeProfile;
