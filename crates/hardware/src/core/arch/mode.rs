//! Privilege levels.
//!
//! The engine runs everything at one level and never changes it; the level is
//! carried in the architectural state and handed to the translator so a future
//! permission check has it available.

/// RISC-V privilege level.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum PrivilegeMode {
    /// User mode.
    User = 0,
    /// Supervisor mode.
    Supervisor = 1,
    /// Machine mode, the reset level.
    #[default]
    Machine = 3,
}

impl PrivilegeMode {
    /// Converts the two-bit encoding; the reserved value 2 maps to `Machine`.
    pub const fn from_bits(val: u8) -> Self {
        match val & 0b11 {
            0 => Self::User,
            1 => Self::Supervisor,
            _ => Self::Machine,
        }
    }

    /// Single-letter name (`U`, `S`, `M`).
    pub const fn letter(self) -> char {
        match self {
            Self::User => 'U',
            Self::Supervisor => 'S',
            Self::Machine => 'M',
        }
    }
}

impl std::fmt::Display for PrivilegeMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-mode", self.letter())
    }
}
