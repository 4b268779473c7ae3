//! Dense opcode enumeration and instruction formats.
//!
//! `Opcode` is the tag the decoder attaches to every instruction. Its variants are
//! numbered densely from zero so per-opcode tables (callback lists, handler lookup)
//! can be plain arrays sized by [`Opcode::COUNT`].

/// Encoding format of an instruction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Format {
    /// Register-register.
    R,
    /// Register-immediate, loads, JALR.
    I,
    /// Stores.
    S,
    /// Conditional branches.
    B,
    /// LUI / AUIPC.
    U,
    /// JAL.
    J,
    /// FENCE, ECALL, EBREAK and CSR access.
    System,
}

macro_rules! opcodes {
    ($($variant:ident => $name:literal, $fmt:ident;)*) => {
        /// Operation performed by a decoded instruction.
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
        #[repr(u8)]
        pub enum Opcode {
            $(
                #[doc = concat!("`", $name, "`")]
                $variant,
            )*
        }

        impl Opcode {
            /// Every opcode, in table order.
            pub const ALL: &'static [Self] = &[$(Self::$variant),*];

            /// Number of opcodes, `Unknown` included.
            pub const COUNT: usize = Self::ALL.len();

            /// Assembly mnemonic.
            pub const fn mnemonic(self) -> &'static str {
                match self {
                    $(Self::$variant => $name,)*
                }
            }

            /// Encoding format.
            pub const fn format(self) -> Format {
                match self {
                    $(Self::$variant => Format::$fmt,)*
                }
            }
        }
    };
}

opcodes! {
    Lui => "lui", U;
    Auipc => "auipc", U;
    Jal => "jal", J;
    Jalr => "jalr", I;
    Beq => "beq", B;
    Bne => "bne", B;
    Blt => "blt", B;
    Bge => "bge", B;
    Bltu => "bltu", B;
    Bgeu => "bgeu", B;
    Lb => "lb", I;
    Lh => "lh", I;
    Lw => "lw", I;
    Ld => "ld", I;
    Lbu => "lbu", I;
    Lhu => "lhu", I;
    Lwu => "lwu", I;
    Sb => "sb", S;
    Sh => "sh", S;
    Sw => "sw", S;
    Sd => "sd", S;
    Addi => "addi", I;
    Slti => "slti", I;
    Sltiu => "sltiu", I;
    Xori => "xori", I;
    Ori => "ori", I;
    Andi => "andi", I;
    Slli => "slli", I;
    Srli => "srli", I;
    Srai => "srai", I;
    Add => "add", R;
    Sub => "sub", R;
    Sll => "sll", R;
    Slt => "slt", R;
    Sltu => "sltu", R;
    Xor => "xor", R;
    Srl => "srl", R;
    Sra => "sra", R;
    Or => "or", R;
    And => "and", R;
    Addiw => "addiw", I;
    Slliw => "slliw", I;
    Srliw => "srliw", I;
    Sraiw => "sraiw", I;
    Addw => "addw", R;
    Subw => "subw", R;
    Sllw => "sllw", R;
    Srlw => "srlw", R;
    Sraw => "sraw", R;
    Fence => "fence", System;
    Ecall => "ecall", System;
    Ebreak => "ebreak", System;
    Csrrw => "csrrw", System;
    Csrrs => "csrrs", System;
    Csrrc => "csrrc", System;
    Csrrwi => "csrrwi", System;
    Csrrsi => "csrrsi", System;
    Csrrci => "csrrci", System;
    Unknown => "unknown", System;
}

impl Opcode {
    /// Dense table index.
    #[inline(always)]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Conditional branches and jumps, the instructions that disqualify a block
    /// from leaf compilation.
    #[inline]
    pub const fn is_branch_or_jump(self) -> bool {
        matches!(self.format(), Format::B | Format::J) || matches!(self, Self::Jalr)
    }

    /// Loads, with their access width in bytes and whether the result is sign-extended.
    pub const fn load_width(self) -> Option<(usize, bool)> {
        match self {
            Self::Lb => Some((1, true)),
            Self::Lh => Some((2, true)),
            Self::Lw => Some((4, true)),
            Self::Ld => Some((8, false)),
            Self::Lbu => Some((1, false)),
            Self::Lhu => Some((2, false)),
            Self::Lwu => Some((4, false)),
            _ => None,
        }
    }

    /// Stores, with their access width in bytes.
    pub const fn store_width(self) -> Option<usize> {
        match self {
            Self::Sb => Some(1),
            Self::Sh => Some(2),
            Self::Sw => Some(4),
            Self::Sd => Some(8),
            _ => None,
        }
    }

    /// CSR access instructions.
    pub const fn is_csr(self) -> bool {
        matches!(
            self,
            Self::Csrrw | Self::Csrrs | Self::Csrrc | Self::Csrrwi | Self::Csrrsi | Self::Csrrci
        )
    }
}

impl std::fmt::Display for Opcode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.mnemonic())
    }
}
