//! RV64I + Zicsr decoder.
//!
//! Turns a raw 32-bit word into an [`Instruction`]. Decoding is total: any word that
//! does not match a supported encoding becomes `Opcode::Unknown` with every operand
//! slot absent, and the error is raised only if something tries to execute or
//! compile it.

use crate::isa::instruction::{Instruction, InstructionBits};
use crate::isa::opcode::Opcode;
use crate::isa::rv64i::{funct3, funct7, opcodes};

/// Immediate of ECALL within the SYSTEM/PRIV group.
const IMM_ECALL: u32 = 0;
/// Immediate of EBREAK within the SYSTEM/PRIV group.
const IMM_EBREAK: u32 = 1;

/// Decodes one instruction word.
///
/// # Arguments
///
/// * `raw` - The 32-bit instruction encoding.
///
/// # Returns
///
/// The decoded instruction, or `Instruction::unknown(raw)` if the word is not a
/// supported RV64I/Zicsr encoding.
pub fn decode(raw: u32) -> Instruction {
    let rd = Some(raw.rd());
    let rs1 = Some(raw.rs1());
    let rs2 = Some(raw.rs2());
    let f3 = raw.funct3();
    let f7 = raw.funct7();

    let i_type = |opcode| Instruction {
        raw,
        opcode,
        rd,
        rs1,
        rs2: None,
        imm: imm_i(raw),
    };
    let r_type = |opcode| Instruction {
        raw,
        opcode,
        rd,
        rs1,
        rs2,
        imm: 0,
    };
    let shift_imm = |opcode, shamt: u32| Instruction {
        raw,
        opcode,
        rd,
        rs1,
        rs2: None,
        imm: i64::from(shamt),
    };

    match raw.opcode() {
        opcodes::OP_LUI | opcodes::OP_AUIPC => Instruction {
            raw,
            opcode: if raw.opcode() == opcodes::OP_LUI {
                Opcode::Lui
            } else {
                Opcode::Auipc
            },
            rd,
            rs1: None,
            rs2: None,
            imm: imm_u(raw),
        },

        opcodes::OP_JAL => Instruction {
            raw,
            opcode: Opcode::Jal,
            rd,
            rs1: None,
            rs2: None,
            imm: imm_j(raw),
        },

        opcodes::OP_JALR if f3 == 0 => i_type(Opcode::Jalr),

        opcodes::OP_BRANCH => {
            let opcode = match f3 {
                funct3::BEQ => Opcode::Beq,
                funct3::BNE => Opcode::Bne,
                funct3::BLT => Opcode::Blt,
                funct3::BGE => Opcode::Bge,
                funct3::BLTU => Opcode::Bltu,
                funct3::BGEU => Opcode::Bgeu,
                _ => return Instruction::unknown(raw),
            };
            Instruction {
                raw,
                opcode,
                rd: None,
                rs1,
                rs2,
                imm: imm_b(raw),
            }
        }

        opcodes::OP_LOAD => i_type(match f3 {
            funct3::LB => Opcode::Lb,
            funct3::LH => Opcode::Lh,
            funct3::LW => Opcode::Lw,
            funct3::LD => Opcode::Ld,
            funct3::LBU => Opcode::Lbu,
            funct3::LHU => Opcode::Lhu,
            funct3::LWU => Opcode::Lwu,
            _ => return Instruction::unknown(raw),
        }),

        opcodes::OP_STORE => {
            let opcode = match f3 {
                funct3::SB => Opcode::Sb,
                funct3::SH => Opcode::Sh,
                funct3::SW => Opcode::Sw,
                funct3::SD => Opcode::Sd,
                _ => return Instruction::unknown(raw),
            };
            Instruction {
                raw,
                opcode,
                rd: None,
                rs1,
                rs2,
                imm: imm_s(raw),
            }
        }

        opcodes::OP_IMM => {
            // RV64 shift immediates carry a 6-bit shamt; only funct6 selects the op.
            let funct6 = raw >> 26;
            let shamt = (raw >> 20) & 0x3F;
            match f3 {
                funct3::ADD_SUB => i_type(Opcode::Addi),
                funct3::SLT => i_type(Opcode::Slti),
                funct3::SLTU => i_type(Opcode::Sltiu),
                funct3::XOR => i_type(Opcode::Xori),
                funct3::OR => i_type(Opcode::Ori),
                funct3::AND => i_type(Opcode::Andi),
                funct3::SLL if funct6 == 0 => shift_imm(Opcode::Slli, shamt),
                funct3::SRL_SRA if funct6 == 0 => shift_imm(Opcode::Srli, shamt),
                funct3::SRL_SRA if funct6 == funct7::SRAI_FUNCT6 => shift_imm(Opcode::Srai, shamt),
                _ => Instruction::unknown(raw),
            }
        }

        opcodes::OP_IMM_32 => {
            let shamt = u32::from(raw.rs2());
            match (f3, f7) {
                (funct3::ADD_SUB, _) => i_type(Opcode::Addiw),
                (funct3::SLL, funct7::DEFAULT) => shift_imm(Opcode::Slliw, shamt),
                (funct3::SRL_SRA, funct7::DEFAULT) => shift_imm(Opcode::Srliw, shamt),
                (funct3::SRL_SRA, funct7::ALT) => shift_imm(Opcode::Sraiw, shamt),
                _ => Instruction::unknown(raw),
            }
        }

        opcodes::OP_REG => r_type(match (f3, f7) {
            (funct3::ADD_SUB, funct7::DEFAULT) => Opcode::Add,
            (funct3::ADD_SUB, funct7::ALT) => Opcode::Sub,
            (funct3::SLL, funct7::DEFAULT) => Opcode::Sll,
            (funct3::SLT, funct7::DEFAULT) => Opcode::Slt,
            (funct3::SLTU, funct7::DEFAULT) => Opcode::Sltu,
            (funct3::XOR, funct7::DEFAULT) => Opcode::Xor,
            (funct3::SRL_SRA, funct7::DEFAULT) => Opcode::Srl,
            (funct3::SRL_SRA, funct7::ALT) => Opcode::Sra,
            (funct3::OR, funct7::DEFAULT) => Opcode::Or,
            (funct3::AND, funct7::DEFAULT) => Opcode::And,
            _ => return Instruction::unknown(raw),
        }),

        opcodes::OP_REG_32 => r_type(match (f3, f7) {
            (funct3::ADD_SUB, funct7::DEFAULT) => Opcode::Addw,
            (funct3::ADD_SUB, funct7::ALT) => Opcode::Subw,
            (funct3::SLL, funct7::DEFAULT) => Opcode::Sllw,
            (funct3::SRL_SRA, funct7::DEFAULT) => Opcode::Srlw,
            (funct3::SRL_SRA, funct7::ALT) => Opcode::Sraw,
            _ => return Instruction::unknown(raw),
        }),

        opcodes::OP_MISC_MEM if f3 == funct3::FENCE => Instruction {
            raw,
            opcode: Opcode::Fence,
            rd: None,
            rs1: None,
            rs2: None,
            imm: 0,
        },

        opcodes::OP_SYSTEM => decode_system(raw),

        _ => Instruction::unknown(raw),
    }
}

/// Decodes the SYSTEM major opcode: ECALL, EBREAK and the six CSR forms.
fn decode_system(raw: u32) -> Instruction {
    let csr = i64::from(raw.csr());
    let reg_form = |opcode| Instruction {
        raw,
        opcode,
        rd: Some(raw.rd()),
        rs1: Some(raw.rs1()),
        rs2: None,
        imm: csr,
    };
    let imm_form = |opcode| Instruction {
        raw,
        opcode,
        rd: Some(raw.rd()),
        rs1: None,
        rs2: None,
        imm: csr,
    };

    match raw.funct3() {
        funct3::PRIV if raw.rd() == 0 && raw.rs1() == 0 => {
            let opcode = match raw.csr() {
                IMM_ECALL => Opcode::Ecall,
                IMM_EBREAK => Opcode::Ebreak,
                _ => return Instruction::unknown(raw),
            };
            Instruction {
                raw,
                opcode,
                rd: None,
                rs1: None,
                rs2: None,
                imm: 0,
            }
        }
        funct3::CSRRW => reg_form(Opcode::Csrrw),
        funct3::CSRRS => reg_form(Opcode::Csrrs),
        funct3::CSRRC => reg_form(Opcode::Csrrc),
        funct3::CSRRWI => imm_form(Opcode::Csrrwi),
        funct3::CSRRSI => imm_form(Opcode::Csrrsi),
        funct3::CSRRCI => imm_form(Opcode::Csrrci),
        _ => Instruction::unknown(raw),
    }
}

/// I-type: `imm[11:0]` in bits 31-20.
#[inline]
fn imm_i(raw: u32) -> i64 {
    i64::from((raw as i32) >> 20)
}

/// S-type: `imm[11:5]` in bits 31-25, `imm[4:0]` in bits 11-7.
#[inline]
fn imm_s(raw: u32) -> i64 {
    let bits = ((raw >> 25) << 5) | ((raw >> 7) & 0x1F);
    sign_extend(bits, 12)
}

/// B-type: `imm[12|10:5]` in bits 31-25, `imm[4:1|11]` in bits 11-7.
#[inline]
fn imm_b(raw: u32) -> i64 {
    let bits = (((raw >> 31) & 1) << 12)
        | (((raw >> 7) & 1) << 11)
        | (((raw >> 25) & 0x3F) << 5)
        | (((raw >> 8) & 0xF) << 1);
    sign_extend(bits, 13)
}

/// U-type: `imm[31:12]`, low twelve bits zero, sign-extended to 64 bits.
#[inline]
fn imm_u(raw: u32) -> i64 {
    i64::from((raw & 0xFFFF_F000) as i32)
}

/// J-type: `imm[20|10:1|11|19:12]` in bits 31-12.
#[inline]
fn imm_j(raw: u32) -> i64 {
    let bits = (((raw >> 31) & 1) << 20)
        | (((raw >> 12) & 0xFF) << 12)
        | (((raw >> 20) & 1) << 11)
        | (((raw >> 21) & 0x3FF) << 1);
    sign_extend(bits, 21)
}

/// Sign-extends the low `bits` bits of `val`.
#[inline]
fn sign_extend(val: u32, bits: u32) -> i64 {
    let shift = 32 - bits;
    i64::from(((val << shift) as i32) >> shift)
}
