//! Instruction decoder.
//!
//! Every instruction starts with a 16-bit word: the opcode byte followed by
//! the operand specifier byte.
//!
//! ```text
//!  15            8   7   6   4   3   1   0
//! +---------------+---+-------+-------+---+
//! |    opcode     | W |  r1   |  r2   | I |
//! +---------------+---+-------+-------+---+
//! ```
//!
//! - `W`: 1 selects 16-bit operands, 0 selects 8-bit operands
//! - `I`: 1 means the second operand is an inline immediate following the word
//! - `r1`, `r2`: register indices (0-7)

use crate::cpu::registers::{Width, BYTE_NAMES, WORD_NAMES};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Opcodes, with their encoded byte values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Opcode {
    // ==================== Transfer ====================
    Nop = 0x00,
    Ld = 0x01,
    Lp = 0x02,
    Sd = 0x03,
    Sp = 0x04,
    Set = 0x05,
    Push = 0x06,
    Pull = 0x07,

    // ==================== Arithmetic / Logic ====================
    Add = 0x10,
    Sub = 0x11,
    Mul = 0x12,
    Div = 0x13,
    Not = 0x14,
    And = 0x15,
    Or = 0x16,
    Xor = 0x17,
    Shl = 0x18,
    Shr = 0x19,
    Inc = 0x1A,
    Dec = 0x1B,
    Cmp = 0x1F,

    // ==================== Control Flow ====================
    Jmp = 0x20,
    Jiz = 0x21,
    Jnz = 0x22,
    Jin = 0x23,
    Jnn = 0x24,
    Jic = 0x25,
    Jnc = 0x26,
    Jio = 0x27,
    Jno = 0x28,
    Call = 0x30,
    Retf = 0x31,
    Int = 0x32,
    Halt = 0x33,
    Stop = 0x34,

    // ==================== Flags ====================
    Cfl = 0x40,
    Czf = 0x41,
    Cnf = 0x42,
    Ccf = 0x43,
    Cof = 0x44,
    Szf = 0x45,
    Snf = 0x46,
    Scf = 0x47,
    Sof = 0x48,

    // ==================== I/O ====================
    Wr = 0x50,
    Rd = 0x51,
}

impl Opcode {
    /// Every defined opcode.
    #[rustfmt::skip]
    pub const ALL: [Opcode; 46] = [
        Opcode::Nop, Opcode::Ld, Opcode::Lp, Opcode::Sd, Opcode::Sp, Opcode::Set,
        Opcode::Push, Opcode::Pull, Opcode::Add, Opcode::Sub, Opcode::Mul, Opcode::Div,
        Opcode::Not, Opcode::And, Opcode::Or, Opcode::Xor, Opcode::Shl, Opcode::Shr,
        Opcode::Inc, Opcode::Dec, Opcode::Cmp, Opcode::Jmp, Opcode::Jiz, Opcode::Jnz,
        Opcode::Jin, Opcode::Jnn, Opcode::Jic, Opcode::Jnc, Opcode::Jio, Opcode::Jno,
        Opcode::Call, Opcode::Retf, Opcode::Int, Opcode::Halt, Opcode::Stop, Opcode::Cfl,
        Opcode::Czf, Opcode::Cnf, Opcode::Ccf, Opcode::Cof, Opcode::Szf, Opcode::Snf,
        Opcode::Scf, Opcode::Sof, Opcode::Wr, Opcode::Rd,
    ];

    pub fn from_byte(byte: u8) -> Option<Self> {
        Self::ALL.iter().copied().find(|op| *op as u8 == byte)
    }

    pub fn mnemonic(self) -> &'static str {
        match self {
            Opcode::Nop => "NOP",
            Opcode::Ld => "LD",
            Opcode::Lp => "LP",
            Opcode::Sd => "SD",
            Opcode::Sp => "SP",
            Opcode::Set => "SET",
            Opcode::Push => "PUSH",
            Opcode::Pull => "PULL",
            Opcode::Add => "ADD",
            Opcode::Sub => "SUB",
            Opcode::Mul => "MUL",
            Opcode::Div => "DIV",
            Opcode::Not => "NOT",
            Opcode::And => "AND",
            Opcode::Or => "OR",
            Opcode::Xor => "XOR",
            Opcode::Shl => "SHL",
            Opcode::Shr => "SHR",
            Opcode::Inc => "INC",
            Opcode::Dec => "DEC",
            Opcode::Cmp => "CMP",
            Opcode::Jmp => "JMP",
            Opcode::Jiz => "JIZ",
            Opcode::Jnz => "JNZ",
            Opcode::Jin => "JIN",
            Opcode::Jnn => "JNN",
            Opcode::Jic => "JIC",
            Opcode::Jnc => "JNC",
            Opcode::Jio => "JIO",
            Opcode::Jno => "JNO",
            Opcode::Call => "CALL",
            Opcode::Retf => "RETF",
            Opcode::Int => "INT",
            Opcode::Halt => "HALT",
            Opcode::Stop => "STOP",
            Opcode::Cfl => "CFL",
            Opcode::Czf => "CZF",
            Opcode::Cnf => "CNF",
            Opcode::Ccf => "CCF",
            Opcode::Cof => "COF",
            Opcode::Szf => "SZF",
            Opcode::Snf => "SNF",
            Opcode::Scf => "SCF",
            Opcode::Sof => "SOF",
            Opcode::Wr => "WR",
            Opcode::Rd => "RD",
        }
    }
}

impl TryFrom<u8> for Opcode {
    type Error = DecodeError;

    fn try_from(byte: u8) -> Result<Self, Self::Error> {
        Self::from_byte(byte).ok_or(DecodeError::UnknownOpcode(byte))
    }
}

/// A decoded instruction word.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instruction {
    pub opcode: Opcode,
    pub width: Width,
    pub immediate: bool,
    pub r1: u8,
    pub r2: u8,
}

const WIDE_BIT: u8 = 0b1000_0000;
const R1_MASK: u8 = 0b0111_0000;
const R2_MASK: u8 = 0b0000_1110;
const IMM_BIT: u8 = 0b0000_0001;

impl Instruction {
    pub fn new(opcode: Opcode, width: Width, immediate: bool, r1: u8, r2: u8) -> Self {
        Self { opcode, width, immediate, r1: r1 & 0x7, r2: r2 & 0x7 }
    }

    /// The operand specifier byte.
    pub fn spec(&self) -> u8 {
        let wide = if self.width == Width::Word { WIDE_BIT } else { 0 };
        wide | ((self.r1 & 0x7) << 4) | ((self.r2 & 0x7) << 1) | self.immediate as u8
    }

    /// Encode back to an instruction word.
    pub fn encode(&self) -> u16 {
        u16::from_be_bytes([self.opcode as u8, self.spec()])
    }
}

/// Decode a 16-bit instruction word.
pub fn decode(word: u16) -> Result<Instruction, DecodeError> {
    let [op, spec] = word.to_be_bytes();
    let opcode = Opcode::try_from(op)?;

    let width = if spec & WIDE_BIT != 0 { Width::Word } else { Width::Byte };

    Ok(Instruction {
        opcode,
        width,
        immediate: spec & IMM_BIT != 0,
        r1: (spec & R1_MASK) >> 4,
        r2: (spec & R2_MASK) >> 1,
    })
}

impl std::fmt::Display for Instruction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names = match self.width {
            Width::Byte => &BYTE_NAMES,
            Width::Word => &WORD_NAMES,
        };
        let suffix = match self.width {
            Width::Byte => "b",
            Width::Word => "w",
        };
        let r2 = if self.immediate { "#imm" } else { names[self.r2 as usize] };
        write!(f, "{}.{} {}, {}", self.opcode.mnemonic(), suffix, names[self.r1 as usize], r2)
    }
}

/// Errors that can occur during instruction decoding.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("unknown opcode: {0:#04x}")]
    UnknownOpcode(u8),
}
