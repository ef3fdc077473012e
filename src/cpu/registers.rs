//! The register file.
//!
//! The machine has four general-purpose 16-bit registers (r0-r3), a stack
//! pointer, a program counter, the flags word and a scratch/interrupt register.
//! Instructions name registers by a 3-bit index through one of two views:
//!
//! - 16-bit: r0, r1, r2, r3, sp, pc, flags, int
//! - 8-bit:  low bytes of r0-r3, then high bytes of r0-r3
//!
//! Byte writes only ever touch the addressed half of a general register.

use crate::cpu::Flags;
use log::trace;
use serde::{Deserialize, Serialize};

/// Operand width selected by the high bit of the operand specifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Width {
    Byte,
    Word,
}

impl Width {
    pub fn bytes(self) -> u16 {
        match self {
            Width::Byte => 1,
            Width::Word => 2,
        }
    }

    pub fn bits(self) -> u32 {
        self.bytes() as u32 * 8
    }

    /// All-ones value of this width.
    pub fn mask(self) -> u32 {
        match self {
            Width::Byte => 0xFF,
            Width::Word => 0xFFFF,
        }
    }
}

/// Register names in 16-bit index order.
pub const WORD_NAMES: [&str; 8] = ["r0", "r1", "r2", "r3", "rsp", "rpp", "rfl", "rint"];

/// Register names in 8-bit index order.
pub const BYTE_NAMES: [&str; 8] = ["r0l", "r1l", "r2l", "r3l", "r0h", "r1h", "r2h", "r3h"];

/// The register file.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registers {
    /// General-purpose registers r0-r3.
    gp: [u16; 4],

    /// Stack pointer (rsp). Grows upward through the data segment.
    pub sp: u16,

    /// Program counter (rpp). Indexes the code segment.
    pub pc: u16,

    /// Flags register (rfl).
    pub flags: Flags,

    /// Interrupt vector / scratch register (rint).
    pub int: u16,
}

impl Registers {
    /// Create a new register file with all values zeroed.
    pub fn new() -> Self {
        Self::default()
    }

    /// Reset all registers to zero.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn gp(&self, n: usize) -> u16 {
        self.gp[n & 0x3]
    }

    pub fn set_gp(&mut self, n: usize, val: u16) {
        self.gp[n & 0x3] = val;
    }

    pub fn read_low(&self, n: usize) -> u8 {
        (self.gp(n) & 0x00FF) as u8
    }

    pub fn write_low(&mut self, n: usize, val: u8) {
        let old = self.gp(n);
        self.set_gp(n, (old & 0xFF00) | val as u16);
    }

    pub fn read_high(&self, n: usize) -> u8 {
        (self.gp(n) >> 8) as u8
    }

    pub fn write_high(&mut self, n: usize, val: u8) {
        let old = self.gp(n);
        self.set_gp(n, (old & 0x00FF) | ((val as u16) << 8));
    }

    /// Read through the 16-bit view.
    pub fn read_word(&self, index: u8) -> u16 {
        match index & 0x7 {
            n @ 0..=3 => self.gp(n as usize),
            4 => self.sp,
            5 => self.pc,
            6 => self.flags.bits(),
            _ => self.int,
        }
    }

    /// Write through the 16-bit view.
    pub fn write_word(&mut self, index: u8, val: u16) {
        trace!("Reg: writing {val:#06x} to {} (word)", WORD_NAMES[(index & 0x7) as usize]);
        match index & 0x7 {
            n @ 0..=3 => self.set_gp(n as usize, val),
            4 => self.sp = val,
            5 => self.pc = val,
            6 => self.flags = Flags::from_bits(val),
            _ => self.int = val,
        }
    }

    /// Read through the 8-bit view.
    pub fn read_byte(&self, index: u8) -> u8 {
        let index = (index & 0x7) as usize;
        if index < 4 {
            self.read_low(index)
        } else {
            self.read_high(index - 4)
        }
    }

    /// Write through the 8-bit view.
    pub fn write_byte(&mut self, index: u8, val: u8) {
        let index = (index & 0x7) as usize;
        trace!("Reg: writing {val:#04x} to {} (byte)", BYTE_NAMES[index]);
        if index < 4 {
            self.write_low(index, val);
        } else {
            self.write_high(index - 4, val);
        }
    }

    /// Read through the view selected by `width`, zero-extended.
    pub fn read(&self, width: Width, index: u8) -> u16 {
        match width {
            Width::Byte => self.read_byte(index) as u16,
            Width::Word => self.read_word(index),
        }
    }

    /// Write through the view selected by `width`. Byte writes use the low 8 bits of `val`.
    pub fn write(&mut self, width: Width, index: u8, val: u16) {
        match width {
            Width::Byte => self.write_byte(index, val as u8),
            Width::Word => self.write_word(index, val),
        }
    }
}
