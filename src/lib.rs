//! # emu16
//!
//! An emulator for a small 16-bit register machine.
//!
//! Programs live in a 64 KiB code segment and operate on a separate 64 KiB
//! data segment. The [`Cpu`] fetches two-byte instruction words, decodes the
//! opcode and operand specifier, and executes until a `STOP` instruction or a
//! fault.

pub mod cpu;
pub mod image;

// Re-export commonly used types
pub use cpu::{
    Cpu, CpuError, CpuState, Fault, FaultKind, Flags, Instruction, Memory, Opcode, Registers,
    Snapshot, Width,
};
pub use image::{load_image, ImageError};
