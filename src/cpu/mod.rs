//! CPU emulation.
//!
//! The machine is a small 16-bit register machine:
//! - separate 64 KiB code and data segments, the data segment also holding the stack
//! - four general registers with byte views, plus stack pointer, program counter,
//!   flags and a scratch register
//! - fixed 16-bit instruction words with optional inline immediates

pub mod alu;
pub mod decode;
pub mod execute;
pub mod flags;
pub mod memory;
pub mod registers;

pub use decode::{decode, DecodeError, Instruction, Opcode};
pub use execute::{Cpu, CpuError, CpuState, Fault, FaultKind, Segment, Snapshot};
pub use flags::Flags;
pub use memory::{Memory, MemoryError, SEGMENT_SIZE};
pub use registers::{Registers, Width};
