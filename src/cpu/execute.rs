//! CPU execution engine.
//!
//! Implements the fetch-decode-execute cycle and all instruction behaviors.

use crate::cpu::alu;
use crate::cpu::decode::{self, Instruction, Opcode};
use crate::cpu::memory::MemoryError;
use crate::cpu::registers::Width;
use crate::cpu::{Flags, Memory, Registers};
use log::{debug, info, trace, warn};
use serde::{Deserialize, Serialize};
use std::io::{self, Write};
use thiserror::Error;

/// CPU execution state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CpuState {
    /// CPU is running normally.
    Running,
    /// CPU has stopped (executed STOP).
    Halted,
    /// CPU hit a fault and cannot continue.
    Faulted,
}

/// Which segment an access was aimed at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Segment {
    Code,
    Data,
}

impl std::fmt::Display for Segment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Segment::Code => write!(f, "code"),
            Segment::Data => write!(f, "data"),
        }
    }
}

/// The CPU.
///
/// Owns the register file, both segments and the output sink that `WR`
/// writes to. Output defaults to standard output; tests and embedders can
/// supply any [`Write`] implementation (a `Vec<u8>` captures it).
pub struct Cpu<W: Write = io::Stdout> {
    /// CPU registers.
    pub regs: Registers,
    /// Code segment.
    pub code: Memory,
    /// Data segment, also holding the stack.
    pub data: Memory,
    /// Current execution state.
    pub state: CpuState,
    /// Instruction count.
    pub cycles: u64,
    out: W,
    last_instr: Option<Instruction>,
}

impl Cpu {
    /// Create a CPU over the given segments, writing output to stdout.
    pub fn new(code: Memory, data: Memory) -> Self {
        Self::with_output(code, data, io::stdout())
    }
}

impl<W: Write> Cpu<W> {
    /// Create a CPU over the given segments, writing output to `out`.
    pub fn with_output(code: Memory, data: Memory, out: W) -> Self {
        Self {
            regs: Registers::new(),
            code,
            data,
            state: CpuState::Running,
            cycles: 0,
            out,
            last_instr: None,
        }
    }

    /// Reset registers and state. Both segments are kept as they are.
    pub fn reset(&mut self) {
        self.regs.reset();
        self.state = CpuState::Running;
        self.cycles = 0;
        self.last_instr = None;
    }

    /// Execute a single instruction.
    ///
    /// Returns the instruction that was executed, or an error. A fault leaves
    /// the CPU in [`CpuState::Faulted`].
    pub fn step(&mut self) -> Result<Instruction, CpuError> {
        if self.state != CpuState::Running {
            return Err(CpuError::NotRunning(self.state));
        }

        let pc = self.regs.pc;
        let opcode = self.code.read_byte(pc);

        let result = self.fetch_and_execute();
        match result {
            Ok(instr) => {
                self.cycles += 1;
                self.last_instr = Some(instr);
                Ok(instr)
            }
            Err(kind) => {
                self.state = CpuState::Faulted;
                let fault = Fault { kind, pc, opcode };
                warn!("{fault}");
                Err(fault.into())
            }
        }
    }

    fn fetch_and_execute(&mut self) -> Result<Instruction, FaultKind> {
        // Fetch
        let pc = self.regs.pc;
        let word = self.code.read_word(pc).map_err(|e| FaultKind::memory(Segment::Code, e))?;

        // Advance PC before decode (jumps will override)
        self.regs.pc = pc.wrapping_add(2);

        // Decode
        let instr = decode::decode(word).map_err(|_| FaultKind::UnknownOpcode)?;
        debug!("PC: {pc:#06x}: {instr}");

        // Execute
        self.execute(instr)?;
        Ok(instr)
    }

    /// Run until STOP or a fault.
    ///
    /// Returns the number of instructions executed.
    pub fn run(&mut self) -> Result<u64, CpuError> {
        let start_cycles = self.cycles;

        while self.state == CpuState::Running {
            self.step()?;
        }

        Ok(self.cycles - start_cycles)
    }

    /// Run for at most `max_cycles` instructions.
    pub fn run_limited(&mut self, max_cycles: u64) -> Result<u64, CpuError> {
        let start_cycles = self.cycles;
        let limit = self.cycles.saturating_add(max_cycles);

        while self.state == CpuState::Running && self.cycles < limit {
            self.step()?;
        }

        Ok(self.cycles - start_cycles)
    }

    /// Execute a decoded instruction.
    fn execute(&mut self, instr: Instruction) -> Result<(), FaultKind> {
        let width = instr.width;

        match instr.opcode {
            // ==================== Transfer ====================

            Opcode::Nop => {}

            Opcode::Ld => {
                let addr = self.regs.read_word(instr.r2);
                let val = self.load(Segment::Data, width, addr)?;
                self.regs.write(width, instr.r1, val);
            }

            Opcode::Lp => {
                let addr = self.address_operand(instr)?;
                let val = self.load(Segment::Code, width, addr)?;
                self.regs.write(width, instr.r1, val);
            }

            Opcode::Sd => {
                let addr = self.address_operand(instr)?;
                let val = self.regs.read(width, instr.r1);
                self.store(Segment::Data, width, addr, val)?;
            }

            Opcode::Sp => {
                let addr = self.address_operand(instr)?;
                let val = self.regs.read(width, instr.r1);
                self.store(Segment::Code, width, addr, val)?;
            }

            Opcode::Set => {
                let val = self.second_operand(instr)?;
                self.regs.write(width, instr.r1, val);
            }

            Opcode::Push => {
                let val = self.regs.read(width, instr.r1);
                self.push(width, val)?;
            }

            Opcode::Pull => {
                let val = self.pull(width)?;
                self.regs.write(width, instr.r1, val);
            }

            // ==================== Arithmetic / Logic ====================

            Opcode::Add => self.binary_op(instr, alu::add)?,
            Opcode::Sub => self.binary_op(instr, alu::sub)?,
            Opcode::And => self.binary_op(instr, alu::and)?,
            Opcode::Or => self.binary_op(instr, alu::or)?,
            Opcode::Xor => self.binary_op(instr, alu::xor)?,

            Opcode::Cmp => {
                let a = self.regs.read(width, instr.r1);
                let b = self.second_operand(instr)?;
                alu::cmp(&mut self.regs.flags, width, a, b);
            }

            Opcode::Inc => self.unary_op(instr, alu::inc),
            Opcode::Dec => self.unary_op(instr, alu::dec),
            Opcode::Not => self.unary_op(instr, alu::not),
            Opcode::Shl => self.unary_op(instr, alu::shl),
            Opcode::Shr => self.unary_op(instr, alu::shr),

            Opcode::Mul => {
                let a = self.regs.read(width, instr.r1);
                let b = self.regs.read(width, instr.r2);
                let (low, high) = alu::mul(&mut self.regs.flags, width, a, b);
                self.regs.write(width, instr.r1, low);
                self.regs.write(width, instr.r2, high);
            }

            Opcode::Div => {
                let a = self.regs.read(width, instr.r1);
                let b = self.regs.read(width, instr.r2);
                let (quot, rem) = alu::div(&mut self.regs.flags, width, a, b)
                    .ok_or(FaultKind::DivisionByZero)?;
                // Quotient wins when r1 and r2 name the same register
                self.regs.write(width, instr.r2, rem);
                self.regs.write(width, instr.r1, quot);
            }

            // ==================== Control Flow ====================

            Opcode::Jmp => {
                let target = self.target_operand(instr)?;
                self.jump(target);
            }

            Opcode::Jiz => self.branch_if(instr, |f| f.zero())?,
            Opcode::Jnz => self.branch_if(instr, |f| !f.zero())?,
            Opcode::Jin => self.branch_if(instr, |f| f.negative())?,
            Opcode::Jnn => self.branch_if(instr, |f| !f.negative())?,
            Opcode::Jic => self.branch_if(instr, |f| f.carry())?,
            Opcode::Jnc => self.branch_if(instr, |f| !f.carry())?,
            Opcode::Jio => self.branch_if(instr, |f| f.overflow())?,
            Opcode::Jno => self.branch_if(instr, |f| !f.overflow())?,

            Opcode::Call => {
                let target = self.target_operand(instr)?;
                let ret = self.regs.pc;
                self.push(Width::Word, ret)?;
                self.jump(target);
            }

            Opcode::Retf => {
                let ret = self.pull(Width::Word)?;
                self.jump(ret);
            }

            Opcode::Stop => {
                info!("STOP after {} instructions", self.cycles + 1);
                self.state = CpuState::Halted;
            }

            Opcode::Int | Opcode::Halt | Opcode::Rd => {
                debug!("{} has no effect", instr.opcode.mnemonic());
            }

            // ==================== Flags ====================

            Opcode::Cfl => self.regs.flags.clear_arithmetic(),
            Opcode::Czf => self.regs.flags.set_zero(false),
            Opcode::Cnf => self.regs.flags.set_negative(false),
            Opcode::Ccf => self.regs.flags.set_carry(false),
            Opcode::Cof => self.regs.flags.set_overflow(false),
            Opcode::Szf => self.regs.flags.set_zero(true),
            Opcode::Snf => self.regs.flags.set_negative(true),
            Opcode::Scf => self.regs.flags.set_carry(true),
            Opcode::Sof => self.regs.flags.set_overflow(true),

            // ==================== I/O ====================

            Opcode::Wr => match width {
                Width::Word => {
                    let addr = self.target_operand(instr)?;
                    let text = self
                        .data
                        .read_cstr(addr)
                        .map_err(|e| FaultKind::memory(Segment::Data, e))?;
                    self.out.write_all(text).map_err(FaultKind::output)?;
                    self.out.write_all(b"\n").map_err(FaultKind::output)?;
                    self.out.flush().map_err(FaultKind::output)?;
                }
                Width::Byte => {
                    let byte = if instr.immediate {
                        self.fetch_immediate(Width::Byte)?
                    } else {
                        self.regs.read(Width::Byte, instr.r1)
                    };
                    self.out.write_all(&[byte as u8]).map_err(FaultKind::output)?;
                    self.out.flush().map_err(FaultKind::output)?;
                }
            },
        }

        Ok(())
    }

    // ==================== Operand resolution ====================

    /// Read an inline immediate of `width` at the program counter and step past it.
    fn fetch_immediate(&mut self, width: Width) -> Result<u16, FaultKind> {
        let pc = self.regs.pc;
        let val = self.load(Segment::Code, width, pc)?;
        self.regs.pc = pc.wrapping_add(width.bytes());
        Ok(val)
    }

    /// Second operand, sized by the instruction: inline immediate or register 2.
    fn second_operand(&mut self, instr: Instruction) -> Result<u16, FaultKind> {
        if instr.immediate {
            self.fetch_immediate(instr.width)
        } else {
            Ok(self.regs.read(instr.width, instr.r2))
        }
    }

    /// Second operand used as an address: always a word.
    fn address_operand(&mut self, instr: Instruction) -> Result<u16, FaultKind> {
        if instr.immediate {
            self.fetch_immediate(Width::Word)
        } else {
            Ok(self.regs.read_word(instr.r2))
        }
    }

    /// First operand used as a jump target or address: always a word.
    fn target_operand(&mut self, instr: Instruction) -> Result<u16, FaultKind> {
        if instr.immediate {
            self.fetch_immediate(Width::Word)
        } else {
            Ok(self.regs.read_word(instr.r1))
        }
    }

    fn binary_op(
        &mut self,
        instr: Instruction,
        op: fn(&mut Flags, Width, u16, u16) -> u16,
    ) -> Result<(), FaultKind> {
        let b = self.second_operand(instr)?;
        let a = self.regs.read(instr.width, instr.r1);
        let res = op(&mut self.regs.flags, instr.width, a, b);
        self.regs.write(instr.width, instr.r1, res);
        Ok(())
    }

    fn unary_op(&mut self, instr: Instruction, op: fn(&mut Flags, Width, u16) -> u16) {
        let a = self.regs.read(instr.width, instr.r1);
        let res = op(&mut self.regs.flags, instr.width, a);
        self.regs.write(instr.width, instr.r1, res);
    }

    /// Conditional jump. The target operand is consumed whether or not the branch is taken.
    fn branch_if(
        &mut self,
        instr: Instruction,
        cond: impl Fn(&Flags) -> bool,
    ) -> Result<(), FaultKind> {
        let target = self.target_operand(instr)?;
        if cond(&self.regs.flags) {
            self.jump(target);
        }
        Ok(())
    }

    fn jump(&mut self, target: u16) {
        trace!("PC: {:#06x}: jump to {target:#06x}", self.regs.pc);
        self.regs.pc = target;
    }

    // ==================== Memory and stack ====================

    fn segment(&self, seg: Segment) -> &Memory {
        match seg {
            Segment::Code => &self.code,
            Segment::Data => &self.data,
        }
    }

    fn segment_mut(&mut self, seg: Segment) -> &mut Memory {
        match seg {
            Segment::Code => &mut self.code,
            Segment::Data => &mut self.data,
        }
    }

    fn load(&self, seg: Segment, width: Width, addr: u16) -> Result<u16, FaultKind> {
        let mem = self.segment(seg);
        match width {
            Width::Byte => Ok(mem.read_byte(addr) as u16),
            Width::Word => mem.read_word(addr).map_err(|e| FaultKind::memory(seg, e)),
        }
    }

    fn store(&mut self, seg: Segment, width: Width, addr: u16, val: u16) -> Result<(), FaultKind> {
        let mem = self.segment_mut(seg);
        match width {
            Width::Byte => {
                mem.write_byte(addr, val as u8);
                Ok(())
            }
            Width::Word => mem.write_word(addr, val).map_err(|e| FaultKind::memory(seg, e)),
        }
    }

    /// Push onto the data-segment stack: store at `sp`, then advance `sp`.
    ///
    /// If `sp` cannot advance past the pushed value without leaving the
    /// segment, nothing is stored and the fault names the address `sp` would
    /// have wrapped to.
    fn push(&mut self, width: Width, val: u16) -> Result<(), FaultKind> {
        let sp = self.regs.sp;
        let next = sp.checked_add(width.bytes()).ok_or(FaultKind::OutOfBounds {
            segment: Segment::Data,
            addr: sp.wrapping_add(width.bytes()),
        })?;
        self.store(Segment::Data, width, sp, val)?;
        self.regs.sp = next;
        Ok(())
    }

    /// Pull from the data-segment stack: retreat `sp`, then load from it.
    fn pull(&mut self, width: Width) -> Result<u16, FaultKind> {
        let sp = self.regs.sp;
        let top = sp.checked_sub(width.bytes()).ok_or(FaultKind::StackUnderflow {
            sp,
            needed: width.bytes(),
        })?;
        let val = self.load(Segment::Data, width, top)?;
        self.regs.sp = top;
        Ok(val)
    }

    // ==================== Inspection ====================

    /// Get the last executed instruction.
    pub fn last_instruction(&self) -> Option<Instruction> {
        self.last_instr
    }

    /// Check if the CPU has stopped.
    pub fn is_halted(&self) -> bool {
        self.state == CpuState::Halted
    }

    /// Check if the CPU is running.
    pub fn is_running(&self) -> bool {
        self.state == CpuState::Running
    }

    /// The output sink.
    pub fn output(&self) -> &W {
        &self.out
    }

    /// Consume the CPU, returning the output sink.
    pub fn into_output(self) -> W {
        self.out
    }

    /// Capture the register state for reporting.
    pub fn snapshot(&self) -> Snapshot {
        let flags = self.regs.flags;
        Snapshot {
            state: self.state,
            cycles: self.cycles,
            r0: self.regs.gp(0),
            r1: self.regs.gp(1),
            r2: self.regs.gp(2),
            r3: self.regs.gp(3),
            rsp: self.regs.sp,
            rpp: self.regs.pc,
            rint: self.regs.int,
            rfl: flags.bits(),
            zero: flags.zero(),
            negative: flags.negative(),
            carry: flags.carry(),
            overflow: flags.overflow(),
            int_enable: flags.int_enable(),
        }
    }
}

impl<W: Write> std::fmt::Debug for Cpu<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cpu")
            .field("state", &self.state)
            .field("cycles", &self.cycles)
            .field("regs", &self.regs)
            .finish()
    }
}

/// Register and flag state at a point in time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub state: CpuState,
    pub cycles: u64,
    pub r0: u16,
    pub r1: u16,
    pub r2: u16,
    pub r3: u16,
    pub rsp: u16,
    pub rpp: u16,
    pub rint: u16,
    pub rfl: u16,
    pub zero: bool,
    pub negative: bool,
    pub carry: bool,
    pub overflow: bool,
    pub int_enable: bool,
}

/// What went wrong when a fault was raised.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FaultKind {
    #[error("{segment} access at {addr:#06x} out of bounds")]
    OutOfBounds { segment: Segment, addr: u16 },

    #[error("division by zero")]
    DivisionByZero,

    #[error("stack underflow (sp={sp:#06x}, need {needed} bytes)")]
    StackUnderflow { sp: u16, needed: u16 },

    #[error("unknown opcode")]
    UnknownOpcode,

    #[error("output error: {0}")]
    Output(String),
}

impl FaultKind {
    fn memory(segment: Segment, err: MemoryError) -> Self {
        match err {
            MemoryError::OutOfBounds(addr) => FaultKind::OutOfBounds { segment, addr },
            MemoryError::ImageTooLarge { .. } => FaultKind::OutOfBounds { segment, addr: 0 },
        }
    }

    fn output(err: io::Error) -> Self {
        FaultKind::Output(err.to_string())
    }
}

/// A fault raised by an instruction, with the address and opcode byte of
/// the instruction that raised it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind} at pc={pc:#06x} (opcode {opcode:#04x})")]
pub struct Fault {
    pub kind: FaultKind,
    pub pc: u16,
    pub opcode: u8,
}

/// Errors that can occur during CPU execution.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CpuError {
    #[error("CPU not running: {0:?}")]
    NotRunning(CpuState),

    #[error("fault: {0}")]
    Fault(#[from] Fault),
}
