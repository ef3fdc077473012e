//! Whole programs run through the public API.

use emu16::cpu::{Opcode, Segment};
use emu16::{Cpu, CpuError, CpuState, Fault, FaultKind, Instruction, Memory, Width};

fn cpu_with(code: &[u8], data: &[u8]) -> Cpu<Vec<u8>> {
    Cpu::with_output(
        Memory::from_image(code).unwrap(),
        Memory::from_image(data).unwrap(),
        Vec::new(),
    )
}

fn word(opcode: Opcode, width: Width, immediate: bool, r1: u8, r2: u8) -> [u8; 2] {
    Instruction::new(opcode, width, immediate, r1, r2).encode().to_be_bytes()
}

#[test]
fn test_set_immediate_then_stop() {
    // SET.w r0, #0x002A ; STOP
    let mut cpu = cpu_with(&[0x05, 0x81, 0x00, 0x2A, 0x34, 0x00], &[]);
    cpu.run().unwrap();
    assert_eq!(cpu.regs.gp(0), 0x002A);
    assert_eq!(cpu.state, CpuState::Halted);
}

#[test]
fn test_set_without_immediate_bit_reads_register() {
    // Specifier 0x80 has the immediate bit clear: SET.w r0, r0. The following
    // word 0x002A then decodes as a NOP.
    let mut cpu = cpu_with(&[0x05, 0x80, 0x00, 0x2A, 0x34, 0x00], &[]);
    assert_eq!(cpu.run().unwrap(), 3);
    assert_eq!(cpu.regs.gp(0), 0);
    assert!(cpu.is_halted());
}

#[test]
fn test_add_registers_wraps_to_zero() {
    // ADD.w r0, r1 ; STOP
    let mut cpu = cpu_with(&[0x10, 0x82, 0x34, 0x00], &[]);
    cpu.regs.set_gp(0, 0xFFFF);
    cpu.regs.set_gp(1, 1);
    cpu.run().unwrap();
    assert_eq!(cpu.regs.gp(0), 0x0000);
    assert!(cpu.regs.flags.carry());
    assert!(cpu.regs.flags.zero());
}

#[test]
fn test_write_byte_immediate() {
    // WR.b #0x41 ; STOP
    let mut cpu = cpu_with(&[0x50, 0x01, 0x41, 0x34, 0x00], &[]);
    cpu.run().unwrap();
    assert_eq!(cpu.into_output(), b"A");
}

#[test]
fn test_hello_from_data_segment() {
    // WR.w #0x0000 ; STOP
    let mut code = Vec::new();
    code.extend(word(Opcode::Wr, Width::Word, true, 0, 0));
    code.extend(0x0000u16.to_be_bytes());
    code.extend(word(Opcode::Stop, Width::Byte, false, 0, 0));

    let mut cpu = cpu_with(&code, b"Hello, world!\0");
    cpu.run().unwrap();
    assert_eq!(cpu.into_output(), b"Hello, world!\n");
}

#[test]
fn test_countdown_loop() {
    // r0 counts down from 5, printing a '*' each time.
    //
    //  0: SET.w r0, #5
    //  4: WR.b  #'*'
    //  7: DEC.w r0
    //  9: JNZ   #4
    // 13: STOP
    let mut code = Vec::new();
    code.extend(word(Opcode::Set, Width::Word, true, 0, 0));
    code.extend(5u16.to_be_bytes());
    code.extend(word(Opcode::Wr, Width::Byte, true, 0, 0));
    code.push(b'*');
    code.extend(word(Opcode::Dec, Width::Word, false, 0, 0));
    code.extend(word(Opcode::Jnz, Width::Word, true, 0, 0));
    code.extend(4u16.to_be_bytes());
    code.extend(word(Opcode::Stop, Width::Byte, false, 0, 0));

    let mut cpu = cpu_with(&code, &[]);
    let executed = cpu.run().unwrap();
    assert_eq!(cpu.regs.gp(0), 0);
    assert!(cpu.regs.flags.zero());
    assert_eq!(executed, 1 + 5 * 3 + 1);
    assert_eq!(cpu.output().as_slice(), b"*****");
}

#[test]
fn test_sum_array_with_subroutine() {
    // Sum three big-endian words at data[0x10..0x16] into r0 via a subroutine.
    //
    //  0: SET.w r1, #0x0010
    //  4: SET.w r2, #3
    //  8: CALL  #14
    // 12: STOP
    // 14: LD.w  r3, r1
    // 16: ADD.w r0, r3
    // 18: ADD.w r1, #2
    // 22: DEC.w r2
    // 24: JNZ   #14
    // 28: RETF
    let mut code = Vec::new();
    code.extend(word(Opcode::Set, Width::Word, true, 1, 0));
    code.extend(0x0010u16.to_be_bytes());
    code.extend(word(Opcode::Set, Width::Word, true, 2, 0));
    code.extend(3u16.to_be_bytes());
    code.extend(word(Opcode::Call, Width::Word, true, 0, 0));
    code.extend(14u16.to_be_bytes());
    code.extend(word(Opcode::Stop, Width::Byte, false, 0, 0));
    code.extend(word(Opcode::Ld, Width::Word, false, 3, 1));
    code.extend(word(Opcode::Add, Width::Word, false, 0, 3));
    code.extend(word(Opcode::Add, Width::Word, true, 1, 0));
    code.extend(2u16.to_be_bytes());
    code.extend(word(Opcode::Dec, Width::Word, false, 2, 0));
    code.extend(word(Opcode::Jnz, Width::Word, true, 0, 0));
    code.extend(14u16.to_be_bytes());
    code.extend(word(Opcode::Retf, Width::Word, false, 0, 0));

    let mut data = vec![0u8; 0x10];
    for v in [100u16, 200, 300] {
        data.extend(v.to_be_bytes());
    }

    // The stack starts above the array
    let mut cpu = cpu_with(&code, &data);
    cpu.regs.sp = 0x0100;
    cpu.run().unwrap();

    assert_eq!(cpu.regs.gp(0), 600);
    assert_eq!(cpu.regs.gp(1), 0x0016);
    assert_eq!(cpu.regs.sp, 0x0100);
    assert_eq!(cpu.regs.pc, 14);
}

#[test]
fn test_fault_reports_pc_and_opcode() {
    // NOP ; DIV.w r0, r1 with r1 == 0
    let mut code = Vec::new();
    code.extend(word(Opcode::Nop, Width::Byte, false, 0, 0));
    code.extend(word(Opcode::Div, Width::Word, false, 0, 1));

    let mut cpu = cpu_with(&code, &[]);
    let err = cpu.run().unwrap_err();
    assert_eq!(
        err,
        CpuError::Fault(Fault { kind: FaultKind::DivisionByZero, pc: 2, opcode: 0x13 })
    );
    assert_eq!(err.to_string(), "fault: division by zero at pc=0x0002 (opcode 0x13)");
    assert_eq!(cpu.state, CpuState::Faulted);
    assert_eq!(cpu.step(), Err(CpuError::NotRunning(CpuState::Faulted)));
}

#[test]
fn test_unterminated_string_faults() {
    // WR.w #0xFFF0 with no NUL before the end of the data segment
    let mut code = Vec::new();
    code.extend(word(Opcode::Wr, Width::Word, true, 0, 0));
    code.extend(0xFFF0u16.to_be_bytes());

    let mut data = vec![0u8; 0x10000];
    data[0xFFF0..].fill(b'x');

    let mut cpu = cpu_with(&code, &data);
    let err = cpu.run().unwrap_err();
    assert_eq!(
        err,
        CpuError::Fault(Fault {
            kind: FaultKind::OutOfBounds { segment: Segment::Data, addr: 0xFFF0 },
            pc: 0,
            opcode: 0x50,
        })
    );
    assert!(cpu.output().is_empty());
}

#[test]
fn test_self_modifying_code() {
    // Store a STOP over the trailing NOP, then fall into it.
    //
    //  0: SET.w r0, #0x3400
    //  4: SP.w  r0, #10
    //  8: NOP
    // 10: NOP  (becomes STOP)
    // 12: (unknown opcode, never reached)
    let mut code = Vec::new();
    code.extend(word(Opcode::Set, Width::Word, true, 0, 0));
    code.extend(0x3400u16.to_be_bytes());
    code.extend(word(Opcode::Sp, Width::Word, true, 0, 0));
    code.extend(10u16.to_be_bytes());
    code.extend(word(Opcode::Nop, Width::Byte, false, 0, 0));
    code.extend(word(Opcode::Nop, Width::Byte, false, 0, 0));
    code.extend([0xEE, 0x00]);

    let mut cpu = cpu_with(&code, &[]);
    assert_eq!(cpu.run().unwrap(), 4);
    assert!(cpu.is_halted());
}
