//! Property tests for arithmetic, stack and call semantics.

use emu16::{Cpu, Instruction, Memory, Opcode, Width};
use proptest::prelude::*;

const W: Width = Width::Word;
const B: Width = Width::Byte;

fn emit(code: &mut Vec<u8>, opcode: Opcode, width: Width, immediate: bool, r1: u8, r2: u8) {
    let word = Instruction::new(opcode, width, immediate, r1, r2).encode();
    code.extend(word.to_be_bytes());
}

fn set_word(code: &mut Vec<u8>, reg: u8, val: u16) {
    emit(code, Opcode::Set, W, true, reg, 0);
    code.extend(val.to_be_bytes());
}

fn run(code: &[u8], sp: u16) -> Cpu<Vec<u8>> {
    let mut cpu = Cpu::with_output(Memory::from_image(code).unwrap(), Memory::new(), Vec::new());
    cpu.regs.sp = sp;
    cpu.run().unwrap();
    assert!(cpu.is_halted());
    cpu
}

fn binary(op: Opcode, a: u16, b: u16) -> Cpu<Vec<u8>> {
    let mut code = Vec::new();
    set_word(&mut code, 0, a);
    set_word(&mut code, 1, b);
    emit(&mut code, op, W, false, 0, 1);
    emit(&mut code, Opcode::Stop, B, false, 0, 0);
    run(&code, 0)
}

proptest! {
    #[test]
    fn add_wraps_and_sets_carry(a: u16, b: u16) {
        let cpu = binary(Opcode::Add, a, b);
        let sum = a as u32 + b as u32;
        prop_assert_eq!(cpu.regs.gp(0) as u32, sum % 65536);
        prop_assert_eq!(cpu.regs.flags.carry(), sum > 0xFFFF);
        prop_assert_eq!(cpu.regs.flags.zero(), sum % 65536 == 0);
    }

    #[test]
    fn sub_sets_negative_when_smaller(a: u16, b: u16) {
        let cpu = binary(Opcode::Sub, a, b);
        prop_assert_eq!(cpu.regs.gp(0), a.wrapping_sub(b));
        prop_assert_eq!(cpu.regs.flags.negative(), a < b);
        prop_assert_eq!(cpu.regs.flags.zero(), a == b);
    }

    #[test]
    fn mul_splits_product(a: u16, b: u16) {
        let cpu = binary(Opcode::Mul, a, b);
        let prod = a as u32 * b as u32;
        prop_assert_eq!(cpu.regs.gp(0), prod as u16);
        prop_assert_eq!(cpu.regs.gp(1), (prod >> 16) as u16);
        prop_assert_eq!(cpu.regs.flags.overflow(), (prod >> 16) != 0);
        prop_assert_eq!(cpu.regs.flags.zero(), prod == 0);
    }

    #[test]
    fn div_satisfies_identity(a: u16, b in 1u16..) {
        let cpu = binary(Opcode::Div, a, b);
        let (q, r) = (cpu.regs.gp(0) as u32, cpu.regs.gp(1) as u32);
        prop_assert_eq!(q * b as u32 + r, a as u32);
        prop_assert!(r < b as u32);
        prop_assert_eq!(cpu.regs.flags.carry(), r != 0);
    }

    #[test]
    fn push_pull_word_restores(val: u16, sp in 0u16..0xFF00) {
        let mut code = Vec::new();
        set_word(&mut code, 2, val);
        emit(&mut code, Opcode::Push, W, false, 2, 0);
        set_word(&mut code, 2, !val);
        emit(&mut code, Opcode::Pull, W, false, 2, 0);
        emit(&mut code, Opcode::Stop, B, false, 0, 0);

        let cpu = run(&code, sp);
        prop_assert_eq!(cpu.regs.gp(2), val);
        prop_assert_eq!(cpu.regs.sp, sp);
    }

    #[test]
    fn push_pull_byte_restores(val: u16, sp in 0u16..0xFF00) {
        // Round-trip through the high byte of r3, leaving the low byte alone
        let mut code = Vec::new();
        set_word(&mut code, 3, val);
        emit(&mut code, Opcode::Push, B, false, 7, 0);
        emit(&mut code, Opcode::Set, B, true, 7, 0);
        code.push(!(val >> 8) as u8);
        emit(&mut code, Opcode::Pull, B, false, 7, 0);
        emit(&mut code, Opcode::Stop, B, false, 0, 0);

        let cpu = run(&code, sp);
        prop_assert_eq!(cpu.regs.gp(3), val);
        prop_assert_eq!(cpu.regs.sp, sp);
    }

    #[test]
    fn call_then_retf_resumes_after_call(target in 6u16..0xFFF0, sp in 0u16..0xFF00) {
        // 0: CALL #target ; 4: STOP ; target: RETF
        let mut code = vec![0u8; target as usize + 2];
        let mut head = Vec::new();
        emit(&mut head, Opcode::Call, W, true, 0, 0);
        head.extend(target.to_be_bytes());
        emit(&mut head, Opcode::Stop, B, false, 0, 0);
        code[..head.len()].copy_from_slice(&head);

        let mut retf = Vec::new();
        emit(&mut retf, Opcode::Retf, W, false, 0, 0);
        code[target as usize..].copy_from_slice(&retf);

        let cpu = run(&code, sp);
        prop_assert_eq!(cpu.regs.pc, 6);
        prop_assert_eq!(cpu.regs.sp, sp);
        prop_assert_eq!(cpu.cycles, 3);
    }
}
