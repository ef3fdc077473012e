//! Arithmetic and logic operations.
//!
//! Each operation works on operands of the given width (zero-extended into a
//! `u16`), updates only the flags it is defined to touch, and returns the
//! result truncated to that width.

use crate::cpu::registers::Width;
use crate::cpu::Flags;

#[inline]
fn wrap(width: Width, val: u32) -> u16 {
    (val & width.mask()) as u16
}

/// `a + b`. Sets carry on unsigned overflow and zero on the wrapped result.
pub fn add(flags: &mut Flags, width: Width, a: u16, b: u16) -> u16 {
    let sum = (a as u32 & width.mask()) + (b as u32 & width.mask());
    let res = wrap(width, sum);
    flags.set_carry(sum > width.mask());
    flags.set_zero(res == 0);
    res
}

/// `a + 1`, flagged like [`add`].
pub fn inc(flags: &mut Flags, width: Width, a: u16) -> u16 {
    add(flags, width, a, 1)
}

/// `a - b`. Sets negative when `a < b` and zero on the wrapped result.
pub fn sub(flags: &mut Flags, width: Width, a: u16, b: u16) -> u16 {
    let diff = (a as u32 & width.mask()) as i32 - (b as u32 & width.mask()) as i32;
    let res = wrap(width, diff as u32);
    flags.set_negative(diff < 0);
    flags.set_zero(res == 0);
    res
}

/// `a - 1`, flagged like [`sub`].
pub fn dec(flags: &mut Flags, width: Width, a: u16) -> u16 {
    sub(flags, width, a, 1)
}

/// Compare `a` with `b`: flags as for [`sub`], result discarded.
pub fn cmp(flags: &mut Flags, width: Width, a: u16, b: u16) {
    sub(flags, width, a, b);
}

/// Double-width product, returned as `(low, high)` halves.
///
/// Carry is set if the product does not fit in twice the width, zero if the
/// product is zero and overflow if the high half is non-zero.
pub fn mul(flags: &mut Flags, width: Width, a: u16, b: u16) -> (u16, u16) {
    let prod = (a as u64 & width.mask() as u64) * (b as u64 & width.mask() as u64);
    let double_mask = (1u64 << (width.bits() * 2)) - 1;
    let low = wrap(width, prod as u32);
    let high = wrap(width, (prod >> width.bits()) as u32);

    flags.set_carry(prod > double_mask);
    flags.set_zero(prod == 0);
    flags.set_overflow(high != 0);
    (low, high)
}

/// Unsigned division, returned as `(quotient, remainder)`.
///
/// Returns `None` without touching the flags if `b` is zero. Otherwise sets
/// zero if the quotient is zero and carry if the remainder is non-zero.
pub fn div(flags: &mut Flags, width: Width, a: u16, b: u16) -> Option<(u16, u16)> {
    let a = wrap(width, a as u32);
    let b = wrap(width, b as u32);
    let quot = a.checked_div(b)?;
    let rem = a % b;

    flags.set_zero(quot == 0);
    flags.set_carry(rem != 0);
    Some((quot, rem))
}

fn logic(flags: &mut Flags, width: Width, val: u32) -> u16 {
    let res = wrap(width, val);
    flags.set_zero(res == 0);
    res
}

pub fn not(flags: &mut Flags, width: Width, a: u16) -> u16 {
    logic(flags, width, !(a as u32))
}

pub fn and(flags: &mut Flags, width: Width, a: u16, b: u16) -> u16 {
    logic(flags, width, (a & b) as u32)
}

pub fn or(flags: &mut Flags, width: Width, a: u16, b: u16) -> u16 {
    logic(flags, width, (a | b) as u32)
}

pub fn xor(flags: &mut Flags, width: Width, a: u16, b: u16) -> u16 {
    logic(flags, width, (a ^ b) as u32)
}

/// Logical shift left by one bit.
pub fn shl(flags: &mut Flags, width: Width, a: u16) -> u16 {
    logic(flags, width, (a as u32) << 1)
}

/// Logical shift right by one bit.
pub fn shr(flags: &mut Flags, width: Width, a: u16) -> u16 {
    logic(flags, width, (a as u32 & width.mask()) >> 1)
}
