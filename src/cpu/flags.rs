//! The flags register.
//!
//! Only the low five bits carry meaning. The remaining bits are reserved but
//! kept as written, since the whole word is addressable as register 6.

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flags(u16);

impl Flags {
    pub const ZERO_SHIFT: u16 = 0;
    pub const NEGATIVE_SHIFT: u16 = 1;
    pub const CARRY_SHIFT: u16 = 2;
    pub const OVERFLOW_SHIFT: u16 = 3;
    pub const INT_ENABLE_SHIFT: u16 = 4;

    pub const Z: u16 = 0x1 << Self::ZERO_SHIFT;
    pub const N: u16 = 0x1 << Self::NEGATIVE_SHIFT;
    pub const C: u16 = 0x1 << Self::CARRY_SHIFT;
    pub const V: u16 = 0x1 << Self::OVERFLOW_SHIFT;
    pub const I: u16 = 0x1 << Self::INT_ENABLE_SHIFT;

    const ARITH_MASK: u16 = Self::Z | Self::N | Self::C | Self::V;

    pub fn new() -> Flags {
        Default::default()
    }

    pub fn from_bits(raw: u16) -> Self {
        Flags(raw)
    }

    pub fn bits(&self) -> u16 {
        self.0
    }

    fn get(&self, mask: u16) -> bool {
        (self.0 & mask) != 0
    }

    fn set(&mut self, mask: u16, val: bool) {
        if val {
            self.0 |= mask;
        } else {
            self.0 &= !mask;
        }
    }

    pub fn zero(&self) -> bool {
        self.get(Self::Z)
    }

    pub fn set_zero(&mut self, val: bool) {
        self.set(Self::Z, val);
    }

    pub fn negative(&self) -> bool {
        self.get(Self::N)
    }

    pub fn set_negative(&mut self, val: bool) {
        self.set(Self::N, val);
    }

    pub fn carry(&self) -> bool {
        self.get(Self::C)
    }

    pub fn set_carry(&mut self, val: bool) {
        self.set(Self::C, val);
    }

    pub fn overflow(&self) -> bool {
        self.get(Self::V)
    }

    pub fn set_overflow(&mut self, val: bool) {
        self.set(Self::V, val);
    }

    pub fn int_enable(&self) -> bool {
        self.get(Self::I)
    }

    pub fn set_int_enable(&mut self, val: bool) {
        self.set(Self::I, val);
    }

    /// Clear zero, negative, carry and overflow. Interrupt-enable is untouched.
    pub fn clear_arithmetic(&mut self) {
        self.0 &= !Self::ARITH_MASK;
    }
}

impl std::fmt::Debug for Flags {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let bit = |set: bool, c: char| if set { c } else { '-' };
        write!(
            f,
            "Flags({}{}{}{}{})",
            bit(self.int_enable(), 'I'),
            bit(self.overflow(), 'V'),
            bit(self.carry(), 'C'),
            bit(self.negative(), 'N'),
            bit(self.zero(), 'Z'),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bit_positions() {
        let mut f = Flags::new();
        f.set_zero(true);
        assert_eq!(f.bits(), 0b00001);
        f.set_negative(true);
        assert_eq!(f.bits(), 0b00011);
        f.set_carry(true);
        assert_eq!(f.bits(), 0b00111);
        f.set_overflow(true);
        assert_eq!(f.bits(), 0b01111);
        f.set_int_enable(true);
        assert_eq!(f.bits(), 0b11111);

        f.set_carry(false);
        assert_eq!(f.bits(), 0b11011);
        assert!(!f.carry());
    }

    #[test]
    fn test_clear_arithmetic_keeps_int_enable() {
        let mut f = Flags::from_bits(0xFFFF);
        f.clear_arithmetic();
        assert!(!f.zero() && !f.negative() && !f.carry() && !f.overflow());
        assert!(f.int_enable());
        assert_eq!(f.bits(), 0xFFF0);
    }

    #[test]
    fn test_debug_format() {
        let f = Flags::from_bits(Flags::Z | Flags::C);
        assert_eq!(format!("{:?}", f), "Flags(--C-Z)");
    }
}
