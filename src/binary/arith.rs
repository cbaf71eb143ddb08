//! Eight-bit ALU operations.
//!
//! These mirror what the 6502's ALU does to a byte and which carry and
//! overflow bits fall out. Flag bookkeeping beyond carry/overflow (zero,
//! negative) is left to the caller since it is derived from the result.

use crate::binary::Byte;

/// Output of an addition: result, carry out, signed overflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sum {
    pub value: Byte,
    pub carry: bool,
    pub overflow: bool,
}

/// Add two bytes and a carry bit.
///
/// Carry is set when the unsigned sum exceeds 255. Overflow is set when
/// both operands share a sign and the result does not.
pub fn add_with_carry(a: Byte, b: Byte, carry_in: bool) -> Sum {
    let unsigned = u16::from(a.raw()) + u16::from(b.raw()) + u16::from(carry_in);
    let value = Byte::from_raw(i32::from(unsigned));
    let overflow = a.is_negative() == b.is_negative() && value.is_negative() != a.is_negative();

    Sum {
        value,
        carry: unsigned > 0xFF,
        overflow,
    }
}

/// Subtract `b` and the inverted carry (borrow) from `a`.
///
/// Done exactly as the hardware does it: add the one's complement of `b`.
#[inline]
pub fn subtract_with_borrow(a: Byte, b: Byte, carry_in: bool) -> Sum {
    add_with_carry(a, b.ones_complement(), carry_in)
}

/// Shift left one bit. Returns (result, bit shifted out of bit 7).
pub fn shift_left(a: Byte) -> (Byte, bool) {
    (Byte::from_u8(a.raw() << 1), a.is_negative())
}

/// Shift right one bit. Returns (result, bit shifted out of bit 0).
pub fn shift_right(a: Byte) -> (Byte, bool) {
    (Byte::from_u8(a.raw() >> 1), a.raw() & 0x01 != 0)
}

/// Rotate left through carry: bit 0 takes `carry_in`, bit 7 goes out.
pub fn rotate_left(a: Byte, carry_in: bool) -> (Byte, bool) {
    let (shifted, carry_out) = shift_left(a);
    (Byte::from_u8(shifted.raw() | u8::from(carry_in)), carry_out)
}

/// Rotate right through carry: bit 7 takes `carry_in`, bit 0 goes out.
pub fn rotate_right(a: Byte, carry_in: bool) -> (Byte, bool) {
    let (shifted, carry_out) = shift_right(a);
    (Byte::from_u8(shifted.raw() | (u8::from(carry_in) << 7)), carry_out)
}

/// Compare a register against an operand.
///
/// Returns `register - operand` (wrapped) and whether the register is
/// greater than or equal to the operand, unsigned.
pub fn compare(register: Byte, operand: Byte) -> (Byte, bool) {
    let difference = Byte::from_u8(register.raw().wrapping_sub(operand.raw()));
    (difference, register.raw() >= operand.raw())
}

/// Increment with 8-bit wraparound.
#[inline]
pub fn increment(a: Byte) -> Byte {
    Byte::from_u8(a.raw().wrapping_add(1))
}

/// Decrement with 8-bit wraparound.
#[inline]
pub fn decrement(a: Byte) -> Byte {
    Byte::from_u8(a.raw().wrapping_sub(1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn b(raw: u8) -> Byte {
        Byte::from_u8(raw)
    }

    #[test]
    fn test_add_simple() {
        let sum = add_with_carry(b(0x01), b(0x01), false);
        assert_eq!(sum, Sum { value: b(0x02), carry: false, overflow: false });
    }

    #[test]
    fn test_add_carry_in() {
        let sum = add_with_carry(b(0x01), b(0x01), true);
        assert_eq!(sum.value, 0x03u8);
    }

    #[test]
    fn test_add_unsigned_carry_out() {
        let sum = add_with_carry(b(0xFF), b(0x01), false);
        assert_eq!(sum.value, Byte::ZERO);
        assert!(sum.carry);
        assert!(!sum.overflow);
    }

    #[test]
    fn test_add_signed_overflow() {
        // 127 + 1 = -128
        let sum = add_with_carry(b(0x7F), b(0x01), false);
        assert_eq!(sum.value, 0x80u8);
        assert!(sum.overflow);
        assert!(!sum.carry);

        // -128 + -1 = +127
        let sum = add_with_carry(b(0x80), b(0xFF), false);
        assert_eq!(sum.value, 0x7Fu8);
        assert!(sum.overflow);
        assert!(sum.carry);
    }

    #[test]
    fn test_subtract() {
        // 5 - 3 with carry set (no borrow)
        let diff = subtract_with_borrow(b(5), b(3), true);
        assert_eq!(diff.value, 2u8);
        assert!(diff.carry);

        // 3 - 5 borrows
        let diff = subtract_with_borrow(b(3), b(5), true);
        assert_eq!(diff.value, 0xFEu8);
        assert!(!diff.carry);

        // carry clear subtracts one more
        let diff = subtract_with_borrow(b(5), b(3), false);
        assert_eq!(diff.value, 1u8);
    }

    #[test]
    fn test_subtract_overflow() {
        // -128 - 1 = +127 (overflow)
        let diff = subtract_with_borrow(b(0x80), b(0x01), true);
        assert_eq!(diff.value, 0x7Fu8);
        assert!(diff.overflow);
    }

    #[test]
    fn test_shifts() {
        assert_eq!(shift_left(b(0b1000_0001)), (b(0b0000_0010), true));
        assert_eq!(shift_right(b(0b1000_0001)), (b(0b0100_0000), true));
        assert_eq!(shift_right(b(0b0000_0010)), (b(0b0000_0001), false));
    }

    #[test]
    fn test_rotates_go_through_carry() {
        assert_eq!(rotate_left(b(0b1000_0000), false), (b(0), true));
        assert_eq!(rotate_left(b(0b0000_0000), true), (b(1), false));
        assert_eq!(rotate_right(b(0b0000_0001), false), (b(0), true));
        assert_eq!(rotate_right(b(0b0000_0000), true), (b(0x80), false));
    }

    #[test]
    fn test_compare() {
        assert_eq!(compare(b(5), b(5)), (b(0), true));
        assert_eq!(compare(b(6), b(5)), (b(1), true));
        assert_eq!(compare(b(4), b(5)), (b(0xFF), false));
    }

    #[test]
    fn test_inc_dec_wrap() {
        assert_eq!(increment(b(0xFF)), Byte::ZERO);
        assert_eq!(decrement(Byte::ZERO), 0xFFu8);
    }

    proptest! {
        #[test]
        fn prop_add_matches_integer_arithmetic(a in any::<u8>(), x in any::<u8>(), c in any::<bool>()) {
            let sum = add_with_carry(b(a), b(x), c);
            let unsigned = a as u32 + x as u32 + c as u32;
            prop_assert_eq!(sum.value.raw() as u32, unsigned & 0xFF);
            prop_assert_eq!(sum.carry, unsigned > 0xFF);

            let signed = b(a).as_i32() + b(x).as_i32() + c as i32;
            prop_assert_eq!(sum.overflow, !(-128..=127).contains(&signed));
        }

        #[test]
        fn prop_subtract_matches_integer_arithmetic(a in any::<u8>(), x in any::<u8>(), c in any::<bool>()) {
            let diff = subtract_with_borrow(b(a), b(x), c);
            let borrow = !c as i32;
            let unsigned = a as i32 - x as i32 - borrow;
            prop_assert_eq!(diff.value.raw() as i32, unsigned & 0xFF);
            prop_assert_eq!(diff.carry, unsigned >= 0);

            let signed = b(a).as_i32() - b(x).as_i32() - borrow;
            prop_assert_eq!(diff.overflow, !(-128..=127).contains(&signed));
        }
    }
}
