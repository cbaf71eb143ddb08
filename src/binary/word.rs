//! Sixteen-bit values.
//!
//! A [`Word`] is two [`Byte`]s (high, low). It is used for addresses and
//! for the program counter.

use std::fmt;
use serde::{Serialize, Deserialize};
use crate::binary::Byte;

/// An immutable 16-bit value.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Word {
    raw: u16,
}

impl Word {
    /// Number of bits in a word.
    pub const WIDTH: u8 = 16;

    /// The all-zero word.
    pub const ZERO: Word = Word::from_u16(0);

    /// Wrap a raw `u16`.
    #[inline]
    pub const fn from_u16(raw: u16) -> Self {
        Self { raw }
    }

    /// Create from any integer, keeping only the low 16 bits.
    #[inline]
    pub const fn from_raw(value: i32) -> Self {
        Self::from_u16((value & 0xFFFF) as u16)
    }

    /// Combine a high and a low byte.
    #[inline]
    pub const fn from_bytes(high: Byte, low: Byte) -> Self {
        Self::from_u16(((high.raw() as u16) << 8) | low.raw() as u16)
    }

    /// The raw 16-bit value.
    #[inline]
    pub const fn raw(&self) -> u16 {
        self.raw
    }

    /// The raw value widened for indexing.
    #[inline]
    pub const fn as_usize(&self) -> usize {
        self.raw as usize
    }

    /// The most significant byte.
    #[inline]
    pub const fn high(&self) -> Byte {
        Byte::from_u8((self.raw >> 8) as u8)
    }

    /// The least significant byte.
    #[inline]
    pub const fn low(&self) -> Byte {
        Byte::from_u8(self.raw as u8)
    }

    /// Add an offset, wrapping at 16 bits.
    #[inline]
    pub const fn wrapping_add(&self, offset: u16) -> Self {
        Self::from_u16(self.raw.wrapping_add(offset))
    }

    /// Add a signed displacement, wrapping at 16 bits.
    #[inline]
    pub const fn offset_by(&self, displacement: Byte) -> Self {
        Self::from_u16(self.raw.wrapping_add(displacement.as_i32() as u16))
    }

    /// Same page, low byte incremented without carrying into the high byte.
    ///
    /// Models the pointer fetch used by `JMP ($xxFF)` on NMOS parts.
    #[inline]
    pub const fn next_in_page(&self) -> Self {
        Self::from_bytes(self.high(), Byte::from_u8(self.low().raw().wrapping_add(1)))
    }
}

impl From<u16> for Word {
    fn from(raw: u16) -> Self {
        Word::from_u16(raw)
    }
}

impl From<Word> for u16 {
    fn from(word: Word) -> Self {
        word.raw
    }
}

impl From<Byte> for Word {
    fn from(byte: Byte) -> Self {
        Word::from_bytes(Byte::ZERO, byte)
    }
}

impl PartialEq<u16> for Word {
    fn eq(&self, other: &u16) -> bool {
        self.raw == *other
    }
}

impl PartialEq<i32> for Word {
    fn eq(&self, other: &i32) -> bool {
        i32::from(self.raw) == *other
    }
}

impl fmt::Debug for Word {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Word(0x{:04X})", self.raw)
    }
}

impl fmt::Display for Word {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${:04X}", self.raw)
    }
}

impl fmt::UpperHex for Word {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::UpperHex::fmt(&self.raw, f)
    }
}
