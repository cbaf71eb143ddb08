//! Eight-bit values.
//!
//! A [`Byte`] keeps its raw bit pattern in `0..=255` and interprets it
//! through a [`Format`]. The only format the 6502 needs is signed
//! two's complement, which is what branch displacements and the
//! overflow flag are defined against.

use std::fmt;
use std::hash::{Hash, Hasher};
use serde::{Serialize, Deserialize};
use thiserror::Error;

/// How the raw bits of a [`Byte`] are read as an integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Format {
    /// Bit 7 is the sign; negation is `!x + 1`.
    #[default]
    SignedTwosComplement,
}

/// An immutable 8-bit value.
///
/// Every "modifying" operation returns a new `Byte`. Equality and hashing
/// only look at the raw bits, never at the format.
#[derive(Clone, Copy, Default, Serialize, Deserialize)]
pub struct Byte {
    raw: u8,
    #[serde(default)]
    format: Format,
}

impl Byte {
    /// Number of bits in a byte.
    pub const WIDTH: u8 = 8;

    /// Smallest value accepted by [`Byte::signed`].
    pub const MIN_SIGNED: i32 = -128;

    /// Largest value accepted by [`Byte::signed`].
    pub const MAX_SIGNED: i32 = 127;

    /// The all-zero byte.
    pub const ZERO: Byte = Byte::from_u8(0);

    /// Wrap a raw `u8`.
    #[inline]
    pub const fn from_u8(raw: u8) -> Self {
        Self { raw, format: Format::SignedTwosComplement }
    }

    /// Create from any integer, keeping only the low 8 bits.
    ///
    /// `Byte::from_raw(0x1AB)` is `0xAB`, and `Byte::from_raw(-1)` is `0xFF`.
    #[inline]
    pub const fn from_raw(value: i32) -> Self {
        Self::from_u8((value & 0xFF) as u8)
    }

    /// Create from a signed integer in `[-128, 127]`.
    pub fn signed(value: i32) -> Result<Self, DataError> {
        if !(Self::MIN_SIGNED..=Self::MAX_SIGNED).contains(&value) {
            return Err(DataError::InvalidDataType { value });
        }
        Ok(Self::from_raw(value))
    }

    /// The raw bit pattern.
    #[inline]
    pub const fn raw(&self) -> u8 {
        self.raw
    }

    /// The interpretation format.
    #[inline]
    pub const fn format(&self) -> Format {
        self.format
    }

    /// Interpret the bits as an integer according to the format.
    pub const fn as_i32(&self) -> i32 {
        match self.format {
            Format::SignedTwosComplement => {
                let raw = self.raw as i32;
                if raw & 0x80 != 0 {
                    -(((!raw) + 1) & 0xFF)
                } else {
                    raw
                }
            }
        }
    }

    /// Returns true if the value is zero.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.raw == 0
    }

    /// Returns true if bit 7 is set.
    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.raw & 0x80 != 0
    }

    /// Check a single bit (0 = LSB, 7 = MSB).
    pub fn is_bit_set(&self, bit: u8) -> Result<bool, DataError> {
        Ok(self.raw & Self::mask(bit)? != 0)
    }

    /// Return a copy with `bit` set.
    pub fn with_bit(&self, bit: u8) -> Result<Self, DataError> {
        Ok(Self::from_u8(self.raw | Self::mask(bit)?))
    }

    /// Return a copy with `bit` cleared.
    pub fn without_bit(&self, bit: u8) -> Result<Self, DataError> {
        Ok(Self::from_u8(self.raw & !Self::mask(bit)?))
    }

    /// Flip every bit.
    #[inline]
    pub const fn ones_complement(&self) -> Self {
        Self::from_u8(!self.raw)
    }

    /// Negate in two's complement (`!x + 1`). `0x80` maps to itself.
    #[inline]
    pub const fn twos_complement(&self) -> Self {
        Self::from_u8((!self.raw).wrapping_add(1))
    }

    fn mask(bit: u8) -> Result<u8, DataError> {
        if bit >= Self::WIDTH {
            return Err(DataError::BitOutOfRange { bit });
        }
        Ok(1 << bit)
    }
}

impl PartialEq for Byte {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw
    }
}

impl Eq for Byte {}

impl Hash for Byte {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.raw.hash(state);
    }
}

impl PartialEq<u8> for Byte {
    fn eq(&self, other: &u8) -> bool {
        self.raw == *other
    }
}

impl PartialEq<i32> for Byte {
    fn eq(&self, other: &i32) -> bool {
        i32::from(self.raw) == *other
    }
}

impl From<u8> for Byte {
    fn from(raw: u8) -> Self {
        Byte::from_u8(raw)
    }
}

impl From<Byte> for u8 {
    fn from(byte: Byte) -> Self {
        byte.raw
    }
}

impl fmt::Debug for Byte {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Byte(0x{:02X} = {})", self.raw, self.as_i32())
    }
}

impl fmt::Display for Byte {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${:02X}", self.raw)
    }
}

impl fmt::UpperHex for Byte {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::UpperHex::fmt(&self.raw, f)
    }
}

/// Errors raised by the byte/word model.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DataError {
    #[error("invalid data type: {value} is outside the signed byte range [-128, 127]")]
    InvalidDataType { value: i32 },

    #[error("bit index {bit} out of range (0-7)")]
    BitOutOfRange { bit: u8 },
}
