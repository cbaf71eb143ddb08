//! 6502 addressing modes.
//!
//! The mode decides how many operand bytes follow the opcode and how they
//! turn into an effective address or an immediate value.

use std::fmt;
use serde::{Serialize, Deserialize};
use crate::cpu::decode::DecodeError;

/// Index register applied by an indexed mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Index {
    X,
    Y,
}

impl fmt::Display for Index {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Index::X => write!(f, "X"),
            Index::Y => write!(f, "Y"),
        }
    }
}

/// How an instruction finds its operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AddressingMode {
    /// No operand.
    Implied,
    /// Operates on the accumulator.
    Accumulator,
    /// `#$nn`: the operand byte is the value.
    Immediate,
    /// Signed 8-bit displacement from the next instruction (branches).
    Relative,
    /// `$nn`
    ZeroPage,
    /// `$nn,X`, wrapping within page zero.
    ZeroPageX,
    /// `$nn,Y`, wrapping within page zero.
    ZeroPageY,
    /// `$nnnn`
    Absolute,
    /// `$nnnn,X`
    AbsoluteX,
    /// `$nnnn,Y`
    AbsoluteY,
    /// `($nnnn)`: JMP only.
    Indirect,
    /// `($nn,X)`: pointer in page zero at operand + X.
    IndirectX,
    /// `($nn),Y`: pointer in page zero at operand, then + Y.
    IndirectY,
}

impl AddressingMode {
    /// Every mode.
    pub const ALL: [AddressingMode; 13] = [
        AddressingMode::Implied,
        AddressingMode::Accumulator,
        AddressingMode::Immediate,
        AddressingMode::Relative,
        AddressingMode::ZeroPage,
        AddressingMode::ZeroPageX,
        AddressingMode::ZeroPageY,
        AddressingMode::Absolute,
        AddressingMode::AbsoluteX,
        AddressingMode::AbsoluteY,
        AddressingMode::Indirect,
        AddressingMode::IndirectX,
        AddressingMode::IndirectY,
    ];

    /// Total instruction length in bytes, opcode included.
    pub const fn instruction_bytes(self) -> u8 {
        match self {
            AddressingMode::Implied | AddressingMode::Accumulator => 1,
            AddressingMode::Immediate
            | AddressingMode::Relative
            | AddressingMode::ZeroPage
            | AddressingMode::ZeroPageX
            | AddressingMode::ZeroPageY
            | AddressingMode::IndirectX
            | AddressingMode::IndirectY => 2,
            AddressingMode::Absolute
            | AddressingMode::AbsoluteX
            | AddressingMode::AbsoluteY
            | AddressingMode::Indirect => 3,
        }
    }

    /// Number of operand bytes after the opcode.
    #[inline]
    pub const fn operand_bytes(self) -> u8 {
        self.instruction_bytes() - 1
    }

    /// The unindexed family name, e.g. "Zero Page" for `ZeroPageX`.
    pub const fn name(self) -> &'static str {
        match self {
            AddressingMode::Implied => "Implied",
            AddressingMode::Accumulator => "Accumulator",
            AddressingMode::Immediate => "Immediate",
            AddressingMode::Relative => "Relative",
            AddressingMode::ZeroPage | AddressingMode::ZeroPageX | AddressingMode::ZeroPageY => "Zero Page",
            AddressingMode::Absolute | AddressingMode::AbsoluteX | AddressingMode::AbsoluteY => "Absolute",
            AddressingMode::Indirect | AddressingMode::IndirectX | AddressingMode::IndirectY => "Indirect",
        }
    }

    /// The index register this mode adds, if any.
    pub const fn index(self) -> Option<Index> {
        match self {
            AddressingMode::ZeroPageX | AddressingMode::AbsoluteX | AddressingMode::IndirectX => Some(Index::X),
            AddressingMode::ZeroPageY | AddressingMode::AbsoluteY | AddressingMode::IndirectY => Some(Index::Y),
            _ => None,
        }
    }

    /// The X-indexed variant of an indexable mode.
    ///
    /// Only ZeroPage, Absolute and Indirect have one. An `Err` here means
    /// the caller asked for a mode that cannot exist; treat it as a bug,
    /// not as bad input to recover from.
    pub fn x_indexed(self) -> Result<Self, DecodeError> {
        match self {
            AddressingMode::ZeroPage => Ok(AddressingMode::ZeroPageX),
            AddressingMode::Absolute => Ok(AddressingMode::AbsoluteX),
            AddressingMode::Indirect => Ok(AddressingMode::IndirectX),
            other => Err(DecodeError::NotIndexable(other)),
        }
    }

    /// The Y-indexed variant of an indexable mode.
    ///
    /// Only ZeroPage, Absolute and Indirect have one. An `Err` here means
    /// the caller asked for a mode that cannot exist; treat it as a bug,
    /// not as bad input to recover from.
    pub fn y_indexed(self) -> Result<Self, DecodeError> {
        match self {
            AddressingMode::ZeroPage => Ok(AddressingMode::ZeroPageY),
            AddressingMode::Absolute => Ok(AddressingMode::AbsoluteY),
            AddressingMode::Indirect => Ok(AddressingMode::IndirectY),
            other => Err(DecodeError::NotIndexable(other)),
        }
    }
}

impl fmt::Display for AddressingMode {
    /// "Zero Page", or "Zero Page [X]" for an indexed mode.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())?;
        if let Some(index) = self.index() {
            write!(f, " [{}]", index)?;
        }
        Ok(())
    }
}
