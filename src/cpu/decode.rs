//! The 6502 instruction catalog and decoder.
//!
//! Every documented NMOS opcode is listed exactly once in [`CATALOG`] as a
//! (mnemonic, addressing mode, byte) triple. Decoding goes both ways:
//! byte to [`OpCode`] for the CPU, and mnemonic (+ mode) to [`OpCode`] for
//! the assembler. The catalog is checked at compile time for duplicate
//! bytes and duplicate mnemonic/mode pairs.

use std::fmt;
use std::str::FromStr;
use serde::{Serialize, Deserialize};
use thiserror::Error;
use crate::binary::Byte;
use crate::cpu::addressing::AddressingMode;

macro_rules! mnemonics {
    ($($variant:ident => $text:literal, $summary:literal;)+) => {
        /// Instruction mnemonics of the documented 6502 instruction set.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum Mnemonic {
            $(
                #[doc = $summary]
                $variant,
            )+
        }

        impl Mnemonic {
            /// Every mnemonic, alphabetically.
            pub const ALL: &'static [Mnemonic] = &[$(Mnemonic::$variant),+];

            /// The three-letter assembler name.
            pub const fn as_str(self) -> &'static str {
                match self {
                    $(Mnemonic::$variant => $text,)+
                }
            }

            /// What the instruction does, in words.
            pub const fn summary(self) -> &'static str {
                match self {
                    $(Mnemonic::$variant => $summary,)+
                }
            }
        }

        impl FromStr for Mnemonic {
            type Err = DecodeError;

            fn from_str(name: &str) -> Result<Self, Self::Err> {
                match name.trim().to_ascii_uppercase().as_str() {
                    $($text => Ok(Mnemonic::$variant),)+
                    _ => Err(DecodeError::UnknownMnemonic(name.to_string())),
                }
            }
        }
    };
}

mnemonics! {
    Adc => "ADC", "Add with Carry";
    And => "AND", "Logical AND";
    Asl => "ASL", "Arithmetic Shift Left";
    Bcc => "BCC", "Branch if Carry Clear";
    Bcs => "BCS", "Branch if Carry Set";
    Beq => "BEQ", "Branch if Equal";
    Bit => "BIT", "Bit Test";
    Bmi => "BMI", "Branch if Minus";
    Bne => "BNE", "Branch if Not Equal";
    Bpl => "BPL", "Branch if Positive";
    Brk => "BRK", "Force Interrupt";
    Bvc => "BVC", "Branch if Overflow Clear";
    Bvs => "BVS", "Branch if Overflow Set";
    Clc => "CLC", "Clear Carry Flag";
    Cld => "CLD", "Clear Decimal Mode";
    Cli => "CLI", "Clear Interrupt Disable";
    Clv => "CLV", "Clear Overflow Flag";
    Cmp => "CMP", "Compare Accumulator";
    Cpx => "CPX", "Compare X Register";
    Cpy => "CPY", "Compare Y Register";
    Dec => "DEC", "Decrement Memory";
    Dex => "DEX", "Decrement X Register";
    Dey => "DEY", "Decrement Y Register";
    Eor => "EOR", "Exclusive OR";
    Inc => "INC", "Increment Memory";
    Inx => "INX", "Increment X Register";
    Iny => "INY", "Increment Y Register";
    Jmp => "JMP", "Jump";
    Jsr => "JSR", "Jump to Subroutine";
    Lda => "LDA", "Load Accumulator";
    Ldx => "LDX", "Load X Register";
    Ldy => "LDY", "Load Y Register";
    Lsr => "LSR", "Logical Shift Right";
    Nop => "NOP", "No Operation";
    Ora => "ORA", "Logical Inclusive OR";
    Pha => "PHA", "Push Accumulator";
    Php => "PHP", "Push Processor Status";
    Pla => "PLA", "Pull Accumulator";
    Plp => "PLP", "Pull Processor Status";
    Rol => "ROL", "Rotate Left";
    Ror => "ROR", "Rotate Right";
    Rti => "RTI", "Return from Interrupt";
    Rts => "RTS", "Return from Subroutine";
    Sbc => "SBC", "Subtract with Carry";
    Sec => "SEC", "Set Carry Flag";
    Sed => "SED", "Set Decimal Flag";
    Sei => "SEI", "Set Interrupt Disable";
    Sta => "STA", "Store Accumulator";
    Stx => "STX", "Store X Register";
    Sty => "STY", "Store Y Register";
    Tax => "TAX", "Transfer Accumulator to X";
    Tay => "TAY", "Transfer Accumulator to Y";
    Tsx => "TSX", "Transfer Stack Pointer to X";
    Txa => "TXA", "Transfer X to Accumulator";
    Txs => "TXS", "Transfer X to Stack Pointer";
    Tya => "TYA", "Transfer Y to Accumulator";
}

impl Mnemonic {
    /// Returns true for the conditional branches.
    pub const fn is_branch(self) -> bool {
        matches!(
            self,
            Mnemonic::Bcc | Mnemonic::Bcs | Mnemonic::Beq | Mnemonic::Bmi
                | Mnemonic::Bne | Mnemonic::Bpl | Mnemonic::Bvc | Mnemonic::Bvs
        )
    }
}

impl fmt::Display for Mnemonic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One catalog entry: a mnemonic in one addressing mode, and its byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct OpCode {
    mnemonic: Mnemonic,
    mode: AddressingMode,
    code: u8,
}

macro_rules! op {
    ($mnemonic:ident, $mode:ident, $code:literal) => {
        OpCode {
            mnemonic: Mnemonic::$mnemonic,
            mode: AddressingMode::$mode,
            code: $code,
        }
    };
}

/// Every documented opcode.
pub const CATALOG: [OpCode; 151] = [
    op!(Adc, Immediate, 0x69), op!(Adc, ZeroPage, 0x65), op!(Adc, ZeroPageX, 0x75),
    op!(Adc, Absolute, 0x6D), op!(Adc, AbsoluteX, 0x7D), op!(Adc, AbsoluteY, 0x79),
    op!(Adc, IndirectX, 0x61), op!(Adc, IndirectY, 0x71),

    op!(And, Immediate, 0x29), op!(And, ZeroPage, 0x25), op!(And, ZeroPageX, 0x35),
    op!(And, Absolute, 0x2D), op!(And, AbsoluteX, 0x3D), op!(And, AbsoluteY, 0x39),
    op!(And, IndirectX, 0x21), op!(And, IndirectY, 0x31),

    op!(Asl, Accumulator, 0x0A), op!(Asl, ZeroPage, 0x06), op!(Asl, ZeroPageX, 0x16),
    op!(Asl, Absolute, 0x0E), op!(Asl, AbsoluteX, 0x1E),

    op!(Bcc, Relative, 0x90), op!(Bcs, Relative, 0xB0), op!(Beq, Relative, 0xF0),
    op!(Bmi, Relative, 0x30), op!(Bne, Relative, 0xD0), op!(Bpl, Relative, 0x10),
    op!(Bvc, Relative, 0x50), op!(Bvs, Relative, 0x70),

    op!(Bit, ZeroPage, 0x24), op!(Bit, Absolute, 0x2C),

    op!(Brk, Implied, 0x00),

    op!(Clc, Implied, 0x18), op!(Cld, Implied, 0xD8), op!(Cli, Implied, 0x58),
    op!(Clv, Implied, 0xB8),

    op!(Cmp, Immediate, 0xC9), op!(Cmp, ZeroPage, 0xC5), op!(Cmp, ZeroPageX, 0xD5),
    op!(Cmp, Absolute, 0xCD), op!(Cmp, AbsoluteX, 0xDD), op!(Cmp, AbsoluteY, 0xD9),
    op!(Cmp, IndirectX, 0xC1), op!(Cmp, IndirectY, 0xD1),

    op!(Cpx, Immediate, 0xE0), op!(Cpx, ZeroPage, 0xE4), op!(Cpx, Absolute, 0xEC),
    op!(Cpy, Immediate, 0xC0), op!(Cpy, ZeroPage, 0xC4), op!(Cpy, Absolute, 0xCC),

    op!(Dec, ZeroPage, 0xC6), op!(Dec, ZeroPageX, 0xD6), op!(Dec, Absolute, 0xCE),
    op!(Dec, AbsoluteX, 0xDE),
    op!(Dex, Implied, 0xCA), op!(Dey, Implied, 0x88),

    op!(Eor, Immediate, 0x49), op!(Eor, ZeroPage, 0x45), op!(Eor, ZeroPageX, 0x55),
    op!(Eor, Absolute, 0x4D), op!(Eor, AbsoluteX, 0x5D), op!(Eor, AbsoluteY, 0x59),
    op!(Eor, IndirectX, 0x41), op!(Eor, IndirectY, 0x51),

    op!(Inc, ZeroPage, 0xE6), op!(Inc, ZeroPageX, 0xF6), op!(Inc, Absolute, 0xEE),
    op!(Inc, AbsoluteX, 0xFE),
    op!(Inx, Implied, 0xE8), op!(Iny, Implied, 0xC8),

    op!(Jmp, Absolute, 0x4C), op!(Jmp, Indirect, 0x6C),
    op!(Jsr, Absolute, 0x20),

    op!(Lda, Immediate, 0xA9), op!(Lda, ZeroPage, 0xA5), op!(Lda, ZeroPageX, 0xB5),
    op!(Lda, Absolute, 0xAD), op!(Lda, AbsoluteX, 0xBD), op!(Lda, AbsoluteY, 0xB9),
    op!(Lda, IndirectX, 0xA1), op!(Lda, IndirectY, 0xB1),

    op!(Ldx, Immediate, 0xA2), op!(Ldx, ZeroPage, 0xA6), op!(Ldx, ZeroPageY, 0xB6),
    op!(Ldx, Absolute, 0xAE), op!(Ldx, AbsoluteY, 0xBE),

    op!(Ldy, Immediate, 0xA0), op!(Ldy, ZeroPage, 0xA4), op!(Ldy, ZeroPageX, 0xB4),
    op!(Ldy, Absolute, 0xAC), op!(Ldy, AbsoluteX, 0xBC),

    op!(Lsr, Accumulator, 0x4A), op!(Lsr, ZeroPage, 0x46), op!(Lsr, ZeroPageX, 0x56),
    op!(Lsr, Absolute, 0x4E), op!(Lsr, AbsoluteX, 0x5E),

    op!(Nop, Implied, 0xEA),

    op!(Ora, Immediate, 0x09), op!(Ora, ZeroPage, 0x05), op!(Ora, ZeroPageX, 0x15),
    op!(Ora, Absolute, 0x0D), op!(Ora, AbsoluteX, 0x1D), op!(Ora, AbsoluteY, 0x19),
    op!(Ora, IndirectX, 0x01), op!(Ora, IndirectY, 0x11),

    op!(Pha, Implied, 0x48), op!(Php, Implied, 0x08), op!(Pla, Implied, 0x68),
    op!(Plp, Implied, 0x28),

    op!(Rol, Accumulator, 0x2A), op!(Rol, ZeroPage, 0x26), op!(Rol, ZeroPageX, 0x36),
    op!(Rol, Absolute, 0x2E), op!(Rol, AbsoluteX, 0x3E),

    op!(Ror, Accumulator, 0x6A), op!(Ror, ZeroPage, 0x66), op!(Ror, ZeroPageX, 0x76),
    op!(Ror, Absolute, 0x6E), op!(Ror, AbsoluteX, 0x7E),

    op!(Rti, Implied, 0x40), op!(Rts, Implied, 0x60),

    op!(Sbc, Immediate, 0xE9), op!(Sbc, ZeroPage, 0xE5), op!(Sbc, ZeroPageX, 0xF5),
    op!(Sbc, Absolute, 0xED), op!(Sbc, AbsoluteX, 0xFD), op!(Sbc, AbsoluteY, 0xF9),
    op!(Sbc, IndirectX, 0xE1), op!(Sbc, IndirectY, 0xF1),

    op!(Sec, Implied, 0x38), op!(Sed, Implied, 0xF8), op!(Sei, Implied, 0x78),

    op!(Sta, ZeroPage, 0x85), op!(Sta, ZeroPageX, 0x95), op!(Sta, Absolute, 0x8D),
    op!(Sta, AbsoluteX, 0x9D), op!(Sta, AbsoluteY, 0x99), op!(Sta, IndirectX, 0x81),
    op!(Sta, IndirectY, 0x91),

    op!(Stx, ZeroPage, 0x86), op!(Stx, ZeroPageY, 0x96), op!(Stx, Absolute, 0x8E),
    op!(Sty, ZeroPage, 0x84), op!(Sty, ZeroPageX, 0x94), op!(Sty, Absolute, 0x8C),

    op!(Tax, Implied, 0xAA), op!(Tay, Implied, 0xA8), op!(Tsx, Implied, 0xBA),
    op!(Txa, Implied, 0x8A), op!(Txs, Implied, 0x9A), op!(Tya, Implied, 0x98),
];

/// No two entries share a byte, and no mnemonic/mode pair appears twice.
const fn catalog_is_consistent() -> bool {
    let mut i = 0;
    while i < CATALOG.len() {
        let mut j = i + 1;
        while j < CATALOG.len() {
            let (a, b) = (CATALOG[i], CATALOG[j]);
            if a.code == b.code {
                return false;
            }
            if a.mnemonic as u8 == b.mnemonic as u8 && a.mode as u8 == b.mode as u8 {
                return false;
            }
            j += 1;
        }
        i += 1;
    }
    true
}

const _: () = assert!(catalog_is_consistent(), "opcode catalog has a duplicate entry");

const fn build_decode_table() -> [Option<OpCode>; 256] {
    let mut table = [None; 256];
    let mut i = 0;
    while i < CATALOG.len() {
        table[CATALOG[i].code as usize] = Some(CATALOG[i]);
        i += 1;
    }
    table
}

static DECODE_TABLE: [Option<OpCode>; 256] = build_decode_table();

impl OpCode {
    /// Decode an opcode byte.
    pub fn from_byte(byte: Byte) -> Result<Self, DecodeError> {
        DECODE_TABLE[usize::from(byte.raw())].ok_or(DecodeError::UnknownOpcode(byte.raw()))
    }

    /// Look up a mnemonic in implied addressing.
    pub fn from_mnemonic(mnemonic: Mnemonic) -> Result<Self, DecodeError> {
        Self::from_mnemonic_and_mode(mnemonic, AddressingMode::Implied)
    }

    /// Look up a mnemonic in a specific addressing mode.
    pub fn from_mnemonic_and_mode(mnemonic: Mnemonic, mode: AddressingMode) -> Result<Self, DecodeError> {
        CATALOG
            .iter()
            .find(|op| op.mnemonic == mnemonic && op.mode == mode)
            .copied()
            .ok_or(DecodeError::UnknownInstruction { mnemonic, mode })
    }

    /// Look up a mnemonic by name in implied addressing.
    pub fn from_name(name: &str) -> Result<Self, DecodeError> {
        Self::from_mnemonic(name.parse()?)
    }

    /// Look up a mnemonic by name in a specific addressing mode.
    pub fn from_name_and_mode(name: &str, mode: AddressingMode) -> Result<Self, DecodeError> {
        Self::from_mnemonic_and_mode(name.parse()?, mode)
    }

    /// Every addressing mode the catalog declares for `mnemonic`.
    pub fn modes_for(mnemonic: Mnemonic) -> impl Iterator<Item = AddressingMode> {
        CATALOG
            .iter()
            .filter(move |op| op.mnemonic == mnemonic)
            .map(|op| op.mode)
    }

    #[inline]
    pub const fn mnemonic(&self) -> Mnemonic {
        self.mnemonic
    }

    #[inline]
    pub const fn mode(&self) -> AddressingMode {
        self.mode
    }

    /// The encoded byte value.
    #[inline]
    pub const fn code(&self) -> u8 {
        self.code
    }

    /// The encoded byte.
    #[inline]
    pub const fn byte(&self) -> Byte {
        Byte::from_u8(self.code)
    }

    /// Total length in bytes, operands included.
    #[inline]
    pub const fn len(&self) -> u8 {
        self.mode.instruction_bytes()
    }

    /// A readable name, e.g. "ADC (Immediate)" or "LDA (Zero Page) [X]".
    pub fn description(&self) -> String {
        let mut text = format!("{} ({})", self.mnemonic, self.mode.name());
        if let Some(index) = self.mode.index() {
            text.push_str(&format!(" [{}]", index));
        }
        text
    }
}

impl fmt::Display for OpCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.description())
    }
}

impl TryFrom<u8> for OpCode {
    type Error = DecodeError;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        OpCode::from_byte(Byte::from_u8(code))
    }
}

/// Errors that can occur during instruction decoding.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("unknown opcode: 0x{0:02X}")]
    UnknownOpcode(u8),

    #[error("unknown mnemonic: {0:?}")]
    UnknownMnemonic(String),

    #[error("unknown opcode: {mnemonic} has no {mode} addressing")]
    UnknownInstruction {
        mnemonic: Mnemonic,
        mode: AddressingMode,
    },

    #[error("unknown opcode: {0} addressing cannot be indexed")]
    NotIndexable(AddressingMode),
}
