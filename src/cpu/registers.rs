//! 6502 registers.
//!
//! The 6502 has 6 registers:
//! - A: 8-bit accumulator
//! - X, Y: 8-bit index registers
//! - S: 8-bit stack pointer into page one
//! - PC: 16-bit program counter
//! - P: 8-bit processor status, one flag per bit

use std::fmt;
use std::str::FromStr;
use serde::{Serialize, Deserialize};
use crate::binary::{Byte, Word};

/// Status register bits, numbered from bit 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Flag {
    Carry = 0,
    Zero = 1,
    IrqDisable = 2,
    Decimal = 3,
    Break = 4,
    /// Reads as 1 on real hardware.
    Unused = 5,
    Overflow = 6,
    Negative = 7,
}

impl Flag {
    /// Every flag, from bit 7 down to bit 0.
    pub const ALL: [Flag; 8] = [
        Flag::Negative,
        Flag::Overflow,
        Flag::Unused,
        Flag::Break,
        Flag::Decimal,
        Flag::IrqDisable,
        Flag::Zero,
        Flag::Carry,
    ];

    #[inline]
    pub const fn bit(self) -> u8 {
        self as u8
    }

    #[inline]
    pub const fn mask(self) -> u8 {
        1 << (self as u8)
    }

    /// The letter conventionally used for this flag.
    pub const fn symbol(self) -> char {
        match self {
            Flag::Carry => 'C',
            Flag::Zero => 'Z',
            Flag::IrqDisable => 'I',
            Flag::Decimal => 'D',
            Flag::Break => 'B',
            Flag::Unused => '-',
            Flag::Overflow => 'V',
            Flag::Negative => 'N',
        }
    }
}

/// Register names, for debugger-style access by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Register {
    Accumulator,
    X,
    Y,
    StackPointer,
    ProgramCounterHigh,
    ProgramCounterLow,
    Status,
}

impl Register {
    pub const ALL: [Register; 7] = [
        Register::Accumulator,
        Register::X,
        Register::Y,
        Register::StackPointer,
        Register::ProgramCounterHigh,
        Register::ProgramCounterLow,
        Register::Status,
    ];

    pub const fn name(self) -> &'static str {
        match self {
            Register::Accumulator => "A",
            Register::X => "X",
            Register::Y => "Y",
            Register::StackPointer => "SP",
            Register::ProgramCounterHigh => "PCH",
            Register::ProgramCounterLow => "PCL",
            Register::Status => "P",
        }
    }
}

impl FromStr for Register {
    type Err = String;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        Register::ALL
            .into_iter()
            .find(|register| register.name().eq_ignore_ascii_case(name.trim()))
            .ok_or_else(|| format!("unknown register: {}", name))
    }
}

/// Status value after power-on and reset: IRQ-Disable, Break and Unused set.
pub const STARTUP_STATUS: u8 = 0x34;

/// Stack pointer after power-on and reset: the top of the stack page.
pub const STARTUP_STACK_POINTER: u8 = 0xFF;

/// The 6502 register file.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registers {
    /// A: accumulator
    pub accumulator: Byte,

    /// X: index register
    pub x: Byte,

    /// Y: index register
    pub y: Byte,

    /// S: offset into the stack page of the next free slot
    pub stack_pointer: Byte,

    /// PC: address of the next byte to fetch
    pub program_counter: Word,

    /// P: processor status, kept as the raw byte the hardware pushes
    #[serde(with = "raw_status")]
    pub status: Byte,
}

impl Registers {
    /// Create a register file in its startup state.
    pub fn new() -> Self {
        Self {
            accumulator: Byte::ZERO,
            x: Byte::ZERO,
            y: Byte::ZERO,
            stack_pointer: Byte::from_u8(STARTUP_STACK_POINTER),
            program_counter: Word::ZERO,
            status: Byte::from_u8(STARTUP_STATUS),
        }
    }

    /// Return to the startup state with the program counter at `entry`.
    pub fn reset(&mut self, entry: Word) {
        *self = Self::new();
        self.program_counter = entry;
    }

    pub fn flag(&self, flag: Flag) -> bool {
        self.status.raw() & flag.mask() != 0
    }

    pub fn set_flag(&mut self, flag: Flag, on: bool) {
        let raw = if on {
            self.status.raw() | flag.mask()
        } else {
            self.status.raw() & !flag.mask()
        };
        self.status = Byte::from_u8(raw);
    }

    /// Zero and Negative follow `value`.
    pub fn set_zero_negative(&mut self, value: Byte) {
        self.set_flag(Flag::Zero, value.is_zero());
        self.set_flag(Flag::Negative, value.is_negative());
    }

    /// Status as pushed by PHP/BRK (`software`) or by an interrupt line.
    /// Unused is always set; Break only marks the software case.
    pub fn status_for_push(&self, software: bool) -> Byte {
        let mut raw = self.status.raw() | Flag::Unused.mask();
        if software {
            raw |= Flag::Break.mask();
        } else {
            raw &= !Flag::Break.mask();
        }
        Byte::from_u8(raw)
    }

    /// Load status from the stack (PLP/RTI): Break is dropped, Unused forced on.
    pub fn restore_status(&mut self, pulled: Byte) {
        let raw = (pulled.raw() & !Flag::Break.mask()) | Flag::Unused.mask();
        self.status = Byte::from_u8(raw);
    }

    /// Read a register by name. The program counter is split into its halves.
    pub fn get(&self, register: Register) -> Byte {
        match register {
            Register::Accumulator => self.accumulator,
            Register::X => self.x,
            Register::Y => self.y,
            Register::StackPointer => self.stack_pointer,
            Register::ProgramCounterHigh => self.program_counter.high(),
            Register::ProgramCounterLow => self.program_counter.low(),
            Register::Status => self.status,
        }
    }

    /// Write a register by name.
    pub fn set(&mut self, register: Register, value: Byte) {
        match register {
            Register::Accumulator => self.accumulator = value,
            Register::X => self.x = value,
            Register::Y => self.y = value,
            Register::StackPointer => self.stack_pointer = value,
            Register::ProgramCounterHigh => {
                self.program_counter = Word::from_bytes(value, self.program_counter.low());
            }
            Register::ProgramCounterLow => {
                self.program_counter = Word::from_bytes(self.program_counter.high(), value);
            }
            Register::Status => self.status = value,
        }
    }

    /// Status as letters, upper case when set: `NV-BDIZC`.
    pub fn flags_string(&self) -> String {
        Flag::ALL
            .iter()
            .map(|&flag| {
                if self.flag(flag) {
                    flag.symbol()
                } else {
                    flag.symbol().to_ascii_lowercase()
                }
            })
            .collect()
    }
}

impl Default for Registers {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Registers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "A={:02X} X={:02X} Y={:02X} SP={:02X} PC={:04X} P={}",
            self.accumulator.raw(),
            self.x.raw(),
            self.y.raw(),
            self.stack_pointer.raw(),
            self.program_counter.raw(),
            self.flags_string()
        )
    }
}

impl fmt::Display for Registers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Serialize the status register as a bare `u8`.
mod raw_status {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use crate::binary::Byte;

    pub fn serialize<S: Serializer>(status: &Byte, serializer: S) -> Result<S::Ok, S::Error> {
        status.raw().serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Byte, D::Error> {
        u8::deserialize(deserializer).map(Byte::from_u8)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_startup_state() {
        let regs = Registers::new();
        assert_eq!(regs.status, STARTUP_STATUS);
        assert_eq!(regs.stack_pointer, 0xFFu8);
        assert!(regs.flag(Flag::IrqDisable));
        assert!(regs.flag(Flag::Unused));
        assert!(!regs.flag(Flag::Carry));
    }

    #[test]
    fn test_reset_restores_startup_state() {
        let mut regs = Registers::new();
        regs.accumulator = Byte::from_u8(9);
        regs.set_flag(Flag::Carry, true);
        regs.stack_pointer = Byte::from_u8(0x10);

        regs.reset(Word::from_u16(0x8000));

        assert_eq!(regs.accumulator, Byte::ZERO);
        assert_eq!(regs.status, STARTUP_STATUS);
        assert_eq!(regs.stack_pointer, 0xFFu8);
        assert_eq!(regs.program_counter, 0x8000u16);
    }

    #[test]
    fn test_flags_touch_only_their_bit() {
        let mut regs = Registers::new();
        regs.status = Byte::ZERO;
        for flag in Flag::ALL {
            regs.set_flag(flag, true);
            assert_eq!(regs.status.raw(), flag.mask());
            assert!(regs.flag(flag));
            regs.set_flag(flag, false);
            assert_eq!(regs.status, Byte::ZERO);
        }
    }

    #[test]
    fn test_zero_negative() {
        let mut regs = Registers::new();
        regs.set_zero_negative(Byte::from_u8(0x80));
        assert!(regs.flag(Flag::Negative));
        assert!(!regs.flag(Flag::Zero));

        regs.set_zero_negative(Byte::ZERO);
        assert!(!regs.flag(Flag::Negative));
        assert!(regs.flag(Flag::Zero));
    }

    #[test]
    fn test_push_and_restore_status() {
        let mut regs = Registers::new();
        regs.status = Byte::from_u8(0x01);

        assert_eq!(regs.status_for_push(true), 0x31u8);
        assert_eq!(regs.status_for_push(false), 0x21u8);

        regs.restore_status(Byte::from_u8(0xFF));
        assert_eq!(regs.status, 0xEFu8);
        regs.restore_status(Byte::ZERO);
        assert_eq!(regs.status, 0x20u8);
    }

    #[test]
    fn test_program_counter_halves() {
        let mut regs = Registers::new();
        regs.program_counter = Word::from_u16(0x1234);
        assert_eq!(regs.get(Register::ProgramCounterHigh), 0x12u8);
        assert_eq!(regs.get(Register::ProgramCounterLow), 0x34u8);

        regs.set(Register::ProgramCounterLow, Byte::from_u8(0xFF));
        assert_eq!(regs.program_counter, 0x12FFu16);
        regs.set(Register::ProgramCounterHigh, Byte::from_u8(0xC0));
        assert_eq!(regs.program_counter, 0xC0FFu16);
    }

    #[test]
    fn test_register_by_name() {
        let mut regs = Registers::new();
        let x: Register = "x".parse().unwrap();
        regs.set(x, Byte::from_u8(7));
        assert_eq!(regs.x, 7u8);
        assert_eq!("SP".parse::<Register>(), Ok(Register::StackPointer));
        assert!("Q".parse::<Register>().is_err());
    }

    #[test]
    fn test_flags_string() {
        let mut regs = Registers::new();
        regs.status = Byte::from_u8(0xC3);
        assert_eq!(regs.flags_string(), "NV-bdiZC");
    }

    #[test]
    fn test_status_serializes_as_raw_byte() {
        let regs = Registers::new();
        let json = serde_json::to_value(&regs).unwrap();
        assert_eq!(json["status"], serde_json::json!(0x34));

        let back: Registers = serde_json::from_value(json).unwrap();
        assert_eq!(back, regs);
    }
}
