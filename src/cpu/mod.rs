//! CPU emulation for the MOS 6502 as used in the NES.
//!
//! This module implements the instruction-level 6502:
//! - 13 addressing modes, including the zero-page and JMP-indirect wraps
//! - 56 mnemonics, 151 documented opcodes
//! - 6 registers: A, X, Y, S (stack pointer), PC, P (status)
//! - reset, IRQ, NMI and BRK through the vectors at the top of memory

pub mod addressing;
pub mod registers;
pub mod decode;
pub mod execute;

pub use addressing::{AddressingMode, Index};
pub use registers::{Flag, Register, Registers};
pub use decode::{DecodeError, Mnemonic, OpCode, CATALOG};
pub use execute::{Cpu, CpuError, IRQ_VECTOR, NMI_VECTOR, RESET_VECTOR, STACK_PAGE};
