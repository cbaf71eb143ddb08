//! Assembler and disassembler for 6502 programs.
//!
//! This module provides:
//! - A simple two-pass assembler (text → machine code)
//! - A disassembler (machine code → readable text)

pub mod assembler;
pub mod disasm;

pub use assembler::{assemble, AssemblerError, Program};
pub use disasm::{disassemble, disassemble_instruction};
