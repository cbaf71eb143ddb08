//! # nescore
//!
//! An instruction-level emulator of the MOS 6502 as found in the NES.
//!
//! The crate is the core a full console emulator is built around: exact
//! 8-bit arithmetic, a memory bus that routes each address to RAM, ROM or
//! a peripheral's registers, the 6502 itself, and the clock dividers and
//! sequencers that turn one oscillator into periodic hardware events.

pub mod binary;
pub mod memory;
pub mod cpu;
pub mod clock;
pub mod asm;

// Re-export commonly used types
pub use binary::{Byte, DataError, Word};
pub use memory::{Memory, MemoryError, MultiSourceMemory, ReadOnlyMemory, SharedMemory, SimpleMemory};
pub use cpu::{AddressingMode, Cpu, CpuError, DecodeError, Flag, Mnemonic, OpCode, Registers};
pub use clock::{ClockWatcher, Divider, EventWatcher, FrameEvent, FrameSequencer, Sequencer};
pub use asm::{assemble, disassemble, AssemblerError, Program};
