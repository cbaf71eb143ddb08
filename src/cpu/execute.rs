//! CPU execution engine for the 6502.
//!
//! Implements the fetch-decode-execute cycle and all instruction behaviors.
//! Each [`Cpu::step`] runs exactly one whole instruction; there is no
//! cycle-level state.

use std::fmt;
use thiserror::Error;
use crate::binary::{arith, Byte, Word};
use crate::cpu::addressing::AddressingMode;
use crate::cpu::decode::{DecodeError, Mnemonic, OpCode};
use crate::cpu::registers::{Flag, Registers};
use crate::memory::{Memory, MemoryError, SimpleMemory};

/// Where the program counter is loaded from on reset (low byte first).
pub const RESET_VECTOR: Word = Word::from_u16(0xFFFC);

/// Where the program counter is loaded from on IRQ and BRK.
pub const IRQ_VECTOR: Word = Word::from_u16(0xFFFE);

/// Where the program counter is loaded from on NMI.
pub const NMI_VECTOR: Word = Word::from_u16(0xFFFA);

/// The stack lives in page one.
pub const STACK_PAGE: u16 = 0x0100;

/// A resolved operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Operand {
    None,
    Accumulator,
    Immediate(Byte),
    Address(Word),
}

/// The 6502 CPU, generic over the memory it is wired to.
#[derive(Clone)]
pub struct Cpu<M: Memory = SimpleMemory> {
    regs: Registers,
    mem: M,
    /// Instructions executed since the last reset.
    instructions: u64,
    /// Last executed opcode (for debugging).
    last_opcode: Option<OpCode>,
}

impl<M: Memory> Cpu<M> {
    /// Wire a CPU to `memory`. Registers start in the startup state with
    /// PC = 0; call [`Cpu::reset`] to load the reset vector.
    pub fn new(memory: M) -> Self {
        Self {
            regs: Registers::new(),
            mem: memory,
            instructions: 0,
            last_opcode: None,
        }
    }

    /// Re-initialize registers and load PC from [`RESET_VECTOR`].
    ///
    /// Memory is left alone.
    pub fn reset(&mut self) -> Result<(), CpuError> {
        let entry = self.read_vector(RESET_VECTOR)?;
        self.regs.reset(entry);
        self.instructions = 0;
        self.last_opcode = None;
        log::debug!("reset: PC={} from vector {}", entry, RESET_VECTOR);
        Ok(())
    }

    /// Write `program` at `origin` and point the reset vector at it.
    pub fn load_program(&mut self, origin: Word, program: &[u8]) -> Result<(), CpuError> {
        let bytes: Vec<Byte> = program.iter().copied().map(Byte::from_u8).collect();
        self.mem.set_block_at(origin, &bytes)?;
        self.mem.set_block_at(RESET_VECTOR, &[origin.low(), origin.high()])?;
        Ok(())
    }

    /// Execute a single instruction.
    ///
    /// Returns the opcode that was executed, or an error.
    pub fn step(&mut self) -> Result<OpCode, CpuError> {
        let address = self.regs.program_counter;

        // Fetch and decode
        let opcode = OpCode::from_byte(self.fetch_byte()?)?;

        // Operand bytes
        let operand = self.resolve(opcode.mode())?;
        log::trace!("{:04X}  {:<22} {}", address.raw(), opcode.description(), self.regs);

        // Execute
        self.execute(opcode, operand)?;

        self.instructions += 1;
        self.last_opcode = Some(opcode);

        Ok(opcode)
    }

    /// Execute `count` instructions.
    ///
    /// Returns the number executed, which is `count` unless an error stops
    /// the run early (the error is returned instead).
    pub fn step_n(&mut self, count: u64) -> Result<u64, CpuError> {
        for _ in 0..count {
            self.step()?;
        }
        Ok(count)
    }

    /// Raise the maskable interrupt line. Ignored while IRQ-Disable is set.
    ///
    /// Returns true if the interrupt was taken.
    pub fn irq(&mut self) -> Result<bool, CpuError> {
        if self.regs.flag(Flag::IrqDisable) {
            log::trace!("irq masked");
            return Ok(false);
        }
        self.interrupt(IRQ_VECTOR, false)?;
        Ok(true)
    }

    /// Raise the non-maskable interrupt line.
    pub fn nmi(&mut self) -> Result<(), CpuError> {
        self.interrupt(NMI_VECTOR, false)
    }

    pub fn registers(&self) -> &Registers {
        &self.regs
    }

    pub fn registers_mut(&mut self) -> &mut Registers {
        &mut self.regs
    }

    pub fn memory(&self) -> &M {
        &self.mem
    }

    pub fn memory_mut(&mut self) -> &mut M {
        &mut self.mem
    }

    /// Give the memory back, dropping the CPU.
    pub fn into_memory(self) -> M {
        self.mem
    }

    /// Instructions executed since the last reset.
    pub fn instructions(&self) -> u64 {
        self.instructions
    }

    /// Get the last executed opcode.
    pub fn last_opcode(&self) -> Option<OpCode> {
        self.last_opcode
    }

    fn fetch_byte(&mut self) -> Result<Byte, CpuError> {
        let value = self.mem.get_byte(self.regs.program_counter)?;
        self.regs.program_counter = self.regs.program_counter.wrapping_add(1);
        Ok(value)
    }

    /// Two operand bytes, low first.
    fn fetch_address(&mut self) -> Result<Word, CpuError> {
        let low = self.fetch_byte()?;
        let high = self.fetch_byte()?;
        Ok(Word::from_bytes(high, low))
    }

    /// A little-endian pointer at `address`, the high byte taken from `next`.
    fn read_pointer(&self, address: Word, next: Word) -> Result<Word, CpuError> {
        let low = self.mem.get_byte(address)?;
        let high = self.mem.get_byte(next)?;
        Ok(Word::from_bytes(high, low))
    }

    /// A pointer stored in page zero; the high byte wraps to $00.
    fn read_zero_page_pointer(&self, zero_page: u8) -> Result<Word, CpuError> {
        self.read_pointer(
            Word::from_u16(u16::from(zero_page)),
            Word::from_u16(u16::from(zero_page.wrapping_add(1))),
        )
    }

    fn read_vector(&self, vector: Word) -> Result<Word, CpuError> {
        self.read_pointer(vector, vector.wrapping_add(1))
    }

    /// Consume the operand bytes for `mode` and work out what they name.
    fn resolve(&mut self, mode: AddressingMode) -> Result<Operand, CpuError> {
        let x = self.regs.x.raw();
        let y = self.regs.y.raw();

        let operand = match mode {
            AddressingMode::Implied => Operand::None,
            AddressingMode::Accumulator => Operand::Accumulator,
            AddressingMode::Immediate => Operand::Immediate(self.fetch_byte()?),
            AddressingMode::Relative => {
                let displacement = self.fetch_byte()?;
                Operand::Address(self.regs.program_counter.offset_by(displacement))
            }
            AddressingMode::ZeroPage => Operand::Address(Word::from(self.fetch_byte()?)),
            AddressingMode::ZeroPageX => {
                let base = self.fetch_byte()?.raw();
                Operand::Address(Word::from_u16(u16::from(base.wrapping_add(x))))
            }
            AddressingMode::ZeroPageY => {
                let base = self.fetch_byte()?.raw();
                Operand::Address(Word::from_u16(u16::from(base.wrapping_add(y))))
            }
            AddressingMode::Absolute => Operand::Address(self.fetch_address()?),
            AddressingMode::AbsoluteX => Operand::Address(self.fetch_address()?.wrapping_add(u16::from(x))),
            AddressingMode::AbsoluteY => Operand::Address(self.fetch_address()?.wrapping_add(u16::from(y))),
            AddressingMode::Indirect => {
                // The high byte never carries into the next page.
                let pointer = self.fetch_address()?;
                Operand::Address(self.read_pointer(pointer, pointer.next_in_page())?)
            }
            AddressingMode::IndirectX => {
                let base = self.fetch_byte()?.raw();
                Operand::Address(self.read_zero_page_pointer(base.wrapping_add(x))?)
            }
            AddressingMode::IndirectY => {
                let base = self.fetch_byte()?.raw();
                let pointer = self.read_zero_page_pointer(base)?;
                Operand::Address(pointer.wrapping_add(u16::from(y)))
            }
        };

        Ok(operand)
    }

    /// The value an operand names.
    fn load(&self, opcode: OpCode, operand: Operand) -> Result<Byte, CpuError> {
        match operand {
            Operand::Accumulator => Ok(self.regs.accumulator),
            Operand::Immediate(value) => Ok(value),
            Operand::Address(address) => Ok(self.mem.get_byte(address)?),
            Operand::None => Err(invalid_operand(opcode)),
        }
    }

    /// Write back to the place an operand names.
    fn store(&mut self, opcode: OpCode, operand: Operand, value: Byte) -> Result<(), CpuError> {
        match operand {
            Operand::Accumulator => self.regs.accumulator = value,
            Operand::Address(address) => self.mem.set_byte_at(address, value)?,
            Operand::None | Operand::Immediate(_) => return Err(invalid_operand(opcode)),
        }
        Ok(())
    }

    fn target(&self, opcode: OpCode, operand: Operand) -> Result<Word, CpuError> {
        match operand {
            Operand::Address(address) => Ok(address),
            _ => Err(invalid_operand(opcode)),
        }
    }

    /// Read, transform and write back; Zero/Negative follow the result.
    fn modify<F>(&mut self, opcode: OpCode, operand: Operand, f: F) -> Result<(), CpuError>
    where
        F: FnOnce(Byte) -> Byte,
    {
        let result = f(self.load(opcode, operand)?);
        self.store(opcode, operand, result)?;
        self.regs.set_zero_negative(result);
        Ok(())
    }

    /// Shifts and rotates: like [`Cpu::modify`], and Carry takes the bit shifted out.
    fn shift<F>(&mut self, opcode: OpCode, operand: Operand, f: F) -> Result<(), CpuError>
    where
        F: FnOnce(Byte, bool) -> (Byte, bool),
    {
        let (result, carry) = f(self.load(opcode, operand)?, self.regs.flag(Flag::Carry));
        self.store(opcode, operand, result)?;
        self.regs.set_flag(Flag::Carry, carry);
        self.regs.set_zero_negative(result);
        Ok(())
    }

    fn compare(&mut self, register: Byte, operand: Byte) {
        let (difference, greater_or_equal) = arith::compare(register, operand);
        self.regs.set_flag(Flag::Carry, greater_or_equal);
        self.regs.set_zero_negative(difference);
    }

    fn branch_if(&mut self, opcode: OpCode, operand: Operand, condition: bool) -> Result<(), CpuError> {
        let destination = self.target(opcode, operand)?;
        if condition {
            self.regs.program_counter = destination;
        }
        Ok(())
    }

    fn load_register(&mut self, value: Byte) -> Byte {
        self.regs.set_zero_negative(value);
        value
    }

    fn push(&mut self, value: Byte) -> Result<(), CpuError> {
        let slot = Word::from_u16(STACK_PAGE | u16::from(self.regs.stack_pointer.raw()));
        self.mem.set_byte_at(slot, value)?;
        self.regs.stack_pointer = arith::decrement(self.regs.stack_pointer);
        Ok(())
    }

    fn pull(&mut self) -> Result<Byte, CpuError> {
        self.regs.stack_pointer = arith::increment(self.regs.stack_pointer);
        let slot = Word::from_u16(STACK_PAGE | u16::from(self.regs.stack_pointer.raw()));
        Ok(self.mem.get_byte(slot)?)
    }

    /// High byte first, so the low byte ends up lower in memory.
    fn push_word(&mut self, value: Word) -> Result<(), CpuError> {
        self.push(value.high())?;
        self.push(value.low())
    }

    fn pull_word(&mut self) -> Result<Word, CpuError> {
        let low = self.pull()?;
        let high = self.pull()?;
        Ok(Word::from_bytes(high, low))
    }

    /// Save PC and status, mask IRQs and jump through `vector`.
    fn interrupt(&mut self, vector: Word, software: bool) -> Result<(), CpuError> {
        let status = self.regs.status_for_push(software);
        self.push_word(self.regs.program_counter)?;
        self.push(status)?;
        self.regs.set_flag(Flag::IrqDisable, true);
        self.regs.program_counter = self.read_vector(vector)?;
        log::debug!(
            "interrupt via {}: PC={} pushed status {}",
            vector,
            self.regs.program_counter,
            status
        );
        Ok(())
    }

    /// Execute a decoded instruction.
    fn execute(&mut self, opcode: OpCode, operand: Operand) -> Result<(), CpuError> {
        match opcode.mnemonic() {
            // ==================== Arithmetic ====================

            Mnemonic::Adc => {
                let value = self.load(opcode, operand)?;
                let sum = arith::add_with_carry(self.regs.accumulator, value, self.regs.flag(Flag::Carry));
                self.apply_sum(sum);
            }

            Mnemonic::Sbc => {
                let value = self.load(opcode, operand)?;
                let sum = arith::subtract_with_borrow(self.regs.accumulator, value, self.regs.flag(Flag::Carry));
                self.apply_sum(sum);
            }

            Mnemonic::Cmp => {
                let value = self.load(opcode, operand)?;
                self.compare(self.regs.accumulator, value);
            }

            Mnemonic::Cpx => {
                let value = self.load(opcode, operand)?;
                self.compare(self.regs.x, value);
            }

            Mnemonic::Cpy => {
                let value = self.load(opcode, operand)?;
                self.compare(self.regs.y, value);
            }

            Mnemonic::Inc => self.modify(opcode, operand, arith::increment)?,
            Mnemonic::Dec => self.modify(opcode, operand, arith::decrement)?,

            Mnemonic::Inx => self.regs.x = self.load_register(arith::increment(self.regs.x)),
            Mnemonic::Iny => self.regs.y = self.load_register(arith::increment(self.regs.y)),
            Mnemonic::Dex => self.regs.x = self.load_register(arith::decrement(self.regs.x)),
            Mnemonic::Dey => self.regs.y = self.load_register(arith::decrement(self.regs.y)),

            // ==================== Logic ====================

            Mnemonic::And => {
                let value = self.load(opcode, operand)?;
                let result = Byte::from_u8(self.regs.accumulator.raw() & value.raw());
                self.regs.accumulator = self.load_register(result);
            }

            Mnemonic::Ora => {
                let value = self.load(opcode, operand)?;
                let result = Byte::from_u8(self.regs.accumulator.raw() | value.raw());
                self.regs.accumulator = self.load_register(result);
            }

            Mnemonic::Eor => {
                let value = self.load(opcode, operand)?;
                let result = Byte::from_u8(self.regs.accumulator.raw() ^ value.raw());
                self.regs.accumulator = self.load_register(result);
            }

            Mnemonic::Bit => {
                let value = self.load(opcode, operand)?;
                self.regs.set_flag(Flag::Zero, self.regs.accumulator.raw() & value.raw() == 0);
                self.regs.set_flag(Flag::Negative, value.raw() & Flag::Negative.mask() != 0);
                self.regs.set_flag(Flag::Overflow, value.raw() & Flag::Overflow.mask() != 0);
            }

            // ==================== Shifts ====================

            Mnemonic::Asl => self.shift(opcode, operand, |value, _| arith::shift_left(value))?,
            Mnemonic::Lsr => self.shift(opcode, operand, |value, _| arith::shift_right(value))?,
            Mnemonic::Rol => self.shift(opcode, operand, arith::rotate_left)?,
            Mnemonic::Ror => self.shift(opcode, operand, arith::rotate_right)?,

            // ==================== Loads, stores, transfers ====================

            Mnemonic::Lda => {
                let value = self.load(opcode, operand)?;
                self.regs.accumulator = self.load_register(value);
            }

            Mnemonic::Ldx => {
                let value = self.load(opcode, operand)?;
                self.regs.x = self.load_register(value);
            }

            Mnemonic::Ldy => {
                let value = self.load(opcode, operand)?;
                self.regs.y = self.load_register(value);
            }

            Mnemonic::Sta => self.store(opcode, operand, self.regs.accumulator)?,
            Mnemonic::Stx => self.store(opcode, operand, self.regs.x)?,
            Mnemonic::Sty => self.store(opcode, operand, self.regs.y)?,

            Mnemonic::Tax => self.regs.x = self.load_register(self.regs.accumulator),
            Mnemonic::Tay => self.regs.y = self.load_register(self.regs.accumulator),
            Mnemonic::Txa => self.regs.accumulator = self.load_register(self.regs.x),
            Mnemonic::Tya => self.regs.accumulator = self.load_register(self.regs.y),
            Mnemonic::Tsx => self.regs.x = self.load_register(self.regs.stack_pointer),
            // TXS is the one transfer that leaves the flags alone.
            Mnemonic::Txs => self.regs.stack_pointer = self.regs.x,

            // ==================== Stack ====================

            Mnemonic::Pha => self.push(self.regs.accumulator)?,
            Mnemonic::Php => self.push(self.regs.status_for_push(true))?,

            Mnemonic::Pla => {
                let value = self.pull()?;
                self.regs.accumulator = self.load_register(value);
            }

            Mnemonic::Plp => {
                let status = self.pull()?;
                self.regs.restore_status(status);
            }

            // ==================== Control flow ====================

            Mnemonic::Jmp => self.regs.program_counter = self.target(opcode, operand)?,

            Mnemonic::Jsr => {
                let destination = self.target(opcode, operand)?;
                // Return address minus one: the last byte of the JSR itself.
                self.push_word(self.regs.program_counter.wrapping_add(0xFFFF))?;
                self.regs.program_counter = destination;
            }

            Mnemonic::Rts => {
                self.regs.program_counter = self.pull_word()?.wrapping_add(1);
            }

            Mnemonic::Brk => {
                // BRK skips a padding byte.
                self.regs.program_counter = self.regs.program_counter.wrapping_add(1);
                self.interrupt(IRQ_VECTOR, true)?;
            }

            Mnemonic::Rti => {
                let status = self.pull()?;
                self.regs.restore_status(status);
                self.regs.program_counter = self.pull_word()?;
            }

            Mnemonic::Bcc => self.branch_if(opcode, operand, !self.regs.flag(Flag::Carry))?,
            Mnemonic::Bcs => self.branch_if(opcode, operand, self.regs.flag(Flag::Carry))?,
            Mnemonic::Bne => self.branch_if(opcode, operand, !self.regs.flag(Flag::Zero))?,
            Mnemonic::Beq => self.branch_if(opcode, operand, self.regs.flag(Flag::Zero))?,
            Mnemonic::Bpl => self.branch_if(opcode, operand, !self.regs.flag(Flag::Negative))?,
            Mnemonic::Bmi => self.branch_if(opcode, operand, self.regs.flag(Flag::Negative))?,
            Mnemonic::Bvc => self.branch_if(opcode, operand, !self.regs.flag(Flag::Overflow))?,
            Mnemonic::Bvs => self.branch_if(opcode, operand, self.regs.flag(Flag::Overflow))?,

            // ==================== Flags ====================

            Mnemonic::Clc => self.regs.set_flag(Flag::Carry, false),
            Mnemonic::Sec => self.regs.set_flag(Flag::Carry, true),
            Mnemonic::Cli => self.regs.set_flag(Flag::IrqDisable, false),
            Mnemonic::Sei => self.regs.set_flag(Flag::IrqDisable, true),
            Mnemonic::Cld => self.regs.set_flag(Flag::Decimal, false),
            Mnemonic::Sed => self.regs.set_flag(Flag::Decimal, true),
            Mnemonic::Clv => self.regs.set_flag(Flag::Overflow, false),

            Mnemonic::Nop => {}
        }

        Ok(())
    }

    /// ADC/SBC result. Decimal mode is not wired on the NES, so this is always binary.
    fn apply_sum(&mut self, sum: arith::Sum) {
        self.regs.set_flag(Flag::Carry, sum.carry);
        self.regs.set_flag(Flag::Overflow, sum.overflow);
        self.regs.accumulator = self.load_register(sum.value);
    }
}

fn invalid_operand(opcode: OpCode) -> CpuError {
    CpuError::Decode(DecodeError::UnknownInstruction {
        mnemonic: opcode.mnemonic(),
        mode: opcode.mode(),
    })
}

impl Default for Cpu<SimpleMemory> {
    fn default() -> Self {
        Self::new(SimpleMemory::new())
    }
}

impl<M: Memory> fmt::Debug for Cpu<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cpu")
            .field("instructions", &self.instructions)
            .field("regs", &self.regs)
            .field("last_opcode", &self.last_opcode.map(|op| op.description()))
            .finish()
    }
}

/// Errors that can occur during CPU execution.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CpuError {
    #[error("memory error: {0}")]
    Memory(#[from] MemoryError),

    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),
}
