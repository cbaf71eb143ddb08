//! Addressable memory.
//!
//! Everything the CPU reads or writes goes through the [`Memory`] trait.
//! Three stores implement it:
//! - [`SimpleMemory`] - a flat read-write array (64K by default)
//! - [`ReadOnlyMemory`] - an immutable image, e.g. cartridge PRG ROM
//! - [`MultiSourceMemory`] - routes each address to one of several stores
//!
//! Out-of-range addresses are always an error, never a wrap.

pub mod simple;
pub mod read_only;
pub mod multi_source;

use std::cell::RefCell;
use std::rc::Rc;
use thiserror::Error;
use crate::binary::{Byte, Word};

pub use simple::SimpleMemory;
pub use read_only::ReadOnlyMemory;
pub use multi_source::MultiSourceMemory;

/// A memory store shared between its owner and any router that maps it.
pub type SharedMemory = Rc<RefCell<dyn Memory>>;

/// An addressable byte store.
pub trait Memory {
    /// Write one byte.
    fn set_byte_at(&mut self, address: Word, value: Byte) -> Result<(), MemoryError>;

    /// Read one byte.
    fn get_byte(&self, address: Word) -> Result<Byte, MemoryError>;

    /// Zero every writable cell.
    fn reset(&mut self);

    /// Number of addressable bytes.
    fn size(&self) -> usize;

    /// Write a contiguous block starting at `start`.
    ///
    /// The default writes byte by byte, so a router sends each byte to
    /// whichever store owns it.
    fn set_block_at(&mut self, start: Word, values: &[Byte]) -> Result<(), MemoryError> {
        for (offset, value) in values.iter().enumerate() {
            let address = address_at(start.as_usize() + offset, self.size())?;
            self.set_byte_at(address, *value)?;
        }
        Ok(())
    }

    /// Read two consecutive bytes as a big-endian word: `address` is the
    /// high byte, `address + 1` the low byte.
    fn get_word(&self, address: Word) -> Result<Word, MemoryError> {
        let high = self.get_byte(address)?;
        let low = self.get_byte(address_at(address.as_usize() + 1, self.size())?)?;
        Ok(Word::from_bytes(high, low))
    }

    /// Read the bytes in `from..to`.
    ///
    /// The end is exclusive, so a block can never include $FFFF; read the
    /// top of the address space with [`Memory::get_byte`].
    fn get_block(&self, from: Word, to: Word) -> Result<Vec<Byte>, MemoryError> {
        (from.raw()..to.raw())
            .map(|address| self.get_byte(Word::from_u16(address)))
            .collect()
    }
}

/// Convert a computed index back to an address, failing past the 16-bit space.
pub(crate) fn address_at(index: usize, size: usize) -> Result<Word, MemoryError> {
    u16::try_from(index)
        .map(Word::from_u16)
        .map_err(|_| MemoryError::OutOfRange { address: index, size })
}

impl<M: Memory + ?Sized> Memory for Rc<RefCell<M>> {
    fn set_byte_at(&mut self, address: Word, value: Byte) -> Result<(), MemoryError> {
        self.borrow_mut().set_byte_at(address, value)
    }

    fn get_byte(&self, address: Word) -> Result<Byte, MemoryError> {
        self.borrow().get_byte(address)
    }

    fn reset(&mut self) {
        self.borrow_mut().reset();
    }

    fn size(&self) -> usize {
        self.borrow().size()
    }

    fn set_block_at(&mut self, start: Word, values: &[Byte]) -> Result<(), MemoryError> {
        self.borrow_mut().set_block_at(start, values)
    }

    fn get_word(&self, address: Word) -> Result<Word, MemoryError> {
        self.borrow().get_word(address)
    }

    fn get_block(&self, from: Word, to: Word) -> Result<Vec<Byte>, MemoryError> {
        self.borrow().get_block(from, to)
    }
}

/// Errors raised by memory stores.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MemoryError {
    #[error("memory address 0x{address:04X} out of range (size {size})")]
    OutOfRange { address: usize, size: usize },

    #[error("memory mapping violation: write to read-only address 0x{address:04X}")]
    ReadOnly { address: usize },

    #[error("memory mapping violation: no store mapped at address 0x{address:04X}")]
    Unmapped { address: usize },
}
