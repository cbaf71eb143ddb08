//! Flat read-write memory.

use serde::{Serialize, Deserialize};
use crate::binary::{Byte, Word};
use crate::memory::{Memory, MemoryError};

/// Size of the full 16-bit address space.
pub const ADDRESS_SPACE: usize = 0x1_0000;

/// A fixed-size array of bytes, zeroed on creation.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimpleMemory {
    cells: Vec<Byte>,
}

impl SimpleMemory {
    /// Create a store covering the whole 64K address space.
    pub fn new() -> Self {
        Self::with_size(ADDRESS_SPACE)
    }

    /// Create a store of `size` bytes.
    pub fn with_size(size: usize) -> Self {
        Self {
            cells: vec![Byte::ZERO; size],
        }
    }

    /// Create a store holding exactly `bytes`.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self {
            cells: bytes.iter().copied().map(Byte::from_u8).collect(),
        }
    }

    /// Dump `count` cells starting at `start` (for debugging).
    pub fn dump(&self, start: usize, count: usize) -> Vec<(usize, Byte)> {
        let end = (start + count).min(self.cells.len());
        (start.min(end)..end)
            .map(|i| (i, self.cells[i]))
            .collect()
    }

    fn index(&self, address: usize) -> Result<usize, MemoryError> {
        if address >= self.cells.len() {
            return Err(MemoryError::OutOfRange {
                address,
                size: self.cells.len(),
            });
        }
        Ok(address)
    }
}

impl Default for SimpleMemory {
    fn default() -> Self {
        Self::new()
    }
}

impl Memory for SimpleMemory {
    fn set_byte_at(&mut self, address: Word, value: Byte) -> Result<(), MemoryError> {
        let index = self.index(address.as_usize())?;
        self.cells[index] = value;
        Ok(())
    }

    fn get_byte(&self, address: Word) -> Result<Byte, MemoryError> {
        let index = self.index(address.as_usize())?;
        Ok(self.cells[index])
    }

    fn reset(&mut self) {
        for cell in &mut self.cells {
            *cell = Byte::ZERO;
        }
    }

    fn size(&self) -> usize {
        self.cells.len()
    }

    fn set_block_at(&mut self, start: Word, values: &[Byte]) -> Result<(), MemoryError> {
        let start = start.as_usize();
        if values.is_empty() {
            return Ok(());
        }
        // Check the last cell first so a failed write leaves memory untouched.
        self.index(start + values.len() - 1)?;
        self.cells[start..start + values.len()].copy_from_slice(values);
        Ok(())
    }

    fn get_block(&self, from: Word, to: Word) -> Result<Vec<Byte>, MemoryError> {
        let (from, to) = (from.as_usize(), to.as_usize());
        if from >= to {
            return Ok(Vec::new());
        }
        self.index(to - 1)?;
        Ok(self.cells[from..to].to_vec())
    }
}

impl std::fmt::Debug for SimpleMemory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Only count non-zero cells
        let non_zero = self.cells.iter().filter(|cell| !cell.is_zero()).count();

        f.debug_struct("SimpleMemory")
            .field("non_zero_cells", &non_zero)
            .field("total_cells", &self.cells.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn w(raw: u16) -> Word {
        Word::from_u16(raw)
    }

    #[test]
    fn test_memory_read_write() {
        let mut mem = SimpleMemory::new();
        mem.set_byte_at(w(0x0200), Byte::from_u8(42)).unwrap();
        assert_eq!(mem.get_byte(w(0x0200)).unwrap(), 42u8);
        assert_eq!(mem.size(), 0x1_0000);
    }

    #[test]
    fn test_memory_bounds() {
        let mut mem = SimpleMemory::with_size(0x100);
        assert!(mem.get_byte(w(0xFF)).is_ok());
        assert_eq!(
            mem.get_byte(w(0x100)),
            Err(MemoryError::OutOfRange { address: 0x100, size: 0x100 })
        );
        assert!(mem.set_byte_at(w(0x100), Byte::ZERO).is_err());
    }

    #[test]
    fn test_block_write_and_read() {
        let mut mem = SimpleMemory::new();
        let block = [1u8, 2, 3].map(Byte::from_u8);
        mem.set_block_at(w(0x10), &block).unwrap();

        assert_eq!(mem.get_block(w(0x10), w(0x13)).unwrap(), block.to_vec());
        assert!(mem.get_block(w(0x13), w(0x10)).unwrap().is_empty());
    }

    #[test]
    fn test_block_end_is_exclusive_at_top_of_memory() {
        let mut mem = SimpleMemory::new();
        mem.set_block_at(w(0xFFFE), &[Byte::from_u8(0xAA), Byte::from_u8(0xBB)]).unwrap();

        assert_eq!(mem.get_block(w(0xFFFE), w(0xFFFF)).unwrap(), vec![Byte::from_u8(0xAA)]);
        assert_eq!(mem.get_byte(w(0xFFFF)).unwrap(), 0xBBu8);
    }

    #[test]
    fn test_block_write_overflowing_fails_without_writing() {
        let mut mem = SimpleMemory::with_size(4);
        let block = [9u8, 9, 9].map(Byte::from_u8);

        assert!(mem.set_block_at(w(2), &block).is_err());
        assert_eq!(mem.get_byte(w(2)).unwrap(), Byte::ZERO);
    }

    #[test]
    fn test_get_word_is_big_endian() {
        let mut mem = SimpleMemory::new();
        mem.set_block_at(w(0x20), &[Byte::from_u8(0x12), Byte::from_u8(0x34)]).unwrap();
        assert_eq!(mem.get_word(w(0x20)).unwrap(), 0x1234u16);
    }

    #[test]
    fn test_reset_zeroes() {
        let mut mem = SimpleMemory::from_bytes(&[1, 2, 3]);
        mem.reset();
        assert_eq!(mem.get_block(w(0), w(3)).unwrap(), vec![Byte::ZERO; 3]);
    }

    #[test]
    fn test_dump() {
        let mem = SimpleMemory::from_bytes(&[7, 8]);
        assert_eq!(mem.dump(1, 10), vec![(1, Byte::from_u8(8))]);
        assert!(mem.dump(5, 2).is_empty());
    }
}
