//! Read-only memory.

use serde::{Serialize, Deserialize};
use crate::binary::{Byte, Word};
use crate::memory::{Memory, MemoryError, SimpleMemory};

/// An immutable image. Reads behave like [`SimpleMemory`]; every write fails.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadOnlyMemory {
    image: SimpleMemory,
}

impl ReadOnlyMemory {
    /// Create from raw bytes.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self {
            image: SimpleMemory::from_bytes(bytes),
        }
    }
}

impl From<SimpleMemory> for ReadOnlyMemory {
    fn from(image: SimpleMemory) -> Self {
        Self { image }
    }
}

impl Memory for ReadOnlyMemory {
    fn set_byte_at(&mut self, address: Word, _value: Byte) -> Result<(), MemoryError> {
        Err(MemoryError::ReadOnly { address: address.as_usize() })
    }

    fn get_byte(&self, address: Word) -> Result<Byte, MemoryError> {
        self.image.get_byte(address)
    }

    fn reset(&mut self) {}

    fn size(&self) -> usize {
        self.image.size()
    }

    fn set_block_at(&mut self, start: Word, _values: &[Byte]) -> Result<(), MemoryError> {
        Err(MemoryError::ReadOnly { address: start.as_usize() })
    }

    fn get_block(&self, from: Word, to: Word) -> Result<Vec<Byte>, MemoryError> {
        self.image.get_block(from, to)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reads_image() {
        let rom = ReadOnlyMemory::from_bytes(&[0xA9, 0xAA]);
        assert_eq!(rom.size(), 2);
        assert_eq!(rom.get_byte(Word::from_u16(1)).unwrap(), 0xAAu8);
        assert_eq!(rom.get_word(Word::ZERO).unwrap(), 0xA9AAu16);
    }

    #[test]
    fn test_writes_fail() {
        let mut rom = ReadOnlyMemory::from_bytes(&[0; 4]);
        assert_eq!(
            rom.set_byte_at(Word::from_u16(2), Byte::from_u8(1)),
            Err(MemoryError::ReadOnly { address: 2 })
        );
        assert!(rom.set_block_at(Word::ZERO, &[Byte::ZERO]).is_err());
    }

    #[test]
    fn test_reset_keeps_contents() {
        let mut rom = ReadOnlyMemory::from_bytes(&[5]);
        rom.reset();
        assert_eq!(rom.get_byte(Word::ZERO).unwrap(), 5u8);
    }

    #[test]
    fn test_out_of_range_read() {
        let rom = ReadOnlyMemory::from_bytes(&[5]);
        assert!(matches!(
            rom.get_byte(Word::from_u16(1)),
            Err(MemoryError::OutOfRange { address: 1, size: 1 })
        ));
    }
}
