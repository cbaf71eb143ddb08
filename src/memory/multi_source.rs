//! Memory that routes each address to one of several backing stores.
//!
//! This is how peripherals are wired onto the CPU bus: the PPU's
//! registers, the APU's registers and cartridge ROM each own a slice of
//! the address space, and everything else falls through to a default
//! store (usually work RAM).

use std::collections::HashMap;
use std::ops::RangeInclusive;
use std::rc::Rc;
use crate::binary::{Byte, Word};
use crate::memory::{Memory, MemoryError, SharedMemory};

/// Where a mapped address ends up.
#[derive(Clone)]
struct Route {
    memory: SharedMemory,
    local: Word,
}

/// A router over shared memory stores.
///
/// Building a mapping never mutates an existing router: each `with_*`
/// call returns a new value that shares the stores already mapped, so
/// anyone still holding the old router keeps seeing the old layout.
#[derive(Clone, Default)]
pub struct MultiSourceMemory {
    default: Option<SharedMemory>,
    routes: HashMap<u16, Route>,
}

impl MultiSourceMemory {
    /// Create a router with nothing mapped.
    pub fn new() -> Self {
        Self::default()
    }

    /// Send every unmapped address to `memory`, unchanged.
    pub fn with_default(&self, memory: SharedMemory) -> Self {
        let mut next = self.clone();
        next.default = Some(memory);
        next
    }

    /// Send each of `addresses` to `memory`, unchanged.
    pub fn with_mapping<I>(&self, memory: SharedMemory, addresses: I) -> Self
    where
        I: IntoIterator<Item = u16>,
    {
        let mut next = self.clone();
        for address in addresses {
            next.routes.insert(address, Route {
                memory: Rc::clone(&memory),
                local: Word::from_u16(address),
            });
        }
        next
    }

    /// Map `range` onto `memory`, repeating its contents every `memory.size()`
    /// bytes. An 8-byte register file mapped over `0x2000..=0x3FFF` answers
    /// `0x2008` with its register 0.
    pub fn with_mirrored(&self, memory: SharedMemory, range: RangeInclusive<u16>) -> Self {
        let period = memory.borrow().size().max(1);
        let start = *range.start();
        let mut next = self.clone();
        for address in range {
            let local = usize::from(address - start) % period;
            next.routes.insert(address, Route {
                memory: Rc::clone(&memory),
                local: Word::from_raw(local as i32),
            });
        }
        next
    }

    /// Returns true if `address` has an explicit mapping.
    pub fn is_mapped(&self, address: Word) -> bool {
        self.routes.contains_key(&address.raw())
    }

    /// Find the store and store-local address for `address`.
    fn resolve(&self, address: Word) -> Result<(&SharedMemory, Word), MemoryError> {
        if let Some(route) = self.routes.get(&address.raw()) {
            return Ok((&route.memory, route.local));
        }
        self.default
            .as_ref()
            .map(|memory| (memory, address))
            .ok_or(MemoryError::Unmapped { address: address.as_usize() })
    }

    /// Every distinct backing store, default first.
    fn distinct_stores(&self) -> Vec<&SharedMemory> {
        let mut stores: Vec<&SharedMemory> = Vec::new();
        let candidates = self.default.iter().chain(self.routes.values().map(|r| &r.memory));
        for memory in candidates {
            if !stores.iter().any(|seen| same_store(seen, memory)) {
                stores.push(memory);
            }
        }
        stores
    }
}

fn same_store(a: &SharedMemory, b: &SharedMemory) -> bool {
    Rc::as_ptr(a).cast::<()>() == Rc::as_ptr(b).cast::<()>()
}

impl Memory for MultiSourceMemory {
    fn set_byte_at(&mut self, address: Word, value: Byte) -> Result<(), MemoryError> {
        let (memory, local) = self.resolve(address)?;
        memory.borrow_mut().set_byte_at(local, value)
    }

    fn get_byte(&self, address: Word) -> Result<Byte, MemoryError> {
        let (memory, local) = self.resolve(address)?;
        memory.borrow().get_byte(local)
    }

    fn reset(&mut self) {
        let stores = self.distinct_stores();
        log::debug!("resetting {} backing store(s)", stores.len());
        for memory in stores {
            memory.borrow_mut().reset();
        }
    }

    fn size(&self) -> usize {
        match &self.default {
            Some(memory) => memory.borrow().size(),
            None => self.routes.keys().max().map_or(0, |&top| usize::from(top) + 1),
        }
    }
}

impl std::fmt::Debug for MultiSourceMemory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MultiSourceMemory")
            .field("has_default", &self.default.is_some())
            .field("mapped_addresses", &self.routes.len())
            .field("distinct_stores", &self.distinct_stores().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::{Cell, RefCell};
    use crate::memory::{ReadOnlyMemory, SimpleMemory};

    fn w(raw: u16) -> Word {
        Word::from_u16(raw)
    }

    fn b(raw: u8) -> Byte {
        Byte::from_u8(raw)
    }

    /// Counts how often it is reset.
    struct CountingMemory {
        inner: SimpleMemory,
        resets: Rc<Cell<usize>>,
    }

    impl Memory for CountingMemory {
        fn set_byte_at(&mut self, address: Word, value: Byte) -> Result<(), MemoryError> {
            self.inner.set_byte_at(address, value)
        }

        fn get_byte(&self, address: Word) -> Result<Byte, MemoryError> {
            self.inner.get_byte(address)
        }

        fn reset(&mut self) {
            self.resets.set(self.resets.get() + 1);
            self.inner.reset();
        }

        fn size(&self) -> usize {
            self.inner.size()
        }
    }

    fn counting(resets: &Rc<Cell<usize>>) -> SharedMemory {
        Rc::new(RefCell::new(CountingMemory {
            inner: SimpleMemory::new(),
            resets: Rc::clone(resets),
        }))
    }

    #[test]
    fn test_override_only_touches_mapped_store() {
        let ram = Rc::new(RefCell::new(SimpleMemory::new()));
        let device = Rc::new(RefCell::new(SimpleMemory::new()));
        let mut memory = MultiSourceMemory::new()
            .with_default(ram.clone())
            .with_mapping(device.clone(), [0x2000]);

        memory.set_byte_at(w(0x2000), b(0x55)).unwrap();
        memory.set_byte_at(w(0x0010), b(0x66)).unwrap();

        assert_eq!(device.borrow().get_byte(w(0x2000)).unwrap(), 0x55u8);
        assert_eq!(ram.borrow().get_byte(w(0x2000)).unwrap(), Byte::ZERO);
        assert_eq!(ram.borrow().get_byte(w(0x0010)).unwrap(), 0x66u8);
        assert_eq!(device.borrow().get_byte(w(0x0010)).unwrap(), Byte::ZERO);
        assert_eq!(memory.get_byte(w(0x2000)).unwrap(), 0x55u8);
    }

    #[test]
    fn test_reset_once_per_distinct_store() {
        let device_resets = Rc::new(Cell::new(0));
        let default_resets = Rc::new(Cell::new(0));
        let device = counting(&device_resets);

        let mut memory = MultiSourceMemory::new()
            .with_default(counting(&default_resets))
            .with_mapping(device, [0x10, 0x20, 0x30]);
        memory.reset();

        assert_eq!(device_resets.get(), 1);
        assert_eq!(default_resets.get(), 1);
    }

    #[test]
    fn test_mapping_returns_new_router() {
        let ram: SharedMemory = Rc::new(RefCell::new(SimpleMemory::new()));
        let device: SharedMemory = Rc::new(RefCell::new(SimpleMemory::new()));
        let before = MultiSourceMemory::new().with_default(ram);
        let after = before.with_mapping(device, [0x4000]);

        assert!(!before.is_mapped(w(0x4000)));
        assert!(after.is_mapped(w(0x4000)));
    }

    #[test]
    fn test_unmapped_without_default_fails() {
        let device: SharedMemory = Rc::new(RefCell::new(SimpleMemory::new()));
        let memory = MultiSourceMemory::new().with_mapping(device, [0x01]);

        assert_eq!(
            memory.get_byte(w(0x02)),
            Err(MemoryError::Unmapped { address: 0x02 })
        );
        assert_eq!(memory.size(), 2);
    }

    #[test]
    fn test_block_split_across_stores() {
        let ram = Rc::new(RefCell::new(SimpleMemory::new()));
        let device = Rc::new(RefCell::new(SimpleMemory::new()));
        let mut memory = MultiSourceMemory::new()
            .with_default(ram.clone())
            .with_mapping(device.clone(), [0x101]);

        memory.set_block_at(w(0x100), &[b(1), b(2), b(3)]).unwrap();

        assert_eq!(ram.borrow().get_block(w(0x100), w(0x103)).unwrap(), vec![b(1), Byte::ZERO, b(3)]);
        assert_eq!(device.borrow().get_byte(w(0x101)).unwrap(), 2u8);
        assert_eq!(memory.get_block(w(0x100), w(0x103)).unwrap(), vec![b(1), b(2), b(3)]);
    }

    #[test]
    fn test_word_straddles_two_stores() {
        let ram = Rc::new(RefCell::new(SimpleMemory::new()));
        let rom = Rc::new(RefCell::new(ReadOnlyMemory::from_bytes(&[0u8; 0x300])));
        ram.borrow_mut().set_byte_at(w(0x1FF), b(0xAB)).unwrap();
        let memory = MultiSourceMemory::new()
            .with_default(rom)
            .with_mapping(ram, [0x1FF]);

        assert_eq!(memory.get_word(w(0x1FF)).unwrap(), 0xAB00u16);
    }

    #[test]
    fn test_write_to_mapped_rom_fails() {
        let rom = Rc::new(RefCell::new(ReadOnlyMemory::from_bytes(&[0u8; 0x10])));
        let ram: SharedMemory = Rc::new(RefCell::new(SimpleMemory::new()));
        let mut memory = MultiSourceMemory::new()
            .with_default(ram)
            .with_mirrored(rom, 0x8000..=0x800F);

        assert_eq!(
            memory.set_byte_at(w(0x8004), b(1)),
            Err(MemoryError::ReadOnly { address: 0x4 })
        );
    }

    #[test]
    fn test_mirrored_registers() {
        let registers = Rc::new(RefCell::new(SimpleMemory::with_size(8)));
        let ram: SharedMemory = Rc::new(RefCell::new(SimpleMemory::new()));
        let mut memory = MultiSourceMemory::new()
            .with_default(ram)
            .with_mirrored(registers.clone(), 0x2000..=0x3FFF);

        memory.set_byte_at(w(0x2009), b(0x77)).unwrap();

        assert_eq!(registers.borrow().get_byte(w(1)).unwrap(), 0x77u8);
        assert_eq!(memory.get_byte(w(0x3FF9)).unwrap(), 0x77u8);
    }
}
