//! Address offset bank switcher.
//!
//! Sits between the decoder and a storage component and adds a per-block signed offset
//! to every address before forwarding it. Installing an [`AddressOffsetMap`] is how a
//! card says "this 4K window now aliases that other 4K window" without touching the
//! decoder tables.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::component::{parse_int, Address, Component, ComponentRef, ConfigError, Message};

/// Offset translation for `start..=end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddressOffsetMap {
    /// First address, inclusive
    pub start: Address,
    /// Last address, inclusive
    pub end: Address,
    /// Added to every address in the range before forwarding
    pub offset: i64,
}

const DEFAULT_ADDRESS_SIZE: u32 = 16;
const DEFAULT_BLOCK_SIZE: u32 = 0x100;

/// Bank switcher driven by [`Message::MapOffset`].
///
/// Reference: `memory` (required). Properties: `addressSize` (bits, default 16),
/// `blockSize` (bytes, power of two, default 256). Offset translation is applied
/// per block; the translated address is not masked, so it may reach past the incoming
/// address space into a larger storage component.
///
/// # Examples
///
/// ```rust
/// use a2core::{AddressOffset, AddressOffsetMap, Component, Message, Rom};
///
/// // Two 4K firmware banks in one 8K ROM
/// let mut image = vec![0x11; 0x1000];
/// image.extend(vec![0x22; 0x1000]);
/// let rom = Rom::with_image(image);
///
/// let switcher = AddressOffset::new();
/// switcher.set_ref("memory", Some(rom));
/// assert_eq!(switcher.read(0x0123), 0x11);
///
/// let mut message = Message::MapOffset(AddressOffsetMap {
///     start: 0x0000,
///     end: 0x0FFF,
///     offset: 0x1000,
/// });
/// assert!(switcher.post_message(&mut message));
/// assert_eq!(switcher.read(0x0123), 0x22);
/// ```
pub struct AddressOffset {
    memory: RefCell<Option<ComponentRef>>,
    address_bits: Cell<u32>,
    block_bits: Cell<u32>,
    offsets: RefCell<Vec<i64>>,
}

impl AddressOffset {
    pub fn new() -> Rc<Self> {
        let switcher = Self {
            memory: RefCell::new(None),
            address_bits: Cell::new(DEFAULT_ADDRESS_SIZE),
            block_bits: Cell::new(DEFAULT_BLOCK_SIZE.trailing_zeros()),
            offsets: RefCell::new(Vec::new()),
        };
        switcher.reset_offsets();
        Rc::new(switcher)
    }

    /// Installs `map`. Returns `false` for an inverted or out-of-range map.
    pub fn map_offset(&self, map: &AddressOffsetMap) -> bool {
        let mask = self.address_mask();
        if map.start > map.end || map.end > mask {
            log::warn!("rejected offset map {:?}", map);
            return false;
        }
        let shift = self.block_bits.get();
        let mut offsets = self.offsets.borrow_mut();
        for block in (map.start >> shift)..=(map.end >> shift) {
            offsets[block as usize] = map.offset;
        }
        true
    }

    /// Offset currently applied at `address`.
    pub fn offset_at(&self, address: Address) -> i64 {
        let block = (address & self.address_mask()) >> self.block_bits.get();
        self.offsets.borrow().get(block as usize).copied().unwrap_or(0)
    }

    fn address_mask(&self) -> Address {
        ((1u64 << self.address_bits.get()) - 1) as Address
    }

    fn translate(&self, address: Address) -> Address {
        let address = address & self.address_mask();
        (address as i64 + self.offset_at(address)) as Address
    }

    fn reset_offsets(&self) {
        let bits = self.address_bits.get();
        let blocks = 1usize << (bits - self.block_bits.get().min(bits));
        *self.offsets.borrow_mut() = vec![0; blocks];
    }
}

impl Component for AddressOffset {
    fn set_value(&self, name: &str, value: &str) -> bool {
        let Some(number) = parse_int(value) else {
            return false;
        };
        match name {
            "addressSize" if (8..=24).contains(&number) => {
                self.address_bits.set(number as u32);
                self.reset_offsets();
                true
            }
            "blockSize" if number > 0 && (number as u64).is_power_of_two() => {
                self.block_bits.set(number.trailing_zeros());
                self.reset_offsets();
                true
            }
            _ => false,
        }
    }

    fn get_value(&self, name: &str) -> Option<String> {
        match name {
            "addressSize" => Some(self.address_bits.get().to_string()),
            "blockSize" => Some((1u64 << self.block_bits.get()).to_string()),
            _ => None,
        }
    }

    fn set_ref(&self, name: &str, target: Option<ComponentRef>) -> bool {
        match name {
            "memory" => {
                *self.memory.borrow_mut() = target;
                true
            }
            _ => false,
        }
    }

    fn init(&self) -> Result<(), ConfigError> {
        if self.memory.borrow().is_none() {
            return Err(ConfigError::MissingRef("memory"));
        }
        Ok(())
    }

    fn dispose(&self) {
        *self.memory.borrow_mut() = None;
    }

    fn post_message(&self, message: &mut Message) -> bool {
        match message {
            Message::MapOffset(map) => self.map_offset(map),
            _ => false,
        }
    }

    fn read(&self, address: Address) -> u8 {
        let memory = self.memory.borrow().clone();
        match memory {
            Some(memory) => memory.read(self.translate(address)),
            None => 0,
        }
    }

    fn write(&self, address: Address, value: u8) {
        let memory = self.memory.borrow().clone();
        if let Some(memory) = memory {
            memory.write(self.translate(address), value);
        }
    }
}
