//! # Address Decoder
//!
//! The address decoder owns the machine's memory map tables and routes every bus access
//! to the component that claims the address.
//!
//! ## Tables and Priority
//!
//! Entries live in one of four [`MapTable`]s. Overlap is allowed: bank switching
//! routinely layers an internal map over an external one. When entries collide, the
//! decoder consults the tables in [`MapPriority`] order (by default
//! `Internal > IoSlot > Cxxx > External`) and, inside a table, prefers the most recently
//! registered entry. Read and write paths are resolved independently, so a ROM can win
//! reads while a language card wins writes on the same range.
//!
//! ## Dispatch
//!
//! The address space is split into blocks of `blockSize` bytes. Whenever a table changes,
//! the winners of the affected blocks are recomputed once; `read`/`write` then index the
//! winner tables directly. A block with a single winner stores it once. A block cut by
//! an entry boundary stores one winner per address, so a one-byte soft switch never
//! shadows its neighbours. Reads that nobody claims go to the floating bus; writes that
//! nobody claims are dropped.
//!
//! # Example
//!
//! ```rust
//! use a2core::{AddressDecoder, Component, FloatingBus, MapTable, MemoryMap, Ram};
//!
//! let floating_bus = FloatingBus::new();
//! let ram = Ram::with_size(0x10000);
//! let decoder = AddressDecoder::new();
//! decoder.set_ref("floatingBus", Some(floating_bus.clone()));
//! decoder.init().unwrap();
//!
//! decoder.map(MapTable::External, MemoryMap::new(ram.clone(), 0x0000, 0xBFFF));
//! decoder.write(0x0400, 0xA0);
//! assert_eq!(decoder.read(0x0400), 0xA0);
//!
//! // Unclaimed addresses read the floating bus
//! floating_bus.latch(0x5A);
//! assert_eq!(decoder.read(0xC800), 0x5A);
//! ```

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use crate::component::{
    parse_int, same_component, Address, Component, ComponentRef, ConfigError, Message,
};

/// Memory map table identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MapTable {
    /// Motherboard-internal maps (soft switches, auxiliary memory).
    Internal,
    /// Per-slot I/O ranges (0xC080-0xC0FF on an Apple II).
    IoSlot,
    /// Slot firmware and expansion ROM (0xC100-0xCFFF).
    Cxxx,
    /// Everything else: main RAM, system ROM, cards mapped by address.
    External,
}

impl MapTable {
    /// All tables, in declaration order.
    pub const ALL: [MapTable; 4] = [
        MapTable::Internal,
        MapTable::IoSlot,
        MapTable::Cxxx,
        MapTable::External,
    ];

    fn index(self) -> usize {
        match self {
            MapTable::Internal => 0,
            MapTable::IoSlot => 1,
            MapTable::Cxxx => 2,
            MapTable::External => 3,
        }
    }
}

/// Order in which tables are consulted when their entries overlap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MapPriority {
    order: [MapTable; 4],
}

impl MapPriority {
    /// `Internal > IoSlot > Cxxx > External`.
    pub const DEFAULT: MapPriority = MapPriority {
        order: MapTable::ALL,
    };

    /// Builds a policy from a highest-first ordering.
    ///
    /// Returns `None` unless every table appears exactly once.
    pub fn new(order: [MapTable; 4]) -> Option<Self> {
        let mut seen = [false; 4];
        for table in order {
            if std::mem::replace(&mut seen[table.index()], true) {
                return None;
            }
        }
        Some(Self { order })
    }

    /// Tables from highest to lowest priority.
    pub fn order(&self) -> &[MapTable; 4] {
        &self.order
    }
}

impl Default for MapPriority {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// A registered `(component, range, read/write enable)` tuple.
///
/// Unmapping matches by component identity plus range and flags, so callers keep the
/// entry they registered (it is cheap to clone).
#[derive(Clone)]
pub struct MemoryMap {
    /// Target of accesses in the range
    pub component: ComponentRef,
    /// First address, inclusive
    pub start: Address,
    /// Last address, inclusive
    pub end: Address,
    /// Entry takes part in read dispatch
    pub read: bool,
    /// Entry takes part in write dispatch
    pub write: bool,
}

impl MemoryMap {
    /// Creates a read/write entry.
    pub fn new(component: ComponentRef, start: Address, end: Address) -> Self {
        Self {
            component,
            start,
            end,
            read: true,
            write: true,
        }
    }

    /// Creates an entry that only claims reads.
    pub fn read_only(component: ComponentRef, start: Address, end: Address) -> Self {
        Self {
            write: false,
            ..Self::new(component, start, end)
        }
    }

    /// Creates an entry that only claims writes.
    pub fn write_only(component: ComponentRef, start: Address, end: Address) -> Self {
        Self {
            read: false,
            ..Self::new(component, start, end)
        }
    }

    fn same_entry(&self, other: &MemoryMap) -> bool {
        same_component(&self.component, &other.component)
            && self.start == other.start
            && self.end == other.end
            && self.read == other.read
            && self.write == other.write
    }

    fn overlaps(&self, start: Address, end: Address) -> bool {
        self.start <= end && start <= self.end
    }

    fn covers(&self, start: Address, end: Address) -> bool {
        self.start <= start && end <= self.end
    }

    fn contains(&self, address: Address) -> bool {
        self.start <= address && address <= self.end
    }
}

impl fmt::Debug for MemoryMap {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "MemoryMap(0x{:04X}-0x{:04X} {}{})",
            self.start,
            self.end,
            if self.read { "R" } else { "-" },
            if self.write { "W" } else { "-" }
        )
    }
}

const DEFAULT_ADDRESS_SIZE: u32 = 16;
const DEFAULT_BLOCK_SIZE: u32 = 16;
const MAX_BLOCK_SIZE: i64 = 0x1000;
const UNMAPPED_VALUE: u8 = 0xFF;

/// Resolved target of one dispatch block.
#[derive(Clone)]
enum Slot {
    /// Every address in the block has the same winner (or none)
    Whole(Option<ComponentRef>),
    /// Entry boundaries fall inside the block; one winner per address
    Split(Box<[Option<ComponentRef>]>),
}

impl Slot {
    /// Resolves `block_start..=block_end` against `candidates`, highest priority first.
    fn resolve(candidates: &[&MemoryMap], block_start: Address, block_end: Address) -> Slot {
        match candidates.first() {
            None => return Slot::Whole(None),
            Some(entry) if entry.covers(block_start, block_end) => {
                return Slot::Whole(Some(entry.component.clone()))
            }
            Some(_) => {}
        }

        let targets: Box<[Option<ComponentRef>]> = (block_start..=block_end)
            .map(|address| {
                candidates
                    .iter()
                    .find(|entry| entry.contains(address))
                    .map(|entry| entry.component.clone())
            })
            .collect();
        if targets.iter().all(|target| same_target(target, &targets[0])) {
            return Slot::Whole(targets[0].clone());
        }
        Slot::Split(targets)
    }

    fn target(&self, offset: usize) -> Option<ComponentRef> {
        match self {
            Slot::Whole(target) => target.clone(),
            Slot::Split(targets) => targets.get(offset).cloned().flatten(),
        }
    }
}

fn same_target(a: &Option<ComponentRef>, b: &Option<ComponentRef>) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(a), Some(b)) => same_component(a, b),
        _ => false,
    }
}

/// Range-based bus dispatcher with per-block precomputed winners.
///
/// Winners are exact per address whatever the block size; `blockSize` only trades
/// table size against the cost of blocks split by entry boundaries.
///
/// Properties: `addressSize` (bits, 8-24, default 16), `blockSize` (bytes, power of
/// two up to 4096, default 16). Reference: `floatingBus` (required).
pub struct AddressDecoder {
    address_bits: Cell<u32>,
    block_bits: Cell<u32>,
    priority: Cell<MapPriority>,
    floating_bus: RefCell<Option<ComponentRef>>,
    tables: RefCell<[Vec<MemoryMap>; 4]>,
    read_map: RefCell<Vec<Slot>>,
    write_map: RefCell<Vec<Slot>>,
}

impl AddressDecoder {
    /// Creates a 16-bit decoder with 16-byte dispatch blocks and empty tables.
    pub fn new() -> Rc<Self> {
        let decoder = Self {
            address_bits: Cell::new(DEFAULT_ADDRESS_SIZE),
            block_bits: Cell::new(DEFAULT_BLOCK_SIZE.trailing_zeros()),
            priority: Cell::new(MapPriority::DEFAULT),
            floating_bus: RefCell::new(None),
            tables: RefCell::new(Default::default()),
            read_map: RefCell::new(Vec::new()),
            write_map: RefCell::new(Vec::new()),
        };
        decoder.rebuild();
        Rc::new(decoder)
    }

    /// Highest valid address.
    pub fn address_mask(&self) -> Address {
        ((1u64 << self.address_bits.get()) - 1) as Address
    }

    /// Dispatch granularity in bytes.
    pub fn block_size(&self) -> u32 {
        1 << self.block_bits.get()
    }

    /// Current table priority.
    pub fn priority(&self) -> MapPriority {
        self.priority.get()
    }

    /// Replaces the table priority and re-resolves the whole address space.
    pub fn set_priority(&self, priority: MapPriority) {
        self.priority.set(priority);
        self.update_read_write_map(0, self.address_mask());
    }

    /// Registers `entry` in `table` and re-resolves its range.
    ///
    /// Returns `false` only for structurally invalid entries: `start > end`, or an end
    /// beyond the address space.
    pub fn map(&self, table: MapTable, entry: MemoryMap) -> bool {
        if entry.start > entry.end || entry.end > self.address_mask() {
            log::warn!("rejected {:?} in {:?} table", entry, table);
            return false;
        }
        log::debug!("map {:?} in {:?} table", entry, table);
        let (start, end) = (entry.start, entry.end);
        self.tables.borrow_mut()[table.index()].push(entry);
        self.update_read_write_map(start, end);
        true
    }

    /// Removes the most recent registration identical to `entry` from `table`.
    ///
    /// Returns `false` if no such registration exists.
    pub fn unmap(&self, table: MapTable, entry: &MemoryMap) -> bool {
        let removed = {
            let mut tables = self.tables.borrow_mut();
            let list = &mut tables[table.index()];
            match list.iter().rposition(|existing| existing.same_entry(entry)) {
                Some(index) => {
                    list.remove(index);
                    true
                }
                None => false,
            }
        };
        if removed {
            log::debug!("unmap {:?} from {:?} table", entry, table);
            self.update_read_write_map(entry.start, entry.end.min(self.address_mask()));
        }
        removed
    }

    /// Recomputes the read and write winners of every address in `start..=end`.
    ///
    /// Work is done per block, so the whole of each block the range touches is
    /// re-resolved.
    pub fn update_read_write_map(&self, start: Address, end: Address) {
        let shift = self.block_bits.get();
        let mask = self.address_mask();
        if start > end || start > mask {
            return;
        }
        let tables = self.tables.borrow();
        let priority = self.priority.get();
        let mut read_map = self.read_map.borrow_mut();
        let mut write_map = self.write_map.borrow_mut();

        for block in (start >> shift)..=(end.min(mask) >> shift) {
            let block_start = block << shift;
            let block_end = block_start | ((1 << shift) - 1);

            // Highest priority first: table order, then newest entry first
            let overlapping: Vec<&MemoryMap> = priority
                .order()
                .iter()
                .flat_map(|table| tables[table.index()].iter().rev())
                .filter(|entry| entry.overlaps(block_start, block_end))
                .collect();
            let readers: Vec<&MemoryMap> =
                overlapping.iter().copied().filter(|entry| entry.read).collect();
            let writers: Vec<&MemoryMap> =
                overlapping.iter().copied().filter(|entry| entry.write).collect();

            read_map[block as usize] = Slot::resolve(&readers, block_start, block_end);
            write_map[block as usize] = Slot::resolve(&writers, block_start, block_end);
        }
    }

    /// Returns the component that wins reads of `address`, if any.
    pub fn read_target(&self, address: Address) -> Option<ComponentRef> {
        self.lookup(&self.read_map.borrow(), address)
    }

    /// Returns the component that wins writes of `address`, if any.
    pub fn write_target(&self, address: Address) -> Option<ComponentRef> {
        self.lookup(&self.write_map.borrow(), address)
    }

    fn lookup(&self, map: &[Slot], address: Address) -> Option<ComponentRef> {
        let address = address & self.address_mask();
        let shift = self.block_bits.get();
        let offset = (address & ((1 << shift) - 1)) as usize;
        map.get((address >> shift) as usize)?.target(offset)
    }

    fn rebuild(&self) {
        let bits = self.address_bits.get();
        let blocks = 1usize << (bits - self.block_bits.get().min(bits));
        *self.read_map.borrow_mut() = vec![Slot::Whole(None); blocks];
        *self.write_map.borrow_mut() = vec![Slot::Whole(None); blocks];
        self.update_read_write_map(0, self.address_mask());
    }
}

impl Component for AddressDecoder {
    fn set_value(&self, name: &str, value: &str) -> bool {
        let Some(number) = parse_int(value) else {
            return false;
        };
        match name {
            "addressSize" if (8..=24).contains(&number) => {
                self.address_bits.set(number as u32);
                self.block_bits
                    .set(self.block_bits.get().min(self.address_bits.get()));
                self.rebuild();
                true
            }
            "blockSize"
                if number > 0
                    && (number as u64).is_power_of_two()
                    && number <= MAX_BLOCK_SIZE.min(1i64 << self.address_bits.get()) =>
            {
                self.block_bits.set(number.trailing_zeros());
                self.rebuild();
                true
            }
            _ => false,
        }
    }

    fn get_value(&self, name: &str) -> Option<String> {
        match name {
            "addressSize" => Some(self.address_bits.get().to_string()),
            "blockSize" => Some(self.block_size().to_string()),
            _ => None,
        }
    }

    fn set_ref(&self, name: &str, target: Option<ComponentRef>) -> bool {
        match name {
            "floatingBus" => {
                *self.floating_bus.borrow_mut() = target;
                true
            }
            _ => false,
        }
    }

    fn init(&self) -> Result<(), ConfigError> {
        if self.floating_bus.borrow().is_none() {
            return Err(ConfigError::MissingRef("floatingBus"));
        }
        Ok(())
    }

    fn dispose(&self) {
        for list in self.tables.borrow_mut().iter_mut() {
            list.clear();
        }
        *self.floating_bus.borrow_mut() = None;
        self.rebuild();
    }

    fn post_message(&self, message: &mut Message) -> bool {
        match message {
            Message::Map(table, entry) => self.map(*table, entry.clone()),
            Message::Unmap(table, entry) => self.unmap(*table, entry),
            _ => false,
        }
    }

    fn read(&self, address: Address) -> u8 {
        let address = address & self.address_mask();
        if let Some(target) = self.read_target(address) {
            return target.read(address);
        }
        let floating_bus = self.floating_bus.borrow().clone();
        match floating_bus {
            Some(floating_bus) => floating_bus.read(address),
            None => UNMAPPED_VALUE,
        }
    }

    fn write(&self, address: Address, value: u8) {
        let address = address & self.address_mask();
        if let Some(target) = self.write_target(address) {
            target.write(address, value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Answers every read with a fixed tag and remembers the last write.
    struct Tagged {
        tag: u8,
        written: Cell<Option<(Address, u8)>>,
    }

    fn tagged(tag: u8) -> Rc<Tagged> {
        Rc::new(Tagged {
            tag,
            written: Cell::new(None),
        })
    }

    impl Component for Tagged {
        fn read(&self, _address: Address) -> u8 {
            self.tag
        }

        fn write(&self, address: Address, value: u8) {
            self.written.set(Some((address, value)));
        }
    }

    fn setup_decoder() -> Rc<AddressDecoder> {
        let decoder = AddressDecoder::new();
        decoder.set_ref("floatingBus", Some(tagged(0xEE)));
        decoder
    }

    #[test]
    fn test_unmapped_reads_use_floating_bus() {
        let decoder = setup_decoder();
        assert_eq!(decoder.read(0x0000), 0xEE);
        assert_eq!(decoder.read(0xFFFF), 0xEE);
    }

    #[test]
    fn test_unmapped_without_floating_bus() {
        let decoder = AddressDecoder::new();
        assert_eq!(decoder.read(0x1234), UNMAPPED_VALUE);
        assert_eq!(decoder.init(), Err(ConfigError::MissingRef("floatingBus")));
    }

    #[test]
    fn test_map_rejects_inverted_range() {
        let decoder = setup_decoder();
        assert!(!decoder.map(MapTable::External, MemoryMap::new(tagged(1), 0x2000, 0x1FFF)));
        assert!(!decoder.map(MapTable::External, MemoryMap::new(tagged(1), 0x0000, 0x10000)));
    }

    #[test]
    fn test_priority_across_tables() {
        let decoder = setup_decoder();
        decoder.map(MapTable::External, MemoryMap::new(tagged(1), 0xC000, 0xCFFF));
        decoder.map(MapTable::Cxxx, MemoryMap::new(tagged(2), 0xC100, 0xC7FF));
        decoder.map(MapTable::Internal, MemoryMap::new(tagged(3), 0xC300, 0xC3FF));

        assert_eq!(decoder.read(0xC000), 1);
        assert_eq!(decoder.read(0xC200), 2);
        assert_eq!(decoder.read(0xC300), 3);
        assert_eq!(decoder.read(0xC800), 1);
    }

    #[test]
    fn test_latest_entry_wins_within_table() {
        let decoder = setup_decoder();
        decoder.map(MapTable::External, MemoryMap::new(tagged(1), 0x0000, 0x0FFF));
        decoder.map(MapTable::External, MemoryMap::new(tagged(2), 0x0800, 0x0FFF));

        assert_eq!(decoder.read(0x0000), 1);
        assert_eq!(decoder.read(0x0800), 2);
    }

    #[test]
    fn test_read_and_write_resolve_independently() {
        let decoder = setup_decoder();
        let rom = tagged(0x60);
        let card = tagged(0x00);
        decoder.map(MapTable::External, MemoryMap::read_only(rom.clone(), 0xD000, 0xFFFF));
        decoder.map(MapTable::External, MemoryMap::write_only(card.clone(), 0xD000, 0xFFFF));

        decoder.write(0xD123, 0x77);
        assert_eq!(decoder.read(0xD123), 0x60);
        assert_eq!(card.written.get(), Some((0xD123, 0x77)));
        assert_eq!(rom.written.get(), None);
    }

    #[test]
    fn test_custom_priority_policy() {
        let decoder = setup_decoder();
        decoder.map(MapTable::External, MemoryMap::new(tagged(1), 0x0000, 0x00FF));
        decoder.map(MapTable::Internal, MemoryMap::new(tagged(2), 0x0000, 0x00FF));
        assert_eq!(decoder.read(0x0010), 2);

        let external_first = MapPriority::new([
            MapTable::External,
            MapTable::Internal,
            MapTable::IoSlot,
            MapTable::Cxxx,
        ])
        .unwrap();
        decoder.set_priority(external_first);
        assert_eq!(decoder.read(0x0010), 1);
    }

    #[test]
    fn test_priority_rejects_duplicates() {
        assert!(MapPriority::new([
            MapTable::External,
            MapTable::External,
            MapTable::IoSlot,
            MapTable::Cxxx,
        ])
        .is_none());
    }

    #[test]
    fn test_messages_map_and_unmap() {
        let decoder = setup_decoder();
        let entry = MemoryMap::new(tagged(4), 0xC080, 0xC08F);

        let mut map = Message::Map(MapTable::IoSlot, entry.clone());
        assert!(decoder.post_message(&mut map));
        assert_eq!(decoder.read(0xC085), 4);

        let mut unmap = Message::Unmap(MapTable::IoSlot, entry.clone());
        assert!(decoder.post_message(&mut unmap));
        assert_eq!(decoder.read(0xC085), 0xEE);

        let mut again = Message::Unmap(MapTable::IoSlot, entry);
        assert!(!decoder.post_message(&mut again));
    }

    #[test]
    fn test_misaligned_entry_claims_only_its_addresses() {
        let decoder = setup_decoder();
        decoder.map(MapTable::External, MemoryMap::new(tagged(9), 0x0105, 0x0105));

        assert_eq!(decoder.read(0x0100), 0xEE);
        assert_eq!(decoder.read(0x0104), 0xEE);
        assert_eq!(decoder.read(0x0105), 9);
        assert_eq!(decoder.read(0x0106), 0xEE);
        assert_eq!(decoder.read(0x010F), 0xEE);
        assert!(decoder.write_target(0x0106).is_none());
    }

    #[test]
    fn test_partial_internal_entry_keeps_external_neighbours() {
        let decoder = setup_decoder();
        decoder.map(MapTable::External, MemoryMap::new(tagged(0x22), 0xC001, 0xC00F));
        decoder.map(MapTable::Internal, MemoryMap::new(tagged(0x11), 0xC000, 0xC000));

        assert_eq!(decoder.read(0xC000), 0x11);
        assert_eq!(decoder.read(0xC001), 0x22);
        assert_eq!(decoder.read(0xC005), 0x22);
        assert_eq!(decoder.read(0xC010), 0xEE);
    }

    #[test]
    fn test_split_block_collapses_after_unmap() {
        let decoder = setup_decoder();
        let switch = MemoryMap::new(tagged(2), 0x0208, 0x0208);
        decoder.map(MapTable::External, MemoryMap::new(tagged(1), 0x0200, 0x02FF));
        decoder.map(MapTable::Internal, switch.clone());
        assert!(matches!(decoder.read_map.borrow()[0x20], Slot::Split(_)));

        decoder.unmap(MapTable::Internal, &switch);
        assert!(matches!(decoder.read_map.borrow()[0x20], Slot::Whole(Some(_))));
        assert_eq!(decoder.read(0x0208), 1);
    }

    #[test]
    fn test_block_size_property() {
        let decoder = setup_decoder();
        assert!(decoder.set_value("blockSize", "1"));
        decoder.map(MapTable::External, MemoryMap::new(tagged(9), 0x0105, 0x0105));

        assert_eq!(decoder.read(0x0104), 0xEE);
        assert_eq!(decoder.read(0x0105), 9);
        assert!(!decoder.set_value("blockSize", "3"));
        assert!(!decoder.set_value("blockSize", "0x2000"));
        assert_eq!(decoder.get_value("blockSize").as_deref(), Some("1"));
    }

    #[test]
    fn test_large_blocks_resolve_per_address() {
        let decoder = setup_decoder();
        assert!(decoder.set_value("blockSize", "0x1000"));
        decoder.map(MapTable::External, MemoryMap::new(tagged(1), 0x0000, 0x0FFF));
        decoder.map(MapTable::IoSlot, MemoryMap::new(tagged(2), 0x0080, 0x008F));

        assert_eq!(decoder.read(0x007F), 1);
        assert_eq!(decoder.read(0x0080), 2);
        assert_eq!(decoder.read(0x008F), 2);
        assert_eq!(decoder.read(0x0090), 1);
    }

    #[test]
    fn test_24_bit_address_space() {
        let decoder = setup_decoder();
        assert!(decoder.set_value("addressSize", "24"));
        assert!(decoder.map(MapTable::External, MemoryMap::new(tagged(5), 0x10000, 0x1FFFF)));

        assert_eq!(decoder.read(0x12345), 5);
        assert_eq!(decoder.read(0x02345), 0xEE);
    }

    #[test]
    fn test_writes_forward_full_address() {
        let decoder = setup_decoder();
        let target = tagged(0);
        decoder.map(MapTable::External, MemoryMap::new(target.clone(), 0x2000, 0x3FFF));

        decoder.write(0x2ABC, 0x11);
        decoder.write(0x4000, 0x22);
        assert_eq!(target.written.get(), Some((0x2ABC, 0x11)));
    }
}
