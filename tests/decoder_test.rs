//! Address decoder tests.
//!
//! Tests cover:
//! - Dispatch to RAM and ROM with read-only overlays
//! - Floating bus answers for unmapped reads, including a driven bus
//! - Overlap resolution between tables and within one table
//! - Map/unmap round trips and priority changes
//! - The Map/Unmap message protocol
//! - Address size and block size configuration

use std::cell::Cell;
use std::rc::Rc;

use a2core::{
    Address, AddressDecoder, Component, ConfigError, FloatingBus, MapPriority, MapTable,
    Message, MemoryMap, Ram, Rom,
};

/// Answers every read with a fixed tag.
struct Tag(u8);

impl Component for Tag {
    fn read(&self, _address: Address) -> u8 {
        self.0
    }
}

/// Drives the bus with the low byte of the address it was asked about.
struct VideoScanner {
    reads: Cell<u32>,
}

impl Component for VideoScanner {
    fn read(&self, address: Address) -> u8 {
        self.reads.set(self.reads.get() + 1);
        address as u8
    }
}

fn tag(value: u8) -> Rc<Tag> {
    Rc::new(Tag(value))
}

/// Helper function to create a decoder with a floating bus latched at 0x5A
fn setup_decoder() -> (Rc<AddressDecoder>, Rc<FloatingBus>) {
    let decoder = AddressDecoder::new();
    let floating_bus = FloatingBus::new();
    floating_bus.latch(0x5A);
    decoder.set_ref("floatingBus", Some(floating_bus.clone()));
    decoder.init().unwrap();
    (decoder, floating_bus)
}

// ========== Dispatch ==========

#[test]
fn test_ram_read_write() {
    let (decoder, _) = setup_decoder();
    let ram = Ram::with_size(0xC000);
    decoder.map(MapTable::External, MemoryMap::new(ram.clone(), 0x0000, 0xBFFF));

    decoder.write(0x0400, 0xA0);
    assert_eq!(ram.read(0x0400), 0xA0);
    assert_eq!(decoder.read(0x0400), 0xA0);
}

#[test]
fn test_rom_over_ram_passes_writes_through() {
    let (decoder, _) = setup_decoder();
    let ram = Ram::with_size(0x10000);
    let rom = Rom::with_image(vec![0x4C; 0x3000]);
    decoder.map(MapTable::External, MemoryMap::new(ram.clone(), 0x0000, 0xFFFF));
    decoder.map(MapTable::External, MemoryMap::read_only(rom, 0xD000, 0xFFFF));

    decoder.write(0xE000, 0x11);
    assert_eq!(decoder.read(0xE000), 0x4C);
    // The write landed in the RAM underneath
    assert_eq!(ram.read(0xE000), 0x11);
}

#[test]
fn test_addresses_wrap_to_address_space() {
    let (decoder, _) = setup_decoder();
    let ram = Ram::with_size(0x10000);
    decoder.map(MapTable::External, MemoryMap::new(ram.clone(), 0x0000, 0xFFFF));

    decoder.write(0x1_0010, 0x77);
    assert_eq!(ram.read(0x0010), 0x77);
}

// ========== Floating Bus ==========

#[test]
fn test_unmapped_read_returns_floating_value() {
    let (decoder, _) = setup_decoder();
    assert_eq!(decoder.read(0xC060), 0x5A);
}

#[test]
fn test_unmapped_write_is_dropped() {
    let (decoder, floating_bus) = setup_decoder();
    decoder.write(0xC060, 0x12);
    assert_eq!(floating_bus.value(), 0x5A);
}

#[test]
fn test_floating_bus_follows_driver() {
    let (decoder, floating_bus) = setup_decoder();
    let scanner = Rc::new(VideoScanner { reads: Cell::new(0) });
    floating_bus.set_ref("driver", Some(scanner.clone()));

    assert_eq!(decoder.read(0xC061), 0x61);
    assert_eq!(decoder.read(0xC0F2), 0xF2);
    assert_eq!(scanner.reads.get(), 2);
    // The last driven value stays latched
    assert_eq!(floating_bus.value(), 0xF2);
}

#[test]
fn test_init_requires_floating_bus() {
    let decoder = AddressDecoder::new();
    assert_eq!(decoder.init(), Err(ConfigError::MissingRef("floatingBus")));
}

// ========== Overlap ==========

#[test]
fn test_internal_table_beats_external() {
    let (decoder, _) = setup_decoder();
    decoder.map(MapTable::Internal, MemoryMap::new(tag(0x01), 0xC000, 0xC0FF));
    decoder.map(MapTable::External, MemoryMap::new(tag(0x02), 0x0000, 0xFFFF));

    assert_eq!(decoder.read(0xC000), 0x01);
    assert_eq!(decoder.read(0xC100), 0x02);
}

#[test]
fn test_latest_entry_wins_within_table() {
    let (decoder, _) = setup_decoder();
    decoder.map(MapTable::Cxxx, MemoryMap::new(tag(0x10), 0xC800, 0xCFFF));
    decoder.map(MapTable::Cxxx, MemoryMap::new(tag(0x20), 0xC800, 0xCFFF));
    assert_eq!(decoder.read(0xC900), 0x20);
}

#[test]
fn test_overlap_is_independent_of_external_order() {
    let first = setup_decoder().0;
    let second = setup_decoder().0;
    let card = tag(0xCA);
    let ram = tag(0xAA);

    first.map(MapTable::External, MemoryMap::new(ram.clone(), 0x0000, 0xFFFF));
    first.map(MapTable::IoSlot, MemoryMap::new(card.clone(), 0xC090, 0xC09F));
    second.map(MapTable::IoSlot, MemoryMap::new(card, 0xC090, 0xC09F));
    second.map(MapTable::External, MemoryMap::new(ram, 0x0000, 0xFFFF));

    for address in [0xC08F, 0xC090, 0xC09F, 0xC0A0] {
        assert_eq!(first.read(address), second.read(address), "at {:04X}", address);
    }
    assert_eq!(first.read(0xC095), 0xCA);
}

#[test]
fn test_soft_switch_leaves_neighbours_floating() {
    let (decoder, _) = setup_decoder();
    decoder.map(MapTable::Internal, MemoryMap::new(tag(0x11), 0xC000, 0xC000));

    assert_eq!(decoder.read(0xC000), 0x11);
    assert_eq!(decoder.read(0xC001), 0x5A);
    assert_eq!(decoder.read(0xC00F), 0x5A);
}

#[test]
fn test_soft_switch_does_not_shadow_lower_table() {
    let (decoder, _) = setup_decoder();
    decoder.map(MapTable::External, MemoryMap::new(tag(0x22), 0xC001, 0xC00F));
    decoder.map(MapTable::Internal, MemoryMap::new(tag(0x11), 0xC000, 0xC000));

    assert_eq!(decoder.read(0xC000), 0x11);
    assert_eq!(decoder.read(0xC005), 0x22);
    assert_eq!(decoder.read(0xC00F), 0x22);
}

#[test]
fn test_adjacent_soft_switches_resolve_separately() {
    let (decoder, _) = setup_decoder();
    let keyboard = tag(0xC1);
    let strobe = tag(0x10);
    let speaker = tag(0x30);
    decoder.map(MapTable::Internal, MemoryMap::read_only(keyboard, 0xC000, 0xC00F));
    decoder.map(MapTable::Internal, MemoryMap::new(strobe, 0xC010, 0xC010));
    decoder.map(MapTable::Internal, MemoryMap::new(speaker, 0xC030, 0xC030));

    assert_eq!(decoder.read(0xC00F), 0xC1);
    assert_eq!(decoder.read(0xC010), 0x10);
    assert_eq!(decoder.read(0xC011), 0x5A);
    assert_eq!(decoder.read(0xC030), 0x30);
    assert_eq!(decoder.read(0xC031), 0x5A);
    assert!(decoder.write_target(0xC000).is_none());
}

#[test]
fn test_read_and_write_resolve_separately() {
    let (decoder, _) = setup_decoder();
    let ram = Ram::with_size(0x10000);
    decoder.map(MapTable::External, MemoryMap::new(ram.clone(), 0x0000, 0xFFFF));
    decoder.map(MapTable::Internal, MemoryMap::read_only(tag(0xEE), 0xD000, 0xDFFF));

    decoder.write(0xD010, 0x33);
    assert_eq!(decoder.read(0xD010), 0xEE);
    assert_eq!(ram.read(0xD010), 0x33);
    assert!(decoder.write_target(0xD010).is_some());
}

// ========== Map / Unmap ==========

#[test]
fn test_unmap_restores_previous_owner() {
    let (decoder, _) = setup_decoder();
    decoder.map(MapTable::External, MemoryMap::new(tag(0x01), 0x0000, 0xFFFF));
    let overlay = MemoryMap::new(tag(0x02), 0x2000, 0x3FFF);

    assert!(decoder.map(MapTable::External, overlay.clone()));
    assert_eq!(decoder.read(0x2800), 0x02);
    assert!(decoder.unmap(MapTable::External, &overlay));
    assert_eq!(decoder.read(0x2800), 0x01);

    // Only identical entries match
    assert!(!decoder.unmap(MapTable::External, &overlay));
}

#[test]
fn test_unmap_falls_back_to_floating_bus() {
    let (decoder, _) = setup_decoder();
    let entry = MemoryMap::new(tag(0x01), 0xC000, 0xC00F);
    decoder.map(MapTable::IoSlot, entry.clone());
    decoder.unmap(MapTable::IoSlot, &entry);
    assert_eq!(decoder.read(0xC000), 0x5A);
}

#[test]
fn test_unmap_requires_matching_table() {
    let (decoder, _) = setup_decoder();
    let entry = MemoryMap::new(tag(0x01), 0xC000, 0xC00F);
    decoder.map(MapTable::IoSlot, entry.clone());
    assert!(!decoder.unmap(MapTable::Internal, &entry));
    assert_eq!(decoder.read(0xC000), 0x01);
}

#[test]
fn test_map_rejects_invalid_range() {
    let (decoder, _) = setup_decoder();
    assert!(!decoder.map(MapTable::External, MemoryMap::new(tag(0), 0x2000, 0x1000)));
    assert!(!decoder.map(MapTable::External, MemoryMap::new(tag(0), 0x0000, 0x1_0000)));
}

#[test]
fn test_priority_change_re_resolves() {
    let (decoder, _) = setup_decoder();
    decoder.map(MapTable::Internal, MemoryMap::new(tag(0x01), 0xC000, 0xCFFF));
    decoder.map(MapTable::External, MemoryMap::new(tag(0x02), 0xC000, 0xCFFF));
    assert_eq!(decoder.read(0xC400), 0x01);

    let external_first = MapPriority::new([
        MapTable::External,
        MapTable::Internal,
        MapTable::IoSlot,
        MapTable::Cxxx,
    ])
    .unwrap();
    decoder.set_priority(external_first);
    assert_eq!(decoder.read(0xC400), 0x02);
}

#[test]
fn test_priority_requires_every_table_once() {
    assert!(MapPriority::new([
        MapTable::Internal,
        MapTable::Internal,
        MapTable::Cxxx,
        MapTable::External,
    ])
    .is_none());
    assert_eq!(MapPriority::default(), MapPriority::DEFAULT);
}

// ========== Messages ==========

#[test]
fn test_map_and_unmap_messages() {
    let (decoder, _) = setup_decoder();
    let entry = MemoryMap::new(tag(0x42), 0xC0A0, 0xC0AF);

    assert!(decoder.post_message(&mut Message::Map(MapTable::IoSlot, entry.clone())));
    assert_eq!(decoder.read(0xC0A3), 0x42);
    assert!(decoder.post_message(&mut Message::Unmap(MapTable::IoSlot, entry)));
    assert_eq!(decoder.read(0xC0A3), 0x5A);
}

#[test]
fn test_unrelated_message_not_handled() {
    let (decoder, _) = setup_decoder();
    assert!(!decoder.post_message(&mut Message::AssertNmi));
}

// ========== Configuration ==========

#[test]
fn test_address_size_property() {
    let (decoder, _) = setup_decoder();
    assert!(decoder.set_value("addressSize", "12"));
    assert_eq!(decoder.get_value("addressSize").as_deref(), Some("12"));

    let ram = Ram::with_size(0x1000);
    decoder.map(MapTable::External, MemoryMap::new(ram.clone(), 0x000, 0xFFF));
    decoder.write(0x1234, 0x99);
    assert_eq!(ram.read(0x234), 0x99);

    assert!(!decoder.map(MapTable::External, MemoryMap::new(ram, 0x000, 0x1FFF)));
}

#[test]
fn test_block_size_must_be_power_of_two() {
    let (decoder, _) = setup_decoder();
    assert!(!decoder.set_value("blockSize", "24"));
    assert!(decoder.set_value("blockSize", "0x100"));
    assert_eq!(decoder.get_value("blockSize").as_deref(), Some("256"));
}

#[test]
fn test_dispose_clears_tables() {
    let (decoder, _) = setup_decoder();
    decoder.map(MapTable::External, MemoryMap::new(tag(0x01), 0x0000, 0xFFFF));
    decoder.dispose();
    assert!(decoder.read_target(0x1000).is_none());
    assert_eq!(decoder.read(0x1000), 0xFF);
}
