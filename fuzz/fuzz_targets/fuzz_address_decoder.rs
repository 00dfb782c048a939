//! Fuzz target for the address decoder.
//!
//! Applies an arbitrary sequence of map and unmap operations and checks that every
//! access resolves to exactly the component the tables say it should.

#![no_main]

use std::rc::Rc;

use arbitrary::Arbitrary;
use a2core::component::same_component;
use a2core::{
    AddressDecoder, Component, ComponentRef, FloatingBus, MapPriority, MapTable, MemoryMap, Ram,
};
use libfuzzer_sys::fuzz_target;

#[derive(Debug, Arbitrary)]
enum FuzzOp {
    Map {
        table: u8,
        device: u8,
        start: u16,
        len: u16,
        read: bool,
        write: bool,
    },
    UnmapLast,
    Write { address: u16, value: u8 },
    Read { address: u16 },
}

/// Winner of `address` by scanning tables in priority order, newest entry first.
fn expected_reader(mapped: &[(MapTable, MemoryMap)], address: u32) -> Option<ComponentRef> {
    MapPriority::DEFAULT.order().iter().find_map(|table| {
        mapped
            .iter()
            .rev()
            .find(|(t, e)| t == table && e.read && e.start <= address && address <= e.end)
            .map(|(_, e)| e.component.clone())
    })
}

fuzz_target!(|ops: Vec<FuzzOp>| {
    let floating_bus = FloatingBus::new();
    floating_bus.latch(0xA5);
    let decoder = AddressDecoder::new();
    decoder.set_ref("floatingBus", Some(floating_bus.clone()));

    let devices: Vec<Rc<Ram>> = (0..4).map(|_| Ram::with_size(0x10000)).collect();
    let mut mapped: Vec<(MapTable, MemoryMap)> = Vec::new();

    for op in ops {
        match op {
            FuzzOp::Map {
                table,
                device,
                start,
                len,
                read,
                write,
            } => {
                let table = MapTable::ALL[table as usize % 4];
                let device = devices[device as usize % devices.len()].clone();
                let end = (start as u32 + len as u32).min(0xFFFF);
                let entry = MemoryMap {
                    component: device,
                    start: start as u32,
                    end,
                    read,
                    write,
                };
                if decoder.map(table, entry.clone()) {
                    mapped.push((table, entry));
                }
            }
            FuzzOp::UnmapLast => {
                if let Some((table, entry)) = mapped.pop() {
                    assert!(decoder.unmap(table, &entry));
                }
            }
            FuzzOp::Write { address, value } => decoder.write(address as u32, value),
            FuzzOp::Read { address } => {
                let address = address as u32;
                let value = decoder.read(address);
                match (decoder.read_target(address), expected_reader(&mapped, address)) {
                    (None, None) => assert_eq!(value, floating_bus.value()),
                    (Some(actual), Some(expected)) => {
                        assert!(same_component(&actual, &expected), "at {:04X}", address)
                    }
                    (actual, expected) => panic!(
                        "at {:04X}: decoded {} but expected {}",
                        address,
                        actual.is_some(),
                        expected.is_some()
                    ),
                }
            }
        }
    }

    decoder.dispose();
});
