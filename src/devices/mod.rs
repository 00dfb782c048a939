//! Bus components that sit around the CPU.
//!
//! Each device implements [`Component`](crate::Component) and is wired into a machine
//! by reference (`set_ref`) and by memory map entries registered with the
//! [`AddressDecoder`](crate::AddressDecoder).
//!
//! - [`ControlBus`]: power, reset, NMI and IRQ lines, cycle counter, timers, CPU slicing
//! - [`Ram`], [`Rom`]: storage
//! - [`FloatingBus`]: value of undriven reads
//! - [`AddressOffset`]: per-block address translation for bank switching
//! - [`RamFactor`]: RAM expansion card with banked firmware
//!
//! # Example
//!
//! ```rust
//! use a2core::{AddressDecoder, Component, FloatingBus, MapTable, MemoryMap, Ram, Rom};
//!
//! let decoder = AddressDecoder::new();
//! decoder.set_ref("floatingBus", Some(FloatingBus::new()));
//!
//! // 48KB RAM at 0x0000-0xBFFF
//! let ram = Ram::with_size(0xC000);
//! decoder.map(MapTable::External, MemoryMap::new(ram, 0x0000, 0xBFFF));
//!
//! // 12KB ROM at 0xD000-0xFFFF
//! let rom = Rom::with_image(vec![0xEA; 0x3000]);
//! decoder.map(MapTable::External, MemoryMap::read_only(rom, 0xD000, 0xFFFF));
//!
//! decoder.write(0x0800, 0x42);
//! assert_eq!(decoder.read(0x0800), 0x42);
//! assert_eq!(decoder.read(0xD000), 0xEA);
//! ```

pub mod address_offset;
pub mod control_bus;
pub mod floating_bus;
pub mod ram;
pub mod ram_factor;
pub mod rom;

pub use address_offset::{AddressOffset, AddressOffsetMap};
pub use control_bus::ControlBus;
pub use floating_bus::FloatingBus;
pub use ram::Ram;
pub use ram_factor::RamFactor;
pub use rom::Rom;
