//! # Apple I / Apple II Emulation Core
//!
//! The machine-independent core of an Apple I/II emulator: a component model for
//! wiring devices together, an address decoder that routes CPU bus cycles to devices,
//! a notification multicast for hardware signals, and an NMOS 6502 with a faithful
//! interrupt state machine and cycle budget.
//!
//! ## Quick Start
//!
//! ```rust
//! use a2core::{
//!     AddressDecoder, Component, ControlBus, FloatingBus, MapTable, MemoryMap, Mos6502,
//!     PowerState, Ram, Rom,
//! };
//!
//! // 48KB RAM and a 4KB ROM whose reset vector points at 0xF000
//! let ram = Ram::with_size(0xC000);
//! let mut image = vec![0xEA; 0x1000]; // NOP
//! image[0x0FFC] = 0x00;
//! image[0x0FFD] = 0xF0;
//! let rom = Rom::with_image(image);
//!
//! let decoder = AddressDecoder::new();
//! decoder.set_ref("floatingBus", Some(FloatingBus::new()));
//! decoder.map(MapTable::External, MemoryMap::new(ram, 0x0000, 0xBFFF));
//! decoder.map(MapTable::External, MemoryMap::read_only(rom, 0xF000, 0xFFFF));
//!
//! let cpu = Mos6502::new();
//! let control_bus = ControlBus::new();
//! cpu.set_ref("memoryBus", Some(decoder.clone()));
//! cpu.set_ref("controlBus", Some(control_bus.clone()));
//! control_bus.set_ref("cpu", Some(cpu.clone()));
//! decoder.init().unwrap();
//! cpu.init().unwrap();
//! control_bus.init().unwrap();
//!
//! // Power-on pulses reset; the first 7 cycles load PC from the vector
//! control_bus.set_power_state(PowerState::On);
//! control_bus.run(7 + 2 * 10);
//! assert_eq!(cpu.registers().pc, 0xF00A);
//! assert_eq!(control_bus.cycles(), 27);
//! #
//! # cpu.dispose();
//! # control_bus.dispose();
//! ```
//!
//! ## Architecture
//!
//! - **Components**: every device implements [`Component`], a trait of optional
//!   capabilities (properties, references, data, messages, observers, bus access).
//!   Components are shared as `Rc<dyn Component>` and use interior mutability, so a
//!   device write can notify the CPU while the CPU is mid-instruction.
//! - **Signals**: power, reset, IRQ and NMI travel as [`Notification`]s from the
//!   [`ControlBus`] to registered observers. Observers are held weakly.
//! - **Decoding**: the [`AddressDecoder`] resolves every address to
//!   one read target and one write target ahead of time, honoring a [`MapPriority`]
//!   between its four map tables.
//! - **Execution**: the [`ControlBus`] slices time and hands each slice to the
//!   [`Mos6502`] as a cycle budget.
//!
//! ## Modules
//!
//! - `component` - Component trait, messages, notifications, property helpers
//! - `observer` - Notification multicast list
//! - `decoder` - Address decoder
//! - `cpu` - 6502 state and execution loop
//! - `opcodes` - Opcode table
//! - `addressing` - Addressing modes
//! - `devices` - Control bus, RAM, ROM, floating bus, bank switcher, RamFactor card
//! - `emulation` - Named-component machine assembly

pub mod addressing;
pub mod component;
pub mod cpu;
pub mod decoder;
pub mod devices;
pub mod emulation;
pub mod observer;
pub mod opcodes;

// Internal instruction implementations (not part of public API)
mod instructions;

#[cfg(feature = "wasm")]
pub mod wasm;

// Re-export public API
pub use addressing::AddressingMode;
pub use component::{
    Address, BufferView, Component, ComponentRef, ConfigError, Message, Notification,
    NotificationId, ObserverRef, PowerState,
};
pub use cpu::{Mos6502, Registers, Status, TraceHook, TraceRecord};
pub use decoder::{AddressDecoder, MapPriority, MapTable, MemoryMap};
pub use devices::{AddressOffset, AddressOffsetMap, ControlBus, FloatingBus, Ram, RamFactor, Rom};
pub use emulation::{Emulation, EmulationError};
pub use observer::ObserverList;
pub use opcodes::{OpcodeClass, OpcodeMetadata, OPCODE_TABLE};
