//! RamFactor RAM expansion card.
//!
//! A slot card exposing up to 16MB of RAM through four I/O registers and switching
//! between two 4K firmware banks.
//!
//! # Register Layout
//!
//! The card decodes the low four address bits of its slot I/O range:
//!
//! | Offset | Read                              | Write                    |
//! |--------|-----------------------------------|--------------------------|
//! | 0      | address bits 0-7                  | address bits 0-7         |
//! | 1      | address bits 8-15                 | address bits 8-15        |
//! | 2      | address bits 16-23 (see below)    | address bits 16-23       |
//! | 3      | RAM byte at address, then address+1 | RAM byte at address, then address+1 |
//! | F      | firmware bank                     | firmware bank            |
//!
//! Other offsets read the floating bus. Cards with less than 1MB fitted report the
//! unused high address nibble as ones, which is how firmware sizes the card. Bit 0 of
//! the bank register selects which half of the 8K firmware ROM appears in the slot's
//! 4K window; the card asks its bank switcher to offset that window by 0x1000.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use crate::component::{
    hex_string, parse_int, Address, Component, ComponentRef, ConfigError, Message,
    Notification, NotificationId, ObserverRef, PowerState,
};
use crate::devices::address_offset::AddressOffsetMap;
use crate::observer::rewire_observer;

const ADDRESS_MASK: u32 = 0xFF_FFFF;
const FULL_CARD_SIZE: usize = 0x10_0000;

/// RamFactor card registers.
///
/// References: `controlBus`, `floatingBus`, `bankSwitcher`, `ram` (all required).
/// Properties: `address`, `bank`.
pub struct RamFactor {
    this: Weak<RamFactor>,
    control_bus: RefCell<Option<ComponentRef>>,
    floating_bus: RefCell<Option<ComponentRef>>,
    bank_switcher: RefCell<Option<ComponentRef>>,
    ram: RefCell<Option<ComponentRef>>,
    address: Cell<u32>,
    bank: Cell<u8>,
    high_nibble_set: Cell<bool>,
}

impl RamFactor {
    pub fn new() -> Rc<Self> {
        Rc::new_cyclic(|this| Self {
            this: this.clone(),
            control_bus: RefCell::new(None),
            floating_bus: RefCell::new(None),
            bank_switcher: RefCell::new(None),
            ram: RefCell::new(None),
            address: Cell::new(0),
            bank: Cell::new(0),
            high_nibble_set: Cell::new(false),
        })
    }

    /// Current 24-bit RAM address register.
    pub fn address(&self) -> u32 {
        self.address.get()
    }

    /// Current firmware bank register.
    pub fn bank(&self) -> u8 {
        self.bank.get()
    }

    fn observer(&self) -> ObserverRef {
        self.this.clone()
    }

    fn next_address(&self) -> u32 {
        let current = self.address.get();
        self.address.set(current.wrapping_add(1) & ADDRESS_MASK);
        current
    }

    fn set_firmware_bank(&self, value: u8) {
        let previous = self.bank.replace(value);
        if (previous ^ value) & 0x01 == 0 {
            return;
        }
        let mut message = Message::MapOffset(AddressOffsetMap {
            start: 0x0000,
            end: 0x0FFF,
            offset: if value & 0x01 != 0 { 0x1000 } else { 0 },
        });
        let switcher = self.bank_switcher.borrow().clone();
        if let Some(switcher) = switcher {
            switcher.post_message(&mut message);
        }
    }

    fn update_ram_size(&self, size: usize) {
        self.high_nibble_set.set(size < FULL_CARD_SIZE);
    }
}

impl Component for RamFactor {
    fn set_value(&self, name: &str, value: &str) -> bool {
        let Some(number) = parse_int(value) else {
            return false;
        };
        match name {
            "address" => self.address.set(number as u32 & ADDRESS_MASK),
            "bank" => self.bank.set(number as u8),
            _ => return false,
        }
        true
    }

    fn get_value(&self, name: &str) -> Option<String> {
        match name {
            "address" => Some(hex_string(self.address.get() as u64, 6)),
            "bank" => Some(hex_string(self.bank.get() as u64, 2)),
            _ => None,
        }
    }

    fn set_ref(&self, name: &str, target: Option<ComponentRef>) -> bool {
        match name {
            "controlBus" => {
                rewire_observer(
                    &self.control_bus,
                    target,
                    &self.observer(),
                    &[NotificationId::PowerStateDidChange],
                );
            }
            "floatingBus" => *self.floating_bus.borrow_mut() = target,
            "bankSwitcher" => *self.bank_switcher.borrow_mut() = target,
            "ram" => {
                rewire_observer(
                    &self.ram,
                    target,
                    &self.observer(),
                    &[NotificationId::RamSizeDidChange],
                );
            }
            _ => return false,
        }
        true
    }

    fn init(&self) -> Result<(), ConfigError> {
        let required = [
            ("controlBus", &self.control_bus),
            ("floatingBus", &self.floating_bus),
            ("bankSwitcher", &self.bank_switcher),
            ("ram", &self.ram),
        ];
        for (name, slot) in required {
            if slot.borrow().is_none() {
                return Err(ConfigError::MissingRef(name));
            }
        }

        let ram = self.ram.borrow().clone();
        let size = ram
            .and_then(|ram| ram.get_value("size"))
            .and_then(|size| parse_int(&size));
        match size {
            Some(size) => {
                self.update_ram_size(size as usize);
                Ok(())
            }
            None => {
                log::error!("RamFactor cannot determine RAM size");
                Err(ConfigError::InvalidValue {
                    name: "ram",
                    value: "size unavailable".to_string(),
                })
            }
        }
    }

    fn dispose(&self) {
        self.set_ref("controlBus", None);
        self.set_ref("ram", None);
        *self.floating_bus.borrow_mut() = None;
        *self.bank_switcher.borrow_mut() = None;
    }

    fn notify(&self, _sender: &dyn Component, notification: &Notification) {
        match *notification {
            Notification::PowerStateDidChange(PowerState::Off) => {
                self.address.set(0);
                self.set_firmware_bank(0);
            }
            Notification::RamSizeDidChange(size) => self.update_ram_size(size),
            _ => {}
        }
    }

    fn read(&self, address: Address) -> u8 {
        let current = self.address.get();
        match address & 0xF {
            0x0 => current as u8,
            0x1 => (current >> 8) as u8,
            0x2 => {
                let high = (current >> 16) as u8;
                if self.high_nibble_set.get() {
                    high | 0xF0
                } else {
                    high
                }
            }
            0x3 => {
                let ram = self.ram.borrow().clone();
                let target = self.next_address();
                ram.map_or(0, |ram| ram.read(target))
            }
            0xF => self.bank.get(),
            _ => {
                let floating_bus = self.floating_bus.borrow().clone();
                floating_bus.map_or(0xFF, |bus| bus.read(address))
            }
        }
    }

    fn write(&self, address: Address, value: u8) {
        let current = self.address.get();
        match address & 0xF {
            0x0 => self.address.set((current & 0xFF_FF00) | value as u32),
            0x1 => self.address.set((current & 0xFF_00FF) | (value as u32) << 8),
            0x2 => self.address.set((current & 0x00_FFFF) | (value as u32) << 16),
            0x3 => {
                let ram = self.ram.borrow().clone();
                let target = self.next_address();
                if let Some(ram) = ram {
                    ram.write(target, value);
                }
            }
            0xF => self.set_firmware_bank(value),
            _ => {}
        }
    }
}
