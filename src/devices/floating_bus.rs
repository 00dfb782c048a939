//! Floating bus.
//!
//! Answers reads of addresses nobody drives. On real Apple II hardware the undriven data
//! bus still holds whatever the video circuitry fetched last, and some software reads it
//! deliberately (for vertical-blank sync, or copy protection). The floating bus reproduces
//! that: when a `driver` is wired (normally the video generator) every read asks it for
//! the byte currently on the bus; otherwise the last latched value is returned.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::component::{hex_string, parse_int, Address, Component, ComponentRef};

/// Value on the bus before anything has driven it.
const IDLE_VALUE: u8 = 0xFF;

/// Synthesizes reads of undriven addresses.
///
/// Reference: `driver` (optional). Property: `value` (the latched byte).
///
/// # Examples
///
/// ```rust
/// use a2core::{Component, FloatingBus};
///
/// let bus = FloatingBus::new();
/// assert_eq!(bus.read(0xC050), 0xFF);
///
/// bus.latch(0xA0);
/// assert_eq!(bus.read(0xC050), 0xA0);
/// ```
pub struct FloatingBus {
    driver: RefCell<Option<ComponentRef>>,
    value: Cell<u8>,
}

impl FloatingBus {
    pub fn new() -> Rc<Self> {
        Rc::new(Self {
            driver: RefCell::new(None),
            value: Cell::new(IDLE_VALUE),
        })
    }

    /// Leaves `value` on the bus, as a peripheral driving the data lines would.
    pub fn latch(&self, value: u8) {
        self.value.set(value);
    }

    /// The byte currently latched.
    pub fn value(&self) -> u8 {
        self.value.get()
    }
}

impl Component for FloatingBus {
    fn set_value(&self, name: &str, value: &str) -> bool {
        match (name, parse_int(value)) {
            ("value", Some(v)) if (0..=0xFF).contains(&v) => {
                self.latch(v as u8);
                true
            }
            _ => false,
        }
    }

    fn get_value(&self, name: &str) -> Option<String> {
        match name {
            "value" => Some(hex_string(self.value.get() as u64, 2)),
            _ => None,
        }
    }

    fn set_ref(&self, name: &str, target: Option<ComponentRef>) -> bool {
        match name {
            "driver" => {
                *self.driver.borrow_mut() = target;
                true
            }
            _ => false,
        }
    }

    fn dispose(&self) {
        *self.driver.borrow_mut() = None;
    }

    fn read(&self, address: Address) -> u8 {
        let driver = self.driver.borrow().clone();
        if let Some(driver) = driver {
            self.value.set(driver.read(address));
        }
        self.value.get()
    }

    fn write(&self, _address: Address, value: u8) {
        self.value.set(value);
    }
}
