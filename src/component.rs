//! # Component Capability Interface
//!
//! Every participant on the emulated bus (CPU, address decoder, RAM, ROM, control bus,
//! expansion cards) implements the [`Component`] trait. All capabilities are optional:
//! each method has a safe default (`false`, `None`, `0` or a no-op), so a component that
//! implements only part of the surface behaves correctly when probed for the rest.
//!
//! ## Design
//!
//! - **Shared handles**: components are held as `Rc<dyn Component>` ([`ComponentRef`]) and
//!   every method takes `&self`. Components keep their state in `Cell`/`RefCell`, which
//!   lets a notification reach a component while one of its own bus accesses is still on
//!   the stack (a device write that raises IRQ notifies the CPU mid-instruction).
//! - **Weak observers**: observer registrations hold [`ObserverRef`] (`Weak`) handles;
//!   references wired with `set_ref` hold strong ones. The CPU ↔ control bus cycle is
//!   therefore broken on the observer side.
//! - **No bus errors**: reads and writes never fail. Failure elsewhere is a `bool` or a
//!   default value, except `init`, which reports a [`ConfigError`].
//!
//! # Examples
//!
//! ```rust
//! use a2core::Component;
//! use std::cell::Cell;
//!
//! /// A single latch register mirrored across its whole mapped range.
//! struct Latch {
//!     value: Cell<u8>,
//! }
//!
//! impl Component for Latch {
//!     fn read(&self, _address: u32) -> u8 {
//!         self.value.get()
//!     }
//!
//!     fn write(&self, _address: u32, value: u8) {
//!         self.value.set(value);
//!     }
//! }
//!
//! let latch = Latch { value: Cell::new(0) };
//! latch.write(0xC000, 0x42);
//! assert_eq!(latch.read(0xC0FF), 0x42);
//!
//! // Capabilities the latch does not implement degrade to safe defaults
//! assert!(!latch.set_value("speed", "fast"));
//! assert_eq!(latch.get_value("speed"), None);
//! // Wide accesses compose byte accesses little-endian
//! assert_eq!(latch.read16(0xC000), 0x4242);
//! ```

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use crate::decoder::{MapTable, MemoryMap};
use crate::devices::address_offset::AddressOffsetMap;

/// Bus address. Wide enough for the 24-bit spaces of RAM expansion cards.
pub type Address = u32;

/// Strong handle to a component, used for reference wiring and memory maps.
pub type ComponentRef = Rc<dyn Component>;

/// Weak handle to a component, used for observer registrations.
pub type ObserverRef = Weak<dyn Component>;

/// Machine power state as reported by the control bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum PowerState {
    /// Power removed. Volatile state is lost.
    #[default]
    Off,
    /// Suspended to persistent storage.
    Hibernate,
    /// Suspended with memory kept alive.
    Standby,
    /// Powered but not running.
    Paused,
    /// Running.
    On,
}

impl PowerState {
    /// Property-string name of the state.
    pub fn name(self) -> &'static str {
        match self {
            PowerState::Off => "off",
            PowerState::Hibernate => "hibernate",
            PowerState::Standby => "standby",
            PowerState::Paused => "paused",
            PowerState::On => "on",
        }
    }

    /// Parses a property-string power state name.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "off" => Some(PowerState::Off),
            "hibernate" => Some(PowerState::Hibernate),
            "standby" => Some(PowerState::Standby),
            "paused" | "pause" => Some(PowerState::Paused),
            "on" => Some(PowerState::On),
            _ => None,
        }
    }
}

impl fmt::Display for PowerState {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Key under which observers register for a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NotificationId {
    PowerStateDidChange,
    ResetDidAssert,
    ResetDidClear,
    IrqDidChange,
    NmiDidAssert,
    TimerDidFire,
    RamSizeDidChange,
}

/// Payload delivered to observers by [`Component::notify`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notification {
    /// The control bus changed power state.
    PowerStateDidChange(PowerState),
    /// The reset line went active.
    ResetDidAssert,
    /// The reset line was released. The CPU runs its reset sequence on this edge.
    ResetDidClear,
    /// The wired-OR IRQ line changed level. `true` means asserted.
    IrqDidChange(bool),
    /// An NMI edge was signalled.
    NmiDidAssert,
    /// A timer scheduled with [`Message::ScheduleTimer`] expired. Carries the timer id.
    TimerDidFire(u32),
    /// A storage component reallocated its buffer. Carries the new size in bytes.
    ///
    /// Any [`BufferView`] obtained before this notification no longer resolves.
    RamSizeDidChange(usize),
}

impl Notification {
    /// Returns the registration key for this notification.
    pub fn id(&self) -> NotificationId {
        match self {
            Notification::PowerStateDidChange(_) => NotificationId::PowerStateDidChange,
            Notification::ResetDidAssert => NotificationId::ResetDidAssert,
            Notification::ResetDidClear => NotificationId::ResetDidClear,
            Notification::IrqDidChange(_) => NotificationId::IrqDidChange,
            Notification::NmiDidAssert => NotificationId::NmiDidAssert,
            Notification::TimerDidFire(_) => NotificationId::TimerDidFire,
            Notification::RamSizeDidChange(_) => NotificationId::RamSizeDidChange,
        }
    }
}

/// Requests passed through [`Component::post_message`].
///
/// Variants that carry a value a receiver fills in are out-parameters: the caller
/// passes any placeholder and reads the field back after a `true` return.
#[derive(Debug)]
pub enum Message {
    // ---- CPU ----
    /// Sets the CPU's pending cycle budget.
    SetPendingCycles(i64),
    /// Out: the CPU's remaining cycle budget (may be negative after overshoot).
    GetPendingCycles(i64),
    /// Runs the CPU until its pending cycle budget is exhausted. A `Run` posted while
    /// the CPU is already running is accepted and does nothing.
    Run,

    // ---- Address decoder ----
    /// Registers an entry in the given decoder table.
    Map(MapTable, MemoryMap),
    /// Removes an identical, previously registered entry from the given table.
    Unmap(MapTable, MemoryMap),

    // ---- Bank switcher ----
    /// Installs an address offset translation.
    MapOffset(AddressOffsetMap),

    // ---- Control bus ----
    /// Out: current power state.
    GetPowerState(PowerState),
    /// Changes the power state.
    SetPowerState(PowerState),
    /// Drives the reset line active.
    AssertReset,
    /// Releases the reset line.
    ClearReset,
    /// Out: whether the reset line is active.
    IsResetAsserted(bool),
    /// Adds one driver to the wired-OR IRQ line.
    AssertIrq,
    /// Removes one driver from the wired-OR IRQ line.
    ClearIrq,
    /// Out: whether any driver holds the IRQ line.
    IsIrqAsserted(bool),
    /// Signals an NMI edge.
    AssertNmi,
    /// Out: elapsed CPU cycles since power-on.
    GetCycles(u64),
    /// Delivers [`Notification::TimerDidFire`] with `id` to `observer` once `delay`
    /// more cycles have elapsed.
    ScheduleTimer {
        observer: ObserverRef,
        delay: u64,
        id: u32,
    },

    // ---- Storage ----
    /// Out: a live view into the receiver's backing store.
    GetBuffer(Option<BufferView>),
}

/// Configuration failure reported by [`Component::init`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A required reference was never wired.
    MissingRef(&'static str),
    /// A property holds a value the component cannot use.
    InvalidValue {
        /// Property name
        name: &'static str,
        /// Offending value, as configured
        value: String,
    },
    /// A required binary blob was never supplied.
    MissingData(&'static str),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ConfigError::MissingRef(name) => write!(f, "required reference '{}' is not connected", name),
            ConfigError::InvalidValue { name, value } => {
                write!(f, "invalid value '{}' for property '{}'", value, name)
            }
            ConfigError::MissingData(name) => write!(f, "required data '{}' was not supplied", name),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Uniform contract implemented by every bus participant.
///
/// Every method has a default, so implementors override only what they support.
///
/// # Re-wiring
///
/// `set_ref` must be idempotent. A component that observes its target removes its
/// observer registrations from the previous target before registering on the new one,
/// so re-wiring never produces duplicate deliveries (see
/// [`rewire_observer`](crate::observer::rewire_observer)).
pub trait Component {
    /// Sets a named string property. Returns `false` for unknown names or bad values.
    fn set_value(&self, _name: &str, _value: &str) -> bool {
        false
    }

    /// Returns a named string property.
    fn get_value(&self, _name: &str) -> Option<String> {
        None
    }

    /// Wires (or, with `None`, unwires) a named reference to another component.
    fn set_ref(&self, _name: &str, _target: Option<ComponentRef>) -> bool {
        false
    }

    /// Supplies a named binary blob, such as a ROM image.
    fn set_data(&self, _name: &str, _data: &[u8]) -> bool {
        false
    }

    /// Returns a copy of a named binary blob.
    fn get_data(&self, _name: &str) -> Option<Vec<u8>> {
        None
    }

    /// Checks dependencies and finishes configuration.
    fn init(&self) -> Result<(), ConfigError> {
        Ok(())
    }

    /// Applies property changes made after `init`.
    fn update(&self) {}

    /// Releases references ahead of teardown.
    fn dispose(&self) {}

    /// Handles a request outside the read/write model. Returns whether the message
    /// was recognized.
    fn post_message(&self, _message: &mut Message) -> bool {
        false
    }

    /// Registers `observer` for notifications with the given id.
    fn add_observer(&self, _observer: ObserverRef, _id: NotificationId) -> bool {
        false
    }

    /// Removes a registration made with `add_observer`.
    fn remove_observer(&self, _observer: &ObserverRef, _id: NotificationId) -> bool {
        false
    }

    /// Receives a notification posted by `sender`.
    fn notify(&self, _sender: &dyn Component, _notification: &Notification) {}

    /// Reads a byte.
    fn read(&self, _address: Address) -> u8 {
        0
    }

    /// Writes a byte.
    fn write(&self, _address: Address, _value: u8) {}

    /// Reads a little-endian 16-bit word as two byte reads.
    fn read16(&self, address: Address) -> u16 {
        u16::from_le_bytes([self.read(address), self.read(address.wrapping_add(1))])
    }

    /// Writes a little-endian 16-bit word as two byte writes.
    fn write16(&self, address: Address, value: u16) {
        for (i, byte) in value.to_le_bytes().into_iter().enumerate() {
            self.write(address.wrapping_add(i as Address), byte);
        }
    }

    /// Reads a little-endian 32-bit word as four byte reads.
    fn read32(&self, address: Address) -> u32 {
        let mut bytes = [0u8; 4];
        for (i, byte) in bytes.iter_mut().enumerate() {
            *byte = self.read(address.wrapping_add(i as Address));
        }
        u32::from_le_bytes(bytes)
    }

    /// Writes a little-endian 32-bit word as four byte writes.
    fn write32(&self, address: Address, value: u32) {
        for (i, byte) in value.to_le_bytes().into_iter().enumerate() {
            self.write(address.wrapping_add(i as Address), byte);
        }
    }

    /// Reads a little-endian 64-bit word as eight byte reads.
    fn read64(&self, address: Address) -> u64 {
        let mut bytes = [0u8; 8];
        for (i, byte) in bytes.iter_mut().enumerate() {
            *byte = self.read(address.wrapping_add(i as Address));
        }
        u64::from_le_bytes(bytes)
    }

    /// Writes a little-endian 64-bit word as eight byte writes.
    fn write64(&self, address: Address, value: u64) {
        for (i, byte) in value.to_le_bytes().into_iter().enumerate() {
            self.write(address.wrapping_add(i as Address), byte);
        }
    }
}

/// Live, non-owning view into a storage component's backing buffer.
///
/// Obtained with [`Message::GetBuffer`]. The view keeps working while the owner keeps
/// the same allocation; once the owner resizes (announced with
/// [`Notification::RamSizeDidChange`]) or is dropped, every accessor returns `None` /
/// `false` and the borrower must request a new view.
#[derive(Debug, Clone)]
pub struct BufferView {
    buffer: Weak<RefCell<Vec<u8>>>,
}

impl BufferView {
    pub(crate) fn new(buffer: &Rc<RefCell<Vec<u8>>>) -> Self {
        Self {
            buffer: Rc::downgrade(buffer),
        }
    }

    /// Returns `true` while the owner still holds the viewed allocation.
    pub fn is_valid(&self) -> bool {
        self.buffer.strong_count() > 0
    }

    /// Length of the viewed buffer, or `None` once invalidated.
    pub fn len(&self) -> Option<usize> {
        self.buffer.upgrade().map(|buffer| buffer.borrow().len())
    }

    /// Reads one byte of the viewed buffer.
    pub fn read(&self, offset: usize) -> Option<u8> {
        let buffer = self.buffer.upgrade()?;
        let value = buffer.borrow().get(offset).copied();
        value
    }

    /// Writes one byte of the viewed buffer. Returns `false` if invalidated or out of range.
    pub fn write(&self, offset: usize, value: u8) -> bool {
        let Some(buffer) = self.buffer.upgrade() else {
            return false;
        };
        let mut buffer = buffer.borrow_mut();
        match buffer.get_mut(offset) {
            Some(slot) => {
                *slot = value;
                true
            }
            None => false,
        }
    }

    /// Runs `f` over the whole viewed buffer.
    pub fn with<R>(&self, f: impl FnOnce(&mut [u8]) -> R) -> Option<R> {
        let buffer = self.buffer.upgrade()?;
        let mut buffer = buffer.borrow_mut();
        Some(f(buffer.as_mut_slice()))
    }
}

/// Returns `true` if both handles point at the same component.
pub fn same_component(a: &ComponentRef, b: &ComponentRef) -> bool {
    std::ptr::addr_eq(Rc::as_ptr(a), Rc::as_ptr(b))
}

/// Returns `true` if both observer handles point at the same component.
pub fn same_observer(a: &ObserverRef, b: &ObserverRef) -> bool {
    std::ptr::addr_eq(a.as_ptr(), b.as_ptr())
}

/// Parses an integer property value.
///
/// Accepts decimal (`"1024"`, `"-3"`) and hexadecimal with a `0x` or `$` prefix
/// (`"0xC000"`, `"$FF"`).
///
/// # Examples
///
/// ```rust
/// use a2core::component::parse_int;
///
/// assert_eq!(parse_int("0xC000"), Some(0xC000));
/// assert_eq!(parse_int("$ff"), Some(0xFF));
/// assert_eq!(parse_int(" 64 "), Some(64));
/// assert_eq!(parse_int("-2"), Some(-2));
/// assert_eq!(parse_int("banana"), None);
/// ```
pub fn parse_int(value: &str) -> Option<i64> {
    let value = value.trim();
    let (negative, digits) = match value.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, value),
    };
    let magnitude = if let Some(hex) = digits
        .strip_prefix("0x")
        .or_else(|| digits.strip_prefix("0X"))
        .or_else(|| digits.strip_prefix('$'))
    {
        i64::from_str_radix(hex, 16).ok()?
    } else {
        digits.parse::<i64>().ok()?
    };
    Some(if negative { -magnitude } else { magnitude })
}

/// Formats a property value as `0x`-prefixed lowercase hex padded to `digits`.
pub fn hex_string(value: u64, digits: usize) -> String {
    format!("0x{:0width$x}", value, width = digits)
}
