//! RAM component.
//!
//! Readable and writable storage addressed modulo its size. The backing buffer can be
//! lent out with [`Message::GetBuffer`]; resizing swaps in a new allocation, which
//! invalidates outstanding views, and posts [`Notification::RamSizeDidChange`].

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::component::{
    hex_string, parse_int, Address, BufferView, Component, ConfigError, Message,
    Notification, NotificationId, ObserverRef,
};
use crate::observer::ObserverList;

/// Random-access memory.
///
/// Properties: `size` (bytes, non-zero). Data: `image` (copied in from offset 0).
///
/// # Examples
///
/// ```rust
/// use a2core::{Component, Ram};
///
/// let ram = Ram::with_size(0x1000);
///
/// ram.write(0x0042, 0xAA);
/// assert_eq!(ram.read(0x0042), 0xAA);
///
/// // Addresses wrap at the RAM size
/// assert_eq!(ram.read(0x1042), 0xAA);
/// ```
pub struct Ram {
    buffer: RefCell<Rc<RefCell<Vec<u8>>>>,
    mask: Cell<usize>,
    observers: ObserverList,
}

impl Ram {
    /// Creates a RAM of `size` bytes, all zero.
    pub fn with_size(size: usize) -> Rc<Self> {
        Rc::new(Self {
            buffer: RefCell::new(Rc::new(RefCell::new(vec![0; size]))),
            mask: Cell::new(Self::mask_for(size)),
            observers: ObserverList::new(),
        })
    }

    /// Current size in bytes.
    pub fn size(&self) -> usize {
        self.buffer.borrow().borrow().len()
    }

    /// Copies `bytes` into RAM starting at `offset`, truncating at the end of RAM.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use a2core::{Component, Ram};
    ///
    /// let ram = Ram::with_size(0x10000);
    /// ram.load_bytes(0x0300, &[0xA9, 0x42]); // LDA #$42
    ///
    /// assert_eq!(ram.read(0x0300), 0xA9);
    /// assert_eq!(ram.read(0x0301), 0x42);
    /// ```
    pub fn load_bytes(&self, offset: usize, bytes: &[u8]) {
        let buffer = self.buffer.borrow();
        let mut data = buffer.borrow_mut();
        if offset >= data.len() {
            return;
        }
        let end = (offset + bytes.len()).min(data.len());
        data[offset..end].copy_from_slice(&bytes[..end - offset]);
    }

    /// Reallocates the RAM, keeping the contents that still fit.
    ///
    /// Views handed out earlier stop resolving and observers of
    /// [`NotificationId::RamSizeDidChange`] are told the new size.
    pub fn resize(&self, size: usize) {
        if size == self.size() {
            return;
        }
        let mut data = self.buffer.borrow().borrow().clone();
        data.resize(size, 0);
        *self.buffer.borrow_mut() = Rc::new(RefCell::new(data));
        self.mask.set(Self::mask_for(size));
        log::debug!("RAM resized to {} bytes", size);
        self.observers
            .post(self, &Notification::RamSizeDidChange(size));
    }

    fn mask_for(size: usize) -> usize {
        size.max(1).next_power_of_two() - 1
    }
}

impl Component for Ram {
    fn set_value(&self, name: &str, value: &str) -> bool {
        match (name, parse_int(value)) {
            ("size", Some(size)) if size > 0 => {
                self.resize(size as usize);
                true
            }
            _ => false,
        }
    }

    fn get_value(&self, name: &str) -> Option<String> {
        match name {
            "size" => Some(hex_string(self.size() as u64, 4)),
            _ => None,
        }
    }

    fn set_data(&self, name: &str, data: &[u8]) -> bool {
        match name {
            "image" => {
                self.load_bytes(0, data);
                true
            }
            _ => false,
        }
    }

    fn get_data(&self, name: &str) -> Option<Vec<u8>> {
        match name {
            "image" => Some(self.buffer.borrow().borrow().clone()),
            _ => None,
        }
    }

    fn init(&self) -> Result<(), ConfigError> {
        if self.size() == 0 {
            return Err(ConfigError::InvalidValue {
                name: "size",
                value: "0".to_string(),
            });
        }
        Ok(())
    }

    fn post_message(&self, message: &mut Message) -> bool {
        match message {
            Message::GetBuffer(view) => {
                *view = Some(BufferView::new(&self.buffer.borrow()));
                true
            }
            _ => false,
        }
    }

    fn add_observer(&self, observer: ObserverRef, id: NotificationId) -> bool {
        self.observers.add(observer, id)
    }

    fn remove_observer(&self, observer: &ObserverRef, id: NotificationId) -> bool {
        self.observers.remove(observer, id)
    }

    fn read(&self, address: Address) -> u8 {
        let index = address as usize & self.mask.get();
        let buffer = self.buffer.borrow();
        let value = buffer.borrow().get(index).copied().unwrap_or(0);
        value
    }

    fn write(&self, address: Address, value: u8) {
        let index = address as usize & self.mask.get();
        let buffer = self.buffer.borrow();
        let mut data = buffer.borrow_mut();
        if let Some(slot) = data.get_mut(index) {
            *slot = value;
        }
    }
}
