//! ROM component.
//!
//! Read-only storage loaded from the `image` data blob.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::component::{hex_string, Address, Component, ConfigError};

/// Read-only memory.
///
/// Reads are taken modulo the image size rounded up to a power of two. Writes are
/// silently ignored, matching typical ROM hardware behavior.
///
/// # Examples
///
/// ```rust
/// use a2core::{Component, Rom};
///
/// let rom = Rom::with_image(vec![0xEA, 0xEA, 0xEA, 0xEA]);
///
/// assert_eq!(rom.read(0xFF00), 0xEA);
///
/// // Writes are ignored
/// rom.write(0xFF00, 0x00);
/// assert_eq!(rom.read(0xFF00), 0xEA);
/// ```
pub struct Rom {
    data: RefCell<Vec<u8>>,
    mask: Cell<usize>,
}

impl Rom {
    /// Creates an empty ROM. It fails `init` until an `image` is supplied.
    pub fn new() -> Rc<Self> {
        Self::with_image(Vec::new())
    }

    /// Creates a ROM holding `data`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use a2core::{Component, Rom};
    ///
    /// // 2KB monitor ROM mapped at 0xF800 with its reset vector at the end
    /// let mut image = vec![0; 0x800];
    /// image[0x7FC] = 0x00;
    /// image[0x7FD] = 0xF8;
    ///
    /// let rom = Rom::with_image(image);
    /// assert_eq!(rom.read16(0xFFFC), 0xF800);
    /// ```
    pub fn with_image(data: Vec<u8>) -> Rc<Self> {
        let mask = data.len().max(1).next_power_of_two() - 1;
        Rc::new(Self {
            data: RefCell::new(data),
            mask: Cell::new(mask),
        })
    }

    /// Image size in bytes.
    pub fn size(&self) -> usize {
        self.data.borrow().len()
    }
}

impl Component for Rom {
    fn get_value(&self, name: &str) -> Option<String> {
        match name {
            "size" => Some(hex_string(self.size() as u64, 4)),
            _ => None,
        }
    }

    fn set_data(&self, name: &str, data: &[u8]) -> bool {
        match name {
            "image" => {
                *self.data.borrow_mut() = data.to_vec();
                self.mask.set(data.len().max(1).next_power_of_two() - 1);
                true
            }
            _ => false,
        }
    }

    fn get_data(&self, name: &str) -> Option<Vec<u8>> {
        match name {
            "image" => Some(self.data.borrow().clone()),
            _ => None,
        }
    }

    fn init(&self) -> Result<(), ConfigError> {
        if self.data.borrow().is_empty() {
            return Err(ConfigError::MissingData("image"));
        }
        Ok(())
    }

    fn read(&self, address: Address) -> u8 {
        self.data
            .borrow()
            .get(address as usize & self.mask.get())
            .copied()
            .unwrap_or(0)
    }
}
