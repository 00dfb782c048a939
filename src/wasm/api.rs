//! WASM API for the a2core emulator.
//!
//! Provides JavaScript-callable interfaces for machine control, state inspection
//! and memory access over a minimal machine: 48KB of RAM at `$0000-$BFFF`, a ROM image
//! ending at `$FFFF`, and the floating bus everywhere else.

use std::fmt;
use std::rc::Rc;

use wasm_bindgen::prelude::*;

use crate::{
    AddressDecoder, Component, ControlBus, Emulation, FloatingBus, MapTable, MemoryMap,
    Mos6502, PowerState, Ram, Rom, TraceRecord,
};

const RAM_SIZE: usize = 0xC000;

/// JavaScript-compatible error wrapper
#[wasm_bindgen]
#[derive(Debug, Clone)]
pub struct JsError {
    message: String,
}

#[wasm_bindgen]
impl JsError {
    #[wasm_bindgen(constructor)]
    pub fn new(message: &str) -> JsError {
        JsError {
            message: message.to_string(),
        }
    }

    #[wasm_bindgen(getter)]
    pub fn message(&self) -> String {
        self.message.clone()
    }
}

/// Main emulator interface for JavaScript
#[wasm_bindgen]
pub struct Emulator {
    // Keeps the wiring alive and disposes it on drop
    _emulation: Emulation,
    control_bus: Rc<ControlBus>,
    cpu: Rc<Mos6502>,
    decoder: Rc<AddressDecoder>,
    ram: Rc<Ram>,
}

#[wasm_bindgen]
impl Emulator {
    /// Assemble a machine around `rom`, which is mapped so that it ends at `$FFFF`.
    #[wasm_bindgen(constructor)]
    pub fn new(rom: &[u8]) -> Result<Emulator, JsError> {
        if rom.is_empty() || rom.len() > 0x4000 {
            return Err(JsError::new("ROM image must be 1 to 16384 bytes"));
        }

        let control_bus = ControlBus::new();
        let cpu = Mos6502::new();
        let decoder = AddressDecoder::new();
        let floating_bus = FloatingBus::new();
        let ram = Ram::with_size(RAM_SIZE);
        // Rom indexes by the low address bits, so pad the front up to a power of two
        let mut image = vec![0xFF; rom.len().next_power_of_two() - rom.len()];
        image.extend_from_slice(rom);
        let rom_component = Rom::with_image(image);

        let rom_start = 0x1_0000 - rom.len() as u32;
        decoder.map(MapTable::External, MemoryMap::new(ram.clone(), 0x0000, 0xBFFF));
        decoder.map(
            MapTable::External,
            MemoryMap::read_only(rom_component.clone(), rom_start, 0xFFFF),
        );

        let mut emulation = Emulation::new();
        let parts: [(&str, crate::ComponentRef); 6] = [
            ("controlBus", control_bus.clone()),
            ("cpu", cpu.clone()),
            ("memoryBus", decoder.clone()),
            ("floatingBus", floating_bus),
            ("ram", ram.clone()),
            ("rom", rom_component),
        ];
        for (name, component) in parts {
            emulation.add(name, component).map_err(to_js_error)?;
        }
        emulation
            .set_ref("controlBus", "cpu", Some("cpu"))
            .and_then(|_| emulation.set_ref("cpu", "controlBus", Some("controlBus")))
            .and_then(|_| emulation.set_ref("cpu", "memoryBus", Some("memoryBus")))
            .and_then(|_| emulation.set_ref("memoryBus", "floatingBus", Some("floatingBus")))
            .and_then(|_| emulation.init())
            .map_err(to_js_error)?;

        Ok(Emulator {
            _emulation: emulation,
            control_bus,
            cpu,
            decoder,
            ram,
        })
    }

    /// Power the machine on. The CPU comes out of reset at the next run.
    pub fn power_on(&self) {
        self.control_bus.set_power_state(PowerState::On);
    }

    pub fn power_off(&self) {
        self.control_bus.set_power_state(PowerState::Off);
    }

    /// Pulse the reset line
    pub fn reset(&self) {
        self.control_bus.assert_reset();
        self.control_bus.clear_reset();
    }

    pub fn nmi(&self) {
        self.control_bus.assert_nmi();
    }

    pub fn set_irq(&self, asserted: bool) {
        if asserted {
            self.control_bus.assert_irq();
        } else {
            self.control_bus.clear_irq();
        }
    }

    /// Execute for a number of cycles and return the cycles actually executed
    pub fn run(&self, cycles: u32) -> f64 {
        self.control_bus.run(cycles as u64) as f64
    }

    /// Execute a single instruction or interrupt sequence
    pub fn step(&self) -> u32 {
        self.cpu.step() as u32
    }

    /// Install a callback receiving `(pc, opcode, mnemonic)` for every instruction,
    /// or remove it with `undefined`.
    pub fn set_trace(&self, on_trace: Option<js_sys::Function>) {
        let hook = on_trace.map(|callback| {
            Box::new(move |record: &TraceRecord| {
                let result = callback.call3(
                    &JsValue::NULL,
                    &JsValue::from(record.registers.pc),
                    &JsValue::from(record.opcode),
                    &JsValue::from_str(record.mnemonic),
                );
                callback_succeeded("trace", result);
            }) as Box<dyn crate::TraceHook>
        });
        self.cpu.set_trace_hook(hook);
    }

    // Register getters
    #[wasm_bindgen(getter)]
    pub fn a(&self) -> u8 {
        self.cpu.registers().a
    }

    #[wasm_bindgen(getter)]
    pub fn x(&self) -> u8 {
        self.cpu.registers().x
    }

    #[wasm_bindgen(getter)]
    pub fn y(&self) -> u8 {
        self.cpu.registers().y
    }

    #[wasm_bindgen(getter)]
    pub fn pc(&self) -> u16 {
        self.cpu.registers().pc
    }

    #[wasm_bindgen(getter)]
    pub fn sp(&self) -> u8 {
        self.cpu.registers().s
    }

    #[wasm_bindgen(getter)]
    pub fn status(&self) -> u8 {
        self.cpu.registers().p.bits()
    }

    #[wasm_bindgen(getter)]
    pub fn cycles(&self) -> f64 {
        self.control_bus.cycles() as f64 // Convert u64 to f64 for JavaScript
    }

    #[wasm_bindgen(getter)]
    pub fn jammed(&self) -> bool {
        self.cpu.is_jammed()
    }

    // Memory access methods

    /// Read a single byte through the address decoder
    pub fn read_memory(&self, addr: u16) -> u8 {
        self.decoder.read(addr as u32)
    }

    /// Write a single byte through the address decoder
    pub fn write_memory(&self, addr: u16, value: u8) {
        self.decoder.write(addr as u32, value);
    }

    /// Read a 256-byte page from memory (for efficient display)
    pub fn get_memory_page(&self, page: u8) -> Vec<u8> {
        let start = (page as u32) << 8;
        (0..256).map(|i| self.decoder.read(start + i)).collect()
    }

    /// Copy a program into RAM
    pub fn load_program(&self, program: &[u8], start_addr: u16) {
        self.ram.load_bytes(start_addr as usize, program);
    }
}

fn to_js_error(error: crate::EmulationError) -> JsError {
    JsError::new(&error.to_string())
}

/// Logs an exception thrown by a JavaScript callback; emulation carries on regardless.
fn callback_succeeded<T, E: fmt::Debug>(name: &str, result: Result<T, E>) -> bool {
    match result {
        Ok(_) => true,
        Err(error) => {
            log::warn!("{} callback threw: {:?}", name, error);
            false
        }
    }
}
