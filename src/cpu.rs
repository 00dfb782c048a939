//! # MOS 6502 CPU
//!
//! The NMOS 6502 core used by the Apple I and Apple II, including the undocumented
//! opcodes and decimal-mode arithmetic quirks of the original silicon.
//!
//! ## CPU State
//!
//! - **Registers**: Accumulator (A), index registers (X, Y)
//! - **Program counter** (PC): 16-bit address of next instruction
//! - **Stack pointer** (S): 8-bit offset into the stack page (0x0100-0x01FF)
//! - **Status** (P): [`Status`] flags `NV-BDIZC`
//! - **Pending cycles**: signed budget consumed by [`Mos6502::execute`]
//!
//! ## Execution Model
//!
//! The control bus hands the CPU a slice of cycles with
//! [`Message::SetPendingCycles`] and starts it with [`Message::Run`]. The CPU runs
//! whole instructions until the budget is zero or negative, so a slice may overrun by
//! a few cycles; the caller reads the leftover back with [`Message::GetPendingCycles`]
//! and carries it into the next slice.
//!
//! ## Interrupts
//!
//! Reset, NMI and IRQ arrive as notifications from the control bus. They are latched
//! and serviced between instructions, highest priority first:
//!
//! 1. **Reset** (on the release edge): S is decremented three times without writing,
//!    I is set, and PC is loaded from `0xFFFC`.
//! 2. **NMI** (edge triggered): PC and P are pushed, I is set, PC is loaded from
//!    `0xFFFA`.
//! 3. **IRQ** (level triggered): as NMI through `0xFFFE`, taken only if I was clear
//!    at the previous instruction boundary. This reproduces the one-instruction delay
//!    after `CLI`, `SEI` and `PLP`.
//!
//! Each service costs 7 cycles.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use bitflags::bitflags;

use crate::addressing::{page_crossed, AddressingMode};
use crate::component::{
    hex_string, parse_int, Address, Component, ComponentRef, ConfigError, Message,
    Notification, NotificationId, ObserverRef, PowerState,
};
use crate::observer::rewire_observer;
use crate::opcodes::{OpcodeClass, OPCODE_TABLE};

/// NMI vector address
pub const NMI_VECTOR: u16 = 0xFFFA;
/// Reset vector address
pub const RESET_VECTOR: u16 = 0xFFFC;
/// IRQ/BRK vector address
pub const IRQ_VECTOR: u16 = 0xFFFE;

const INTERRUPT_CYCLES: i64 = 7;
const STACK_PAGE: u16 = 0x0100;

const CONTROL_NOTIFICATIONS: [NotificationId; 5] = [
    NotificationId::PowerStateDidChange,
    NotificationId::ResetDidAssert,
    NotificationId::ResetDidClear,
    NotificationId::IrqDidChange,
    NotificationId::NmiDidAssert,
];

bitflags! {
    /// Processor status register.
    ///
    /// `BREAK` and `UNUSED` do not exist as latches in the chip. They only appear in
    /// the copy of P pushed to the stack: `PHP` and `BRK` push with `BREAK` set,
    /// interrupts push with it clear, and `UNUSED` always reads back as one.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Status: u8 {
        const CARRY = 0x01;
        const ZERO = 0x02;
        const IRQ_DISABLE = 0x04;
        const DECIMAL = 0x08;
        const BREAK = 0x10;
        const UNUSED = 0x20;
        const OVERFLOW = 0x40;
        const NEGATIVE = 0x80;
    }
}

impl Status {
    /// Status as loaded by `PLP` and `RTI`: `BREAK` dropped, `UNUSED` forced on.
    pub fn from_stack(value: u8) -> Self {
        Status::from_bits_retain(value)
            .difference(Status::BREAK)
            .union(Status::UNUSED)
    }
}

/// Programmer-visible registers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Registers {
    /// Accumulator
    pub a: u8,
    /// X index register
    pub x: u8,
    /// Y index register
    pub y: u8,
    /// Processor status
    pub p: Status,
    /// Program counter
    pub pc: u16,
    /// Stack pointer (offset into page 1)
    pub s: u8,
}

impl Registers {
    /// Register contents after power-up, before the first reset.
    pub const POWER_ON: Registers = Registers {
        a: 0,
        x: 0,
        y: 0,
        p: Status::empty(),
        pc: 0,
        s: 0xFF,
    };
}

/// One entry of the instruction trace, captured after the opcode is fetched and
/// before it executes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TraceRecord {
    /// Registers with `pc` pointing at the opcode
    pub registers: Registers,
    /// Opcode byte
    pub opcode: u8,
    /// Instruction mnemonic
    pub mnemonic: &'static str,
    /// Pending cycles before the instruction runs
    pub icount: i64,
}

/// Receives a [`TraceRecord`] for every instruction the CPU executes.
///
/// The hook runs while the CPU is mid-instruction. It should read state from the
/// record rather than querying the CPU.
pub trait TraceHook {
    fn trace(&mut self, record: &TraceRecord);
}

impl<F: FnMut(&TraceRecord)> TraceHook for F {
    fn trace(&mut self, record: &TraceRecord) {
        self(record)
    }
}

/// Execution context handed to instruction handlers.
///
/// Borrows the register file and the memory bus for the duration of one instruction
/// or interrupt sequence, and collects the side effects the CPU applies afterwards.
pub(crate) struct Execution<'a> {
    pub(crate) regs: &'a mut Registers,
    bus: &'a dyn Component,
    /// Cycles on top of the opcode's base cost (page crossings, taken branches)
    pub(crate) cycles: i64,
    /// Set by `RTI`, which makes a new I flag effective immediately
    pub(crate) resample_irq: bool,
    /// Set by `JAM` opcodes
    pub(crate) jammed: bool,
}

impl<'a> Execution<'a> {
    pub(crate) fn new(regs: &'a mut Registers, bus: &'a dyn Component) -> Self {
        Self {
            regs,
            bus,
            cycles: 0,
            resample_irq: false,
            jammed: false,
        }
    }

    #[inline]
    pub(crate) fn read(&self, address: u16) -> u8 {
        self.bus.read(address as Address)
    }

    #[inline]
    pub(crate) fn write(&self, address: u16, value: u8) {
        self.bus.write(address as Address, value)
    }

    /// Little-endian word at `address`, the high byte from `address + 1`.
    pub(crate) fn read_word(&self, address: u16) -> u16 {
        let lo = self.read(address);
        let hi = self.read(address.wrapping_add(1));
        u16::from_le_bytes([lo, hi])
    }

    fn read_zero_page_word(&self, pointer: u8) -> u16 {
        let lo = self.read(pointer as u16);
        let hi = self.read(pointer.wrapping_add(1) as u16);
        u16::from_le_bytes([lo, hi])
    }

    /// Reads the byte at PC and advances PC.
    pub(crate) fn fetch(&mut self) -> u8 {
        let value = self.read(self.regs.pc);
        self.regs.pc = self.regs.pc.wrapping_add(1);
        value
    }

    pub(crate) fn fetch_word(&mut self) -> u16 {
        let lo = self.fetch();
        let hi = self.fetch();
        u16::from_le_bytes([lo, hi])
    }

    pub(crate) fn push(&mut self, value: u8) {
        self.write(STACK_PAGE | self.regs.s as u16, value);
        self.regs.s = self.regs.s.wrapping_sub(1);
    }

    pub(crate) fn pull(&mut self) -> u8 {
        self.regs.s = self.regs.s.wrapping_add(1);
        self.read(STACK_PAGE | self.regs.s as u16)
    }

    pub(crate) fn push_word(&mut self, value: u16) {
        let [lo, hi] = value.to_le_bytes();
        self.push(hi);
        self.push(lo);
    }

    pub(crate) fn pull_word(&mut self) -> u16 {
        let lo = self.pull();
        let hi = self.pull();
        u16::from_le_bytes([lo, hi])
    }

    /// Stack cycle of the reset sequence: S moves, memory is only read.
    fn discard_push(&mut self) {
        self.read(STACK_PAGE | self.regs.s as u16);
        self.regs.s = self.regs.s.wrapping_sub(1);
    }

    #[inline]
    pub(crate) fn flag(&self, flag: Status) -> bool {
        self.regs.p.contains(flag)
    }

    #[inline]
    pub(crate) fn set_flag(&mut self, flag: Status, on: bool) {
        self.regs.p.set(flag, on);
    }

    /// Updates N and Z from `value`.
    pub(crate) fn set_nz(&mut self, value: u8) {
        self.regs.p.set(Status::ZERO, value == 0);
        self.regs.p.set(Status::NEGATIVE, value & 0x80 != 0);
    }

    /// Resolves the effective address for `mode`, consuming operand bytes.
    ///
    /// # Returns
    ///
    /// The effective address and whether indexing crossed a page. For `Immediate` the
    /// address is that of the operand byte; for `Relative` it is the branch target.
    pub(crate) fn operand_address(&mut self, mode: AddressingMode) -> (u16, bool) {
        match mode {
            AddressingMode::Implicit | AddressingMode::Accumulator => (self.regs.pc, false),
            AddressingMode::Immediate => {
                let address = self.regs.pc;
                self.regs.pc = address.wrapping_add(1);
                (address, false)
            }
            AddressingMode::ZeroPage => (self.fetch() as u16, false),
            AddressingMode::ZeroPageX => {
                let base = self.fetch();
                (base.wrapping_add(self.regs.x) as u16, false)
            }
            AddressingMode::ZeroPageY => {
                let base = self.fetch();
                (base.wrapping_add(self.regs.y) as u16, false)
            }
            AddressingMode::Relative => {
                let offset = self.fetch() as i8;
                (self.regs.pc.wrapping_add_signed(offset as i16), false)
            }
            AddressingMode::Absolute => (self.fetch_word(), false),
            AddressingMode::AbsoluteX => {
                let base = self.fetch_word();
                let address = base.wrapping_add(self.regs.x as u16);
                (address, page_crossed(base, address))
            }
            AddressingMode::AbsoluteY => {
                let base = self.fetch_word();
                let address = base.wrapping_add(self.regs.y as u16);
                (address, page_crossed(base, address))
            }
            AddressingMode::Indirect => {
                let pointer = self.fetch_word();
                let lo = self.read(pointer);
                // High byte comes from the same page: JMP ($10FF) reads $10FF and $1000
                let hi = self.read((pointer & 0xFF00) | (pointer.wrapping_add(1) & 0x00FF));
                (u16::from_le_bytes([lo, hi]), false)
            }
            AddressingMode::IndirectX => {
                let pointer = self.fetch().wrapping_add(self.regs.x);
                (self.read_zero_page_word(pointer), false)
            }
            AddressingMode::IndirectY => {
                let pointer = self.fetch();
                let base = self.read_zero_page_word(pointer);
                let address = base.wrapping_add(self.regs.y as u16);
                (address, page_crossed(base, address))
            }
        }
    }

    /// Reads the operand for `mode`, charging the page-crossing cycle where the mode
    /// has one.
    pub(crate) fn read_operand(&mut self, mode: AddressingMode) -> u8 {
        if mode == AddressingMode::Accumulator {
            return self.regs.a;
        }
        let (address, crossed) = self.operand_address(mode);
        if crossed && mode.has_page_penalty() {
            self.cycles += 1;
        }
        self.read(address)
    }

    pub(crate) fn store(&mut self, mode: AddressingMode, value: u8) {
        let (address, _) = self.operand_address(mode);
        self.write(address, value);
    }

    /// Read-modify-write: applies `op` to the operand and writes the result back.
    ///
    /// Memory operands see the NMOS double write (original value, then result), which
    /// soft switches on the Apple II can observe.
    pub(crate) fn modify(
        &mut self,
        mode: AddressingMode,
        op: impl FnOnce(&mut Self, u8) -> u8,
    ) -> u8 {
        if mode == AddressingMode::Accumulator {
            let value = self.regs.a;
            let result = op(self, value);
            self.regs.a = result;
            return result;
        }
        let (address, _) = self.operand_address(mode);
        let value = self.read(address);
        self.write(address, value);
        let result = op(self, value);
        self.write(address, result);
        result
    }

    /// Pushes PC and P, sets I and jumps through `vector`.
    pub(crate) fn interrupt(&mut self, vector: u16, brk: bool) {
        self.push_word(self.regs.pc);
        let mut pushed = self.regs.p | Status::UNUSED;
        pushed.set(Status::BREAK, brk);
        self.push(pushed.bits());
        self.regs.p.insert(Status::IRQ_DISABLE);
        self.regs.pc = self.read_word(vector);
    }
}

/// MOS 6502 processor.
///
/// References: `controlBus` (optional, supplies power, reset and interrupt lines),
/// `memoryBus` (required). Properties: `a`, `x`, `y`, `s`, `p` (two hex digits) and
/// `pc` (four hex digits).
///
/// A CPU without a control bus is powered and comes out of reset on its first
/// instruction boundary. Once a control bus is wired, [`Component::init`] copies the
/// bus's current power, reset and IRQ state.
///
/// # Examples
///
/// ```
/// use a2core::{Component, Message, Mos6502, Ram};
///
/// let ram = Ram::with_size(0x10000);
/// ram.write(0xFFFC, 0x00);
/// ram.write(0xFFFD, 0x80);
/// ram.load_bytes(0x8000, &[0xA9, 0x42, 0xAA]); // LDA #$42; TAX
///
/// let cpu = Mos6502::new();
/// cpu.set_ref("memoryBus", Some(ram));
/// cpu.init().unwrap();
///
/// // Reset (7) + LDA (2) + TAX (2)
/// cpu.post_message(&mut Message::SetPendingCycles(11));
/// cpu.post_message(&mut Message::Run);
///
/// assert_eq!(cpu.registers().x, 0x42);
/// assert_eq!(cpu.pending_cycles(), 0);
/// assert_eq!(cpu.get_value("pc").as_deref(), Some("0x8003"));
/// ```
pub struct Mos6502 {
    this: Weak<Mos6502>,
    regs: RefCell<Registers>,
    control_bus: RefCell<Option<ComponentRef>>,
    memory_bus: RefCell<Option<ComponentRef>>,
    icount: Cell<i64>,
    power_state: Cell<PowerState>,
    is_reset: Cell<bool>,
    is_reset_transition: Cell<bool>,
    is_nmi_transition: Cell<bool>,
    is_irq: Cell<bool>,
    is_irq_enabled: Cell<bool>,
    is_special_condition: Cell<bool>,
    is_jammed: Cell<bool>,
    power_off_pending: Cell<bool>,
    running: Cell<bool>,
    trace_hook: RefCell<Option<Box<dyn TraceHook>>>,
}

impl Mos6502 {
    pub fn new() -> Rc<Self> {
        Rc::new_cyclic(|this| Self {
            this: this.clone(),
            regs: RefCell::new(Registers::POWER_ON),
            control_bus: RefCell::new(None),
            memory_bus: RefCell::new(None),
            icount: Cell::new(0),
            power_state: Cell::new(PowerState::On),
            is_reset: Cell::new(false),
            is_reset_transition: Cell::new(true),
            is_nmi_transition: Cell::new(false),
            is_irq: Cell::new(false),
            is_irq_enabled: Cell::new(false),
            is_special_condition: Cell::new(true),
            is_jammed: Cell::new(false),
            power_off_pending: Cell::new(false),
            running: Cell::new(false),
            trace_hook: RefCell::new(None),
        })
    }

    /// Copy of the register file.
    pub fn registers(&self) -> Registers {
        *self.regs.borrow()
    }

    /// Replaces the register file.
    pub fn set_registers(&self, registers: Registers) {
        *self.regs.borrow_mut() = registers;
    }

    /// Remaining cycle budget. Zero or negative once a run has finished.
    pub fn pending_cycles(&self) -> i64 {
        self.icount.get()
    }

    pub fn set_pending_cycles(&self, cycles: i64) {
        self.icount.set(cycles);
    }

    /// Whether a `JAM` opcode has halted the CPU. Only a reset releases it.
    pub fn is_jammed(&self) -> bool {
        self.is_jammed.get()
    }

    /// Installs or removes the instruction trace hook.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::cell::RefCell;
    /// use std::rc::Rc;
    /// use a2core::{Component, Mos6502, Ram, TraceRecord};
    ///
    /// let ram = Ram::with_size(0x10000);
    /// ram.write(0xFFFD, 0x02); // reset vector 0x0200, which holds NOP
    /// ram.write(0x0200, 0xEA);
    ///
    /// let cpu = Mos6502::new();
    /// cpu.set_ref("memoryBus", Some(ram));
    /// cpu.init().unwrap();
    ///
    /// let log = Rc::new(RefCell::new(Vec::new()));
    /// let sink = log.clone();
    /// cpu.set_trace_hook(Some(Box::new(move |record: &TraceRecord| {
    ///     sink.borrow_mut().push(record.mnemonic);
    /// })));
    ///
    /// cpu.step(); // reset
    /// cpu.step(); // NOP
    /// assert_eq!(*log.borrow(), vec!["NOP"]);
    /// ```
    pub fn set_trace_hook(&self, hook: Option<Box<dyn TraceHook>>) {
        *self.trace_hook.borrow_mut() = hook;
    }

    /// Runs exactly one instruction or interrupt sequence.
    ///
    /// # Returns
    ///
    /// Cycles consumed, or 0 if the CPU is not running (powered down, held in reset,
    /// jammed, or without a memory bus).
    pub fn step(&self) -> i64 {
        let saved = self.icount.replace(1);
        self.execute();
        // Anything executed costs at least 2, so a remainder of 0 means a drain
        let remaining = self.icount.replace(saved);
        if remaining == 0 {
            0
        } else {
            1 - remaining
        }
    }

    /// Runs instructions until the pending cycle budget is used up.
    ///
    /// Drains the budget to zero without executing anything when the CPU is not
    /// powered on, is held in reset, or is jammed with no reset pending.
    pub fn execute(&self) {
        let bus = self.memory_bus.borrow().clone();
        let Some(bus) = bus else {
            self.drain();
            return;
        };

        while self.icount.get() > 0 {
            self.apply_pending_power_off();
            if self.power_state.get() != PowerState::On
                || self.is_reset.get()
                || (self.is_jammed.get() && !self.is_reset_transition.get())
            {
                self.drain();
                break;
            }

            let was_irq_enabled = self.is_irq_enabled.get();
            let irq_enabled = !self.regs.borrow().p.contains(Status::IRQ_DISABLE);
            self.is_irq_enabled.set(irq_enabled);

            if self.is_special_condition.get() {
                if let Some(cycles) = self.service_interrupt(bus.as_ref(), was_irq_enabled) {
                    self.icount.set(self.icount.get() - cycles);
                    continue;
                }
            }

            let cycles = self.execute_instruction(bus.as_ref());
            self.icount.set(self.icount.get() - cycles);
        }
        self.apply_pending_power_off();
    }

    fn drain(&self) {
        if self.icount.get() > 0 {
            self.icount.set(0);
        }
    }

    fn observer(&self) -> ObserverRef {
        self.this.clone()
    }

    fn update_special_condition(&self) {
        self.is_special_condition.set(
            self.is_reset_transition.get() || self.is_nmi_transition.get() || self.is_irq.get(),
        );
    }

    fn apply_pending_power_off(&self) {
        if self.power_off_pending.get() {
            if let Ok(mut regs) = self.regs.try_borrow_mut() {
                *regs = Registers::POWER_ON;
                self.power_off_pending.set(false);
            }
        }
    }

    /// Services the highest-priority pending interrupt.
    ///
    /// Returns `None` when the only pending condition is an IRQ that is masked.
    fn service_interrupt(&self, bus: &dyn Component, was_irq_enabled: bool) -> Option<i64> {
        let mut regs = self.regs.borrow_mut();
        let mut exec = Execution::new(&mut regs, bus);

        if self.is_reset_transition.replace(false) {
            exec.regs.s = 0;
            for _ in 0..3 {
                exec.discard_push();
            }
            exec.regs.p.insert(Status::IRQ_DISABLE);
            exec.regs.pc = exec.read_word(RESET_VECTOR);
            self.is_jammed.set(false);
            log::debug!("reset, pc={:04X}", exec.regs.pc);
        } else if self.is_nmi_transition.replace(false) {
            exec.interrupt(NMI_VECTOR, false);
            log::trace!("nmi, pc={:04X}", exec.regs.pc);
        } else if self.is_irq.get() && was_irq_enabled {
            exec.interrupt(IRQ_VECTOR, false);
            log::trace!("irq, pc={:04X}", exec.regs.pc);
        } else {
            return None;
        }

        // The handler's first instruction runs before any IRQ is taken
        self.is_irq_enabled.set(false);
        self.update_special_condition();
        Some(INTERRUPT_CYCLES)
    }

    fn execute_instruction(&self, bus: &dyn Component) -> i64 {
        let mut regs = self.regs.borrow_mut();
        let pc = regs.pc;
        let mut exec = Execution::new(&mut regs, bus);
        let opcode = exec.fetch();
        let metadata = &OPCODE_TABLE[opcode as usize];

        self.trace(TraceRecord {
            registers: Registers { pc, ..*exec.regs },
            opcode,
            mnemonic: metadata.mnemonic,
            icount: self.icount.get(),
        });

        (metadata.execute)(&mut exec, metadata.addressing_mode);

        if exec.resample_irq {
            self.is_irq_enabled
                .set(!exec.regs.p.contains(Status::IRQ_DISABLE));
        }
        if exec.jammed {
            debug_assert_eq!(metadata.class, OpcodeClass::Jam);
            self.is_jammed.set(true);
            log::warn!("cpu jammed by opcode {:02X} at {:04X}", opcode, pc);
        }
        metadata.base_cycles as i64 + exec.cycles
    }

    fn trace(&self, record: TraceRecord) {
        if let Ok(mut hook) = self.trace_hook.try_borrow_mut() {
            if let Some(hook) = hook.as_mut() {
                hook.trace(&record);
            }
        }
    }

    fn set_power_state(&self, state: PowerState) {
        self.power_state.set(state);
        if state == PowerState::Off {
            self.is_jammed.set(false);
            match self.regs.try_borrow_mut() {
                Ok(mut regs) => *regs = Registers::POWER_ON,
                Err(_) => self.power_off_pending.set(true),
            }
        }
    }

    fn query_control_bus(&self, control_bus: &dyn Component) {
        let mut power = Message::GetPowerState(PowerState::Off);
        if control_bus.post_message(&mut power) {
            if let Message::GetPowerState(state) = power {
                self.set_power_state(state);
            }
        }
        let mut reset = Message::IsResetAsserted(false);
        if control_bus.post_message(&mut reset) {
            if let Message::IsResetAsserted(asserted) = reset {
                self.is_reset.set(asserted);
            }
        }
        let mut irq = Message::IsIrqAsserted(false);
        if control_bus.post_message(&mut irq) {
            if let Message::IsIrqAsserted(asserted) = irq {
                self.is_irq.set(asserted);
            }
        }
        self.update_special_condition();
    }
}

impl Component for Mos6502 {
    fn set_value(&self, name: &str, value: &str) -> bool {
        let Some(number) = parse_int(value) else {
            return false;
        };
        let Ok(mut regs) = self.regs.try_borrow_mut() else {
            return false;
        };
        match name {
            "a" => regs.a = number as u8,
            "x" => regs.x = number as u8,
            "y" => regs.y = number as u8,
            "s" => regs.s = number as u8,
            "p" => regs.p = Status::from_bits_retain(number as u8),
            "pc" => regs.pc = number as u16,
            _ => return false,
        }
        true
    }

    fn get_value(&self, name: &str) -> Option<String> {
        let regs = self.regs.try_borrow().ok()?;
        match name {
            "a" => Some(hex_string(regs.a as u64, 2)),
            "x" => Some(hex_string(regs.x as u64, 2)),
            "y" => Some(hex_string(regs.y as u64, 2)),
            "s" => Some(hex_string(regs.s as u64, 2)),
            "p" => Some(hex_string(regs.p.bits() as u64, 2)),
            "pc" => Some(hex_string(regs.pc as u64, 4)),
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
                    &CONTROL_NOTIFICATIONS,
                );
            }
            "memoryBus" => *self.memory_bus.borrow_mut() = target,
            _ => return false,
        }
        true
    }

    fn init(&self) -> Result<(), ConfigError> {
        if self.memory_bus.borrow().is_none() {
            return Err(ConfigError::MissingRef("memoryBus"));
        }
        let control_bus = self.control_bus.borrow().clone();
        if let Some(control_bus) = control_bus {
            self.query_control_bus(control_bus.as_ref());
        }
        Ok(())
    }

    fn dispose(&self) {
        self.set_ref("controlBus", None);
        *self.memory_bus.borrow_mut() = None;
        *self.trace_hook.borrow_mut() = None;
    }

    fn post_message(&self, message: &mut Message) -> bool {
        match message {
            Message::SetPendingCycles(cycles) => {
                self.icount.set(*cycles);
                true
            }
            Message::GetPendingCycles(cycles) => {
                *cycles = self.icount.get();
                true
            }
            Message::Run => {
                // Nested runs are absorbed; the outer run already owns the budget
                if !self.running.replace(true) {
                    self.execute();
                    self.running.set(false);
                }
                true
            }
            _ => false,
        }
    }

    fn notify(&self, _sender: &dyn Component, notification: &Notification) {
        match *notification {
            Notification::PowerStateDidChange(state) => self.set_power_state(state),
            Notification::ResetDidAssert => {
                self.is_reset.set(true);
                self.drain();
            }
            Notification::ResetDidClear => {
                self.is_reset.set(false);
                self.is_reset_transition.set(true);
            }
            Notification::IrqDidChange(asserted) => self.is_irq.set(asserted),
            Notification::NmiDidAssert => self.is_nmi_transition.set(true),
            _ => return,
        }
        self.update_special_condition();
    }
}
