//! Control bus.
//!
//! Owns the machine-wide control lines (power, reset, NMI, wired-OR IRQ), the master
//! cycle counter and cycle timers, and drives the CPU in cycle-budget slices.
//!
//! # IRQ Line Behavior
//!
//! The IRQ line is shared. Each [`Message::AssertIrq`] adds a driver and each
//! [`Message::ClearIrq`] removes one; the line stays active while any driver holds it,
//! and [`Notification::IrqDidChange`] is posted only when the level actually changes.
//!
//! # Scheduling
//!
//! [`ControlBus::run`] extends an absolute cycle target and hands the CPU slices that
//! end at the target or at the next timer, whichever comes first. The CPU may overrun
//! a slice by part of an instruction; the overrun is counted as elapsed time, so the
//! next slice is shortened by the same amount.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::component::{
    Component, ComponentRef, ConfigError, Message, Notification, NotificationId, ObserverRef,
    PowerState,
};
use crate::observer::ObserverList;

struct Timer {
    due: u64,
    observer: ObserverRef,
    id: u32,
}

/// Power, reset, interrupt lines and cycle scheduling.
///
/// Reference: `cpu` (required). Property: `powerState`.
pub struct ControlBus {
    observers: ObserverList,
    cpu: RefCell<Option<ComponentRef>>,
    power_state: Cell<PowerState>,
    reset: Cell<bool>,
    irq_drivers: Cell<u32>,
    cycles: Cell<u64>,
    target: Cell<u64>,
    timers: RefCell<Vec<Timer>>,
    running: Cell<bool>,
}

impl ControlBus {
    /// Creates a powered-off control bus.
    pub fn new() -> Rc<Self> {
        Rc::new(Self {
            observers: ObserverList::new(),
            cpu: RefCell::new(None),
            power_state: Cell::new(PowerState::Off),
            reset: Cell::new(false),
            irq_drivers: Cell::new(0),
            cycles: Cell::new(0),
            target: Cell::new(0),
            timers: RefCell::new(Vec::new()),
            running: Cell::new(false),
        })
    }

    pub fn power_state(&self) -> PowerState {
        self.power_state.get()
    }

    /// Changes power state and notifies observers.
    ///
    /// Turning the machine on from `Off` pulses the reset line afterwards, so the CPU
    /// starts from its reset vector.
    pub fn set_power_state(&self, state: PowerState) {
        let previous = self.power_state.replace(state);
        if previous == state {
            return;
        }
        log::debug!("power state {} -> {}", previous, state);
        if state == PowerState::Off {
            self.timers.borrow_mut().clear();
        }
        self.observers
            .post(self, &Notification::PowerStateDidChange(state));
        if previous == PowerState::Off && state == PowerState::On {
            self.assert_reset();
            self.clear_reset();
        }
    }

    pub fn assert_reset(&self) {
        if !self.reset.replace(true) {
            log::debug!("reset asserted");
            self.observers.post(self, &Notification::ResetDidAssert);
        }
    }

    pub fn clear_reset(&self) {
        if self.reset.replace(false) {
            log::debug!("reset cleared");
            self.observers.post(self, &Notification::ResetDidClear);
        }
    }

    pub fn is_reset_asserted(&self) -> bool {
        self.reset.get()
    }

    /// Adds a driver to the IRQ line.
    pub fn assert_irq(&self) {
        let drivers = self.irq_drivers.get();
        self.irq_drivers.set(drivers + 1);
        if drivers == 0 {
            self.observers.post(self, &Notification::IrqDidChange(true));
        }
    }

    /// Removes a driver from the IRQ line. Extra clears are ignored.
    pub fn clear_irq(&self) {
        match self.irq_drivers.get() {
            0 => {}
            1 => {
                self.irq_drivers.set(0);
                self.observers.post(self, &Notification::IrqDidChange(false));
            }
            drivers => self.irq_drivers.set(drivers - 1),
        }
    }

    pub fn is_irq_asserted(&self) -> bool {
        self.irq_drivers.get() > 0
    }

    pub fn assert_nmi(&self) {
        self.observers.post(self, &Notification::NmiDidAssert);
    }

    /// Cycles elapsed since the bus was created.
    pub fn cycles(&self) -> u64 {
        self.cycles.get()
    }

    /// Notifies `observer` with [`Notification::TimerDidFire`] after `delay` cycles.
    pub fn schedule_timer(&self, observer: ObserverRef, delay: u64, id: u32) {
        let due = self.cycles.get() + delay;
        let mut timers = self.timers.borrow_mut();
        let index = timers.partition_point(|timer| timer.due <= due);
        timers.insert(index, Timer { due, observer, id });
    }

    /// Advances emulated time by `cycles`, running the CPU and firing timers.
    ///
    /// Returns the cycles actually elapsed, which may exceed the request by the
    /// overrun of the last instruction, or fall short by the overrun of the previous
    /// call. A call made from inside a timer callback or the CPU is ignored.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use a2core::{Component, ControlBus};
    ///
    /// let bus = ControlBus::new();
    /// // Without a CPU the bus just advances time
    /// assert_eq!(bus.run(1000), 1000);
    /// assert_eq!(bus.cycles(), 1000);
    /// ```
    pub fn run(&self, cycles: u64) -> u64 {
        if self.running.replace(true) {
            return 0;
        }
        let start = self.cycles.get();
        self.target.set(self.target.get() + cycles);
        let cpu = self.cpu.borrow().clone();

        while self.cycles.get() < self.target.get() {
            let next_timer = self.timers.borrow().first().map(|timer| timer.due);
            let slice_end = next_timer.map_or(self.target.get(), |due| due.min(self.target.get()));
            let slice = slice_end.saturating_sub(self.cycles.get());

            let elapsed = match &cpu {
                Some(cpu) if slice > 0 => Self::run_cpu(cpu.as_ref(), slice),
                _ => slice,
            };
            self.cycles.set(self.cycles.get() + elapsed);
            self.fire_due_timers();
        }

        self.running.set(false);
        self.cycles.get() - start
    }

    fn run_cpu(cpu: &dyn Component, slice: u64) -> u64 {
        cpu.post_message(&mut Message::SetPendingCycles(slice as i64));
        cpu.post_message(&mut Message::Run);
        let mut pending = Message::GetPendingCycles(0);
        cpu.post_message(&mut pending);
        match pending {
            Message::GetPendingCycles(remaining) => (slice as i64 - remaining).max(0) as u64,
            _ => slice,
        }
    }

    fn fire_due_timers(&self) {
        let now = self.cycles.get();
        let due: Vec<Timer> = {
            let mut timers = self.timers.borrow_mut();
            let count = timers.partition_point(|timer| timer.due <= now);
            timers.drain(..count).collect()
        };
        for timer in due {
            if let Some(observer) = timer.observer.upgrade() {
                observer.notify(self, &Notification::TimerDidFire(timer.id));
            }
        }
    }
}

impl Component for ControlBus {
    fn set_value(&self, name: &str, value: &str) -> bool {
        match name {
            "powerState" => match PowerState::parse(value) {
                Some(state) => {
                    self.set_power_state(state);
                    true
                }
                None => false,
            },
            _ => false,
        }
    }

    fn get_value(&self, name: &str) -> Option<String> {
        match name {
            "powerState" => Some(self.power_state.get().name().to_string()),
            "cycles" => Some(self.cycles.get().to_string()),
            _ => None,
        }
    }

    fn set_ref(&self, name: &str, target: Option<ComponentRef>) -> bool {
        match name {
            "cpu" => {
                *self.cpu.borrow_mut() = target;
                true
            }
            _ => false,
        }
    }

    fn init(&self) -> Result<(), ConfigError> {
        if self.cpu.borrow().is_none() {
            return Err(ConfigError::MissingRef("cpu"));
        }
        Ok(())
    }

    fn dispose(&self) {
        *self.cpu.borrow_mut() = None;
        self.timers.borrow_mut().clear();
        self.observers.clear();
    }

    fn post_message(&self, message: &mut Message) -> bool {
        match message {
            Message::GetPowerState(state) => *state = self.power_state.get(),
            Message::SetPowerState(state) => self.set_power_state(*state),
            Message::AssertReset => self.assert_reset(),
            Message::ClearReset => self.clear_reset(),
            Message::IsResetAsserted(asserted) => *asserted = self.reset.get(),
            Message::AssertIrq => self.assert_irq(),
            Message::ClearIrq => self.clear_irq(),
            Message::IsIrqAsserted(asserted) => *asserted = self.is_irq_asserted(),
            Message::AssertNmi => self.assert_nmi(),
            Message::GetCycles(cycles) => *cycles = self.cycles.get(),
            Message::ScheduleTimer {
                observer,
                delay,
                id,
            } => self.schedule_timer(observer.clone(), *delay, *id),
            _ => return false,
        }
        true
    }

    fn add_observer(&self, observer: ObserverRef, id: NotificationId) -> bool {
        self.observers.add(observer, id)
    }

    fn remove_observer(&self, observer: &ObserverRef, id: NotificationId) -> bool {
        self.observers.remove(observer, id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Records every notification it receives.
    #[derive(Default)]
    struct Listener {
        seen: RefCell<Vec<Notification>>,
    }

    impl Component for Listener {
        fn notify(&self, _sender: &dyn Component, notification: &Notification) {
            self.seen.borrow_mut().push(*notification);
        }
    }

    fn listen(bus: &ControlBus, ids: &[NotificationId]) -> Rc<Listener> {
        let listener = Rc::new(Listener::default());
        let handle: Rc<dyn Component> = listener.clone();
        for &id in ids {
            bus.add_observer(Rc::downgrade(&handle), id);
        }
        listener
    }

    /// Consumes its budget in fixed steps, overrunning like a real CPU.
    struct SteppingCpu {
        icount: Cell<i64>,
        step: i64,
        runs: Cell<u32>,
    }

    impl Component for SteppingCpu {
        fn post_message(&self, message: &mut Message) -> bool {
            match message {
                Message::SetPendingCycles(cycles) => self.icount.set(*cycles),
                Message::GetPendingCycles(cycles) => *cycles = self.icount.get(),
                Message::Run => {
                    self.runs.set(self.runs.get() + 1);
                    while self.icount.get() > 0 {
                        self.icount.set(self.icount.get() - self.step);
                    }
                }
                _ => return false,
            }
            true
        }
    }

    #[test]
    fn test_power_on_pulses_reset() {
        let bus = ControlBus::new();
        let listener = listen(
            &bus,
            &[
                NotificationId::PowerStateDidChange,
                NotificationId::ResetDidAssert,
                NotificationId::ResetDidClear,
            ],
        );

        bus.set_power_state(PowerState::On);

        assert_eq!(
            *listener.seen.borrow(),
            vec![
                Notification::PowerStateDidChange(PowerState::On),
                Notification::ResetDidAssert,
                Notification::ResetDidClear,
            ]
        );
        assert!(!bus.is_reset_asserted());
    }

    #[test]
    fn test_irq_line_is_wired_or() {
        let bus = ControlBus::new();
        let listener = listen(&bus, &[NotificationId::IrqDidChange]);

        bus.assert_irq();
        bus.assert_irq();
        bus.clear_irq();
        assert!(bus.is_irq_asserted());
        bus.clear_irq();
        bus.clear_irq();
        assert!(!bus.is_irq_asserted());

        assert_eq!(
            *listener.seen.borrow(),
            vec![
                Notification::IrqDidChange(true),
                Notification::IrqDidChange(false)
            ]
        );
    }

    #[test]
    fn test_messages() {
        let bus = ControlBus::new();

        assert!(bus.post_message(&mut Message::SetPowerState(PowerState::Paused)));
        let mut state = Message::GetPowerState(PowerState::Off);
        assert!(bus.post_message(&mut state));
        assert!(matches!(state, Message::GetPowerState(PowerState::Paused)));

        assert!(bus.post_message(&mut Message::AssertReset));
        let mut reset = Message::IsResetAsserted(false);
        bus.post_message(&mut reset);
        assert!(matches!(reset, Message::IsResetAsserted(true)));

        assert!(!bus.post_message(&mut Message::Run));
    }

    #[test]
    fn test_run_carries_overrun_into_next_slice() {
        let bus = ControlBus::new();
        let cpu = Rc::new(SteppingCpu {
            icount: Cell::new(0),
            step: 3,
            runs: Cell::new(0),
        });
        bus.set_ref("cpu", Some(cpu.clone()));

        assert_eq!(bus.run(10), 12);
        assert_eq!(bus.run(10), 9);
        assert_eq!(bus.cycles(), 21);
        assert_eq!(cpu.runs.get(), 2);
    }

    #[test]
    fn test_timer_fires_at_due_cycle() {
        let bus = ControlBus::new();
        let listener = Rc::new(Listener::default());
        let handle: Rc<dyn Component> = listener.clone();
        let cpu = Rc::new(SteppingCpu {
            icount: Cell::new(0),
            step: 1,
            runs: Cell::new(0),
        });
        bus.set_ref("cpu", Some(cpu.clone()));

        let mut message = Message::ScheduleTimer {
            observer: Rc::downgrade(&handle),
            delay: 50,
            id: 7,
        };
        assert!(bus.post_message(&mut message));

        bus.run(40);
        assert!(listener.seen.borrow().is_empty());
        bus.run(20);
        assert_eq!(*listener.seen.borrow(), vec![Notification::TimerDidFire(7)]);
        // The CPU slice was split at the timer
        assert_eq!(cpu.runs.get(), 3);
    }

    #[test]
    fn test_init_requires_cpu() {
        let bus = ControlBus::new();
        assert_eq!(bus.init(), Err(ConfigError::MissingRef("cpu")));
    }
}
