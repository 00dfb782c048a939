//! Notification multicast tests.
//!
//! Tests cover:
//! - Delivery order and duplicate suppression
//! - Observers that unregister themselves or others while being notified
//! - Weak registrations of dropped observers
//! - Re-wiring references without duplicate deliveries

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use a2core::{
    Component, ComponentRef, ControlBus, Mos6502, Notification, NotificationId, ObserverList,
    ObserverRef, PowerState, Ram,
};

struct Sender;

impl Component for Sender {}

/// Appends its id to a shared log on every notification.
struct Recorder {
    id: u8,
    log: Rc<RefCell<Vec<(u8, Notification)>>>,
}

impl Component for Recorder {
    fn notify(&self, _sender: &dyn Component, notification: &Notification) {
        self.log.borrow_mut().push((self.id, *notification));
    }
}

type Log = Rc<RefCell<Vec<(u8, Notification)>>>;

fn recorder(id: u8, log: &Log) -> ComponentRef {
    Rc::new(Recorder {
        id,
        log: log.clone(),
    })
}

fn ids(log: &Log) -> Vec<u8> {
    log.borrow().iter().map(|(id, _)| *id).collect()
}

// ========== Delivery ==========

#[test]
fn test_delivery_in_registration_order() {
    let log = Log::default();
    let list = ObserverList::new();
    let observers: Vec<ComponentRef> = (1..=3).map(|id| recorder(id, &log)).collect();
    for observer in observers.iter().rev() {
        list.add(Rc::downgrade(observer), NotificationId::NmiDidAssert);
    }

    list.post(&Sender, &Notification::NmiDidAssert);
    assert_eq!(ids(&log), vec![3, 2, 1]);
}

#[test]
fn test_only_matching_id_is_delivered() {
    let log = Log::default();
    let list = ObserverList::new();
    let observer = recorder(1, &log);
    list.add(Rc::downgrade(&observer), NotificationId::IrqDidChange);

    list.post(&Sender, &Notification::NmiDidAssert);
    list.post(&Sender, &Notification::IrqDidChange(true));
    assert_eq!(*log.borrow(), vec![(1, Notification::IrqDidChange(true))]);
}

#[test]
fn test_duplicate_registration_delivers_once() {
    let log = Log::default();
    let list = ObserverList::new();
    let observer = recorder(1, &log);
    assert!(list.add(Rc::downgrade(&observer), NotificationId::ResetDidClear));
    assert!(list.add(Rc::downgrade(&observer), NotificationId::ResetDidClear));
    assert_eq!(list.count(NotificationId::ResetDidClear), 1);

    list.post(&Sender, &Notification::ResetDidClear);
    assert_eq!(ids(&log), vec![1]);
}

#[test]
fn test_remove_unknown_registration() {
    let log = Log::default();
    let list = ObserverList::new();
    let observer = recorder(1, &log);
    assert!(!list.remove(&Rc::downgrade(&observer), NotificationId::ResetDidClear));
}

#[test]
fn test_dropped_observer_is_skipped() {
    let log = Log::default();
    let list = ObserverList::new();
    let kept = recorder(1, &log);
    list.add(Rc::downgrade(&kept), NotificationId::NmiDidAssert);
    {
        let dropped = recorder(2, &log);
        list.add(Rc::downgrade(&dropped), NotificationId::NmiDidAssert);
    }

    list.post(&Sender, &Notification::NmiDidAssert);
    assert_eq!(ids(&log), vec![1]);
    assert_eq!(list.count(NotificationId::NmiDidAssert), 1);
}

// ========== Re-entrant Registration ==========

/// Removes a registration (possibly its own) the first time it is notified.
struct Unsubscriber {
    list: Rc<ObserverList>,
    target: RefCell<Option<ObserverRef>>,
    calls: Cell<u32>,
}

impl Component for Unsubscriber {
    fn notify(&self, _sender: &dyn Component, notification: &Notification) {
        self.calls.set(self.calls.get() + 1);
        if let Some(target) = self.target.borrow_mut().take() {
            self.list.remove(&target, notification.id());
        }
    }
}

#[test]
fn test_self_removal_during_delivery() {
    let log = Log::default();
    let list = Rc::new(ObserverList::new());
    let unsubscriber = Rc::new(Unsubscriber {
        list: list.clone(),
        target: RefCell::new(None),
        calls: Cell::new(0),
    });
    let handle: ComponentRef = unsubscriber.clone();
    let weak: ObserverRef = Rc::downgrade(&handle);
    *unsubscriber.target.borrow_mut() = Some(weak.clone());

    let after = recorder(2, &log);
    list.add(weak, NotificationId::NmiDidAssert);
    list.add(Rc::downgrade(&after), NotificationId::NmiDidAssert);

    list.post(&Sender, &Notification::NmiDidAssert);
    list.post(&Sender, &Notification::NmiDidAssert);

    assert_eq!(unsubscriber.calls.get(), 1);
    // Neighbors keep receiving, each post exactly once
    assert_eq!(ids(&log), vec![2, 2]);
}

#[test]
fn test_removing_later_observer_takes_effect_next_post() {
    let log = Log::default();
    let list = Rc::new(ObserverList::new());
    let victim = recorder(2, &log);
    let unsubscriber = Rc::new(Unsubscriber {
        list: list.clone(),
        target: RefCell::new(Some(Rc::downgrade(&victim))),
        calls: Cell::new(0),
    });
    let handle: ComponentRef = unsubscriber.clone();
    list.add(Rc::downgrade(&handle), NotificationId::NmiDidAssert);
    list.add(Rc::downgrade(&victim), NotificationId::NmiDidAssert);

    list.post(&Sender, &Notification::NmiDidAssert);
    assert_eq!(ids(&log), vec![2]);
    list.post(&Sender, &Notification::NmiDidAssert);
    assert_eq!(ids(&log), vec![2]);
}

/// Registers a fresh recorder every time it is notified.
struct Recruiter {
    list: Rc<ObserverList>,
    log: Log,
    recruits: RefCell<Vec<ComponentRef>>,
}

impl Component for Recruiter {
    fn notify(&self, _sender: &dyn Component, notification: &Notification) {
        let recruit = recorder(9, &self.log);
        self.list.add(Rc::downgrade(&recruit), notification.id());
        self.recruits.borrow_mut().push(recruit);
    }
}

#[test]
fn test_addition_during_delivery_waits_for_next_post() {
    let log = Log::default();
    let list = Rc::new(ObserverList::new());
    let recruiter: ComponentRef = Rc::new(Recruiter {
        list: list.clone(),
        log: log.clone(),
        recruits: RefCell::new(Vec::new()),
    });
    list.add(Rc::downgrade(&recruiter), NotificationId::ResetDidAssert);

    list.post(&Sender, &Notification::ResetDidAssert);
    assert!(log.borrow().is_empty());
    list.post(&Sender, &Notification::ResetDidAssert);
    assert_eq!(ids(&log), vec![9]);
}

// ========== Component Wiring ==========

#[test]
fn test_cpu_rewire_to_same_bus_registers_once() {
    let control_bus = ControlBus::new();
    let once = Mos6502::new();
    let twice = Mos6502::new();
    once.set_ref("controlBus", Some(control_bus.clone()));
    twice.set_ref("controlBus", Some(control_bus.clone()));
    twice.set_ref("controlBus", Some(control_bus.clone()));

    // Each registration holds one weak handle to its observer
    assert_eq!(Rc::weak_count(&once), Rc::weak_count(&twice));

    twice.set_ref("controlBus", None);
    assert!(Rc::weak_count(&twice) < Rc::weak_count(&once));

    once.dispose();
}

#[test]
fn test_power_state_reaches_each_observer_once() {
    let control_bus = ControlBus::new();
    let log = Log::default();
    let probe = recorder(1, &log);
    control_bus.add_observer(Rc::downgrade(&probe), NotificationId::PowerStateDidChange);
    control_bus.add_observer(Rc::downgrade(&probe), NotificationId::PowerStateDidChange);

    control_bus.set_power_state(PowerState::On);
    control_bus.set_power_state(PowerState::On);
    assert_eq!(
        *log.borrow(),
        vec![(1, Notification::PowerStateDidChange(PowerState::On))]
    );
}

#[test]
fn test_rewire_moves_registration_between_buses() {
    let first = ControlBus::new();
    let second = ControlBus::new();
    let cpu = Mos6502::new();
    let ram = Ram::with_size(0x10000);
    ram.write(0xFFFA, 0x00);
    ram.write(0xFFFB, 0x90);
    cpu.set_ref("memoryBus", Some(ram));
    cpu.set_ref("controlBus", Some(first.clone()));
    cpu.set_ref("controlBus", Some(second.clone()));
    cpu.step(); // initial reset

    // The old bus no longer reaches the CPU
    first.assert_nmi();
    cpu.step();
    assert_ne!(cpu.registers().pc, 0x9000);

    second.assert_nmi();
    cpu.step();
    assert_eq!(cpu.registers().pc, 0x9000);

    cpu.dispose();
}

#[test]
fn test_weak_registration_does_not_keep_observer_alive() {
    let control_bus = ControlBus::new();
    let cpu = Mos6502::new();
    cpu.set_ref("controlBus", Some(control_bus.clone()));
    let weak: Weak<Mos6502> = Rc::downgrade(&cpu);
    drop(cpu);

    assert!(weak.upgrade().is_none());
    // Posting to the dead registration is harmless
    control_bus.assert_nmi();
    assert_eq!(control_bus.power_state(), PowerState::Off);
}
