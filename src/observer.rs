//! # Observer Multicast
//!
//! [`ObserverList`] is the notification fan-out a component embeds to implement
//! [`Component::add_observer`], [`Component::remove_observer`] and notification posting.
//!
//! ## Delivery Rules
//!
//! - Delivery is synchronous and follows registration order.
//! - Registering the same observer twice under one id keeps a single registration, so
//!   one post never reaches an observer twice.
//! - Each post delivers to a snapshot of the list taken before the first callback. An
//!   observer may add or remove registrations (its own included) while being notified;
//!   the change takes effect from the next post.
//! - Registrations hold weak handles. Observers that have been dropped are skipped and
//!   pruned.

use std::cell::RefCell;
use std::collections::HashMap;

use crate::component::{
    same_component, same_observer, Component, ComponentRef, Notification, NotificationId,
    ObserverRef,
};

/// Ordered observer registrations keyed by notification id.
///
/// # Examples
///
/// ```rust
/// use a2core::{Component, Notification, NotificationId, ObserverList};
/// use std::cell::Cell;
/// use std::rc::Rc;
///
/// struct Counter {
///     seen: Cell<u32>,
/// }
///
/// impl Component for Counter {
///     fn notify(&self, _sender: &dyn Component, _notification: &Notification) {
///         self.seen.set(self.seen.get() + 1);
///     }
/// }
///
/// struct Sender;
/// impl Component for Sender {}
///
/// let counter = Rc::new(Counter { seen: Cell::new(0) });
/// let handle: Rc<dyn Component> = counter.clone();
/// let list = ObserverList::new();
///
/// list.add(Rc::downgrade(&handle), NotificationId::NmiDidAssert);
/// list.add(Rc::downgrade(&handle), NotificationId::NmiDidAssert);
/// list.post(&Sender, &Notification::NmiDidAssert);
///
/// assert_eq!(counter.seen.get(), 1);
/// ```
#[derive(Default)]
pub struct ObserverList {
    observers: RefCell<HashMap<NotificationId, Vec<ObserverRef>>>,
}

impl ObserverList {
    /// Creates an empty list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `observer` for `id`. Registering an existing pair is a no-op.
    ///
    /// Always returns `true`.
    pub fn add(&self, observer: ObserverRef, id: NotificationId) -> bool {
        let mut observers = self.observers.borrow_mut();
        let list = observers.entry(id).or_default();
        if !list.iter().any(|existing| same_observer(existing, &observer)) {
            list.push(observer);
        }
        true
    }

    /// Removes the registration of `observer` for `id`.
    ///
    /// Returns `false` if there was none.
    pub fn remove(&self, observer: &ObserverRef, id: NotificationId) -> bool {
        let mut observers = self.observers.borrow_mut();
        let Some(list) = observers.get_mut(&id) else {
            return false;
        };
        let before = list.len();
        list.retain(|existing| !same_observer(existing, observer));
        list.len() != before
    }

    /// Number of live registrations for `id`.
    pub fn count(&self, id: NotificationId) -> usize {
        self.observers
            .borrow()
            .get(&id)
            .map_or(0, |list| list.iter().filter(|o| o.strong_count() > 0).count())
    }

    /// Delivers `notification` to every observer registered for its id.
    pub fn post(&self, sender: &dyn Component, notification: &Notification) {
        let snapshot = {
            let mut observers = self.observers.borrow_mut();
            match observers.get_mut(&notification.id()) {
                Some(list) => {
                    list.retain(|observer| observer.strong_count() > 0);
                    list.clone()
                }
                None => return,
            }
        };

        for observer in snapshot {
            if let Some(observer) = observer.upgrade() {
                observer.notify(sender, notification);
            }
        }
    }

    /// Drops every registration.
    pub fn clear(&self) {
        self.observers.borrow_mut().clear();
    }
}

/// Moves a reference slot and its observer registrations to a new target.
///
/// Removes `observer`'s registrations for every id in `ids` from the component held in
/// `slot`, stores `target`, then registers on the new target. Calling it again with the
/// same target leaves exactly one registration per id.
///
/// Returns `true` if the target changed.
pub fn rewire_observer(
    slot: &RefCell<Option<ComponentRef>>,
    target: Option<ComponentRef>,
    observer: &ObserverRef,
    ids: &[NotificationId],
) -> bool {
    let previous = slot.replace(target.clone());
    if let Some(previous) = &previous {
        for &id in ids {
            previous.remove_observer(observer, id);
        }
    }
    if let Some(target) = &target {
        for &id in ids {
            target.add_observer(observer.clone(), id);
        }
    }
    match (&previous, &target) {
        (Some(a), Some(b)) => !same_component(a, b),
        (None, None) => false,
        _ => true,
    }
}
