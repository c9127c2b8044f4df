#![deny(warnings)]

//! Typed publish/subscribe hub used by the simulation engines.
//!
//! Listeners run synchronously, in subscription order, strictly after the
//! state mutation the event describes. Events published from inside a
//! listener are queued and dispatched once the in-flight event has been
//! delivered to every listener, so dispatch never interleaves.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::fmt;
use std::rc::Rc;

/// Handle returned by [`EventBus::subscribe`]; pass it back to unsubscribe.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Callback<E> = Rc<RefCell<dyn FnMut(&E)>>;

struct Listener<E> {
    id: SubscriptionId,
    callback: Callback<E>,
}

/// Synchronous fan-out bus for one event type.
///
/// All methods take `&self` so a bus wrapped in [`Rc`] can be shared between
/// the engines that publish on it and the listeners that react to it.
pub struct EventBus<E> {
    listeners: RefCell<Vec<Listener<E>>>,
    queue: RefCell<VecDeque<E>>,
    next_id: Cell<u64>,
    dispatching: Cell<bool>,
}

impl<E> EventBus<E> {
    pub fn new() -> Self {
        Self {
            listeners: RefCell::new(Vec::new()),
            queue: RefCell::new(VecDeque::new()),
            next_id: Cell::new(0),
            dispatching: Cell::new(false),
        }
    }

    /// Register a listener; it will be invoked for every subsequent event.
    pub fn subscribe<F>(&self, callback: F) -> SubscriptionId
    where
        F: FnMut(&E) + 'static,
    {
        let id = SubscriptionId(self.next_id.get());
        self.next_id.set(self.next_id.get() + 1);
        self.listeners.borrow_mut().push(Listener {
            id,
            callback: Rc::new(RefCell::new(callback)),
        });
        id
    }

    /// Remove a listener. Idempotent: returns whether anything was removed.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut listeners = self.listeners.borrow_mut();
        let before = listeners.len();
        listeners.retain(|l| l.id != id);
        listeners.len() != before
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.borrow().len()
    }

    /// Deliver an event to every listener in subscription order.
    ///
    /// A publish issued from inside a listener lands on the queue and is
    /// drained by the outer call after the current event finishes, so nested
    /// emission cannot interleave with an in-flight dispatch.
    pub fn publish(&self, event: E) {
        self.queue.borrow_mut().push_back(event);
        if self.dispatching.get() {
            return;
        }
        self.dispatching.set(true);
        loop {
            let next = self.queue.borrow_mut().pop_front();
            let event = match next {
                Some(event) => event,
                None => break,
            };
            // Snapshot the callbacks so listeners may subscribe/unsubscribe
            // while the event is being delivered; additions take effect from
            // the next event onward.
            let callbacks: Vec<Callback<E>> = self
                .listeners
                .borrow()
                .iter()
                .map(|l| Rc::clone(&l.callback))
                .collect();
            for callback in callbacks {
                (&mut *callback.borrow_mut())(&event);
            }
        }
        self.dispatching.set(false);
    }
}

impl<E> Default for EventBus<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> fmt::Debug for EventBus<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("listeners", &self.listener_count())
            .field("dispatching", &self.dispatching.get())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn listeners_run_in_subscription_order() {
        let bus: EventBus<u32> = EventBus::new();
        let log = Rc::new(RefCell::new(Vec::new()));
        for tag in ["a", "b", "c"] {
            let log = Rc::clone(&log);
            bus.subscribe(move |e: &u32| log.borrow_mut().push((tag, *e)));
        }
        bus.publish(7);
        assert_eq!(*log.borrow(), vec![("a", 7), ("b", 7), ("c", 7)]);
    }

    #[test]
    fn unsubscribe_is_idempotent() {
        let bus: EventBus<u32> = EventBus::new();
        let id = bus.subscribe(|_| {});
        assert_eq!(bus.listener_count(), 1);
        assert!(bus.unsubscribe(id));
        assert!(!bus.unsubscribe(id));
        assert_eq!(bus.listener_count(), 0);
    }

    #[test]
    fn nested_publish_is_deferred_until_current_event_finishes() {
        let bus = Rc::new(EventBus::new());
        let log = Rc::new(RefCell::new(Vec::new()));

        let inner_bus = Rc::clone(&bus);
        let inner_log = Rc::clone(&log);
        bus.subscribe(move |e: &u32| {
            inner_log.borrow_mut().push(("first", *e));
            if *e == 1 {
                inner_bus.publish(2);
            }
        });
        let second_log = Rc::clone(&log);
        bus.subscribe(move |e: &u32| second_log.borrow_mut().push(("second", *e)));

        bus.publish(1);
        // The nested event reaches both listeners only after event 1 has been
        // delivered to both.
        assert_eq!(
            *log.borrow(),
            vec![("first", 1), ("second", 1), ("first", 2), ("second", 2)]
        );
    }

    #[test]
    fn listener_may_unsubscribe_itself_mid_dispatch() {
        let bus = Rc::new(EventBus::new());
        let calls = Rc::new(Cell::new(0u32));

        let id_slot = Rc::new(Cell::new(None));
        let inner_bus = Rc::clone(&bus);
        let inner_calls = Rc::clone(&calls);
        let inner_slot = Rc::clone(&id_slot);
        let id = bus.subscribe(move |_: &u32| {
            inner_calls.set(inner_calls.get() + 1);
            if let Some(id) = inner_slot.get() {
                inner_bus.unsubscribe(id);
            }
        });
        id_slot.set(Some(id));

        bus.publish(0);
        bus.publish(0);
        assert_eq!(calls.get(), 1);
    }
}
