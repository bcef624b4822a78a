//! Typed single-threaded publish/subscribe channel.
//!
//! SYSTEM CONTEXT
//! ==============
//! The auth module owns one bus for lifecycle events; the state machine and
//! the callback handler also use private buses to push snapshots to their
//! observers. Everything runs on the UI thread, so handlers are `Rc` closures.
//!
//! DESIGN
//! ======
//! Events published from inside a handler are queued and delivered after the
//! current event finishes, so every subscriber sees events in publish order.
//! Dropping a [`Subscription`] removes its handler; a handler removed while an
//! event is being delivered does not receive that event.

#[cfg(test)]
#[path = "bus_test.rs"]
mod bus_test;

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::{Rc, Weak};

type Handler<E> = Rc<dyn Fn(&E)>;

struct BusInner<E> {
    next_id: Cell<u64>,
    handlers: RefCell<Vec<(u64, Handler<E>)>>,
    queue: RefCell<VecDeque<E>>,
    dispatching: Cell<bool>,
}

/// Cloneable handle to a shared channel of `E` events.
pub struct EventBus<E> {
    inner: Rc<BusInner<E>>,
}

impl<E> Clone for EventBus<E> {
    fn clone(&self) -> Self {
        Self { inner: Rc::clone(&self.inner) }
    }
}

impl<E: 'static> Default for EventBus<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: 'static> EventBus<E> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Rc::new(BusInner {
                next_id: Cell::new(0),
                handlers: RefCell::new(Vec::new()),
                queue: RefCell::new(VecDeque::new()),
                dispatching: Cell::new(false),
            }),
        }
    }

    /// Register `handler` for every event published after this call.
    #[must_use = "dropping the subscription unsubscribes immediately"]
    pub fn subscribe(&self, handler: impl Fn(&E) + 'static) -> Subscription {
        let id = self.inner.next_id.get();
        self.inner.next_id.set(id + 1);
        self.inner.handlers.borrow_mut().push((id, Rc::new(handler)));

        let weak: Weak<BusInner<E>> = Rc::downgrade(&self.inner);
        Subscription {
            remove: Some(Box::new(move || {
                if let Some(inner) = weak.upgrade() {
                    inner.handlers.borrow_mut().retain(|(handler_id, _)| *handler_id != id);
                }
            })),
        }
    }

    /// Deliver `event` to all current subscribers.
    pub fn publish(&self, event: E) {
        self.inner.queue.borrow_mut().push_back(event);
        if self.inner.dispatching.replace(true) {
            return;
        }
        let _dispatch = DispatchGuard(&self.inner.dispatching);

        loop {
            let next = self.inner.queue.borrow_mut().pop_front();
            let Some(event) = next else { break };
            let snapshot: Vec<(u64, Handler<E>)> = self
                .inner
                .handlers
                .borrow()
                .iter()
                .map(|(id, handler)| (*id, Rc::clone(handler)))
                .collect();
            for (id, handler) in snapshot {
                if self.is_subscribed(id) {
                    handler(&event);
                }
            }
        }
    }

    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.inner.handlers.borrow().len()
    }

    fn is_subscribed(&self, id: u64) -> bool {
        self.inner.handlers.borrow().iter().any(|(handler_id, _)| *handler_id == id)
    }
}

/// Clears the dispatching flag on exit, including when a handler panics.
struct DispatchGuard<'a>(&'a Cell<bool>);

impl Drop for DispatchGuard<'_> {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

/// Registration handle; the handler stays registered while this is alive.
pub struct Subscription {
    remove: Option<Box<dyn FnOnce()>>,
}

impl Subscription {
    /// Remove the handler now. Equivalent to dropping the handle.
    pub fn unsubscribe(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if let Some(remove) = self.remove.take() {
            remove();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").field("active", &self.remove.is_some()).finish()
    }
}
