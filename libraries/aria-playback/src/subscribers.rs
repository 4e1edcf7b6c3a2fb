//! State change fan-out
//!
//! Listeners receive a full [`PlayerState`] snapshot after every mutation.
//! A notification pass works on a copy of the listener list, so subscribing
//! or unsubscribing from inside a listener only affects later passes.

use crate::types::PlayerState;
use std::cell::RefCell;
use std::rc::{Rc, Weak};

type Listener = Rc<RefCell<dyn FnMut(&PlayerState)>>;

#[derive(Default)]
struct Inner {
    next_id: u64,
    listeners: Vec<(u64, Listener)>,
}

/// Registry of state listeners
#[derive(Default, Clone)]
pub struct SubscriberRegistry {
    inner: Rc<RefCell<Inner>>,
}

impl SubscriberRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: FnMut(&PlayerState) + 'static,
    {
        let mut inner = self.inner.borrow_mut();
        inner.next_id += 1;
        let id = inner.next_id;
        let listener: Listener = Rc::new(RefCell::new(listener));
        inner.listeners.push((id, listener));

        Subscription {
            id,
            registry: Rc::downgrade(&self.inner),
        }
    }

    /// Call every listener registered at the start of the pass
    pub fn notify(&self, state: &PlayerState) {
        let listeners: Vec<Listener> = self
            .inner
            .borrow()
            .listeners
            .iter()
            .map(|(_, listener)| Rc::clone(listener))
            .collect();

        for listener in listeners {
            // A listener cannot be re-entered from its own call
            if let Ok(mut listener) = listener.try_borrow_mut() {
                let call = &mut *listener;
                call(state);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.inner.borrow().listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every listener
    pub fn clear(&self) {
        self.inner.borrow_mut().listeners.clear();
    }
}

impl std::fmt::Debug for SubscriberRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriberRegistry")
            .field("listeners", &self.len())
            .finish()
    }
}

/// Handle returned by [`SubscriberRegistry::subscribe`]
///
/// Dropping the handle keeps the listener registered; call
/// [`unsubscribe`](Self::unsubscribe) to remove it.
#[derive(Debug, Clone)]
pub struct Subscription {
    id: u64,
    registry: Weak<RefCell<Inner>>,
}

impl Subscription {
    /// Remove the listener; returns `false` if it was already gone
    pub fn unsubscribe(&self) -> bool {
        let Some(inner) = self.registry.upgrade() else {
            return false;
        };
        let mut inner = inner.borrow_mut();
        let before = inner.listeners.len();
        inner.listeners.retain(|(id, _)| *id != self.id);
        inner.listeners.len() != before
    }
}
