// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Minimal synchronous publish/subscribe hub.
//!
//! Handlers run on the emitting thread, outside the hub's lock, so a handler
//! may subscribe or unsubscribe without deadlocking.

use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::{Arc, Weak};

type Handler<T> = Arc<dyn Fn(&T) + Send + Sync>;

struct HubInner<T> {
    next_id: u64,
    handlers: BTreeMap<u64, Handler<T>>,
}

pub struct EventHub<T> {
    inner: Arc<Mutex<HubInner<T>>>,
}

impl<T> Clone for EventHub<T> {
    fn clone(&self) -> Self {
        Self { inner: Arc::clone(&self.inner) }
    }
}

impl<T> Default for EventHub<T> {
    fn default() -> Self {
        Self { inner: Arc::new(Mutex::new(HubInner { next_id: 0, handlers: BTreeMap::new() })) }
    }
}

impl<T: 'static> EventHub<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler. It stays registered until the returned
    /// [`Subscription`] is dropped or unsubscribed.
    pub fn subscribe(&self, handler: impl Fn(&T) + Send + Sync + 'static) -> Subscription {
        let id = {
            let mut inner = self.inner.lock();
            let id = inner.next_id;
            inner.next_id += 1;
            inner.handlers.insert(id, Arc::new(handler));
            id
        };
        let weak: Weak<Mutex<HubInner<T>>> = Arc::downgrade(&self.inner);
        Subscription {
            cancel: Some(Box::new(move || {
                if let Some(inner) = weak.upgrade() {
                    inner.lock().handlers.remove(&id);
                }
            })),
        }
    }

    /// Deliver `value` to every handler in subscription order.
    pub fn emit(&self, value: &T) {
        let handlers: Vec<Handler<T>> = self.inner.lock().handlers.values().cloned().collect();
        for handler in handlers {
            handler(value);
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.lock().handlers.len()
    }

    /// Drop every handler.
    pub fn clear(&self) {
        self.inner.lock().handlers.clear();
    }
}

/// Handle returned by [`EventHub::subscribe`].
#[must_use = "dropping a Subscription unsubscribes the handler"]
pub struct Subscription {
    cancel: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    pub fn unsubscribe(mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }

    /// Keep the handler registered for the hub's lifetime.
    pub fn forget(mut self) {
        self.cancel = None;
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").field("active", &self.cancel.is_some()).finish()
    }
}

#[cfg(test)]
#[path = "pubsub_tests.rs"]
mod tests;
