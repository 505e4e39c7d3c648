//! Observable values with explicit subscription handles
//!
//! An [`Observable`] is a shared value that notifies every subscriber on each
//! write. Subscribing hands back a [`Subscription`]; subscriptions owned by one
//! component are collected into a [`DisposeBag`] and released together when
//! that component is torn down.
//!
//! # Invariants
//!
//! 1. Every `set`, `update` and `notify` emits, even when the value did not
//!    change. Components rely on their own writes coming back to them.
//! 2. Subscribers are notified in registration order.
//! 3. Callbacks run after the internal lock is released, so a callback may
//!    freely read or write other observables (or the same one). A write made
//!    from inside a callback is queued and delivered once every subscriber
//!    has seen the current emission, so all subscribers observe emissions in
//!    the same order and end on the latest value.
//! 4. Once a [`Subscription`] is released its callback is never invoked again.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

type Callback<T> = Arc<dyn Fn(&T) + Send + Sync>;

struct Shared<T> {
    value: T,
    version: u64,
    next_id: u64,
    subscribers: Vec<(u64, Callback<T>)>,
    /// An emission round is delivering callbacks
    notifying: bool,
    /// Emissions made during the current round, oldest first
    pending: VecDeque<T>,
}

/// A shared, notifying value
///
/// Cloning an `Observable` yields another handle to the same value.
pub struct Observable<T> {
    shared: Arc<Mutex<Shared<T>>>,
}

impl<T> Clone for Observable<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T: Default + Clone + Send + 'static> Default for Observable<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for Observable<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let shared = lock(&self.shared);
        f.debug_struct("Observable")
            .field("value", &shared.value)
            .field("version", &shared.version)
            .field("subscribers", &shared.subscribers.len())
            .finish()
    }
}

/// Lock the shared state, recovering the guard if a callback panicked while
/// another thread held it.
fn lock<T>(shared: &Mutex<Shared<T>>) -> MutexGuard<'_, Shared<T>> {
    shared.lock().unwrap_or_else(PoisonError::into_inner)
}

impl<T: Clone + Send + 'static> Observable<T> {
    pub fn new(value: T) -> Self {
        Self {
            shared: Arc::new(Mutex::new(Shared {
                value,
                version: 0,
                next_id: 0,
                subscribers: Vec::new(),
                notifying: false,
                pending: VecDeque::new(),
            })),
        }
    }

    /// Clone out the current value
    pub fn get(&self) -> T {
        lock(&self.shared).value.clone()
    }

    /// Borrow the current value without cloning it
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&lock(&self.shared).value)
    }

    /// Number of emissions so far
    pub fn version(&self) -> u64 {
        lock(&self.shared).version
    }

    /// Replace the value and notify subscribers
    pub fn set(&self, value: T) {
        self.emit(|current| *current = value);
    }

    /// Mutate the value in place and notify subscribers
    pub fn update(&self, f: impl FnOnce(&mut T)) {
        self.emit(f);
    }

    /// Re-emit the current value unchanged
    pub fn notify(&self) {
        self.emit(|_| {});
    }

    /// Mutate the value in place without notifying anyone.
    ///
    /// Subscribers only see the edit after the next `notify()` (or any other
    /// write).
    pub fn modify_silently<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        f(&mut lock(&self.shared).value)
    }

    /// Register a callback. It is invoked immediately with the current value,
    /// then once per emission until the returned [`Subscription`] is released.
    pub fn subscribe(&self, callback: impl Fn(&T) + Send + Sync + 'static) -> Subscription {
        let callback: Callback<T> = Arc::new(callback);
        let (id, current) = {
            let mut shared = lock(&self.shared);
            let id = shared.next_id;
            shared.next_id += 1;
            shared.subscribers.push((id, Arc::clone(&callback)));
            (id, shared.value.clone())
        };
        callback(&current);

        let weak: Weak<Mutex<Shared<T>>> = Arc::downgrade(&self.shared);
        Subscription::new(move || {
            if let Some(shared) = weak.upgrade() {
                lock(&shared).subscribers.retain(|(sid, _)| *sid != id);
            }
        })
    }

    /// Number of live subscriptions
    pub fn subscriber_count(&self) -> usize {
        lock(&self.shared).subscribers.len()
    }

    fn emit(&self, mutate: impl FnOnce(&mut T)) {
        let first = {
            let mut shared = lock(&self.shared);
            mutate(&mut shared.value);
            shared.version += 1;
            let value = shared.value.clone();
            if shared.notifying {
                shared.pending.push_back(value);
                return;
            }
            shared.notifying = true;
            value
        };

        let mut round = Round {
            shared: &*self.shared,
            finished: false,
        };
        let mut next = Some(first);
        while let Some(value) = next {
            self.deliver(&value);
            next = {
                let mut shared = lock(&self.shared);
                let queued = shared.pending.pop_front();
                if queued.is_none() {
                    shared.notifying = false;
                }
                queued
            };
        }
        round.finished = true;
    }

    /// Hand `value` to every subscriber still registered when its turn comes
    fn deliver(&self, value: &T) {
        let callbacks: Vec<(u64, Callback<T>)> = lock(&self.shared)
            .subscribers
            .iter()
            .map(|(id, cb)| (*id, Arc::clone(cb)))
            .collect();
        for (id, callback) in callbacks {
            let live = lock(&self.shared)
                .subscribers
                .iter()
                .any(|(sid, _)| *sid == id);
            if live {
                callback(value);
            }
        }
    }
}

/// Ends an emission round even if a callback panics, so later writes are not
/// queued forever
struct Round<'a, T> {
    shared: &'a Mutex<Shared<T>>,
    finished: bool,
}

impl<T> Drop for Round<'_, T> {
    fn drop(&mut self) {
        if !self.finished {
            let mut shared = lock(self.shared);
            shared.notifying = false;
            shared.pending.clear();
        }
    }
}

/// Handle to a registered callback.
///
/// Releasing it, either through [`Subscription::unsubscribe`] or by dropping
/// it, detaches the callback.
#[must_use = "dropping a Subscription detaches its callback immediately"]
pub struct Subscription {
    cancel: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl Subscription {
    fn new(cancel: impl FnOnce() + Send + Sync + 'static) -> Self {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }

    pub fn unsubscribe(mut self) {
        self.release();
    }

    /// Move this subscription into a bag
    pub fn store_in(self, bag: &mut DisposeBag) {
        bag.insert(self);
    }

    fn release(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
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
        f.debug_struct("Subscription")
            .field("active", &self.cancel.is_some())
            .finish()
    }
}

/// A group of subscriptions released together
#[derive(Default, Debug)]
pub struct DisposeBag {
    subscriptions: Vec<Subscription>,
}

impl DisposeBag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, subscription: Subscription) {
        self.subscriptions.push(subscription);
    }

    pub fn len(&self) -> usize {
        self.subscriptions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscriptions.is_empty()
    }

    /// Release every subscription in registration order
    pub fn dispose(&mut self) {
        for mut subscription in self.subscriptions.drain(..) {
            subscription.release();
        }
    }
}

impl Drop for DisposeBag {
    fn drop(&mut self) {
        self.dispose();
    }
}
