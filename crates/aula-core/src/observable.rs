//! Single-threaded observable value.
//!
//! `Observable<T>` is a shared holder: clones point at the same slot, so a
//! value written through one handle is visible through every other one and
//! every registered subscriber is called with the new value.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// Handle returned by [`Observable::subscribe`], used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Callback<T> = Rc<dyn Fn(&T)>;

struct Inner<T> {
    value: T,
    next_id: u64,
    subscribers: Vec<(SubscriptionId, Callback<T>)>,
}

pub struct Observable<T> {
    inner: Rc<RefCell<Inner<T>>>,
}

impl<T: Clone> Observable<T> {
    pub fn new(value: T) -> Self {
        Self {
            inner: Rc::new(RefCell::new(Inner {
                value,
                next_id: 0,
                subscribers: Vec::new(),
            })),
        }
    }

    /// Current value (cloned out of the slot)
    pub fn get(&self) -> T {
        self.inner.borrow().value.clone()
    }

    /// Inspect the current value without cloning it
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.inner.borrow().value)
    }

    /// Replace the value and notify every subscriber.
    ///
    /// Subscribers run after the slot is released, so a callback may read
    /// the observable or even set it again.
    pub fn set(&self, value: T) {
        let (snapshot, callbacks) = {
            let mut inner = self.inner.borrow_mut();
            inner.value = value;
            let callbacks: Vec<Callback<T>> =
                inner.subscribers.iter().map(|(_, cb)| Rc::clone(cb)).collect();
            (inner.value.clone(), callbacks)
        };

        for callback in callbacks {
            callback(&snapshot);
        }
    }

    /// Register a callback invoked on every `set`
    pub fn subscribe(&self, callback: impl Fn(&T) + 'static) -> SubscriptionId {
        let mut inner = self.inner.borrow_mut();
        let id = SubscriptionId(inner.next_id);
        inner.next_id += 1;
        inner.subscribers.push((id, Rc::new(callback)));
        id
    }

    /// Remove a subscriber. Returns false if the id was unknown.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut inner = self.inner.borrow_mut();
        let before = inner.subscribers.len();
        inner.subscribers.retain(|(sub_id, _)| *sub_id != id);
        inner.subscribers.len() != before
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.borrow().subscribers.len()
    }
}

impl<T> Clone for Observable<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: Default + Clone> Default for Observable<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: fmt::Debug> fmt::Debug for Observable<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("Observable")
            .field("value", &inner.value)
            .field("subscribers", &inner.subscribers.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn test_get_and_set() {
        let value = Observable::new(1);
        assert_eq!(value.get(), 1);
        value.set(5);
        assert_eq!(value.get(), 5);
    }

    #[test]
    fn test_clones_share_the_slot() {
        let a = Observable::new(String::from("x"));
        let b = a.clone();
        b.set("y".to_string());
        assert_eq!(a.get(), "y");
    }

    #[test]
    fn test_subscribers_see_new_value() {
        let value = Observable::new(0);
        let seen = Rc::new(RefCell::new(Vec::new()));

        let sink = Rc::clone(&seen);
        value.subscribe(move |v| sink.borrow_mut().push(*v));

        value.set(1);
        value.set(2);
        assert_eq!(*seen.borrow(), vec![1, 2]);
    }

    #[test]
    fn test_unsubscribe_stops_notifications() {
        let value = Observable::new(0);
        let calls = Rc::new(Cell::new(0));

        let counter = Rc::clone(&calls);
        let id = value.subscribe(move |_| counter.set(counter.get() + 1));

        value.set(1);
        assert!(value.unsubscribe(id));
        value.set(2);

        assert_eq!(calls.get(), 1);
        assert_eq!(value.subscriber_count(), 0);
        // Second unsubscribe is a no-op
        assert!(!value.unsubscribe(id));
    }

    #[test]
    fn test_callback_may_read_the_observable() {
        let value = Observable::new(0);
        let reader = value.clone();
        let observed = Rc::new(Cell::new(-1));

        let out = Rc::clone(&observed);
        value.subscribe(move |_| out.set(reader.get()));

        value.set(7);
        assert_eq!(observed.get(), 7);
    }
}
