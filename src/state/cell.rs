//! Observable value with explicit subscriptions
//!
//! `StateCell` holds the last value and notifies subscribers when it changes.
//! Subscribing returns a [`SubscriptionId`] that must be handed back to
//! `unsubscribe`; nothing is released implicitly.

use std::fmt;

/// Disposer handle returned by `subscribe`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Callback<T> = Box<dyn FnMut(&T)>;

pub struct StateCell<T> {
    value: T,
    next_id: u64,
    subscribers: Vec<(SubscriptionId, Callback<T>)>,
}

impl<T: PartialEq> StateCell<T> {
    pub fn new(value: T) -> Self {
        Self {
            value,
            next_id: 0,
            subscribers: Vec::new(),
        }
    }

    pub fn get(&self) -> &T {
        &self.value
    }

    /// Store and broadcast `value`; returns false (and stays silent) if unchanged
    pub fn set(&mut self, value: T) -> bool {
        if self.value == value {
            return false;
        }
        self.value = value;
        for (_, callback) in self.subscribers.iter_mut() {
            callback(&self.value);
        }
        true
    }

    /// Register a callback; it is called at once with the current value
    pub fn subscribe<F>(&mut self, mut callback: F) -> SubscriptionId
    where
        F: FnMut(&T) + 'static,
    {
        self.next_id += 1;
        let id = SubscriptionId(self.next_id);
        callback(&self.value);
        self.subscribers.push((id, Box::new(callback)));
        id
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|(sub, _)| *sub != id);
        self.subscribers.len() != before
    }

    pub fn clear_subscribers(&mut self) {
        self.subscribers.clear();
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }
}

impl<T: fmt::Debug> fmt::Debug for StateCell<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateCell")
            .field("value", &self.value)
            .field("subscribers", &self.subscribers.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn test_notifies_on_change_only() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut cell = StateCell::new(1);

        let sink = Rc::clone(&seen);
        cell.subscribe(move |v| sink.borrow_mut().push(*v));

        assert!(cell.set(2));
        assert!(!cell.set(2));
        assert!(cell.set(3));

        assert_eq!(*seen.borrow(), vec![1, 2, 3]);
    }

    #[test]
    fn test_unsubscribe_stops_updates() {
        let seen = Rc::new(RefCell::new(0));
        let mut cell = StateCell::new("a".to_string());

        let sink = Rc::clone(&seen);
        let id = cell.subscribe(move |_| *sink.borrow_mut() += 1);
        assert_eq!(cell.subscriber_count(), 1);

        assert!(cell.unsubscribe(id));
        assert!(!cell.unsubscribe(id));
        cell.set("b".to_string());

        assert_eq!(*seen.borrow(), 1);
        assert_eq!(cell.subscriber_count(), 0);
    }
}
