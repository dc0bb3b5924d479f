//! Mobile navigation drawer open/closed state

use crate::state::cell::{StateCell, SubscriptionId};

#[derive(Debug)]
pub struct DrawerState {
    cell: StateCell<bool>,
}

impl DrawerState {
    pub fn new() -> Self {
        Self { cell: StateCell::new(false) }
    }

    pub fn is_open(&self) -> bool {
        *self.cell.get()
    }

    pub fn open(&mut self) -> bool {
        self.cell.set(true)
    }

    pub fn close(&mut self) -> bool {
        self.cell.set(false)
    }

    pub fn toggle(&mut self) -> bool {
        let next = !self.is_open();
        self.cell.set(next);
        next
    }

    pub fn subscribe<F>(&mut self, callback: F) -> SubscriptionId
    where
        F: FnMut(&bool) + 'static,
    {
        self.cell.subscribe(callback)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.cell.unsubscribe(id)
    }

    pub fn clear_subscribers(&mut self) {
        self.cell.clear_subscribers();
    }
}

impl Default for DrawerState {
    fn default() -> Self {
        Self::new()
    }
}
