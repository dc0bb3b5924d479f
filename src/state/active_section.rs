//! Active section state - single writer, many readers
//!
//! Only ids from the layout are accepted, so the current id is always a
//! member of the configured section set.

use crate::error::TrackerError;
use crate::sections::SectionLayout;
use crate::state::cell::{StateCell, SubscriptionId};
use std::sync::Arc;

#[derive(Debug)]
pub struct ActiveSection {
    layout: Arc<SectionLayout>,
    cell: StateCell<String>,
}

impl ActiveSection {
    /// Starts at the first section in navigation order
    pub fn new(layout: Arc<SectionLayout>) -> Self {
        let first = layout.first().id.clone();
        Self {
            layout,
            cell: StateCell::new(first),
        }
    }

    pub fn current(&self) -> &str {
        self.cell.get()
    }

    pub fn is_active(&self, id: &str) -> bool {
        self.current() == id
    }

    /// Returns whether the value changed
    pub fn set(&mut self, id: &str) -> Result<bool, TrackerError> {
        if !self.layout.contains(id) {
            return Err(TrackerError::UnknownSection(id.to_string()));
        }
        Ok(self.cell.set(id.to_string()))
    }

    pub fn subscribe<F>(&mut self, callback: F) -> SubscriptionId
    where
        F: FnMut(&String) + 'static,
    {
        self.cell.subscribe(callback)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.cell.unsubscribe(id)
    }

    pub fn clear_subscribers(&mut self) {
        self.cell.clear_subscribers();
    }

    pub fn subscriber_count(&self) -> usize {
        self.cell.subscriber_count()
    }
}
