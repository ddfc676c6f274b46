//! Ordered watcher registry.
//!
//! Newest registrations sit at the front and are evaluated first. Disposed
//! watchers stay in place as tombstones (their `live` flag is cleared) until
//! [`Registry::compact`] runs after a cycle, so removing a watcher mid-pass
//! never shifts the position of any other entry.

use std::rc::Rc;

use super::watcher::{Watcher, WatcherId};

pub(crate) struct Registry<S> {
    entries: Vec<Rc<Watcher<S>>>,
}

impl<S> Default for Registry<S> {
    fn default() -> Self {
        Self { entries: Vec::new() }
    }
}

impl<S> Registry<S> {
    pub(crate) fn insert_front(&mut self, watcher: Rc<Watcher<S>>) {
        self.entries.insert(0, watcher);
    }

    /// Live entries in evaluation order.
    ///
    /// The returned handles are independent of the registry, so callbacks may
    /// register or dispose watchers while the caller walks the list.
    pub(crate) fn live(&self) -> Vec<Rc<Watcher<S>>> {
        self.entries.iter().filter(|w| w.is_live()).cloned().collect()
    }

    pub(crate) fn live_count(&self) -> usize {
        self.entries.iter().filter(|w| w.is_live()).count()
    }

    pub(crate) fn tombstones(&self) -> usize {
        self.entries.len() - self.live_count()
    }

    pub(crate) fn ids(&self) -> Vec<WatcherId> {
        self.entries.iter().filter(|w| w.is_live()).map(|w| w.id).collect()
    }

    /// Drops tombstones, keeping the relative order of live entries.
    ///
    /// Returns the number of entries removed.
    pub(crate) fn compact(&mut self) -> usize {
        let before = self.entries.len();
        self.entries.retain(|w| w.is_live());
        before - self.entries.len()
    }
}
