//! Disposer handles returned by watcher registration.

use std::cell::Cell;
use std::rc::{Rc, Weak};

use super::watcher::WatcherId;

/// Removes one watcher from its scope.
///
/// Disposal is idempotent and may happen from inside a watch or listener
/// function while a cycle is running. The watcher is never evaluated again;
/// its registry slot is reclaimed when the current (or next) cycle ends.
///
/// Dropping a `Disposer` does not remove the watcher.
#[derive(Debug, Clone)]
pub struct Disposer {
    id: WatcherId,
    live: Rc<Cell<bool>>,
    last_dirty: Weak<Cell<Option<WatcherId>>>,
}

impl Disposer {
    pub(crate) fn new(id: WatcherId, live: Rc<Cell<bool>>, last_dirty: Weak<Cell<Option<WatcherId>>>) -> Self {
        Self { id, live, last_dirty }
    }

    /// The watcher this disposer removes.
    #[must_use]
    pub const fn id(&self) -> WatcherId {
        self.id
    }

    /// True until the first `dispose` call.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.live.get()
    }

    /// Removes the watcher. Returns `false` if it was already removed.
    pub fn dispose(&self) -> bool {
        if !self.live.replace(false) {
            return false;
        }

        // Removal changes what follows the short-circuit marker.
        if let Some(marker) = self.last_dirty.upgrade() {
            marker.set(None);
        }

        tracing::trace!(watcher = %self.id, "watcher disposed");
        true
    }
}
