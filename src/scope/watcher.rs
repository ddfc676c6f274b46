//! Watcher records and the registration builder.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::equality::EqualityMode;
use crate::value::Value;

use super::Scope;

/// Unique identifier for a watcher registration.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WatcherId(Uuid);

impl WatcherId {
    /// Create a new random watcher id.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Wrap an existing UUID.
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl Default for WatcherId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for WatcherId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Reads the scope and produces the watched value.
pub type WatchFn<S> = Box<dyn FnMut(&Scope<S>) -> anyhow::Result<Value>>;

/// Reacts to a change: `(new_value, old_value, scope)`.
pub type ListenerFn<S> = Box<dyn FnMut(&Value, &Value, &mut Scope<S>) -> anyhow::Result<()>>;

/// A watcher ready to be registered.
///
/// ```
/// use dirtyscope::{EqualityMode, Registration, Scope, Value};
///
/// let mut scope = Scope::new(vec![1.0, 2.0]);
/// let _disposer = scope.register(
///     Registration::new(|s: &Scope<Vec<f64>>| Ok(Value::from(s.state().len() as u32)))
///         .listener(|_new, _old, _scope| Ok(()))
///         .equality(EqualityMode::Deep),
/// );
/// scope.run_cycle().unwrap();
/// ```
pub struct Registration<S> {
    pub(crate) watch_fn: WatchFn<S>,
    pub(crate) listener_fn: Option<ListenerFn<S>>,
    pub(crate) equality: EqualityMode,
}

impl<S> Registration<S> {
    /// Starts a registration with no listener and reference equality.
    pub fn new<W>(watch_fn: W) -> Self
    where
        W: FnMut(&Scope<S>) -> anyhow::Result<Value> + 'static,
    {
        Self {
            watch_fn: Box::new(watch_fn),
            listener_fn: None,
            equality: EqualityMode::Reference,
        }
    }

    /// Sets the listener called with `(new_value, old_value, scope)` on change.
    #[must_use]
    pub fn listener<L>(mut self, listener_fn: L) -> Self
    where
        L: FnMut(&Value, &Value, &mut Scope<S>) -> anyhow::Result<()> + 'static,
    {
        self.listener_fn = Some(Box::new(listener_fn));
        self
    }

    /// Sets the equality mode.
    #[must_use]
    pub fn equality(mut self, equality: EqualityMode) -> Self {
        self.equality = equality;
        self
    }

    /// Shorthand for `equality(EqualityMode::Deep)`.
    #[must_use]
    pub fn deep(self) -> Self {
        self.equality(EqualityMode::Deep)
    }
}

impl<S> fmt::Debug for Registration<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registration")
            .field("has_listener", &self.listener_fn.is_some())
            .field("equality", &self.equality)
            .finish_non_exhaustive()
    }
}

pub(crate) struct Watcher<S> {
    pub(crate) id: WatcherId,
    pub(crate) watch_fn: RefCell<WatchFn<S>>,
    /// `None` is a no-op listener.
    pub(crate) listener_fn: RefCell<Option<ListenerFn<S>>>,
    /// `None` until the first evaluation.
    pub(crate) last: RefCell<Option<Value>>,
    pub(crate) equality: EqualityMode,
    pub(crate) live: Rc<Cell<bool>>,
}

impl<S> Watcher<S> {
    pub(crate) fn new(registration: Registration<S>) -> Self {
        let Registration {
            watch_fn,
            listener_fn,
            equality,
        } = registration;

        Self {
            id: WatcherId::new(),
            watch_fn: RefCell::new(watch_fn),
            listener_fn: RefCell::new(listener_fn),
            last: RefCell::new(None),
            equality,
            live: Rc::new(Cell::new(true)),
        }
    }

    pub(crate) fn is_live(&self) -> bool {
        self.live.get()
    }

    pub(crate) fn read(&self, scope: &Scope<S>) -> anyhow::Result<Value> {
        let mut watch_fn = self.watch_fn.borrow_mut();
        (*watch_fn)(scope)
    }

    /// Calls the listener, if any, with `(new_value, old_value, scope)`.
    pub(crate) fn notify(&self, new_value: &Value, old_value: &Value, scope: &mut Scope<S>) -> anyhow::Result<()> {
        match self.listener_fn.borrow_mut().as_mut() {
            Some(listener_fn) => listener_fn(new_value, old_value, scope),
            None => Ok(()),
        }
    }
}

impl<S> fmt::Debug for Watcher<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Watcher")
            .field("id", &self.id)
            .field("equality", &self.equality)
            .field("has_listener", &self.listener_fn.borrow().is_some())
            .field("live", &self.live.get())
            .field("initialized", &self.last.borrow().is_some())
            .finish_non_exhaustive()
    }
}
