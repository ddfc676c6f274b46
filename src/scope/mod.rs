//! The convergence engine.
//!
//! A [`Scope`] owns the host's state and an ordered registry of watchers.
//! [`Scope::run_cycle`] re-evaluates every watcher, calls listeners for the
//! ones whose value changed, and repeats until a pass observes no change or
//! the dirty-pass budget ([`ScopeConfig::ttl`]) runs out.
//!
//! Watch functions receive `&Scope<S>` and listeners `&mut Scope<S>`, so both
//! may read state, register watchers, and dispose watchers mid-cycle. Only
//! listeners may write state.

/// Disposer handles.
pub mod disposer;
/// Single-pass evaluation and cycle counters.
pub mod digest;
/// Watcher storage with tombstones.
mod registry;
/// Watcher records and registrations.
pub mod watcher;

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use tracing::{debug, error, trace, warn};

use crate::config::ScopeConfig;
use crate::error::{ScopeError, ScopeResult};
use crate::value::Value;

use registry::Registry;

pub use digest::CycleSummary;
pub use disposer::Disposer;
pub use watcher::{ListenerFn, Registration, WatchFn, WatcherId};

use watcher::Watcher;

/// State container plus watcher registry.
///
/// # Examples
///
/// ```
/// use dirtyscope::{Scope, Value};
///
/// #[derive(Default)]
/// struct Person {
///     name: String,
///     initial: String,
/// }
///
/// let mut scope = Scope::new(Person::default());
/// scope.watch(
///     |s: &Scope<Person>| Ok(Value::from(s.state().name.as_str())),
///     |new, _old, s| {
///         if let Some(first) = new.as_str().and_then(|n| n.chars().next()) {
///             s.state_mut().initial = format!("{first}.");
///         }
///         Ok(())
///     },
/// );
///
/// scope.state_mut().name = "Jane".to_string();
/// scope.run_cycle().unwrap();
/// assert_eq!(scope.state().initial, "J.");
/// ```
pub struct Scope<S> {
    state: S,
    config: ScopeConfig,
    registry: RefCell<Registry<S>>,
    /// Short-circuit marker: the most recent watcher seen dirty.
    last_dirty: Rc<Cell<Option<WatcherId>>>,
    /// Bumped on every registration.
    registrations: Cell<u64>,
    digesting: bool,
}

impl<S> Scope<S> {
    /// Creates a scope with the default configuration.
    pub fn new(state: S) -> Self {
        Self::build(state, ScopeConfig::default())
    }

    /// Creates a scope with `config`, rejecting invalid settings.
    pub fn with_config(state: S, config: ScopeConfig) -> ScopeResult<Self> {
        config.validate()?;
        Ok(Self::build(state, config))
    }

    fn build(state: S, config: ScopeConfig) -> Self {
        Self {
            state,
            config,
            registry: RefCell::new(Registry::default()),
            last_dirty: Rc::new(Cell::new(None)),
            registrations: Cell::new(0),
            digesting: false,
        }
    }

    /// The host state.
    #[must_use]
    pub const fn state(&self) -> &S {
        &self.state
    }

    /// Mutable access to the host state.
    pub fn state_mut(&mut self) -> &mut S {
        &mut self.state
    }

    /// Consumes the scope, returning the host state.
    pub fn into_state(self) -> S {
        self.state
    }

    /// The configuration this scope was built with.
    #[must_use]
    pub const fn config(&self) -> &ScopeConfig {
        &self.config
    }

    /// Live watchers.
    #[must_use]
    pub fn watcher_count(&self) -> usize {
        self.registry.borrow().live_count()
    }

    /// Live watcher ids in evaluation order (newest first).
    #[must_use]
    pub fn watcher_ids(&self) -> Vec<WatcherId> {
        self.registry.borrow().ids()
    }

    /// True while `run_cycle` is executing.
    #[must_use]
    pub const fn is_digesting(&self) -> bool {
        self.digesting
    }

    /// Adds a watcher at the front of the registry.
    ///
    /// The watcher's first evaluation always counts as a change, and its
    /// listener then sees the new value as the old value too.
    pub fn register(&self, registration: Registration<S>) -> Disposer {
        let watcher = Rc::new(Watcher::new(registration));
        let disposer = Disposer::new(watcher.id, Rc::clone(&watcher.live), Rc::downgrade(&self.last_dirty));

        trace!(watcher = %watcher.id, equality = ?watcher.equality, "watcher registered");
        self.registry.borrow_mut().insert_front(watcher);

        // A stale marker could end a pass before the new watcher runs.
        self.last_dirty.set(None);
        self.registrations.set(self.registrations.get() + 1);

        disposer
    }

    /// Watches with reference equality.
    pub fn watch<W, L>(&self, watch_fn: W, listener_fn: L) -> Disposer
    where
        W: FnMut(&Scope<S>) -> anyhow::Result<Value> + 'static,
        L: FnMut(&Value, &Value, &mut Scope<S>) -> anyhow::Result<()> + 'static,
    {
        self.register(Registration::new(watch_fn).listener(listener_fn))
    }

    /// Watches with deep equality; the last value is kept as a deep copy.
    pub fn watch_deep<W, L>(&self, watch_fn: W, listener_fn: L) -> Disposer
    where
        W: FnMut(&Scope<S>) -> anyhow::Result<Value> + 'static,
        L: FnMut(&Value, &Value, &mut Scope<S>) -> anyhow::Result<()> + 'static,
    {
        self.register(Registration::new(watch_fn).listener(listener_fn).deep())
    }

    /// Watches without a listener.
    pub fn watch_silent<W>(&self, watch_fn: W) -> Disposer
    where
        W: FnMut(&Scope<S>) -> anyhow::Result<Value> + 'static,
    {
        self.register(Registration::new(watch_fn))
    }

    /// Runs passes until one is clean.
    ///
    /// Fails with [`ScopeError::Nonconvergent`] when `ttl` consecutive passes
    /// are dirty, and with [`ScopeError::CycleInProgress`] when called from a
    /// listener. Errors and panics from watch and listener functions are
    /// logged and counted in the summary, never returned.
    pub fn run_cycle(&mut self) -> ScopeResult<CycleSummary> {
        if self.digesting {
            warn!("run_cycle called from inside a running cycle");
            return Err(ScopeError::CycleInProgress);
        }

        self.digesting = true;
        self.last_dirty.set(None);
        let outcome = self.converge();
        self.digesting = false;

        let purged = self.registry.borrow_mut().compact();
        if purged > 0 {
            trace!(purged, "removed disposed watchers");
        }

        outcome
    }

    fn converge(&mut self) -> ScopeResult<CycleSummary> {
        let ttl = self.config.ttl;
        let mut remaining = ttl;
        let mut summary = CycleSummary::default();
        debug!(watchers = self.watcher_count(), ttl, "digest cycle started");

        loop {
            summary.passes += 1;
            let dirty = self.digest_once(&mut summary);
            trace!(pass = summary.passes, dirty, watch_calls = summary.watch_calls, "digest pass finished");

            if !dirty {
                debug!(
                    passes = summary.passes,
                    watch_calls = summary.watch_calls,
                    listener_calls = summary.listener_calls,
                    failures = summary.evaluation_failures,
                    "digest cycle converged"
                );
                return Ok(summary);
            }

            remaining -= 1;
            if remaining == 0 {
                let last_dirty = self.last_dirty.get();
                error!(ttl, last_dirty = ?last_dirty, "digest did not converge");
                return Err(ScopeError::Nonconvergent { ttl, last_dirty });
            }
        }
    }
}

impl<S: Default> Default for Scope<S> {
    fn default() -> Self {
        Self::new(S::default())
    }
}

impl<S: fmt::Debug> fmt::Debug for Scope<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scope")
            .field("state", &self.state)
            .field("config", &self.config)
            .field("watchers", &self.watcher_count())
            .field("tombstones", &self.registry.borrow().tombstones())
            .field("digesting", &self.digesting)
            .finish_non_exhaustive()
    }
}
