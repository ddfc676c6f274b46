//! # dirtyscope - dirty-checking change detection
//!
//! A host registers *watch functions* (reads over a shared state container)
//! paired with *listeners*. Running a digest cycle re-evaluates every watch
//! function, compares each result with the value seen last time, calls the
//! listener of every watcher whose value changed, and repeats until a whole
//! pass sees no change.
//!
//! ## Core Concepts
//!
//! - **Scope**: the state container plus the ordered watcher registry
//! - **Watcher**: a watch function, an optional listener, the last observed value, and an equality mode
//! - **Pass**: one evaluation of every live watcher, newest first
//! - **Cycle**: passes repeated until one is clean, or the dirty-pass budget runs out
//!
//! There is no dependency tracking: every watch function runs on every pass
//! until the short-circuit marker proves the rest of the pass clean.
//!
//! ## Usage
//!
//! ```rust
//! use dirtyscope::{Scope, Value};
//!
//! #[derive(Default)]
//! struct Form {
//!     name: String,
//!     name_upper: Option<String>,
//!     initial: Option<String>,
//! }
//!
//! let mut scope = Scope::new(Form::default());
//!
//! scope.watch(
//!     |s: &Scope<Form>| Ok(Value::from(s.state().name_upper.clone())),
//!     |new, _old, s| {
//!         if let Some(first) = new.as_str().and_then(|upper| upper.chars().next()) {
//!             s.state_mut().initial = Some(format!("{first}."));
//!         }
//!         Ok(())
//!     },
//! );
//! scope.watch(
//!     |s: &Scope<Form>| Ok(Value::from(s.state().name.as_str())),
//!     |new, _old, s| {
//!         s.state_mut().name_upper = new.as_str().map(str::to_uppercase);
//!         Ok(())
//!     },
//! );
//!
//! scope.state_mut().name = "Jane".to_string();
//! scope.run_cycle()?;
//! assert_eq!(scope.state().initial.as_deref(), Some("J."));
//! # Ok::<(), dirtyscope::ScopeError>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod equality;
pub mod error;
pub mod scope;
pub mod value;

// Re-export primary types at crate root for convenience
pub use config::{ScopeConfig, DEFAULT_TTL};
pub use equality::{are_equal, EqualityMode};
pub use error::{ConfigError, EvaluationError, EvaluationStage, ScopeError, ScopeResult};
pub use scope::{CycleSummary, Disposer, ListenerFn, Registration, Scope, WatchFn, WatcherId};
pub use value::{SharedList, SharedMap, Value};
