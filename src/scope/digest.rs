//! One evaluation pass over the registry.

use std::any::Any;
use std::ops::ControlFlow;
use std::panic::{self, AssertUnwindSafe};

use serde::{Deserialize, Serialize};

use crate::error::{EvaluationError, EvaluationStage};

use super::watcher::Watcher;
use super::Scope;

/// Counters for one `run_cycle` call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CycleSummary {
    /// Passes run, including the final clean one.
    pub passes: usize,
    /// Watch function invocations.
    pub watch_calls: usize,
    /// Changes detected (listener invocations, whether or not one is set).
    pub listener_calls: usize,
    /// Watch or listener functions that returned an error or panicked.
    pub evaluation_failures: usize,
}

impl CycleSummary {
    /// True when at least one watcher changed during the cycle.
    #[must_use]
    pub const fn changed(&self) -> bool {
        self.listener_calls > 0
    }
}

enum Evaluation {
    Changed,
    Unchanged,
    /// The watch function failed or panicked; the watcher counts as clean.
    Failed,
    /// The watcher was disposed by its own watch function.
    Removed,
}

impl<S> Scope<S> {
    /// Evaluates every live watcher once, newest first.
    ///
    /// Returns true when the pass was dirty: some watcher changed, or a new
    /// watcher was registered while the pass ran.
    pub(crate) fn digest_once(&mut self, summary: &mut CycleSummary) -> bool {
        let registrations = self.registrations.get();
        let watchers = self.registry.borrow().live();
        let mut dirty = false;

        for watcher in &watchers {
            if self.step(watcher, &mut dirty, summary).is_break() {
                break;
            }
        }

        dirty || self.registrations.get() != registrations
    }

    fn step(&mut self, watcher: &Watcher<S>, dirty: &mut bool, summary: &mut CycleSummary) -> ControlFlow<()> {
        // Disposed earlier in this pass.
        if !watcher.is_live() {
            return ControlFlow::Continue(());
        }

        match self.evaluate(watcher, summary) {
            Evaluation::Changed => {
                *dirty = true;
                ControlFlow::Continue(())
            }
            // Everything after the last dirty watcher was clean on the
            // previous pass and nothing has changed since.
            Evaluation::Unchanged if self.last_dirty.get() == Some(watcher.id) => ControlFlow::Break(()),
            Evaluation::Unchanged | Evaluation::Failed | Evaluation::Removed => ControlFlow::Continue(()),
        }
    }

    fn evaluate(&mut self, watcher: &Watcher<S>, summary: &mut CycleSummary) -> Evaluation {
        summary.watch_calls += 1;
        let new_value = match isolate(|| watcher.read(self)) {
            Ok(value) => value,
            Err(source) => {
                self.report(watcher, EvaluationStage::Watch, source, summary);
                return Evaluation::Failed;
            }
        };

        if !watcher.is_live() {
            return Evaluation::Removed;
        }

        let unchanged = watcher
            .last
            .borrow()
            .as_ref()
            .is_some_and(|old| watcher.equality.equal(&new_value, old));
        if unchanged {
            return Evaluation::Unchanged;
        }

        self.last_dirty.set(Some(watcher.id));
        let previous = watcher.last.replace(Some(watcher.equality.snapshot(&new_value)));
        let old_value = previous.unwrap_or_else(|| new_value.clone());

        summary.listener_calls += 1;
        if let Err(source) = isolate(|| watcher.notify(&new_value, &old_value, self)) {
            self.report(watcher, EvaluationStage::Listener, source, summary);
        }

        Evaluation::Changed
    }

    fn report(&self, watcher: &Watcher<S>, stage: EvaluationStage, source: anyhow::Error, summary: &mut CycleSummary) {
        summary.evaluation_failures += 1;
        let err = EvaluationError {
            watcher: watcher.id,
            stage,
            source,
        };
        tracing::warn!(watcher = %err.watcher, stage = %err.stage, error = %err.source, "{err}");
    }
}

/// Runs a user callback, turning a panic into an ordinary failure.
fn isolate<T>(callback: impl FnOnce() -> anyhow::Result<T>) -> anyhow::Result<T> {
    panic::catch_unwind(AssertUnwindSafe(callback)).unwrap_or_else(|payload| Err(panic_error(&*payload)))
}

fn panic_error(payload: &(dyn Any + Send)) -> anyhow::Error {
    let message = payload
        .downcast_ref::<&str>()
        .map(|msg| (*msg).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "non-string payload".to_string());
    anyhow::anyhow!("panicked: {message}")
}
