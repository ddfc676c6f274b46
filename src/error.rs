//! Error types for dirtyscope.
//!
//! Engine errors are strongly typed using thiserror. Callback authors report
//! their own failures through `anyhow`, which the engine wraps in an
//! [`EvaluationError`] before logging it.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::scope::WatcherId;

/// Which half of a watcher failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvaluationStage {
    /// The watch function.
    Watch,
    /// The listener function.
    Listener,
}

impl fmt::Display for EvaluationStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Watch => write!(f, "watch function"),
            Self::Listener => write!(f, "listener"),
        }
    }
}

/// A watch or listener function failed during a pass.
///
/// These are recovered inside the pass: logged, counted in the cycle
/// summary, and never returned from `run_cycle`.
#[derive(Debug, Error)]
#[error("{stage} of watcher {watcher} failed: {source}")]
pub struct EvaluationError {
    /// The failing watcher.
    pub watcher: WatcherId,
    /// Whether the watch function or the listener failed.
    pub stage: EvaluationStage,
    /// The callback's own error.
    #[source]
    pub source: anyhow::Error,
}

/// Configuration errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A zero dirty-pass budget could never run a pass.
    #[error("ttl must be at least 1")]
    ZeroTtl,

    /// The configuration document could not be decoded.
    #[error("Failed to parse configuration: {message}")]
    Parse {
        /// Decoder message.
        message: String,
    },
}

/// Top-level error type for dirtyscope.
#[derive(Debug, Error)]
pub enum ScopeError {
    /// Every pass in the budget was dirty.
    #[error("{ttl} digest iterations reached")]
    Nonconvergent {
        /// The dirty-pass budget that ran out.
        ttl: usize,
        /// The watcher that was dirty on the final pass.
        last_dirty: Option<WatcherId>,
    },

    /// `run_cycle` was called from inside a running cycle.
    #[error("A digest cycle is already in progress")]
    CycleInProgress,

    /// Invalid configuration.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl ScopeError {
    /// Returns true if this is a runaway digest.
    #[must_use]
    pub const fn is_nonconvergent(&self) -> bool {
        matches!(self, Self::Nonconvergent { .. })
    }

    /// Returns true if `run_cycle` was entered from inside a running cycle.
    #[must_use]
    pub const fn is_reentrant(&self) -> bool {
        matches!(self, Self::CycleInProgress)
    }

    /// Returns true if this is a configuration error.
    #[must_use]
    pub const fn is_config(&self) -> bool {
        matches!(self, Self::Config(_))
    }
}

/// Result type alias for dirtyscope operations.
pub type ScopeResult<T> = Result<T, ScopeError>;
