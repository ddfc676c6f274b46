//! Equality policy used to decide whether a watcher is dirty.

use serde::{Deserialize, Serialize};

use crate::value::Value;

/// How a watcher compares a fresh result with its last observed value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EqualityMode {
    /// Identity: scalars by value, composites by handle. NaN equals NaN.
    #[default]
    Reference,
    /// Structural equality through lists and maps.
    Deep,
}

impl EqualityMode {
    /// Picks the mode from a `use_deep_equality` flag.
    #[must_use]
    pub const fn from_flag(deep: bool) -> Self {
        if deep {
            Self::Deep
        } else {
            Self::Reference
        }
    }

    /// True for [`EqualityMode::Deep`].
    #[must_use]
    pub const fn is_deep(self) -> bool {
        matches!(self, Self::Deep)
    }

    /// Compares two values under this mode.
    #[must_use]
    pub fn equal(self, new_value: &Value, old_value: &Value) -> bool {
        are_equal(new_value, old_value, self)
    }

    /// The form of `value` to keep as the last observed value.
    ///
    /// Deep watchers keep a detached copy, otherwise an in-place mutation of
    /// the watched structure would also mutate the stored snapshot and never
    /// register as a change.
    #[must_use]
    pub fn snapshot(self, value: &Value) -> Value {
        match self {
            Self::Reference => value.clone(),
            Self::Deep => value.deep_copy(),
        }
    }
}

/// Returns true when `new_value` and `old_value` are equal under `mode`.
#[must_use]
pub fn are_equal(new_value: &Value, old_value: &Value, mode: EqualityMode) -> bool {
    match mode {
        EqualityMode::Reference => new_value.same_ref(old_value),
        EqualityMode::Deep => new_value.deep_eq(old_value),
    }
}
