//! Values produced by watch functions.
//!
//! Watch results are a closed sum type. Scalars are plain values; lists and
//! maps are shared handles, so a composite has an identity (the handle) that
//! is distinct from its contents. Mutating a list in place keeps its identity
//! and changes its contents, which is exactly the difference between the
//! reference and deep equality policies.
//!
//! Because composites are shared handles, a list or map can contain itself.
//! Deep comparison and deep copy follow such cycles; `to_json` and `Display`
//! cut them off.

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::rc::Rc;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Shared, mutable list contents.
pub type SharedList = Rc<RefCell<Vec<Value>>>;

/// Shared, mutable map contents.
pub type SharedMap = Rc<RefCell<BTreeMap<String, Value>>>;

/// A value returned by a watch function.
///
/// # Examples
///
/// ```
/// use dirtyscope::Value;
///
/// let list = Value::list(vec![1.into(), 2.into()]);
/// let alias = list.clone();
///
/// alias.as_list().unwrap().borrow_mut().push(3.into());
///
/// assert!(list.same_ref(&alias));
/// assert_eq!(list.len(), Some(3));
/// ```
#[derive(Debug, Clone, Default)]
pub enum Value {
    /// Absence of a value (an unset field).
    #[default]
    Undefined,
    /// An explicit null.
    Null,
    /// Boolean value.
    Bool(bool),
    /// Numeric value; NaN is allowed and equals itself.
    Number(f64),
    /// String value.
    String(String),
    /// Shared list handle.
    List(SharedList),
    /// Shared map handle with ordered keys.
    Map(SharedMap),
}

impl Value {
    /// Wraps `items` in a fresh list handle.
    #[must_use]
    pub fn list(items: Vec<Value>) -> Self {
        Self::List(Rc::new(RefCell::new(items)))
    }

    /// Builds a fresh map handle from key/value pairs.
    #[must_use]
    pub fn map<K, I>(entries: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Value)>,
    {
        let map = entries.into_iter().map(|(k, v)| (k.into(), v)).collect();
        Self::Map(Rc::new(RefCell::new(map)))
    }

    /// True for `Undefined`.
    #[must_use]
    pub const fn is_undefined(&self) -> bool {
        matches!(self, Self::Undefined)
    }

    /// True for `Null`.
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// True for `Number(NaN)`.
    pub fn is_nan(&self) -> bool {
        matches!(self, Self::Number(n) if n.is_nan())
    }

    /// Returns the boolean, if this is one.
    #[must_use]
    pub const fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the number, if this is one.
    #[must_use]
    pub const fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the string contents, if this is a string.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(v) => Some(v),
            _ => None,
        }
    }

    /// Returns the list handle, if this is a list.
    #[must_use]
    pub const fn as_list(&self) -> Option<&SharedList> {
        match self {
            Self::List(v) => Some(v),
            _ => None,
        }
    }

    /// Returns the map handle, if this is a map.
    #[must_use]
    pub const fn as_map(&self) -> Option<&SharedMap> {
        match self {
            Self::Map(v) => Some(v),
            _ => None,
        }
    }

    /// Number of elements for composites, `None` for scalars.
    #[must_use]
    pub fn len(&self) -> Option<usize> {
        match self {
            Self::List(v) => Some(v.borrow().len()),
            Self::Map(v) => Some(v.borrow().len()),
            _ => None,
        }
    }

    /// Returns a human-readable type name.
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::Undefined => "undefined",
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Number(_) => "number",
            Self::String(_) => "string",
            Self::List(_) => "list",
            Self::Map(_) => "map",
        }
    }

    /// Identity comparison.
    ///
    /// Scalars compare by value (strings by content), composites by handle.
    /// NaN is the same as NaN.
    #[must_use]
    pub fn same_ref(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Undefined, Self::Undefined) | (Self::Null, Self::Null) => true,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Number(a), Self::Number(b)) => numbers_match(*a, *b),
            (Self::String(a), Self::String(b)) => a == b,
            (Self::List(a), Self::List(b)) => Rc::ptr_eq(a, b),
            (Self::Map(a), Self::Map(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }

    /// Structural comparison, recursing through lists and maps.
    ///
    /// A pair of handles met again while it is already being compared counts
    /// as equal, so self-referential structures compare without looping.
    #[must_use]
    pub fn deep_eq(&self, other: &Self) -> bool {
        self.deep_eq_in(other, &mut HashSet::new())
    }

    fn deep_eq_in(&self, other: &Self, seen: &mut HashSet<(HandlePtr, HandlePtr)>) -> bool {
        match (self, other) {
            (Self::List(a), Self::List(b)) => {
                if Rc::ptr_eq(a, b) || !seen.insert((handle_ptr(a), handle_ptr(b))) {
                    return true;
                }
                let (a, b) = (a.borrow(), b.borrow());
                a.len() == b.len() && a.iter().zip(b.iter()).all(|(x, y)| x.deep_eq_in(y, seen))
            }
            (Self::Map(a), Self::Map(b)) => {
                if Rc::ptr_eq(a, b) || !seen.insert((handle_ptr(a), handle_ptr(b))) {
                    return true;
                }
                let (a, b) = (a.borrow(), b.borrow());
                a.len() == b.len()
                    && a.iter()
                        .zip(b.iter())
                        .all(|((ka, va), (kb, vb))| ka == kb && va.deep_eq_in(vb, seen))
            }
            _ => self.same_ref(other),
        }
    }

    /// Copies the value with fresh handles at every level.
    ///
    /// The copy shares no storage with `self`, so later in-place mutation of
    /// the original is not visible through it. Handles that appear more than
    /// once (including cycles) are copied once and shared the same way in the
    /// copy. A cyclic copy is an `Rc` cycle and is never freed.
    #[must_use]
    pub fn deep_copy(&self) -> Self {
        self.deep_copy_in(&mut HashMap::new())
    }

    fn deep_copy_in(&self, copies: &mut HashMap<HandlePtr, Self>) -> Self {
        match self {
            Self::List(v) => {
                let key = handle_ptr(v);
                if let Some(copy) = copies.get(&key) {
                    return copy.clone();
                }
                let fresh: SharedList = Rc::new(RefCell::new(Vec::new()));
                copies.insert(key, Self::List(Rc::clone(&fresh)));
                let items: Vec<Self> = v.borrow().iter().map(|item| item.deep_copy_in(copies)).collect();
                *fresh.borrow_mut() = items;
                Self::List(fresh)
            }
            Self::Map(v) => {
                let key = handle_ptr(v);
                if let Some(copy) = copies.get(&key) {
                    return copy.clone();
                }
                let fresh: SharedMap = Rc::new(RefCell::new(BTreeMap::new()));
                copies.insert(key, Self::Map(Rc::clone(&fresh)));
                let entries: BTreeMap<String, Self> = v
                    .borrow()
                    .iter()
                    .map(|(k, item)| (k.clone(), item.deep_copy_in(copies)))
                    .collect();
                *fresh.borrow_mut() = entries;
                Self::Map(fresh)
            }
            scalar => scalar.clone(),
        }
    }

    /// Converts to JSON.
    ///
    /// `Undefined`, non-finite numbers, and a composite nested inside itself
    /// become `null`.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        self.to_json_in(&mut Vec::new())
    }

    fn to_json_in(&self, path: &mut Vec<HandlePtr>) -> serde_json::Value {
        match self {
            Self::Undefined | Self::Null => serde_json::Value::Null,
            Self::Bool(v) => serde_json::Value::Bool(*v),
            Self::Number(v) => number_to_json(*v),
            Self::String(v) => serde_json::Value::String(v.clone()),
            Self::List(v) => {
                let key = handle_ptr(v);
                if path.contains(&key) {
                    return serde_json::Value::Null;
                }
                path.push(key);
                let items = v.borrow().iter().map(|item| item.to_json_in(path)).collect();
                path.pop();
                serde_json::Value::Array(items)
            }
            Self::Map(v) => {
                let key = handle_ptr(v);
                if path.contains(&key) {
                    return serde_json::Value::Null;
                }
                path.push(key);
                let entries = v
                    .borrow()
                    .iter()
                    .map(|(k, item)| (k.clone(), item.to_json_in(path)))
                    .collect();
                path.pop();
                serde_json::Value::Object(entries)
            }
        }
    }

    fn write_in(&self, f: &mut fmt::Formatter<'_>, path: &mut Vec<HandlePtr>) -> fmt::Result {
        match self {
            Self::Undefined => write!(f, "undefined"),
            Self::Null => write!(f, "null"),
            Self::Bool(v) => write!(f, "{v}"),
            Self::Number(v) if v.is_nan() => write!(f, "NaN"),
            Self::Number(v) => write!(f, "{v}"),
            Self::String(v) => write!(f, "{v:?}"),
            Self::List(v) => {
                let key = handle_ptr(v);
                if path.contains(&key) {
                    return write!(f, "[...]");
                }
                path.push(key);
                write!(f, "[")?;
                for (i, item) in v.borrow().iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    item.write_in(f, path)?;
                }
                path.pop();
                write!(f, "]")
            }
            Self::Map(v) => {
                let key = handle_ptr(v);
                if path.contains(&key) {
                    return write!(f, "{{...}}");
                }
                path.push(key);
                write!(f, "{{")?;
                for (i, (k, item)) in v.borrow().iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{k:?}: ")?;
                    item.write_in(f, path)?;
                }
                path.pop();
                write!(f, "}}")
            }
        }
    }
}

/// Address of a composite's shared storage.
type HandlePtr = *const ();

fn handle_ptr<T>(handle: &Rc<RefCell<T>>) -> HandlePtr {
    Rc::as_ptr(handle).cast()
}

/// Integral values inside the exactly representable range stay integers.
#[allow(clippy::cast_possible_truncation)]
fn number_to_json(v: f64) -> serde_json::Value {
    const MAX_EXACT: f64 = 9_007_199_254_740_992.0;
    if v.fract() == 0.0 && v.abs() <= MAX_EXACT {
        serde_json::Value::from(v as i64)
    } else {
        serde_json::Number::from_f64(v).map_or(serde_json::Value::Null, serde_json::Value::Number)
    }
}

fn numbers_match(a: f64, b: f64) -> bool {
    a == b || (a.is_nan() && b.is_nan())
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_in(f, &mut Vec::new())
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        serde_json::Value::deserialize(deserializer).map(Self::from)
    }
}

// Convenient From implementations
impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Self::Number(f64::from(v))
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Self::Number(f64::from(v))
    }
}

impl From<i64> for Value {
    #[allow(clippy::cast_precision_loss)]
    fn from(v: i64) -> Self {
        Self::Number(v as f64)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Self::Number(f64::from(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Number(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::String(v.to_string())
    }
}

impl From<Vec<Value>> for Value {
    fn from(v: Vec<Value>) -> Self {
        Self::list(v)
    }
}

impl From<SharedList> for Value {
    fn from(v: SharedList) -> Self {
        Self::List(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Self::Undefined, Into::into)
    }
}

impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        match v {
            serde_json::Value::Null => Self::Null,
            serde_json::Value::Bool(b) => Self::Bool(b),
            serde_json::Value::Number(n) => Self::Number(n.as_f64().unwrap_or(f64::NAN)),
            serde_json::Value::String(s) => Self::String(s),
            serde_json::Value::Array(items) => Self::list(items.into_iter().map(Self::from).collect()),
            serde_json::Value::Object(map) => Self::map(map.into_iter().map(|(k, v)| (k, Self::from(v)))),
        }
    }
}
