//! Fill-if-empty mutation.
//!
//! Derived preparation must never overwrite a value that a record sets
//! explicitly, and running it twice must be a no-op. Presence is decided by
//! [`Absent`] instead of truthiness, so `Some(0)` counts as set.

use std::collections::{BTreeMap, BTreeSet};

use crate::formula::Formula;

/// A slot that can be "unset".
pub trait Absent {
    fn is_absent(&self) -> bool;
}

impl<T> Absent for Option<T> {
    fn is_absent(&self) -> bool {
        self.is_none()
    }
}

impl<T> Absent for Vec<T> {
    fn is_absent(&self) -> bool {
        self.is_empty()
    }
}

impl<T> Absent for BTreeSet<T> {
    fn is_absent(&self) -> bool {
        self.is_empty()
    }
}

impl<K, V> Absent for BTreeMap<K, V> {
    fn is_absent(&self) -> bool {
        self.is_empty()
    }
}

impl Absent for String {
    fn is_absent(&self) -> bool {
        self.is_empty()
    }
}

impl Absent for Formula {
    fn is_absent(&self) -> bool {
        self.is_empty()
    }
}

/// Writes `fill()` into `slot` only when the slot is absent.
///
/// Returns `true` when the slot now holds a value it did not hold before.
/// The closure is not called for a slot that is already set.
pub fn set_if_absent<T: Absent>(slot: &mut T, fill: impl FnOnce() -> T) -> bool {
    if !slot.is_absent() {
        return false;
    }
    *slot = fill();
    !slot.is_absent()
}
