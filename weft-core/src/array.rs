//! Observed Array
//!
//! `Array` is the sequence-shaped container of the value model. Index
//! reads are not intercepted; instead the seven mutators route through a
//! mutation table the observer swaps when the array is attached. The
//! plain table just edits the vector. The observed table additionally
//! observes inserted elements and notifies the array's dep, so a watcher
//! that registered on the array (through a tracked property read or
//! [`traverse`](crate::traverse)) reruns after `push`, `pop`, `shift`,
//! `unshift`, `splice`, `sort_by` and `reverse`.
//!
//! # Thread Safety
//!
//! Elements live behind an `RwLock`. No lock is held while a sort
//! comparator or a notified subscriber runs.

use std::cmp::Ordering as CmpOrdering;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock, Weak};

use parking_lot::RwLock;

use crate::context;
use crate::observer::Observer;
use crate::value::Value;

/// Dispatch table for the intercepted mutators.
///
/// Two implementations exist: the plain one every array starts with, and
/// the observing one installed when an observer attaches. Swapping the
/// table converts every mutation on the handle at once, which is what
/// keeps late subscribers correct without re-wrapping the methods.
pub(crate) trait MutationTable: Send + Sync {
    fn push(&self, target: &Array, items: Vec<Value>) -> usize;
    fn pop(&self, target: &Array) -> Option<Value>;
    fn shift(&self, target: &Array) -> Option<Value>;
    fn unshift(&self, target: &Array, items: Vec<Value>) -> usize;
    fn splice(
        &self,
        target: &Array,
        start: usize,
        delete_count: usize,
        items: Vec<Value>,
    ) -> Vec<Value>;
    fn sort_by(&self, target: &Array, compare: &mut dyn FnMut(&Value, &Value) -> CmpOrdering);
    fn reverse(&self, target: &Array);
}

struct PlainTable;
struct ObservedTable;

static PLAIN_TABLE: PlainTable = PlainTable;
static OBSERVED_TABLE: ObservedTable = ObservedTable;

impl MutationTable for PlainTable {
    fn push(&self, target: &Array, items: Vec<Value>) -> usize {
        let mut storage = target.inner.items.write();
        storage.extend(items);
        storage.len()
    }

    fn pop(&self, target: &Array) -> Option<Value> {
        target.inner.items.write().pop()
    }

    fn shift(&self, target: &Array) -> Option<Value> {
        let mut storage = target.inner.items.write();
        if storage.is_empty() {
            None
        } else {
            Some(storage.remove(0))
        }
    }

    fn unshift(&self, target: &Array, items: Vec<Value>) -> usize {
        let mut storage = target.inner.items.write();
        storage.splice(0..0, items);
        storage.len()
    }

    fn splice(
        &self,
        target: &Array,
        start: usize,
        delete_count: usize,
        items: Vec<Value>,
    ) -> Vec<Value> {
        let mut storage = target.inner.items.write();
        let start = start.min(storage.len());
        let end = start + delete_count.min(storage.len() - start);
        storage.splice(start..end, items).collect()
    }

    fn sort_by(&self, target: &Array, compare: &mut dyn FnMut(&Value, &Value) -> CmpOrdering) {
        // The comparator is user code and may read tracked state, so it
        // must not run under the storage lock.
        let mut detached = std::mem::take(&mut *target.inner.items.write());
        detached.sort_by(|a, b| compare(a, b));
        *target.inner.items.write() = detached;
    }

    fn reverse(&self, target: &Array) {
        target.inner.items.write().reverse();
    }
}

impl ObservedTable {
    /// Observe what the mutation inserted, then notify. Runs after the
    /// storage lock is released.
    fn finish(&self, target: &Array, inserted: &[Value]) {
        if let Some(observer) = target.observer() {
            observer.observe_items(inserted);
            observer.dep().notify();
        }
    }
}

impl MutationTable for ObservedTable {
    fn push(&self, target: &Array, items: Vec<Value>) -> usize {
        let length = PLAIN_TABLE.push(target, items.clone());
        self.finish(target, &items);
        length
    }

    fn pop(&self, target: &Array) -> Option<Value> {
        let removed = PLAIN_TABLE.pop(target);
        self.finish(target, &[]);
        removed
    }

    fn shift(&self, target: &Array) -> Option<Value> {
        let removed = PLAIN_TABLE.shift(target);
        self.finish(target, &[]);
        removed
    }

    fn unshift(&self, target: &Array, items: Vec<Value>) -> usize {
        let length = PLAIN_TABLE.unshift(target, items.clone());
        self.finish(target, &items);
        length
    }

    fn splice(
        &self,
        target: &Array,
        start: usize,
        delete_count: usize,
        items: Vec<Value>,
    ) -> Vec<Value> {
        let removed = PLAIN_TABLE.splice(target, start, delete_count, items.clone());
        self.finish(target, &items);
        removed
    }

    fn sort_by(&self, target: &Array, compare: &mut dyn FnMut(&Value, &Value) -> CmpOrdering) {
        PLAIN_TABLE.sort_by(target, compare);
        self.finish(target, &[]);
    }

    fn reverse(&self, target: &Array) {
        PLAIN_TABLE.reverse(target);
        self.finish(target, &[]);
    }
}

pub(crate) struct ArrayInner {
    items: RwLock<Vec<Value>>,
    observer: OnceLock<Arc<Observer>>,
    table: RwLock<&'static dyn MutationTable>,
    extensible: AtomicBool,
}

/// Shared handle to an observation-capable array.
#[derive(Clone)]
pub struct Array {
    inner: Arc<ArrayInner>,
}

impl Array {
    /// Create a new, empty array.
    pub fn new() -> Self {
        Self::from_vec(Vec::new())
    }

    /// Create an array holding `items`.
    pub fn from_vec(items: Vec<Value>) -> Self {
        Self {
            inner: Arc::new(ArrayInner {
                items: RwLock::new(items),
                observer: OnceLock::new(),
                table: RwLock::new(&PLAIN_TABLE),
                extensible: AtomicBool::new(true),
            }),
        }
    }

    /// Identity comparison: do both handles alias the same storage?
    pub fn ptr_eq(&self, other: &Array) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    pub(crate) fn downgrade(&self) -> Weak<ArrayInner> {
        Arc::downgrade(&self.inner)
    }

    pub(crate) fn from_inner(inner: Arc<ArrayInner>) -> Self {
        Self { inner }
    }

    /// The observer attached to this array, if any.
    pub fn observer(&self) -> Option<Arc<Observer>> {
        self.inner.observer.get().cloned()
    }

    /// Install `observer` as this array's marker. Set exactly once; an
    /// already-installed observer is returned instead.
    pub(crate) fn install_observer(&self, observer: Arc<Observer>) -> Option<Arc<Observer>> {
        if self.inner.observer.set(observer).is_ok() {
            None
        } else {
            self.inner.observer.get().cloned()
        }
    }

    /// Route mutators through the observing table from now on.
    pub(crate) fn rebind_mutations(&self) {
        *self.inner.table.write() = &OBSERVED_TABLE;
    }

    /// Forbid observation of this array.
    pub fn prevent_extensions(&self) {
        self.inner.extensible.store(false, Ordering::Relaxed);
    }

    pub fn is_extensible(&self) -> bool {
        self.inner.extensible.load(Ordering::Relaxed)
    }

    fn table(&self) -> &'static dyn MutationTable {
        *self.inner.table.read()
    }

    /// Register the active subscriber on this array's dep, if any side of
    /// that exists.
    fn track_self(&self) {
        if context::is_tracking() {
            if let Some(observer) = self.observer() {
                observer.dep().depend();
            }
        }
    }

    /// Element count. Tracked read.
    pub fn len(&self) -> usize {
        self.track_self();
        self.inner.items.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The element at `index`. Tracked read.
    pub fn get(&self, index: usize) -> Option<Value> {
        self.track_self();
        self.inner.items.read().get(index).cloned()
    }

    /// Snapshot of all elements. Tracked read.
    pub fn to_vec(&self) -> Vec<Value> {
        self.track_self();
        self.inner.items.read().clone()
    }

    /// Snapshot without dependency registration.
    pub(crate) fn raw_snapshot(&self) -> Vec<Value> {
        self.inner.items.read().clone()
    }

    /// Append one element; returns the new length.
    pub fn push(&self, value: impl Into<Value>) -> usize {
        self.table().push(self, vec![value.into()])
    }

    /// Remove and return the last element.
    pub fn pop(&self) -> Option<Value> {
        self.table().pop(self)
    }

    /// Remove and return the first element.
    pub fn shift(&self) -> Option<Value> {
        self.table().shift(self)
    }

    /// Prepend one element; returns the new length.
    pub fn unshift(&self, value: impl Into<Value>) -> usize {
        self.table().unshift(self, vec![value.into()])
    }

    /// Remove `delete_count` elements at `start`, inserting `items` in
    /// their place; returns the removed elements. Out-of-range `start`
    /// and `delete_count` are clamped.
    pub fn splice(&self, start: usize, delete_count: usize, items: Vec<Value>) -> Vec<Value> {
        self.table().splice(self, start, delete_count, items)
    }

    /// Sort in place by `compare`.
    pub fn sort_by<F>(&self, mut compare: F)
    where
        F: FnMut(&Value, &Value) -> CmpOrdering,
    {
        self.table().sort_by(self, &mut compare);
    }

    /// Reverse in place.
    pub fn reverse(&self) {
        self.table().reverse(self);
    }

    /// Extend with `Null` up to `len` elements. Raw path: shorter targets
    /// grow silently, longer ones are left alone.
    pub(crate) fn grow_to(&self, len: usize) {
        let mut storage = self.inner.items.write();
        if storage.len() < len {
            storage.resize(len, Value::Null);
        }
    }
}

impl Default for Array {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Vec<Value>> for Array {
    fn from(items: Vec<Value>) -> Self {
        Self::from_vec(items)
    }
}

impl FromIterator<Value> for Array {
    fn from_iter<I: IntoIterator<Item = Value>>(iter: I) -> Self {
        Self::from_vec(iter.into_iter().collect())
    }
}

impl fmt::Debug for Array {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.raw_snapshot().iter()).finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_and_pop_round_trip() {
        let array = Array::new();
        assert_eq!(array.push(1.0), 1);
        assert_eq!(array.push(2.0), 2);

        assert_eq!(array.pop().unwrap().as_f64(), Some(2.0));
        assert_eq!(array.pop().unwrap().as_f64(), Some(1.0));
        assert!(array.pop().is_none());
    }

    #[test]
    fn shift_and_unshift_work_at_the_front() {
        let array = Array::from_vec(vec![Value::from(2.0)]);
        assert_eq!(array.unshift(1.0), 2);

        assert_eq!(array.shift().unwrap().as_f64(), Some(1.0));
        assert_eq!(array.shift().unwrap().as_f64(), Some(2.0));
        assert!(array.shift().is_none());
    }

    #[test]
    fn splice_removes_and_inserts() {
        let array = Array::from_vec(vec![
            Value::from(1.0),
            Value::from(2.0),
            Value::from(3.0),
        ]);

        let removed = array.splice(1, 1, vec![Value::from(9.0), Value::from(8.0)]);
        assert_eq!(removed.len(), 1);
        assert_eq!(removed[0].as_f64(), Some(2.0));

        let items = array.to_vec();
        let snapshot: Vec<_> = items.iter().map(|v| v.as_f64().unwrap()).collect();
        assert_eq!(snapshot, vec![1.0, 9.0, 8.0, 3.0]);
    }

    #[test]
    fn splice_clamps_out_of_range_arguments() {
        let array = Array::from_vec(vec![Value::from(1.0), Value::from(2.0)]);

        let removed = array.splice(10, 5, vec![Value::from(3.0)]);
        assert!(removed.is_empty());
        assert_eq!(array.len(), 3);
        assert_eq!(array.get(2).unwrap().as_f64(), Some(3.0));

        let removed = array.splice(1, 99, vec![]);
        assert_eq!(removed.len(), 2);
        assert_eq!(array.len(), 1);
    }

    #[test]
    fn sort_by_orders_elements() {
        let array = Array::from_vec(vec![
            Value::from(3.0),
            Value::from(1.0),
            Value::from(2.0),
        ]);

        array.sort_by(|a, b| a.as_f64().partial_cmp(&b.as_f64()).unwrap());

        let items = array.to_vec();
        let snapshot: Vec<_> = items.iter().map(|v| v.as_f64().unwrap()).collect();
        assert_eq!(snapshot, vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn reverse_flips_order() {
        let array = Array::from_vec(vec![Value::from(1.0), Value::from(2.0)]);
        array.reverse();

        assert_eq!(array.get(0).unwrap().as_f64(), Some(2.0));
        assert_eq!(array.get(1).unwrap().as_f64(), Some(1.0));
    }

    #[test]
    fn grow_to_fills_with_null() {
        let array = Array::from_vec(vec![Value::from(1.0)]);
        array.grow_to(3);

        assert_eq!(array.len(), 3);
        assert!(array.get(1).unwrap().is_null());
        assert!(array.get(2).unwrap().is_null());

        array.grow_to(2);
        assert_eq!(array.len(), 3);
    }

    #[test]
    fn clone_shares_storage() {
        let array = Array::new();
        let alias = array.clone();

        array.push(1.0);
        assert_eq!(alias.len(), 1);
        assert!(array.ptr_eq(&alias));
        assert!(!array.ptr_eq(&Array::new()));
    }

    #[test]
    fn collects_from_iterator() {
        let array: Array = (1..=3).map(|n| Value::from(n as f64)).collect();
        assert_eq!(array.len(), 3);
        assert_eq!(array.get(2).unwrap().as_f64(), Some(3.0));
    }
}
