//! Priority queue family: strict ordering, caller-supplied priorities, and
//! function-computed priorities with full recompute on function swap.
//!
//! All three keep their elements in an ascending sorted `Vec`, so `front`
//! (maximum) and `back` (minimum) are always exact. Duplicates are allowed.
#![forbid(unsafe_code)]

use std::cmp::Ordering;

/// Strict priority queue: ordering is intrinsic to the stored value.
#[derive(Clone, Debug, Default)]
pub struct OrdQueue<T: Ord> {
    items: Vec<T>,
}

impl<T: Ord> OrdQueue<T> {
    pub fn new() -> Self {
        Self { items: Vec::new() }
    }

    pub fn insert(&mut self, value: T) {
        let at = self.items.partition_point(|v| *v <= value);
        self.items.insert(at, value);
    }

    /// Highest-ordered element.
    pub fn front(&self) -> Option<&T> {
        self.items.last()
    }

    /// Lowest-ordered element.
    pub fn back(&self) -> Option<&T> {
        self.items.first()
    }

    pub fn pop_front(&mut self) -> Option<T> {
        self.items.pop()
    }

    pub fn pop_back(&mut self) -> Option<T> {
        if self.items.is_empty() {
            None
        } else {
            Some(self.items.remove(0))
        }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }
}

/// Queue of values wrapped with a caller-supplied priority at insertion time.
#[derive(Clone, Debug, Default)]
pub struct KeyedQueue<T> {
    // Ascending by priority; ties keep insertion order.
    items: Vec<(f32, T)>,
}

impl<T> KeyedQueue<T> {
    pub fn new() -> Self {
        Self { items: Vec::new() }
    }

    pub fn insert(&mut self, value: T, priority: f32) {
        let at = self
            .items
            .partition_point(|(p, _)| p.total_cmp(&priority) != Ordering::Greater);
        self.items.insert(at, (priority, value));
    }

    /// Highest-priority element.
    pub fn front(&self) -> Option<(&T, f32)> {
        self.items.last().map(|(p, v)| (v, *p))
    }

    /// Lowest-priority element.
    pub fn back(&self) -> Option<(&T, f32)> {
        self.items.first().map(|(p, v)| (v, *p))
    }

    pub fn pop_front(&mut self) -> Option<(T, f32)> {
        self.items.pop().map(|(p, v)| (v, p))
    }

    pub fn pop_back(&mut self) -> Option<(T, f32)> {
        if self.items.is_empty() {
            None
        } else {
            let (p, v) = self.items.remove(0);
            Some((v, p))
        }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Elements in ascending priority order (lowest first).
    pub fn iter(&self) -> impl Iterator<Item = (&T, f32)> {
        self.items.iter().map(|(p, v)| (v, *p))
    }

    fn drain_all(&mut self) -> Vec<(f32, T)> {
        std::mem::take(&mut self.items)
    }
}

pub type PriorityFn<T> = Box<dyn Fn(&T) -> f32 + Send + Sync>;

/// Queue whose priorities come from an injected function, evaluated at
/// insertion time. Swapping the function recomputes and reinserts every
/// element, so `front`/`back` stay consistent with the new ordering.
pub struct ComputedQueue<T> {
    inner: KeyedQueue<T>,
    priority_fn: PriorityFn<T>,
}

impl<T> ComputedQueue<T> {
    pub fn new(priority_fn: PriorityFn<T>) -> Self {
        Self {
            inner: KeyedQueue::new(),
            priority_fn,
        }
    }

    pub fn insert(&mut self, value: T) {
        let priority = (self.priority_fn)(&value);
        self.inner.insert(value, priority);
    }

    /// What the current function would score `value` at, without inserting.
    pub fn priority_of(&self, value: &T) -> f32 {
        (self.priority_fn)(value)
    }

    /// Replaces the governing function and recomputes every element's
    /// priority. Skipping the recompute would leave stale orderings behind.
    pub fn set_priority_fn(&mut self, priority_fn: PriorityFn<T>) {
        self.priority_fn = priority_fn;
        let old = self.inner.drain_all();
        for (_, value) in old {
            self.insert(value);
        }
    }

    pub fn front(&self) -> Option<(&T, f32)> {
        self.inner.front()
    }

    pub fn back(&self) -> Option<(&T, f32)> {
        self.inner.back()
    }

    pub fn pop_front(&mut self) -> Option<(T, f32)> {
        self.inner.pop_front()
    }

    pub fn pop_back(&mut self) -> Option<(T, f32)> {
        self.inner.pop_back()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Elements in ascending priority order (lowest first).
    pub fn iter(&self) -> impl Iterator<Item = (&T, f32)> {
        self.inner.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ord_queue_orders_with_duplicates() {
        let mut q = OrdQueue::new();
        for v in [5, 1, 3, 3, 9, 1] {
            q.insert(v);
        }
        assert_eq!(q.len(), 6);
        assert_eq!(q.front(), Some(&9));
        assert_eq!(q.back(), Some(&1));
        assert_eq!(q.pop_back(), Some(1));
        assert_eq!(q.pop_back(), Some(1));
        assert_eq!(q.pop_front(), Some(9));
        assert_eq!(q.pop_front(), Some(5));
        assert_eq!(q.pop_front(), Some(3));
        assert_eq!(q.pop_front(), Some(3));
        assert!(q.is_empty());
        assert_eq!(q.pop_front(), None);
    }

    #[test]
    fn keyed_queue_tracks_external_priorities() {
        let mut q = KeyedQueue::new();
        q.insert("mid", 2.0);
        q.insert("far", 9.0);
        q.insert("near", 0.5);
        assert_eq!(q.front(), Some((&"far", 9.0)));
        assert_eq!(q.back(), Some((&"near", 0.5)));
        let ordered: Vec<&str> = q.iter().map(|(v, _)| *v).collect();
        assert_eq!(ordered, vec!["near", "mid", "far"]);
        assert_eq!(q.pop_back(), Some(("near", 0.5)));
        assert_eq!(q.pop_front(), Some(("far", 9.0)));
        assert_eq!(q.pop_front(), Some(("mid", 2.0)));
        assert!(q.is_empty());
    }

    #[test]
    fn keyed_queue_ties_keep_insertion_order() {
        let mut q = KeyedQueue::new();
        q.insert("a", 1.0);
        q.insert("b", 1.0);
        q.insert("c", 1.0);
        assert_eq!(q.pop_back(), Some(("a", 1.0)));
        assert_eq!(q.pop_back(), Some(("b", 1.0)));
        assert_eq!(q.pop_back(), Some(("c", 1.0)));
    }

    #[test]
    fn computed_queue_recomputes_on_function_swap() {
        let mut q: ComputedQueue<i32> = ComputedQueue::new(Box::new(|v| *v as f32));
        for v in [4, -2, 7, 0] {
            q.insert(v);
        }
        assert_eq!(q.front().map(|(v, _)| *v), Some(7));
        assert_eq!(q.back().map(|(v, _)| *v), Some(-2));

        // Invert the ordering; every element must be reinserted under it.
        q.set_priority_fn(Box::new(|v| -(*v as f32)));
        assert_eq!(q.len(), 4);
        assert_eq!(q.front().map(|(v, _)| *v), Some(-2));
        assert_eq!(q.back().map(|(v, _)| *v), Some(7));
        assert_eq!(q.front().map(|(_, p)| p), Some(2.0));
    }

    #[test]
    fn computed_queue_scores_at_insert_time() {
        let mut q: ComputedQueue<i32> = ComputedQueue::new(Box::new(|v| (*v % 10) as f32));
        q.insert(12);
        q.insert(31);
        assert_eq!(q.pop_back(), Some((31, 1.0)));
        assert_eq!(q.pop_back(), Some((12, 2.0)));
    }
}
