//! Decrease-only keyed priority queue.
//!
//! A binary min-heap with a key → position map, so that `decrease` runs in
//! logarithmic time without scanning. Entries are ordered by a caller
//! supplied monotone transform of their value; the traversal passes
//! `Reverse` so that the latest departure comes out first and "unreachable"
//! comes out last.
//!
//! Updates only ever improve an entry. Combined with min-extraction this
//! means an extracted value is the best the queue has seen for its key.

use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;

/// Contract violations. These indicate a bug in the caller.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QueueError {
    /// `insert` on a key that is already queued
    #[error("key {0} is already queued")]
    DuplicateKey(String),

    /// `decrease` on a key that is not queued
    #[error("key {0} is not queued")]
    MissingKey(String),
}

#[derive(Debug, Clone)]
struct Entry<K, V, O> {
    key: K,
    value: V,
    order: O,
    /// Insertion sequence, breaks ties between equal orders.
    seq: u64,
}

impl<K, V, O: Ord> Entry<K, V, O> {
    fn precedes(&self, other: &Self) -> bool {
        (&self.order, self.seq) < (&other.order, other.seq)
    }
}

/// Keyed min-priority queue supporting improve-only updates.
///
/// # Examples
///
/// ```
/// use std::cmp::Reverse;
/// use latest_departure::traversal::DecreaseQueue;
///
/// let mut queue = DecreaseQueue::new(|v: &u32| Reverse(*v));
/// queue.insert("a", 10).unwrap();
/// queue.insert("b", 20).unwrap();
///
/// assert_eq!(queue.peek(), Some((&"b", &20)));
/// assert!(queue.decrease(&"a", 30).unwrap());
/// assert!(!queue.decrease(&"b", 5).unwrap());
/// assert_eq!(queue.extract_min(), Some(("a", 30)));
/// ```
pub struct DecreaseQueue<K, V, O, F>
where
    F: Fn(&V) -> O,
{
    heap: Vec<Entry<K, V, O>>,
    positions: HashMap<K, usize>,
    order_of: F,
    next_seq: u64,
}

impl<K, V, O, F> DecreaseQueue<K, V, O, F>
where
    K: Hash + Eq + Clone + Debug,
    O: Ord,
    F: Fn(&V) -> O,
{
    /// Create an empty queue ordered by `order_of(value)`, smallest first.
    pub fn new(order_of: F) -> Self {
        Self::with_capacity(order_of, 0)
    }

    /// Create an empty queue with room for `capacity` entries.
    pub fn with_capacity(order_of: F, capacity: usize) -> Self {
        Self {
            heap: Vec::with_capacity(capacity),
            positions: HashMap::with_capacity(capacity),
            order_of,
            next_seq: 0,
        }
    }

    /// Number of queued keys.
    pub fn len(&self) -> usize {
        self.heap.len()
    }

    /// True when no keys are queued.
    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Current value for a queued key.
    pub fn value(&self, key: &K) -> Option<&V> {
        self.positions.get(key).map(|&pos| &self.heap[pos].value)
    }

    /// Insert a new key. Fails if the key is already queued.
    pub fn insert(&mut self, key: K, value: V) -> Result<(), QueueError> {
        if self.positions.contains_key(&key) {
            return Err(QueueError::DuplicateKey(format!("{key:?}")));
        }

        let order = (self.order_of)(&value);
        let pos = self.heap.len();
        self.positions.insert(key.clone(), pos);
        self.heap.push(Entry {
            key,
            value,
            order,
            seq: self.next_seq,
        });
        self.next_seq += 1;
        self.sift_up(pos);
        Ok(())
    }

    /// The minimum-ordered entry, if any.
    pub fn peek(&self) -> Option<(&K, &V)> {
        self.heap.first().map(|e| (&e.key, &e.value))
    }

    /// Remove and return the minimum-ordered entry.
    pub fn extract_min(&mut self) -> Option<(K, V)> {
        if self.heap.is_empty() {
            return None;
        }

        let last = self.heap.len() - 1;
        self.swap(0, last);
        let entry = self.heap.pop()?;
        self.positions.remove(&entry.key);
        if !self.heap.is_empty() {
            self.sift_down(0);
        }
        Some((entry.key, entry.value))
    }

    /// Replace the value for `key` if the new order is strictly smaller.
    ///
    /// Returns whether the entry changed. Fails if the key is not queued.
    pub fn decrease(&mut self, key: &K, value: V) -> Result<bool, QueueError> {
        let pos = *self
            .positions
            .get(key)
            .ok_or_else(|| QueueError::MissingKey(format!("{key:?}")))?;

        let order = (self.order_of)(&value);
        if order >= self.heap[pos].order {
            return Ok(false);
        }

        let entry = &mut self.heap[pos];
        entry.order = order;
        entry.value = value;
        self.sift_up(pos);
        Ok(true)
    }

    fn sift_up(&mut self, mut pos: usize) {
        while pos > 0 {
            let parent = (pos - 1) / 2;
            if !self.heap[pos].precedes(&self.heap[parent]) {
                break;
            }
            self.swap(pos, parent);
            pos = parent;
        }
    }

    fn sift_down(&mut self, mut pos: usize) {
        let len = self.heap.len();
        loop {
            let left = 2 * pos + 1;
            let right = left + 1;
            let mut best = pos;
            if left < len && self.heap[left].precedes(&self.heap[best]) {
                best = left;
            }
            if right < len && self.heap[right].precedes(&self.heap[best]) {
                best = right;
            }
            if best == pos {
                break;
            }
            self.swap(pos, best);
            pos = best;
        }
    }

    fn swap(&mut self, a: usize, b: usize) {
        if a == b {
            return;
        }
        self.heap.swap(a, b);
        if let Some(p) = self.positions.get_mut(&self.heap[a].key) {
            *p = a;
        }
        if let Some(p) = self.positions.get_mut(&self.heap[b].key) {
            *p = b;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cmp::Reverse;

    fn latest_first(v: &Option<u32>) -> Reverse<Option<u32>> {
        Reverse(*v)
    }

    #[test]
    fn empty_queue() {
        let mut queue = DecreaseQueue::new(|v: &u32| *v);
        queue.insert(1usize, 5).unwrap();
        queue.extract_min();

        assert!(queue.is_empty());
        assert_eq!(queue.peek(), None);
        assert_eq!(queue.extract_min(), None);
    }

    #[test]
    fn extracts_in_order() {
        let mut queue = DecreaseQueue::new(|v: &u32| *v);
        for (k, v) in [(1usize, 50), (2, 10), (3, 40), (4, 20), (5, 30)] {
            queue.insert(k, v).unwrap();
        }

        let order: Vec<_> = std::iter::from_fn(|| queue.extract_min()).collect();
        assert_eq!(order, vec![(2, 10), (4, 20), (5, 30), (3, 40), (1, 50)]);
    }

    #[test]
    fn peek_does_not_remove() {
        let mut queue = DecreaseQueue::new(|v: &u32| *v);
        queue.insert("x", 3).unwrap();
        assert_eq!(queue.peek(), Some((&"x", &3)));
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn duplicate_insert_fails() {
        let mut queue = DecreaseQueue::new(|v: &u32| *v);
        queue.insert("a", 1).unwrap();
        let err = queue.insert("a", 2).unwrap_err();
        assert_eq!(err, QueueError::DuplicateKey("\"a\"".into()));
        assert_eq!(queue.value(&"a"), Some(&1));
    }

    #[test]
    fn decrease_missing_fails() {
        let mut queue = DecreaseQueue::new(|v: &u32| *v);
        let err = queue.decrease(&"a", 1).unwrap_err();
        assert!(matches!(err, QueueError::MissingKey(_)));

        queue.insert("a", 1).unwrap();
        queue.extract_min();
        assert!(queue.decrease(&"a", 0).is_err());
    }

    #[test]
    fn decrease_only_improves() {
        let mut queue = DecreaseQueue::new(|v: &u32| *v);
        queue.insert("a", 10).unwrap();

        assert!(!queue.decrease(&"a", 10).unwrap());
        assert!(!queue.decrease(&"a", 11).unwrap());
        assert_eq!(queue.value(&"a"), Some(&10));

        assert!(queue.decrease(&"a", 9).unwrap());
        assert_eq!(queue.value(&"a"), Some(&9));
    }

    #[test]
    fn decrease_reorders() {
        let mut queue = DecreaseQueue::new(|v: &u32| *v);
        queue.insert("a", 10).unwrap();
        queue.insert("b", 20).unwrap();
        queue.insert("c", 30).unwrap();

        queue.decrease(&"c", 5).unwrap();
        assert_eq!(queue.peek(), Some((&"c", &5)));
    }

    #[test]
    fn unreachable_sorts_last_with_reverse() {
        let mut queue = DecreaseQueue::new(latest_first);
        queue.insert("unreached", None).unwrap();
        queue.insert("early", Some(100)).unwrap();
        queue.insert("late", Some(500)).unwrap();

        assert_eq!(queue.extract_min(), Some(("late", Some(500))));
        assert_eq!(queue.extract_min(), Some(("early", Some(100))));
        assert_eq!(queue.extract_min(), Some(("unreached", None)));
    }

    #[test]
    fn reaching_an_unreached_key_is_an_improvement() {
        let mut queue = DecreaseQueue::new(latest_first);
        queue.insert("a", None).unwrap();
        assert!(queue.decrease(&"a", Some(0)).unwrap());
        assert!(!queue.decrease(&"a", None).unwrap());
    }

    #[test]
    fn ties_break_by_insertion() {
        let mut queue = DecreaseQueue::new(|v: &u32| *v);
        queue.insert("first", 1).unwrap();
        queue.insert("second", 1).unwrap();
        queue.insert("third", 1).unwrap();

        assert_eq!(queue.extract_min().unwrap().0, "first");
        assert_eq!(queue.extract_min().unwrap().0, "second");
        assert_eq!(queue.extract_min().unwrap().0, "third");
    }
}
