//! Fixed-capacity least-recently-used cache
//!
//! Entries live in a dense node arena; the recency list is threaded through
//! the arena with `prev`/`next` indices and a key -> slot map gives O(1)
//! lookup. Eviction reuses the arena, so it never grows past the capacity.

use std::collections::HashMap;
use std::hash::Hash;

#[derive(Debug)]
struct Node<K, V> {
    key: K,
    value: V,
    prev: Option<usize>,
    next: Option<usize>,
}

/// Strict LRU cache: both `get` and `put` refresh recency
///
/// `len() <= capacity()` holds after every operation. When a `put` of a new
/// key would exceed the capacity, the least-recently-used entry is evicted
/// first and returned to the caller.
#[derive(Debug)]
pub struct LruCache<K, V> {
    capacity: usize,
    index: HashMap<K, usize>,
    nodes: Vec<Node<K, V>>,
    /// Most recently used
    head: Option<usize>,
    /// Least recently used
    tail: Option<usize>,
}

impl<K, V> LruCache<K, V>
where
    K: Hash + Eq + Clone,
{
    /// Creates a cache holding at most `capacity` entries (minimum 1)
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            index: HashMap::with_capacity(capacity),
            nodes: Vec::with_capacity(capacity),
            head: None,
            tail: None,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, key: &K) -> bool {
        self.index.contains_key(key)
    }

    /// Returns the value for `key` and marks it most recently used
    pub fn get<Q>(&mut self, key: &Q) -> Option<&V>
    where
        K: std::borrow::Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let slot = *self.index.get(key)?;
        self.promote(slot);
        Some(&self.nodes[slot].value)
    }

    /// Returns the value for `key` without touching recency
    pub fn peek<Q>(&self, key: &Q) -> Option<&V>
    where
        K: std::borrow::Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.index.get(key).map(|&slot| &self.nodes[slot].value)
    }

    /// Inserts or updates `key` as the most recently used entry
    ///
    /// Returns the entry evicted to make room, if any. Updating an existing
    /// key never evicts.
    pub fn put(&mut self, key: K, value: V) -> Option<(K, V)> {
        if let Some(&slot) = self.index.get(&key) {
            self.nodes[slot].value = value;
            self.promote(slot);
            return None;
        }

        let evicted = match self.tail {
            Some(lru) if self.nodes.len() >= self.capacity => Some(self.remove_slot(lru)),
            _ => None,
        };

        let slot = self.nodes.len();
        self.nodes.push(Node {
            key: key.clone(),
            value,
            prev: None,
            next: None,
        });
        self.index.insert(key, slot);
        self.push_front(slot);

        evicted
    }

    /// Removes `key`, returning its value
    pub fn remove<Q>(&mut self, key: &Q) -> Option<V>
    where
        K: std::borrow::Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let slot = *self.index.get(key)?;
        Some(self.remove_slot(slot).1)
    }

    /// Keys ordered from most to least recently used
    pub fn keys_by_recency(&self) -> Vec<&K> {
        let mut keys = Vec::with_capacity(self.nodes.len());
        let mut cursor = self.head;
        while let Some(slot) = cursor {
            let node = &self.nodes[slot];
            keys.push(&node.key);
            cursor = node.next;
        }
        keys
    }

    fn promote(&mut self, slot: usize) {
        if self.head != Some(slot) {
            self.unlink(slot);
            self.push_front(slot);
        }
    }

    fn push_front(&mut self, slot: usize) {
        let old_head = self.head;
        {
            let node = &mut self.nodes[slot];
            node.prev = None;
            node.next = old_head;
        }
        match old_head {
            Some(head) => self.nodes[head].prev = Some(slot),
            None => self.tail = Some(slot),
        }
        self.head = Some(slot);
    }

    fn unlink(&mut self, slot: usize) {
        let (prev, next) = {
            let node = &self.nodes[slot];
            (node.prev, node.next)
        };
        match prev {
            Some(p) => self.nodes[p].next = next,
            None => self.head = next,
        }
        match next {
            Some(n) => self.nodes[n].prev = prev,
            None => self.tail = prev,
        }
        let node = &mut self.nodes[slot];
        node.prev = None;
        node.next = None;
    }

    /// Unlinks and removes the node in `slot`, keeping the arena dense
    ///
    /// The last node is moved into the vacated slot, so every reference to
    /// its old position is patched.
    fn remove_slot(&mut self, slot: usize) -> (K, V) {
        self.unlink(slot);
        let moved_from = self.nodes.len() - 1;
        let node = self.nodes.swap_remove(slot);
        self.index.remove(&node.key);

        if slot != moved_from {
            let (prev, next) = {
                let moved = &self.nodes[slot];
                (moved.prev, moved.next)
            };
            match prev {
                Some(p) => self.nodes[p].next = Some(slot),
                None => self.head = Some(slot),
            }
            match next {
                Some(n) => self.nodes[n].prev = Some(slot),
                None => self.tail = Some(slot),
            }
            if let Some(entry) = self.index.get_mut(&self.nodes[slot].key) {
                *entry = slot;
            }
        }

        (node.key, node.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys(cache: &LruCache<&'static str, u32>) -> Vec<&'static str> {
        cache.keys_by_recency().into_iter().copied().collect()
    }

    #[test]
    fn test_get_miss() {
        let mut cache: LruCache<String, bool> = LruCache::new(32);
        assert_eq!(cache.get("foo"), None);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_put_and_get_hit() {
        let mut cache = LruCache::new(32);
        cache.put("a".to_string(), "alpha");
        cache.put("b".to_string(), "beta");

        assert_eq!(cache.get("a"), Some(&"alpha"));
        assert_eq!(cache.get("b"), Some(&"beta"));
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_overflow_evicts_least_recently_inserted() {
        let mut cache = LruCache::new(3);
        assert_eq!(cache.put("a", 1), None);
        assert_eq!(cache.put("b", 2), None);
        assert_eq!(cache.put("c", 3), None);

        assert_eq!(cache.put("d", 4), Some(("a", 1)));
        assert_eq!(cache.len(), 3);
        assert!(!cache.contains(&"a"));
        assert_eq!(keys(&cache), vec!["d", "c", "b"]);
    }

    #[test]
    fn test_get_protects_entry_from_next_eviction() {
        let mut cache = LruCache::new(3);
        cache.put("a", 1);
        cache.put("b", 2);
        cache.put("c", 3);

        assert_eq!(cache.get(&"a"), Some(&1));
        assert_eq!(cache.put("d", 4), Some(("b", 2)));

        assert!(cache.contains(&"a"));
        assert_eq!(keys(&cache), vec!["d", "a", "c"]);
    }

    #[test]
    fn test_eviction_order_follows_access() {
        let mut cache = LruCache::new(3);
        cache.put("a", 1);
        cache.put("b", 2);
        cache.put("c", 3);
        cache.get(&"b");
        cache.get(&"a");

        assert_eq!(cache.put("d", 4), Some(("c", 3)));
        assert_eq!(cache.put("e", 5), Some(("b", 2)));
        assert_eq!(cache.put("f", 6), Some(("a", 1)));
        assert_eq!(keys(&cache), vec!["f", "e", "d"]);
    }

    #[test]
    fn test_update_existing_refreshes_without_eviction() {
        let mut cache = LruCache::new(2);
        cache.put(1, 100);
        cache.put(2, 200);

        assert_eq!(cache.put(1, 101), None);
        assert_eq!(cache.len(), 2);

        assert_eq!(cache.put(3, 300), Some((2, 200)));
        assert_eq!(cache.get(&1), Some(&101));
        assert_eq!(cache.get(&3), Some(&300));
        assert_eq!(cache.get(&2), None);
    }

    #[test]
    fn test_peek_does_not_refresh() {
        let mut cache = LruCache::new(2);
        cache.put("a", 1);
        cache.put("b", 2);

        assert_eq!(cache.peek(&"a"), Some(&1));
        assert_eq!(cache.put("c", 3), Some(("a", 1)));
    }

    #[test]
    fn test_capacity_one() {
        let mut cache = LruCache::new(1);
        cache.put("a", 1);
        assert_eq!(cache.put("b", 2), Some(("a", 1)));
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get(&"b"), Some(&2));
    }

    #[test]
    fn test_zero_capacity_is_clamped() {
        let mut cache = LruCache::new(0);
        assert_eq!(cache.capacity(), 1);
        cache.put("a", 1);
        assert_eq!(cache.get(&"a"), Some(&1));
    }

    #[test]
    fn test_remove_middle_keeps_order() {
        let mut cache = LruCache::new(4);
        cache.put("a", 1);
        cache.put("b", 2);
        cache.put("c", 3);
        cache.put("d", 4);

        assert_eq!(cache.remove(&"b"), Some(2));
        assert_eq!(cache.remove(&"b"), None);
        assert_eq!(keys(&cache), vec!["d", "c", "a"]);

        cache.put("e", 5);
        cache.put("f", 6);
        assert_eq!(keys(&cache), vec!["f", "e", "d", "c"]);
        assert_eq!(cache.get(&"a"), None);
    }

    #[test]
    fn test_size_never_exceeds_capacity() {
        let mut cache = LruCache::new(8);
        for i in 0..1000u32 {
            cache.put(i % 37, i);
            if i % 3 == 0 {
                cache.get(&(i % 11));
            }
            assert!(cache.len() <= cache.capacity());
            assert_eq!(cache.keys_by_recency().len(), cache.len());
        }
    }
}
