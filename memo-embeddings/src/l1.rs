//! L1 in-process cache: prefixed text → vector.
//!
//! Insertion-ordered with pure FIFO eviction — on overflow the oldest entry
//! leaves, no recency tracking.

use std::collections::{HashMap, VecDeque};

/// Fixed-capacity FIFO map.
pub struct L1Cache {
    map: HashMap<String, Vec<f32>>,
    order: VecDeque<String>,
    capacity: usize,
}

impl L1Cache {
    pub fn new(capacity: usize) -> Self {
        Self {
            map: HashMap::with_capacity(capacity),
            order: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn get(&self, key: &str) -> Option<Vec<f32>> {
        self.map.get(key).cloned()
    }

    /// Insert; re-inserting an existing key overwrites the value without
    /// refreshing its queue position.
    pub fn insert(&mut self, key: String, vector: Vec<f32>) {
        if self.map.insert(key.clone(), vector).is_none() {
            self.order.push_back(key);
            if self.order.len() > self.capacity {
                if let Some(oldest) = self.order.pop_front() {
                    self.map.remove(&oldest);
                }
            }
        }
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn clear(&mut self) {
        self.map.clear();
        self.order.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_and_get() {
        let mut cache = L1Cache::new(4);
        cache.insert("a".into(), vec![1.0]);
        assert_eq!(cache.get("a"), Some(vec![1.0]));
        assert_eq!(cache.get("b"), None);
    }

    #[test]
    fn evicts_oldest_first() {
        let mut cache = L1Cache::new(3);
        for (i, k) in ["a", "b", "c"].iter().enumerate() {
            cache.insert((*k).into(), vec![i as f32]);
        }
        cache.insert("d".into(), vec![3.0]);
        assert_eq!(cache.len(), 3);
        assert_eq!(cache.get("a"), None, "oldest entry evicted");
        assert!(cache.get("b").is_some());
        assert!(cache.get("d").is_some());
    }

    #[test]
    fn get_does_not_refresh_position() {
        let mut cache = L1Cache::new(2);
        cache.insert("a".into(), vec![0.0]);
        cache.insert("b".into(), vec![1.0]);
        // A read of "a" must not save it: FIFO, not LRU.
        let _ = cache.get("a");
        cache.insert("c".into(), vec![2.0]);
        assert_eq!(cache.get("a"), None);
    }

    #[test]
    fn overwrite_keeps_queue_consistent() {
        let mut cache = L1Cache::new(2);
        cache.insert("a".into(), vec![0.0]);
        cache.insert("a".into(), vec![9.0]);
        cache.insert("b".into(), vec![1.0]);
        cache.insert("c".into(), vec![2.0]);
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get("a"), None);
        assert_eq!(cache.get("c"), Some(vec![2.0]));
    }
}
