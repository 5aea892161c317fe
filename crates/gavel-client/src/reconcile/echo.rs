use std::collections::{HashSet, VecDeque};
use std::hash::Hash;

/// Remembers ids of locally written records so their broadcast echoes can be
/// recognised.
///
/// Bounded: once `capacity` ids are held, recording a new one evicts the
/// oldest.
#[derive(Debug, Clone)]
pub struct EchoSuppressor<K> {
    order: VecDeque<K>,
    members: HashSet<K>,
    capacity: usize,
}

impl<K: Copy + Eq + Hash> EchoSuppressor<K> {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            order: VecDeque::with_capacity(capacity),
            members: HashSet::with_capacity(capacity),
            capacity,
        }
    }

    /// Record a locally written id. Recording the same id twice is a no-op.
    pub fn record(&mut self, id: K) {
        if !self.members.insert(id) {
            return;
        }
        self.order.push_back(id);
        while self.order.len() > self.capacity {
            if let Some(evicted) = self.order.pop_front() {
                self.members.remove(&evicted);
            }
        }
    }

    pub fn is_suppressed(&self, id: &K) -> bool {
        self.members.contains(id)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_and_check() {
        let mut echo = EchoSuppressor::new(4);
        echo.record(42);
        echo.record(42);
        assert!(echo.is_suppressed(&42));
        assert!(!echo.is_suppressed(&7));
        assert_eq!(echo.len(), 1);
    }

    #[test]
    fn test_oldest_evicted_at_capacity() {
        let mut echo = EchoSuppressor::new(3);
        for id in 1..=4 {
            echo.record(id);
        }
        assert!(!echo.is_suppressed(&1));
        assert!(echo.is_suppressed(&2));
        assert!(echo.is_suppressed(&4));
        assert_eq!(echo.len(), 3);
    }

    #[test]
    fn test_zero_capacity_still_holds_latest() {
        let mut echo = EchoSuppressor::new(0);
        echo.record(1);
        echo.record(2);
        assert!(echo.is_suppressed(&2));
        assert!(!echo.is_suppressed(&1));
    }
}
