use std::collections::{HashSet, VecDeque};

use uuid::Uuid;

/// Bounded set of recently seen message ids.
///
/// Once full, the oldest id is forgotten first.
#[derive(Debug)]
pub struct SeenMessages {
    order: VecDeque<Uuid>,
    seen: HashSet<Uuid>,
    capacity: usize,
}

impl SeenMessages {
    pub fn new(capacity: usize) -> Self {
        Self {
            order: VecDeque::with_capacity(capacity),
            seen: HashSet::with_capacity(capacity),
            capacity,
        }
    }

    /// Records `id`. Returns `false` if it was already present.
    pub fn insert(&mut self, id: Uuid) -> bool {
        if self.capacity == 0 {
            return true;
        }
        if !self.seen.insert(id) {
            return false;
        }
        self.order.push_back(id);
        if self.order.len() > self.capacity
            && let Some(oldest) = self.order.pop_front()
        {
            self.seen.remove(&oldest);
        }
        true
    }

    pub fn contains(&self, id: &Uuid) -> bool {
        self.seen.contains(id)
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
    fn test_duplicate_is_rejected() {
        let mut seen = SeenMessages::new(4);
        let id = Uuid::new_v4();
        assert!(seen.insert(id));
        assert!(!seen.insert(id));
        assert_eq!(seen.len(), 1);
    }

    #[test]
    fn test_oldest_is_evicted() {
        let mut seen = SeenMessages::new(2);
        let ids: Vec<Uuid> = (0..3).map(|_| Uuid::new_v4()).collect();
        for id in &ids {
            assert!(seen.insert(*id));
        }

        assert!(!seen.contains(&ids[0]));
        assert!(seen.contains(&ids[1]));
        assert!(seen.contains(&ids[2]));
        assert!(seen.insert(ids[0]));
    }

    #[test]
    fn test_zero_capacity_remembers_nothing() {
        let mut seen = SeenMessages::new(0);
        let id = Uuid::new_v4();
        assert!(seen.insert(id));
        assert!(seen.insert(id));
        assert!(seen.is_empty());
    }
}
