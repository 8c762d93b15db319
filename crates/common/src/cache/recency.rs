use indexmap::IndexSet;

/// Exact LRU ordering of cache keys
///
/// Keys are kept least recently used first; an access moves the key to the
/// back.
#[derive(Debug, Default)]
pub(crate) struct Recency {
    order: IndexSet<String>,
}

impl Recency {
    /// Mark `key` as the most recently used key
    pub(crate) fn touch(&mut self, key: &str) {
        if let Some(index) = self.order.get_index_of(key) {
            if index + 1 == self.order.len() {
                return;
            }
            self.order.shift_remove_index(index);
        }
        self.order.insert(key.to_string());
    }

    pub(crate) fn remove(&mut self, key: &str) -> bool {
        self.order.shift_remove(key)
    }

    pub(crate) fn contains(&self, key: &str) -> bool {
        self.order.contains(key)
    }

    pub(crate) fn len(&self) -> usize {
        self.order.len()
    }

    pub(crate) fn clear(&mut self) {
        self.order.clear();
    }

    /// Drop least recently used keys until at most `capacity` remain
    pub(crate) fn evict_to(&mut self, capacity: usize) -> Vec<String> {
        let mut evicted = Vec::new();
        while self.order.len() > capacity {
            match self.order.shift_remove_index(0) {
                Some(key) => evicted.push(key),
                None => break,
            }
        }
        evicted
    }

    /// Keys, most recently used first
    pub(crate) fn most_recent_first(&self) -> impl Iterator<Item = &str> {
        self.order.iter().rev().map(String::as_str)
    }
}
