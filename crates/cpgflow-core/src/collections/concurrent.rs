use super::Identifiable;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe counterpart of [`super::IdentitySet`].
///
/// `add` goes through the entry API of a sharded map, so the membership
/// check and the insert happen under the same shard lock.
pub struct ConcurrentIdentitySet<T: Identifiable> {
    entries: DashMap<T::Id, (T, u64)>,
    counter: AtomicU64,
}

impl<T: Identifiable> ConcurrentIdentitySet<T> {
    /// An empty set with a small default capacity
    pub fn new() -> Self {
        Self::with_capacity(16)
    }

    /// Creates a set sized for `expected` elements
    pub fn with_capacity(expected: usize) -> Self {
        Self {
            entries: DashMap::with_capacity(expected * 2),
            counter: AtomicU64::new(0),
        }
    }

    fn next_sequence(&self) -> u64 {
        self.counter.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Adds `element` unless an element with the same identity is present
    pub fn add(&self, element: T) -> bool {
        match self.entries.entry(element.identity()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(vacant) => {
                let sequence = self.next_sequence();
                vacant.insert((element, sequence));
                true
            }
        }
    }

    /// Adds every element; returns whether any of them was new
    pub fn add_all(&self, elements: impl IntoIterator<Item = T>) -> bool {
        let mut modified = false;
        for element in elements {
            modified |= self.add(element);
        }
        modified
    }

    /// Bulk insert that skips the membership check. Same contract as
    /// [`super::IdentitySet::add_all_without_check`].
    pub fn add_all_without_check(&self, elements: &ConcurrentIdentitySet<T>)
    where
        T: Clone,
    {
        for element in elements.to_sorted_list() {
            let sequence = self.next_sequence();
            self.entries.insert(element.identity(), (element, sequence));
        }
    }

    /// Whether an element with the identity of `element` is present
    pub fn contains(&self, element: &T) -> bool {
        self.entries.contains_key(&element.identity())
    }

    /// Removes the element with the identity of `element`
    pub fn remove(&self, element: &T) -> bool {
        self.entries.remove(&element.identity()).is_some()
    }

    /// Keeps only the elements for which `keep` returns true. Returns
    /// whether anything was removed.
    pub fn retain(&self, mut keep: impl FnMut(&T) -> bool) -> bool {
        let before = self.entries.len();
        self.entries.retain(|_, (element, _)| keep(&*element));
        before != self.entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&self) {
        self.entries.clear();
    }

    /// The elements in insertion order
    pub fn to_sorted_list(&self) -> Vec<T>
    where
        T: Clone,
    {
        let mut entries: Vec<(T, u64)> = self
            .entries
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        entries.sort_unstable_by_key(|(_, sequence)| *sequence);
        entries.into_iter().map(|(element, _)| element).collect()
    }
}

impl<T: Identifiable> Default for ConcurrentIdentitySet<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Identifiable> FromIterator<T> for ConcurrentIdentitySet<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let set = ConcurrentIdentitySet::new();
        set.add_all(iter);
        set
    }
}
