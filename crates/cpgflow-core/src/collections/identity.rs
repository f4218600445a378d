use super::Identifiable;
use fnv::FnvHashMap;
use std::fmt;

/// A set that compares elements by identity and remembers insertion order.
///
/// Each element is stored together with a sequence number drawn from a
/// monotonically increasing counter, so [`IdentitySet::to_sorted_list`]
/// recovers the order in which elements were first added. For sets built
/// by AST traversal this is the order of "closeness" to the root.
pub struct IdentitySet<T: Identifiable> {
    entries: FnvHashMap<T::Id, (T, u64)>,
    counter: u64,
}

impl<T: Identifiable> IdentitySet<T> {
    /// An empty set with a small default capacity
    pub fn new() -> Self {
        Self::with_capacity(16)
    }

    /// Creates a set sized for `expected` elements. The backing map gets
    /// twice that capacity to keep rehashing rare.
    pub fn with_capacity(expected: usize) -> Self {
        Self {
            entries: FnvHashMap::with_capacity_and_hasher(expected * 2, Default::default()),
            counter: 0,
        }
    }

    fn next_sequence(&mut self) -> u64 {
        self.counter += 1;
        self.counter
    }

    /// Adds `element` unless an element with the same identity is present.
    /// Returns whether the set changed.
    pub fn add(&mut self, element: T) -> bool {
        let id = element.identity();
        if self.entries.contains_key(&id) {
            return false;
        }
        let sequence = self.next_sequence();
        self.entries.insert(id, (element, sequence));
        true
    }

    /// Adds every element; returns whether any of them was new
    pub fn add_all(&mut self, elements: impl IntoIterator<Item = T>) -> bool {
        let mut modified = false;
        for element in elements {
            modified |= self.add(element);
        }
        modified
    }

    /// Bulk insert that skips the membership check.
    ///
    /// Only meant for filling an empty set. On a non-empty set membership
    /// stays correct, but an element already present gets a new sequence
    /// number and moves to the end of [`IdentitySet::to_sorted_list`].
    pub fn add_all_without_check(&mut self, elements: &IdentitySet<T>)
    where
        T: Clone,
    {
        self.entries.reserve(elements.len());
        for element in elements.to_sorted_list() {
            let sequence = self.next_sequence();
            self.entries.insert(element.identity(), (element, sequence));
        }
    }

    /// Whether an element with the identity of `element` is present
    pub fn contains(&self, element: &T) -> bool {
        self.entries.contains_key(&element.identity())
    }

    /// Whether an element with identity `id` is present
    pub fn contains_id(&self, id: &T::Id) -> bool {
        self.entries.contains_key(id)
    }

    /// Whether every element of `elements` is present
    pub fn contains_all<'a>(&self, elements: impl IntoIterator<Item = &'a T>) -> bool
    where
        T: 'a,
    {
        elements.into_iter().all(|e| self.contains(e))
    }

    /// Removes the element with the identity of `element`
    pub fn remove(&mut self, element: &T) -> bool {
        self.entries.remove(&element.identity()).is_some()
    }

    /// Removes every element; returns whether any of them was present
    pub fn remove_all<'a>(&mut self, elements: impl IntoIterator<Item = &'a T>) -> bool
    where
        T: 'a,
    {
        let mut modified = false;
        for element in elements {
            modified |= self.remove(element);
        }
        modified
    }

    /// Keeps only the elements for which `keep` returns true. Returns
    /// whether anything was removed. Sequence numbers are untouched.
    pub fn retain(&mut self, mut keep: impl FnMut(&T) -> bool) -> bool {
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

    /// Removes all elements. The sequence counter keeps running.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Iterates in unspecified order
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.entries.values().map(|(element, _)| element)
    }

    /// The elements in insertion order
    pub fn to_sorted_list(&self) -> Vec<T>
    where
        T: Clone,
    {
        let mut entries: Vec<&(T, u64)> = self.entries.values().collect();
        entries.sort_unstable_by_key(|(_, sequence)| *sequence);
        entries.into_iter().map(|(element, _)| element.clone()).collect()
    }

    /// A new set with the elements of `self` followed by the new elements of `other`
    pub fn union(&self, other: &IdentitySet<T>) -> IdentitySet<T>
    where
        T: Clone,
    {
        let mut result = IdentitySet::with_capacity(self.len() + other.len());
        result.add_all_without_check(self);
        result.add_all(other.to_sorted_list());
        result
    }
}

impl<T: Identifiable> Default for IdentitySet<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Identifiable + Clone> Clone for IdentitySet<T> {
    fn clone(&self) -> Self {
        Self {
            entries: self.entries.clone(),
            counter: self.counter,
        }
    }
}

impl<T: Identifiable> PartialEq for IdentitySet<T> {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.entries.keys().all(|id| other.entries.contains_key(id))
    }
}

impl<T: Identifiable> Eq for IdentitySet<T> {}

impl<T: Identifiable + fmt::Debug + Clone> fmt::Debug for IdentitySet<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.to_sorted_list()).finish()
    }
}

impl<T: Identifiable> FromIterator<T> for IdentitySet<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut set = IdentitySet::new();
        set.add_all(iter);
        set
    }
}

impl<T: Identifiable> Extend<T> for IdentitySet<T> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        self.add_all(iter);
    }
}
