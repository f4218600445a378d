//! Per-key lattice state with join-based update

use super::lattice::LatticeElement;
use indexmap::IndexMap;
use std::hash::Hash;

/// Maps keys (usually nodes or variable names) to lattice elements.
///
/// Iteration follows insertion order. [`State::push`] and [`State::lub`]
/// never make a stored element smaller.
#[derive(Debug, Clone, PartialEq)]
pub struct State<N: Hash + Eq, V> {
    entries: IndexMap<N, V>,
}

impl<N: Hash + Eq + Clone, V: LatticeElement> State<N, V> {
    /// An empty state
    pub fn new() -> Self {
        Self {
            entries: IndexMap::new(),
        }
    }

    /// Joins `element` into the entry for `key`.
    ///
    /// Inserts if the key is absent. Leaves the entry alone and returns
    /// false if the stored element is already greater or equal. Otherwise
    /// stores the join of both and returns true.
    pub fn push(&mut self, key: N, element: V) -> bool {
        match self.entries.get_mut(&key) {
            Some(existing) => {
                if existing.compare(&element).is_at_least() {
                    false
                } else {
                    *existing = existing.lub(&element);
                    true
                }
            }
            None => {
                self.entries.insert(key, element);
                true
            }
        }
    }

    /// Pushes every entry of `other`. Returns whether anything changed.
    pub fn lub(&mut self, other: &State<N, V>) -> bool {
        let mut changed = false;
        for (key, element) in &other.entries {
            changed |= self.push(key.clone(), element.duplicate());
        }
        changed
    }

    /// Whether [`State::lub`] with `other` would change this state: `other`
    /// has keys this state lacks, or elements the stored ones do not cover.
    /// Incomparable elements count as an update.
    pub fn needs_update(&self, other: &State<N, V>) -> bool {
        other.entries.iter().any(|(key, element)| match self.entries.get(key) {
            None => true,
            Some(existing) => !existing.compare(element).is_at_least(),
        })
    }

    /// Deep copy of every entry
    pub fn duplicate(&self) -> Self {
        Self {
            entries: self
                .entries
                .iter()
                .map(|(k, v)| (k.clone(), v.duplicate()))
                .collect(),
        }
    }

    /// Element stored for `key`
    pub fn get(&self, key: &N) -> Option<&V> {
        self.entries.get(key)
    }

    /// Overwrites the entry for `key`. This is how transformations kill
    /// facts; the join-based methods can only grow an entry.
    pub fn insert(&mut self, key: N, element: V) -> Option<V> {
        self.entries.insert(key, element)
    }

    /// Removes and returns the element of `key`
    pub fn remove(&mut self, key: &N) -> Option<V> {
        self.entries.shift_remove(key)
    }

    pub fn contains_key(&self, key: &N) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&N, &V)> {
        self.entries.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &N> {
        self.entries.keys()
    }
}

impl<N: Hash + Eq + Clone, V: LatticeElement> Default for State<N, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<N: Hash + Eq + Clone, V: LatticeElement> FromIterator<(N, V)> for State<N, V> {
    fn from_iter<I: IntoIterator<Item = (N, V)>>(iter: I) -> Self {
        let mut state = State::new();
        for (key, element) in iter {
            state.push(key, element);
        }
        state
    }
}
