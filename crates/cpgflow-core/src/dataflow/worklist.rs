//! Pending work and best-known state of one fixpoint computation

use super::lattice::LatticeElement;
use super::state::State;
use crate::collections::{Identifiable, IdentitySet};
use indexmap::IndexMap;
use std::hash::Hash;

/// The worklist of a single engine call.
///
/// `K` is what work is keyed by (a node or an EOG edge), `N` and `V` are
/// the key and lattice types of the propagated [`State`]. The queue is
/// FIFO and holds at most one entry per key: pushing a key that is already
/// pending joins the states and moves the entry to the back if the join
/// changed anything.
#[derive(Debug)]
pub struct Worklist<K, N, V>
where
    K: Identifiable + Hash + Eq + Clone,
    N: Hash + Eq,
{
    global_state: IndexMap<K, State<N, V>>,
    pending: IndexMap<K, State<N, V>>,
    already_seen: IdentitySet<K>,
    pushes: usize,
}

impl<K, N, V> Worklist<K, N, V>
where
    K: Identifiable + Hash + Eq + Clone,
    N: Hash + Eq + Clone,
    V: LatticeElement,
{
    /// An empty worklist
    pub fn new() -> Self {
        Self {
            global_state: IndexMap::new(),
            pending: IndexMap::new(),
            already_seen: IdentitySet::new(),
            pushes: 0,
        }
    }

    /// Queues `key` with `state`, or joins `state` into the pending entry
    /// for `key`. Returns false if the key was pending and nothing changed.
    pub fn push(&mut self, key: K, state: State<N, V>) -> bool {
        if let Some(current) = self.pending.get_mut(&key) {
            if !current.lub(&state) {
                return false;
            }
            if let Some((key, merged)) = self.pending.shift_remove_entry(&key) {
                self.pending.insert(key, merged);
            }
        } else {
            self.pending.insert(key, state);
        }
        self.pushes += 1;
        true
    }

    /// Takes the oldest pending entry and marks its key as seen
    pub fn pop(&mut self) -> Option<(K, State<N, V>)> {
        let (key, state) = self.pending.shift_remove_index(0)?;
        self.already_seen.add(key.clone());
        Some((key, state))
    }

    /// Joins `state` into the global state of `key`. Returns whether the
    /// global state changed.
    pub fn update(&mut self, key: K, state: &State<N, V>) -> bool {
        match self.global_state.get_mut(&key) {
            Some(global) => global.lub(state),
            None => {
                self.global_state.insert(key, state.duplicate());
                true
            }
        }
    }

    /// Whether `key` has been popped at least once
    pub fn has_already_seen(&self, key: &K) -> bool {
        self.already_seen.contains(key)
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Number of pending entries
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Best known state per key
    pub fn global_state(&self) -> &IndexMap<K, State<N, V>> {
        &self.global_state
    }

    /// Consumes the worklist, keeping only the global states
    pub fn into_global_state(self) -> IndexMap<K, State<N, V>> {
        self.global_state
    }

    /// Number of pushes that changed the queue
    pub fn pushes(&self) -> usize {
        self.pushes
    }

    /// Meet over paths: the join of every global state
    pub fn mop(&self) -> State<N, V> {
        mop(&self.global_state)
    }
}

impl<K, N, V> Default for Worklist<K, N, V>
where
    K: Identifiable + Hash + Eq + Clone,
    N: Hash + Eq + Clone,
    V: LatticeElement,
{
    fn default() -> Self {
        Self::new()
    }
}

pub(crate) fn mop<K, N, V>(global_state: &IndexMap<K, State<N, V>>) -> State<N, V>
where
    N: Hash + Eq + Clone,
    V: LatticeElement,
{
    let mut states = global_state.values();
    let Some(first) = states.next() else {
        return State::new();
    };
    let mut summary = first.duplicate();
    for state in states {
        summary.lub(state);
    }
    summary
}
