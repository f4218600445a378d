//! Lattice elements for dataflow analysis
//!
//! A lattice element supports a join (`lub`), a deep copy and a partial
//! order comparison. Two elements are provided:
//! - [`PowersetLattice`]: sets ordered by containment, joined by union
//! - [`FlatLattice`]: Bottom (⊥) < any single value < Top (⊤)

use crate::graph::NodeId;
use indexmap::IndexSet;
use std::fmt;
use std::hash::Hash;

/// Result of comparing two lattice elements
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Order {
    Greater,
    Equal,
    /// Strictly smaller, or incomparable
    Lesser,
}

impl Order {
    /// `Greater` or `Equal`
    pub fn is_at_least(self) -> bool {
        matches!(self, Order::Greater | Order::Equal)
    }
}

/// An element of a join semilattice
pub trait LatticeElement: Clone + fmt::Debug {
    /// Least upper bound of `self` and `other`
    fn lub(&self, other: &Self) -> Self;

    /// Deep copy that shares no mutable structure with `self`
    fn duplicate(&self) -> Self {
        self.clone()
    }

    fn compare(&self, other: &Self) -> Order;
}

/// A set of elements ordered by containment
#[derive(Clone, PartialEq, Eq)]
pub struct PowersetLattice<T: Hash + Eq = NodeId> {
    elements: IndexSet<T>,
}

impl<T: Hash + Eq + Clone> PowersetLattice<T> {
    /// The empty set, bottom of the lattice
    pub fn new() -> Self {
        Self {
            elements: IndexSet::new(),
        }
    }

    /// A set holding only `element`
    pub fn singleton(element: T) -> Self {
        let mut elements = IndexSet::with_capacity(1);
        elements.insert(element);
        Self { elements }
    }

    /// Whether `element` is in the set
    pub fn contains(&self, element: &T) -> bool {
        self.elements.contains(element)
    }

    /// Elements in insertion order
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.elements.iter()
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Whether every element of `other` is in this set
    pub fn is_superset(&self, other: &Self) -> bool {
        other.elements.iter().all(|e| self.elements.contains(e))
    }
}

impl<T: Hash + Eq + Clone> Default for PowersetLattice<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Hash + Eq + Clone> FromIterator<T> for PowersetLattice<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self {
            elements: iter.into_iter().collect(),
        }
    }
}

impl<T: Hash + Eq + fmt::Debug> fmt::Debug for PowersetLattice<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.elements.iter()).finish()
    }
}

impl<T: Hash + Eq + Clone + fmt::Debug> LatticeElement for PowersetLattice<T> {
    fn lub(&self, other: &Self) -> Self {
        let mut elements = self.elements.clone();
        elements.extend(other.elements.iter().cloned());
        Self { elements }
    }

    // Only `self ⊇ other` is tested: a strict subset and an incomparable
    // set both come back as `Lesser`.
    fn compare(&self, other: &Self) -> Order {
        if self.is_superset(other) {
            if self.elements.len() > other.elements.len() {
                Order::Greater
            } else {
                Order::Equal
            }
        } else {
            Order::Lesser
        }
    }
}

/// Three-level lattice over values of `T`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum FlatLattice<T> {
    /// No information yet (unreachable or uninitialized)
    #[default]
    Bottom,
    Value(T),
    /// Conflicting information
    Top,
}

impl<T> FlatLattice<T> {
    /// The known value, `None` for `Bottom` and `Top`
    pub fn value(&self) -> Option<&T> {
        match self {
            FlatLattice::Value(v) => Some(v),
            _ => None,
        }
    }

    pub fn is_top(&self) -> bool {
        matches!(self, FlatLattice::Top)
    }

    pub fn is_bottom(&self) -> bool {
        matches!(self, FlatLattice::Bottom)
    }
}

impl<T: Clone + PartialEq + fmt::Debug> LatticeElement for FlatLattice<T> {
    fn lub(&self, other: &Self) -> Self {
        match (self, other) {
            (FlatLattice::Bottom, x) | (x, FlatLattice::Bottom) => x.clone(),
            (FlatLattice::Top, _) | (_, FlatLattice::Top) => FlatLattice::Top,
            (FlatLattice::Value(a), FlatLattice::Value(b)) if a == b => self.clone(),
            _ => FlatLattice::Top,
        }
    }

    fn compare(&self, other: &Self) -> Order {
        match (self, other) {
            _ if self == other => Order::Equal,
            (FlatLattice::Top, _) | (FlatLattice::Value(_), FlatLattice::Bottom) => Order::Greater,
            _ => Order::Lesser,
        }
    }
}
