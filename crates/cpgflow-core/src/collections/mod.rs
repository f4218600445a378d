//! Sets keyed by identity rather than structural equality
//!
//! Two nodes with identical content are still different nodes. Every
//! collection here compares elements through [`Identifiable::identity`] and
//! remembers the order in which elements were first added.

mod concurrent;
mod identity;

pub use concurrent::ConcurrentIdentitySet;
pub use identity::IdentitySet;

use crate::graph::{EogEdge, NodeId};
use std::hash::Hash;
use std::rc::Rc;
use std::sync::Arc;

/// Something with a stable identity key
pub trait Identifiable {
    type Id: Copy + Eq + Hash;

    fn identity(&self) -> Self::Id;
}

impl Identifiable for NodeId {
    type Id = NodeId;

    fn identity(&self) -> NodeId {
        *self
    }
}

impl Identifiable for EogEdge {
    type Id = EogEdge;

    fn identity(&self) -> EogEdge {
        *self
    }
}

// Shared pointers and references are identified by address.

impl<T: ?Sized> Identifiable for Rc<T> {
    type Id = usize;

    fn identity(&self) -> usize {
        Rc::as_ptr(self).cast::<()>() as usize
    }
}

impl<T: ?Sized> Identifiable for Arc<T> {
    type Id = usize;

    fn identity(&self) -> usize {
        Arc::as_ptr(self).cast::<()>() as usize
    }
}

impl<T: ?Sized> Identifiable for &T {
    type Id = usize;

    fn identity(&self) -> usize {
        (*self as *const T).cast::<()>() as usize
    }
}

/// Builds an [`IdentitySet`] from a list of elements
#[macro_export]
macro_rules! identity_set {
    () => {
        $crate::collections::IdentitySet::new()
    };
    ($($element:expr),+ $(,)?) => {{
        let mut set = $crate::collections::IdentitySet::new();
        $(set.add($element);)+
        set
    }};
}
