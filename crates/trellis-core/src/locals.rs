//! The context channel.
//!
//! Every instance carries the set of provider cells visible from its
//! position in the tree. Providers extend the set for the children they
//! render; consumers look their context up by id. The channel itself never
//! invalidates anything: publishing a new value through it does not
//! re-render a single descendant.

use std::any::Any;
use std::collections::HashMap;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ContextId(u64);

impl ContextId {
    pub(crate) fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

#[derive(Clone, Default)]
pub struct Locals(Rc<HashMap<ContextId, Rc<dyn Any>>>);

impl Locals {
    /// A copy of `self` in which `id` resolves to `cell`.
    pub fn with(&self, id: ContextId, cell: Rc<dyn Any>) -> Locals {
        if let Some(existing) = self.0.get(&id)
            && Rc::ptr_eq(existing, &cell)
        {
            return self.clone();
        }
        let mut map = (*self.0).clone();
        map.insert(id, cell);
        Locals(Rc::new(map))
    }

    pub fn get(&self, id: ContextId) -> Option<Rc<dyn Any>> {
        self.0.get(&id).cloned()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
