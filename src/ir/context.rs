// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

//! Calling/allocation contexts.
//!
//! A context is a string of context elements (call sites for call-site
//! sensitivity, allocation sites for object sensitivity). Contexts are
//! interned in a [`ContextCache`] and handled by id everywhere else; the
//! solver never inspects their structure.

use std::collections::HashMap;
use std::fmt::{Debug, Formatter, Result};
use std::hash::Hash;
use std::rc::Rc;

use super::program::AllocId;
use super::statement::CallSiteId;

/// The unique identifier for each interned context.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct ContextId(pub u32);

pub trait ContextElement: Clone + Eq + PartialEq + Debug + Hash {}

impl ContextElement for CallSiteId {}

impl ContextElement for AllocId {}

#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Context<E: ContextElement> {
    pub(crate) context_elems: Vec<E>,
}

impl<E: ContextElement> Debug for Context<E> {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        self.context_elems.fmt(f)
    }
}

impl<E: ContextElement> Context<E> {
    pub fn new_empty() -> Rc<Self> {
        Rc::new(Context {
            context_elems: Vec::new(),
        })
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.context_elems.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.context_elems.is_empty()
    }

    /// Compose a new context from a given context and a new context element.
    /// Discard the oldest elements if the length exceeds the depth limit.
    pub fn new_k_limited_context(old_ctx: &Rc<Context<E>>, elem: E, k: usize) -> Rc<Self> {
        let mut elems = Vec::with_capacity(k);
        if k > 0 {
            elems.push(elem);
            if old_ctx.len() < k {
                elems.extend_from_slice(&old_ctx.context_elems[..])
            } else {
                elems.extend_from_slice(&old_ctx.context_elems[..k - 1])
            }
        }
        Rc::new(Context { context_elems: elems })
    }

    /// Truncate a context to at most `k` elements, keeping the most recent.
    pub fn k_limited_context(ctx: &Rc<Context<E>>, k: usize) -> Rc<Self> {
        if ctx.len() <= k {
            ctx.clone()
        } else {
            let elems = ctx.context_elems[..k].to_vec();
            Rc::new(Context { context_elems: elems })
        }
    }
}

/// Interns contexts; the same context always maps to the same id. The cache
/// is append-only for the lifetime of one analysis run.
#[derive(Debug)]
pub struct ContextCache<E: ContextElement> {
    context_list: Vec<Rc<Context<E>>>,
    context_to_index_map: HashMap<Rc<Context<E>>, ContextId>,
}

impl<E: ContextElement> Default for ContextCache<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: ContextElement> ContextCache<E> {
    pub fn new() -> ContextCache<E> {
        ContextCache {
            context_list: Vec::new(),
            context_to_index_map: HashMap::new(),
        }
    }

    /// Returns an index that can be used to retrieve the context via
    /// `get_context`.
    pub fn get_context_id(&mut self, context: &Rc<Context<E>>) -> ContextId {
        if let Some(id) = self.context_to_index_map.get(context) {
            *id
        } else {
            let id = ContextId(self.context_list.len() as u32);
            self.context_list.push(context.clone());
            self.context_to_index_map.insert(context.clone(), id);
            id
        }
    }

    pub fn get_context(&self, id: ContextId) -> Option<Rc<Context<E>>> {
        self.context_list.get(id.0 as usize).cloned()
    }

    pub fn num_contexts(&self) -> usize {
        self.context_list.len()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn k_limited_composition() {
        let s0 = CallSiteId(0);
        let s1 = CallSiteId(1);
        let s2 = CallSiteId(2);

        let empty = Context::new_empty();
        let c1 = Context::new_k_limited_context(&empty, s0, 2);
        assert_eq!(c1.context_elems, vec![s0]);
        let c2 = Context::new_k_limited_context(&c1, s1, 2);
        assert_eq!(c2.context_elems, vec![s1, s0]);
        // the oldest element falls off once the limit is reached
        let c3 = Context::new_k_limited_context(&c2, s2, 2);
        assert_eq!(c3.context_elems, vec![s2, s1]);
        // k = 0 collapses everything to the empty context
        let c4 = Context::new_k_limited_context(&c2, s2, 0);
        assert!(c4.is_empty());
    }

    #[test]
    fn cache_interns_contexts() {
        let mut cache: ContextCache<CallSiteId> = ContextCache::new();
        let empty = Context::new_empty();
        let id0 = cache.get_context_id(&empty);
        assert_eq!(id0, cache.get_context_id(&Context::new_empty()));

        let c1 = Context::new_k_limited_context(&empty, CallSiteId(7), 1);
        let id1 = cache.get_context_id(&c1);
        assert_ne!(id0, id1);
        assert_eq!(cache.get_context(id1).unwrap(), c1);
        assert_eq!(cache.num_contexts(), 2);
    }
}
