// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

//! Pluggable context sensitivity.
//!
//! The solver is generic over a [`ContextStrategy`] and only ever handles
//! opaque [`ContextId`]s; each strategy owns the cache that interns its
//! context strings. Every strategy interns the empty context first, so
//! `ContextId(0)` is the empty context under all of them.

use std::rc::Rc;

use crate::ir::context::{Context, ContextCache, ContextId};
use crate::ir::program::AllocId;
use crate::ir::statement::CallSiteId;

pub trait ContextStrategy {
    /// The context the entry method runs in.
    fn empty_context(&mut self) -> ContextId;

    /// The callee context for a static or special call.
    fn static_call_context(&mut self, caller_cid: ContextId, site: CallSiteId) -> ContextId;

    /// The callee context for an instance call. `recv_cid` is the receiver
    /// object's heap context; `recv_site` its allocation site, absent for
    /// synthetic objects that were not created by a `new` statement.
    fn instance_call_context(
        &mut self,
        caller_cid: ContextId,
        site: CallSiteId,
        recv_cid: ContextId,
        recv_site: Option<AllocId>,
    ) -> ContextId;

    /// The heap context given to objects allocated by a method running
    /// under `method_cid`.
    fn heap_context(&mut self, method_cid: ContextId) -> ContextId;

    fn num_contexts(&self) -> usize;

    fn name(&self) -> &'static str;
}

/// Every pointer and object lives in the single empty context.
pub struct ContextInsensitive;

impl ContextStrategy for ContextInsensitive {
    fn empty_context(&mut self) -> ContextId {
        ContextId(0)
    }

    fn static_call_context(&mut self, _caller_cid: ContextId, _site: CallSiteId) -> ContextId {
        ContextId(0)
    }

    fn instance_call_context(
        &mut self,
        _caller_cid: ContextId,
        _site: CallSiteId,
        _recv_cid: ContextId,
        _recv_site: Option<AllocId>,
    ) -> ContextId {
        ContextId(0)
    }

    fn heap_context(&mut self, _method_cid: ContextId) -> ContextId {
        ContextId(0)
    }

    fn num_contexts(&self) -> usize {
        1
    }

    fn name(&self) -> &'static str {
        "context-insensitive"
    }
}

/// k-call-site sensitivity: the callee's context is the chain of the k most
/// recent call sites. Heap contexts are truncated to k-1 elements.
pub struct KCallSiteSensitive {
    k: usize,
    cache: ContextCache<CallSiteId>,
}

impl KCallSiteSensitive {
    pub fn new(k: usize) -> Self {
        let mut cache = ContextCache::new();
        cache.get_context_id(&Context::new_empty());
        KCallSiteSensitive { k, cache }
    }

    fn context(&self, cid: ContextId) -> Rc<Context<CallSiteId>> {
        self.cache.get_context(cid).expect("unknown context id")
    }
}

impl ContextStrategy for KCallSiteSensitive {
    fn empty_context(&mut self) -> ContextId {
        ContextId(0)
    }

    fn static_call_context(&mut self, caller_cid: ContextId, site: CallSiteId) -> ContextId {
        let ctx = Context::new_k_limited_context(&self.context(caller_cid), site, self.k);
        self.cache.get_context_id(&ctx)
    }

    fn instance_call_context(
        &mut self,
        caller_cid: ContextId,
        site: CallSiteId,
        _recv_cid: ContextId,
        _recv_site: Option<AllocId>,
    ) -> ContextId {
        let ctx = Context::new_k_limited_context(&self.context(caller_cid), site, self.k);
        self.cache.get_context_id(&ctx)
    }

    fn heap_context(&mut self, method_cid: ContextId) -> ContextId {
        let ctx = Context::k_limited_context(&self.context(method_cid), self.k.saturating_sub(1));
        self.cache.get_context_id(&ctx)
    }

    fn num_contexts(&self) -> usize {
        self.cache.num_contexts()
    }

    fn name(&self) -> &'static str {
        "k-call-site"
    }
}

/// k-object sensitivity: the callee's context is the chain of allocation
/// sites of the k most recent receiver objects. Static calls, which have no
/// receiver, inherit the caller's context.
pub struct KObjectSensitive {
    k: usize,
    cache: ContextCache<AllocId>,
}

impl KObjectSensitive {
    pub fn new(k: usize) -> Self {
        let mut cache = ContextCache::new();
        cache.get_context_id(&Context::new_empty());
        KObjectSensitive { k, cache }
    }

    fn context(&self, cid: ContextId) -> Rc<Context<AllocId>> {
        self.cache.get_context(cid).expect("unknown context id")
    }
}

impl ContextStrategy for KObjectSensitive {
    fn empty_context(&mut self) -> ContextId {
        ContextId(0)
    }

    fn static_call_context(&mut self, caller_cid: ContextId, _site: CallSiteId) -> ContextId {
        caller_cid
    }

    fn instance_call_context(
        &mut self,
        _caller_cid: ContextId,
        _site: CallSiteId,
        recv_cid: ContextId,
        recv_site: Option<AllocId>,
    ) -> ContextId {
        match recv_site {
            Some(site) => {
                let ctx = Context::new_k_limited_context(&self.context(recv_cid), site, self.k);
                self.cache.get_context_id(&ctx)
            }
            // Synthetic receivers carry no allocation site; keep the
            // object's own context.
            None => recv_cid,
        }
    }

    fn heap_context(&mut self, method_cid: ContextId) -> ContextId {
        let ctx = Context::k_limited_context(&self.context(method_cid), self.k.saturating_sub(1));
        self.cache.get_context_id(&ctx)
    }

    fn num_contexts(&self) -> usize {
        self.cache.num_contexts()
    }

    fn name(&self) -> &'static str {
        "k-object"
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn call_site_contexts_distinguish_sites() {
        let mut strategy = KCallSiteSensitive::new(2);
        let empty = strategy.empty_context();
        let c1 = strategy.static_call_context(empty, CallSiteId(1));
        let c2 = strategy.static_call_context(empty, CallSiteId(2));
        assert_ne!(c1, c2);
        assert_eq!(c1, strategy.static_call_context(empty, CallSiteId(1)));
        // nested call under c1 keeps both sites at k = 2
        let c3 = strategy.static_call_context(c1, CallSiteId(3));
        assert_ne!(c3, strategy.static_call_context(empty, CallSiteId(3)));
    }

    #[test]
    fn one_call_site_heap_context_is_empty() {
        let mut strategy = KCallSiteSensitive::new(1);
        let empty = strategy.empty_context();
        let c1 = strategy.static_call_context(empty, CallSiteId(1));
        assert_eq!(strategy.heap_context(c1), empty);
    }

    #[test]
    fn object_contexts_follow_receivers() {
        let mut strategy = KObjectSensitive::new(1);
        let empty = strategy.empty_context();
        assert_eq!(strategy.static_call_context(empty, CallSiteId(0)), empty);
        let c1 = strategy.instance_call_context(empty, CallSiteId(0), empty, Some(AllocId(1)));
        let c2 = strategy.instance_call_context(empty, CallSiteId(0), empty, Some(AllocId(2)));
        assert_ne!(c1, c2);
        // a receiver without an allocation site keeps its own context
        assert_eq!(strategy.instance_call_context(empty, CallSiteId(0), c1, None), c1);
    }
}
