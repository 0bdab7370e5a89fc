// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

//! The abstract heap.
//!
//! Heap objects are identified by their allocation site plus an allocation
//! context, interned in an arena so the same (site, context) pair always
//! yields the same [`ObjId`]. Taint marker objects live in the same arena,
//! keyed by their originating source call and declared type, and always
//! carry the empty context so every context's sink check can see them.

use std::collections::HashMap;

use crate::ir::context::ContextId;
use crate::ir::program::{AllocId, ClassId, Program};
use crate::ir::statement::CallSiteId;
use crate::util::bit_vec::Idx;

/// Unique identifier of an abstract heap object.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct ObjId(pub u32);

impl Idx for ObjId {
    #[inline]
    fn new(idx: usize) -> Self {
        assert!(idx <= u32::MAX as usize);
        ObjId(idx as u32)
    }

    #[inline]
    fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum ObjKind {
    /// An ordinary heap object created at an allocation site.
    Alloc(AllocId),
    /// A taint marker created at a source call.
    Taint { source: CallSiteId, ty: ClassId },
}

#[derive(Copy, Clone, Debug)]
pub struct Obj {
    pub cid: ContextId,
    pub kind: ObjKind,
}

pub struct HeapModel {
    objs: Vec<Obj>,
    alloc_objs: HashMap<(ContextId, AllocId), ObjId>,
    taint_objs: HashMap<(CallSiteId, ClassId), ObjId>,
}

impl HeapModel {
    pub fn new() -> Self {
        HeapModel {
            objs: Vec::new(),
            alloc_objs: HashMap::new(),
            taint_objs: HashMap::new(),
        }
    }

    /// The abstract object for an allocation site under a heap context,
    /// created on first request and cached for reuse.
    pub fn get_alloc_obj(&mut self, cid: ContextId, site: AllocId) -> ObjId {
        if let Some(id) = self.alloc_objs.get(&(cid, site)) {
            return *id;
        }
        let id = ObjId(self.objs.len() as u32);
        self.objs.push(Obj {
            cid,
            kind: ObjKind::Alloc(site),
        });
        self.alloc_objs.insert((cid, site), id);
        id
    }

    /// The taint marker for a source call, context-free by construction.
    pub fn get_taint_obj(&mut self, empty_cid: ContextId, source: CallSiteId, ty: ClassId) -> ObjId {
        if let Some(id) = self.taint_objs.get(&(source, ty)) {
            return *id;
        }
        let id = ObjId(self.objs.len() as u32);
        self.objs.push(Obj {
            cid: empty_cid,
            kind: ObjKind::Taint { source, ty },
        });
        self.taint_objs.insert((source, ty), id);
        id
    }

    #[inline]
    pub fn obj(&self, id: ObjId) -> &Obj {
        &self.objs[id.0 as usize]
    }

    pub fn is_taint(&self, id: ObjId) -> bool {
        matches!(self.obj(id).kind, ObjKind::Taint { .. })
    }

    pub fn taint_source(&self, id: ObjId) -> Option<CallSiteId> {
        match self.obj(id).kind {
            ObjKind::Taint { source, .. } => Some(source),
            ObjKind::Alloc(_) => None,
        }
    }

    /// The runtime class of an object, used for dispatch.
    pub fn obj_class(&self, program: &Program, id: ObjId) -> ClassId {
        match self.obj(id).kind {
            ObjKind::Alloc(site) => program.alloc_site(site).ty,
            ObjKind::Taint { ty, .. } => ty,
        }
    }

    pub fn num_objs(&self) -> usize {
        self.objs.len()
    }
}

impl Default for HeapModel {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn alloc_objs_are_interned() {
        let mut heap = HeapModel::new();
        let o1 = heap.get_alloc_obj(ContextId(0), AllocId(3));
        let o2 = heap.get_alloc_obj(ContextId(0), AllocId(3));
        let o3 = heap.get_alloc_obj(ContextId(1), AllocId(3));
        assert_eq!(o1, o2);
        assert_ne!(o1, o3);
        assert_eq!(heap.num_objs(), 2);
        assert!(!heap.is_taint(o1));
    }

    #[test]
    fn taint_objs_are_distinguishable() {
        let mut heap = HeapModel::new();
        let t = heap.get_taint_obj(ContextId(0), CallSiteId(9), ClassId(1));
        assert!(heap.is_taint(t));
        assert_eq!(heap.taint_source(t), Some(CallSiteId(9)));
        assert_eq!(t, heap.get_taint_obj(ContextId(0), CallSiteId(9), ClassId(1)));
    }
}
