// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

//! The queryable snapshot produced by a finished analysis run.

use std::collections::HashSet;

use crate::graph::call_graph::{CSCallSiteId, CSMethodId, CallGraph};
use crate::graph::pfg::{PFGNodeId, Pointer, PointerFlowGraph};
use crate::ir::context::ContextId;
use crate::ir::program::{MethodId, Program, VarId};
use crate::ir::statement::CallSiteId;
use crate::pts_set::points_to::PointsToSet;
use crate::pts_set::pt_data::PTData;

use super::heap::{HeapModel, ObjId, ObjKind};
use super::taint::TaintFlow;
use super::PointsTo;

type PointsToData = PTData<PFGNodeId, ObjId, PointsTo>;

pub struct PTAResult<'pta> {
    program: &'pta Program,
    pfg: PointerFlowGraph,
    pt_data: PointsToData,
    call_graph: CallGraph,
    heap: HeapModel,
    taint_flows: Vec<TaintFlow>,
    num_contexts: usize,
}

impl<'pta> PTAResult<'pta> {
    pub(crate) fn new(
        program: &'pta Program,
        pfg: PointerFlowGraph,
        pt_data: PointsToData,
        call_graph: CallGraph,
        heap: HeapModel,
        taint_flows: Vec<TaintFlow>,
        num_contexts: usize,
    ) -> Self {
        PTAResult {
            program,
            pfg,
            pt_data,
            call_graph,
            heap,
            taint_flows,
            num_contexts,
        }
    }

    pub fn program(&self) -> &'pta Program {
        self.program
    }

    pub fn call_graph(&self) -> &CallGraph {
        &self.call_graph
    }

    pub fn pfg(&self) -> &PointerFlowGraph {
        &self.pfg
    }

    pub fn heap(&self) -> &HeapModel {
        &self.heap
    }

    pub fn num_contexts(&self) -> usize {
        self.num_contexts
    }

    pub fn reachable_methods(&self) -> &[CSMethodId] {
        self.call_graph.reach_methods()
    }

    pub fn is_reachable(&self, cid: ContextId, method: MethodId) -> bool {
        self.call_graph.is_reachable(CSMethodId::new(cid, method))
    }

    pub fn call_edges(&self) -> impl Iterator<Item = (CSCallSiteId, CSMethodId, CSMethodId)> + '_ {
        self.call_graph.edges()
    }

    /// The points-to set of a variable under one context.
    pub fn points_to(&self, cid: ContextId, var: VarId) -> Option<&PointsTo> {
        let node = self.pfg.node_id(&Pointer::Var { cid, var })?;
        self.pt_data.get_pts(node)
    }

    pub fn points_to_of(&self, pointer: &Pointer) -> Option<&PointsTo> {
        let node = self.pfg.node_id(pointer)?;
        self.pt_data.get_pts(node)
    }

    /// The context-collapsed points-to set of a variable: the union over
    /// every context the variable was analyzed under.
    pub fn points_to_ci(&self, var: VarId) -> PointsTo {
        let mut union = PointsTo::new();
        for (node, pointer) in self.pfg.iter_nodes() {
            if matches!(pointer, Pointer::Var { var: v, .. } if *v == var) {
                if let Some(pts) = self.pt_data.get_pts(node) {
                    union.union(pts);
                }
            }
        }
        union
    }

    /// True when the two variables may refer to a common object under the
    /// given contexts.
    pub fn may_alias(&self, a: (ContextId, VarId), b: (ContextId, VarId)) -> bool {
        let (Some(pts_a), Some(pts_b)) = (self.points_to(a.0, a.1), self.points_to(b.0, b.1))
        else {
            return false;
        };
        let (small, large) = if pts_a.count() <= pts_b.count() {
            (pts_a, pts_b)
        } else {
            (pts_b, pts_a)
        };
        small.iter().any(|obj| large.contains(obj))
    }

    /// All pointers whose points-to sets contain the given object.
    pub fn pointed_by(&self, obj: ObjId) -> HashSet<Pointer> {
        self.pt_data
            .get_rev_pts(obj)
            .map(|nodes| nodes.iter().map(|&n| *self.pfg.pointer(n)).collect())
            .unwrap_or_default()
    }

    pub fn iter_pointers(&self) -> impl Iterator<Item = (&Pointer, &PointsTo)> {
        self.pt_data
            .pts_map()
            .iter()
            .map(move |(&node, pts)| (self.pfg.pointer(node), pts))
    }

    pub fn taint_flows(&self) -> &[TaintFlow] {
        &self.taint_flows
    }

    pub fn pointer_display(&self, pointer: &Pointer) -> String {
        match *pointer {
            Pointer::Var { cid, var } => {
                format!("{} @{:?}", self.program.var_display(var), cid)
            }
            Pointer::StaticField(field) => {
                let f = self.program.field(field);
                format!("<{}: {}>", self.program.class(f.class).name, f.name)
            }
            Pointer::InstanceField { obj, field } => {
                format!("{}.{}", self.obj_display(obj), self.program.field(field).name)
            }
            Pointer::ArrayIndex(obj) => format!("{}[*]", self.obj_display(obj)),
        }
    }

    pub fn obj_display(&self, obj: ObjId) -> String {
        let o = self.heap.obj(obj);
        match o.kind {
            ObjKind::Alloc(site) => {
                let alloc = self.program.alloc_site(site);
                format!(
                    "new {} in {} @{:?}",
                    self.program.class(alloc.ty).name,
                    self.program.method_display(alloc.method),
                    o.cid,
                )
            }
            ObjKind::Taint { source, ty } => {
                format!(
                    "taint[{}] from {}",
                    self.program.class(ty).name,
                    self.callsite_display(source)
                )
            }
        }
    }

    pub fn callsite_display(&self, site: CallSiteId) -> String {
        let cs = self.program.call_site(site);
        format!(
            "{}/invoke#{} <{}: {}>",
            self.program.method_display(cs.caller),
            site.0,
            self.program.class(cs.declared_class).name,
            self.program.subsig_str(cs.subsig),
        )
    }
}
