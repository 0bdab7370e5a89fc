// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

//! The worklist fixed-point solver.
//!
//! One queue drives all three coupled fixed points: reachable methods,
//! points-to sets, and taint facts. Statements of a method are dispatched
//! into the pointer flow graph exactly once per (context, method) clone, at
//! the moment the clone becomes reachable; instance accesses and instance
//! calls are deferred until receiver objects actually arrive at the base
//! variable. Termination follows from monotonicity: points-to sets, PFG
//! edges and call edges only ever grow over finite domains.
//!
//! Dispatch misses are absorbed locally (logged, excluded from the call
//! graph); only missing entry points and malformed configuration are
//! reported as errors.

use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};

use anyhow::{anyhow, Result};
use log::{debug, info, trace, warn};

use crate::graph::call_graph::{CSCallSiteId, CSMethodId, CallGraph};
use crate::graph::pfg::{PFGNodeId, Pointer, PointerFlowGraph};
use crate::ir::context::ContextId;
use crate::ir::program::{MethodId, Program};
use crate::ir::statement::{CallKind, CallSiteId, Stmt};
use crate::pts_set::points_to::PointsToSet;
use crate::pts_set::pt_data::PTData;

use super::context_strategy::ContextStrategy;
use super::dispatch;
use super::heap::{HeapModel, ObjId, ObjKind};
use super::result::PTAResult;
use super::taint::{Slot, TaintConfig, TaintFlow, TaintTransfer};
use super::PointsTo;

type PointsToData = PTData<PFGNodeId, ObjId, PointsTo>;

pub struct PointerAnalysis<'pta, S: ContextStrategy> {
    program: &'pta Program,
    strategy: S,
    taint: TaintConfig,

    heap: HeapModel,
    pfg: PointerFlowGraph,
    pt_data: PointsToData,
    call_graph: CallGraph,

    /// Entries are (pointer, incoming delta); the points-to set itself is
    /// the authority on what is already known, so reprocessing is safe.
    worklist: VecDeque<(PFGNodeId, PointsTo)>,
    /// Position in the call graph's reachable-method queue up to which
    /// statements have been dispatched.
    reach_cursor: usize,

    /// Transfer edges that forward only taint objects.
    taint_edges: HashMap<PFGNodeId, BTreeSet<PFGNodeId>>,
    /// Sink argument positions observed at resolved calls.
    sink_calls: HashSet<(CSCallSiteId, usize)>,
}

impl<'pta, S: ContextStrategy> PointerAnalysis<'pta, S> {
    pub fn new(program: &'pta Program, strategy: S, taint: TaintConfig) -> Self {
        PointerAnalysis {
            program,
            strategy,
            taint,
            heap: HeapModel::new(),
            pfg: PointerFlowGraph::new(),
            pt_data: PTData::new(),
            call_graph: CallGraph::new(),
            worklist: VecDeque::new(),
            reach_cursor: 0,
            taint_edges: HashMap::new(),
            sink_calls: HashSet::new(),
        }
    }

    /// Runs the analysis to saturation and returns the result snapshot.
    pub fn solve(mut self) -> Result<PTAResult<'pta>> {
        let entry = self
            .program
            .entry()
            .ok_or_else(|| anyhow!("program has no entry method"))?;
        let entry_cid = self.strategy.empty_context();
        info!(
            "{} analysis from {}",
            self.strategy.name(),
            self.program.method_display(entry)
        );
        self.call_graph.add_node(CSMethodId::new(entry_cid, entry));

        loop {
            while self.reach_cursor < self.call_graph.num_reachable() {
                let csm = self.call_graph.reach_methods()[self.reach_cursor];
                self.reach_cursor += 1;
                self.process_new_method(csm);
            }
            match self.worklist.pop_front() {
                Some((node, incoming)) => self.process_entry(node, incoming),
                None => {
                    if self.reach_cursor == self.call_graph.num_reachable() {
                        break;
                    }
                }
            }
        }

        let taint_flows = self.collect_taint_flows();
        info!(
            "fixed point: {} reachable methods, {} call edges, {} pointers, {} objects, {} contexts",
            self.call_graph.num_reachable(),
            self.call_graph.num_edges(),
            self.pfg.num_nodes(),
            self.heap.num_objs(),
            self.strategy.num_contexts(),
        );
        Ok(PTAResult::new(
            self.program,
            self.pfg,
            self.pt_data,
            self.call_graph,
            self.heap,
            taint_flows,
            self.strategy.num_contexts(),
        ))
    }

    /// Dispatches the statements of a newly reachable (context, method)
    /// clone into the pointer flow graph and the worklist.
    fn process_new_method(&mut self, csm: CSMethodId) {
        let program = self.program;
        debug!(
            "reachable: {} @{:?}",
            program.method_display(csm.method),
            csm.cid
        );
        let cid = csm.cid;
        for stmt in &program.method(csm.method).body {
            match *stmt {
                Stmt::New { lhs, site } => {
                    let heap_cid = self.strategy.heap_context(cid);
                    let obj = self.heap.get_alloc_obj(heap_cid, site);
                    let node = self.pfg.get_or_insert_node(Pointer::Var { cid, var: lhs });
                    self.worklist.push_back((node, PointsTo::singleton(obj)));
                }
                Stmt::Copy { lhs, rhs } => {
                    self.add_pfg_edge(
                        Pointer::Var { cid, var: rhs },
                        Pointer::Var { cid, var: lhs },
                    );
                }
                Stmt::StaticLoad { lhs, field } => {
                    self.add_pfg_edge(
                        Pointer::StaticField(field),
                        Pointer::Var { cid, var: lhs },
                    );
                }
                Stmt::StaticStore { field, rhs } => {
                    self.add_pfg_edge(
                        Pointer::Var { cid, var: rhs },
                        Pointer::StaticField(field),
                    );
                }
                Stmt::Invoke(site) => {
                    if program.call_site(site).kind == CallKind::Static {
                        self.process_static_call(csm, site);
                    }
                    // instance calls wait for receiver objects
                }
                // resolved when objects reach the base variable
                Stmt::InstanceLoad { .. }
                | Stmt::InstanceStore { .. }
                | Stmt::ArrayLoad { .. }
                | Stmt::ArrayStore { .. }
                | Stmt::Return(_) => {}
            }
        }
    }

    /// Pops one worklist entry: computes the not-yet-known delta, merges it,
    /// forwards it along PFG and transfer edges, and for variable pointers
    /// resolves instance accesses and calls against each new object.
    fn process_entry(&mut self, node: PFGNodeId, incoming: PointsTo) {
        let mut delta = PointsTo::new();
        for obj in incoming.iter() {
            if !self.pt_data.contains(node, obj) {
                delta.insert(obj);
            }
        }
        if delta.is_empty() {
            return;
        }
        self.pt_data.union_pts_to(node, &delta);
        trace!("propagate {:?} += {:?}", self.pfg.pointer(node), delta);

        let succs: Vec<PFGNodeId> = self.pfg.succs_of(node).collect();
        for succ in succs {
            self.worklist.push_back((succ, delta.clone()));
        }

        if !self.taint_edges.is_empty() {
            let mut taint_delta = PointsTo::new();
            for obj in delta.iter() {
                if self.heap.is_taint(obj) {
                    taint_delta.insert(obj);
                }
            }
            if !taint_delta.is_empty() {
                let taint_succs: Vec<PFGNodeId> = self
                    .taint_edges
                    .get(&node)
                    .into_iter()
                    .flatten()
                    .copied()
                    .collect();
                for succ in taint_succs {
                    self.worklist.push_back((succ, taint_delta.clone()));
                }
            }
        }

        if let Pointer::Var { cid, var } = *self.pfg.pointer(node) {
            let program = self.program;
            let objs: Vec<ObjId> = delta.iter().collect();
            for obj in objs {
                let access = program.var_access(var);
                for &(lhs, field) in &access.field_loads {
                    self.add_pfg_edge(
                        Pointer::InstanceField { obj, field },
                        Pointer::Var { cid, var: lhs },
                    );
                }
                for &(field, rhs) in &access.field_stores {
                    self.add_pfg_edge(
                        Pointer::Var { cid, var: rhs },
                        Pointer::InstanceField { obj, field },
                    );
                }
                for &lhs in &access.array_loads {
                    self.add_pfg_edge(Pointer::ArrayIndex(obj), Pointer::Var { cid, var: lhs });
                }
                for &rhs in &access.array_stores {
                    self.add_pfg_edge(Pointer::Var { cid, var: rhs }, Pointer::ArrayIndex(obj));
                }
                for &site in &access.invokes {
                    self.process_instance_call(cid, site, obj);
                }
            }
        }
    }

    /// Adds a PFG edge; a new edge retroactively flows whatever the source
    /// already points to.
    fn add_pfg_edge(&mut self, src: Pointer, dst: Pointer) {
        let src_node = self.pfg.get_or_insert_node(src);
        let dst_node = self.pfg.get_or_insert_node(dst);
        if self.pfg.add_edge(src_node, dst_node) {
            if let Some(pts) = self.pt_data.get_pts(src_node) {
                if !pts.is_empty() {
                    self.worklist.push_back((dst_node, pts.clone()));
                }
            }
        }
    }

    /// Adds a transfer edge carrying only taint objects.
    fn add_taint_edge(&mut self, src: Pointer, dst: Pointer) {
        let src_node = self.pfg.get_or_insert_node(src);
        let dst_node = self.pfg.get_or_insert_node(dst);
        if self.taint_edges.entry(src_node).or_default().insert(dst_node) {
            if let Some(pts) = self.pt_data.get_pts(src_node) {
                let mut seed = PointsTo::new();
                for obj in pts.iter() {
                    if self.heap.is_taint(obj) {
                        seed.insert(obj);
                    }
                }
                if !seed.is_empty() {
                    self.worklist.push_back((dst_node, seed));
                }
            }
        }
    }

    fn process_static_call(&mut self, caller: CSMethodId, site_id: CallSiteId) {
        let program = self.program;
        let site = program.call_site(site_id);
        let callee = match program.declared_method(site.declared_class, site.subsig) {
            Some(m) if !program.method(m).is_abstract => m,
            _ => {
                warn!(
                    "unresolved static call to <{}: {}>, skipped",
                    program.class(site.declared_class).name,
                    program.subsig_str(site.subsig)
                );
                return;
            }
        };
        let callee_cid = self.strategy.static_call_context(caller.cid, site_id);
        let cs_site = CSCallSiteId::new(caller.cid, site_id);
        let callee_csm = CSMethodId::new(callee_cid, callee);
        if self
            .call_graph
            .add_edge(cs_site, CallKind::Static, caller, callee_csm)
        {
            self.handle_arg_and_ret(caller.cid, site_id, callee_cid, callee);
            self.on_call_resolved(caller.cid, site_id, callee);
        }
    }

    /// Resolves an instance call for one receiver object newly arrived at
    /// the receiver variable.
    fn process_instance_call(&mut self, caller_cid: ContextId, site_id: CallSiteId, obj: ObjId) {
        let program = self.program;
        let site = program.call_site(site_id);
        let kind = site.kind;
        let callee = match kind {
            CallKind::Virtual | CallKind::Interface => {
                let class = self.heap.obj_class(program, obj);
                dispatch::dispatch(program, class, site.subsig)
            }
            CallKind::Special => dispatch::dispatch(program, site.declared_class, site.subsig),
            CallKind::Static => unreachable!("static call with a receiver"),
        };
        let Some(callee) = callee else {
            trace!(
                "no dispatch target for <{}: {}>, skipped",
                program.class(site.declared_class).name,
                program.subsig_str(site.subsig)
            );
            return;
        };

        let recv = *self.heap.obj(obj);
        let recv_site = match recv.kind {
            ObjKind::Alloc(site) => Some(site),
            ObjKind::Taint { .. } => None,
        };
        let callee_cid =
            self.strategy
                .instance_call_context(caller_cid, site_id, recv.cid, recv_site);

        if let Some(this) = program.method(callee).this_var {
            let node = self.pfg.get_or_insert_node(Pointer::Var {
                cid: callee_cid,
                var: this,
            });
            self.worklist.push_back((node, PointsTo::singleton(obj)));
        }

        let cs_site = CSCallSiteId::new(caller_cid, site_id);
        let caller_csm = CSMethodId::new(caller_cid, site.caller);
        let callee_csm = CSMethodId::new(callee_cid, callee);
        if self.call_graph.add_edge(cs_site, kind, caller_csm, callee_csm) {
            self.handle_arg_and_ret(caller_cid, site_id, callee_cid, callee);
            self.on_call_resolved(caller_cid, site_id, callee);
        }
    }

    /// Binds arguments to parameters and return variables to the receiving
    /// variable; run once per distinct call edge.
    fn handle_arg_and_ret(
        &mut self,
        caller_cid: ContextId,
        site_id: CallSiteId,
        callee_cid: ContextId,
        callee: MethodId,
    ) {
        let program = self.program;
        let site = program.call_site(site_id);
        let callee_m = program.method(callee);
        if site.args.len() != callee_m.params.len() {
            warn!(
                "arity mismatch at call to {}, extra positions ignored",
                program.method_display(callee)
            );
        }
        for (&arg, &param) in site.args.iter().zip(callee_m.params.iter()) {
            self.add_pfg_edge(
                Pointer::Var {
                    cid: caller_cid,
                    var: arg,
                },
                Pointer::Var {
                    cid: callee_cid,
                    var: param,
                },
            );
        }
        if let Some(result) = site.result {
            for &ret in &callee_m.return_vars {
                self.add_pfg_edge(
                    Pointer::Var {
                        cid: callee_cid,
                        var: ret,
                    },
                    Pointer::Var {
                        cid: caller_cid,
                        var: result,
                    },
                );
            }
        }
    }

    /// Taint hooks, run once per distinct call edge: seed sources, record
    /// sinks, install transfer edges.
    fn on_call_resolved(&mut self, caller_cid: ContextId, site_id: CallSiteId, callee: MethodId) {
        if self.taint.is_empty() {
            return;
        }
        let program = self.program;
        let site = program.call_site(site_id);

        if let Some(ty) = self.taint.source_type(callee) {
            if let Some(result) = site.result {
                let empty_cid = self.strategy.empty_context();
                let obj = self.heap.get_taint_obj(empty_cid, site_id, ty);
                let node = self.pfg.get_or_insert_node(Pointer::Var {
                    cid: caller_cid,
                    var: result,
                });
                self.worklist.push_back((node, PointsTo::singleton(obj)));
            }
        }

        for &index in self.taint.sink_indexes(callee) {
            if index < site.args.len() {
                self.sink_calls
                    .insert((CSCallSiteId::new(caller_cid, site_id), index));
            }
        }

        let transfers: Vec<TaintTransfer> = self.taint.transfers(callee).to_vec();
        for transfer in transfers {
            let from = slot_var(site, transfer.from);
            let to = slot_var(site, transfer.to);
            if let (Some(from), Some(to)) = (from, to) {
                self.add_taint_edge(
                    Pointer::Var {
                        cid: caller_cid,
                        var: from,
                    },
                    Pointer::Var {
                        cid: caller_cid,
                        var: to,
                    },
                );
            }
        }
    }

    /// After the worklist drains: for every recorded sink position, report
    /// every taint object that reached the argument. The set is
    /// deduplicated and ordered by (source, sink, index).
    fn collect_taint_flows(&self) -> Vec<TaintFlow> {
        let mut flows = BTreeSet::new();
        for &(cs_site, index) in &self.sink_calls {
            let site = self.program.call_site(cs_site.site);
            let Some(&arg) = site.args.get(index) else {
                continue;
            };
            let pointer = Pointer::Var {
                cid: cs_site.cid,
                var: arg,
            };
            let Some(node) = self.pfg.node_id(&pointer) else {
                continue;
            };
            let Some(pts) = self.pt_data.get_pts(node) else {
                continue;
            };
            for obj in pts.iter() {
                if let Some(source) = self.heap.taint_source(obj) {
                    flows.insert(TaintFlow {
                        source,
                        sink: cs_site.site,
                        index,
                    });
                }
            }
        }
        flows.into_iter().collect()
    }
}

fn slot_var(site: &crate::ir::statement::CallSite, slot: Slot) -> Option<crate::ir::program::VarId> {
    match slot {
        Slot::Arg(i) => site.args.get(i).copied(),
        Slot::Base => site.recv,
        Slot::Result => site.result,
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::ir::program::{ProgramBuilder, VarId};
    use crate::pta::context_strategy::{
        ContextInsensitive, KCallSiteSensitive, KObjectSensitive,
    };

    fn run_ci(program: &Program) -> PTAResult<'_> {
        PointerAnalysis::new(program, ContextInsensitive, TaintConfig::empty())
            .solve()
            .unwrap()
    }

    fn pts_names(result: &PTAResult<'_>, cid: ContextId, var: VarId) -> usize {
        result.points_to(cid, var).map_or(0, |pts| pts.count())
    }

    #[test]
    fn copy_propagates_allocation() {
        // x = new A; y = x;
        let mut b = ProgramBuilder::new();
        let a = b.class("A", None, &[], false);
        let main_cls = b.class("Main", None, &[], false);
        let main = b.method(main_cls, "main", "void main()", true, false, None);
        let x = b.var(main, "x");
        let y = b.var(main, "y");
        b.stmt_new(main, x, a);
        b.stmt_copy(main, y, x);
        b.set_entry(main);
        let program = b.finish();

        let result = run_ci(&program);
        let cid = ContextId(0);
        let x_pts: Vec<ObjId> = result.points_to(cid, x).unwrap().iter().collect();
        let y_pts: Vec<ObjId> = result.points_to(cid, y).unwrap().iter().collect();
        assert_eq!(x_pts.len(), 1);
        assert_eq!(x_pts, y_pts);
    }

    #[test]
    fn static_field_round_trip() {
        // C.f = x; y = C.f;  the static slot is a single global pointer
        let mut b = ProgramBuilder::new();
        let a_cls = b.class("A", None, &[], false);
        let c_cls = b.class("C", None, &[], false);
        let f = b.field(c_cls, "f", true);
        let main_cls = b.class("Main", None, &[], false);
        let main = b.method(main_cls, "main", "void main()", true, false, None);
        let x = b.var(main, "x");
        let y = b.var(main, "y");
        b.stmt_new(main, x, a_cls);
        b.stmt_static_store(main, f, x);
        b.stmt_static_load(main, y, f);
        b.set_entry(main);
        let program = b.finish();

        let result = run_ci(&program);
        let cid = ContextId(0);
        let x_pts: Vec<ObjId> = result.points_to(cid, x).unwrap().iter().collect();
        let y_pts: Vec<ObjId> = result.points_to(cid, y).unwrap().iter().collect();
        assert_eq!(x_pts.len(), 1);
        assert_eq!(x_pts, y_pts);
    }

    #[test]
    fn static_call_binds_params_and_returns() {
        // a = new A; r = id(a);   with  static A id(A p) { return p; }
        let mut b = ProgramBuilder::new();
        let a_cls = b.class("A", None, &[], false);
        let main_cls = b.class("Main", None, &[], false);
        let id = b.method(main_cls, "id", "A id(A)", true, false, Some(a_cls));
        let p = b.param(id, "p");
        b.stmt_return(id, p);
        let main = b.method(main_cls, "main", "void main()", true, false, None);
        let a = b.var(main, "a");
        let r = b.var(main, "r");
        b.stmt_new(main, a, a_cls);
        b.stmt_invoke(
            main,
            CallKind::Static,
            main_cls,
            "A id(A)",
            None,
            vec![a],
            Some(r),
        );
        b.set_entry(main);
        let program = b.finish();

        let result = run_ci(&program);
        let cid = ContextId(0);
        assert!(result.is_reachable(cid, id));
        assert_eq!(pts_names(&result, cid, p), 1);
        assert_eq!(pts_names(&result, cid, r), 1);
    }

    #[test]
    fn virtual_call_narrows_to_runtime_type() {
        // n = new Four(); n.get();  resolves only Four.get, not the other
        // overrides CHA would admit under the interface type.
        let mut b = ProgramBuilder::new();
        let number = b.interface("Number", &[]);
        let two = b.class("Two", None, &[number], false);
        let three = b.class("Three", Some(two), &[], false);
        let four = b.class("Four", Some(three), &[], false);
        let get_two = b.method(two, "get", "void get()", false, false, None);
        let get_three = b.method(three, "get", "void get()", false, false, None);
        let get_four = b.method(four, "get", "void get()", false, false, None);
        let main_cls = b.class("Main", None, &[], false);
        let main = b.method(main_cls, "main", "void main()", true, false, None);
        let n = b.var(main, "n");
        b.stmt_new(main, n, four);
        let site = b.stmt_invoke(
            main,
            CallKind::Interface,
            number,
            "void get()",
            Some(n),
            vec![],
            None,
        );
        b.set_entry(main);
        let program = b.finish();

        // CHA overapproximates to every override
        let cha = dispatch::resolve_cha(&program, program.call_site(site));
        assert_eq!(cha, vec![get_two, get_three, get_four]);

        let result = run_ci(&program);
        let cid = ContextId(0);
        let callees = result
            .call_graph()
            .get_callees(&CSCallSiteId::new(cid, site));
        assert_eq!(callees.len(), 1);
        assert!(callees.contains(&CSMethodId::new(cid, get_four)));
        assert!(result.is_reachable(cid, get_four));
        assert!(!result.is_reachable(cid, get_two));
        assert!(!result.is_reachable(cid, get_three));
    }

    #[test]
    fn instance_field_alias() {
        // a.f = x; y = a.f;  through the same base object flows x into y,
        // while a disjoint base object keeps z empty.
        let mut b = ProgramBuilder::new();
        let a_cls = b.class("A", None, &[], false);
        let b_cls = b.class("B", None, &[], false);
        let f = b.field(a_cls, "f", false);
        let main_cls = b.class("Main", None, &[], false);
        let main = b.method(main_cls, "main", "void main()", true, false, None);
        let a = b.var(main, "a");
        let other = b.var(main, "other");
        let x = b.var(main, "x");
        let y = b.var(main, "y");
        let z = b.var(main, "z");
        b.stmt_new(main, a, a_cls);
        b.stmt_new(main, other, a_cls);
        b.stmt_new(main, x, b_cls);
        b.stmt_instance_store(main, a, f, x);
        b.stmt_instance_load(main, y, a, f);
        b.stmt_instance_load(main, z, other, f);
        b.set_entry(main);
        let program = b.finish();

        let result = run_ci(&program);
        let cid = ContextId(0);
        let x_pts: Vec<ObjId> = result.points_to(cid, x).unwrap().iter().collect();
        let y_pts: Vec<ObjId> = result.points_to(cid, y).unwrap().iter().collect();
        assert_eq!(x_pts, y_pts);
        assert_eq!(pts_names(&result, cid, z), 0);
    }

    #[test]
    fn array_slots_are_collapsed() {
        // arr[0] = x; y = arr[1];  one abstract slot per array object
        let mut b = ProgramBuilder::new();
        let a_cls = b.class("A", None, &[], false);
        let arr_cls = b.class("A[]", None, &[], false);
        let main_cls = b.class("Main", None, &[], false);
        let main = b.method(main_cls, "main", "void main()", true, false, None);
        let arr = b.var(main, "arr");
        let x = b.var(main, "x");
        let y = b.var(main, "y");
        b.stmt_new(main, arr, arr_cls);
        b.stmt_new(main, x, a_cls);
        b.stmt_array_store(main, arr, x);
        b.stmt_array_load(main, y, arr);
        b.set_entry(main);
        let program = b.finish();

        let result = run_ci(&program);
        let cid = ContextId(0);
        let x_pts: Vec<ObjId> = result.points_to(cid, x).unwrap().iter().collect();
        let y_pts: Vec<ObjId> = result.points_to(cid, y).unwrap().iter().collect();
        assert_eq!(x_pts, y_pts);
    }

    fn two_site_identity_program() -> (Program, VarId, VarId) {
        // a1 = new A; a2 = new A; r1 = id(a1); r2 = id(a2);
        let mut b = ProgramBuilder::new();
        let a_cls = b.class("A", None, &[], false);
        let main_cls = b.class("Main", None, &[], false);
        let id = b.method(main_cls, "id", "A id(A)", true, false, Some(a_cls));
        let p = b.param(id, "p");
        b.stmt_return(id, p);
        let main = b.method(main_cls, "main", "void main()", true, false, None);
        let a1 = b.var(main, "a1");
        let a2 = b.var(main, "a2");
        let r1 = b.var(main, "r1");
        let r2 = b.var(main, "r2");
        b.stmt_new(main, a1, a_cls);
        b.stmt_new(main, a2, a_cls);
        b.stmt_invoke(main, CallKind::Static, main_cls, "A id(A)", None, vec![a1], Some(r1));
        b.stmt_invoke(main, CallKind::Static, main_cls, "A id(A)", None, vec![a2], Some(r2));
        b.set_entry(main);
        (b.finish(), r1, r2)
    }

    #[test]
    fn call_site_sensitivity_separates_identity_calls() {
        let (program, r1, r2) = two_site_identity_program();

        // context-insensitive: both results conflate the two objects
        let ci = run_ci(&program);
        assert_eq!(pts_names(&ci, ContextId(0), r1), 2);

        // 1-call-site: each result sees only its own argument
        let cs = PointerAnalysis::new(&program, KCallSiteSensitive::new(1), TaintConfig::empty())
            .solve()
            .unwrap();
        assert_eq!(pts_names(&cs, ContextId(0), r1), 1);
        assert_eq!(pts_names(&cs, ContextId(0), r2), 1);
        assert!(cs.num_contexts() > 1);
    }

    #[test]
    fn object_sensitivity_separates_receivers() {
        // b1 = new Box; b2 = new Box; r1 = b1.id(x1); r2 = b2.id(x2);
        let mut b = ProgramBuilder::new();
        let a_cls = b.class("A", None, &[], false);
        let box_cls = b.class("Box", None, &[], false);
        let id = b.method(box_cls, "id", "A id(A)", false, false, Some(a_cls));
        let p = b.param(id, "p");
        b.stmt_return(id, p);
        let main_cls = b.class("Main", None, &[], false);
        let main = b.method(main_cls, "main", "void main()", true, false, None);
        let b1 = b.var(main, "b1");
        let b2 = b.var(main, "b2");
        let x1 = b.var(main, "x1");
        let x2 = b.var(main, "x2");
        let r1 = b.var(main, "r1");
        let r2 = b.var(main, "r2");
        b.stmt_new(main, b1, box_cls);
        b.stmt_new(main, b2, box_cls);
        b.stmt_new(main, x1, a_cls);
        b.stmt_new(main, x2, a_cls);
        b.stmt_invoke(main, CallKind::Virtual, box_cls, "A id(A)", Some(b1), vec![x1], Some(r1));
        b.stmt_invoke(main, CallKind::Virtual, box_cls, "A id(A)", Some(b2), vec![x2], Some(r2));
        b.set_entry(main);
        let program = b.finish();

        let ci = run_ci(&program);
        assert_eq!(pts_names(&ci, ContextId(0), r1), 2);

        let obj = PointerAnalysis::new(&program, KObjectSensitive::new(1), TaintConfig::empty())
            .solve()
            .unwrap();
        assert_eq!(pts_names(&obj, ContextId(0), r1), 1);
        assert_eq!(pts_names(&obj, ContextId(0), r2), 1);
    }

    fn taint_program() -> (Program, CallSiteId, CallSiteId) {
        // t = source(); sink(t, clean);
        let mut b = ProgramBuilder::new();
        let s_cls = b.class("String", None, &[], false);
        let util = b.class("Util", None, &[], false);
        let source = b.method(util, "source", "String source()", true, false, Some(s_cls));
        let _ = source;
        let sink = b.method(util, "sink", "void sink(String,String)", true, false, None);
        b.param(sink, "p0");
        b.param(sink, "p1");
        let main_cls = b.class("Main", None, &[], false);
        let main = b.method(main_cls, "main", "void main()", true, false, None);
        let t = b.var(main, "t");
        let clean = b.var(main, "clean");
        b.stmt_new(main, clean, s_cls);
        let src_site = b.stmt_invoke(
            main,
            CallKind::Static,
            util,
            "String source()",
            None,
            vec![],
            Some(t),
        );
        let sink_site = b.stmt_invoke(
            main,
            CallKind::Static,
            util,
            "void sink(String,String)",
            None,
            vec![t, clean],
            None,
        );
        b.set_entry(main);
        (b.finish(), src_site, sink_site)
    }

    #[test]
    fn taint_flow_from_source_to_sink() {
        let (program, src_site, sink_site) = taint_program();
        let config = TaintConfig::from_json(
            r#"{
                "sources": [{"method": "Util#String source()", "type": "String"}],
                "sinks": [{"method": "Util#void sink(String,String)", "index": 0}]
            }"#,
            &program,
        )
        .unwrap();

        let result = PointerAnalysis::new(&program, ContextInsensitive, config)
            .solve()
            .unwrap();
        assert_eq!(
            result.taint_flows(),
            &[TaintFlow {
                source: src_site,
                sink: sink_site,
                index: 0
            }]
        );
    }

    #[test]
    fn taint_flow_requires_matching_index() {
        // the taint arrives at position 0 but only position 1 is monitored
        let (program, _, _) = taint_program();
        let config = TaintConfig::from_json(
            r#"{
                "sources": [{"method": "Util#String source()", "type": "String"}],
                "sinks": [{"method": "Util#void sink(String,String)", "index": 1}]
            }"#,
            &program,
        )
        .unwrap();

        let result = PointerAnalysis::new(&program, ContextInsensitive, config)
            .solve()
            .unwrap();
        assert!(result.taint_flows().is_empty());
    }

    #[test]
    fn taint_transfer_bypasses_callee_body() {
        // t = source(); s = wrap(t); sink(s);  wrap has an empty body but a
        // configured arg0-to-result transfer.
        let mut b = ProgramBuilder::new();
        let s_cls = b.class("String", None, &[], false);
        let util = b.class("Util", None, &[], false);
        b.method(util, "source", "String source()", true, false, Some(s_cls));
        let wrap = b.method(util, "wrap", "String wrap(String)", true, false, Some(s_cls));
        b.param(wrap, "w");
        let sink = b.method(util, "sink", "void sink(String)", true, false, None);
        b.param(sink, "p");
        let main_cls = b.class("Main", None, &[], false);
        let main = b.method(main_cls, "main", "void main()", true, false, None);
        let t = b.var(main, "t");
        let s = b.var(main, "s");
        let src_site = b.stmt_invoke(
            main,
            CallKind::Static,
            util,
            "String source()",
            None,
            vec![],
            Some(t),
        );
        b.stmt_invoke(
            main,
            CallKind::Static,
            util,
            "String wrap(String)",
            None,
            vec![t],
            Some(s),
        );
        let sink_site = b.stmt_invoke(
            main,
            CallKind::Static,
            util,
            "void sink(String)",
            None,
            vec![s],
            None,
        );
        b.set_entry(main);
        let program = b.finish();

        let config = TaintConfig::from_json(
            r#"{
                "sources": [{"method": "Util#String source()", "type": "String"}],
                "sinks": [{"method": "Util#void sink(String)", "index": 0}],
                "transfers": [
                    {"method": "Util#String wrap(String)", "from": 0, "to": -2, "type": "String"}
                ]
            }"#,
            &program,
        )
        .unwrap();

        let result = PointerAnalysis::new(&program, ContextInsensitive, config)
            .solve()
            .unwrap();
        assert_eq!(
            result.taint_flows(),
            &[TaintFlow {
                source: src_site,
                sink: sink_site,
                index: 0
            }]
        );
    }

    #[test]
    fn taint_transfer_into_receiver() {
        // t = source(); sb.append(t); sink(sb);  the arg0-to-base rule on
        // append taints the builder the argument was appended to.
        let mut b = ProgramBuilder::new();
        let s_cls = b.class("String", None, &[], false);
        let sb_cls = b.class("StringBuilder", None, &[], false);
        let append = b.method(sb_cls, "append", "void append(String)", false, false, None);
        b.param(append, "s");
        let util = b.class("Util", None, &[], false);
        b.method(util, "source", "String source()", true, false, Some(s_cls));
        let sink = b.method(util, "sink", "void sink(StringBuilder)", true, false, None);
        b.param(sink, "p");
        let main_cls = b.class("Main", None, &[], false);
        let main = b.method(main_cls, "main", "void main()", true, false, None);
        let sb = b.var(main, "sb");
        let t = b.var(main, "t");
        b.stmt_new(main, sb, sb_cls);
        let src_site = b.stmt_invoke(
            main,
            CallKind::Static,
            util,
            "String source()",
            None,
            vec![],
            Some(t),
        );
        b.stmt_invoke(
            main,
            CallKind::Virtual,
            sb_cls,
            "void append(String)",
            Some(sb),
            vec![t],
            None,
        );
        let sink_site = b.stmt_invoke(
            main,
            CallKind::Static,
            util,
            "void sink(StringBuilder)",
            None,
            vec![sb],
            None,
        );
        b.set_entry(main);
        let program = b.finish();

        let config = TaintConfig::from_json(
            r#"{
                "sources": [{"method": "Util#String source()", "type": "String"}],
                "sinks": [{"method": "Util#void sink(StringBuilder)", "index": 0}],
                "transfers": [
                    {"method": "StringBuilder#void append(String)", "from": 0, "to": -1, "type": "StringBuilder"}
                ]
            }"#,
            &program,
        )
        .unwrap();

        let result = PointerAnalysis::new(&program, ContextInsensitive, config)
            .solve()
            .unwrap();
        assert_eq!(
            result.taint_flows(),
            &[TaintFlow {
                source: src_site,
                sink: sink_site,
                index: 0
            }]
        );
    }

    #[test]
    fn reprocessing_a_known_delta_is_a_noop() {
        // feeding the same delta twice must not change the fixed point
        let mut b = ProgramBuilder::new();
        let a_cls = b.class("A", None, &[], false);
        let main_cls = b.class("Main", None, &[], false);
        let main = b.method(main_cls, "main", "void main()", true, false, None);
        let x = b.var(main, "x");
        let y = b.var(main, "y");
        b.stmt_new(main, x, a_cls);
        b.stmt_copy(main, y, x);
        b.set_entry(main);
        let program = b.finish();

        let mut analysis =
            PointerAnalysis::new(&program, ContextInsensitive, TaintConfig::empty());
        let cid = ContextId(0);
        analysis
            .call_graph
            .add_node(CSMethodId::new(cid, program.entry().unwrap()));
        // duplicate the initial seeds before running to saturation
        while analysis.reach_cursor < analysis.call_graph.num_reachable() {
            let m = analysis.call_graph.reach_methods()[analysis.reach_cursor];
            analysis.reach_cursor += 1;
            analysis.process_new_method(m);
        }
        let seeds: Vec<(PFGNodeId, PointsTo)> = analysis.worklist.iter().cloned().collect();
        analysis.worklist.extend(seeds);
        while let Some((node, incoming)) = analysis.worklist.pop_front() {
            analysis.process_entry(node, incoming);
        }
        let node = analysis
            .pfg
            .node_id(&Pointer::Var { cid, var: y })
            .unwrap();
        assert_eq!(analysis.pt_data.get_pts(node).unwrap().count(), 1);
    }
}
