// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

//! The call graph, discovered on the fly during points-to propagation.
//!
//! Nodes are context-qualified methods; in context-insensitive mode every
//! node simply carries the empty context. Reachability is monotonic: a
//! method node, once added, is never revoked, and newly added nodes are
//! appended to a queue the solver consumes with a cursor while the queue
//! keeps growing.

use petgraph::graph::{DefaultIx, EdgeIndex, NodeIndex};
use petgraph::Graph;
use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};
use std::fmt::Write as _;

use crate::ir::context::ContextId;
use crate::ir::program::{MethodId, Program};
use crate::ir::statement::{CallKind, CallSiteId};

/// Unique identifiers for call graph nodes.
pub type CGNodeId = NodeIndex<DefaultIx>;
/// Unique identifiers for call graph edges.
pub type CGEdgeId = EdgeIndex<DefaultIx>;

/// A context-qualified method.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct CSMethodId {
    pub cid: ContextId,
    pub method: MethodId,
}

impl CSMethodId {
    pub fn new(cid: ContextId, method: MethodId) -> Self {
        CSMethodId { cid, method }
    }
}

/// A context-qualified call site.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct CSCallSiteId {
    pub cid: ContextId,
    pub site: CallSiteId,
}

impl CSCallSiteId {
    pub fn new(cid: ContextId, site: CallSiteId) -> Self {
        CSCallSiteId { cid, site }
    }
}

pub struct CallGraph {
    /// The graph structure capturing call relationships.
    graph: Graph<CSMethodId, CSCallSiteId>,
    /// A map from methods to their corresponding call graph nodes.
    method_nodes: HashMap<CSMethodId, CGNodeId>,
    /// A map from call sites to call graph edges.
    callsite_to_edges: HashMap<CSCallSiteId, HashSet<CGEdgeId>>,
    /// The call kind of each call site with at least one resolved edge.
    callsite_kinds: HashMap<CallSiteId, CallKind>,
    /// Append-only queue of reachable methods, in discovery order. The
    /// solver walks it with a cursor while new methods are still appended.
    reach_methods: Vec<CSMethodId>,
}

impl CallGraph {
    pub fn new() -> Self {
        CallGraph {
            graph: Graph::new(),
            method_nodes: HashMap::new(),
            callsite_to_edges: HashMap::new(),
            callsite_kinds: HashMap::new(),
            reach_methods: Vec::new(),
        }
    }

    /// Add a new node to the call graph, marking the method reachable.
    pub fn add_node(&mut self, method: CSMethodId) {
        self.get_or_insert_node(method);
    }

    /// Helper function to get a node or insert a new
    /// node if it does not exist in the map.
    fn get_or_insert_node(&mut self, method: CSMethodId) -> CGNodeId {
        match self.method_nodes.entry(method) {
            Entry::Occupied(o) => *o.get(),
            Entry::Vacant(v) => {
                self.reach_methods.push(method);
                let node_id = self.graph.add_node(method);
                *v.insert(node_id)
            }
        }
    }

    pub fn is_reachable(&self, method: CSMethodId) -> bool {
        self.method_nodes.contains_key(&method)
    }

    /// All methods a call site resolves to so far.
    pub fn get_callees(&self, callsite: &CSCallSiteId) -> HashSet<CSMethodId> {
        if let Some(edges) = self.callsite_to_edges.get(callsite) {
            edges
                .iter()
                .filter_map(|edge_id| match self.graph.edge_endpoints(*edge_id) {
                    Some((_, target)) => self.graph.node_weight(target).copied(),
                    None => None,
                })
                .collect()
        } else {
            HashSet::new()
        }
    }

    /// Returns true if an edge to the callee already exists for the callsite.
    pub fn has_edge(&self, callsite: &CSCallSiteId, callee: CSMethodId) -> bool {
        self.get_callees(callsite).contains(&callee)
    }

    /// Adds a new edge to the call graph.
    /// The edge is a call from `caller` to `callee` at `callsite`.
    /// Returns false if the edge already existed, and true otherwise.
    pub fn add_edge(
        &mut self,
        callsite: CSCallSiteId,
        kind: CallKind,
        caller: CSMethodId,
        callee: CSMethodId,
    ) -> bool {
        if self.has_edge(&callsite, callee) {
            return false;
        }
        let caller_node = self.get_or_insert_node(caller);
        let callee_node = self.get_or_insert_node(callee);
        let edge_id = self.graph.add_edge(caller_node, callee_node, callsite);
        self.callsite_to_edges
            .entry(callsite)
            .or_default()
            .insert(edge_id);
        self.callsite_kinds.insert(callsite.site, kind);
        true
    }

    pub fn get_callsite_kind(&self, callsite: CallSiteId) -> Option<CallKind> {
        self.callsite_kinds.get(&callsite).copied()
    }

    /// The reachable methods in discovery order. The slice only ever grows.
    pub fn reach_methods(&self) -> &[CSMethodId] {
        &self.reach_methods
    }

    pub fn num_reachable(&self) -> usize {
        self.reach_methods.len()
    }

    pub fn num_edges(&self) -> usize {
        self.graph.edge_count()
    }

    /// Iterates over all call edges as (callsite, caller, callee).
    pub fn edges(&self) -> impl Iterator<Item = (CSCallSiteId, CSMethodId, CSMethodId)> + '_ {
        self.graph.edge_indices().map(move |edge_id| {
            let (src, dst) = self
                .graph
                .edge_endpoints(edge_id)
                .expect("dangling call graph edge");
            (
                *self.graph.edge_weight(edge_id).unwrap(),
                *self.graph.node_weight(src).unwrap(),
                *self.graph.node_weight(dst).unwrap(),
            )
        })
    }

    /// Render the call graph in DOT format for displaying with Graphviz.
    pub fn to_dot(&self, program: &Program) -> String {
        let mut out = String::from("digraph call_graph {\n");
        for (method, node_id) in &self.method_nodes {
            let _ = writeln!(
                out,
                "    n{} [label=\"{} @{:?}\"];",
                node_id.index(),
                program.method_display(method.method),
                method.cid,
            );
        }
        for edge_id in self.graph.edge_indices() {
            if let Some((src, dst)) = self.graph.edge_endpoints(edge_id) {
                let callsite = self.graph.edge_weight(edge_id).unwrap();
                let _ = writeln!(
                    out,
                    "    n{} -> n{} [label=\"{:?}\"];",
                    src.index(),
                    dst.index(),
                    callsite.site,
                );
            }
        }
        out.push_str("}\n");
        out
    }
}

impl Default for CallGraph {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn m(id: u32) -> CSMethodId {
        CSMethodId::new(ContextId(0), MethodId(id))
    }

    #[test]
    fn edge_deduplication() {
        let mut cg = CallGraph::new();
        let site = CSCallSiteId::new(ContextId(0), CallSiteId(0));
        assert!(cg.add_edge(site, CallKind::Virtual, m(0), m(1)));
        assert!(!cg.add_edge(site, CallKind::Virtual, m(0), m(1)));
        assert!(cg.add_edge(site, CallKind::Virtual, m(0), m(2)));
        assert_eq!(cg.num_edges(), 2);
        assert_eq!(cg.get_callees(&site).len(), 2);
    }

    #[test]
    fn reachability_is_monotonic() {
        let mut cg = CallGraph::new();
        cg.add_node(m(0));
        cg.add_node(m(0));
        assert_eq!(cg.reach_methods(), &[m(0)]);
        let site = CSCallSiteId::new(ContextId(0), CallSiteId(1));
        cg.add_edge(site, CallKind::Static, m(0), m(5));
        assert_eq!(cg.reach_methods(), &[m(0), m(5)]);
        assert!(cg.is_reachable(m(5)));
        assert!(!cg.is_reachable(m(6)));
    }
}
