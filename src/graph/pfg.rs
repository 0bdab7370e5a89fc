// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

//! The pointer flow graph (PFG).
//!
//! Nodes are pointers, edges mean "whatever newly appears in the source's
//! points-to set must also appear in the target's". Pointer identity is
//! memoized: requesting the node for the same logical pointer always
//! returns the same node id, which is what the points-to data is keyed by.

use petgraph::graph::{DefaultIx, NodeIndex};
use petgraph::Graph;
use std::collections::hash_map::Entry;
use std::collections::{BTreeSet, HashMap};

use crate::ir::context::ContextId;
use crate::ir::program::{FieldId, VarId};
use crate::pta::heap::ObjId;

/// Unique identifiers for pointer flow graph nodes.
pub type PFGNodeId = NodeIndex<DefaultIx>;

/// The four pointer kinds tracked by the analysis.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum Pointer {
    /// A local variable under a calling context.
    Var { cid: ContextId, var: VarId },
    /// A static field; context-free by construction.
    StaticField(FieldId),
    /// An instance field of an abstract heap object.
    InstanceField { obj: ObjId, field: FieldId },
    /// The single abstract element slot of an array object.
    ArrayIndex(ObjId),
}

pub struct PointerFlowGraph {
    /// The graph structure; node weights are the pointers themselves.
    graph: Graph<Pointer, ()>,
    /// Memoized pointer identities.
    node_ids: HashMap<Pointer, PFGNodeId>,
    /// Successor sets, kept separately for O(log n) edge deduplication.
    succs: HashMap<PFGNodeId, BTreeSet<PFGNodeId>>,
}

impl PointerFlowGraph {
    pub fn new() -> Self {
        PointerFlowGraph {
            graph: Graph::new(),
            node_ids: HashMap::new(),
            succs: HashMap::new(),
        }
    }

    /// Returns the node for the given pointer, inserting it if absent.
    pub fn get_or_insert_node(&mut self, pointer: Pointer) -> PFGNodeId {
        match self.node_ids.entry(pointer) {
            Entry::Occupied(o) => *o.get(),
            Entry::Vacant(v) => {
                let id = self.graph.add_node(pointer);
                *v.insert(id)
            }
        }
    }

    /// Returns the node id of a pointer if it has been interned.
    pub fn node_id(&self, pointer: &Pointer) -> Option<PFGNodeId> {
        self.node_ids.get(pointer).copied()
    }

    pub fn pointer(&self, id: PFGNodeId) -> &Pointer {
        self.graph
            .node_weight(id)
            .expect("dangling pointer flow graph node id")
    }

    /// Adds the edge `src -> dst`. Returns false if the edge already
    /// existed, and true otherwise.
    pub fn add_edge(&mut self, src: PFGNodeId, dst: PFGNodeId) -> bool {
        if self.succs.entry(src).or_default().insert(dst) {
            self.graph.add_edge(src, dst, ());
            true
        } else {
            false
        }
    }

    pub fn succs_of(&self, id: PFGNodeId) -> impl Iterator<Item = PFGNodeId> + '_ {
        self.succs.get(&id).into_iter().flatten().copied()
    }

    pub fn iter_nodes(&self) -> impl Iterator<Item = (PFGNodeId, &Pointer)> {
        self.graph
            .node_indices()
            .map(move |id| (id, self.pointer(id)))
    }

    pub fn num_nodes(&self) -> usize {
        self.graph.node_count()
    }

    pub fn num_edges(&self) -> usize {
        self.graph.edge_count()
    }
}

impl Default for PointerFlowGraph {
    fn default() -> Self {
        Self::new()
    }
}
