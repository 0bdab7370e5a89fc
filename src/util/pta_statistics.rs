// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

use std::collections::{HashMap, HashSet};
use std::io::{BufWriter, Write};

use log::*;

use crate::graph::pfg::Pointer;
use crate::ir::program::{MethodId, VarId};
use crate::pta::heap::ObjKind;
use crate::pta::result::PTAResult;
use crate::pts_set::points_to::PointsToSet;

pub struct PTAStat<'a, 'pta> {
    result: &'a PTAResult<'pta>,
}

impl<'a, 'pta> PTAStat<'a, 'pta> {
    pub fn new(result: &'a PTAResult<'pta>) -> Self {
        PTAStat { result }
    }

    pub fn dump_stats(&self) {
        let mut stat_writer = BufWriter::new(Box::new(std::io::stdout()) as Box<dyn Write>);

        info!("Dumping pta statistics...");
        stat_writer
            .write_all("##########################################################\n".as_bytes())
            .expect("Unable to write data");
        self.dump_call_graph_stat(&mut stat_writer);
        stat_writer
            .write_all("----------------------------------------------------------\n".as_bytes())
            .expect("Unable to write data");
        self.dump_pts_stat(&mut stat_writer);
        stat_writer
            .write_all("##########################################################\n".as_bytes())
            .expect("Unable to write data");
    }

    pub fn dump_call_graph_stat<W: Write>(&self, stat_writer: &mut BufWriter<W>) {
        let result = self.result;
        let mut methods: HashSet<MethodId> = HashSet::new();
        for csm in result.reachable_methods() {
            methods.insert(csm.method);
        }
        let mut ci_edges: HashSet<(MethodId, MethodId)> = HashSet::new();
        for (_, caller, callee) in result.call_edges() {
            ci_edges.insert((caller.method, callee.method));
        }

        stat_writer
            .write_all("Call Graph Statistics: \n".as_bytes())
            .expect("Unable to write data");
        stat_writer
            .write_all(
                format!(
                    "#Reachable methods: {} ({} with contexts)\n",
                    methods.len(),
                    result.reachable_methods().len()
                )
                .as_bytes(),
            )
            .expect("Unable to write data");
        stat_writer
            .write_all(
                format!(
                    "#Call edges: {} ({} with contexts)\n",
                    ci_edges.len(),
                    result.call_graph().num_edges()
                )
                .as_bytes(),
            )
            .expect("Unable to write data");
        stat_writer
            .write_all(format!("#Contexts: {}\n", result.num_contexts()).as_bytes())
            .expect("Unable to write data");
    }

    pub fn dump_pts_stat<W: Write>(&self, stat_writer: &mut BufWriter<W>) {
        let result = self.result;
        let mut num_cs_pointers = 0usize;
        let mut num_cs_pts_relations = 0usize;
        let mut ci_pts: HashMap<VarId, HashSet<ObjKind>> = HashMap::new();
        for (pointer, pts) in result.iter_pointers() {
            if pts.is_empty() {
                continue;
            }
            num_cs_pointers += 1;
            num_cs_pts_relations += pts.count();
            if let Pointer::Var { var, .. } = pointer {
                let objs = ci_pts.entry(*var).or_default();
                for obj in pts.iter() {
                    objs.insert(result.heap().obj(obj).kind);
                }
            }
        }
        let avg_cs_pts = num_cs_pts_relations as f64 / num_cs_pointers.max(1) as f64;

        let num_ci_vars = ci_pts.len();
        let num_ci_pts_relations: usize = ci_pts.values().map(HashSet::len).sum();
        let avg_ci_pts = num_ci_pts_relations as f64 / num_ci_vars.max(1) as f64;

        stat_writer
            .write_all("Points-to Statistics: \n".as_bytes())
            .expect("Unable to write data");
        stat_writer
            .write_all(format!("#Pointers: {}\n", num_cs_pointers).as_bytes())
            .expect("Unable to write data");
        stat_writer
            .write_all(format!("#Points-to relations: {}\n", num_cs_pts_relations).as_bytes())
            .expect("Unable to write data");
        stat_writer
            .write_all(format!("#Avg points-to size: {}\n", avg_cs_pts).as_bytes())
            .expect("Unable to write data");
        stat_writer
            .write_all(format!("#CI variables: {}\n", num_ci_vars).as_bytes())
            .expect("Unable to write data");
        stat_writer
            .write_all(format!("#Avg CI points-to size: {}\n", avg_ci_pts).as_bytes())
            .expect("Unable to write data");
        stat_writer
            .write_all(format!("#Objects: {}\n", result.heap().num_objs()).as_bytes())
            .expect("Unable to write data");
        stat_writer
            .write_all(format!("#Taint flows: {}\n", result.taint_flows().len()).as_bytes())
            .expect("Unable to write data");
    }
}
