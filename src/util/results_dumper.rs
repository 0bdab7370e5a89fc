// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

use itertools::Itertools;
use log::*;
use std::collections::{BTreeMap, BTreeSet};
use std::fs::File;
use std::io::{BufWriter, Write};

use crate::graph::pfg::Pointer;
use crate::ir::program::MethodId;
use crate::pta::result::PTAResult;
use crate::pts_set::points_to::PointsToSet;
use crate::util::options::AnalysisOptions;

pub fn dump_results(result: &PTAResult<'_>, options: &AnalysisOptions) {
    if let Some(pts_output) = &options.pts_output {
        info!("Dumping points-to results...");
        dump_pts(result, pts_output);
    }

    if let Some(cg_output) = &options.call_graph_output {
        info!("Dumping call graph...");
        dump_call_graph(result, cg_output);
    }
}

fn writer_for(path: &String) -> BufWriter<Box<dyn Write>> {
    BufWriter::new(match &path[..] {
        "stdout" => Box::new(std::io::stdout()) as Box<dyn Write>,
        _ => Box::new(File::create(path).expect("Unable to create file")) as Box<dyn Write>,
    })
}

pub fn dump_call_graph(result: &PTAResult<'_>, dot_path: &String) {
    let mut writer = writer_for(dot_path);
    writer
        .write_all(result.call_graph().to_dot(result.program()).as_bytes())
        .expect("Unable to write data");
}

/// Writes every non-empty points-to set, grouped by the owning method for
/// variable pointers, with field, array and static pointers at the end.
pub fn dump_pts(result: &PTAResult<'_>, pts_path: &String) {
    let mut writer = writer_for(pts_path);

    let mut grouped: BTreeMap<MethodId, BTreeSet<String>> = BTreeMap::new();
    let mut others: BTreeSet<String> = BTreeSet::new();
    for (pointer, pts) in result.iter_pointers() {
        if pts.is_empty() {
            continue;
        }
        let line = format!(
            "{} ==> {{ {} }}",
            result.pointer_display(pointer),
            pts.iter().map(|obj| result.obj_display(obj)).join(", "),
        );
        match pointer {
            Pointer::Var { var, .. } => {
                let method = result.program().var(*var).method;
                grouped.entry(method).or_default().insert(line);
            }
            _ => {
                others.insert(line);
            }
        }
    }

    for (method, lines) in grouped {
        writer
            .write_all(format!("{}\n", result.program().method_display(method)).as_bytes())
            .expect("Unable to write data");
        for line in lines {
            writer
                .write_all(format!("\t{}\n", line).as_bytes())
                .expect("Unable to write data");
        }
    }
    if !others.is_empty() {
        writer
            .write_all("[fields and arrays]\n".as_bytes())
            .expect("Unable to write data");
        for line in others {
            writer
                .write_all(format!("\t{}\n", line).as_bytes())
                .expect("Unable to write data");
        }
    }
}
