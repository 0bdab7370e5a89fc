// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

pub mod context_strategy;
pub mod dispatch;
pub mod heap;
pub mod result;
pub mod solver;
pub mod taint;

use anyhow::Result;

use crate::ir::program::Program;
use crate::pts_set::points_to::HybridPointsToSet;

use self::context_strategy::{ContextInsensitive, KCallSiteSensitive, KObjectSensitive};
use self::heap::ObjId;
use self::result::PTAResult;
use self::solver::PointerAnalysis;
use self::taint::TaintConfig;

/// The points-to set representation used throughout the analysis.
pub type PointsTo = HybridPointsToSet<ObjId>;

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum AnalysisKind {
    ContextInsensitive,
    CallSiteSensitive,
    ObjectSensitive,
}

/// Runs one analysis to completion under the selected context strategy.
/// `depth` is the k of the k-limited strategies and is ignored in
/// context-insensitive mode.
pub fn run_pta(
    program: &Program,
    kind: AnalysisKind,
    depth: usize,
    taint: TaintConfig,
) -> Result<PTAResult<'_>> {
    match kind {
        AnalysisKind::ContextInsensitive => {
            PointerAnalysis::new(program, ContextInsensitive, taint).solve()
        }
        AnalysisKind::CallSiteSensitive => {
            PointerAnalysis::new(program, KCallSiteSensitive::new(depth), taint).solve()
        }
        AnalysisKind::ObjectSensitive => {
            PointerAnalysis::new(program, KObjectSensitive::new(depth), taint).solve()
        }
    }
}
