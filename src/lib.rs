// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

//! A whole-program pointer analysis for a Java-like intermediate
//! representation, with on-the-fly call graph construction, pluggable
//! context sensitivity and a taint-tracking plugin layered on top of
//! the points-to fixed point.

#![allow(
    clippy::single_match,
    clippy::needless_lifetimes,
    clippy::needless_return,
    clippy::len_zero
)]

pub mod graph;
pub mod ir;
pub mod pta;
pub mod pts_set;
pub mod util;
