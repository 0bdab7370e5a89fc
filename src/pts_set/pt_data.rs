// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::hash::Hash;

use super::points_to::PointsToSet;
use crate::util::bit_vec::Idx;

/// Per-pointer points-to storage.
///
/// Each key owns exactly one points-to set; additions are idempotent and the
/// sets only grow. A reverse map from objects to the pointers containing them
/// is maintained for result queries.
///
/// K  (Key):     "owning" pointer of a points-to set.
/// D  (Data):    elements in points-to sets.
/// DS (DataSet): the points-to set; a collection of Data.
pub struct PTData<K, D, DS> {
    pts_map: HashMap<K, DS>,
    rev_pts_map: HashMap<D, HashSet<K>>,
}

impl<K, D, DS> fmt::Debug for PTData<K, D, DS> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        "PTData".fmt(f)
    }
}

impl<K, D, DS> PTData<K, D, DS>
where
    K: Hash + Eq + Copy,
    D: Idx,
    DS: PointsToSet<D>,
{
    pub fn new() -> PTData<K, D, DS> {
        PTData {
            pts_map: HashMap::new(),
            rev_pts_map: HashMap::new(),
        }
    }

    /// Return Points-to map
    #[inline]
    pub fn pts_map(&self) -> &HashMap<K, DS> {
        &self.pts_map
    }

    /// Get points-to set of a pointer.
    #[inline]
    pub fn get_pts(&self, ptr: K) -> Option<&DS> {
        self.pts_map.get(&ptr)
    }

    /// Returns true if `elem` is already in the points-to set of `ptr`.
    #[inline]
    pub fn contains(&self, ptr: K, elem: D) -> bool {
        self.pts_map.get(&ptr).map_or(false, |pts| pts.contains(elem))
    }

    /// Get reverse points-to set of an elem.
    #[inline]
    pub fn get_rev_pts(&self, elem: D) -> Option<&HashSet<K>> {
        self.rev_pts_map.get(&elem)
    }

    /// Adds element to the points-to set associated with ptr.
    pub fn add_pts(&mut self, ptr: K, elem: D) -> bool {
        self.rev_pts_map.entry(elem).or_default().insert(ptr);
        self.pts_map.entry(ptr).or_insert_with(DS::new).insert(elem)
    }

    /// Performs pts(ptr) = pts(ptr) U src_ds.
    pub fn union_pts_to(&mut self, ptr: K, src_ds: &DS) -> bool {
        for elem in src_ds.iter() {
            self.rev_pts_map.entry(elem).or_default().insert(ptr);
        }
        let dst_ds = self.pts_map.entry(ptr).or_insert_with(DS::new);
        dst_ds.union(src_ds)
    }
}

impl<K, D, DS> Default for PTData<K, D, DS>
where
    K: Hash + Eq + Copy,
    D: Idx,
    DS: PointsToSet<D>,
{
    fn default() -> Self {
        Self::new()
    }
}
