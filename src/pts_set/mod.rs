// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

pub mod points_to;
pub mod pt_data;
