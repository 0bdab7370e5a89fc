// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

pub mod context;
pub mod loader;
pub mod program;
pub mod statement;
