// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

//! Method dispatch.
//!
//! [`dispatch`] is the precise form the solver uses once the receiver's
//! runtime class is known: walk the superclass chain upward from the class
//! until a concrete (non-abstract) declaration of the subsignature is found.
//! [`resolve_cha`] is the class-hierarchy approximation used where no
//! points-to information is available: it dispatches from every class that
//! could stand behind the declared type of the call.

use std::collections::BTreeSet;

use crate::ir::program::{ClassId, MethodId, Program, SubsigId};
use crate::ir::statement::{CallKind, CallSite};

/// Finds the concrete method a receiver of class `class` runs for the given
/// subsignature. Returns `None` when the hierarchy provides no concrete
/// implementation, e.g. for an unimplemented abstract method.
pub fn dispatch(program: &Program, class: ClassId, subsig: SubsigId) -> Option<MethodId> {
    let mut cur = Some(class);
    while let Some(c) = cur {
        if let Some(m) = program.declared_method(c, subsig) {
            if !program.method(m).is_abstract {
                return Some(m);
            }
        }
        cur = program.class(c).superclass;
    }
    None
}

/// All classes whose instances may appear where the declared type is
/// `class`: the class itself plus its transitive subclasses, or, for an
/// interface, every implementor reached through the subinterface lattice
/// together with the implementors' subclasses.
fn possible_classes(program: &Program, class: ClassId) -> BTreeSet<ClassId> {
    let mut classes = BTreeSet::new();
    let mut ifaces = Vec::new();
    let mut worklist = vec![class];
    while let Some(c) = worklist.pop() {
        if program.class(c).is_interface {
            if ifaces.contains(&c) {
                continue;
            }
            ifaces.push(c);
            worklist.extend(program.direct_subinterfaces_of(c));
            worklist.extend(program.direct_implementors_of(c));
        } else {
            if !classes.insert(c) {
                continue;
            }
            worklist.extend(program.direct_subclasses_of(c));
        }
    }
    classes
}

/// Resolves a call site against the class hierarchy alone. The result is
/// deduplicated and sorted by method id, so repeated resolutions of the
/// same site enumerate candidates in one fixed order.
pub fn resolve_cha(program: &Program, site: &CallSite) -> Vec<MethodId> {
    let mut targets = BTreeSet::new();
    match site.kind {
        CallKind::Static => {
            if let Some(m) = program.declared_method(site.declared_class, site.subsig) {
                targets.insert(m);
            }
        }
        CallKind::Special => {
            if let Some(m) = dispatch(program, site.declared_class, site.subsig) {
                targets.insert(m);
            }
        }
        CallKind::Virtual | CallKind::Interface => {
            for class in possible_classes(program, site.declared_class) {
                if let Some(m) = dispatch(program, class, site.subsig) {
                    targets.insert(m);
                }
            }
        }
    }
    targets.into_iter().collect()
}
