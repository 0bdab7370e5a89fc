// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

//! Statements of the analyzed intermediate representation.
//!
//! The statement kinds form a closed sum type; the solver dispatches on it
//! with a single `match` rather than open-ended double dispatch.

use super::program::{AllocId, ClassId, FieldId, MethodId, SubsigId, VarId};

/// Unique identifier of an interned call site.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct CallSiteId(pub u32);

/// The dispatch style of a call site.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum CallKind {
    Static,
    Special,
    Virtual,
    Interface,
}

/// An interned call site. The receiver is `None` for static calls, the
/// result is `None` when the call's value is discarded.
#[derive(Clone, Debug)]
pub struct CallSite {
    pub id: CallSiteId,
    /// The method containing this call.
    pub caller: MethodId,
    pub kind: CallKind,
    /// The class declaring the target method reference.
    pub declared_class: ClassId,
    pub subsig: SubsigId,
    pub recv: Option<VarId>,
    pub args: Vec<VarId>,
    pub result: Option<VarId>,
}

#[derive(Clone, Debug)]
pub enum Stmt {
    /// `x = new T`, where the allocation site carries the type.
    New { lhs: VarId, site: AllocId },
    /// `x = y`
    Copy { lhs: VarId, rhs: VarId },
    /// `x = C.f`
    StaticLoad { lhs: VarId, field: FieldId },
    /// `C.f = y`
    StaticStore { field: FieldId, rhs: VarId },
    /// `x = base.f`
    InstanceLoad { lhs: VarId, base: VarId, field: FieldId },
    /// `base.f = y`
    InstanceStore { base: VarId, field: FieldId, rhs: VarId },
    /// `x = base[i]`; indices are collapsed to one abstract slot per object.
    ArrayLoad { lhs: VarId, base: VarId },
    /// `base[i] = y`
    ArrayStore { base: VarId, rhs: VarId },
    /// Any invocation; the payload is interned in the program.
    Invoke(CallSiteId),
    /// `return x`
    Return(VarId),
}
