// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

//! The in-memory program model consumed by the analysis.
//!
//! Classes, methods, variables, fields, call sites and allocation sites are
//! interned into arenas; the identifiers below index those arenas. A
//! [`Program`] is immutable once built; all derived tables (class hierarchy,
//! per-variable statement indexes) are computed when the
//! [`ProgramBuilder`] is finished.

use std::collections::HashMap;

use super::statement::{CallKind, CallSite, CallSiteId, Stmt};

#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct ClassId(pub u32);

#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct MethodId(pub u32);

#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct VarId(pub u32);

#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct FieldId(pub u32);

/// An interned method subsignature (return type, name and parameter types,
/// without the declaring class). Subsignatures are opaque tokens; only
/// equality matters for dispatch.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct SubsigId(pub u32);

/// An allocation site, i.e. a `new T` statement.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct AllocId(pub u32);

#[derive(Debug)]
pub struct Class {
    pub name: String,
    pub superclass: Option<ClassId>,
    /// Implemented interfaces for a class, extended interfaces for an
    /// interface.
    pub interfaces: Vec<ClassId>,
    pub is_interface: bool,
    pub is_abstract: bool,
    pub methods: Vec<MethodId>,
}

#[derive(Debug)]
pub struct Method {
    pub class: ClassId,
    pub name: String,
    pub subsig: SubsigId,
    pub is_static: bool,
    pub is_abstract: bool,
    /// Declared return type, if the method returns a reference type.
    pub ret_ty: Option<ClassId>,
    pub this_var: Option<VarId>,
    pub params: Vec<VarId>,
    /// Variables returned by the `Return` statements of the body.
    pub return_vars: Vec<VarId>,
    pub body: Vec<Stmt>,
}

#[derive(Debug)]
pub struct Var {
    pub method: MethodId,
    pub name: String,
}

#[derive(Debug)]
pub struct Field {
    pub class: ClassId,
    pub name: String,
    pub is_static: bool,
}

#[derive(Debug)]
pub struct AllocSite {
    pub method: MethodId,
    pub ty: ClassId,
}

/// Statements relevant to a variable, indexed when the program is sealed.
/// The solver consults these when new objects flow into the variable.
#[derive(Default, Debug)]
pub struct VarAccess {
    /// `lhs = v.f` statements with `v` as base.
    pub field_loads: Vec<(VarId, FieldId)>,
    /// `v.f = rhs` statements with `v` as base.
    pub field_stores: Vec<(FieldId, VarId)>,
    /// `lhs = v[i]` statements with `v` as base.
    pub array_loads: Vec<VarId>,
    /// `v[i] = rhs` statements with `v` as base.
    pub array_stores: Vec<VarId>,
    /// Call sites with `v` as receiver.
    pub invokes: Vec<CallSiteId>,
}

#[derive(Debug)]
pub struct Program {
    classes: Vec<Class>,
    methods: Vec<Method>,
    vars: Vec<Var>,
    fields: Vec<Field>,
    subsigs: Vec<String>,
    call_sites: Vec<CallSite>,
    alloc_sites: Vec<AllocSite>,

    class_index: HashMap<String, ClassId>,
    declared_methods: HashMap<(ClassId, SubsigId), MethodId>,

    direct_subclasses: Vec<Vec<ClassId>>,
    direct_subinterfaces: Vec<Vec<ClassId>>,
    direct_implementors: Vec<Vec<ClassId>>,

    var_access: Vec<VarAccess>,

    entry: Option<MethodId>,
}

impl Program {
    #[inline]
    pub fn class(&self, id: ClassId) -> &Class {
        &self.classes[id.0 as usize]
    }

    #[inline]
    pub fn method(&self, id: MethodId) -> &Method {
        &self.methods[id.0 as usize]
    }

    #[inline]
    pub fn var(&self, id: VarId) -> &Var {
        &self.vars[id.0 as usize]
    }

    #[inline]
    pub fn field(&self, id: FieldId) -> &Field {
        &self.fields[id.0 as usize]
    }

    #[inline]
    pub fn call_site(&self, id: CallSiteId) -> &CallSite {
        &self.call_sites[id.0 as usize]
    }

    #[inline]
    pub fn alloc_site(&self, id: AllocId) -> &AllocSite {
        &self.alloc_sites[id.0 as usize]
    }

    #[inline]
    pub fn subsig_str(&self, id: SubsigId) -> &str {
        &self.subsigs[id.0 as usize]
    }

    #[inline]
    pub fn num_classes(&self) -> usize {
        self.classes.len()
    }

    #[inline]
    pub fn num_methods(&self) -> usize {
        self.methods.len()
    }

    pub fn entry(&self) -> Option<MethodId> {
        self.entry
    }

    /// Overrides the entry method declared by the input program.
    pub fn set_entry(&mut self, method: MethodId) {
        self.entry = Some(method);
    }

    pub fn find_class(&self, name: &str) -> Option<ClassId> {
        self.class_index.get(name).copied()
    }

    pub fn find_subsig(&self, subsig: &str) -> Option<SubsigId> {
        self.subsigs
            .iter()
            .position(|s| s == subsig)
            .map(|i| SubsigId(i as u32))
    }

    /// Looks up a method by class name and subsignature string, e.g.
    /// `("Main", "void main()")`.
    pub fn find_method(&self, class: &str, subsig: &str) -> Option<MethodId> {
        let class = self.find_class(class)?;
        let subsig = self.find_subsig(subsig)?;
        self.declared_method(class, subsig)
    }

    /// The method declared directly by `class` with the given subsignature,
    /// without walking the hierarchy.
    pub fn declared_method(&self, class: ClassId, subsig: SubsigId) -> Option<MethodId> {
        self.declared_methods.get(&(class, subsig)).copied()
    }

    pub fn direct_subclasses_of(&self, class: ClassId) -> &[ClassId] {
        &self.direct_subclasses[class.0 as usize]
    }

    pub fn direct_subinterfaces_of(&self, iface: ClassId) -> &[ClassId] {
        &self.direct_subinterfaces[iface.0 as usize]
    }

    pub fn direct_implementors_of(&self, iface: ClassId) -> &[ClassId] {
        &self.direct_implementors[iface.0 as usize]
    }

    #[inline]
    pub fn var_access(&self, var: VarId) -> &VarAccess {
        &self.var_access[var.0 as usize]
    }

    /// A printable method signature, e.g. `<A: B get()>`.
    pub fn method_display(&self, id: MethodId) -> String {
        let method = self.method(id);
        format!(
            "<{}: {}>",
            self.class(method.class).name,
            self.subsig_str(method.subsig)
        )
    }

    /// A printable variable name, e.g. `<Main: void main()>/x`.
    pub fn var_display(&self, id: VarId) -> String {
        let var = self.var(id);
        format!("{}/{}", self.method_display(var.method), var.name)
    }
}

/// Incrementally constructs a [`Program`]. Used by the JSON loader and by
/// tests that assemble small programs by hand.
pub struct ProgramBuilder {
    classes: Vec<Class>,
    methods: Vec<Method>,
    vars: Vec<Var>,
    fields: Vec<Field>,
    subsigs: Vec<String>,
    subsig_index: HashMap<String, SubsigId>,
    call_sites: Vec<CallSite>,
    alloc_sites: Vec<AllocSite>,
    class_index: HashMap<String, ClassId>,
    declared_methods: HashMap<(ClassId, SubsigId), MethodId>,
    entry: Option<MethodId>,
}

impl ProgramBuilder {
    pub fn new() -> Self {
        ProgramBuilder {
            classes: Vec::new(),
            methods: Vec::new(),
            vars: Vec::new(),
            fields: Vec::new(),
            subsigs: Vec::new(),
            subsig_index: HashMap::new(),
            call_sites: Vec::new(),
            alloc_sites: Vec::new(),
            class_index: HashMap::new(),
            declared_methods: HashMap::new(),
            entry: None,
        }
    }

    pub fn subsig(&mut self, subsig: &str) -> SubsigId {
        if let Some(id) = self.subsig_index.get(subsig) {
            return *id;
        }
        let id = SubsigId(self.subsigs.len() as u32);
        self.subsigs.push(subsig.to_string());
        self.subsig_index.insert(subsig.to_string(), id);
        id
    }

    pub fn class(
        &mut self,
        name: &str,
        superclass: Option<ClassId>,
        interfaces: &[ClassId],
        is_abstract: bool,
    ) -> ClassId {
        self.add_class(name, superclass, interfaces, false, is_abstract)
    }

    pub fn interface(&mut self, name: &str, extends: &[ClassId]) -> ClassId {
        self.add_class(name, None, extends, true, true)
    }

    fn add_class(
        &mut self,
        name: &str,
        superclass: Option<ClassId>,
        interfaces: &[ClassId],
        is_interface: bool,
        is_abstract: bool,
    ) -> ClassId {
        assert!(
            !self.class_index.contains_key(name),
            "duplicate class `{}`",
            name
        );
        let id = ClassId(self.classes.len() as u32);
        self.classes.push(Class {
            name: name.to_string(),
            superclass,
            interfaces: interfaces.to_vec(),
            is_interface,
            is_abstract,
            methods: Vec::new(),
        });
        self.class_index.insert(name.to_string(), id);
        id
    }

    pub fn field(&mut self, class: ClassId, name: &str, is_static: bool) -> FieldId {
        let id = FieldId(self.fields.len() as u32);
        self.fields.push(Field {
            class,
            name: name.to_string(),
            is_static,
        });
        id
    }

    pub fn method(
        &mut self,
        class: ClassId,
        name: &str,
        subsig: &str,
        is_static: bool,
        is_abstract: bool,
        ret_ty: Option<ClassId>,
    ) -> MethodId {
        let subsig = self.subsig(subsig);
        let id = MethodId(self.methods.len() as u32);
        let this_var = if is_static {
            None
        } else {
            let var = VarId(self.vars.len() as u32);
            self.vars.push(Var {
                method: id,
                name: "this".to_string(),
            });
            Some(var)
        };
        self.methods.push(Method {
            class,
            name: name.to_string(),
            subsig,
            is_static,
            is_abstract,
            ret_ty,
            this_var,
            params: Vec::new(),
            return_vars: Vec::new(),
            body: Vec::new(),
        });
        self.classes[class.0 as usize].methods.push(id);
        let prev = self.declared_methods.insert((class, subsig), id);
        assert!(
            prev.is_none(),
            "duplicate method `{}` in class `{}`",
            name,
            self.classes[class.0 as usize].name
        );
        id
    }

    pub fn var(&mut self, method: MethodId, name: &str) -> VarId {
        let id = VarId(self.vars.len() as u32);
        self.vars.push(Var {
            method,
            name: name.to_string(),
        });
        id
    }

    pub fn param(&mut self, method: MethodId, name: &str) -> VarId {
        let var = self.var(method, name);
        self.methods[method.0 as usize].params.push(var);
        var
    }

    pub fn this_var(&self, method: MethodId) -> VarId {
        self.methods[method.0 as usize]
            .this_var
            .expect("static method has no `this`")
    }

    pub fn stmt_new(&mut self, method: MethodId, lhs: VarId, ty: ClassId) -> AllocId {
        let site = AllocId(self.alloc_sites.len() as u32);
        self.alloc_sites.push(AllocSite { method, ty });
        self.methods[method.0 as usize]
            .body
            .push(Stmt::New { lhs, site });
        site
    }

    pub fn stmt_copy(&mut self, method: MethodId, lhs: VarId, rhs: VarId) {
        self.methods[method.0 as usize]
            .body
            .push(Stmt::Copy { lhs, rhs });
    }

    pub fn stmt_static_load(&mut self, method: MethodId, lhs: VarId, field: FieldId) {
        self.methods[method.0 as usize]
            .body
            .push(Stmt::StaticLoad { lhs, field });
    }

    pub fn stmt_static_store(&mut self, method: MethodId, field: FieldId, rhs: VarId) {
        self.methods[method.0 as usize]
            .body
            .push(Stmt::StaticStore { field, rhs });
    }

    pub fn stmt_instance_load(&mut self, method: MethodId, lhs: VarId, base: VarId, field: FieldId) {
        self.methods[method.0 as usize]
            .body
            .push(Stmt::InstanceLoad { lhs, base, field });
    }

    pub fn stmt_instance_store(&mut self, method: MethodId, base: VarId, field: FieldId, rhs: VarId) {
        self.methods[method.0 as usize]
            .body
            .push(Stmt::InstanceStore { base, field, rhs });
    }

    pub fn stmt_array_load(&mut self, method: MethodId, lhs: VarId, base: VarId) {
        self.methods[method.0 as usize]
            .body
            .push(Stmt::ArrayLoad { lhs, base });
    }

    pub fn stmt_array_store(&mut self, method: MethodId, base: VarId, rhs: VarId) {
        self.methods[method.0 as usize]
            .body
            .push(Stmt::ArrayStore { base, rhs });
    }

    #[allow(clippy::too_many_arguments)]
    pub fn stmt_invoke(
        &mut self,
        method: MethodId,
        kind: CallKind,
        declared_class: ClassId,
        subsig: &str,
        recv: Option<VarId>,
        args: Vec<VarId>,
        result: Option<VarId>,
    ) -> CallSiteId {
        match kind {
            CallKind::Static => assert!(recv.is_none(), "static call with a receiver"),
            _ => assert!(recv.is_some(), "instance call without a receiver"),
        }
        let subsig = self.subsig(subsig);
        let id = CallSiteId(self.call_sites.len() as u32);
        self.call_sites.push(CallSite {
            id,
            caller: method,
            kind,
            declared_class,
            subsig,
            recv,
            args,
            result,
        });
        self.methods[method.0 as usize].body.push(Stmt::Invoke(id));
        id
    }

    pub fn stmt_return(&mut self, method: MethodId, var: VarId) {
        self.methods[method.0 as usize].body.push(Stmt::Return(var));
    }

    pub fn set_entry(&mut self, method: MethodId) {
        self.entry = Some(method);
    }

    /// Seals the program: computes the class hierarchy tables, collects
    /// return variables and builds the per-variable statement indexes.
    pub fn finish(mut self) -> Program {
        let num_classes = self.classes.len();
        let mut direct_subclasses = vec![Vec::new(); num_classes];
        let mut direct_subinterfaces = vec![Vec::new(); num_classes];
        let mut direct_implementors = vec![Vec::new(); num_classes];
        for (idx, class) in self.classes.iter().enumerate() {
            let id = ClassId(idx as u32);
            if let Some(sup) = class.superclass {
                direct_subclasses[sup.0 as usize].push(id);
            }
            for &iface in &class.interfaces {
                if class.is_interface {
                    direct_subinterfaces[iface.0 as usize].push(id);
                } else {
                    direct_implementors[iface.0 as usize].push(id);
                }
            }
        }

        for method in self.methods.iter_mut() {
            for stmt in &method.body {
                if let Stmt::Return(var) = stmt {
                    if !method.return_vars.contains(var) {
                        method.return_vars.push(*var);
                    }
                }
            }
        }

        let mut var_access: Vec<VarAccess> = Vec::new();
        var_access.resize_with(self.vars.len(), VarAccess::default);
        for method in &self.methods {
            for stmt in &method.body {
                match stmt {
                    Stmt::InstanceLoad { lhs, base, field } => {
                        var_access[base.0 as usize].field_loads.push((*lhs, *field));
                    }
                    Stmt::InstanceStore { base, field, rhs } => {
                        var_access[base.0 as usize].field_stores.push((*field, *rhs));
                    }
                    Stmt::ArrayLoad { lhs, base } => {
                        var_access[base.0 as usize].array_loads.push(*lhs);
                    }
                    Stmt::ArrayStore { base, rhs } => {
                        var_access[base.0 as usize].array_stores.push(*rhs);
                    }
                    Stmt::Invoke(site_id) => {
                        let site = &self.call_sites[site_id.0 as usize];
                        if let Some(recv) = site.recv {
                            var_access[recv.0 as usize].invokes.push(*site_id);
                        }
                    }
                    _ => {}
                }
            }
        }

        Program {
            classes: self.classes,
            methods: self.methods,
            vars: self.vars,
            fields: self.fields,
            subsigs: self.subsigs,
            call_sites: self.call_sites,
            alloc_sites: self.alloc_sites,
            class_index: self.class_index,
            declared_methods: self.declared_methods,
            direct_subclasses,
            direct_subinterfaces,
            direct_implementors,
            var_access,
            entry: self.entry,
        }
    }
}

impl Default for ProgramBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn hierarchy_tables() {
        let mut b = ProgramBuilder::new();
        let iface = b.interface("Number", &[]);
        let sub_iface = b.interface("Integer", &[iface]);
        let a = b.class("A", None, &[iface], false);
        let b2 = b.class("B", Some(a), &[], false);
        let c = b.class("C", None, &[sub_iface], false);
        let program = b.finish();

        assert_eq!(program.direct_subclasses_of(a), &[b2]);
        assert_eq!(program.direct_subinterfaces_of(iface), &[sub_iface]);
        assert_eq!(program.direct_implementors_of(iface), &[a]);
        assert_eq!(program.direct_implementors_of(sub_iface), &[c]);
        assert_eq!(program.find_class("B"), Some(b2));
    }

    #[test]
    fn var_access_index() {
        let mut b = ProgramBuilder::new();
        let cls = b.class("A", None, &[], false);
        let f = b.field(cls, "f", false);
        let m = b.method(cls, "main", "void main()", true, false, None);
        let x = b.var(m, "x");
        let y = b.var(m, "y");
        b.stmt_new(m, x, cls);
        b.stmt_instance_store(m, x, f, y);
        b.stmt_instance_load(m, y, x, f);
        let get = b.method(cls, "get", "A get()", false, false, Some(cls));
        let _ = get;
        let site = b.stmt_invoke(
            m,
            CallKind::Virtual,
            cls,
            "A get()",
            Some(x),
            vec![y],
            None,
        );
        let program = b.finish();

        let access = program.var_access(x);
        assert_eq!(access.field_stores, vec![(f, y)]);
        assert_eq!(access.field_loads, vec![(y, f)]);
        assert_eq!(access.invokes, vec![site]);
    }

    #[test]
    fn return_vars_collected() {
        let mut b = ProgramBuilder::new();
        let cls = b.class("A", None, &[], false);
        let m = b.method(cls, "id", "A id(A)", true, false, Some(cls));
        let p = b.param(m, "p");
        b.stmt_return(m, p);
        b.stmt_return(m, p);
        let program = b.finish();
        assert_eq!(program.method(m).return_vars, vec![p]);
        assert_eq!(program.method(m).params, vec![p]);
    }
}
