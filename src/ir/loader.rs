// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

//! Loads a program artifact from its JSON form.
//!
//! The artifact is trusted input: dangling class, field or variable
//! references are hard errors, unlike the silently skipped dispatch misses
//! during analysis.

use std::collections::HashMap;
use std::path::Path;

use anyhow::{anyhow, bail, Context as _, Result};
use serde::Deserialize;

use super::program::{ClassId, FieldId, MethodId, Program, ProgramBuilder, VarId};
use super::statement::CallKind;

#[derive(Deserialize)]
struct RawProgram {
    classes: Vec<RawClass>,
    /// Entry method reference, e.g. `"Main#void main()"`.
    #[serde(default)]
    entry: Option<String>,
}

#[derive(Deserialize)]
struct RawClass {
    name: String,
    #[serde(rename = "super", default)]
    superclass: Option<String>,
    #[serde(default)]
    interfaces: Vec<String>,
    #[serde(default)]
    interface: bool,
    #[serde(rename = "abstract", default)]
    is_abstract: bool,
    #[serde(default)]
    fields: Vec<RawField>,
    #[serde(default)]
    methods: Vec<RawMethod>,
}

#[derive(Deserialize)]
struct RawField {
    name: String,
    #[serde(rename = "static", default)]
    is_static: bool,
}

#[derive(Deserialize)]
struct RawMethod {
    name: String,
    subsig: String,
    #[serde(rename = "static", default)]
    is_static: bool,
    #[serde(rename = "abstract", default)]
    is_abstract: bool,
    #[serde(rename = "ret", default)]
    ret_ty: Option<String>,
    #[serde(default)]
    params: Vec<String>,
    #[serde(default)]
    vars: Vec<String>,
    #[serde(default)]
    stmts: Vec<RawStmt>,
}

#[derive(Deserialize)]
#[serde(tag = "op", rename_all = "lowercase")]
enum RawStmt {
    New {
        lhs: String,
        #[serde(rename = "type")]
        ty: String,
    },
    Copy {
        lhs: String,
        rhs: String,
    },
    #[serde(rename = "sload")]
    StaticLoad {
        lhs: String,
        class: String,
        field: String,
    },
    #[serde(rename = "sstore")]
    StaticStore {
        class: String,
        field: String,
        rhs: String,
    },
    #[serde(rename = "iload")]
    InstanceLoad {
        lhs: String,
        base: String,
        field: String,
    },
    #[serde(rename = "istore")]
    InstanceStore {
        base: String,
        field: String,
        rhs: String,
    },
    #[serde(rename = "aload")]
    ArrayLoad {
        lhs: String,
        base: String,
    },
    #[serde(rename = "astore")]
    ArrayStore {
        base: String,
        rhs: String,
    },
    Invoke {
        kind: String,
        class: String,
        subsig: String,
        #[serde(default)]
        recv: Option<String>,
        #[serde(default)]
        args: Vec<String>,
        #[serde(default)]
        result: Option<String>,
    },
    Return {
        var: String,
    },
}

pub fn load_program(path: &Path) -> Result<Program> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read program file {}", path.display()))?;
    program_from_json(&json)
}

pub fn program_from_json(json: &str) -> Result<Program> {
    let raw: RawProgram = serde_json::from_str(json).context("malformed program json")?;
    let mut builder = ProgramBuilder::new();

    // Declare classes in dependency order; superclasses and interfaces may
    // be referenced before their own declaration in the file.
    let mut class_ids: HashMap<String, ClassId> = HashMap::new();
    let mut seen = std::collections::HashSet::new();
    for raw_class in &raw.classes {
        if !seen.insert(&raw_class.name) {
            bail!("duplicate class `{}`", raw_class.name);
        }
    }
    let mut pending: Vec<&RawClass> = raw.classes.iter().collect();
    while !pending.is_empty() {
        let before = pending.len();
        pending.retain(|raw_class| {
            let deps_ready = raw_class
                .superclass
                .iter()
                .chain(raw_class.interfaces.iter())
                .all(|dep| class_ids.contains_key(dep));
            if !deps_ready {
                return true;
            }
            let superclass = raw_class.superclass.as_ref().map(|s| class_ids[s]);
            let interfaces: Vec<ClassId> =
                raw_class.interfaces.iter().map(|i| class_ids[i]).collect();
            let id = if raw_class.interface {
                builder.interface(&raw_class.name, &interfaces)
            } else {
                builder.class(&raw_class.name, superclass, &interfaces, raw_class.is_abstract)
            };
            class_ids.insert(raw_class.name.clone(), id);
            false
        });
        if pending.len() == before {
            bail!(
                "unresolvable class hierarchy (cycle or unknown reference) involving `{}`",
                pending[0].name
            );
        }
    }

    let lookup_class = |ids: &HashMap<String, ClassId>, name: &str| -> Result<ClassId> {
        ids.get(name)
            .copied()
            .ok_or_else(|| anyhow!("unknown class `{}`", name))
    };

    // Declare fields and methods before translating any statement so that
    // cross-class references resolve regardless of declaration order.
    let mut field_ids: HashMap<(ClassId, String), FieldId> = HashMap::new();
    let mut method_ids: Vec<(MethodId, &RawMethod, ClassId)> = Vec::new();
    for raw_class in &raw.classes {
        let class = class_ids[&raw_class.name];
        for raw_field in &raw_class.fields {
            let id = builder.field(class, &raw_field.name, raw_field.is_static);
            field_ids.insert((class, raw_field.name.clone()), id);
        }
        for raw_method in &raw_class.methods {
            let ret_ty = match &raw_method.ret_ty {
                Some(name) => Some(lookup_class(&class_ids, name)?),
                None => None,
            };
            let id = builder.method(
                class,
                &raw_method.name,
                &raw_method.subsig,
                raw_method.is_static,
                raw_method.is_abstract,
                ret_ty,
            );
            method_ids.push((id, raw_method, class));
        }
    }

    let lookup_field = |fields: &HashMap<(ClassId, String), FieldId>,
                        class: ClassId,
                        name: &str|
     -> Result<FieldId> {
        fields
            .get(&(class, name.to_string()))
            .copied()
            .ok_or_else(|| anyhow!("unknown field `{}`", name))
    };

    for (method, raw_method, _class) in &method_ids {
        let method = *method;
        let mut vars: HashMap<String, VarId> = HashMap::new();
        for param in &raw_method.params {
            vars.insert(param.clone(), builder.param(method, param));
        }
        for var in &raw_method.vars {
            vars.insert(var.clone(), builder.var(method, var));
        }
        if !raw_method.is_static {
            vars.insert("this".to_string(), builder.this_var(method));
        }
        let lookup_var = |vars: &HashMap<String, VarId>, name: &str| -> Result<VarId> {
            vars.get(name).copied().ok_or_else(|| {
                anyhow!("unknown variable `{}` in method `{}`", name, raw_method.name)
            })
        };

        for stmt in &raw_method.stmts {
            match stmt {
                RawStmt::New { lhs, ty } => {
                    let lhs = lookup_var(&vars, lhs)?;
                    let ty = lookup_class(&class_ids, ty)?;
                    builder.stmt_new(method, lhs, ty);
                }
                RawStmt::Copy { lhs, rhs } => {
                    builder.stmt_copy(method, lookup_var(&vars, lhs)?, lookup_var(&vars, rhs)?);
                }
                RawStmt::StaticLoad { lhs, class, field } => {
                    let class = lookup_class(&class_ids, class)?;
                    let field = lookup_field(&field_ids, class, field)?;
                    builder.stmt_static_load(method, lookup_var(&vars, lhs)?, field);
                }
                RawStmt::StaticStore { class, field, rhs } => {
                    let class = lookup_class(&class_ids, class)?;
                    let field = lookup_field(&field_ids, class, field)?;
                    builder.stmt_static_store(method, field, lookup_var(&vars, rhs)?);
                }
                RawStmt::InstanceLoad { lhs, base, field } => {
                    let base_var = lookup_var(&vars, base)?;
                    let class = lookup_class(&class_ids, &field_class(&raw.classes, field)?)?;
                    let field = lookup_field(&field_ids, class, field)?;
                    builder.stmt_instance_load(method, lookup_var(&vars, lhs)?, base_var, field);
                }
                RawStmt::InstanceStore { base, field, rhs } => {
                    let base_var = lookup_var(&vars, base)?;
                    let class = lookup_class(&class_ids, &field_class(&raw.classes, field)?)?;
                    let field = lookup_field(&field_ids, class, field)?;
                    builder.stmt_instance_store(method, base_var, field, lookup_var(&vars, rhs)?);
                }
                RawStmt::ArrayLoad { lhs, base } => {
                    builder.stmt_array_load(method, lookup_var(&vars, lhs)?, lookup_var(&vars, base)?);
                }
                RawStmt::ArrayStore { base, rhs } => {
                    builder.stmt_array_store(method, lookup_var(&vars, base)?, lookup_var(&vars, rhs)?);
                }
                RawStmt::Invoke {
                    kind,
                    class,
                    subsig,
                    recv,
                    args,
                    result,
                } => {
                    let kind = match kind.as_str() {
                        "static" => CallKind::Static,
                        "special" => CallKind::Special,
                        "virtual" => CallKind::Virtual,
                        "interface" => CallKind::Interface,
                        other => bail!("unknown call kind `{}`", other),
                    };
                    let class = lookup_class(&class_ids, class)?;
                    let recv = match recv {
                        Some(r) => Some(lookup_var(&vars, r)?),
                        None => None,
                    };
                    match kind {
                        CallKind::Static if recv.is_some() => {
                            bail!("static call with a receiver in method `{}`", raw_method.name)
                        }
                        CallKind::Special | CallKind::Virtual | CallKind::Interface
                            if recv.is_none() =>
                        {
                            bail!("instance call without a receiver in method `{}`", raw_method.name)
                        }
                        _ => {}
                    }
                    let args = args
                        .iter()
                        .map(|a| lookup_var(&vars, a))
                        .collect::<Result<Vec<_>>>()?;
                    let result = match result {
                        Some(r) => Some(lookup_var(&vars, r)?),
                        None => None,
                    };
                    builder.stmt_invoke(method, kind, class, subsig, recv, args, result);
                }
                RawStmt::Return { var } => {
                    builder.stmt_return(method, lookup_var(&vars, var)?);
                }
            }
        }
    }

    if let Some(entry) = &raw.entry {
        let (class, subsig) = entry
            .split_once('#')
            .ok_or_else(|| anyhow!("entry reference must look like `Class#subsig`: `{}`", entry))?;
        let class = lookup_class(&class_ids, class)?;
        let entry_method = method_ids
            .iter()
            .find(|(_, raw_method, cls)| *cls == class && raw_method.subsig == subsig)
            .map(|(id, _, _)| *id)
            .ok_or_else(|| anyhow!("unknown entry method `{}`", entry))?;
        builder.set_entry(entry_method);
    }

    Ok(builder.finish())
}

/// Instance field references in statements name only the field; find the
/// declaring class by scanning the raw declarations. Ambiguous names are
/// rejected.
fn field_class(classes: &[RawClass], field: &str) -> Result<String> {
    let mut found: Option<&str> = None;
    for raw_class in classes {
        if raw_class.fields.iter().any(|f| f.name == field) {
            if found.is_some() {
                bail!("ambiguous field name `{}`; qualify the declaring class", field);
            }
            found = Some(&raw_class.name);
        }
    }
    found
        .map(str::to_string)
        .ok_or_else(|| anyhow!("unknown field `{}`", field))
}

#[cfg(test)]
mod test {
    use super::*;

    const SMALL_PROGRAM: &str = r#"{
        "classes": [
            {
                "name": "B",
                "super": "A",
                "methods": []
            },
            {
                "name": "A",
                "fields": [{"name": "f"}],
                "methods": [
                    {
                        "name": "main", "subsig": "void main()", "static": true,
                        "vars": ["x", "y"],
                        "stmts": [
                            {"op": "new", "lhs": "x", "type": "B"},
                            {"op": "istore", "base": "x", "field": "f", "rhs": "y"},
                            {"op": "copy", "lhs": "y", "rhs": "x"}
                        ]
                    }
                ]
            }
        ],
        "entry": "A#void main()"
    }"#;

    #[test]
    fn loads_forward_references() {
        let program = program_from_json(SMALL_PROGRAM).unwrap();
        let a = program.find_class("A").unwrap();
        let b = program.find_class("B").unwrap();
        assert_eq!(program.class(b).superclass, Some(a));
        let entry = program.entry().unwrap();
        assert_eq!(program.method(entry).name, "main");
        assert_eq!(program.method(entry).body.len(), 3);
    }

    #[test]
    fn rejects_unknown_variable() {
        let bad = SMALL_PROGRAM.replace("\"rhs\": \"x\"", "\"rhs\": \"nope\"");
        let err = program_from_json(&bad).unwrap_err();
        assert!(err.to_string().contains("unknown variable"));
    }

    #[test]
    fn rejects_unknown_entry() {
        let bad = SMALL_PROGRAM.replace("A#void main()", "A#void nope()");
        assert!(program_from_json(&bad).is_err());
    }
}
