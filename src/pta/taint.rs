// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

//! Taint rule tables and flow facts.
//!
//! The rule configuration is a JSON document naming source methods, sink
//! arguments and transfer rules. Configuration is trusted input: a rule
//! that names a method, class or slot the program does not have is a hard
//! error at load time, not something to skip silently.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use anyhow::{anyhow, bail, Context as _, Result};
use serde::Deserialize;

use crate::ir::program::{ClassId, MethodId, Program};
use crate::ir::statement::CallSiteId;

/// A position through which taint crosses a call without entering the
/// callee: an argument, the receiver, or the returned value.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum Slot {
    Arg(usize),
    Base,
    Result,
}

impl Slot {
    /// Decodes the wire encoding: non-negative = argument index,
    /// -1 = receiver/base, -2 = result.
    pub fn from_raw(raw: i64) -> Result<Slot> {
        match raw {
            -1 => Ok(Slot::Base),
            -2 => Ok(Slot::Result),
            i if i >= 0 => Ok(Slot::Arg(i as usize)),
            i => bail!("invalid slot encoding {}", i),
        }
    }
}

/// Taint moves from `from` to `to` when the matched method is called, for
/// values of declared type `ty`.
#[derive(Copy, Clone, Debug)]
pub struct TaintTransfer {
    pub from: Slot,
    pub to: Slot,
    pub ty: ClassId,
}

/// One reported flow: the taint object made at `source` reached argument
/// `index` of the call at `sink`.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct TaintFlow {
    pub source: CallSiteId,
    pub sink: CallSiteId,
    pub index: usize,
}

#[derive(Deserialize)]
struct RawTaintConfig {
    #[serde(default)]
    sources: Vec<RawSource>,
    #[serde(default)]
    sinks: Vec<RawSink>,
    #[serde(default)]
    transfers: Vec<RawTransfer>,
}

#[derive(Deserialize)]
struct RawSource {
    /// `Class#subsignature`, the same form the loader uses for entry points.
    method: String,
    #[serde(rename = "type")]
    ty: String,
}

#[derive(Deserialize)]
struct RawSink {
    method: String,
    index: usize,
}

#[derive(Deserialize)]
struct RawTransfer {
    method: String,
    from: i64,
    to: i64,
    #[serde(rename = "type")]
    ty: String,
}

/// The resolved rule tables, keyed by the methods calls resolve to.
#[derive(Default, Debug)]
pub struct TaintConfig {
    sources: HashMap<MethodId, ClassId>,
    sinks: HashMap<MethodId, Vec<usize>>,
    transfers: HashMap<MethodId, Vec<TaintTransfer>>,
}

fn resolve_method(program: &Program, spec: &str) -> Result<MethodId> {
    let (class, subsig) = spec
        .split_once('#')
        .ok_or_else(|| anyhow!("malformed method reference `{}`, expected `Class#subsignature`", spec))?;
    program
        .find_method(class, subsig)
        .ok_or_else(|| anyhow!("taint rule references unknown method `{}`", spec))
}

fn resolve_class(program: &Program, name: &str) -> Result<ClassId> {
    program
        .find_class(name)
        .ok_or_else(|| anyhow!("taint rule references unknown type `{}`", name))
}

impl TaintConfig {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_path(path: &Path, program: &Program) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read taint config `{}`", path.display()))?;
        Self::from_json(&text, program)
            .with_context(|| format!("invalid taint config `{}`", path.display()))
    }

    pub fn from_json(text: &str, program: &Program) -> Result<Self> {
        let raw: RawTaintConfig = serde_json::from_str(text)?;
        let mut config = TaintConfig::empty();
        for source in &raw.sources {
            let method = resolve_method(program, &source.method)?;
            let ty = resolve_class(program, &source.ty)?;
            config.sources.insert(method, ty);
        }
        for sink in &raw.sinks {
            let method = resolve_method(program, &sink.method)?;
            let num_params = program.method(method).params.len();
            if sink.index >= num_params {
                bail!(
                    "sink index {} out of range for `{}` ({} parameters)",
                    sink.index,
                    sink.method,
                    num_params
                );
            }
            let indexes = config.sinks.entry(method).or_default();
            if !indexes.contains(&sink.index) {
                indexes.push(sink.index);
            }
        }
        for transfer in &raw.transfers {
            let method = resolve_method(program, &transfer.method)?;
            let from = Slot::from_raw(transfer.from)?;
            let to = Slot::from_raw(transfer.to)?;
            let ty = resolve_class(program, &transfer.ty)?;
            config
                .transfers
                .entry(method)
                .or_default()
                .push(TaintTransfer { from, to, ty });
        }
        Ok(config)
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty() && self.sinks.is_empty() && self.transfers.is_empty()
    }

    /// The taint type produced when `method` is a configured source.
    pub fn source_type(&self, method: MethodId) -> Option<ClassId> {
        self.sources.get(&method).copied()
    }

    /// The monitored argument indexes when `method` is a configured sink.
    pub fn sink_indexes(&self, method: MethodId) -> &[usize] {
        self.sinks.get(&method).map_or(&[], Vec::as_slice)
    }

    pub fn transfers(&self, method: MethodId) -> &[TaintTransfer] {
        self.transfers.get(&method).map_or(&[], Vec::as_slice)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::ir::program::ProgramBuilder;

    fn sample_program() -> Program {
        let mut b = ProgramBuilder::new();
        let s = b.class("String", None, &[], false);
        let cls = b.class("Util", None, &[], false);
        let src = b.method(cls, "source", "String source()", true, false, Some(s));
        let sink = b.method(cls, "sink", "void sink(String)", true, false, None);
        b.param(sink, "p");
        let concat = b.method(cls, "concat", "String concat(String,String)", true, false, Some(s));
        b.param(concat, "a");
        b.param(concat, "b");
        let _ = src;
        b.finish()
    }

    #[test]
    fn parses_all_rule_kinds() {
        let program = sample_program();
        let config = TaintConfig::from_json(
            r#"{
                "sources": [{"method": "Util#String source()", "type": "String"}],
                "sinks": [{"method": "Util#void sink(String)", "index": 0}],
                "transfers": [
                    {"method": "Util#String concat(String,String)", "from": 0, "to": -2, "type": "String"}
                ]
            }"#,
            &program,
        )
        .unwrap();

        let src = program.find_method("Util", "String source()").unwrap();
        let sink = program.find_method("Util", "void sink(String)").unwrap();
        let concat = program
            .find_method("Util", "String concat(String,String)")
            .unwrap();
        assert_eq!(config.source_type(src), Some(program.find_class("String").unwrap()));
        assert_eq!(config.sink_indexes(sink), &[0]);
        let transfers = config.transfers(concat);
        assert_eq!(transfers.len(), 1);
        assert_eq!(transfers[0].from, Slot::Arg(0));
        assert_eq!(transfers[0].to, Slot::Result);
    }

    #[test]
    fn unknown_method_is_a_hard_error() {
        let program = sample_program();
        let err = TaintConfig::from_json(
            r#"{"sources": [{"method": "Util#String missing()", "type": "String"}]}"#,
            &program,
        )
        .unwrap_err();
        assert!(err.to_string().contains("unknown method"));
    }

    #[test]
    fn sink_index_must_be_in_range() {
        let program = sample_program();
        assert!(TaintConfig::from_json(
            r#"{"sinks": [{"method": "Util#void sink(String)", "index": 3}]}"#,
            &program,
        )
        .is_err());
    }

    #[test]
    fn slot_encoding() {
        assert_eq!(Slot::from_raw(-1).unwrap(), Slot::Base);
        assert_eq!(Slot::from_raw(-2).unwrap(), Slot::Result);
        assert_eq!(Slot::from_raw(2).unwrap(), Slot::Arg(2));
        assert!(Slot::from_raw(-3).is_err());
    }
}
