// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

//! Analysis options.

use clap::{Arg, Command};

use crate::pta::AnalysisKind;

const JPTA_USAGE: &str = r#"jpta [OPTIONS] INPUT"#;

/// Creates the clap::Command metadata for argument parsing.
fn make_options_parser() -> Command<'static> {
    Command::new("jpta")
        .override_usage(JPTA_USAGE)
        .version(env!("CARGO_PKG_VERSION"))
        .arg(Arg::new("entry-func")
            .long("entry-func")
            .takes_value(true)
            .help("The entry method the analysis begins from, as `Class#subsignature`. Overrides the entry declared by the input program."))
        .arg(Arg::new("analysis")
            .long("analysis")
            .takes_value(true)
            .value_parser(["ci", "insensitive", "callsite-sensitive", "cs", "object-sensitive", "obj"])
            .default_value("ci")
            .help("The kind of pointer analysis.")
            .long_help("Context-insensitive, k-call-site-sensitive and k-object-sensitive pointer analyses are supported."))
        .arg(Arg::new("context-depth")
            .long("context-depth")
            .takes_value(true)
            .value_parser(clap::value_parser!(u32))
            .default_value("1")
            .help("The context depth limit for a context-sensitive pointer analysis."))
        .arg(Arg::new("taint-config")
            .long("taint-config")
            .takes_value(true)
            .help("A JSON file declaring taint sources, sinks and transfers."))
        .arg(Arg::new("dump-stats")
            .long("dump-stats")
            .takes_value(false)
            .help("Dump the statistics of the analysis results."))
        .arg(Arg::new("call-graph-output")
            .long("dump-call-graph")
            .takes_value(true)
            .help("Dump the call graph in DOT format to the output file."))
        .arg(Arg::new("pts-output")
            .long("dump-pts")
            .takes_value(true)
            .help("Dump points-to results to the output file."))
        .arg(Arg::new("INPUT")
            .required(true)
            .help("The program to be analyzed, as a JSON IR file."))
}

#[derive(Clone, Debug)]
pub struct AnalysisOptions {
    pub program_path: String,
    pub entry_func: Option<String>,
    pub analysis: AnalysisKind,
    pub context_depth: u32,
    pub taint_config: Option<String>,

    pub dump_stats: bool,
    pub call_graph_output: Option<String>,
    pub pts_output: Option<String>,
}

impl AnalysisOptions {
    /// Parses options from a list of strings; exits with a diagnostic on
    /// invalid arguments.
    pub fn parse_from_args(args: &[String]) -> Self {
        let matches = match make_options_parser().try_get_matches_from(args.iter()) {
            Ok(matches) => matches,
            Err(e) => e.exit(),
        };

        let analysis = match matches.get_one::<String>("analysis").unwrap().as_str() {
            "ci" | "insensitive" => AnalysisKind::ContextInsensitive,
            "callsite-sensitive" | "cs" => AnalysisKind::CallSiteSensitive,
            "object-sensitive" | "obj" => AnalysisKind::ObjectSensitive,
            _ => unreachable!(),
        };

        AnalysisOptions {
            program_path: matches.get_one::<String>("INPUT").unwrap().clone(),
            entry_func: matches.get_one::<String>("entry-func").cloned(),
            analysis,
            context_depth: *matches.get_one::<u32>("context-depth").unwrap(),
            taint_config: matches.get_one::<String>("taint-config").cloned(),
            dump_stats: matches.contains_id("dump-stats"),
            call_graph_output: matches.get_one::<String>("call-graph-output").cloned(),
            pts_output: matches.get_one::<String>("pts-output").cloned(),
        }
    }
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self {
            program_path: String::new(),
            entry_func: None,
            analysis: AnalysisKind::ContextInsensitive,
            context_depth: 1,
            taint_config: None,
            dump_stats: false,
            call_graph_output: None,
            pts_output: None,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn parse(args: &[&str]) -> AnalysisOptions {
        let args: Vec<String> = args.iter().map(|s| s.to_string()).collect();
        AnalysisOptions::parse_from_args(&args)
    }

    #[test]
    fn defaults() {
        let opts = parse(&["jpta", "program.json"]);
        assert_eq!(opts.program_path, "program.json");
        assert_eq!(opts.analysis, AnalysisKind::ContextInsensitive);
        assert_eq!(opts.context_depth, 1);
        assert!(!opts.dump_stats);
        assert!(opts.taint_config.is_none());
    }

    #[test]
    fn full_invocation() {
        let opts = parse(&[
            "jpta",
            "--analysis",
            "cs",
            "--context-depth",
            "2",
            "--taint-config",
            "taint.json",
            "--dump-stats",
            "--dump-call-graph",
            "cg.dot",
            "program.json",
        ]);
        assert_eq!(opts.analysis, AnalysisKind::CallSiteSensitive);
        assert_eq!(opts.context_depth, 2);
        assert_eq!(opts.taint_config.as_deref(), Some("taint.json"));
        assert!(opts.dump_stats);
        assert_eq!(opts.call_graph_output.as_deref(), Some("cg.dot"));
    }
}
