// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

//! The main routine of `jpta`.
//!
//! Loads a JSON IR program, runs the selected pointer analysis to its fixed
//! point, and writes the requested artifacts.

use log::*;
use std::env;
use std::path::Path;
use std::time::{Duration, Instant};

use anyhow::{anyhow, Result};

use jpta::ir::loader::load_program;
use jpta::pta::run_pta;
use jpta::pta::taint::TaintConfig;
use jpta::util::options::AnalysisOptions;
use jpta::util::pta_statistics::PTAStat;
use jpta::util::results_dumper;

fn main() -> Result<()> {
    if env::var("JPTA_LOG").is_ok() {
        let e = env_logger::Env::new()
            .filter("JPTA_LOG")
            .write_style("JPTA_LOG_STYLE");
        env_logger::init_from_env(e);
    }

    let args: Vec<String> = env::args().collect();
    let options = AnalysisOptions::parse_from_args(&args);
    info!("PTA Options: {:?}", options);

    let mut program = load_program(Path::new(&options.program_path))?;
    if let Some(entry_spec) = &options.entry_func {
        let (class, subsig) = entry_spec
            .split_once('#')
            .ok_or_else(|| anyhow!("malformed entry `{}`, expected `Class#subsignature`", entry_spec))?;
        let entry = program
            .find_method(class, subsig)
            .ok_or_else(|| anyhow!("entry method `{}` not found", entry_spec))?;
        program.set_entry(entry);
    }

    let taint = match &options.taint_config {
        Some(path) => TaintConfig::from_path(Path::new(path), &program)?,
        None => TaintConfig::empty(),
    };

    let start = Instant::now();
    let result = run_pta(
        &program,
        options.analysis,
        options.context_depth as usize,
        taint,
    )?;
    let elapsed = Duration::from_millis(start.elapsed().as_millis() as u64);
    info!("analysis finished in {}", humantime::format_duration(elapsed));

    results_dumper::dump_results(&result, &options);
    if options.dump_stats {
        PTAStat::new(&result).dump_stats();
    }

    for flow in result.taint_flows() {
        println!(
            "taint flow: {} -> {} (arg {})",
            result.callsite_display(flow.source),
            result.callsite_display(flow.sink),
            flow.index,
        );
    }

    Ok(())
}
