use convoy::context::Reporter;
use convoy::pipeline::{self, PipelineRunResult, RunOptions};
use convoy::registry::TaskRegistry;
use convoy::state::SharedState;

use super::{load_config, CmdResult, GlobalArgs};

pub struct PipelineArgs {
    pub skip: Vec<String>,
    pub list: bool,
}

/// Run (or list) the enabled tasks. The exit code is the failing task's
/// error count, or 0.
pub fn run(
    args: &PipelineArgs,
    global: &GlobalArgs,
    reporter: &mut Reporter,
) -> CmdResult<PipelineRunResult> {
    let config = load_config(global, reporter)?;
    let registry = TaskRegistry::builtin(reporter)?;

    let mut options = RunOptions::skipping(args.skip.iter().cloned());
    options.list_only = args.list;

    let mut state = SharedState::new();
    let result = pipeline::run(&config, &registry, &options, reporter, &mut state)?;
    let exit_code = result.exit_code;
    Ok((result, exit_code))
}
