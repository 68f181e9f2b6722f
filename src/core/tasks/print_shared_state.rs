use crate::context::Reporter;
use crate::error::Result;
use crate::registry::TaskDescriptor;
use crate::state::SharedState;
use crate::task::{Task, TaskCore, TaskInit};

pub const KEY: &str = "print_shared_state";

pub fn load() -> Result<Vec<TaskDescriptor>> {
    Ok(vec![TaskDescriptor::new(
        KEY,
        "Print the data earlier tasks shared, as JSON",
        factory,
    )])
}

fn factory(init: TaskInit) -> Box<dyn Task> {
    Box::new(PrintSharedStateTask {
        core: TaskCore::new(init),
    })
}

pub struct PrintSharedStateTask {
    core: TaskCore,
}

impl Task for PrintSharedStateTask {
    fn key(&self) -> &'static str {
        KEY
    }

    fn name(&self) -> &'static str {
        "PrintSharedStateTask"
    }

    fn core(&self) -> &TaskCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut TaskCore {
        &mut self.core
    }

    fn run(&mut self, reporter: &mut Reporter, state: &mut SharedState) -> Result<()> {
        reporter.verbose("Starting Print Shared State Task.");
        reporter.print(state.to_pretty_json()?);
        Ok(())
    }
}
