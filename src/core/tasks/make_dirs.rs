use crate::context::Reporter;
use crate::error::Result;
use crate::registry::TaskDescriptor;
use crate::state::SharedState;
use crate::task::{GeneralDirsOpt, OtherDirsOpt, Task, TaskCore, TaskInit, TaskOption};
use crate::{io, paths};

pub const KEY: &str = "make_dirs";

pub fn load() -> Result<Vec<TaskDescriptor>> {
    Ok(vec![TaskDescriptor::new(
        KEY,
        "Create the working directories a run needs",
        factory,
    )])
}

fn factory(init: TaskInit) -> Box<dyn Task> {
    Box::new(MakeDirsTask::new(init))
}

pub struct MakeDirsTask {
    core: TaskCore,
    general_dirs: GeneralDirsOpt,
    other_dirs: OtherDirsOpt,
}

impl MakeDirsTask {
    pub fn new(init: TaskInit) -> Self {
        Self {
            core: TaskCore::new(init),
            general_dirs: GeneralDirsOpt::new(),
            other_dirs: OtherDirsOpt::new(),
        }
    }

    fn make_dir(&mut self, reporter: &mut Reporter, dir: &str) {
        let path = paths::sanitize(dir);
        reporter.verbose(format!("    {}", path.display()));
        if let Err(e) = io::create_dir_all(&path, "make_dirs") {
            self.core.error(e.message);
        }
    }
}

impl Task for MakeDirsTask {
    fn key(&self) -> &'static str {
        KEY
    }

    fn name(&self) -> &'static str {
        "MakeDirsTask"
    }

    fn core(&self) -> &TaskCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut TaskCore {
        &mut self.core
    }

    fn options_mut(&mut self) -> Vec<&mut dyn TaskOption> {
        vec![&mut self.general_dirs, &mut self.other_dirs]
    }

    fn options(&self) -> Vec<&dyn TaskOption> {
        vec![&self.general_dirs, &self.other_dirs]
    }

    fn run(&mut self, reporter: &mut Reporter, _state: &mut SharedState) -> Result<()> {
        reporter.verbose("Starting Make Dirs Task.");
        let general = self
            .general_dirs
            .dirs(self.core.config().view(self.core.tag()))?;
        if !general.is_empty() {
            reporter.verbose("  Making General Dirs");
        }
        for dir in &general {
            self.make_dir(reporter, dir);
        }
        let other = self.other_dirs.dirs().to_vec();
        if !other.is_empty() {
            reporter.verbose("  Making Other Dirs");
        }
        for dir in &other {
            self.make_dir(reporter, dir);
        }
        Ok(())
    }
}
