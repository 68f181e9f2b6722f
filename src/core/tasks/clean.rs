use crate::context::Reporter;
use crate::error::Result;
use crate::registry::TaskDescriptor;
use crate::state::SharedState;
use crate::task::{GeneralDirsOpt, OtherDirsOpt, Task, TaskCore, TaskInit, TaskOption};
use crate::{io, paths};

pub const KEY: &str = "clean";

pub fn load() -> Result<Vec<TaskDescriptor>> {
    Ok(vec![TaskDescriptor::new(
        KEY,
        "Remove working directories left by a previous run",
        factory,
    )])
}

fn factory(init: TaskInit) -> Box<dyn Task> {
    Box::new(CleanTask::new(init))
}

pub struct CleanTask {
    core: TaskCore,
    general_dirs: GeneralDirsOpt,
    other_dirs: OtherDirsOpt,
}

impl CleanTask {
    pub fn new(init: TaskInit) -> Self {
        Self {
            core: TaskCore::new(init),
            general_dirs: GeneralDirsOpt::new(),
            other_dirs: OtherDirsOpt::new(),
        }
    }

    /// A failed removal is only a warning; the next task may still succeed.
    fn remove(&mut self, reporter: &mut Reporter, dir: &str) {
        let path = paths::sanitize(dir);
        reporter.verbose(format!("  removing {}", path.display()));
        if let Err(e) = io::remove_path(&path, "clean") {
            let msg = format!("failed to remove {}: {}", path.display(), e.message);
            reporter.verbose(format!("  {}", msg));
            self.core.warn(msg);
        }
    }
}

impl Task for CleanTask {
    fn key(&self) -> &'static str {
        KEY
    }

    fn name(&self) -> &'static str {
        "CleanTask"
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
        reporter.verbose("Starting Clean Task.");
        // Nested dirs first, tmp_dir last.
        let mut dirs = self
            .general_dirs
            .dirs(self.core.config().view(self.core.tag()))?;
        dirs.reverse();
        dirs.extend(self.other_dirs.dirs().iter().cloned());
        for dir in &dirs {
            self.remove(reporter, dir);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigDocument;
    use crate::context::Verbosity;
    use std::fs;
    use std::sync::Arc;

    fn run(text: &str) -> CleanTask {
        let config = Arc::new(ConfigDocument::parse(text).unwrap());
        let mut task = CleanTask::new(TaskInit::new(config, KEY));
        task.execute(&mut Reporter::capture(Verbosity::Normal), &mut SharedState::new())
            .unwrap();
        task
    }

    #[test]
    fn removes_general_and_other_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().display().to_string();
        fs::create_dir_all(dir.path().join("tmp/output/site")).unwrap();
        fs::create_dir_all(dir.path().join("tmp/staging")).unwrap();
        fs::create_dir_all(dir.path().join("cache")).unwrap();
        fs::write(dir.path().join("tmp/output/site/index.html"), "x").unwrap();

        let task = run(&format!(
            "[general]\ntmp_dir = {root}/tmp\n[clean]\nother_dirs = {root}/cache\n"
        ));
        assert_eq!(task.core().status(), Some(0));
        assert!(task.core().warnings().is_empty());
        assert!(!dir.path().join("tmp").exists());
        assert!(!dir.path().join("cache").exists());
    }

    #[test]
    fn space_in_tmp_dir_does_not_touch_siblings() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().display().to_string();
        fs::create_dir_all(dir.path().join("my site/build/output")).unwrap();
        fs::create_dir_all(dir.path().join("my")).unwrap();
        fs::write(dir.path().join("my/precious.txt"), "keep").unwrap();

        let task = run(&format!("[general]\ntmp_dir = {root}/my site/build\n"));
        assert_eq!(task.core().status(), Some(0));
        assert!(!dir.path().join("my site/build").exists());
        assert!(dir.path().join("my site").is_dir());
        assert!(dir.path().join("my/precious.txt").is_file());
    }

    #[test]
    fn missing_dirs_are_fine() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().display().to_string();
        let task = run(&format!("[general]\ntmp_dir = {root}/never\n"));
        assert_eq!(task.core().status(), Some(0));
        assert!(task.core().warnings().is_empty());
    }

    #[test]
    fn default_section_lists_both_options() {
        let config = Arc::new(ConfigDocument::defaults());
        let mut task = CleanTask::new(TaskInit::new(config, KEY));
        assert_eq!(
            task.default_config().unwrap(),
            "[clean]\ngeneral_dirs = true\nother_dirs =\n"
        );
    }
}
