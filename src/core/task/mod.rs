//! Task lifecycle shared by every pipeline step.
//!
//! A task instance is bound to one config document and one tag (the section
//! it reads). Its life is: uninitialized -> config loaded -> executed ->
//! status resolved. Config loading runs at most once per instance.
//!
//! Option capabilities ([`options`]) are declared by each task as an ordered
//! list. `load_config` applies them in that order and finishes with the
//! task's own [`Task::load_task_config`] hook.

pub mod options;

use std::sync::Arc;

use crate::config::{render_option, ConfigDocument, SectionView, TASK_TYPE_KEY};
use crate::context::Reporter;
use crate::error::Result;
use crate::state::SharedState;

pub use options::{GeneralDirsOpt, OtherDirsOpt, OutputDirOpt, TaskOption};

/// What a factory needs to build a task instance.
#[derive(Clone)]
pub struct TaskInit {
    pub config: Arc<ConfigDocument>,
    pub tag: String,
}

impl TaskInit {
    pub fn new(config: Arc<ConfigDocument>, tag: impl Into<String>) -> Self {
        Self {
            config,
            tag: tag.into(),
        }
    }
}

/// Status bookkeeping and config binding embedded in every task.
#[derive(Debug)]
pub struct TaskCore {
    config: Arc<ConfigDocument>,
    tag: String,
    loaded: bool,
    warnings: Vec<String>,
    errors: Vec<String>,
    status: Option<usize>,
}

impl TaskCore {
    pub fn new(init: TaskInit) -> Self {
        Self {
            config: init.config,
            tag: init.tag,
            loaded: false,
            warnings: Vec::new(),
            errors: Vec::new(),
            status: None,
        }
    }

    pub fn config(&self) -> &ConfigDocument {
        &self.config
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    /// `None` until the task has run; then the number of recorded errors.
    pub fn status(&self) -> Option<usize> {
        self.status
    }

    pub fn warn(&mut self, msg: impl Into<String>) {
        self.warnings.push(msg.into());
    }

    pub fn error(&mut self, msg: impl Into<String>) {
        self.errors.push(msg.into());
    }

    pub fn clear_status(&mut self) {
        self.warnings.clear();
        self.errors.clear();
        self.status = None;
    }

    /// Warnings never count towards the status.
    pub fn set_status(&mut self) {
        self.status = Some(self.errors.len());
    }
}

pub trait Task {
    /// Registry key of the task type.
    fn key(&self) -> &'static str;

    /// Human readable name used in reports.
    fn name(&self) -> &'static str;

    fn core(&self) -> &TaskCore;

    fn core_mut(&mut self) -> &mut TaskCore;

    /// Option capabilities, in the order they load.
    fn options_mut(&mut self) -> Vec<&mut dyn TaskOption> {
        Vec::new()
    }

    /// Same capabilities as [`Task::options_mut`], for rendering.
    fn options(&self) -> Vec<&dyn TaskOption> {
        Vec::new()
    }

    /// Task-specific config hook, called after every capability has loaded.
    fn load_task_config(&mut self, _section: SectionView<'_>) -> Result<()> {
        Ok(())
    }

    /// The task body. Anticipated failures are recorded with
    /// `core_mut().error()` / `warn()`; an `Err` is recorded as one error.
    fn run(&mut self, reporter: &mut Reporter, state: &mut SharedState) -> Result<()>;

    /// Resolved task-specific values for `debug_msg`.
    fn debug_entries(&self) -> Vec<(String, String)> {
        Vec::new()
    }

    /// Declared task-specific defaults for `default_config`, already rendered.
    fn default_entries(&self) -> Vec<String> {
        Vec::new()
    }

    fn load_config(&mut self) -> Result<()> {
        if self.core().is_loaded() {
            return Ok(());
        }
        let config = Arc::clone(&self.core().config);
        let tag = self.core().tag.clone();
        let section = config.view(&tag);
        for option in self.options_mut() {
            option.load(section)?;
        }
        self.load_task_config(section)?;
        self.core_mut().loaded = true;
        Ok(())
    }

    fn execute(&mut self, reporter: &mut Reporter, state: &mut SharedState) -> Result<()> {
        self.core_mut().clear_status();
        self.load_config()?;
        if reporter.is_debug() {
            let msg = self.debug_msg()?;
            reporter.debug(msg);
        }
        if let Err(err) = self.run(reporter, state) {
            self.core_mut().error(err.to_string());
        }
        self.core_mut().set_status();
        Ok(())
    }

    fn debug_msg(&mut self) -> Result<String> {
        self.load_config()?;
        let mut msg = format!("{} Debug\n", self.name());
        msg.push_str(&format!("  tag: {}\n", self.core().tag()));
        for option in self.options() {
            msg.push_str(&format!("  {}\n", option.debug_line()));
        }
        for (key, value) in self.debug_entries() {
            msg.push_str(&format!("  {}: {}\n", key, value));
        }
        Ok(msg)
    }

    /// Example section for this task with its declared defaults.
    fn default_config(&mut self) -> Result<String> {
        self.load_config()?;
        let mut config = format!("[{}]\n", self.core().tag());
        if self.core().tag() != self.key() {
            config.push_str(&render_option(TASK_TYPE_KEY, self.key()));
        }
        for option in self.options() {
            config.push_str(&option.default_line());
        }
        for line in self.default_entries() {
            config.push_str(&line);
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Verbosity;
    use crate::error::{Error, ErrorCode};

    struct Sample {
        core: TaskCore,
        output: OutputDirOpt,
        hook_calls: usize,
        errors_to_raise: usize,
        warnings_to_raise: usize,
        fail_with: Option<String>,
    }

    impl Sample {
        fn new(text: &str) -> Self {
            let config = Arc::new(ConfigDocument::parse(text).unwrap());
            Self {
                core: TaskCore::new(TaskInit::new(config, "sample")),
                output: OutputDirOpt::new(),
                hook_calls: 0,
                errors_to_raise: 0,
                warnings_to_raise: 0,
                fail_with: None,
            }
        }
    }

    impl Task for Sample {
        fn key(&self) -> &'static str {
            "sample"
        }

        fn name(&self) -> &'static str {
            "Sample"
        }

        fn core(&self) -> &TaskCore {
            &self.core
        }

        fn core_mut(&mut self) -> &mut TaskCore {
            &mut self.core
        }

        fn options_mut(&mut self) -> Vec<&mut dyn TaskOption> {
            vec![&mut self.output]
        }

        fn options(&self) -> Vec<&dyn TaskOption> {
            vec![&self.output]
        }

        fn load_task_config(&mut self, _section: SectionView<'_>) -> Result<()> {
            self.hook_calls += 1;
            Ok(())
        }

        fn run(&mut self, _reporter: &mut Reporter, _state: &mut SharedState) -> Result<()> {
            for i in 0..self.errors_to_raise {
                self.core.error(format!("error {}", i));
            }
            for i in 0..self.warnings_to_raise {
                self.core.warn(format!("warning {}", i));
            }
            match &self.fail_with {
                Some(msg) => Err(Error::other(msg.clone())),
                None => Ok(()),
            }
        }
    }

    fn execute(task: &mut Sample) {
        let mut reporter = Reporter::capture(Verbosity::Normal);
        let mut state = SharedState::new();
        task.execute(&mut reporter, &mut state).unwrap();
    }

    #[test]
    fn load_config_runs_hook_once() {
        let mut task = Sample::new("");
        for _ in 0..5 {
            task.load_config().unwrap();
        }
        task.debug_msg().unwrap();
        task.default_config().unwrap();
        assert_eq!(task.hook_calls, 1);
        assert!(task.core().is_loaded());
    }

    #[test]
    fn capabilities_load_before_hook() {
        let mut task = Sample::new("[sample]\noutput_dir = /srv/out\n");
        task.load_config().unwrap();
        assert_eq!(task.output.value(), "/srv/out");
    }

    #[test]
    fn status_is_unset_before_execution() {
        let task = Sample::new("");
        assert_eq!(task.core().status(), None);
    }

    #[test]
    fn status_counts_errors_only() {
        let mut task = Sample::new("");
        task.errors_to_raise = 3;
        task.warnings_to_raise = 2;
        execute(&mut task);
        assert_eq!(task.core().status(), Some(3));
        assert_eq!(task.core().warnings().len(), 2);
    }

    #[test]
    fn warnings_alone_keep_status_zero() {
        let mut task = Sample::new("");
        task.warnings_to_raise = 2;
        execute(&mut task);
        assert_eq!(task.core().status(), Some(0));
    }

    #[test]
    fn body_error_becomes_task_error() {
        let mut task = Sample::new("");
        task.fail_with = Some("pelican exploded".to_string());
        execute(&mut task);
        assert_eq!(task.core().status(), Some(1));
        assert_eq!(task.core().errors(), &["pelican exploded".to_string()]);
    }

    #[test]
    fn execute_clears_previous_status() {
        let mut task = Sample::new("");
        task.errors_to_raise = 1;
        execute(&mut task);
        task.errors_to_raise = 0;
        execute(&mut task);
        assert_eq!(task.core().status(), Some(0));
        assert!(task.core().errors().is_empty());
    }

    #[test]
    fn config_errors_propagate_from_execute() {
        let mut task = Sample::new("[sample]\noutput_dir = ${output_dir}\n");
        let mut reporter = Reporter::capture(Verbosity::Normal);
        let mut state = SharedState::new();
        let err = task.execute(&mut reporter, &mut state).unwrap_err();
        assert_eq!(err.code, ErrorCode::ConfigInterpolationCycle);
        assert_eq!(task.hook_calls, 0);
    }

    #[test]
    fn debug_msg_shows_resolved_values() {
        let mut task = Sample::new("[general]\ntmp_dir = /build\n");
        let msg = task.debug_msg().unwrap();
        assert!(msg.starts_with("Sample Debug\n"));
        assert!(msg.contains("output_dir: /build/staging"));
    }

    #[test]
    fn default_config_shows_declared_defaults() {
        let mut task = Sample::new("[general]\ntmp_dir = /build\n");
        let section = task.default_config().unwrap();
        assert_eq!(section, "[sample]\noutput_dir = ${general:staging_dir}\n");
    }

    #[test]
    fn debug_output_is_emitted_at_debug_level() {
        let mut task = Sample::new("");
        let mut reporter = Reporter::capture(Verbosity::Debug);
        let mut state = SharedState::new();
        task.execute(&mut reporter, &mut state).unwrap();
        assert!(reporter.captured_text().contains("dbg: Sample Debug"));
    }
}
