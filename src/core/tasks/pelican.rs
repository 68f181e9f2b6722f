use crate::command;
use crate::config::{render_option, SectionView};
use crate::context::Reporter;
use crate::error::Result;
use crate::log_status;
use crate::paths;
use crate::registry::TaskDescriptor;
use crate::shell;
use crate::state::SharedState;
use crate::task::{OutputDirOpt, Task, TaskCore, TaskInit, TaskOption};

pub const KEY: &str = "pelican";
const PROGRAM: &str = "pelican";

pub struct PelicanOpts;

impl PelicanOpts {
    pub const INPUT_DIR: &'static str = "input_dir";
    pub const PELICAN_CONFIG: &'static str = "pelican_config";
    pub const THEME_DIR: &'static str = "theme_dir";
    pub const PELICAN_OPTIONS: &'static str = "pelican_options";
    pub const PELICAN_OPTIONS_DEFAULT: &'static str = "-D";
}

pub fn load() -> Result<Vec<TaskDescriptor>> {
    Ok(vec![TaskDescriptor::new(
        KEY,
        "Render the site with the pelican generator",
        factory,
    )])
}

fn factory(init: TaskInit) -> Box<dyn Task> {
    Box::new(PelicanTask::new(init))
}

pub struct PelicanTask {
    core: TaskCore,
    output_dir: OutputDirOpt,
    input_dir: String,
    pelican_config: String,
    theme_dir: String,
    pelican_options: String,
}

impl PelicanTask {
    pub fn new(init: TaskInit) -> Self {
        Self {
            core: TaskCore::new(init),
            output_dir: OutputDirOpt::with_default(""),
            input_dir: String::new(),
            pelican_config: String::new(),
            theme_dir: String::new(),
            pelican_options: PelicanOpts::PELICAN_OPTIONS_DEFAULT.to_string(),
        }
    }

    /// Arguments for the generator. Flags whose value is unset are left out.
    pub fn args(&self) -> Vec<String> {
        let output = if self.output_dir.is_set() {
            self.output_dir.path().to_string_lossy().to_string()
        } else {
            String::new()
        };
        let mut args = vec![self.input_dir.clone()];
        for (flag, value) in [
            ("-o", output),
            ("-s", self.pelican_config.clone()),
            ("-t", self.theme_dir.clone()),
        ] {
            if value.is_empty() {
                continue;
            }
            args.push(flag.to_string());
            args.push(value);
        }
        args.extend(shell::split_words(&self.pelican_options));
        args
    }
}

fn sanitized(section: SectionView<'_>, option: &str) -> Result<String> {
    Ok(section
        .get(option)?
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .map(|v| paths::sanitize(&v).to_string_lossy().to_string())
        .unwrap_or_default())
}

impl Task for PelicanTask {
    fn key(&self) -> &'static str {
        KEY
    }

    fn name(&self) -> &'static str {
        "PelicanTask"
    }

    fn core(&self) -> &TaskCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut TaskCore {
        &mut self.core
    }

    fn options_mut(&mut self) -> Vec<&mut dyn TaskOption> {
        vec![&mut self.output_dir]
    }

    fn options(&self) -> Vec<&dyn TaskOption> {
        vec![&self.output_dir]
    }

    fn load_task_config(&mut self, section: SectionView<'_>) -> Result<()> {
        self.input_dir = sanitized(section, PelicanOpts::INPUT_DIR)?;
        self.pelican_config = sanitized(section, PelicanOpts::PELICAN_CONFIG)?;
        self.theme_dir = sanitized(section, PelicanOpts::THEME_DIR)?;
        if let Some(options) = section.get(PelicanOpts::PELICAN_OPTIONS)? {
            self.pelican_options = options;
        }
        Ok(())
    }

    fn run(&mut self, reporter: &mut Reporter, _state: &mut SharedState) -> Result<()> {
        reporter.verbose("Starting Pelican Task.");
        if self.input_dir.is_empty() {
            self.core
                .error(format!("{} is not configured", PelicanOpts::INPUT_DIR));
            return Ok(());
        }
        let args = self.args();
        let line = command::command_line(PROGRAM, &args);
        reporter.verbose(format!("command: {}", line));
        log_status!("pelican", "Rendering {}", self.input_dir);
        let outcome = command::capture(PROGRAM, &args, None)?;
        if !outcome.success() {
            self.core.error(outcome.failure_message());
        }
        Ok(())
    }

    fn debug_entries(&self) -> Vec<(String, String)> {
        vec![
            (PelicanOpts::INPUT_DIR.to_string(), self.input_dir.clone()),
            (
                PelicanOpts::PELICAN_CONFIG.to_string(),
                self.pelican_config.clone(),
            ),
            (PelicanOpts::THEME_DIR.to_string(), self.theme_dir.clone()),
            (
                PelicanOpts::PELICAN_OPTIONS.to_string(),
                self.pelican_options.clone(),
            ),
        ]
    }

    fn default_entries(&self) -> Vec<String> {
        vec![
            render_option(PelicanOpts::INPUT_DIR, ""),
            render_option(PelicanOpts::PELICAN_CONFIG, ""),
            render_option(PelicanOpts::THEME_DIR, ""),
            render_option(
                PelicanOpts::PELICAN_OPTIONS,
                PelicanOpts::PELICAN_OPTIONS_DEFAULT,
            ),
        ]
    }
}
