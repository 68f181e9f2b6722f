//! RST pages built from `git log` output.
//!
//! Every option of the section other than `output_dir` and `task` names a
//! repository: `<name> = <path>`. Each repository becomes `<name>_log.rst`.

use std::path::PathBuf;
use std::sync::LazyLock;

use heck::ToTitleCase;
use regex::Regex;

use crate::command;
use crate::config::{SectionView, TASK_TYPE_KEY};
use crate::context::Reporter;
use crate::error::Result;
use crate::registry::TaskDescriptor;
use crate::rst;
use crate::state::SharedState;
use crate::task::{OutputDirOpt, Task, TaskCore, TaskInit, TaskOption};
use crate::tasks::timestamp;
use crate::{io, paths};

pub const KEY: &str = "git_log_pages";

static EMAIL_PATTERN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<.*>").unwrap());

pub fn load() -> Result<Vec<TaskDescriptor>> {
    Ok(vec![TaskDescriptor::new(
        KEY,
        "Write RST pages from git repository logs",
        factory,
    )])
}

fn factory(init: TaskInit) -> Box<dyn Task> {
    Box::new(GitLogPagesTask::new(init))
}

pub struct GitLogPagesTask {
    core: TaskCore,
    output_dir: OutputDirOpt,
    repos: Vec<(String, PathBuf)>,
}

impl GitLogPagesTask {
    pub fn new(init: TaskInit) -> Self {
        Self {
            core: TaskCore::new(init),
            output_dir: OutputDirOpt::new(),
            repos: Vec::new(),
        }
    }

    pub fn repos(&self) -> &[(String, PathBuf)] {
        &self.repos
    }
}

/// `git log` wrapped in a literal block, author e-mail addresses removed.
pub fn log_block(log: &str) -> String {
    let cleaned = EMAIL_PATTERN.replace_all(log.trim_end(), "");
    format!("{}\n[End of log]", rst::literal_block(&cleaned))
}

/// Title, metadata and a rule; the log block follows.
pub fn page_header(title: &str, date: &str) -> String {
    let mut page = rst::title(title, Some(rst::SECTION_LEVELS[0]), true);
    page.push_str(&rst::metadata(&[
        ("date", date.to_string()),
        (
            "summary",
            format!("A log of activity from the {} repository.", title.to_lowercase()),
        ),
    ]));
    page.push_str(rst::HORIZONTAL_RULE);
    page
}

impl Task for GitLogPagesTask {
    fn key(&self) -> &'static str {
        KEY
    }

    fn name(&self) -> &'static str {
        "GitLogPagesTask"
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
        self.repos.clear();
        for option in section.options() {
            if option == OutputDirOpt::KEY || option == TASK_TYPE_KEY {
                continue;
            }
            let path = section.get(option)?.unwrap_or_default();
            self.repos.push((option.to_string(), paths::sanitize(&path)));
        }
        Ok(())
    }

    fn run(&mut self, reporter: &mut Reporter, state: &mut SharedState) -> Result<()> {
        reporter.verbose("Starting Git Log Pages Task.");
        let date = timestamp(self.core.config())?;
        let output_dir = self.output_dir.path();
        io::create_dir_all(&output_dir, "git_log_pages")?;

        let mut written = Vec::new();
        for (name, repo) in self.repos.clone() {
            let title = format!("{} log", name.to_title_case());
            let filename = output_dir.join(format!("{}_log.rst", name));
            reporter.verbose(format!(
                "Writing Log File {}: {}",
                title,
                filename.display()
            ));
            let log = match command::run_in(&repo, "git", &["log", "--decorate=no"], "git log") {
                Ok(log) => log,
                Err(e) => {
                    self.core.error(format!("{}: {}", name, e.message));
                    continue;
                }
            };
            let page = page_header(&title, &date) + &log_block(&log);
            io::write_file(&filename, &page, "git_log_pages")?;
            written.push(filename);
        }
        state.publish(self.core.tag(), &written)?;
        Ok(())
    }

    fn debug_entries(&self) -> Vec<(String, String)> {
        self.repos
            .iter()
            .map(|(name, path)| (name.clone(), path.display().to_string()))
            .collect()
    }

    fn default_entries(&self) -> Vec<String> {
        vec!["; Add one <repo_name> = <repo_path> option per repository\n".to_string()]
    }
}
