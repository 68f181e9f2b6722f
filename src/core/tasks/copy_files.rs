//! Copy source files into the build tree.
//!
//! Each job is a pair of options sharing a name: `<name>_src` lists sources
//! (paths or glob patterns) and `<name>_dst` names the destination directory.

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::{SectionView, TASK_TYPE_KEY};
use crate::context::Reporter;
use crate::error::{Error, Result};
use crate::registry::TaskDescriptor;
use crate::state::SharedState;
use crate::task::{Task, TaskCore, TaskInit};
use crate::{io, paths};

pub const KEY: &str = "copy_files";

const SRC_SUFFIX: &str = "_src";
const DST_SUFFIX: &str = "_dst";

pub fn load() -> Result<Vec<TaskDescriptor>> {
    Ok(vec![TaskDescriptor::new(
        KEY,
        "Copy files and directories into the build tree",
        factory,
    )])
}

fn factory(init: TaskInit) -> Box<dyn Task> {
    Box::new(CopyFilesTask::new(init))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopyJob {
    pub name: String,
    pub sources: Vec<String>,
    pub destination: String,
}

pub struct CopyFilesTask {
    core: TaskCore,
    jobs: Vec<CopyJob>,
}

impl CopyFilesTask {
    pub fn new(init: TaskInit) -> Self {
        Self {
            core: TaskCore::new(init),
            jobs: Vec::new(),
        }
    }

    pub fn jobs(&self) -> &[CopyJob] {
        &self.jobs
    }

    fn run_job(&mut self, reporter: &mut Reporter, job: &CopyJob) {
        let destination = paths::sanitize(&job.destination);
        if let Err(e) = io::create_dir_all(&destination, "copy_files") {
            self.core.error(format!("{}: {}", job.name, e.message));
            return;
        }
        for source in &job.sources {
            let pattern = paths::sanitize(source).to_string_lossy().to_string();
            let matches = match glob::glob(&pattern) {
                Ok(paths) => paths.filter_map(|p| p.ok()).collect::<Vec<_>>(),
                Err(e) => {
                    self.core
                        .error(format!("{}: bad source pattern {}: {}", job.name, source, e));
                    continue;
                }
            };
            if matches.is_empty() {
                self.core
                    .warn(format!("{}: nothing matches {}", job.name, source));
                continue;
            }
            for path in matches {
                reporter.verbose(format!(
                    "  {} -> {}",
                    path.display(),
                    destination.display()
                ));
                if let Err(e) = copy_into(&path, &destination) {
                    self.core.error(format!("{}: {}", job.name, e.message));
                }
            }
        }
    }
}

/// Copy a file or a whole directory into `dest_dir`, keeping its name.
fn copy_into(source: &Path, dest_dir: &Path) -> Result<()> {
    let name = source.file_name().ok_or_else(|| {
        Error::internal_io(
            format!("cannot copy {}", source.display()),
            Some("copy_files".to_string()),
        )
    })?;
    let target = dest_dir.join(name);
    if source.is_dir() {
        for file in io::list_files(source, "copy_files")? {
            let relative = file.strip_prefix(source).unwrap_or(&file);
            copy_file(&file, &target.join(relative))?;
        }
        Ok(())
    } else {
        copy_file(source, &target)
    }
}

fn copy_file(from: &Path, to: &Path) -> Result<()> {
    if let Some(parent) = to.parent() {
        io::create_dir_all(parent, "copy_files")?;
    }
    fs::copy(from, to).map(|_| ()).map_err(|e| {
        Error::internal_io(
            format!("{} -> {}: {}", from.display(), to.display(), e),
            Some("copy_files".to_string()),
        )
    })
}

/// Collect jobs from `<name>_src` / `<name>_dst` pairs in document order.
fn collect_jobs(section: SectionView<'_>) -> Result<Vec<CopyJob>> {
    let mut names: Vec<String> = Vec::new();
    for option in section.options() {
        if option == TASK_TYPE_KEY {
            continue;
        }
        let name = option
            .strip_suffix(SRC_SUFFIX)
            .or_else(|| option.strip_suffix(DST_SUFFIX));
        match name {
            Some(name) if !name.is_empty() => {
                if !names.iter().any(|n| n == name) {
                    names.push(name.to_string());
                }
            }
            _ => {
                return Err(Error::config_invalid_value(
                    section.name(),
                    option,
                    None,
                    "copy_files options must be named <job>_src or <job>_dst",
                ))
            }
        }
    }

    let mut jobs = Vec::with_capacity(names.len());
    for name in names {
        let src_key = format!("{}{}", name, SRC_SUFFIX);
        let dst_key = format!("{}{}", name, DST_SUFFIX);
        let sources = section.get_list(&src_key)?.unwrap_or_default();
        let destination = section.get(&dst_key)?.unwrap_or_default();
        if sources.is_empty() {
            return Err(Error::config_invalid_value(
                section.name(),
                src_key,
                None,
                format!("job '{}' has no sources", name),
            ));
        }
        if destination.trim().is_empty() {
            return Err(Error::config_invalid_value(
                section.name(),
                dst_key,
                None,
                format!("job '{}' has no destination", name),
            ));
        }
        jobs.push(CopyJob {
            name,
            sources,
            destination: destination.trim().to_string(),
        });
    }
    Ok(jobs)
}

impl Task for CopyFilesTask {
    fn key(&self) -> &'static str {
        KEY
    }

    fn name(&self) -> &'static str {
        "CopyFilesTask"
    }

    fn core(&self) -> &TaskCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut TaskCore {
        &mut self.core
    }

    fn load_task_config(&mut self, section: SectionView<'_>) -> Result<()> {
        self.jobs = collect_jobs(section)?;
        Ok(())
    }

    fn run(&mut self, reporter: &mut Reporter, state: &mut SharedState) -> Result<()> {
        reporter.verbose("Starting Copy Files Task.");
        let jobs = self.jobs.clone();
        for job in &jobs {
            self.run_job(reporter, job);
        }
        let destinations: Vec<PathBuf> = jobs
            .iter()
            .map(|job| paths::sanitize(&job.destination))
            .collect();
        state.publish(self.core.tag(), &destinations)?;
        Ok(())
    }

    fn debug_entries(&self) -> Vec<(String, String)> {
        self.jobs
            .iter()
            .map(|job| {
                (
                    job.name.clone(),
                    format!("{} -> {}", job.sources.join(" "), job.destination),
                )
            })
            .collect()
    }

    fn default_entries(&self) -> Vec<String> {
        vec!["; Add <job>_src and <job>_dst option pairs for each copy job\n".to_string()]
    }
}
