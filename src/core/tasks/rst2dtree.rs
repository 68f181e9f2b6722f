//! Dump the structure of reStructuredText sources as JSON.
//!
//! `inputs` lists files and directories. Directories are walked recursively,
//! skipping hidden entries. Each `.rst` file yields a `<stem>.json` under
//! `output_dir`, mirroring its path relative to the input it came from.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::config::{render_option, SectionView};
use crate::context::Reporter;
use crate::error::{Error, Result};
use crate::registry::TaskDescriptor;
use crate::rst::{self, DocumentTree};
use crate::state::SharedState;
use crate::task::{OutputDirOpt, Task, TaskCore, TaskInit, TaskOption};
use crate::{io, paths};

pub const KEY: &str = "rst2dtree";

const SOURCE_EXT: &str = "rst";
const TREE_EXT: &str = "json";

pub struct Rst2DtreeOpts;

impl Rst2DtreeOpts {
    pub const INPUTS: &'static str = "inputs";
}

pub fn load() -> Result<Vec<TaskDescriptor>> {
    Ok(vec![TaskDescriptor::new(
        KEY,
        "Write the section structure of reStructuredText files as JSON",
        factory,
    )])
}

fn factory(init: TaskInit) -> Box<dyn Task> {
    Box::new(Rst2DtreeTask::new(init))
}

/// One source file and the tree file it produces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conversion {
    pub source: PathBuf,
    pub target: PathBuf,
}

#[derive(Serialize)]
struct TreeFile<'a> {
    source: String,
    #[serde(flatten)]
    tree: &'a DocumentTree,
}

pub struct Rst2DtreeTask {
    core: TaskCore,
    output_dir: OutputDirOpt,
    inputs: Vec<String>,
}

fn is_hidden(path: &Path) -> bool {
    path.components()
        .any(|c| c.as_os_str().to_string_lossy().starts_with('.'))
}

fn is_source(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == SOURCE_EXT)
}

impl Rst2DtreeTask {
    pub fn new(init: TaskInit) -> Self {
        Self {
            core: TaskCore::new(init),
            output_dir: OutputDirOpt::with_default(""),
            inputs: Vec::new(),
        }
    }

    pub fn inputs(&self) -> &[String] {
        &self.inputs
    }

    /// Every conversion the inputs describe, plus the inputs that name no
    /// readable source.
    pub fn conversions(&self) -> Result<(Vec<Conversion>, Vec<String>)> {
        let out_root = self.output_dir.path();
        let mut conversions = Vec::new();
        let mut unusable = Vec::new();
        for input in &self.inputs {
            let path = paths::sanitize(input);
            if path.is_dir() {
                for file in io::list_files(&path, KEY)? {
                    let relative = file.strip_prefix(&path).unwrap_or(&file);
                    if is_hidden(relative) || !is_source(relative) {
                        continue;
                    }
                    conversions.push(Conversion {
                        target: out_root.join(relative).with_extension(TREE_EXT),
                        source: file,
                    });
                }
            } else if path.is_file() && is_source(&path) {
                let name = path.file_name().map(PathBuf::from).unwrap_or_default();
                conversions.push(Conversion {
                    target: out_root.join(name).with_extension(TREE_EXT),
                    source: path,
                });
            } else {
                unusable.push(input.clone());
            }
        }
        Ok((conversions, unusable))
    }

    fn convert(&self, conversion: &Conversion) -> Result<String> {
        let text = io::read_file(&conversion.source, KEY)?;
        let tree = rst::parse_structure(&text);
        let body = serde_json::to_string_pretty(&TreeFile {
            source: conversion.source.display().to_string(),
            tree: &tree,
        })
        .map_err(|e| Error::internal_json(e.to_string(), Some(KEY.to_string())))?;
        io::write_file(&conversion.target, &body, KEY)?;
        Ok(tree.title.unwrap_or_else(|| {
            conversion
                .source
                .file_stem()
                .map(|s| s.to_string_lossy().to_string())
                .unwrap_or_default()
        }))
    }
}

impl Task for Rst2DtreeTask {
    fn key(&self) -> &'static str {
        KEY
    }

    fn name(&self) -> &'static str {
        "Rst2DtreeTask"
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
        self.inputs = section
            .get_list(Rst2DtreeOpts::INPUTS)?
            .unwrap_or_default();
        Ok(())
    }

    fn run(&mut self, reporter: &mut Reporter, state: &mut SharedState) -> Result<()> {
        reporter.verbose("Starting Rst2Dtree Task.");
        if !self.output_dir.is_set() {
            self.core
                .error(format!("{} is not configured", OutputDirOpt::KEY));
            return Ok(());
        }

        let (conversions, unusable) = self.conversions()?;
        for input in unusable {
            self.core
                .warn(format!("Cannot load input \"{}\", skipping...", input));
        }

        let mut trees = BTreeMap::new();
        for conversion in &conversions {
            match self.convert(conversion) {
                Ok(title) => {
                    reporter.verbose(format!(
                        "  {} -> {}",
                        conversion.source.display(),
                        conversion.target.display()
                    ));
                    trees.insert(title, conversion.target.display().to_string());
                }
                Err(e) => self.core.error(e.message),
            }
        }
        state.publish(self.core.tag(), &trees)?;
        Ok(())
    }

    fn debug_entries(&self) -> Vec<(String, String)> {
        vec![(Rst2DtreeOpts::INPUTS.to_string(), self.inputs.join(" "))]
    }

    fn default_entries(&self) -> Vec<String> {
        vec![render_option(Rst2DtreeOpts::INPUTS, "")]
    }
}
