//! Reusable option capabilities.
//!
//! Each capability owns one option of a task's section: it knows its key, its
//! declared default, and how to load and render itself. Tasks list the
//! capabilities they carry; capabilities never read each other's values.

use std::path::PathBuf;

use crate::config::{render_option, SectionView, LIST_SEP};
use crate::error::Result;
use crate::paths;

pub trait TaskOption {
    fn key(&self) -> &'static str;

    /// Read this option from the task's section, falling back to the default.
    fn load(&mut self, section: SectionView<'_>) -> Result<()>;

    /// `key: resolved value`
    fn debug_line(&self) -> String;

    /// `key = declared default`, uninterpolated.
    fn default_line(&self) -> String;
}

/// Where the task writes its output.
#[derive(Debug, Clone)]
pub struct OutputDirOpt {
    default: String,
    value: String,
}

impl OutputDirOpt {
    pub const KEY: &'static str = "output_dir";
    pub const DEFAULT: &'static str = "${general:staging_dir}";

    pub fn new() -> Self {
        Self::with_default(Self::DEFAULT)
    }

    pub fn with_default(default: impl Into<String>) -> Self {
        Self {
            default: default.into(),
            value: String::new(),
        }
    }

    /// Resolved value, `~`-expanded. Empty until loaded or when unset.
    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn is_set(&self) -> bool {
        !self.value.is_empty()
    }

    pub fn path(&self) -> PathBuf {
        paths::sanitize(&self.value)
    }
}

impl Default for OutputDirOpt {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskOption for OutputDirOpt {
    fn key(&self) -> &'static str {
        Self::KEY
    }

    fn load(&mut self, section: SectionView<'_>) -> Result<()> {
        let value = match section.get(Self::KEY)? {
            Some(value) => value,
            None => section.resolve(Self::KEY, &self.default)?,
        };
        let value = value.trim();
        self.value = if value.is_empty() {
            String::new()
        } else {
            shellexpand::tilde(value).to_string()
        };
        Ok(())
    }

    fn debug_line(&self) -> String {
        format!("{}: {}", Self::KEY, self.value)
    }

    fn default_line(&self) -> String {
        render_option(Self::KEY, &self.default)
    }
}

/// Extra directories a task handles besides the general ones.
#[derive(Debug, Clone, Default)]
pub struct OtherDirsOpt {
    dirs: Vec<String>,
}

impl OtherDirsOpt {
    pub const KEY: &'static str = "other_dirs";

    pub fn new() -> Self {
        Self::default()
    }

    pub fn dirs(&self) -> &[String] {
        &self.dirs
    }
}

impl TaskOption for OtherDirsOpt {
    fn key(&self) -> &'static str {
        Self::KEY
    }

    fn load(&mut self, section: SectionView<'_>) -> Result<()> {
        self.dirs = section.get_list(Self::KEY)?.unwrap_or_default();
        Ok(())
    }

    fn debug_line(&self) -> String {
        format!("{}: {}", Self::KEY, self.dirs.join(&LIST_SEP.to_string()))
    }

    fn default_line(&self) -> String {
        render_option(Self::KEY, "")
    }
}

/// Whether a task also handles `tmp_dir`, `output_dir` and `staging_dir`.
#[derive(Debug, Clone)]
pub struct GeneralDirsOpt {
    enabled: bool,
}

impl GeneralDirsOpt {
    pub const KEY: &'static str = "general_dirs";
    pub const DEFAULT: bool = true;

    pub fn new() -> Self {
        Self {
            enabled: Self::DEFAULT,
        }
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    /// The general directories, resolved, when the option is enabled.
    pub fn dirs(&self, section: SectionView<'_>) -> Result<Vec<String>> {
        if !self.enabled {
            return Ok(Vec::new());
        }
        let config = section.document();
        let mut dirs = Vec::new();
        for dir in [config.tmp_dir()?, config.output_dir()?, config.staging_dir()?] {
            let dir = dir.trim();
            if !dir.is_empty() {
                dirs.push(dir.to_string());
            }
        }
        Ok(dirs)
    }
}

impl Default for GeneralDirsOpt {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskOption for GeneralDirsOpt {
    fn key(&self) -> &'static str {
        Self::KEY
    }

    fn load(&mut self, section: SectionView<'_>) -> Result<()> {
        self.enabled = section.get_bool(Self::KEY)?.unwrap_or(Self::DEFAULT);
        Ok(())
    }

    fn debug_line(&self) -> String {
        format!("{}: {}", Self::KEY, self.enabled())
    }

    fn default_line(&self) -> String {
        render_option(Self::KEY, &Self::DEFAULT.to_string())
    }
}
