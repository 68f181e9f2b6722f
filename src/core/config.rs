//! Configuration document: `[section]` headers with `key = value` options.
//!
//! The `general` section always exists and is seeded with built-in defaults
//! before any file is read. Values may reference other options with
//! `${option}` (same section) or `${section:option}`; references are resolved
//! when an option is read, never when it is written. `$$` is a literal `$`.

use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use crate::context::Reporter;
use crate::error::{Error, Result};

pub const GENERAL: &str = "general";
pub const DEFAULT_CONFIG_FILE: &str = "convoy.cfg";
/// Separator used when a list option is rendered.
pub const LIST_SEP: char = ' ';
/// Section option naming the task type a section runs (defaults to the tag).
pub const TASK_TYPE_KEY: &str = "task";

pub struct GeneralOpts;

impl GeneralOpts {
    pub const TMP_DIR: &'static str = "tmp_dir";
    pub const OUTPUT_DIR: &'static str = "output_dir";
    pub const STAGING_DIR: &'static str = "staging_dir";
    pub const DATE_FORMAT: &'static str = "date_format";
    pub const ENABLED_TASKS: &'static str = "enabled_tasks";
}

/// Built-in values for the general section, in rendering order.
pub const GENERAL_DEFAULTS: &[(&str, &str)] = &[
    (GeneralOpts::TMP_DIR, "/tmp/convoy"),
    (GeneralOpts::OUTPUT_DIR, "${tmp_dir}/output"),
    (GeneralOpts::STAGING_DIR, "${tmp_dir}/staging"),
    (GeneralOpts::DATE_FORMAT, "%Y-%m-%d %H:%M"),
    (GeneralOpts::ENABLED_TASKS, ""),
];

static REFERENCE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\$|\$\{([^}]*)\}").unwrap());

#[derive(Debug, Clone)]
struct Section {
    name: String,
    options: Vec<(String, String)>,
}

impl Section {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            options: Vec::new(),
        }
    }

    fn get(&self, option: &str) -> Option<&str> {
        self.options
            .iter()
            .find(|(key, _)| key == option)
            .map(|(_, value)| value.as_str())
    }

    /// Set an option, replacing an existing value in place. Returns its index.
    fn set(&mut self, option: String, value: String) -> usize {
        if let Some(idx) = self.options.iter().position(|(key, _)| *key == option) {
            self.options[idx].1 = value;
            return idx;
        }
        self.options.push((option, value));
        self.options.len() - 1
    }
}

#[derive(Debug, Clone)]
pub struct ConfigDocument {
    path: Option<PathBuf>,
    sections: Vec<Section>,
}

impl Default for ConfigDocument {
    fn default() -> Self {
        Self::defaults()
    }
}

impl ConfigDocument {
    /// Document holding only the general-section defaults.
    pub fn defaults() -> Self {
        let mut general = Section::new(GENERAL);
        for (key, value) in GENERAL_DEFAULTS {
            general.set(key.to_string(), value.to_string());
        }
        Self {
            path: None,
            sections: vec![general],
        }
    }

    /// Load a config file over the built-in defaults.
    ///
    /// A missing or unreadable file is not an error: the defaults are used and
    /// a debug message says so. Content that cannot be parsed is an error.
    pub fn load(path: Option<&Path>, reporter: &mut Reporter) -> Result<Self> {
        let mut doc = Self::defaults();
        let Some(path) = path else {
            reporter.debug("ConfigDocument: no config file given, defaults loaded.");
            return Ok(doc);
        };

        match fs::read_to_string(path) {
            Ok(text) => {
                reporter.debug(format!("ConfigDocument: reading {}", path.display()));
                doc.merge_text(&text, Some(path.display().to_string()))?;
                doc.path = Some(path.to_path_buf());
            }
            Err(e) => {
                reporter.debug(format!(
                    "ConfigDocument: config file \"{}\" could not be loaded ({}). Defaults loaded.",
                    path.display(),
                    e
                ));
            }
        }
        Ok(doc)
    }

    /// Parse configuration text over the built-in defaults.
    pub fn parse(text: &str) -> Result<Self> {
        let mut doc = Self::defaults();
        doc.merge_text(text, None)?;
        Ok(doc)
    }

    /// Path of the file the document was read from, if any.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn merge_text(&mut self, text: &str, origin: Option<String>) -> Result<()> {
        let mut current: Option<usize> = None;
        // (section index, option index, indent of the option line)
        let mut last_option: Option<(usize, usize, usize)> = None;

        for (idx, raw_line) in text.lines().enumerate() {
            let line_no = idx + 1;
            let trimmed = raw_line.trim();

            if trimmed.is_empty() {
                last_option = None;
                continue;
            }
            if trimmed.starts_with('#') || trimmed.starts_with(';') {
                continue;
            }

            let indent = raw_line.len() - raw_line.trim_start().len();
            if let Some((section, option, option_indent)) = last_option {
                if indent > option_indent {
                    let value = &mut self.sections[section].options[option].1;
                    if !value.is_empty() {
                        value.push('\n');
                    }
                    value.push_str(trimmed);
                    continue;
                }
            }

            if trimmed.starts_with('[') {
                let name = trimmed
                    .strip_prefix('[')
                    .and_then(|rest| rest.strip_suffix(']'))
                    .map(str::trim)
                    .filter(|name| !name.is_empty())
                    .ok_or_else(|| {
                        Error::config_parse(
                            origin.clone(),
                            line_no,
                            format!("malformed section header '{}'", trimmed),
                        )
                    })?;
                current = Some(self.section_index_or_insert(name));
                last_option = None;
                continue;
            }

            let section = current.ok_or_else(|| {
                Error::config_parse(
                    origin.clone(),
                    line_no,
                    "option appears before any [section] header",
                )
            })?;

            let (key, value) = split_option(trimmed).ok_or_else(|| {
                Error::config_parse(
                    origin.clone(),
                    line_no,
                    format!("expected 'key = value', found '{}'", trimmed),
                )
            })?;

            let option = self.sections[section].set(key, value);
            last_option = Some((section, option, indent));
        }

        Ok(())
    }

    fn section_index_or_insert(&mut self, name: &str) -> usize {
        if let Some(idx) = self.sections.iter().position(|s| s.name == name) {
            return idx;
        }
        self.sections.push(Section::new(name));
        self.sections.len() - 1
    }

    fn section(&self, name: &str) -> Option<&Section> {
        self.sections.iter().find(|s| s.name == name)
    }

    /// Section names in document order (general first).
    pub fn sections(&self) -> Vec<&str> {
        self.sections.iter().map(|s| s.name.as_str()).collect()
    }

    pub fn has_section(&self, section: &str) -> bool {
        self.section(section).is_some()
    }

    /// Option names of a section in document order; empty for a missing section.
    pub fn options(&self, section: &str) -> Vec<&str> {
        self.section(section)
            .map(|s| s.options.iter().map(|(key, _)| key.as_str()).collect())
            .unwrap_or_default()
    }

    /// The stored value without interpolation.
    pub fn raw(&self, section: &str, option: &str) -> Option<&str> {
        self.section(section)?.get(&option.to_lowercase())
    }

    /// Read an option with interpolation resolved.
    ///
    /// `Ok(None)` means the option is not configured, which is distinct from
    /// `Ok(Some(""))`. Errors only come from interpolation.
    pub fn get(&self, section: &str, option: &str) -> Result<Option<String>> {
        let option = option.to_lowercase();
        let Some(raw) = self.raw(section, &option) else {
            return Ok(None);
        };
        let mut chain = Vec::new();
        self.interpolate(section, &option, raw, &mut chain).map(Some)
    }

    fn interpolate(
        &self,
        section: &str,
        option: &str,
        raw: &str,
        chain: &mut Vec<String>,
    ) -> Result<String> {
        let here = format!("{}:{}", section, option);
        if chain.contains(&here) {
            chain.push(here);
            return Err(Error::interpolation_cycle(section, option, chain.clone()));
        }
        chain.push(here);

        let mut out = String::with_capacity(raw.len());
        let mut last = 0;
        for caps in REFERENCE_PATTERN.captures_iter(raw) {
            let Some(whole) = caps.get(0) else {
                continue;
            };
            out.push_str(&raw[last..whole.start()]);
            last = whole.end();

            let Some(reference) = caps.get(1) else {
                out.push('$');
                continue;
            };
            let reference = reference.as_str().trim();
            let (ref_section, ref_option) = match reference.split_once(':') {
                Some((s, o)) => (s.trim(), o.trim().to_lowercase()),
                None => (section, reference.to_lowercase()),
            };
            let target = self
                .raw(ref_section, &ref_option)
                .ok_or_else(|| Error::interpolation_missing(section, option, reference))?;
            let resolved = self.interpolate(ref_section, &ref_option, target, chain)?;
            out.push_str(&resolved);
        }
        out.push_str(&raw[last..]);

        chain.pop();
        Ok(out)
    }

    pub fn get_bool(&self, section: &str, option: &str) -> Result<Option<bool>> {
        let Some(value) = self.get(section, option)? else {
            return Ok(None);
        };
        parse_bool(&value).map(Some).ok_or_else(|| {
            Error::config_invalid_value(
                section,
                option,
                Some(value.clone()),
                "expected one of 1/yes/true/on or 0/no/false/off",
            )
        })
    }

    /// Split an option into items. Newlines always separate items as well.
    pub fn get_list(
        &self,
        section: &str,
        option: &str,
        separator: char,
    ) -> Result<Option<Vec<String>>> {
        Ok(self
            .get(section, option)?
            .map(|value| split_list(&value, separator)))
    }

    /// Borrowed view of one section, used by tasks and option capabilities.
    pub fn view<'a>(&'a self, section: &'a str) -> SectionView<'a> {
        SectionView { doc: self, name: section }
    }

    /// Interpolate a value that is not stored in the document, such as a
    /// declared default, as if it were `section.option`.
    pub fn resolve(&self, section: &str, option: &str, raw: &str) -> Result<String> {
        let mut chain = Vec::new();
        self.interpolate(section, &option.to_lowercase(), raw, &mut chain)
    }

    fn general_or_default(&self, option: &str) -> Result<String> {
        if let Some(value) = self.get(GENERAL, option)? {
            return Ok(value);
        }
        let default = GENERAL_DEFAULTS
            .iter()
            .find(|(key, _)| *key == option)
            .map(|(_, value)| *value)
            .unwrap_or_default();
        self.resolve(GENERAL, option, default)
    }

    pub fn tmp_dir(&self) -> Result<String> {
        self.general_or_default(GeneralOpts::TMP_DIR)
    }

    pub fn output_dir(&self) -> Result<String> {
        self.general_or_default(GeneralOpts::OUTPUT_DIR)
    }

    pub fn staging_dir(&self) -> Result<String> {
        self.general_or_default(GeneralOpts::STAGING_DIR)
    }

    /// strftime-style format used when stamping generated pages.
    pub fn date_format(&self) -> Result<String> {
        self.general_or_default(GeneralOpts::DATE_FORMAT)
    }

    /// Tags from `general.enabled_tasks`, in execution order.
    pub fn enabled_tasks(&self) -> Result<Vec<String>> {
        Ok(self
            .get_list(GENERAL, GeneralOpts::ENABLED_TASKS, LIST_SEP)?
            .unwrap_or_default())
    }

    /// The task type a tag runs: its `task` option, or the tag itself.
    pub fn task_type(&self, tag: &str) -> Result<String> {
        let explicit = self
            .get(tag, TASK_TYPE_KEY)?
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty());
        Ok(explicit.unwrap_or_else(|| tag.to_string()))
    }
}

/// A section of a [`ConfigDocument`].
#[derive(Clone, Copy)]
pub struct SectionView<'a> {
    doc: &'a ConfigDocument,
    name: &'a str,
}

impl<'a> SectionView<'a> {
    pub fn name(&self) -> &'a str {
        self.name
    }

    pub fn document(&self) -> &'a ConfigDocument {
        self.doc
    }

    pub fn get(&self, option: &str) -> Result<Option<String>> {
        self.doc.get(self.name, option)
    }

    pub fn get_bool(&self, option: &str) -> Result<Option<bool>> {
        self.doc.get_bool(self.name, option)
    }

    pub fn get_list(&self, option: &str) -> Result<Option<Vec<String>>> {
        self.doc.get_list(self.name, option, LIST_SEP)
    }

    pub fn options(&self) -> Vec<&'a str> {
        self.doc.options(self.name)
    }

    pub fn resolve(&self, option: &str, raw: &str) -> Result<String> {
        self.doc.resolve(self.name, option, raw)
    }
}

fn split_option(line: &str) -> Option<(String, String)> {
    let pos = line.find(|c: char| c == '=' || c == ':')?;
    let key = line[..pos].trim().to_lowercase();
    if key.is_empty() {
        return None;
    }
    Some((key, line[pos + 1..].trim().to_string()))
}

pub fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "yes" | "true" | "on" => Some(true),
        "0" | "no" | "false" | "off" => Some(false),
        _ => None,
    }
}

/// Split a list option. A whitespace separator splits on any run of
/// whitespace; other separators also split on newlines.
pub fn split_list(value: &str, separator: char) -> Vec<String> {
    if separator.is_whitespace() {
        return value.split_whitespace().map(str::to_string).collect();
    }
    value
        .split(|c: char| c == separator || c == '\n')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

/// Render one `key = value` line of a config document.
pub fn render_option(key: &str, value: &str) -> String {
    if value.is_empty() {
        format!("{} =\n", key)
    } else {
        format!("{} = {}\n", key, value)
    }
}

/// Render the general section with its built-in defaults.
pub fn render_general_defaults() -> String {
    let mut out = format!("[{}]\n", GENERAL);
    for (key, value) in GENERAL_DEFAULTS {
        out.push_str(&render_option(key, value));
    }
    out
}
