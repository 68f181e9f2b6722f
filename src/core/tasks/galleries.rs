//! RST gallery pages, one per image directory.
//!
//! Every sub-directory of the `galleries` root holding files becomes a page
//! named after its relative path (`/` replaced by `-`). When the `stubs`
//! directory has a `<name>.rst` file, that text opens the page instead of the
//! generated title and fallback metadata.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::{render_option, SectionView};
use crate::context::Reporter;
use crate::error::{Error, Result};
use crate::registry::TaskDescriptor;
use crate::rst;
use crate::state::SharedState;
use crate::task::{OutputDirOpt, Task, TaskCore, TaskInit, TaskOption};
use crate::{io, paths};

pub const KEY: &str = "galleries";

const SUFFIX: &str = "rst";
const MEDIA_PREFIX: &str = "./images";

pub struct GalleriesOpts;

impl GalleriesOpts {
    pub const GALLERIES: &'static str = "galleries";
    pub const STUBS: &'static str = "stubs";
    pub const FALLBACK_DATE: &'static str = "1990-01-01 01:01";
    pub const FALLBACK_CATEGORY: &'static str = "pics";
}

pub fn load() -> Result<Vec<TaskDescriptor>> {
    Ok(vec![TaskDescriptor::new(
        KEY,
        "Write RST gallery pages for directories of images",
        factory,
    )])
}

fn factory(init: TaskInit) -> Box<dyn Task> {
    Box::new(GalleriesTask::new(init))
}

pub struct GalleriesTask {
    core: TaskCore,
    output_dir: OutputDirOpt,
    galleries: Option<PathBuf>,
    stubs_dir: Option<PathBuf>,
    stubs: BTreeMap<String, PathBuf>,
}

impl GalleriesTask {
    pub fn new(init: TaskInit) -> Self {
        Self {
            core: TaskCore::new(init),
            output_dir: OutputDirOpt::new(),
            galleries: None,
            stubs_dir: None,
            stubs: BTreeMap::new(),
        }
    }

    pub fn stubs(&self) -> &BTreeMap<String, PathBuf> {
        &self.stubs
    }

    fn write_gallery(&self, name: &str, media: &[String]) -> Result<PathBuf> {
        let header = match self.stubs.get(name) {
            Some(stub) => io::read_file(stub, "read gallery stub")?,
            None => generated_header(name),
        };
        let filename = self.output_dir.path().join(format!("{}.{}", name, SUFFIX));
        io::write_file(&filename, &(header + &gallery_block(media)), "galleries")?;
        Ok(filename)
    }
}

/// Title plus the fallback metadata used when no stub exists.
pub fn generated_header(name: &str) -> String {
    let mut out = rst::title(name, Some(rst::SECTION_LEVELS[0]), true);
    out.push_str(&rst::metadata(&[
        ("date", GalleriesOpts::FALLBACK_DATE),
        ("category", GalleriesOpts::FALLBACK_CATEGORY),
        ("tags", GalleriesOpts::FALLBACK_CATEGORY),
        ("summary", ""),
    ]));
    out
}

/// The image directives wrapped in a `gallery` div.
pub fn gallery_block(media: &[String]) -> String {
    let mut out = String::from("\n");
    out.push_str(&rst::raw_html("<div class=\"gallery\">"));
    for image in media {
        out.push_str(&rst::image(image));
    }
    out.push('\n');
    out.push_str(&rst::raw_html("</div>"));
    out
}

/// Stub files in `dir` keyed by name without the `.rst` suffix.
fn load_stubs(dir: &Path) -> Result<BTreeMap<String, PathBuf>> {
    let entries = fs::read_dir(dir).map_err(|e| {
        Error::internal_io(
            format!("{}: {}", dir.display(), e),
            Some("load gallery stubs".to_string()),
        )
    })?;
    let mut stubs = BTreeMap::new();
    for entry in entries.flatten() {
        let path = entry.path();
        let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        let suffix = format!(".{}", SUFFIX);
        if path.is_file() && file_name.to_lowercase().ends_with(&suffix) {
            let name = file_name[..file_name.len() - suffix.len()].to_string();
            stubs.insert(name, path.clone());
        }
    }
    Ok(stubs)
}

/// `(relative dir, sorted file names)` for every directory below `root`.
fn image_dirs(root: &Path) -> Result<Vec<(String, Vec<String>)>> {
    let mut found = Vec::new();
    let mut pending = vec![root.to_path_buf()];
    while let Some(dir) = pending.pop() {
        let entries = fs::read_dir(&dir).map_err(|e| {
            Error::internal_io(
                format!("{}: {}", dir.display(), e),
                Some("scan galleries".to_string()),
            )
        })?;
        let mut files = Vec::new();
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                pending.push(path);
            } else if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                files.push(name.to_string());
            }
        }
        if dir == root {
            continue;
        }
        files.sort();
        let relative = dir
            .strip_prefix(root)
            .unwrap_or(&dir)
            .to_string_lossy()
            .to_string();
        found.push((relative, files));
    }
    found.sort();
    Ok(found)
}

impl Task for GalleriesTask {
    fn key(&self) -> &'static str {
        KEY
    }

    fn name(&self) -> &'static str {
        "GalleriesTask"
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
        let non_empty = |value: Option<String>| {
            value
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .map(|v| paths::sanitize(&v))
        };
        self.galleries = non_empty(section.get(GalleriesOpts::GALLERIES)?);
        self.stubs_dir = non_empty(section.get(GalleriesOpts::STUBS)?);
        self.stubs = match &self.stubs_dir {
            Some(dir) => load_stubs(dir)?,
            None => BTreeMap::new(),
        };
        Ok(())
    }

    fn run(&mut self, reporter: &mut Reporter, state: &mut SharedState) -> Result<()> {
        reporter.verbose("Starting Galleries Task.");
        let Some(root) = self.galleries.clone() else {
            self.core
                .error(format!("{} is not configured", GalleriesOpts::GALLERIES));
            return Ok(());
        };
        if !root.is_dir() {
            self.core
                .error(format!("gallery directory {} does not exist", root.display()));
            return Ok(());
        }

        let mut written = Vec::new();
        for (relative, files) in image_dirs(&root)? {
            let name = relative.replace('/', "-");
            if files.is_empty() {
                reporter.verbose(format!("Skipping {}, no images.", name));
                continue;
            }
            let media: Vec<String> = files
                .iter()
                .map(|f| format!("{}/{}/{}", MEDIA_PREFIX, relative, f))
                .collect();
            reporter.verbose(format!(
                "Creating gallery: {}.{} - {} images",
                name,
                SUFFIX,
                media.len()
            ));
            match self.write_gallery(&name, &media) {
                Ok(path) => written.push(path),
                Err(e) => self.core.error(format!("{}: {}", name, e.message)),
            }
        }
        state.publish(self.core.tag(), &written)?;
        Ok(())
    }

    fn debug_entries(&self) -> Vec<(String, String)> {
        let show = |p: &Option<PathBuf>| {
            p.as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_default()
        };
        vec![
            (GalleriesOpts::GALLERIES.to_string(), show(&self.galleries)),
            (GalleriesOpts::STUBS.to_string(), show(&self.stubs_dir)),
            (
                "stub_pages".to_string(),
                self.stubs.keys().cloned().collect::<Vec<_>>().join(" "),
            ),
        ]
    }

    fn default_entries(&self) -> Vec<String> {
        vec![
            render_option(GalleriesOpts::GALLERIES, ""),
            render_option(GalleriesOpts::STUBS, ""),
        ]
    }
}
