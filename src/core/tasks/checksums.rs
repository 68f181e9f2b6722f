//! SHA-512 manifest of the build output.
//!
//! Writes one `<hex digest>  <relative path>` line per file, sorted by path,
//! the same layout `sha512sum -c` reads.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha512};

use crate::config::{render_option, SectionView};
use crate::context::Reporter;
use crate::error::{Error, Result};
use crate::registry::TaskDescriptor;
use crate::state::SharedState;
use crate::task::{Task, TaskCore, TaskInit};
use crate::{io, paths};

pub const KEY: &str = "checksums";

pub struct ChecksumsOpts;

impl ChecksumsOpts {
    pub const FILENAME: &'static str = "filename";
    pub const FILENAME_DEFAULT: &'static str = "checksums.txt";
    pub const TARGET_DIR: &'static str = "target_dir";
    pub const TARGET_DIR_DEFAULT: &'static str = "${general:output_dir}";
}

pub fn load() -> Result<Vec<TaskDescriptor>> {
    Ok(vec![TaskDescriptor::new(
        KEY,
        "Write a SHA-512 checksum manifest of the output directory",
        factory,
    )])
}

fn factory(init: TaskInit) -> Box<dyn Task> {
    Box::new(ChecksumsTask::new(init))
}

pub struct ChecksumsTask {
    core: TaskCore,
    filename: String,
    target_dir: PathBuf,
}

impl ChecksumsTask {
    pub fn new(init: TaskInit) -> Self {
        Self {
            core: TaskCore::new(init),
            filename: ChecksumsOpts::FILENAME_DEFAULT.to_string(),
            target_dir: PathBuf::new(),
        }
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.target_dir.join(&self.filename)
    }
}

/// Hex SHA-512 of a file, read in chunks.
pub fn sha512_hex(path: &Path) -> Result<String> {
    let io_err = |e: std::io::Error| {
        Error::internal_io(
            format!("{}: {}", path.display(), e),
            Some("checksums".to_string()),
        )
    };
    let mut file = fs::File::open(path).map_err(io_err)?;
    let mut hasher = Sha512::new();
    std::io::copy(&mut file, &mut hasher).map_err(io_err)?;
    Ok(hasher
        .finalize()
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect())
}

impl Task for ChecksumsTask {
    fn key(&self) -> &'static str {
        KEY
    }

    fn name(&self) -> &'static str {
        "ChecksumsTask"
    }

    fn core(&self) -> &TaskCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut TaskCore {
        &mut self.core
    }

    fn load_task_config(&mut self, section: SectionView<'_>) -> Result<()> {
        if let Some(filename) = section.get(ChecksumsOpts::FILENAME)? {
            let filename = filename.trim();
            if filename.is_empty() || filename.contains('/') {
                return Err(Error::config_invalid_value(
                    section.name(),
                    ChecksumsOpts::FILENAME,
                    Some(filename.to_string()),
                    "expected a plain file name",
                ));
            }
            self.filename = filename.to_string();
        }
        let target = match section.get(ChecksumsOpts::TARGET_DIR)? {
            Some(value) => value,
            None => section.resolve(ChecksumsOpts::TARGET_DIR, ChecksumsOpts::TARGET_DIR_DEFAULT)?,
        };
        self.target_dir = paths::sanitize(&target);
        Ok(())
    }

    fn run(&mut self, reporter: &mut Reporter, state: &mut SharedState) -> Result<()> {
        reporter.verbose("Starting Checksums Task.");
        if !self.target_dir.is_dir() {
            self.core.error(format!(
                "target directory {} does not exist",
                self.target_dir.display()
            ));
            return Ok(());
        }

        let manifest = self.manifest_path();
        let mut sums = BTreeMap::new();
        for file in io::list_files(&self.target_dir, "checksums")? {
            if file == manifest {
                continue;
            }
            let relative = file
                .strip_prefix(&self.target_dir)
                .unwrap_or(&file)
                .to_string_lossy()
                .to_string();
            match sha512_hex(&file) {
                Ok(hex) => {
                    sums.insert(relative, hex);
                }
                Err(e) => self.core.error(e.message),
            }
        }

        let body: String = sums
            .iter()
            .map(|(path, hex)| format!("{}  {}\n", hex, path))
            .collect();
        io::write_file(&manifest, &body, "checksums")?;
        reporter.verbose(format!(
            "  {} checksums written to {}",
            sums.len(),
            manifest.display()
        ));
        state.publish(self.core.tag(), &sums)?;
        Ok(())
    }

    fn debug_entries(&self) -> Vec<(String, String)> {
        vec![
            (ChecksumsOpts::FILENAME.to_string(), self.filename.clone()),
            (
                ChecksumsOpts::TARGET_DIR.to_string(),
                self.target_dir.display().to_string(),
            ),
        ]
    }

    fn default_entries(&self) -> Vec<String> {
        vec![
            render_option(ChecksumsOpts::FILENAME, ChecksumsOpts::FILENAME_DEFAULT),
            render_option(ChecksumsOpts::TARGET_DIR, ChecksumsOpts::TARGET_DIR_DEFAULT),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigDocument;
    use crate::context::Verbosity;
    use std::sync::Arc;

    const EMPTY_SHA512: &str = "cf83e1357eefb8bdf1542850d66d8007d620e4050b5715dc83f4a921d36ce9ce47d0d13c5d85f2b0ff8318d2877eec2f63b931bd47417a81a538327af927da3e";

    #[test]
    fn digest_of_empty_file() {
        let file = tempfile::NamedTempFile::new().unwrap();
        assert_eq!(sha512_hex(file.path()).unwrap(), EMPTY_SHA512);
    }

    #[test]
    fn digest_of_large_file_matches_one_shot_hash() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("asset.bin");
        let bytes: Vec<u8> = (0..300_000u32).map(|i| (i % 251) as u8).collect();
        fs::write(&path, &bytes).unwrap();
        let expected: String = Sha512::digest(&bytes)
            .iter()
            .map(|b| format!("{:02x}", b))
            .collect();
        assert_eq!(sha512_hex(&path).unwrap(), expected);
    }

    #[test]
    fn digest_of_missing_file_is_an_io_error() {
        let err = sha512_hex(Path::new("/nonexistent/asset.bin")).unwrap_err();
        assert_eq!(err.code.as_str(), "internal.io_error");
    }

    #[test]
    fn target_dir_defaults_to_output_dir() {
        let config =
            Arc::new(ConfigDocument::parse("[general]\noutput_dir = /srv/www\n").unwrap());
        let mut task = ChecksumsTask::new(TaskInit::new(config, KEY));
        task.load_config().unwrap();
        assert_eq!(task.manifest_path(), PathBuf::from("/srv/www/checksums.txt"));
    }

    #[test]
    fn writes_sorted_manifest_and_publishes_it() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("css")).unwrap();
        fs::write(dir.path().join("index.html"), "").unwrap();
        fs::write(dir.path().join("css/site.css"), "").unwrap();

        let text = format!(
            "[checksums]\ntarget_dir = {}\nfilename = SUMS\n",
            dir.path().display()
        );
        let config = Arc::new(ConfigDocument::parse(&text).unwrap());
        let mut task = ChecksumsTask::new(TaskInit::new(config, KEY));
        let mut state = SharedState::new();
        task.execute(&mut Reporter::capture(Verbosity::Normal), &mut state)
            .unwrap();
        assert_eq!(task.core().status(), Some(0));

        let manifest = fs::read_to_string(dir.path().join("SUMS")).unwrap();
        assert_eq!(
            manifest,
            format!("{0}  css/site.css\n{0}  index.html\n", EMPTY_SHA512)
        );
        assert_eq!(state.get(KEY).unwrap()["index.html"], EMPTY_SHA512);

        // A second run must not checksum its own manifest.
        task.execute(&mut Reporter::capture(Verbosity::Normal), &mut state)
            .unwrap();
        let again = fs::read_to_string(dir.path().join("SUMS")).unwrap();
        assert_eq!(again, manifest);
    }

    #[test]
    fn missing_target_dir_is_an_error() {
        let config =
            Arc::new(ConfigDocument::parse("[checksums]\ntarget_dir = /nonexistent/out\n").unwrap());
        let mut task = ChecksumsTask::new(TaskInit::new(config, KEY));
        task.execute(&mut Reporter::capture(Verbosity::Normal), &mut SharedState::new())
            .unwrap();
        assert_eq!(task.core().status(), Some(1));
    }
}
