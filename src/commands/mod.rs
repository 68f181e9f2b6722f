use std::path::PathBuf;
use std::sync::Arc;

use convoy::config::{ConfigDocument, DEFAULT_CONFIG_FILE};
use convoy::context::{Reporter, Verbosity};
use convoy::{Error, Result};

pub type CmdResult<T> = convoy::Result<(T, i32)>;

pub(crate) struct GlobalArgs {
    pub verbosity: Verbosity,
    /// Config path given with `-c`; `None` falls back to `./convoy.cfg`.
    pub config: Option<PathBuf>,
    pub json: bool,
}

impl GlobalArgs {
    pub fn reporter(&self) -> Reporter {
        if self.json {
            Reporter::capture(self.verbosity)
        } else {
            Reporter::stdout(self.verbosity)
        }
    }
}

/// Load the document named by `-c`, or `./convoy.cfg` when none was given.
///
/// An explicit path that does not exist is an error. The implicit default may
/// be absent, in which case the built-in defaults are used.
pub(crate) fn load_config(global: &GlobalArgs, reporter: &mut Reporter) -> Result<Arc<ConfigDocument>> {
    let path = match &global.config {
        Some(path) => {
            if !path.is_file() {
                return Err(Error::config_not_found(path.display().to_string()));
            }
            path.clone()
        }
        None => PathBuf::from(DEFAULT_CONFIG_FILE),
    };
    ConfigDocument::load(Some(&path), reporter).map(Arc::new)
}

pub mod config;
pub mod pipeline;

#[cfg(test)]
mod tests {
    use super::*;
    use convoy::ErrorCode;

    #[test]
    fn explicit_missing_config_is_not_found() {
        let global = GlobalArgs {
            verbosity: Verbosity::Normal,
            config: Some(PathBuf::from("/nonexistent/convoy.cfg")),
            json: false,
        };
        let err = load_config(&global, &mut Reporter::capture(Verbosity::Normal)).unwrap_err();
        assert_eq!(err.code, ErrorCode::ConfigNotFound);
    }

    #[test]
    fn explicit_config_is_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("site.cfg");
        std::fs::write(&path, "[general]\nenabled_tasks = clean\n").unwrap();
        let global = GlobalArgs {
            verbosity: Verbosity::Normal,
            config: Some(path),
            json: false,
        };
        let config = load_config(&global, &mut Reporter::capture(Verbosity::Normal)).unwrap();
        assert_eq!(config.enabled_tasks().unwrap(), vec!["clean"]);
    }
}
