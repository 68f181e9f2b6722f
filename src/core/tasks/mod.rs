//! Built-in task plugins.
//!
//! Every module exposes `load()`, returning the descriptors it contributes.
//! [`MODULES`] is the list the registry walks at startup; adding a task means
//! adding its module here.

pub mod checksums;
pub mod clean;
pub mod copy_files;
pub mod galleries;
pub mod git_log_pages;
pub mod make_dirs;
pub mod pelican;
pub mod print_shared_state;
pub mod rst2dtree;
pub mod upload;

use chrono::format::{Item, StrftimeItems};
use chrono::Local;

use crate::config::{ConfigDocument, GeneralOpts, GENERAL};
use crate::error::{Error, Result};
use crate::registry::PluginModule;

pub const MODULES: &[PluginModule] = &[
    PluginModule {
        name: "checksums",
        load: checksums::load,
    },
    PluginModule {
        name: "clean",
        load: clean::load,
    },
    PluginModule {
        name: "copy_files",
        load: copy_files::load,
    },
    PluginModule {
        name: "galleries",
        load: galleries::load,
    },
    PluginModule {
        name: "git_log_pages",
        load: git_log_pages::load,
    },
    PluginModule {
        name: "make_dirs",
        load: make_dirs::load,
    },
    PluginModule {
        name: "pelican",
        load: pelican::load,
    },
    PluginModule {
        name: "print_shared_state",
        load: print_shared_state::load,
    },
    PluginModule {
        name: "rst2dtree",
        load: rst2dtree::load,
    },
    PluginModule {
        name: "upload",
        load: upload::load,
    },
];

/// Current local time rendered with `general.date_format`.
pub(crate) fn timestamp(config: &ConfigDocument) -> Result<String> {
    let format = config.date_format()?;
    if StrftimeItems::new(&format).any(|item| matches!(item, Item::Error)) {
        return Err(Error::config_invalid_value(
            GENERAL,
            GeneralOpts::DATE_FORMAT,
            Some(format),
            "not a valid strftime format",
        ));
    }
    Ok(Local::now().format(&format).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;

    #[test]
    fn timestamp_uses_configured_format() {
        let config = ConfigDocument::parse("[general]\ndate_format = %Y\n").unwrap();
        let stamp = timestamp(&config).unwrap();
        assert_eq!(stamp.len(), 4);
        assert!(stamp.chars().all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn invalid_date_format_is_a_config_error() {
        let config = ConfigDocument::parse("[general]\ndate_format = %Q%\n").unwrap();
        let err = timestamp(&config).unwrap_err();
        assert_eq!(err.code, ErrorCode::ConfigInvalidValue);
    }
}
