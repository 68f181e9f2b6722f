use serde::Serialize;

use convoy::context::Reporter;
use convoy::introspect;
use convoy::registry::TaskRegistry;

use super::{load_config, CmdResult, GlobalArgs};

#[derive(Debug, Serialize)]
pub struct ConfigOutput {
    command: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    path: Option<String>,
    text: String,
}

impl ConfigOutput {
    pub fn text(&self) -> &str {
        &self.text
    }
}

/// A complete configuration document with every default filled in. The
/// user's config file is not consulted.
pub fn default_config(reporter: &mut Reporter) -> CmdResult<ConfigOutput> {
    let registry = TaskRegistry::builtin(reporter)?;
    Ok((
        ConfigOutput {
            command: "config.default".to_string(),
            path: None,
            text: introspect::default_document(&registry)?,
        },
        0,
    ))
}

/// Sections, options and the effective settings of every enabled task.
pub fn debug_config(global: &GlobalArgs, reporter: &mut Reporter) -> CmdResult<ConfigOutput> {
    let config = load_config(global, reporter)?;
    let registry = TaskRegistry::builtin(reporter)?;
    Ok((
        ConfigOutput {
            command: "config.debug".to_string(),
            path: config.path().map(|p| p.display().to_string()),
            text: introspect::debug_dump(&config, &registry)?,
        },
        0,
    ))
}
