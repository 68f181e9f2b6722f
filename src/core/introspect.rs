//! Default-configuration document and config debug dump.

use std::sync::Arc;

use crate::config::{render_general_defaults, ConfigDocument};
use crate::error::Result;
use crate::registry::TaskRegistry;
use crate::task::TaskInit;

/// A complete example config: the general section followed by one section per
/// registered task, each with its declared defaults. Sections are separated by
/// a blank line and the text parses back into an equivalent document.
///
/// Tasks are bound to the built-in defaults only, so nothing in a user's
/// config file can change or break the output.
pub fn default_document(registry: &TaskRegistry) -> Result<String> {
    let defaults = Arc::new(ConfigDocument::defaults());
    let mut doc = render_general_defaults();
    for descriptor in registry.descriptors() {
        let mut task = (descriptor.factory)(TaskInit::new(Arc::clone(&defaults), descriptor.key));
        doc.push('\n');
        doc.push_str(&task.default_config()?);
    }
    Ok(doc)
}

/// Sections, their options, the enabled tags and every enabled task's
/// resolved values.
///
/// Problems with a single tag (unknown task type, bad option) are written
/// into the dump in place of that task's values.
pub fn debug_dump(config: &Arc<ConfigDocument>, registry: &TaskRegistry) -> Result<String> {
    let mut out = format!("Config Sections: {}\n", config.sections().join(", "));
    for section in config.sections() {
        out.push_str(&format!(
            "Options in section {}: {}\n",
            section,
            config.options(section).join(", ")
        ));
    }
    let enabled = match config.enabled_tasks() {
        Ok(tags) => tags,
        Err(e) => {
            out.push_str(&format!("Enabled Tasks: <{}>\n", e.message));
            return Ok(out);
        }
    };
    out.push_str(&format!("Enabled Tasks: {}\n", enabled.join(", ")));
    for tag in &enabled {
        let msg = registry
            .instantiate(config, tag)
            .and_then(|mut task| task.debug_msg());
        match msg {
            Ok(msg) => out.push_str(&msg),
            Err(e) => out.push_str(&format!(
                "Task \"{}\" could not be loaded: {}\n",
                tag, e.message
            )),
        }
    }
    Ok(out)
}
