//! Task type registry.
//!
//! Plugins are compiled in: each module under `core::tasks` exposes a loader
//! returning its descriptors, and [`TaskRegistry::discover`] walks that list
//! once at startup. Discovery never instantiates a task.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::config::ConfigDocument;
use crate::context::Reporter;
use crate::error::{Error, Result};
use crate::task::{Task, TaskInit};

pub type TaskFactory = fn(TaskInit) -> Box<dyn Task>;

#[derive(Clone)]
pub struct TaskDescriptor {
    pub key: &'static str,
    pub summary: &'static str,
    pub factory: TaskFactory,
}

impl TaskDescriptor {
    pub fn new(key: &'static str, summary: &'static str, factory: TaskFactory) -> Self {
        Self {
            key,
            summary,
            factory,
        }
    }
}

impl std::fmt::Debug for TaskDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskDescriptor")
            .field("key", &self.key)
            .field("summary", &self.summary)
            .finish()
    }
}

/// One compiled-in plugin module.
#[derive(Clone, Copy)]
pub struct PluginModule {
    pub name: &'static str,
    pub load: fn() -> Result<Vec<TaskDescriptor>>,
}

#[derive(Debug, Default)]
pub struct TaskRegistry {
    tasks: BTreeMap<String, TaskDescriptor>,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, descriptor: TaskDescriptor) -> Result<()> {
        if self.tasks.contains_key(descriptor.key) {
            return Err(Error::duplicate_task(descriptor.key));
        }
        self.tasks.insert(descriptor.key.to_string(), descriptor);
        Ok(())
    }

    /// Load every module in `modules` and register what it declares.
    ///
    /// A loader failure aborts discovery. `namespace` only labels debug output.
    pub fn discover(
        modules: &[PluginModule],
        namespace: &str,
        reporter: &mut Reporter,
    ) -> Result<Self> {
        let mut registry = Self::new();
        for module in modules {
            reporter.debug(format!("Loading plugin {}::{}", namespace, module.name));
            let descriptors = (module.load)()
                .map_err(|e| Error::plugin_failed(module.name, e.message.clone()))?;
            for descriptor in descriptors {
                reporter.debug(format!("  registered task '{}'", descriptor.key));
                registry.register(descriptor)?;
            }
        }
        Ok(registry)
    }

    /// Registry holding every built-in task.
    pub fn builtin(reporter: &mut Reporter) -> Result<Self> {
        Self::discover(crate::tasks::MODULES, "tasks", reporter)
    }

    pub fn get(&self, key: &str) -> Option<&TaskDescriptor> {
        self.tasks.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.tasks.contains_key(key)
    }

    /// Registered keys, sorted.
    pub fn keys(&self) -> Vec<&str> {
        self.tasks.keys().map(String::as_str).collect()
    }

    pub fn descriptors(&self) -> impl Iterator<Item = &TaskDescriptor> {
        self.tasks.values()
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Check that `tag` maps to a registered type, returning that type.
    pub fn resolve(&self, config: &ConfigDocument, tag: &str) -> Result<String> {
        let task_type = config.task_type(tag)?;
        if !self.contains(&task_type) {
            return Err(Error::unknown_task(
                tag,
                &task_type,
                self.keys().into_iter().map(str::to_string).collect(),
            ));
        }
        Ok(task_type)
    }

    /// Build a fresh task instance for `tag`.
    pub fn instantiate(&self, config: &Arc<ConfigDocument>, tag: &str) -> Result<Box<dyn Task>> {
        let task_type = self.resolve(config, tag)?;
        let descriptor = self
            .get(&task_type)
            .ok_or_else(|| Error::internal_unexpected(format!("task '{}' vanished", task_type)))?;
        Ok((descriptor.factory)(TaskInit::new(Arc::clone(config), tag)))
    }
}
