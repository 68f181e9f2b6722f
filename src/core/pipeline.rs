//! Sequential task pipeline.
//!
//! Tags from `general.enabled_tasks` run one after another, each with a fresh
//! task instance. A task reporting errors stops the run and its error count
//! becomes the exit code; warnings are reported and the run continues.

use std::collections::BTreeSet;
use std::sync::Arc;

use serde::Serialize;

use crate::config::ConfigDocument;
use crate::context::Reporter;
use crate::error::Result;
use crate::registry::TaskRegistry;
use crate::state::SharedState;

#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Tags to pass over without instantiating.
    pub skip: BTreeSet<String>,
    /// Only print the enabled tags.
    pub list_only: bool,
}

impl RunOptions {
    pub fn skipping<I, S>(tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            skip: tags.into_iter().map(Into::into).collect(),
            list_only: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStepStatus {
    Success,
    Warnings,
    Failed,
    Skipped,
}

#[derive(Debug, Clone, Serialize)]
pub struct PipelineStepResult {
    pub index: usize,
    pub tag: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task_type: Option<String>,
    pub status: PipelineStepStatus,
    pub error_count: usize,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PipelineRunStatus {
    Success,
    PartialSuccess,
    Failed,
    Listed,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct PipelineRunSummary {
    pub total_steps: usize,
    pub succeeded: usize,
    pub with_warnings: usize,
    pub failed: usize,
    pub skipped: usize,
    pub not_run: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct PipelineRunResult {
    pub steps: Vec<PipelineStepResult>,
    pub status: PipelineRunStatus,
    pub exit_code: i32,
    pub summary: PipelineRunSummary,
}

/// Print `index: tag` (1-based) for each enabled tag.
pub fn list(config: &ConfigDocument, reporter: &mut Reporter) -> Result<Vec<String>> {
    let tags = config.enabled_tasks()?;
    for (idx, tag) in tags.iter().enumerate() {
        reporter.print(format!("{}: {}", idx + 1, tag));
    }
    Ok(tags)
}

/// Run the enabled tasks.
///
/// Every non-skipped tag is checked against the registry before anything
/// runs, so an unknown tag fails the run without side effects. Config errors
/// raised while a task loads are propagated.
pub fn run(
    config: &Arc<ConfigDocument>,
    registry: &TaskRegistry,
    options: &RunOptions,
    reporter: &mut Reporter,
    state: &mut SharedState,
) -> Result<PipelineRunResult> {
    let tags = config.enabled_tasks()?;
    let mut summary = PipelineRunSummary {
        total_steps: tags.len(),
        ..Default::default()
    };

    if options.list_only {
        list(config, reporter)?;
        summary.not_run = tags.len();
        return Ok(PipelineRunResult {
            steps: Vec::new(),
            status: PipelineRunStatus::Listed,
            exit_code: 0,
            summary,
        });
    }

    for tag in tags.iter().filter(|tag| !options.skip.contains(*tag)) {
        registry.resolve(config, tag)?;
    }

    let mut steps = Vec::with_capacity(tags.len());
    for (idx, tag) in tags.iter().enumerate() {
        let index = idx + 1;
        if options.skip.contains(tag) {
            reporter.print(format!("Skipping task \"{}\".", tag));
            summary.skipped += 1;
            steps.push(PipelineStepResult {
                index,
                tag: tag.clone(),
                task_type: None,
                status: PipelineStepStatus::Skipped,
                error_count: 0,
                warnings: Vec::new(),
                errors: Vec::new(),
            });
            continue;
        }

        let mut task = registry.instantiate(config, tag)?;
        task.execute(reporter, state)?;

        let core = task.core();
        let error_count = core.status().unwrap_or(0);
        let mut step = PipelineStepResult {
            index,
            tag: tag.clone(),
            task_type: Some(task.key().to_string()),
            status: PipelineStepStatus::Success,
            error_count,
            warnings: core.warnings().to_vec(),
            errors: core.errors().to_vec(),
        };

        if error_count != 0 {
            reporter.print(format!(
                "Task \"{}\" did not succeed: errno {}\n  Warnings:\n    {}\n  Errors:\n    {}",
                tag,
                error_count,
                step.warnings.join("\n    "),
                step.errors.join("\n    ")
            ));
            step.status = PipelineStepStatus::Failed;
            steps.push(step);
            summary.failed += 1;
            summary.not_run = tags.len() - index;
            return Ok(PipelineRunResult {
                steps,
                status: PipelineRunStatus::Failed,
                exit_code: i32::try_from(error_count).unwrap_or(i32::MAX),
                summary,
            });
        }

        if !step.warnings.is_empty() {
            reporter.print(format!(
                "Task \"{}\" succeeded with warnings:\n    {}",
                tag,
                step.warnings.join("\n    ")
            ));
            step.status = PipelineStepStatus::Warnings;
            summary.with_warnings += 1;
        } else {
            reporter.verbose(format!("Task {} succeeded with no errors.", tag));
            summary.succeeded += 1;
        }
        steps.push(step);
    }

    reporter.verbose("All Tasks Completed. Exiting.");
    let status = if summary.with_warnings > 0 {
        PipelineRunStatus::PartialSuccess
    } else {
        PipelineRunStatus::Success
    };
    Ok(PipelineRunResult {
        steps,
        status,
        exit_code: 0,
        summary,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SectionView;
    use crate::context::Verbosity;
    use crate::error::ErrorCode;
    use crate::registry::TaskDescriptor;
    use crate::task::{Task, TaskCore, TaskInit};
    use serde_json::json;

    /// Appends its tag to `state["ran"]`; `errors`/`warnings` options make it
    /// record that many entries.
    struct Recorder {
        core: TaskCore,
        errors: usize,
        warnings: usize,
    }

    impl Task for Recorder {
        fn key(&self) -> &'static str {
            "recorder"
        }
        fn name(&self) -> &'static str {
            "Recorder"
        }
        fn core(&self) -> &TaskCore {
            &self.core
        }
        fn core_mut(&mut self) -> &mut TaskCore {
            &mut self.core
        }
        fn load_task_config(&mut self, section: SectionView<'_>) -> Result<()> {
            let count = |opt: &str| -> Result<usize> {
                Ok(section
                    .get(opt)?
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(0))
            };
            self.errors = count("errors")?;
            self.warnings = count("warnings")?;
            Ok(())
        }
        fn run(&mut self, _: &mut Reporter, state: &mut SharedState) -> Result<()> {
            let mut ran = state.get("ran").cloned().unwrap_or_else(|| json!([]));
            if let Some(list) = ran.as_array_mut() {
                list.push(json!(self.core.tag()));
            }
            state.insert("ran", ran);
            for i in 0..self.errors {
                self.core.error(format!("e{}", i));
            }
            for i in 0..self.warnings {
                self.core.warn(format!("w{}", i));
            }
            Ok(())
        }
    }

    fn recorder(init: TaskInit) -> Box<dyn Task> {
        Box::new(Recorder {
            core: TaskCore::new(init),
            errors: 0,
            warnings: 0,
        })
    }

    fn registry() -> TaskRegistry {
        let mut registry = TaskRegistry::new();
        registry
            .register(TaskDescriptor::new("recorder", "records its tag", recorder))
            .unwrap();
        registry
    }

    fn config(enabled: &str, extra: &str) -> Arc<ConfigDocument> {
        let mut text = format!("[general]\nenabled_tasks = {}\n", enabled);
        for tag in enabled.split_whitespace() {
            text.push_str(&format!("[{}]\ntask = recorder\n", tag));
        }
        text.push_str(extra);
        Arc::new(ConfigDocument::parse(&text).unwrap())
    }

    fn ran(state: &SharedState) -> Vec<String> {
        state
            .get("ran")
            .and_then(|v| v.as_array())
            .map(|a| a.iter().filter_map(|t| t.as_str().map(str::to_string)).collect())
            .unwrap_or_default()
    }

    #[test]
    fn skipped_tags_are_not_executed() {
        let config = config("a b c", "");
        let mut reporter = Reporter::capture(Verbosity::Normal);
        let mut state = SharedState::new();
        let result = run(
            &config,
            &registry(),
            &RunOptions::skipping(["b"]),
            &mut reporter,
            &mut state,
        )
        .unwrap();
        assert_eq!(ran(&state), vec!["a", "c"]);
        assert_eq!(result.exit_code, 0);
        assert_eq!(result.summary.skipped, 1);
        assert!(reporter.captured_text().contains("Skipping task \"b\"."));
    }

    #[test]
    fn errors_abort_with_error_count() {
        let config = config("a b c", "[b]\nerrors = 2\nwarnings = 1\n");
        let mut reporter = Reporter::capture(Verbosity::Normal);
        let mut state = SharedState::new();
        let result = run(
            &config,
            &registry(),
            &RunOptions::default(),
            &mut reporter,
            &mut state,
        )
        .unwrap();
        assert_eq!(result.exit_code, 2);
        assert_eq!(result.status, PipelineRunStatus::Failed);
        assert_eq!(result.summary.not_run, 1);
        assert_eq!(ran(&state), vec!["a", "b"]);
        assert_eq!(
            reporter.captured_text(),
            "Task \"b\" did not succeed: errno 2\n  Warnings:\n    w0\n  Errors:\n    e0\n    e1"
        );
    }

    #[test]
    fn warnings_do_not_stop_the_run() {
        let config = config("a b", "[a]\nwarnings = 2\n");
        let mut reporter = Reporter::capture(Verbosity::Verbose);
        let mut state = SharedState::new();
        let result = run(
            &config,
            &registry(),
            &RunOptions::default(),
            &mut reporter,
            &mut state,
        )
        .unwrap();
        assert_eq!(result.exit_code, 0);
        assert_eq!(result.status, PipelineRunStatus::PartialSuccess);
        assert_eq!(ran(&state), vec!["a", "b"]);
        let out = reporter.captured();
        assert_eq!(out[0], "Task \"a\" succeeded with warnings:\n    w0\n    w1");
        assert_eq!(out[1], "Task b succeeded with no errors.");
        assert_eq!(out[2], "All Tasks Completed. Exiting.");
    }

    #[test]
    fn list_mode_runs_nothing() {
        let config = config("a b", "");
        let mut reporter = Reporter::capture(Verbosity::Normal);
        let mut state = SharedState::new();
        let options = RunOptions {
            list_only: true,
            ..Default::default()
        };
        let result = run(&config, &registry(), &options, &mut reporter, &mut state).unwrap();
        assert_eq!(result.status, PipelineRunStatus::Listed);
        assert!(state.is_empty());
        assert_eq!(reporter.captured(), &["1: a".to_string(), "2: b".to_string()]);
    }

    #[test]
    fn unknown_tag_fails_before_anything_runs() {
        let text = "[general]\nenabled_tasks = a ghost\n[a]\ntask = recorder\n";
        let config = Arc::new(ConfigDocument::parse(text).unwrap());
        let mut reporter = Reporter::capture(Verbosity::Normal);
        let mut state = SharedState::new();
        let err = run(
            &config,
            &registry(),
            &RunOptions::default(),
            &mut reporter,
            &mut state,
        )
        .unwrap_err();
        assert_eq!(err.code, ErrorCode::TaskUnknown);
        assert!(state.is_empty());
    }

    #[test]
    fn skipped_unknown_tag_is_ignored() {
        let text = "[general]\nenabled_tasks = a ghost\n[a]\ntask = recorder\n";
        let config = Arc::new(ConfigDocument::parse(text).unwrap());
        let mut reporter = Reporter::capture(Verbosity::Normal);
        let mut state = SharedState::new();
        let result = run(
            &config,
            &registry(),
            &RunOptions::skipping(["ghost"]),
            &mut reporter,
            &mut state,
        )
        .unwrap();
        assert_eq!(result.exit_code, 0);
        assert_eq!(ran(&state), vec!["a"]);
    }

    #[test]
    fn duplicate_tags_run_twice() {
        let config = config("a a", "");
        let mut reporter = Reporter::capture(Verbosity::Normal);
        let mut state = SharedState::new();
        run(
            &config,
            &registry(),
            &RunOptions::default(),
            &mut reporter,
            &mut state,
        )
        .unwrap();
        assert_eq!(ran(&state), vec!["a", "a"]);
    }
}
