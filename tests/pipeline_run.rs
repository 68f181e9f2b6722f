use std::fs;
use std::path::Path;
use std::sync::Arc;

use convoy::config::ConfigDocument;
use convoy::context::{Reporter, Verbosity};
use convoy::pipeline::{self, PipelineRunStatus, PipelineStepStatus, RunOptions};
use convoy::registry::TaskRegistry;
use convoy::state::SharedState;
use convoy::ErrorCode;

fn registry() -> TaskRegistry {
    TaskRegistry::builtin(&mut Reporter::capture(Verbosity::Normal)).unwrap()
}

fn config(text: &str) -> Arc<ConfigDocument> {
    Arc::new(ConfigDocument::parse(text).unwrap())
}

fn site_sources(root: &Path) {
    fs::create_dir_all(root.join("css")).unwrap();
    fs::write(root.join("index.html"), "<h1>home</h1>").unwrap();
    fs::write(root.join("about.html"), "<h1>about</h1>").unwrap();
    fs::write(root.join("css/site.css"), "body {}").unwrap();
}

#[test]
fn builds_output_tree_and_checksums_it() {
    let work = tempfile::tempdir().unwrap();
    let src = tempfile::tempdir().unwrap();
    site_sources(src.path());
    let text = format!(
        "[general]\ntmp_dir = {work}/build\nenabled_tasks = make_dirs copy_files checksums\n\n\
         [copy_files]\nsite_src = {src}/*.html {src}/css\nsite_dst = ${{general:output_dir}}\n",
        work = work.path().display(),
        src = src.path().display()
    );
    let config = config(&text);
    let mut reporter = Reporter::capture(Verbosity::Verbose);
    let mut state = SharedState::new();

    let result = pipeline::run(
        &config,
        &registry(),
        &RunOptions::default(),
        &mut reporter,
        &mut state,
    )
    .unwrap();

    assert_eq!(result.status, PipelineRunStatus::Success);
    assert_eq!(result.exit_code, 0);
    assert_eq!(result.summary.succeeded, 3);

    let output = work.path().join("build/output");
    assert!(work.path().join("build/staging").is_dir());
    assert!(output.join("css/site.css").is_file());

    let manifest = fs::read_to_string(output.join("checksums.txt")).unwrap();
    let files: Vec<&str> = manifest
        .lines()
        .map(|line| line.split("  ").nth(1).unwrap())
        .collect();
    assert_eq!(files, vec!["about.html", "css/site.css", "index.html"]);

    let sums = state.get("checksums").unwrap().as_object().unwrap();
    assert_eq!(sums.len(), 3);
    assert!(state.contains("copy_files"));
    assert!(reporter
        .captured_text()
        .ends_with("All Tasks Completed. Exiting."));
}

#[test]
fn failing_task_stops_the_run_with_its_error_count() {
    let work = tempfile::tempdir().unwrap();
    let blocker = work.path().join("blocker");
    fs::write(&blocker, "not a directory").unwrap();
    let text = format!(
        "[general]\ntmp_dir = {work}/build\nenabled_tasks = dirs checksums\n\n\
         [dirs]\ntask = make_dirs\ngeneral_dirs = false\nother_dirs = {b}/a {b}/b\n",
        work = work.path().display(),
        b = blocker.display()
    );
    let mut reporter = Reporter::capture(Verbosity::Normal);
    let mut state = SharedState::new();

    let result = pipeline::run(
        &config(&text),
        &registry(),
        &RunOptions::default(),
        &mut reporter,
        &mut state,
    )
    .unwrap();

    assert_eq!(result.status, PipelineRunStatus::Failed);
    assert_eq!(result.exit_code, 2);
    assert_eq!(result.steps.len(), 1);
    assert_eq!(result.steps[0].status, PipelineStepStatus::Failed);
    assert_eq!(result.summary.not_run, 1);
    assert!(!state.contains("checksums"));
    assert!(reporter
        .captured_text()
        .starts_with("Task \"dirs\" did not succeed: errno 2\n"));
}

#[test]
fn warnings_are_reported_and_the_run_continues() {
    let work = tempfile::tempdir().unwrap();
    let text = format!(
        "[general]\ntmp_dir = {work}/build\nenabled_tasks = make_dirs copy_files checksums\n\n\
         [copy_files]\nghost_src = {work}/missing/*.html\nghost_dst = ${{general:output_dir}}\n",
        work = work.path().display()
    );
    let mut reporter = Reporter::capture(Verbosity::Normal);
    let mut state = SharedState::new();

    let result = pipeline::run(
        &config(&text),
        &registry(),
        &RunOptions::default(),
        &mut reporter,
        &mut state,
    )
    .unwrap();

    assert_eq!(result.status, PipelineRunStatus::PartialSuccess);
    assert_eq!(result.exit_code, 0);
    assert_eq!(result.steps[1].status, PipelineStepStatus::Warnings);
    assert!(reporter
        .captured_text()
        .contains("Task \"copy_files\" succeeded with warnings:"));
    assert!(work.path().join("build/output/checksums.txt").is_file());
}

#[test]
fn skipped_tags_are_not_instantiated() {
    let work = tempfile::tempdir().unwrap();
    let text = format!(
        "[general]\ntmp_dir = {work}/build\nenabled_tasks = make_dirs checksums\n",
        work = work.path().display()
    );
    let mut reporter = Reporter::capture(Verbosity::Normal);
    let mut state = SharedState::new();

    let result = pipeline::run(
        &config(&text),
        &registry(),
        &RunOptions::skipping(["make_dirs"]),
        &mut reporter,
        &mut state,
    )
    .unwrap();

    assert_eq!(result.steps[0].status, PipelineStepStatus::Skipped);
    assert!(!work.path().join("build").exists());
    assert!(reporter
        .captured_text()
        .starts_with("Skipping task \"make_dirs\"."));
    // checksums ran against a directory that was never made.
    assert_eq!(result.exit_code, 1);
}

#[test]
fn list_mode_touches_nothing() {
    let work = tempfile::tempdir().unwrap();
    let text = format!(
        "[general]\ntmp_dir = {work}/build\nenabled_tasks = make_dirs checksums\n",
        work = work.path().display()
    );
    let mut reporter = Reporter::capture(Verbosity::Normal);
    let mut state = SharedState::new();
    let options = RunOptions {
        list_only: true,
        ..Default::default()
    };

    let result = pipeline::run(&config(&text), &registry(), &options, &mut reporter, &mut state)
        .unwrap();

    assert_eq!(result.status, PipelineRunStatus::Listed);
    assert_eq!(reporter.captured_text(), "1: make_dirs\n2: checksums");
    assert!(!work.path().join("build").exists());
    assert!(state.is_empty());
}

#[test]
fn unknown_tag_fails_before_anything_runs() {
    let work = tempfile::tempdir().unwrap();
    let text = format!(
        "[general]\ntmp_dir = {work}/build\nenabled_tasks = make_dirs ghost\n",
        work = work.path().display()
    );
    let err = pipeline::run(
        &config(&text),
        &registry(),
        &RunOptions::default(),
        &mut Reporter::capture(Verbosity::Normal),
        &mut SharedState::new(),
    )
    .unwrap_err();

    assert_eq!(err.code, ErrorCode::TaskUnknown);
    assert!(!work.path().join("build").exists());
}
