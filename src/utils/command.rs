//! External process execution.
//!
//! Tasks shell out to tools like the site generator, rsync and git. A tool
//! that runs and exits nonzero is an outcome the task reports, not an `Err`;
//! only a process that cannot be started at all is an error.

use std::path::Path;
use std::process::{Command, Output};

use serde::Serialize;

use crate::error::{Error, Result};
use crate::utils::shell;

/// Captured output from command execution.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CapturedOutput {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub stdout: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub stderr: String,
}

impl CapturedOutput {
    pub fn new(stdout: String, stderr: String) -> Self {
        Self { stdout, stderr }
    }
}

/// Result of a process that ran to completion.
#[derive(Debug, Clone, Serialize)]
pub struct CommandOutcome {
    pub command_line: String,
    /// `None` when the process was killed by a signal.
    pub exit_code: Option<i32>,
    pub output: CapturedOutput,
}

impl CommandOutcome {
    fn from_output(command_line: String, output: &Output) -> Self {
        Self {
            command_line,
            exit_code: output.status.code(),
            output: CapturedOutput::new(
                String::from_utf8_lossy(&output.stdout).to_string(),
                String::from_utf8_lossy(&output.stderr).to_string(),
            ),
        }
    }

    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }

    /// One-line description of a failed run, suitable for a task error.
    pub fn failure_message(&self) -> String {
        let code = match self.exit_code {
            Some(code) => code.to_string(),
            None => "signal".to_string(),
        };
        let detail = error_text(&self.output);
        if detail.is_empty() {
            format!("`{}` exited with {}", self.command_line, code)
        } else {
            format!("`{}` exited with {}: {}", self.command_line, code, detail)
        }
    }
}

/// Render a program and its arguments as a shell-readable line.
pub fn command_line(program: &str, args: &[String]) -> String {
    let mut parts = vec![program.to_string()];
    parts.extend(args.iter().cloned());
    shell::quote_args(&parts)
}

/// Run a command to completion, capturing its output.
pub fn capture(program: &str, args: &[String], dir: Option<&Path>) -> Result<CommandOutcome> {
    let line = command_line(program, args);
    let mut command = Command::new(program);
    command.args(args);
    if let Some(dir) = dir {
        command.current_dir(dir);
    }
    log_status!("run", "{}", line);
    let output = command.output().map_err(|e| {
        Error::internal_io(format!("Failed to run {}: {}", line, e), Some(line.clone()))
    })?;
    let outcome = CommandOutcome::from_output(line, &output);
    if !outcome.success() {
        log_status!("run", "{}", outcome.failure_message());
    }
    Ok(outcome)
}

/// Run a command in `dir` and return its stdout on success.
///
/// A nonzero exit is an error carrying stderr (or stdout when stderr is empty).
pub fn run_in(dir: &Path, program: &str, args: &[&str], context: &str) -> Result<String> {
    let args: Vec<String> = args.iter().map(|a| a.to_string()).collect();
    let outcome = capture(program, &args, Some(dir))?;
    if !outcome.success() {
        return Err(Error::internal_io(
            format!("{} failed: {}", context, error_text(&outcome.output)),
            Some(context.to_string()),
        ));
    }
    Ok(outcome.output.stdout)
}

/// Prefers stderr, falls back to stdout if stderr is empty.
pub fn error_text(output: &CapturedOutput) -> String {
    if !output.stderr.trim().is_empty() {
        output.stderr.trim().to_string()
    } else {
        output.stdout.trim().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capture_reports_success() {
        let outcome = capture("echo", &["hello".to_string()], None).unwrap();
        assert!(outcome.success());
        assert_eq!(outcome.output.stdout.trim(), "hello");
        assert_eq!(outcome.command_line, "echo hello");
    }

    #[test]
    fn nonzero_exit_is_an_outcome_not_an_error() {
        let outcome = capture("false", &[], None).unwrap();
        assert!(!outcome.success());
        assert_eq!(outcome.exit_code, Some(1));
        assert!(outcome.failure_message().starts_with("`false` exited with 1"));
    }

    #[test]
    fn missing_program_is_an_error() {
        let err = capture("nonexistent_command_xyz", &[], None).unwrap_err();
        assert_eq!(err.code.as_str(), "internal.io_error");
    }

    #[test]
    fn run_in_uses_directory() {
        let dir = tempfile::tempdir().unwrap();
        let out = run_in(dir.path(), "pwd", &[], "pwd").unwrap();
        let expected = dir.path().canonicalize().unwrap();
        assert_eq!(Path::new(out.trim()).canonicalize().unwrap(), expected);
    }

    #[test]
    fn command_line_quotes_arguments() {
        let args = vec!["-e".to_string(), "ssh -p 22".to_string()];
        assert_eq!(command_line("rsync", &args), "rsync -e 'ssh -p 22'");
    }

    #[test]
    fn error_text_prefers_stderr() {
        let output = CapturedOutput::new("out".to_string(), " err \n".to_string());
        assert_eq!(error_text(&output), "err");
        let output = CapturedOutput::new("out".to_string(), String::new());
        assert_eq!(error_text(&output), "out");
    }
}
