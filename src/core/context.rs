//! Run context shared by every component: verbosity and the message sink.
//!
//! Nothing in the crate prints directly; messages go through a [`Reporter`]
//! so the CLI can choose the verbosity and tests can capture the output.

use std::io::{self, Write};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Verbosity {
    Normal,
    Verbose,
    Debug,
}

impl Verbosity {
    pub fn from_flags(verbose: bool, debug: bool) -> Self {
        if debug {
            Verbosity::Debug
        } else if verbose {
            Verbosity::Verbose
        } else {
            Verbosity::Normal
        }
    }
}

enum Sink {
    Stdout,
    Capture(Vec<String>),
}

pub struct Reporter {
    verbosity: Verbosity,
    sink: Sink,
}

const DEBUG_PREFIX: &str = "dbg: ";

impl Reporter {
    /// Reporter writing to stdout.
    pub fn stdout(verbosity: Verbosity) -> Self {
        Self {
            verbosity,
            sink: Sink::Stdout,
        }
    }

    /// Reporter that keeps every message in memory. Used by tests.
    pub fn capture(verbosity: Verbosity) -> Self {
        Self {
            verbosity,
            sink: Sink::Capture(Vec::new()),
        }
    }

    pub fn is_verbose(&self) -> bool {
        self.verbosity >= Verbosity::Verbose
    }

    pub fn is_debug(&self) -> bool {
        self.verbosity >= Verbosity::Debug
    }

    pub fn print(&mut self, msg: impl AsRef<str>) {
        let msg = msg.as_ref();
        match &mut self.sink {
            Sink::Stdout => {
                let stdout = io::stdout();
                let mut handle = stdout.lock();
                // Broken pipes (e.g. `convoy --list | head`) are not worth failing over.
                let _ = writeln!(handle, "{}", msg);
            }
            Sink::Capture(lines) => lines.push(msg.to_string()),
        }
    }

    pub fn verbose(&mut self, msg: impl AsRef<str>) {
        if self.is_verbose() {
            self.print(msg);
        }
    }

    /// Debug output, every line prefixed with `dbg: `.
    pub fn debug(&mut self, msg: impl AsRef<str>) {
        if !self.is_debug() {
            return;
        }
        let prefixed = msg
            .as_ref()
            .lines()
            .map(|line| format!("{}{}", DEBUG_PREFIX, line))
            .collect::<Vec<_>>()
            .join("\n");
        self.print(prefixed);
    }

    /// Captured messages; empty for a stdout reporter.
    pub fn captured(&self) -> &[String] {
        match &self.sink {
            Sink::Stdout => &[],
            Sink::Capture(lines) => lines,
        }
    }

    pub fn captured_text(&self) -> String {
        self.captured().join("\n")
    }
}
