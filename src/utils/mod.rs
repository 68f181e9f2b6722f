//! Generic utility primitives with zero domain knowledge.
//!
//! - `command` - External process execution with captured output
//! - `io` - File I/O with consistent error handling
//! - `rst` - reStructuredText fragments
//! - `shell` - Shell escaping and quoting

pub mod command;
pub mod io;
pub mod rst;
pub mod shell;
