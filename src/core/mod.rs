// Public modules
pub mod config;
pub mod context;
pub mod error;
pub mod introspect;
pub mod pipeline;
pub mod registry;
pub mod state;
pub mod task;
pub mod tasks;

// Internal modules - not part of public API
pub(crate) mod paths;

// Re-export common types for convenience
pub use error::{Error, ErrorCode, Result};
