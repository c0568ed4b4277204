/// Core Module for the gradebook
///
/// Shared infrastructure for the command dispatcher: the data access layer
/// over the SQLite store and the crate-wide error type.

pub mod db;
pub mod error;

// Re-export commonly used types for convenience
pub use error::{Entity, GradebookError, Result, UsageError};
