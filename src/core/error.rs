/// Gradebook Error Module
///
/// This module defines the error types shared by the data access layer and
/// the command dispatcher. Every variant carries a message that is printed
/// verbatim at the dispatch boundary.
use std::fmt;
use thiserror::Error;

/// A named entity that a lookup failed to resolve.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Entity {
    /// Student looked up by last name
    Student(String),
    /// Course looked up by exact name
    Course(String),
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Entity::Student(last_name) => write!(f, "student with last name: {}", last_name),
            Entity::Course(name) => write!(f, "course with name: {}", name),
        }
    }
}

/// Reasons a command line is rejected before it reaches the database.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UsageError {
    /// The command received the wrong number of arguments
    #[error("Command {command} expects {expected} argument(s), got {given}")]
    WrongArgCount {
        command: char,
        expected: &'static str,
        given: usize,
    },

    /// The grade argument of `u` is not an integer
    #[error("Grade must be an integer, got '{0}'")]
    InvalidGrade(String),
}

/// Error type for the gradebook application.
///
/// Covers:
/// - Database operations (connection, queries, constraint violations)
/// - Name lookups that found nothing or more than one row
/// - Rejected command lines
/// - Configuration loading
/// - Terminal I/O
#[derive(Error, Debug)]
pub enum GradebookError {
    /// Any failure reported by SQLite
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// A name-based lookup required by the operation found no row
    #[error("Can't find {0}")]
    NotFound(Entity),

    /// A last name matched several students
    #[error("Last name {last_name} matches {matches} students; the grade cannot be attributed")]
    AmbiguousStudent { last_name: String, matches: usize },

    /// The command line was malformed
    #[error("{0}")]
    Usage(#[from] UsageError),

    /// A command arrived after the dispatcher released the connection
    #[error("The gradebook connection is closed")]
    Closed,

    /// Configuration loading and validation errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Terminal and file system I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, GradebookError>;
