//! Error types for hierarchy construction and parsing.

use thiserror::Error;

/// Errors that can occur while reading a hierarchy definition.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum HierarchyError {
    /// A declared unique-scope name does not match any ancestor of the
    /// type being defined.
    #[error("line {line}: unique scope {name:?} is not an ancestor")]
    UnknownScope { line: u64, name: String },

    /// The flags field of a definition line is not a number.
    #[error("line {line}: invalid flags field {value:?}")]
    BadFlags { line: u64, value: String },
}

/// Convenience alias for hierarchy results.
pub type HierarchyResult<T> = Result<T, HierarchyError>;
