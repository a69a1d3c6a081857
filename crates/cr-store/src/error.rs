//! Error types for the record store.

use thiserror::Error;

/// Errors that abort processing of a report stream.
///
/// Everything else in the store's failure taxonomy (malformed attributes,
/// unknown types, merge conflicts) is logged and resolved deterministically
/// without aborting.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    /// A block's parent type exists nowhere in the live ancestor chain.
    /// Continuing would attach later attribute lines to the wrong context.
    #[error("line {line}: super-block {parent} of {block} not found")]
    MissingParent {
        /// 1-based input line of the offending block header.
        line: u64,
        /// Type name of the block being added.
        block: String,
        /// Its parent type name, which no live block carries.
        parent: String,
    },
}

/// Convenience alias for store results.
pub type StoreResult<T> = Result<T, StoreError>;
