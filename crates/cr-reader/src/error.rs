//! Error types for report reading.

use thiserror::Error;

/// Errors that abort a [`read_report`](crate::read_report) run.
///
/// Malformed lines are *not* errors; they are logged and dropped so the
/// stream continues. Only I/O failures and sink-reported structural
/// failures end the run.
#[derive(Debug, Error)]
pub enum ReadError<E> {
    /// Reading from the input stream failed.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// The sink rejected an event.
    #[error("line {line}: {source}")]
    Sink {
        /// 1-based input line the event came from.
        line: u64,
        source: E,
    },
}
