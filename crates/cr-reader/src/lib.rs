//! Streaming reader for the line-oriented CR record format.
//!
//! The reader is a pure lexical-to-structural translator: it reads one
//! text line at a time and turns each recognized line into an event on a
//! [`ReportSink`]. It knows nothing about storage or merge semantics; the
//! sink decides what a block *is*. One sink is the merged record store,
//! another might be a plain line filter.
//!
//! Line classification, by first significant byte:
//!
//! - ASCII letter: block header (`NAME id1 id2 ...`)
//! - digit or `-`: integer attribute(s) (`v1 v2;tag`)
//! - `"`: quoted string attribute (`"v";tag`) or unnamed message (`"v"`)
//! - anything else: silently ignored

pub mod error;
pub mod reader;
pub mod sink;

pub use error::ReadError;
pub use reader::read_report;
pub use sink::ReportSink;
