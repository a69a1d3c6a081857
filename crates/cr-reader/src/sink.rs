//! The event contract between the reader and its consumers.

/// Receives structural events from [`read_report`](crate::read_report).
///
/// An implementation tracks its own pending block: [`create`] opens one,
/// [`add`] finalizes it, and the attribute setters apply to whichever block
/// is currently open. An attribute event with no open block is the sink's
/// business; the store logs and ignores it.
///
/// All event methods except [`create`] default to no-ops, so a sink only
/// interested in part of the stream implements just what it needs.
///
/// [`create`]: ReportSink::create
/// [`add`]: ReportSink::add
pub trait ReportSink {
    /// Error type for sinks that can reject events. Sinks with no failure
    /// mode use [`std::convert::Infallible`].
    type Error;

    /// The reader is now at this 1-based input line. Purely informational,
    /// for diagnostics.
    fn position(&mut self, _line: u64) {}

    /// Open a new block of type `name` with the given id tuple.
    fn create(&mut self, name: &str, ids: &[i32]) -> Result<(), Self::Error>;

    /// Set a single-integer attribute on the open block.
    fn set_int(&mut self, _name: &str, _value: i32) -> Result<(), Self::Error> {
        Ok(())
    }

    /// Set an integer-list attribute on the open block.
    fn set_ints(&mut self, _name: &str, _values: &[i32]) -> Result<(), Self::Error> {
        Ok(())
    }

    /// Set a string attribute on the open block.
    fn set_string(&mut self, _name: &str, _value: &str) -> Result<(), Self::Error> {
        Ok(())
    }

    /// Append an unnamed message entry to the open block.
    fn set_message(&mut self, _value: &str) -> Result<(), Self::Error> {
        Ok(())
    }

    /// Finalize the open block.
    fn add(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}
