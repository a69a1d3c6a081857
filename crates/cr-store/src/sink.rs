//! [`ReportSink`] implementation: the store is driven directly by the
//! reader, one event per recognized input line.

use cr_reader::ReportSink;

use crate::error::StoreError;
use crate::store::ReportStore;

impl ReportSink for ReportStore {
    type Error = StoreError;

    fn position(&mut self, line: u64) {
        self.line = line;
    }

    fn create(&mut self, name: &str, ids: &[i32]) -> Result<(), StoreError> {
        self.create_block(name, ids);
        Ok(())
    }

    fn set_int(&mut self, name: &str, value: i32) -> Result<(), StoreError> {
        self.set_int_attr(name, value);
        Ok(())
    }

    fn set_ints(&mut self, name: &str, values: &[i32]) -> Result<(), StoreError> {
        self.set_ints_attr(name, values);
        Ok(())
    }

    fn set_string(&mut self, name: &str, value: &str) -> Result<(), StoreError> {
        self.set_string_attr(name, value);
        Ok(())
    }

    fn set_message(&mut self, value: &str) -> Result<(), StoreError> {
        self.set_message_attr(value);
        Ok(())
    }

    fn add(&mut self) -> Result<(), StoreError> {
        self.add_block()
    }
}
