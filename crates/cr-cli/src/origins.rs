//! Relative coordinate systems, read from a CR of `ORIGIN` blocks.

use std::collections::{HashMap, HashSet};
use std::convert::Infallible;

use cr_reader::ReportSink;

#[derive(Clone, Copy, Debug, Default)]
struct Origin {
    parent: Option<i32>,
    dx: i32,
    dy: i32,
}

/// Origins keyed by id, each carrying an offset relative to its parent.
///
/// Built by feeding a coordinates file through the reader; blocks other
/// than `ORIGIN n` are ignored.
#[derive(Debug, Default)]
pub struct OriginTable {
    origins: HashMap<i32, Origin>,
    current: Option<i32>,
}

impl OriginTable {
    /// The accumulated offset of `id` and its parent chain.
    ///
    /// Unknown ids contribute nothing; a cycle in the parent chain stops
    /// at the first repeated id.
    pub fn offset(&self, id: i32) -> (i32, i32) {
        let (mut dx, mut dy) = (0, 0);
        let mut seen = HashSet::new();
        let mut walk = Some(id);
        while let Some(id) = walk {
            if !seen.insert(id) {
                break;
            }
            let Some(o) = self.origins.get(&id) else {
                break;
            };
            dx += o.dx;
            dy += o.dy;
            walk = o.parent;
        }
        (dx, dy)
    }
}

impl ReportSink for OriginTable {
    type Error = Infallible;

    fn create(&mut self, name: &str, ids: &[i32]) -> Result<(), Infallible> {
        self.current = if name.eq_ignore_ascii_case("ORIGIN") && ids.len() == 1 {
            self.origins.entry(ids[0]).or_default();
            Some(ids[0])
        } else {
            None
        };
        Ok(())
    }

    fn set_int(&mut self, name: &str, value: i32) -> Result<(), Infallible> {
        if let Some(id) = self.current {
            if name.eq_ignore_ascii_case("parent") {
                self.origins.entry(value).or_default();
                self.origins.get_mut(&id).expect("open origin").parent = Some(value);
            }
        }
        Ok(())
    }

    fn set_ints(&mut self, name: &str, values: &[i32]) -> Result<(), Infallible> {
        if let Some(id) = self.current {
            if name.eq_ignore_ascii_case("offset") && values.len() >= 2 {
                let o = self.origins.get_mut(&id).expect("open origin");
                o.dx = values[0];
                o.dy = values[1];
            }
        }
        Ok(())
    }

    fn add(&mut self) -> Result<(), Infallible> {
        self.current = None;
        Ok(())
    }
}
