//! Decorator sink that moves regions into another coordinate system.

use tracing::warn;

use cr_reader::ReportSink;

/// Wraps another sink and offsets the first two ids of every `REGION`
/// block header by a fixed amount.
///
/// A region header whose id tuple is not 2 or 3 long is dropped along
/// with its attribute lines. All other events pass through unchanged.
pub struct RegionShift<'a, S> {
    inner: &'a mut S,
    dx: i32,
    dy: i32,
    line: u64,
    dropping: bool,
}

impl<'a, S: ReportSink> RegionShift<'a, S> {
    pub fn new(inner: &'a mut S, dx: i32, dy: i32) -> Self {
        RegionShift {
            inner,
            dx,
            dy,
            line: 0,
            dropping: false,
        }
    }
}

impl<S: ReportSink> ReportSink for RegionShift<'_, S> {
    type Error = S::Error;

    fn position(&mut self, line: u64) {
        self.line = line;
        self.inner.position(line);
    }

    fn create(&mut self, name: &str, ids: &[i32]) -> Result<(), S::Error> {
        self.dropping = false;
        if name.eq_ignore_ascii_case("REGION") {
            if !(2..=3).contains(&ids.len()) {
                warn!(line = self.line, "invalid REGION block");
                self.dropping = true;
                return Ok(());
            }
            let mut moved = ids.to_vec();
            moved[0] += self.dx;
            moved[1] += self.dy;
            return self.inner.create(name, &moved);
        }
        self.inner.create(name, ids)
    }

    fn set_int(&mut self, name: &str, value: i32) -> Result<(), S::Error> {
        if self.dropping {
            return Ok(());
        }
        self.inner.set_int(name, value)
    }

    fn set_ints(&mut self, name: &str, values: &[i32]) -> Result<(), S::Error> {
        if self.dropping {
            return Ok(());
        }
        self.inner.set_ints(name, values)
    }

    fn set_string(&mut self, name: &str, value: &str) -> Result<(), S::Error> {
        if self.dropping {
            return Ok(());
        }
        self.inner.set_string(name, value)
    }

    fn set_message(&mut self, value: &str) -> Result<(), S::Error> {
        if self.dropping {
            return Ok(());
        }
        self.inner.set_message(value)
    }

    fn add(&mut self) -> Result<(), S::Error> {
        if self.dropping {
            self.dropping = false;
            return Ok(());
        }
        self.inner.add()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use cr_reader::read_report;
    use cr_store::ReportStore;

    const HIERARCHY: &str = "\
VERSION
 REGION
  EINHEIT
";

    #[test]
    fn regions_and_only_regions_are_moved() {
        let mut store = ReportStore::new(cr_hierarchy::parse(HIERARCHY).unwrap());
        let mut shifted = RegionShift::new(&mut store, 10, -2);
        read_report(
            "VERSION 66\nREGION 1 2\n100;bauern\nEINHEIT 5\n".as_bytes(),
            &mut shifted,
        )
        .unwrap();
        let region = store.find(store.roots()[0], "REGION", &[11, 0]).unwrap();
        assert_eq!(store.get_int(region, "bauern"), Some(100));
        assert!(store.find(region, "EINHEIT", &[5]).is_some());
    }

    #[test]
    fn third_region_id_is_preserved() {
        let mut store = ReportStore::new(cr_hierarchy::parse(HIERARCHY).unwrap());
        let mut shifted = RegionShift::new(&mut store, 1, 1);
        read_report("VERSION 66\nREGION 1 2 3\n".as_bytes(), &mut shifted).unwrap();
        assert!(store.find(store.roots()[0], "REGION", &[2, 3, 3]).is_some());
    }

    #[test]
    fn malformed_region_is_dropped_with_its_attributes() {
        let mut store = ReportStore::new(cr_hierarchy::parse(HIERARCHY).unwrap());
        let mut shifted = RegionShift::new(&mut store, 1, 1);
        read_report(
            "VERSION 66\nREGION 1\n100;bauern\nREGION 4 5\n7;silber\n".as_bytes(),
            &mut shifted,
        )
        .unwrap();
        let version = store.roots()[0];
        assert_eq!(store.children(version).len(), 1);
        let region = store.find(version, "REGION", &[5, 6]).unwrap();
        assert_eq!(store.get_int(region, "silber"), Some(7));
        assert_eq!(store.get_int(region, "bauern"), None);
    }
}
