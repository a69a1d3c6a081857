//! Serialize the merged tree back to CR text.

use std::io::{self, Write};

use cr_hierarchy::TypeFlags;

use crate::block::{BlockId, EntryValue};
use crate::store::ReportStore;

impl ReportStore {
    /// Write the whole merged report, block by block, depth-first.
    pub fn write_report<W: Write>(&self, out: &mut W) -> io::Result<()> {
        for &b in self.roots() {
            self.write_block(out, b)?;
        }
        Ok(())
    }

    /// Write one block and its subtree.
    ///
    /// A `Parentage`-flagged block whose turn disagrees with its parent's
    /// is suppressed along with its subtree. The turn is written as a
    /// `;turn` line when it carries information: on top-level blocks, and
    /// on identified blocks that disagree with their parent.
    pub fn write_block<W: Write>(&self, out: &mut W, b: BlockId) -> io::Result<()> {
        let block = self.block(b);
        if self.hierarchy.flags(block.btype).contains(TypeFlags::PARENTAGE) {
            if let Some(p) = block.parent {
                if self.block(p).turn != block.turn {
                    return Ok(());
                }
            }
        }
        write!(out, "{}", self.hierarchy.name(block.btype))?;
        for id in &block.ids {
            write!(out, " {id}")?;
        }
        writeln!(out)?;
        if block.turn != 0 {
            let disagrees = match block.parent {
                None => true,
                Some(p) => !block.ids.is_empty() && block.turn != self.block(p).turn,
            };
            if disagrees {
                writeln!(out, "{};turn", block.turn)?;
            }
        }
        for entry in &block.entries {
            let name = entry.key.map(|k| self.props.name(k)).unwrap_or("");
            match &entry.value {
                EntryValue::Int(v) => writeln!(out, "{v};{name}")?,
                EntryValue::Ints(vs) => {
                    for (i, v) in vs.iter().enumerate() {
                        if i > 0 {
                            write!(out, " ")?;
                        }
                        write!(out, "{v}")?;
                    }
                    writeln!(out, ";{name}")?;
                }
                EntryValue::Text(s) => writeln!(out, "\"{s}\";{name}")?,
                EntryValue::Message(s) => writeln!(out, "\"{s}\"")?,
            }
        }
        for &child in &block.children {
            self.write_block(out, child)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use cr_reader::read_report;

    use crate::store::ReportStore;

    fn round_trip(hierarchy: &str, text: &str) -> String {
        let mut store = ReportStore::new(cr_hierarchy::parse(hierarchy).unwrap());
        read_report(text.as_bytes(), &mut store).unwrap();
        let mut out = Vec::new();
        store.write_report(&mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    const HIERARCHY: &str = "\
VERSION
 REGION
  EINHEIT
  MELDUNG
";

    #[test]
    fn entry_kinds_render_in_merge_order() {
        let text = "\
VERSION 66
2;turn
REGION 1 2
2;turn
100;bauern
1 4;schaetze
\"Wald\";terrain
EINHEIT 5
\"Hans\";name
MELDUNG
\"es regnet\"
";
        // turns agreeing with the parent are left implicit
        let expected = "\
VERSION 66
2;turn
REGION 1 2
100;bauern
1 4;schaetze
\"Wald\";terrain
EINHEIT 5
\"Hans\";name
MELDUNG
\"es regnet\"
";
        assert_eq!(round_trip(HIERARCHY, text), expected);
    }

    #[test]
    fn turn_surfaces_only_where_it_disagrees() {
        let text = "\
VERSION 66
REGION 1 2
1;turn
EINHEIT 5
3;turn
REGION 3 4
1;turn
";
        // the unit raised its ancestors to 3; the other region lags behind
        let expected = "\
VERSION 66
3;turn
REGION 1 2
EINHEIT 5
REGION 3 4
1;turn
";
        assert_eq!(round_trip(HIERARCHY, text), expected);
    }

    #[test]
    fn parentage_blocks_vanish_when_their_turn_lags() {
        let hierarchy = "\
VERSION
 REGION
  GRENZE:2
";
        let text = "\
VERSION 66
REGION 1 2
2;turn
GRENZE 1
1;turn
1;richtung
GRENZE 2
2;turn
2;richtung
";
        let expected = "\
VERSION 66
2;turn
REGION 1 2
GRENZE 2
2;richtung
";
        assert_eq!(round_trip(hierarchy, text), expected);
    }

    #[test]
    fn written_output_re_reads_to_itself() {
        let text = "\
VERSION 66
1;turn
REGION 1 2
100;bauern
\"Wald\";terrain
EINHEIT 5
\"Hans\";name
10;silber
";
        let first = round_trip(HIERARCHY, text);
        assert_eq!(round_trip(HIERARCHY, &first), first);
    }
}
