//! Streaming whitelist filter: re-emits only listed blocks and attributes.

use std::io::{self, Write};

use cr_reader::ReportSink;

/// A parsed filter file.
///
/// `@BLOCKNAME` opens a section; the lines after it name the attributes
/// that pass for blocks of that type. All matching is case-insensitive.
#[derive(Debug, Default)]
pub struct FilterSpec {
    sections: Vec<Section>,
}

#[derive(Debug)]
struct Section {
    name: String,
    tags: Vec<String>,
}

impl FilterSpec {
    pub fn parse(text: &str) -> FilterSpec {
        let mut sections: Vec<Section> = Vec::new();
        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            if let Some(name) = line.strip_prefix('@') {
                sections.push(Section {
                    name: name.to_string(),
                    tags: Vec::new(),
                });
            } else if let Some(section) = sections.last_mut() {
                section.tags.push(line.to_string());
            }
            // attribute lines before any @section are meaningless; skip
        }
        FilterSpec { sections }
    }

    fn section(&self, name: &str) -> Option<usize> {
        self.sections
            .iter()
            .position(|s| s.name.eq_ignore_ascii_case(name))
    }
}

/// Sink that copies whitelisted parts of the input straight to `out`.
///
/// Purely streaming: no store is built, and nothing is merged. Messages
/// pass whenever their block does.
pub struct StripSink<W> {
    spec: FilterSpec,
    out: W,
    open: Option<usize>,
}

impl<W: Write> StripSink<W> {
    pub fn new(spec: FilterSpec, out: W) -> Self {
        StripSink {
            spec,
            out,
            open: None,
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn passes(&self, name: &str) -> bool {
        self.open.is_some_and(|i| {
            self.spec.sections[i]
                .tags
                .iter()
                .any(|t| t.eq_ignore_ascii_case(name))
        })
    }
}

impl<W: Write> ReportSink for StripSink<W> {
    type Error = io::Error;

    fn create(&mut self, name: &str, ids: &[i32]) -> io::Result<()> {
        self.open = self.spec.section(name);
        if self.open.is_some() {
            write!(self.out, "{name}")?;
            for id in ids {
                write!(self.out, " {id}")?;
            }
            writeln!(self.out)?;
        }
        Ok(())
    }

    fn set_int(&mut self, name: &str, value: i32) -> io::Result<()> {
        if self.passes(name) {
            writeln!(self.out, "{value};{name}")?;
        }
        Ok(())
    }

    fn set_ints(&mut self, name: &str, values: &[i32]) -> io::Result<()> {
        if self.passes(name) {
            for (i, v) in values.iter().enumerate() {
                if i > 0 {
                    write!(self.out, " ")?;
                }
                write!(self.out, "{v}")?;
            }
            writeln!(self.out, ";{name}")?;
        }
        Ok(())
    }

    fn set_string(&mut self, name: &str, value: &str) -> io::Result<()> {
        if self.passes(name) {
            writeln!(self.out, "\"{value}\";{name}")?;
        }
        Ok(())
    }

    fn set_message(&mut self, value: &str) -> io::Result<()> {
        if self.open.is_some() {
            writeln!(self.out, "\"{value}\"")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use cr_reader::read_report;

    fn strip(filter: &str, input: &str) -> String {
        let mut sink = StripSink::new(FilterSpec::parse(filter), Vec::new());
        read_report(input.as_bytes(), &mut sink).unwrap();
        String::from_utf8(sink.into_inner()).unwrap()
    }

    #[test]
    fn only_listed_blocks_and_tags_pass() {
        let filter = "@REGION\nterrain\nbauern\n@EINHEIT\nname\n";
        let input = "\
VERSION 66
REGION 1 2
\"Wald\";terrain
100;bauern
5000;silber
EINHEIT 9
\"Hans\";name
3;anzahl
BURG 4
\"Turm\";name
";
        let expected = "\
REGION 1 2
\"Wald\";terrain
100;bauern
EINHEIT 9
\"Hans\";name
";
        assert_eq!(strip(filter, input), expected);
    }

    #[test]
    fn matching_is_case_insensitive() {
        let filter = "@region\nTERRAIN\n";
        let input = "REGION 1 2\n\"Wald\";terrain\n";
        assert_eq!(strip(filter, input), "REGION 1 2\n\"Wald\";terrain\n");
    }

    #[test]
    fn messages_pass_with_their_block() {
        let filter = "@MELDUNG\n@REGION\n";
        let input = "REGION 1 2\n\"verborgen\";terrain\nMELDUNG\n\"es regnet\"\nEINHEIT 9\n\"leise\"\n";
        assert_eq!(strip(filter, input), "REGION 1 2\nMELDUNG\n\"es regnet\"\n");
    }

    #[test]
    fn int_lists_keep_their_shape() {
        let filter = "@REGION\nschaetze\n";
        let input = "REGION 1 2\n1 4 9;schaetze\n";
        assert_eq!(strip(filter, input), "REGION 1 2\n1 4 9;schaetze\n");
    }

    #[test]
    fn output_lines_are_a_subset_of_input_lines() {
        let filter = "@REGION\nbauern\n";
        let input = "VERSION 66\nREGION 1 2\n100;bauern\n\"Wald\";terrain\n";
        let output = strip(filter, input);
        for line in output.lines() {
            assert!(input.lines().any(|l| l == line), "fabricated line: {line}");
        }
    }
}
