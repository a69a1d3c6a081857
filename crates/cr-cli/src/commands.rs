use std::fs::{self, File};
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use anyhow::Context;
use tracing::debug;

use cr_hierarchy::TypeHierarchy;
use cr_reader::read_report;
use cr_store::{DropUnknown, ReportStore, TypePolicy};

use crate::cli::{Cli, Command, MergeArgs, StripArgs};
use crate::filter::{FilterSpec, StripSink};
use crate::origins::OriginTable;
use crate::shift::RegionShift;

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Command::Merge(args) => cmd_merge(args),
        Command::Strip(args) => cmd_strip(args),
    }
}

// -----------------------------------------------------------------------
// cr merge
// -----------------------------------------------------------------------

fn cmd_merge(args: MergeArgs) -> anyhow::Result<()> {
    let hierarchy = match &args.hierarchy {
        Some(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("reading hierarchy {}", path.display()))?;
            cr_hierarchy::parse(&text)
                .with_context(|| format!("parsing hierarchy {}", path.display()))?
        }
        None => TypeHierarchy::new(),
    };
    let policy: Box<dyn TypePolicy> = if args.interactive {
        Box::new(PromptPolicy)
    } else {
        Box::new(DropUnknown)
    };
    let mut store = ReportStore::with_policy(hierarchy, policy);

    let (dx, dy) = shift_offset(&args)?;

    if args.inputs.is_empty() {
        debug!("reading from stdin");
        read_into(&mut store, io::stdin().lock(), dx, dy).context("reading stdin")?;
    } else {
        for path in &args.inputs {
            debug!(path = %path.display(), "reading");
            let file =
                File::open(path).with_context(|| format!("opening {}", path.display()))?;
            read_into(&mut store, BufReader::new(file), dx, dy)
                .with_context(|| format!("reading {}", path.display()))?;
        }
    }

    if let Some(path) = &args.save_hierarchy {
        fs::write(path, cr_hierarchy::write(store.hierarchy()))
            .with_context(|| format!("writing hierarchy {}", path.display()))?;
    }

    write_output(&store, args.output.as_deref())
}

fn shift_offset(args: &MergeArgs) -> anyhow::Result<(i32, i32)> {
    if let Some(id) = args.origin {
        // clap enforces that --origin comes with --coordinates
        let path = args.coordinates.as_ref().expect("--coordinates");
        let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
        let mut table = OriginTable::default();
        read_report(BufReader::new(file), &mut table)
            .with_context(|| format!("reading {}", path.display()))?;
        return Ok(table.offset(id));
    }
    match &args.shift {
        Some(v) => Ok((v[0], v[1])),
        None => Ok((0, 0)),
    }
}

fn read_into<R: BufRead>(
    store: &mut ReportStore,
    input: R,
    dx: i32,
    dy: i32,
) -> anyhow::Result<()> {
    if dx != 0 || dy != 0 {
        let mut shifted = RegionShift::new(store, dx, dy);
        read_report(input, &mut shifted)?;
    } else {
        read_report(input, store)?;
    }
    Ok(())
}

fn write_output(store: &ReportStore, path: Option<&Path>) -> anyhow::Result<()> {
    match path {
        Some(path) => {
            let mut out = BufWriter::new(
                File::create(path).with_context(|| format!("creating {}", path.display()))?,
            );
            store.write_report(&mut out)?;
            out.flush()?;
        }
        None => {
            store.write_report(&mut io::stdout().lock())?;
        }
    }
    Ok(())
}

/// Interactive unknown-type resolution: list the ancestor chain, ask for
/// the parent, and repeat until the answer names one of the ancestors.
/// Empty input picks the nearest; closed stdin drops the block.
struct PromptPolicy;

impl TypePolicy for PromptPolicy {
    fn resolve_parent(&mut self, name: &str, ancestors: &[&str]) -> Option<String> {
        loop {
            eprintln!("{}", ancestors.join(" <- "));
            eprint!(
                "type {name} is unknown. what is the name of the parent type [{}]? ",
                ancestors[0]
            );
            let _ = io::stderr().flush();
            let mut answer = String::new();
            match io::stdin().read_line(&mut answer) {
                Ok(0) | Err(_) => return None,
                Ok(_) => {}
            }
            let answer = answer.trim();
            if answer.is_empty() {
                return Some(ancestors[0].to_string());
            }
            if ancestors.iter().any(|a| a.eq_ignore_ascii_case(answer)) {
                return Some(answer.to_string());
            }
            eprintln!("unknown type {answer}");
        }
    }
}

// -----------------------------------------------------------------------
// cr strip
// -----------------------------------------------------------------------

fn cmd_strip(args: StripArgs) -> anyhow::Result<()> {
    let text = fs::read_to_string(&args.filter)
        .with_context(|| format!("reading filter {}", args.filter.display()))?;
    let spec = FilterSpec::parse(&text);

    let input: Box<dyn BufRead> = match &args.input {
        Some(path) => Box::new(BufReader::new(
            File::open(path).with_context(|| format!("opening {}", path.display()))?,
        )),
        None => Box::new(BufReader::new(io::stdin())),
    };

    match &args.output {
        Some(path) => {
            let out = BufWriter::new(
                File::create(path).with_context(|| format!("creating {}", path.display()))?,
            );
            let mut sink = StripSink::new(spec, out);
            read_report(input, &mut sink)?;
            sink.into_inner().flush()?;
        }
        None => {
            let mut sink = StripSink::new(spec, io::stdout().lock());
            read_report(input, &mut sink)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::cli::{MergeArgs, StripArgs};

    fn write_file(dir: &Path, name: &str, content: &str) -> std::path::PathBuf {
        let path = dir.join(name);
        fs::write(&path, content).unwrap();
        path
    }

    const HIERARCHY: &str = "\
VERSION
 REGION
  EINHEIT
";

    #[test]
    fn merge_two_files_end_to_end() {
        let dir = tempfile::tempdir().unwrap();
        let hierarchy = write_file(dir.path(), "types.txt", HIERARCHY);
        let a = write_file(
            dir.path(),
            "a.cr",
            "VERSION 66\nREGION 1 2\n1;turn\n100;bauern\n\"Wald\";terrain\n",
        );
        let b = write_file(
            dir.path(),
            "b.cr",
            "VERSION 66\nREGION 1 2\n2;turn\n50;bauern\n",
        );
        let out = dir.path().join("out.cr");

        cmd_merge(MergeArgs {
            inputs: vec![a, b],
            output: Some(out.clone()),
            hierarchy: Some(hierarchy),
            shift: None,
            coordinates: None,
            origin: None,
            interactive: false,
            save_hierarchy: None,
        })
        .unwrap();

        let merged = fs::read_to_string(&out).unwrap();
        assert_eq!(
            merged,
            "VERSION 66\n2;turn\nREGION 1 2\n50;bauern\n\"Wald\";terrain\n"
        );
    }

    #[test]
    fn merge_with_move_offsets_regions() {
        let dir = tempfile::tempdir().unwrap();
        let hierarchy = write_file(dir.path(), "types.txt", HIERARCHY);
        let a = write_file(dir.path(), "a.cr", "VERSION 66\nREGION 1 2\n100;bauern\n");
        let out = dir.path().join("out.cr");

        cmd_merge(MergeArgs {
            inputs: vec![a],
            output: Some(out.clone()),
            hierarchy: Some(hierarchy),
            shift: Some(vec![-3, 4]),
            coordinates: None,
            origin: None,
            interactive: false,
            save_hierarchy: None,
        })
        .unwrap();

        let merged = fs::read_to_string(&out).unwrap();
        assert_eq!(merged, "VERSION 66\nREGION -2 6\n100;bauern\n");
    }

    #[test]
    fn merge_with_origin_accumulates_coordinates() {
        let dir = tempfile::tempdir().unwrap();
        let hierarchy = write_file(dir.path(), "types.txt", HIERARCHY);
        let coords = write_file(
            dir.path(),
            "coords.cr",
            "ORIGIN 1\nORIGIN 2\n1;parent\n10 20;offset\n",
        );
        let a = write_file(dir.path(), "a.cr", "VERSION 66\nREGION 0 0\n");
        let out = dir.path().join("out.cr");

        cmd_merge(MergeArgs {
            inputs: vec![a],
            output: Some(out.clone()),
            hierarchy: Some(hierarchy),
            shift: None,
            coordinates: Some(coords),
            origin: Some(2),
            interactive: false,
            save_hierarchy: None,
        })
        .unwrap();

        let merged = fs::read_to_string(&out).unwrap();
        assert_eq!(merged, "VERSION 66\nREGION 10 20\n");
    }

    #[test]
    fn save_hierarchy_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let hierarchy = write_file(dir.path(), "types.txt", HIERARCHY);
        let a = write_file(dir.path(), "a.cr", "VERSION 66\n");
        let out = dir.path().join("out.cr");
        let saved = dir.path().join("saved.txt");

        cmd_merge(MergeArgs {
            inputs: vec![a],
            output: Some(out),
            hierarchy: Some(hierarchy),
            shift: None,
            coordinates: None,
            origin: None,
            interactive: false,
            save_hierarchy: Some(saved.clone()),
        })
        .unwrap();

        assert_eq!(fs::read_to_string(&saved).unwrap(), HIERARCHY);
    }

    #[test]
    fn strip_end_to_end() {
        let dir = tempfile::tempdir().unwrap();
        let filter = write_file(dir.path(), "filter.txt", "@REGION\nterrain\n");
        let input = write_file(
            dir.path(),
            "in.cr",
            "VERSION 66\nREGION 1 2\n\"Wald\";terrain\n100;bauern\n",
        );
        let out = dir.path().join("out.cr");

        cmd_strip(StripArgs {
            input: Some(input),
            filter,
            output: Some(out.clone()),
        })
        .unwrap();

        assert_eq!(
            fs::read_to_string(&out).unwrap(),
            "REGION 1 2\n\"Wald\";terrain\n"
        );
    }
}
