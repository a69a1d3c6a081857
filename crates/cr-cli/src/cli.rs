use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "cr",
    about = "Tools for Eressea computer reports",
    version,
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Command {
    /// Merge CR files into a single report
    Merge(MergeArgs),
    /// Strip a CR file down to whitelisted blocks and attributes
    Strip(StripArgs),
}

#[derive(Args)]
pub struct MergeArgs {
    /// Input CR files; stdin when none are given
    pub inputs: Vec<PathBuf>,

    /// Write output to a file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Block-type hierarchy definition to load
    #[arg(short = 'H', long)]
    pub hierarchy: Option<PathBuf>,

    /// Offset the coordinates of every region read
    #[arg(
        short = 'm',
        long = "move",
        num_args = 2,
        value_names = ["DX", "DY"],
        allow_negative_numbers = true
    )]
    pub shift: Option<Vec<i32>>,

    /// CR file with ORIGIN blocks describing coordinate systems
    #[arg(short = 'C', long)]
    pub coordinates: Option<PathBuf>,

    /// Shift regions by the accumulated offset of this origin
    #[arg(short = 'c', long, requires = "coordinates", value_name = "ID")]
    pub origin: Option<i32>,

    /// Prompt for the parent of unknown block types instead of dropping them
    #[arg(short, long)]
    pub interactive: bool,

    /// Write the (possibly extended) hierarchy back out after reading
    #[arg(long, value_name = "FILE")]
    pub save_hierarchy: Option<PathBuf>,
}

#[derive(Args)]
pub struct StripArgs {
    /// Input CR file; stdin when omitted
    pub input: Option<PathBuf>,

    /// Filter file: `@BLOCK` section lines followed by attribute names
    #[arg(short, long)]
    pub filter: PathBuf,

    /// Write output to a file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_merge_inputs() {
        let cli = Cli::try_parse_from(["cr", "merge", "a.cr", "b.cr"]).unwrap();
        if let Command::Merge(args) = cli.command {
            assert_eq!(args.inputs.len(), 2);
            assert!(args.output.is_none());
        } else {
            panic!("wrong command");
        }
    }

    #[test]
    fn parse_merge_move() {
        let cli = Cli::try_parse_from(["cr", "merge", "-m", "-3", "4", "a.cr"]).unwrap();
        if let Command::Merge(args) = cli.command {
            assert_eq!(args.shift, Some(vec![-3, 4]));
        } else {
            panic!("wrong command");
        }
    }

    #[test]
    fn parse_merge_hierarchy_and_output() {
        let cli =
            Cli::try_parse_from(["cr", "merge", "-H", "types.txt", "-o", "out.cr"]).unwrap();
        if let Command::Merge(args) = cli.command {
            assert_eq!(args.hierarchy, Some("types.txt".into()));
            assert_eq!(args.output, Some("out.cr".into()));
        } else {
            panic!("wrong command");
        }
    }

    #[test]
    fn origin_requires_coordinates() {
        assert!(Cli::try_parse_from(["cr", "merge", "-c", "7"]).is_err());
        let cli = Cli::try_parse_from(["cr", "merge", "-C", "coords.cr", "-c", "7"]).unwrap();
        if let Command::Merge(args) = cli.command {
            assert_eq!(args.origin, Some(7));
            assert_eq!(args.coordinates, Some("coords.cr".into()));
        } else {
            panic!("wrong command");
        }
    }

    #[test]
    fn parse_strip() {
        let cli = Cli::try_parse_from(["cr", "strip", "-f", "filter.txt", "in.cr"]).unwrap();
        if let Command::Strip(args) = cli.command {
            assert_eq!(args.filter, PathBuf::from("filter.txt"));
            assert_eq!(args.input, Some("in.cr".into()));
        } else {
            panic!("wrong command");
        }
    }

    #[test]
    fn strip_filter_is_mandatory() {
        assert!(Cli::try_parse_from(["cr", "strip", "in.cr"]).is_err());
    }

    #[test]
    fn parse_verbose() {
        let cli = Cli::try_parse_from(["cr", "-v", "merge"]).unwrap();
        assert!(cli.verbose);
    }
}
