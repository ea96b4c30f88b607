use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "dvg",
    about = "dvg: find upstream changes a document copy has not absorbed",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,

    /// TOML file with `[engine]` and `[cache]` sections
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Clone, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Show divergences between an upstream document and its copy
    Diff(DiffArgs),
    /// Recompute divergences whenever the snapshot files change
    Watch(WatchArgs),
    /// Print the content digest of a JSON value
    Hash(HashArgs),
    /// Print the move table between two keyed arrays
    Moves(MovesArgs),
    /// Print the flattened paths of a JSON value
    Flatten(FlattenArgs),
}

/// The three snapshot files of a computation.
#[derive(Args, Clone, Debug)]
pub struct SnapshotArgs {
    /// Upstream document at the revision the copy was made from
    #[arg(long)]
    pub fork: PathBuf,
    /// Upstream document now
    #[arg(long)]
    pub upstream: PathBuf,
    /// The copy now
    #[arg(long)]
    pub subject: PathBuf,
    /// JSON array of recorded resolutions
    #[arg(long)]
    pub resolutions: Option<PathBuf>,
}

#[derive(Args)]
pub struct DiffArgs {
    #[command(flatten)]
    pub snapshots: SnapshotArgs,
}

#[derive(Args)]
pub struct WatchArgs {
    #[command(flatten)]
    pub snapshots: SnapshotArgs,
    /// How often the files are re-read, in milliseconds
    #[arg(long, default_value = "2000")]
    pub interval_ms: u64,
}

#[derive(Args)]
pub struct HashArgs {
    /// JSON file, or `-` for stdin
    pub input: String,
}

#[derive(Args)]
pub struct MovesArgs {
    pub a: PathBuf,
    pub b: PathBuf,
}

#[derive(Args)]
pub struct FlattenArgs {
    /// JSON file, or `-` for stdin
    pub input: String,
    /// Leave out container nodes
    #[arg(long)]
    pub compact: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_diff() {
        let cli = Cli::try_parse_from([
            "dvg", "diff", "--fork", "f.json", "--upstream", "u.json", "--subject", "s.json",
        ])
        .unwrap();
        if let Command::Diff(args) = cli.command {
            assert_eq!(args.snapshots.fork, PathBuf::from("f.json"));
            assert_eq!(args.snapshots.subject, PathBuf::from("s.json"));
            assert!(args.snapshots.resolutions.is_none());
        } else { panic!("wrong command"); }
    }

    #[test]
    fn parse_diff_requires_all_snapshots() {
        assert!(Cli::try_parse_from(["dvg", "diff", "--fork", "f.json"]).is_err());
    }

    #[test]
    fn parse_diff_with_resolutions() {
        let cli = Cli::try_parse_from([
            "dvg", "diff", "--fork", "f", "--upstream", "u", "--subject", "s",
            "--resolutions", "r.json",
        ])
        .unwrap();
        if let Command::Diff(args) = cli.command {
            assert_eq!(args.snapshots.resolutions, Some(PathBuf::from("r.json")));
        } else { panic!("wrong command"); }
    }

    #[test]
    fn parse_watch_interval() {
        let cli = Cli::try_parse_from([
            "dvg", "watch", "--fork", "f", "--upstream", "u", "--subject", "s",
            "--interval-ms", "500",
        ])
        .unwrap();
        if let Command::Watch(args) = cli.command {
            assert_eq!(args.interval_ms, 500);
        } else { panic!("wrong command"); }
    }

    #[test]
    fn parse_hash_stdin() {
        let cli = Cli::try_parse_from(["dvg", "hash", "-"]).unwrap();
        if let Command::Hash(args) = cli.command {
            assert_eq!(args.input, "-");
        } else { panic!("wrong command"); }
    }

    #[test]
    fn parse_moves() {
        let cli = Cli::try_parse_from(["dvg", "moves", "a.json", "b.json"]).unwrap();
        assert!(matches!(cli.command, Command::Moves(_)));
    }

    #[test]
    fn parse_flatten_compact() {
        let cli = Cli::try_parse_from(["dvg", "flatten", "doc.json", "--compact"]).unwrap();
        if let Command::Flatten(args) = cli.command {
            assert!(args.compact);
        } else { panic!("wrong command"); }
    }

    #[test]
    fn parse_global_flags() {
        let cli = Cli::try_parse_from([
            "dvg", "--verbose", "--format", "json", "--config", "dvg.toml", "hash", "x.json",
        ])
        .unwrap();
        assert!(cli.verbose);
        assert!(matches!(cli.format, OutputFormat::Json));
        assert_eq!(cli.config, Some(PathBuf::from("dvg.toml")));
    }
}
