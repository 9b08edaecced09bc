//! Command line interface definition using clap.
//!
//! This module defines the [`Cli`] structure and its subcommands. Every
//! global flag can also be supplied through a `KUMADE_*` environment
//! variable; explicit flags win.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

mod parsing;

use parsing::parse_fetch_retries;

/// Upper bound for `--fetch-retries`.
pub const MAX_FETCH_RETRIES: u32 = 10;

/// Fetch, verify and rebuild third-party tools when their inputs change.
#[derive(Debug, Clone, Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to the Kumade manifest file to use.
    #[arg(
        short,
        long,
        value_name = "FILE",
        env = "KUMADE_FILE",
        default_value = crate::manifest::DEFAULT_MANIFEST
    )]
    pub file: PathBuf,

    /// Run as if started in this directory.
    ///
    /// Manifest lookup, target paths and action working directories are all
    /// resolved relative to it.
    #[arg(short = 'C', long, value_name = "DIR", env = "KUMADE_DIRECTORY")]
    pub directory: Option<PathBuf>,

    /// Enable verbose diagnostic logging.
    #[arg(short, long)]
    pub verbose: bool,

    /// Extra attempts for fetches that fail with a transport error or a 5xx
    /// response. Values must be between 0 and 10.
    #[arg(
        long,
        value_name = "N",
        env = "KUMADE_FETCH_RETRIES",
        default_value_t = 0,
        value_parser = parse_fetch_retries
    )]
    pub fetch_retries: u32,

    /// Optional subcommand to execute; defaults to `build` when omitted.
    #[command(subcommand)]
    pub command: Option<Commands>,
}

impl Default for Cli {
    fn default() -> Self {
        Self {
            file: PathBuf::from(crate::manifest::DEFAULT_MANIFEST),
            directory: None,
            verbose: false,
            fetch_retries: 0,
            command: None,
        }
    }
}

impl Cli {
    /// Manifest path resolved against `--directory` when relative.
    #[must_use]
    pub fn manifest_path(&self) -> PathBuf {
        match &self.directory {
            Some(dir) if self.file.is_relative() => dir.join(&self.file),
            _ => self.file.clone(),
        }
    }

    /// Working directory for targets and actions.
    #[must_use]
    pub fn work_dir(&self) -> PathBuf {
        self.directory.clone().unwrap_or_else(|| PathBuf::from("."))
    }

    /// The subcommand to run, defaulting to a build of the default target.
    #[must_use]
    pub fn command_or_default(&self) -> Commands {
        self.command
            .clone()
            .unwrap_or_else(|| Commands::Build(BuildArgs::default()))
    }
}

/// Arguments accepted by the `build` command.
#[derive(Debug, Clone, Default, PartialEq, Eq, Args)]
pub struct BuildArgs {
    /// Target to build; defaults to the manifest's `default` (normally `all`).
    #[arg(value_name = "TARGET")]
    pub target: Option<String>,

    /// Print the targets that would run without running them.
    #[arg(short = 'n', long)]
    pub dry_run: bool,
}

/// Available top-level commands for Kumade.
#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum Commands {
    /// Build a target and every stale prerequisite (default).
    Build(BuildArgs),

    /// Remove derived artifacts, restoring the unbuilt state.
    Clean,

    /// Print the recipe graph in Graphviz DOT format.
    Graph,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use rstest::rstest;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[rstest]
    #[case(&["kumade"], Commands::Build(BuildArgs::default()))]
    #[case(&["kumade", "build"], Commands::Build(BuildArgs::default()))]
    #[case(
        &["kumade", "build", "dir/bin", "--dry-run"],
        Commands::Build(BuildArgs { target: Some("dir/bin".into()), dry_run: true })
    )]
    #[case(&["kumade", "clean"], Commands::Clean)]
    #[case(&["kumade", "graph"], Commands::Graph)]
    fn parses_subcommands(#[case] argv: &[&str], #[case] expected: Commands) {
        let cli = Cli::try_parse_from(argv).expect("parse");
        assert_eq!(cli.command_or_default(), expected);
    }

    #[test]
    fn directory_prefixes_relative_manifest() {
        let cli = Cli::try_parse_from(["kumade", "-C", "work", "-f", "tools.yml"]).expect("parse");
        assert_eq!(cli.manifest_path(), PathBuf::from("work/tools.yml"));
        assert_eq!(cli.work_dir(), PathBuf::from("work"));
    }

    #[rstest]
    #[case("11")]
    #[case("-1")]
    #[case("many")]
    fn rejects_invalid_retry_counts(#[case] value: &str) {
        assert!(Cli::try_parse_from(["kumade", "--fetch-retries", value]).is_err());
    }
}
