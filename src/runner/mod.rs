//! CLI execution and build orchestration.
//!
//! This module keeps `main` minimal by providing a single entry point,
//! [`run`], that loads the manifest, validates it into a
//! [`RecipeGraph`](crate::ir::RecipeGraph) and dispatches the requested
//! command. [`Runner`] holds the build algorithm itself: plan the stale
//! targets, then run their actions one at a time, halting at the first
//! failure.

mod clean;
mod error;
mod executor;
mod fetch;
mod link;
mod process;
mod staleness;

pub use clean::remove_paths;
pub use error::{EXIT_FAILURE, EXIT_UNKNOWN_TARGET, RunnerError};
pub use executor::{Executor, SystemExecutor};
pub use fetch::{FetchFailure, FetchOptions, Fetched, fetch_to};
pub use link::{LinkOutcome, ensure_symlink};
pub use process::run_shell;
pub use staleness::{FsTimestamps, Plan, Timestamps, plan};

use crate::cli::{BuildArgs, Cli, Commands};
use crate::ir::RecipeGraph;
use crate::manifest;
use crate::status::{StatusReporter, make_reporter};
use anyhow::{Context, Result};
use camino::{Utf8Path, Utf8PathBuf};
use std::io::{self, Write};
use tracing::{debug, info};

/// Targets whose actions ran during a build.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildReport {
    /// Names in execution order.
    pub executed: Vec<String>,
}

/// Plans and executes builds over a validated graph.
pub struct Runner<'a> {
    graph: &'a RecipeGraph,
    clock: &'a dyn Timestamps,
    executor: &'a dyn Executor,
    reporter: &'a dyn StatusReporter,
}

impl<'a> Runner<'a> {
    /// Assemble a runner from its collaborators.
    #[must_use]
    pub fn new(
        graph: &'a RecipeGraph,
        clock: &'a dyn Timestamps,
        executor: &'a dyn Executor,
        reporter: &'a dyn StatusReporter,
    ) -> Self {
        Self {
            graph,
            clock,
            executor,
            reporter,
        }
    }

    /// Resolve the requested target, falling back to the graph default.
    fn resolve<'t>(&'t self, target: Option<&'t str>) -> &'t str {
        target.unwrap_or(&self.graph.default_target)
    }

    /// Compute which targets would run for `target`.
    ///
    /// # Errors
    ///
    /// See [`plan`].
    pub fn plan(&self, target: Option<&str>) -> Result<Plan, RunnerError> {
        plan(self.graph, self.resolve(target), self.clock)
    }

    /// Bring `target` up to date.
    ///
    /// Stale targets run in dependency order. The first failing action stops
    /// the build and nothing already produced is rolled back.
    ///
    /// # Errors
    ///
    /// Returns [`RunnerError::UnknownTarget`] before any action runs when the
    /// target is not defined, the failing action's error, or
    /// [`RunnerError::ActionProducedNothing`] when a non-phony target is still
    /// missing after its action succeeded.
    pub fn build(&self, target: Option<&str>) -> Result<BuildReport, RunnerError> {
        let plan = self.plan(target)?;
        let total = plan.steps.len();
        self.reporter.report_plan(total);

        let mut report = BuildReport::default();
        for (idx, name) in plan.steps.iter().enumerate() {
            let Some(def) = self.graph.targets.get(name) else {
                return Err(RunnerError::UnknownTarget { name: name.clone() });
            };
            self.reporter.target_started(idx + 1, total, def.label());
            info!(target = %def.name, action = def.action.kind(), "Building");
            self.executor.execute(def)?;
            if !def.phony {
                let exists = self
                    .clock
                    .modified(&def.path)
                    .map_err(|err| RunnerError::io(&def.path, err))?
                    .is_some();
                if !exists {
                    return Err(RunnerError::ActionProducedNothing {
                        target: def.name.clone(),
                    });
                }
            }
            self.reporter.target_finished(def.label());
            report.executed.push(def.name.clone());
        }
        Ok(report)
    }
}

fn work_dir(cli: &Cli) -> Result<Utf8PathBuf> {
    Utf8PathBuf::from_path_buf(cli.work_dir())
        .map_err(|path| anyhow::anyhow!("working directory {} is not valid UTF-8", path.display()))
}

fn load_graph(cli: &Cli) -> Result<RecipeGraph> {
    let manifest_path = cli.manifest_path();
    let manifest = manifest::from_path(&manifest_path)
        .with_context(|| format!("loading manifest {}", manifest_path.display()))?;
    RecipeGraph::from_manifest(&manifest).context("building recipe graph")
}

/// Execute the parsed [`Cli`] command.
///
/// # Errors
///
/// Returns an error if the manifest cannot be loaded, the graph is invalid,
/// or the command fails. [`RunnerError`]s stay reachable through
/// [`anyhow::Error::downcast_ref`] so callers can map exit codes.
pub fn run(cli: &Cli) -> Result<()> {
    let graph = load_graph(cli)?;
    let root = work_dir(cli)?;
    match cli.command_or_default() {
        Commands::Build(args) => handle_build(cli, &graph, &root, &args),
        Commands::Clean => handle_clean(&graph, &root),
        Commands::Graph => write_stdout(&graph.to_dot()),
    }
}

fn handle_build(cli: &Cli, graph: &RecipeGraph, root: &Utf8Path, args: &BuildArgs) -> Result<()> {
    let clock = FsTimestamps::new(root);
    let options = FetchOptions {
        retries: cli.fetch_retries,
        ..FetchOptions::default()
    };
    let executor = SystemExecutor::new(root, options);
    let reporter = make_reporter(cli.verbose);
    let runner = Runner::new(graph, &clock, &executor, reporter.as_ref());
    let target = args.target.as_deref();

    if args.dry_run {
        let plan = runner.plan(target)?;
        debug!(target = %plan.requested, steps = plan.steps.len(), "dry run");
        let mut listing = String::new();
        for name in &plan.steps {
            listing.push_str(name);
            listing.push('\n');
        }
        return write_stdout(&listing);
    }

    let report = runner.build(target)?;
    let summary = match report.executed.len() {
        0 => "Nothing to do.".to_owned(),
        1 => "Built 1 target.".to_owned(),
        n => format!("Built {n} targets."),
    };
    reporter.report_complete(&summary);
    Ok(())
}

fn handle_clean(graph: &RecipeGraph, root: &Utf8Path) -> Result<()> {
    let removed = remove_paths(root, &graph.derived_paths())?;
    info!(count = removed.len(), "Clean complete");
    Ok(())
}

fn write_stdout(text: &str) -> Result<()> {
    let mut stdout = io::stdout().lock();
    stdout
        .write_all(text.as_bytes())
        .and_then(|()| stdout.flush())
        .context("writing to stdout")
}
