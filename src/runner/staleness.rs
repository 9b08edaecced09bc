//! Timestamp-driven staleness planning.
//!
//! A non-phony target is stale when its path is missing, when any
//! prerequisite is stale, or when any prerequisite was modified after it.
//! Phony targets are never looked up on disk: they are stale when they carry
//! an action or when a prerequisite is stale. The walk is depth-first and
//! memoised so each path is examined at most once per plan.

use std::collections::HashMap;
use std::io;
use std::time::SystemTime;

use camino::{Utf8Path, Utf8PathBuf};
use tracing::debug;

use super::RunnerError;
use crate::ir::{RecipeGraph, normalise_name};

/// Source of modification times.
#[cfg_attr(test, mockall::automock)]
pub trait Timestamps {
    /// Modification time of `path`, following symbolic links.
    ///
    /// Returns `Ok(None)` when the path (or a link's destination) does not
    /// exist.
    ///
    /// # Errors
    ///
    /// Returns any other I/O error raised while reading metadata.
    fn modified(&self, path: &Utf8Path) -> io::Result<Option<SystemTime>>;
}

/// Reads modification times from the filesystem relative to a root
/// directory.
#[derive(Debug, Clone)]
pub struct FsTimestamps {
    root: Utf8PathBuf,
}

impl FsTimestamps {
    /// Resolve relative paths against `root`.
    #[must_use]
    pub fn new(root: impl Into<Utf8PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl Timestamps for FsTimestamps {
    fn modified(&self, path: &Utf8Path) -> io::Result<Option<SystemTime>> {
        match self.root.join(path).metadata() {
            Ok(meta) => meta.modified().map(Some),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err),
        }
    }
}

/// Ordered list of targets whose actions must run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Plan {
    /// Normalised name of the requested target.
    pub requested: String,
    /// Stale targets with an action, prerequisites before dependents.
    pub steps: Vec<String>,
}

impl Plan {
    /// Returns `true` when nothing needs to run.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

#[derive(Debug, Clone, Copy)]
struct NodeState {
    stale: bool,
    modified: Option<SystemTime>,
}

/// Compute the build plan for `target`.
///
/// # Errors
///
/// Returns [`RunnerError::UnknownTarget`] when `target` is not defined,
/// [`RunnerError::MissingPrerequisite`] when an external file is absent, and
/// [`RunnerError::Io`] when metadata cannot be read.
pub fn plan(graph: &RecipeGraph, target: &str, clock: &dyn Timestamps) -> Result<Plan, RunnerError> {
    let requested = normalise_name(target);
    if !graph.targets.contains_key(requested) {
        return Err(RunnerError::UnknownTarget {
            name: target.to_owned(),
        });
    }
    let mut planner = Planner {
        graph,
        clock,
        memo: HashMap::new(),
        steps: Vec::new(),
    };
    planner.visit(requested, requested)?;
    Ok(Plan {
        requested: requested.to_owned(),
        steps: planner.steps,
    })
}

struct Planner<'a> {
    graph: &'a RecipeGraph,
    clock: &'a dyn Timestamps,
    memo: HashMap<&'a str, NodeState>,
    steps: Vec<String>,
}

impl<'a> Planner<'a> {
    fn visit(&mut self, name: &'a str, dependent: &str) -> Result<NodeState, RunnerError> {
        if let Some(state) = self.memo.get(name) {
            return Ok(*state);
        }
        let state = match self.graph.targets.get(name) {
            Some(target) => {
                let mut prereqs = Vec::with_capacity(target.prerequisites.len());
                for dep in &target.prerequisites {
                    prereqs.push(self.visit(dep.as_str(), name)?);
                }
                let any_stale = prereqs.iter().any(|p| p.stale);
                let state = if target.phony {
                    NodeState {
                        stale: any_stale || !target.action.is_noop(),
                        modified: None,
                    }
                } else {
                    let own = self.stat(&target.path)?;
                    let newer = own.is_some_and(|built| {
                        prereqs
                            .iter()
                            .any(|p| p.modified.is_some_and(|modified| modified > built))
                    });
                    NodeState {
                        stale: own.is_none() || any_stale || newer,
                        modified: own,
                    }
                };
                debug!(
                    target = name,
                    stale = state.stale,
                    phony = target.phony,
                    "evaluated target"
                );
                if state.stale && !target.action.is_noop() {
                    self.steps.push(name.to_owned());
                }
                state
            }
            None => {
                let modified = self.stat(Utf8Path::new(name))?;
                if modified.is_none() {
                    return Err(RunnerError::MissingPrerequisite {
                        target: dependent.to_owned(),
                        prerequisite: name.to_owned(),
                    });
                }
                NodeState {
                    stale: false,
                    modified,
                }
            }
        };
        self.memo.insert(name, state);
        Ok(state)
    }

    fn stat(&self, path: &Utf8Path) -> Result<Option<SystemTime>, RunnerError> {
        self.clock
            .modified(path)
            .map_err(|err| RunnerError::io(path, err))
    }
}
