//! Core recipe graph types.

use camino::{Utf8Path, Utf8PathBuf};
use indexmap::IndexMap;
use miette::Diagnostic;
use thiserror::Error;

/// Action that produces a target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Shell command lines executed one at a time.
    Commands(Vec<String>),
    /// Download `url` into the target path.
    Fetch {
        /// Remote resource.
        url: String,
        /// Expected SHA-256 digest, lower-case hex.
        sha256: Option<String>,
    },
    /// Replace the target path with a symbolic link to `source`.
    Link {
        /// Path the link resolves to.
        source: Utf8PathBuf,
    },
    /// Aggregate targets do nothing themselves.
    Nothing,
}

impl Action {
    /// Returns `true` when running the action would not touch the filesystem.
    #[must_use]
    pub fn is_noop(&self) -> bool {
        match self {
            Self::Commands(commands) => commands.is_empty(),
            Self::Fetch { .. } | Self::Link { .. } => false,
            Self::Nothing => true,
        }
    }

    /// Short label used in status output and DOT graphs.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Commands(_) => "command",
            Self::Fetch { .. } => "fetch",
            Self::Link { .. } => "link",
            Self::Nothing => "none",
        }
    }
}

/// A validated target ready for planning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetDef {
    /// Normalised target name.
    pub name: String,
    /// Filesystem path relative to the working directory.
    pub path: Utf8PathBuf,
    /// Prerequisite names in declaration order.
    pub prerequisites: Vec<String>,
    /// Producing action.
    pub action: Action,
    /// Symbolic target with no file on disk.
    pub phony: bool,
    /// Optional human-friendly summary.
    pub description: Option<String>,
}

impl TargetDef {
    /// Label shown to the user while the target builds.
    #[must_use]
    pub fn label(&self) -> &str {
        self.description.as_deref().unwrap_or(&self.name)
    }
}

/// Acyclic recipe graph keyed by target name in manifest order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecipeGraph {
    /// Target definitions keyed by normalised name.
    pub targets: IndexMap<String, TargetDef>,
    /// Target built when none is requested.
    pub default_target: String,
    /// Additional derived paths removed by `clean`.
    pub clean_paths: Vec<Utf8PathBuf>,
}

impl RecipeGraph {
    /// Look up a target by name, accepting `./`-prefixed spellings.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&TargetDef> {
        self.targets.get(normalise_name(name))
    }

    /// Paths that `clean` removes: every non-phony target followed by the
    /// manifest's extra clean entries, without duplicates.
    #[must_use]
    pub fn derived_paths(&self) -> Vec<&Utf8Path> {
        let mut paths: Vec<&Utf8Path> = Vec::new();
        let candidates = self
            .targets
            .values()
            .filter(|target| !target.phony)
            .map(|target| target.path.as_path())
            .chain(self.clean_paths.iter().map(Utf8PathBuf::as_path));
        for path in candidates {
            if !paths.contains(&path) {
                paths.push(path);
            }
        }
        paths
    }
}

/// Strip `./` prefixes and trailing slashes so `dir/` and `./dir` name the
/// same target.
#[must_use]
pub fn normalise_name(name: &str) -> &str {
    let mut trimmed = name.trim();
    while let Some(rest) = trimmed.strip_prefix("./") {
        trimmed = rest;
    }
    let stripped = trimmed.trim_end_matches('/');
    if stripped.is_empty() { trimmed } else { stripped }
}

/// Errors raised while building a [`RecipeGraph`] from a manifest.
#[derive(Debug, Error, Diagnostic)]
pub enum IrGenError {
    /// Two targets share a name.
    #[error("target '{name}' is defined more than once")]
    #[diagnostic(
        code(kumade::ir::duplicate_target),
        help("each target name may appear only once in the manifest")
    )]
    DuplicateTarget {
        /// Duplicated name.
        name: String,
    },

    /// Prerequisites form a cycle.
    #[error("circular dependency detected: {}", cycle.join(" -> "))]
    #[diagnostic(code(kumade::ir::cycle))]
    CircularDependency {
        /// Names along the cycle, repeating the first name at the end.
        cycle: Vec<String>,
    },

    /// A non-phony target has nothing to run.
    #[error("target '{name}' has no command, fetch or link")]
    #[diagnostic(
        code(kumade::ir::missing_action),
        help("add an action or mark the target `phony: true`")
    )]
    MissingAction {
        /// Offending target.
        name: String,
    },

    /// A rendered target name is empty or names the working directory.
    #[error("target name '{name}' does not name a path inside the working directory")]
    #[diagnostic(
        code(kumade::ir::invalid_name),
        help("check that the name's template variables do not render to an empty string")
    )]
    InvalidName {
        /// Offending name as written after rendering.
        name: String,
    },
}
