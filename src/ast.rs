//! Kumade manifest Abstract Syntax Tree structures.
//!
//! This module defines the data structures used to represent a parsed
//! `Kumadefile`. They mirror the YAML schema and are deserialised from the
//! JSON value produced by the manifest loader.
//!
//! ```rust
//! use kumade::ast::{KumadeManifest, Recipe};
//!
//! let json = serde_json::json!({
//!     "kumade_version": "1.0.0",
//!     "targets": [{ "name": "hello.txt", "command": "echo hi > hello.txt" }],
//! });
//! let manifest: KumadeManifest = serde_json::from_value(json).expect("parse");
//! let target = manifest.targets.first().expect("target");
//! assert_eq!(target.name, "hello.txt");
//! assert!(matches!(target.recipe, Recipe::Command { .. }));
//! ```

use semver::Version;
use serde::Deserialize;
use thiserror::Error;

/// Map type for `vars` blocks, preserving manifest values and order.
pub type Vars = serde_json::Map<String, serde_json::Value>;

/// Name of the target built when neither the CLI nor the manifest picks one.
pub const DEFAULT_TARGET: &str = "all";

fn default_target_name() -> String {
    String::from(DEFAULT_TARGET)
}

/// Top-level manifest structure parsed from a `Kumadefile`.
///
/// ```yaml
/// kumade_version: "1.0.0"
/// vars:
///   version: "2.1.0"
/// targets:
///   - name: all
///     phony: true
///     deps: bowtie2
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct KumadeManifest {
    /// Semantic version of the manifest format.
    pub kumade_version: Version,

    /// Global key/value pairs available to templated string fields.
    #[serde(default)]
    pub vars: Vars,

    /// Target built when no command line target is supplied.
    #[serde(default = "default_target_name")]
    pub default: String,

    /// Recipes in declaration order.
    pub targets: Vec<Target>,

    /// Extra derived paths removed by `clean` alongside target outputs.
    #[serde(default)]
    pub clean: StringOrList,
}

/// How a target is produced.
///
/// At most one of `command`, `fetch` or `link` may appear on a target. A
/// target with none of them is an aggregate and must be `phony`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recipe {
    /// Shell command lines run in order; the first failure stops the list.
    Command {
        /// Command lines passed to `sh -c`.
        commands: Vec<String>,
    },
    /// Download a remote resource to the target path.
    Fetch {
        /// Source URL.
        url: String,
        /// Optional expected SHA-256 digest in hex.
        sha256: Option<String>,
    },
    /// Point a symbolic link at `source`.
    Link {
        /// Path the link should resolve to.
        source: String,
    },
    /// No action; only meaningful for phony aggregates.
    Empty,
}

/// A single recipe: a target, its prerequisites and its action.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "RawTarget")]
pub struct Target {
    /// Output path, or a symbolic name for phony targets.
    pub name: String,
    /// Action producing the target.
    pub recipe: Recipe,
    /// Prerequisite targets or files.
    pub deps: StringOrList,
    /// Declares that the target does not correspond to a real file.
    pub phony: bool,
    /// Optional human-friendly summary shown while building.
    pub description: Option<String>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawTarget {
    name: String,
    #[serde(default)]
    command: StringOrList,
    fetch: Option<String>,
    sha256: Option<String>,
    link: Option<String>,
    #[serde(default)]
    deps: StringOrList,
    #[serde(default)]
    phony: bool,
    description: Option<String>,
}

/// Schema violations detected while deserialising a target.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TargetSchemaError {
    /// More than one action field was supplied.
    #[error("target '{target}': fields {fields} are mutually exclusive")]
    ConflictingRecipes {
        /// Target name.
        target: String,
        /// Offending field names joined with commas.
        fields: String,
    },
    /// `sha256` only makes sense for `fetch` recipes.
    #[error("target '{target}': sha256 requires a fetch recipe")]
    ChecksumWithoutFetch {
        /// Target name.
        target: String,
    },
    /// The target name was blank.
    #[error("target names must not be empty")]
    EmptyName,
}

impl TryFrom<RawTarget> for Target {
    type Error = TargetSchemaError;

    fn try_from(raw: RawTarget) -> Result<Self, Self::Error> {
        if raw.name.trim().is_empty() {
            return Err(TargetSchemaError::EmptyName);
        }
        let present: Vec<&str> = [
            ("command", !raw.command.is_empty()),
            ("fetch", raw.fetch.is_some()),
            ("link", raw.link.is_some()),
        ]
        .into_iter()
        .filter_map(|(field, is_present)| is_present.then_some(field))
        .collect();
        if present.len() > 1 {
            return Err(TargetSchemaError::ConflictingRecipes {
                target: raw.name,
                fields: present.join(", "),
            });
        }
        if raw.sha256.is_some() && raw.fetch.is_none() {
            return Err(TargetSchemaError::ChecksumWithoutFetch { target: raw.name });
        }

        let recipe = match (raw.fetch, raw.link) {
            (Some(url), _) => Recipe::Fetch {
                url,
                sha256: raw.sha256,
            },
            (None, Some(source)) => Recipe::Link { source },
            (None, None) if raw.command.is_empty() => Recipe::Empty,
            (None, None) => Recipe::Command {
                commands: raw.command.into_vec(),
            },
        };

        Ok(Self {
            name: raw.name,
            recipe,
            deps: raw.deps,
            phony: raw.phony,
            description: raw.description,
        })
    }
}

/// A helper for fields that accept either a single string or a list of
/// strings.
///
/// ```yaml
/// # Scalar
/// deps: archive.tgz
/// # Sequence
/// deps:
///   - archive.tgz
///   - fix-build.patch
/// ```
#[derive(Debug, Deserialize, Default, Clone, PartialEq, Eq)]
#[serde(untagged)]
pub enum StringOrList {
    /// No value provided.
    #[default]
    Empty,
    /// A single string item.
    String(String),
    /// A list of string items.
    List(Vec<String>),
}

impl StringOrList {
    /// Return `true` when no items are present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Empty => true,
            Self::String(_) => false,
            Self::List(items) => items.is_empty(),
        }
    }

    /// Borrow the items as a vector of string slices.
    #[must_use]
    pub fn as_strs(&self) -> Vec<&str> {
        match self {
            Self::Empty => Vec::new(),
            Self::String(item) => vec![item.as_str()],
            Self::List(items) => items.iter().map(String::as_str).collect(),
        }
    }

    /// Consume the value returning owned items.
    #[must_use]
    pub fn into_vec(self) -> Vec<String> {
        match self {
            Self::Empty => Vec::new(),
            Self::String(item) => vec![item],
            Self::List(items) => items,
        }
    }
}
