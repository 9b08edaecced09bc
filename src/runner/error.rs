//! Error types for the runner module.
//!
//! This submodule isolates derive-macro-affected code to scope lint suppressions
//! narrowly. The `unused_assignments` lint fires in some Rust versions due to
//! thiserror/miette derive macro expansion.

// Scoped suppression for version-dependent lint false positives from
// miette/thiserror derive macros. `#[expect]` fails when the lint does not
// fire, so `#[allow]` is required here.
// FIXME(rust-lang/rust#130021): remove once upstream is fixed.
#![allow(
    clippy::allow_attributes,
    clippy::allow_attributes_without_reason,
    unused_assignments
)]

use camino::Utf8PathBuf;
use miette::Diagnostic;
use std::io;
use thiserror::Error;

/// Exit status for a target name that is not in the graph (`EX_USAGE`).
pub const EXIT_UNKNOWN_TARGET: u8 = 64;

/// Exit status for every failure without a more specific code.
pub const EXIT_FAILURE: u8 = 1;

/// Errors raised while planning or running a build.
#[derive(Debug, Error, Diagnostic)]
pub enum RunnerError {
    /// The requested target is not defined in the manifest.
    #[error("unknown target '{name}'")]
    #[diagnostic(
        code(kumade::runner::unknown_target),
        help("run `kumade graph` to list the targets defined in the manifest")
    )]
    UnknownTarget {
        /// Requested name.
        name: String,
    },

    /// A fetch action could not retrieve or verify its resource.
    #[error("failed to fetch '{url}' for '{target}': {reason}")]
    #[diagnostic(code(kumade::runner::fetch))]
    FetchError {
        /// Target being produced.
        target: String,
        /// Source URL.
        url: String,
        /// Human-readable cause.
        reason: String,
    },

    /// A command exited unsuccessfully.
    #[error("action for '{target}' failed with {}", describe_exit(*exit_code))]
    #[diagnostic(code(kumade::runner::action_failed))]
    ActionFailed {
        /// Target being produced.
        target: String,
        /// Exit code, or `None` when the process was killed by a signal.
        exit_code: Option<i32>,
    },

    /// An action succeeded but the target path still does not exist.
    #[error("action for '{target}' succeeded but did not create it")]
    #[diagnostic(
        code(kumade::runner::produced_nothing),
        help("make the action write the target path, or mark the target `phony: true`")
    )]
    ActionProducedNothing {
        /// Target that should exist.
        target: String,
    },

    /// A prerequisite is neither a target nor an existing file.
    #[error("'{prerequisite}' needed by '{target}' does not exist and no target builds it")]
    #[diagnostic(code(kumade::runner::missing_prerequisite))]
    MissingPrerequisite {
        /// Dependent target.
        target: String,
        /// Missing file.
        prerequisite: String,
    },

    /// The shell could not be started.
    #[error("failed to start `{command}` for '{target}'")]
    #[diagnostic(code(kumade::runner::spawn))]
    Spawn {
        /// Target being produced.
        target: String,
        /// Command line.
        command: String,
        /// Underlying error.
        #[source]
        source: io::Error,
    },

    /// A filesystem operation failed.
    #[error("I/O error on '{path}'")]
    #[diagnostic(code(kumade::runner::io))]
    Io {
        /// Path involved.
        path: Utf8PathBuf,
        /// Underlying error.
        #[source]
        source: io::Error,
    },

    /// A clean entry points outside the working directory.
    #[error("refusing to clean '{path}': paths must stay inside the working directory")]
    #[diagnostic(code(kumade::runner::unsafe_clean_path))]
    UnsafeCleanPath {
        /// Offending entry.
        path: Utf8PathBuf,
    },
}

fn describe_exit(code: Option<i32>) -> String {
    code.map_or_else(|| "a signal".to_owned(), |code| format!("exit code {code}"))
}

impl RunnerError {
    /// Construct a [`RunnerError::Io`] for `path`.
    #[must_use]
    pub fn io(path: impl Into<Utf8PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Process exit status reported for this error.
    ///
    /// Failed actions propagate their own exit code when it fits in a byte.
    /// Signals, out-of-range codes and a child exit of
    /// [`EXIT_UNKNOWN_TARGET`] map to [`EXIT_FAILURE`], so 64 always means
    /// the requested target does not exist.
    #[must_use]
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::UnknownTarget { .. } => EXIT_UNKNOWN_TARGET,
            Self::ActionFailed {
                exit_code: Some(code),
                ..
            } => u8::try_from(*code)
                .ok()
                .filter(|code| *code != 0 && *code != EXIT_UNKNOWN_TARGET)
                .unwrap_or(EXIT_FAILURE),
            _ => EXIT_FAILURE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn failed(exit_code: Option<i32>) -> RunnerError {
        RunnerError::ActionFailed {
            target: "t".into(),
            exit_code,
        }
    }

    #[rstest]
    #[case(failed(Some(2)), 2)]
    #[case(failed(Some(300)), 1)]
    #[case(failed(Some(-1)), 1)]
    #[case(failed(None), 1)]
    #[case(failed(Some(64)), 1)]
    #[case(failed(Some(65)), 65)]
    #[case(RunnerError::UnknownTarget { name: "x".into() }, 64)]
    #[case(RunnerError::ActionProducedNothing { target: "x".into() }, 1)]
    fn exit_codes(#[case] err: RunnerError, #[case] expected: u8) {
        assert_eq!(err.exit_code(), expected);
    }

    #[test]
    fn signal_failures_read_naturally() {
        assert_eq!(
            failed(None).to_string(),
            "action for 't' failed with a signal"
        );
    }
}
