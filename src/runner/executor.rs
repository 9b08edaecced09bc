//! Action execution.

use camino::{Utf8Path, Utf8PathBuf};
use tracing::debug;

use super::{
    RunnerError,
    fetch::{FetchOptions, fetch_to},
    link::ensure_symlink,
    process::run_shell,
};
use crate::ir::{Action, TargetDef};

/// Runs the action of a single target.
#[cfg_attr(test, mockall::automock)]
pub trait Executor {
    /// Run `target`'s action to completion.
    ///
    /// # Errors
    ///
    /// Returns a [`RunnerError`] when the action fails.
    fn execute(&self, target: &TargetDef) -> Result<(), RunnerError>;
}

/// Executes actions against the real filesystem, network and shell.
#[derive(Debug, Clone)]
pub struct SystemExecutor {
    work_dir: Utf8PathBuf,
    fetch: FetchOptions,
}

impl SystemExecutor {
    /// Run actions inside `work_dir`.
    #[must_use]
    pub fn new(work_dir: impl Into<Utf8PathBuf>, fetch: FetchOptions) -> Self {
        Self {
            work_dir: work_dir.into(),
            fetch,
        }
    }

    /// Directory actions run in.
    #[must_use]
    pub fn work_dir(&self) -> &Utf8Path {
        &self.work_dir
    }

    fn run_commands(&self, target: &TargetDef, commands: &[String]) -> Result<(), RunnerError> {
        for line in commands {
            let status =
                run_shell(line, &self.work_dir).map_err(|source| RunnerError::Spawn {
                    target: target.name.clone(),
                    command: line.clone(),
                    source,
                })?;
            if !status.success() {
                return Err(RunnerError::ActionFailed {
                    target: target.name.clone(),
                    exit_code: status.code(),
                });
            }
        }
        Ok(())
    }
}

impl Executor for SystemExecutor {
    fn execute(&self, target: &TargetDef) -> Result<(), RunnerError> {
        let dest = self.work_dir.join(&target.path);
        match &target.action {
            Action::Commands(commands) => self.run_commands(target, commands),
            Action::Fetch { url, sha256 } => {
                let fetched = fetch_to(url, sha256.as_deref(), &dest, self.fetch).map_err(
                    |err| RunnerError::FetchError {
                        target: target.name.clone(),
                        url: url.clone(),
                        reason: err.to_string(),
                    },
                )?;
                debug!(target = %target.name, sha256 = %fetched.sha256, "download verified");
                Ok(())
            }
            Action::Link { source } => {
                let outcome =
                    ensure_symlink(source, &dest).map_err(|err| RunnerError::io(&dest, err))?;
                debug!(target = %target.name, ?outcome, "link ensured");
                Ok(())
            }
            Action::Nothing => Ok(()),
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use anyhow::Result;
    use tempfile::TempDir;

    fn executor() -> Result<(TempDir, SystemExecutor)> {
        let dir = tempfile::tempdir()?;
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf())
            .map_err(|p| anyhow::anyhow!("non UTF-8 temp dir {}", p.display()))?;
        Ok((dir, SystemExecutor::new(root, FetchOptions::default())))
    }

    fn target(name: &str, action: Action) -> TargetDef {
        TargetDef {
            name: name.into(),
            path: name.into(),
            prerequisites: Vec::new(),
            action,
            phony: false,
            description: None,
        }
    }

    #[test]
    fn commands_stop_at_first_failure() -> Result<()> {
        let (_dir, exec) = executor()?;
        let def = target(
            "out",
            Action::Commands(vec![
                "touch first".into(),
                "exit 4".into(),
                "touch never".into(),
            ]),
        );
        let err = exec.execute(&def).expect_err("second command fails");
        assert!(matches!(
            err,
            RunnerError::ActionFailed { exit_code: Some(4), .. }
        ));
        assert!(exec.work_dir().join("first").exists());
        assert!(!exec.work_dir().join("never").exists());
        Ok(())
    }

    #[test]
    fn link_action_points_at_source() -> Result<()> {
        let (_dir, exec) = executor()?;
        std::fs::write(exec.work_dir().join("tool-1.0"), "bin")?;
        let def = target(
            "tool",
            Action::Link {
                source: "tool-1.0".into(),
            },
        );
        exec.execute(&def)?;
        assert_eq!(
            std::fs::read_to_string(exec.work_dir().join("tool"))?,
            "bin"
        );
        Ok(())
    }
}
