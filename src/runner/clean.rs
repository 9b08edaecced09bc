//! Removal of derived artifacts.

use std::io;

use camino::{Utf8Component, Utf8Path, Utf8PathBuf};
use cap_std::{ambient_authority, fs_utf8::Dir};
use tracing::{debug, info};

use super::RunnerError;

/// Reject paths that could reach outside the working directory or that name
/// the working directory itself.
fn check_contained(path: &Utf8Path) -> Result<(), RunnerError> {
    let contained = path
        .components()
        .all(|c| matches!(c, Utf8Component::Normal(_) | Utf8Component::CurDir))
        && path
            .components()
            .any(|c| matches!(c, Utf8Component::Normal(_)));
    if contained {
        Ok(())
    } else {
        Err(RunnerError::UnsafeCleanPath {
            path: path.to_owned(),
        })
    }
}

/// Remove each of `paths` beneath `root`.
///
/// Directories are removed recursively and symbolic links are removed
/// without following them. Missing paths are skipped. Every path is checked
/// before anything is deleted.
///
/// # Errors
///
/// Returns [`RunnerError::UnsafeCleanPath`] for absolute, `..` or
/// working-directory paths such as `.`, and
/// [`RunnerError::Io`] when a removal fails.
pub fn remove_paths(root: &Utf8Path, paths: &[&Utf8Path]) -> Result<Vec<Utf8PathBuf>, RunnerError> {
    for path in paths {
        check_contained(path)?;
    }
    let dir = Dir::open_ambient_dir(root, ambient_authority())
        .map_err(|err| RunnerError::io(root, err))?;

    let mut removed = Vec::new();
    for path in paths {
        let meta = match dir.symlink_metadata(path) {
            Ok(meta) => meta,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                debug!(path = %path, "already clean");
                continue;
            }
            Err(err) => return Err(RunnerError::io(*path, err)),
        };
        let result = if meta.is_dir() {
            dir.remove_dir_all(path)
        } else {
            dir.remove_file(path)
        };
        match result {
            Ok(()) => {
                info!(path = %path, "Removed");
                removed.push((*path).to_owned());
            }
            // An earlier entry may have removed a parent directory.
            Err(err) if err.kind() == io::ErrorKind::NotFound => {}
            Err(err) => return Err(RunnerError::io(*path, err)),
        }
    }
    Ok(removed)
}
