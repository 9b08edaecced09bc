//! Built-in `link` action.

use std::{fs, io};

use camino::Utf8Path;
use tracing::info;

/// What [`ensure_symlink`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkOutcome {
    /// The link already pointed at the source.
    Unchanged,
    /// A new link was created.
    Created,
    /// An existing file or link was replaced.
    Replaced,
}

/// Make `link` a symbolic link whose contents are `source`.
///
/// `source` is stored verbatim, so relative sources resolve against the
/// link's own directory exactly as they would for `ln -s`. An existing link
/// with the same contents is left untouched; any other file, link or empty
/// directory at `link` is replaced.
///
/// # Errors
///
/// Returns an [`io::Error`] when the existing entry cannot be removed or the
/// link cannot be created.
pub fn ensure_symlink(source: &Utf8Path, link: &Utf8Path) -> io::Result<LinkOutcome> {
    let outcome = match fs::symlink_metadata(link) {
        Ok(meta) if meta.file_type().is_symlink() => {
            if fs::read_link(link)? == source.as_std_path() {
                return Ok(LinkOutcome::Unchanged);
            }
            fs::remove_file(link)?;
            LinkOutcome::Replaced
        }
        Ok(meta) if meta.is_dir() => {
            fs::remove_dir(link)?;
            LinkOutcome::Replaced
        }
        Ok(_) => {
            fs::remove_file(link)?;
            LinkOutcome::Replaced
        }
        Err(err) if err.kind() == io::ErrorKind::NotFound => LinkOutcome::Created,
        Err(err) => return Err(err),
    };
    if let Some(parent) = link.parent().filter(|p| !p.as_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    create_symlink(source, link)?;
    info!(link = %link, source = %source, "Linked");
    Ok(outcome)
}

#[cfg(unix)]
fn create_symlink(source: &Utf8Path, link: &Utf8Path) -> io::Result<()> {
    std::os::unix::fs::symlink(source, link)
}

#[cfg(windows)]
fn create_symlink(source: &Utf8Path, link: &Utf8Path) -> io::Result<()> {
    let resolved = link
        .parent()
        .map_or_else(|| source.to_owned(), |parent| parent.join(source));
    if resolved.is_dir() {
        std::os::windows::fs::symlink_dir(source, link)
    } else {
        std::os::windows::fs::symlink_file(source, link)
    }
}
