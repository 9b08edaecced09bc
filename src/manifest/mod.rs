//! Manifest loading helpers.
//!
//! This module parses a `Kumadefile` in three steps. The YAML is parsed into
//! a JSON value first so syntax errors can be reported with source spans.
//! The value is then deserialised into the typed AST, and finally string
//! fields are rendered with `MiniJinja` using the manifest's `vars` block.
//! Templates also see an `env()` helper that reads environment variables and
//! fails fast when a variable is missing.

use crate::ast::KumadeManifest;
use anyhow::{Context, Result};
use minijinja::{Environment, Error, ErrorKind, UndefinedBehavior};
use std::{fs, path::Path};

mod diagnostics;
mod render;

/// JSON representation of a manifest node after YAML parsing.
pub type ManifestValue = serde_json::Value;

pub use diagnostics::ManifestError;
pub use render::render_manifest;

/// Default manifest file name looked up in the working directory.
pub const DEFAULT_MANIFEST: &str = "Kumadefile";

/// Manifest format major version understood by this build of Kumade.
const SUPPORTED_MAJOR: u64 = 1;

/// Resolve the value of an environment variable for the `env()` template
/// helper.
fn env_var(name: &str) -> std::result::Result<String, Error> {
    match std::env::var(name) {
        Ok(val) => Ok(val),
        Err(std::env::VarError::NotPresent) => Err(Error::new(
            ErrorKind::UndefinedError,
            format!("environment variable '{name}' is not set"),
        )),
        Err(std::env::VarError::NotUnicode(_)) => Err(Error::new(
            ErrorKind::InvalidOperation,
            format!("environment variable '{name}' is set but contains invalid UTF-8"),
        )),
    }
}

fn from_str_named(yaml: &str, name: &str) -> Result<KumadeManifest> {
    let doc: ManifestValue =
        serde_saphyr::from_str(yaml).map_err(|err| ManifestError::yaml(name, yaml, &err))?;
    let manifest: KumadeManifest =
        serde_json::from_value(doc).map_err(|err| ManifestError::schema(name, &err))?;

    if manifest.kumade_version.major != SUPPORTED_MAJOR {
        return Err(ManifestError::UnsupportedVersion {
            found: manifest.kumade_version.to_string(),
        }
        .into());
    }

    let mut jinja = Environment::new();
    jinja.set_undefined_behavior(UndefinedBehavior::Strict);
    jinja.add_function("env", |var_name: String| env_var(&var_name));

    render_manifest(manifest, &jinja)
}

/// Parse a manifest string, rendering templated fields with its `vars`.
///
/// # Errors
///
/// Returns an error if YAML parsing, schema validation, or template
/// rendering fails.
pub fn from_str(yaml: &str) -> Result<KumadeManifest> {
    from_str_named(yaml, DEFAULT_MANIFEST)
}

/// Load a [`KumadeManifest`] from the given file path.
///
/// # Errors
///
/// Returns an error if the file cannot be read or the manifest is invalid.
pub fn from_path(path: impl AsRef<Path>) -> Result<KumadeManifest> {
    let path_ref = path.as_ref();
    let data = fs::read_to_string(path_ref)
        .with_context(|| format!("failed to read manifest {}", path_ref.display()))?;
    from_str_named(&data, &path_ref.display().to_string())
}
