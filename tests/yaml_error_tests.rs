//! Regression tests for YAML parse errors.
//!
//! These tests ensure diagnostics name the manifest, carry line numbers and
//! offer hints for common indentation mistakes.

use anyhow::{Context, Result, bail, ensure};
use kumade::manifest::{self, ManifestError};
use miette::Diagnostic;
use rstest::rstest;

#[rstest]
#[case("targets:\n\t- name: test\n", &["Kumadefile:2:2: invalid YAML"])]
#[case("targets:\n  - name: hi\n    command echo\n", &["Kumadefile:4:1: invalid YAML"])]
#[case(
    "",
    &[
        "Kumadefile does not match the Kumadefile schema",
        "invalid type: null, expected struct KumadeManifest",
    ],
)]
#[case(
    "# just a comment\n# another comment",
    &["does not match the Kumadefile schema", "expected struct KumadeManifest"],
)]
// No location information should default to the start of the file.
#[case("not: yaml: at all: %$#@!", &["Kumadefile:1:1: invalid YAML"])]
fn yaml_diagnostics_are_actionable(#[case] yaml: &str, #[case] needles: &[&str]) -> Result<()> {
    let Err(err) = manifest::from_str(yaml) else {
        bail!("parse should fail");
    };
    let msg = err
        .chain()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("\n");
    for needle in needles {
        ensure!(msg.contains(needle), "missing: {needle}\nmessage: {msg}");
    }
    Ok(())
}

#[rstest]
fn tab_indentation_gets_a_hint() -> Result<()> {
    let Err(err) = manifest::from_str("targets:\n\t- name: test\n") else {
        bail!("parse should fail");
    };
    let parse = err
        .downcast_ref::<ManifestError>()
        .context("expected a manifest error")?;
    let help = parse.help().map(|h| h.to_string()).unwrap_or_default();
    ensure!(help.contains("indent with spaces"), "help: {help}");
    Ok(())
}

#[rstest]
#[case("kumade_version: \"1.0.0\"\ntargets:\n  - name: t\n    command: x\n    link: y\n", "exactly one of")]
#[case("kumade_version: \"1.0.0\"\nrules: []\ntargets: []\n", "manifests accept")]
fn schema_errors_explain_the_fix(#[case] yaml: &str, #[case] hint: &str) -> Result<()> {
    let Err(err) = manifest::from_str(yaml) else {
        bail!("schema check should fail");
    };
    let schema = err
        .downcast_ref::<ManifestError>()
        .context("expected a manifest error")?;
    ensure!(matches!(schema, ManifestError::Schema { .. }), "{schema}");
    let help = schema.help().map(|h| h.to_string()).unwrap_or_default();
    ensure!(help.contains(hint), "help: {help}");
    Ok(())
}

#[rstest]
fn unsupported_version_suggests_a_fix() -> Result<()> {
    let Err(err) = manifest::from_str("kumade_version: \"3.1.0\"\ntargets: []\n") else {
        bail!("version 3 should be rejected");
    };
    let version = err
        .downcast_ref::<ManifestError>()
        .context("expected a manifest error")?;
    ensure!(
        matches!(version, ManifestError::UnsupportedVersion { found } if found == "3.1.0"),
        "{version}"
    );
    let help = version.help().map(|h| h.to_string()).unwrap_or_default();
    ensure!(help.contains("kumade_version"), "help: {help}");
    Ok(())
}
