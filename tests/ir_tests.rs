//! Tests turning manifests into validated recipe graphs.

use anyhow::{Context, Result, ensure};
use kumade::ir::{Action, IrGenError, RecipeGraph};
use kumade::manifest;
use rstest::rstest;

fn graph(yaml: &str) -> Result<RecipeGraph> {
    let manifest = manifest::from_str(yaml)?;
    Ok(RecipeGraph::from_manifest(&manifest)?)
}

fn graph_err(yaml: &str) -> Result<IrGenError> {
    let manifest = manifest::from_str(yaml)?;
    match RecipeGraph::from_manifest(&manifest) {
        Ok(_) => anyhow::bail!("graph should be rejected"),
        Err(err) => Ok(err),
    }
}

#[rstest]
fn fetch_checksum_and_names_are_normalised() -> Result<()> {
    let graph = graph(
        r#"
kumade_version: "1.0.0"
default: ./pkg/
targets:
  - name: pkg.tgz
    fetch: https://example.invalid/pkg.tgz
    sha256: "  ABCDEF  "
  - name: ./pkg/
    deps: [./pkg.tgz, pkg.tgz]
    command: tar xzf pkg.tgz
"#,
    )?;
    ensure!(graph.default_target == "pkg");
    let pkg = graph.get("pkg/").context("lookup ignores trailing slash")?;
    ensure!(pkg.prerequisites == ["pkg.tgz"], "{:?}", pkg.prerequisites);
    let archive = graph.get("pkg.tgz").context("archive")?;
    ensure!(
        archive.action
            == Action::Fetch {
                url: "https://example.invalid/pkg.tgz".into(),
                sha256: Some("abcdef".into()),
            },
        "{:?}",
        archive.action
    );
    Ok(())
}

#[rstest]
fn spelled_differently_still_duplicates() -> Result<()> {
    let err = graph_err(
        r#"
kumade_version: "1.0.0"
targets:
  - name: out
    command: "touch out"
  - name: ./out
    command: "touch out"
"#,
    )?;
    ensure!(
        matches!(err, IrGenError::DuplicateTarget { ref name } if name == "out"),
        "{err}"
    );
    Ok(())
}

#[rstest]
#[case("{{ prefix }}")]
#[case("{{ prefix }}.")]
fn names_rendering_to_the_working_directory_are_rejected(#[case] name: &str) -> Result<()> {
    let yaml = format!(
        "kumade_version: \"1.0.0\"\nvars:\n  prefix: \"\"\ntargets:\n  - name: \"{name}\"\n    command: \"touch x\"\n"
    );
    let err = graph_err(&yaml)?;
    ensure!(matches!(err, IrGenError::InvalidName { .. }), "{err}");
    Ok(())
}

#[rstest]
fn cycles_are_reported_with_their_path() -> Result<()> {
    let err = graph_err(
        r#"
kumade_version: "1.0.0"
targets:
  - name: a
    deps: b
    command: "touch a"
  - name: b
    deps: a
    command: "touch b"
"#,
    )?;
    ensure!(
        err.to_string() == "circular dependency detected: a -> b -> a",
        "{err}"
    );
    Ok(())
}

#[rstest]
#[case("command: x\n    link: y", "mutually exclusive")]
#[case("command: x\n    sha256: abc", "sha256 requires a fetch recipe")]
fn target_schema_errors_surface_through_loading(
    #[case] fields: &str,
    #[case] needle: &str,
) -> Result<()> {
    let yaml = format!(
        "kumade_version: \"1.0.0\"\ntargets:\n  - name: t\n    {fields}\n"
    );
    let err = manifest::from_str(&yaml).expect_err("schema error");
    let text = format!("{err:#}");
    ensure!(text.contains(needle), "unexpected error: {text}");
    Ok(())
}

#[rstest]
fn derived_paths_cover_outputs_and_clean_entries() -> Result<()> {
    let graph = graph(
        r#"
kumade_version: "1.0.0"
targets:
  - name: all
    phony: true
    deps: [bin/tool]
  - name: bin/tool
    deps: tool.c
    command: "cc -o bin/tool tool.c"
clean: [build/, bin/tool]
"#,
    )?;
    let paths: Vec<&str> = graph
        .derived_paths()
        .into_iter()
        .map(camino::Utf8Path::as_str)
        .collect();
    ensure!(paths == ["bin/tool", "build"], "{paths:?}");
    Ok(())
}

#[rstest]
fn bundled_demo_manifest_is_valid() -> Result<()> {
    let manifest = manifest::from_path("demos/Kumadefile")?;
    let graph = RecipeGraph::from_manifest(&manifest)?;
    let all = graph.get("all").context("default target")?;
    ensure!(all.prerequisites == ["bowtie2", "bowtie2-build"]);
    let unpack = graph.get("bowtie2-2.1.0").context("unpack target")?;
    ensure!(unpack.prerequisites == ["bowtie2-2.1.0-source.zip"]);
    ensure!(graph.derived_paths().len() == 5, "{:?}", graph.derived_paths());
    Ok(())
}
