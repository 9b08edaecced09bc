//! Renders manifest templates using `MiniJinja` before graph construction.
use super::ManifestValue;
use crate::ast::{KumadeManifest, Recipe, StringOrList, Target, Vars};
use anyhow::{Context, Result};
use minijinja::Environment;

/// Render templated string fields of every target using the manifest `vars`.
///
/// Variables may reference one another; each variable is rendered against a
/// snapshot of the unrendered block, so chains resolve one level per pass.
///
/// # Errors
///
/// Returns an error when a template fails to evaluate, for example because it
/// references an undefined variable.
pub fn render_manifest(mut manifest: KumadeManifest, env: &Environment) -> Result<KumadeManifest> {
    render_vars(&mut manifest.vars, env)?;
    let vars = manifest.vars.clone();
    manifest.default = render_str_with(env, &manifest.default, &vars, || {
        "render default target".into()
    })?;
    render_string_or_list(&mut manifest.clean, env, &vars)?;
    for target in &mut manifest.targets {
        render_target(target, env, &vars)?;
    }
    Ok(manifest)
}

fn render_target(target: &mut Target, env: &Environment, vars: &Vars) -> Result<()> {
    target.name = render_str_with(env, &target.name, vars, || "render target name".into())?;
    let name = target.name.clone();
    render_string_or_list(&mut target.deps, env, vars)
        .with_context(|| format!("render deps of '{name}'"))?;
    if let Some(desc) = &mut target.description {
        *desc = render_str_with(env, desc, vars, || format!("render description of '{name}'"))?;
    }
    match &mut target.recipe {
        Recipe::Command { commands } => {
            for command in commands {
                *command = render_str_with(env, command, vars, || {
                    format!("render command of '{name}'")
                })?;
            }
        }
        Recipe::Fetch { url, sha256 } => {
            *url = render_str_with(env, url, vars, || format!("render fetch URL of '{name}'"))?;
            if let Some(digest) = sha256 {
                *digest = render_str_with(env, digest, vars, || {
                    format!("render sha256 of '{name}'")
                })?;
            }
        }
        Recipe::Link { source } => {
            *source = render_str_with(env, source, vars, || {
                format!("render link source of '{name}'")
            })?;
        }
        Recipe::Empty => {}
    }
    Ok(())
}

fn render_vars(vars: &mut Vars, env: &Environment) -> Result<()> {
    let snapshot = vars.clone();
    for (key, value) in vars.iter_mut() {
        if let ManifestValue::String(s) = value {
            *s = render_str_with(env, s, &snapshot, || format!("render var '{key}'"))?;
        }
    }
    Ok(())
}

fn render_string_or_list(value: &mut StringOrList, env: &Environment, ctx: &Vars) -> Result<()> {
    match value {
        StringOrList::String(s) => {
            *s = render_str_with(env, s, ctx, || "render string value".into())?;
        }
        StringOrList::List(list) => {
            for item in list {
                *item = render_str_with(env, item, ctx, || "render list value".into())?;
            }
        }
        StringOrList::Empty => {}
    }
    Ok(())
}

fn render_str_with(
    env: &Environment,
    tpl: &str,
    ctx: &impl serde::Serialize,
    what: impl FnOnce() -> String,
) -> Result<String> {
    env.render_str(tpl, ctx).with_context(what)
}

#[cfg(test)]
mod tests {
    use super::*;
    use minijinja::UndefinedBehavior;
    use semver::Version;

    fn sample_manifest() -> Result<KumadeManifest> {
        let mut vars = Vars::new();
        vars.insert("tool".into(), ManifestValue::String("bowtie2".into()));
        vars.insert("version".into(), ManifestValue::String("2.1.0".into()));
        vars.insert(
            "dist".into(),
            ManifestValue::String("{{ tool }}-{{ version }}".into()),
        );

        let fetch = Target {
            name: "{{ tool }}-{{ version }}.zip".into(),
            recipe: Recipe::Fetch {
                url: "http://example.invalid/{{ tool }}/{{ version }}.zip".into(),
                sha256: None,
            },
            deps: StringOrList::Empty,
            phony: false,
            description: Some("download {{ tool }}".into()),
        };
        let link = Target {
            name: "{{ tool }}".into(),
            recipe: Recipe::Link {
                source: "{{ tool }}-{{ version }}/{{ tool }}".into(),
            },
            deps: StringOrList::List(vec!["{{ tool }}-{{ version }}/{{ tool }}".into()]),
            phony: false,
            description: None,
        };

        Ok(KumadeManifest {
            kumade_version: Version::parse("1.0.0")?,
            vars,
            default: "{{ tool }}".into(),
            targets: vec![fetch, link],
            clean: StringOrList::String("{{ tool }}-{{ version }}".into()),
        })
    }

    #[test]
    fn render_manifest_renders_targets() -> Result<()> {
        let env = Environment::new();
        let rendered = render_manifest(sample_manifest()?, &env)?;
        assert_eq!(rendered.default, "bowtie2");
        assert_eq!(rendered.clean.as_strs(), ["bowtie2-2.1.0"]);

        let fetch = rendered.targets.first().context("fetch target missing")?;
        assert_eq!(fetch.name, "bowtie2-2.1.0.zip");
        assert_eq!(fetch.description.as_deref(), Some("download bowtie2"));
        assert_eq!(
            fetch.recipe,
            Recipe::Fetch {
                url: "http://example.invalid/bowtie2/2.1.0.zip".into(),
                sha256: None,
            }
        );

        let link = rendered.targets.get(1).context("link target missing")?;
        assert_eq!(link.deps.as_strs(), ["bowtie2-2.1.0/bowtie2"]);
        assert_eq!(
            link.recipe,
            Recipe::Link {
                source: "bowtie2-2.1.0/bowtie2".into()
            }
        );
        Ok(())
    }

    #[test]
    fn render_vars_resolves_one_level_of_indirection() -> Result<()> {
        let env = Environment::new();
        let rendered = render_manifest(sample_manifest()?, &env)?;
        assert_eq!(
            rendered.vars.get("dist").and_then(ManifestValue::as_str),
            Some("bowtie2-2.1.0")
        );
        Ok(())
    }

    #[test]
    fn undefined_variable_fails_in_strict_mode() -> Result<()> {
        let mut env = Environment::new();
        env.set_undefined_behavior(UndefinedBehavior::Strict);
        let mut manifest = sample_manifest()?;
        if let Some(target) = manifest.targets.first_mut() {
            target.name = "{{ missing }}.zip".into();
        }
        let err = render_manifest(manifest, &env).expect_err("undefined var should fail");
        assert!(format!("{err:#}").contains("render target name"));
        Ok(())
    }
}
