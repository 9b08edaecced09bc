//! Manifest-to-graph conversion.

use camino::{Utf8Component, Utf8Path, Utf8PathBuf};
use indexmap::IndexMap;

use crate::ast::{KumadeManifest, Recipe, Target};

use super::{
    cycle,
    graph::{Action, IrGenError, RecipeGraph, TargetDef, normalise_name},
};

impl RecipeGraph {
    /// Transform a rendered manifest into a validated [`RecipeGraph`].
    ///
    /// # Errors
    ///
    /// Returns [`IrGenError`] when a name is declared twice, a non-phony
    /// target has no action, or prerequisites form a cycle.
    pub fn from_manifest(manifest: &KumadeManifest) -> Result<Self, IrGenError> {
        let mut targets = IndexMap::with_capacity(manifest.targets.len());
        for target in &manifest.targets {
            let def = to_target_def(target)?;
            if targets.contains_key(&def.name) {
                return Err(IrGenError::DuplicateTarget { name: def.name });
            }
            targets.insert(def.name.clone(), def);
        }

        if let Some(cycle) = cycle::find_cycle(&targets) {
            return Err(IrGenError::CircularDependency { cycle });
        }

        Ok(Self {
            targets,
            default_target: normalise_name(&manifest.default).to_owned(),
            clean_paths: manifest
                .clean
                .as_strs()
                .into_iter()
                .map(|path| Utf8PathBuf::from(normalise_name(path)))
                .collect(),
        })
    }
}

/// Names must contain at least one ordinary component: `""`, `.` and `/`
/// would make the working directory itself a build output.
fn names_a_path(name: &str) -> bool {
    Utf8Path::new(name)
        .components()
        .any(|component| matches!(component, Utf8Component::Normal(_)))
}

fn to_target_def(target: &Target) -> Result<TargetDef, IrGenError> {
    let name = normalise_name(&target.name).to_owned();
    if !names_a_path(&name) {
        return Err(IrGenError::InvalidName {
            name: target.name.clone(),
        });
    }
    let action = match &target.recipe {
        Recipe::Command { commands } => Action::Commands(commands.clone()),
        Recipe::Fetch { url, sha256 } => Action::Fetch {
            url: url.clone(),
            sha256: sha256.as_ref().map(|digest| digest.trim().to_ascii_lowercase()),
        },
        Recipe::Link { source } => Action::Link {
            source: Utf8PathBuf::from(source),
        },
        Recipe::Empty => Action::Nothing,
    };
    if action.is_noop() && !target.phony {
        return Err(IrGenError::MissingAction { name });
    }

    let mut prerequisites: Vec<String> = Vec::new();
    for dep in target.deps.as_strs() {
        let dep = normalise_name(dep).to_owned();
        if !prerequisites.contains(&dep) {
            prerequisites.push(dep);
        }
    }

    Ok(TargetDef {
        path: Utf8PathBuf::from(&name),
        name,
        prerequisites,
        action,
        phony: target.phony,
        description: target.description.clone(),
    })
}
