//! Graphviz rendering of the recipe graph.

use std::fmt;

use super::RecipeGraph;

/// A DOT double-quoted string.
struct Quoted<'a>(&'a str);

impl fmt::Display for Quoted<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("\"")?;
        for ch in self.0.chars() {
            match ch {
                '"' | '\\' => write!(f, "\\{ch}")?,
                '\n' => f.write_str("\\n")?,
                _ => write!(f, "{ch}")?,
            }
        }
        f.write_str("\"")
    }
}

/// Graphviz view of a [`RecipeGraph`], rendered through [`fmt::Display`].
///
/// Edges point from each target to its prerequisites. Phony targets are
/// drawn as boxes; prerequisites that are plain files are drawn dashed.
#[derive(Debug, Clone, Copy)]
pub struct Dot<'a>(&'a RecipeGraph);

impl fmt::Display for Dot<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let graph = self.0;
        writeln!(f, "digraph kumade {{")?;
        writeln!(f, "  rankdir=LR;")?;
        let mut externals: Vec<&str> = Vec::new();
        for target in graph.targets.values() {
            let shape = if target.phony { "box" } else { "ellipse" };
            writeln!(
                f,
                "  {} [shape={shape}, tooltip={}];",
                Quoted(&target.name),
                Quoted(target.action.kind()),
            )?;
            for dep in &target.prerequisites {
                if !graph.targets.contains_key(dep) && !externals.contains(&dep.as_str()) {
                    externals.push(dep);
                }
            }
        }
        for file in externals {
            writeln!(f, "  {} [style=dashed];", Quoted(file))?;
        }
        for target in graph.targets.values() {
            for dep in &target.prerequisites {
                writeln!(f, "  {} -> {};", Quoted(&target.name), Quoted(dep))?;
            }
        }
        writeln!(f, "}}")
    }
}

impl RecipeGraph {
    /// Borrow the graph as a [`Dot`] renderer.
    #[must_use]
    pub const fn dot(&self) -> Dot<'_> {
        Dot(self)
    }

    /// Render the graph as a DOT digraph.
    #[must_use]
    pub fn to_dot(&self) -> String {
        self.dot().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{Action, TargetDef};

    #[test]
    fn renders_nodes_and_edges() {
        let mut graph = RecipeGraph::default();
        graph.targets.insert(
            "all".into(),
            TargetDef {
                name: "all".into(),
                path: "all".into(),
                prerequisites: vec!["tool".into()],
                action: Action::Nothing,
                phony: true,
                description: None,
            },
        );
        graph.targets.insert(
            "tool".into(),
            TargetDef {
                name: "tool".into(),
                path: "tool".into(),
                prerequisites: vec!["tool.c".into()],
                action: Action::Commands(vec!["cc -o tool tool.c".into()]),
                phony: false,
                description: None,
            },
        );
        let dot = graph.to_dot();
        assert!(dot.starts_with("digraph kumade {"));
        assert!(dot.contains("\"all\" [shape=box, tooltip=\"none\"];"));
        assert!(dot.contains("\"tool.c\" [style=dashed];"));
        assert!(dot.contains("\"all\" -> \"tool\";"));
        assert!(dot.contains("\"tool\" -> \"tool.c\";"));
    }

    #[test]
    fn quoting_escapes_specials() {
        assert_eq!(Quoted("a\"b\\c\nd").to_string(), "\"a\\\"b\\\\c\\nd\"");
    }
}
