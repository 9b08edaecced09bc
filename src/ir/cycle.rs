//! Cycle detection over the recipe graph.

use std::collections::HashMap;

use indexmap::IndexMap;

use super::TargetDef;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum VisitState {
    Visiting,
    Visited,
}

/// Return the first cycle found, walking targets in manifest order.
///
/// Prerequisites that are not targets are external files and end the walk.
pub(crate) fn find_cycle(targets: &IndexMap<String, TargetDef>) -> Option<Vec<String>> {
    let mut detector = CycleDetector::new(targets);
    targets
        .keys()
        .find_map(|node| (!detector.is_visited(node)).then(|| detector.visit(node)).flatten())
}

struct CycleDetector<'a> {
    targets: &'a IndexMap<String, TargetDef>,
    stack: Vec<&'a str>,
    states: HashMap<&'a str, VisitState>,
}

impl<'a> CycleDetector<'a> {
    fn new(targets: &'a IndexMap<String, TargetDef>) -> Self {
        Self {
            targets,
            stack: Vec::new(),
            states: HashMap::new(),
        }
    }

    fn is_visited(&self, node: &str) -> bool {
        matches!(self.states.get(node), Some(VisitState::Visited))
    }

    fn visit(&mut self, node: &'a str) -> Option<Vec<String>> {
        match self.states.get(node) {
            Some(VisitState::Visited) => return None,
            Some(VisitState::Visiting) => {
                let idx = self.stack.iter().position(|n| *n == node).unwrap_or(0);
                let mut cycle: Vec<String> =
                    self.stack.iter().skip(idx).map(|n| (*n).to_owned()).collect();
                cycle.push(node.to_owned());
                return Some(canonicalize_cycle(cycle));
            }
            None => {
                self.states.insert(node, VisitState::Visiting);
            }
        }

        self.stack.push(node);
        if let Some(target) = self.targets.get(node) {
            for dep in &target.prerequisites {
                let Some((key, _)) = self.targets.get_key_value(dep.as_str()) else {
                    continue;
                };
                if let Some(cycle) = self.visit(key.as_str()) {
                    return Some(cycle);
                }
            }
        }
        self.stack.pop();
        self.states.insert(node, VisitState::Visited);
        None
    }
}

/// Rotate a closed cycle so its smallest name comes first.
fn canonicalize_cycle(mut cycle: Vec<String>) -> Vec<String> {
    if cycle.len() < 2 {
        return cycle;
    }
    let len = cycle.len() - 1;
    let start = cycle
        .iter()
        .take(len)
        .enumerate()
        .min_by(|(_, a), (_, b)| a.cmp(b))
        .map_or(0, |(idx, _)| idx);
    let (prefix, suffix) = cycle.split_at_mut(len);
    prefix.rotate_left(start);
    if let (Some(first), Some(slot)) = (prefix.first().cloned(), suffix.first_mut()) {
        *slot = first;
    }
    cycle
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::Action;

    fn graph(edges: &[(&str, &[&str])]) -> IndexMap<String, TargetDef> {
        edges
            .iter()
            .map(|(name, deps)| {
                let def = TargetDef {
                    name: (*name).to_owned(),
                    path: (*name).into(),
                    prerequisites: deps.iter().map(|d| (*d).to_owned()).collect(),
                    action: Action::Commands(vec!["true".into()]),
                    phony: false,
                    description: None,
                };
                ((*name).to_owned(), def)
            })
            .collect()
    }

    #[test]
    fn detects_self_edge() {
        let targets = graph(&[("a", &["a"])]);
        assert_eq!(find_cycle(&targets), Some(vec!["a".into(), "a".into()]));
    }

    #[test]
    fn detects_two_node_cycle() {
        let targets = graph(&[("b", &["a"]), ("a", &["b"])]);
        assert_eq!(
            find_cycle(&targets),
            Some(vec!["a".into(), "b".into(), "a".into()])
        );
    }

    #[test]
    fn external_files_do_not_count() {
        let targets = graph(&[("c", &["b", "Makefile"]), ("b", &["a.tgz"]), ("a.tgz", &[])]);
        assert!(find_cycle(&targets).is_none());
    }

    #[test]
    fn diamond_is_acyclic() {
        let targets = graph(&[("d", &["b", "c"]), ("b", &["a"]), ("c", &["a"]), ("a", &[])]);
        let mut detector = CycleDetector::new(&targets);
        assert!(detector.visit("d").is_none());
        assert!(detector.is_visited("a"));
        assert!(detector.stack.is_empty());
    }

    #[test]
    fn canonicalize_cycle_rotates_smallest_node() {
        let cycle = vec!["c".into(), "a".into(), "b".into(), "c".into()];
        assert_eq!(
            canonicalize_cycle(cycle),
            vec!["a".to_owned(), "b".into(), "c".into(), "a".into()]
        );
    }
}
