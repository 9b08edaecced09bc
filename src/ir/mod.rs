//! Intermediate representation of a `Kumadefile`.
//!
//! The manifest AST is validated into a [`RecipeGraph`]: an insertion-ordered
//! map of target definitions with normalised names, resolved actions and no
//! cycles. The runner plans and executes against this graph only.
//!
//! # Examples
//!
//! ```
//! use kumade::ir::{Action, RecipeGraph};
//!
//! let manifest = kumade::manifest::from_str(
//!     "kumade_version: \"1.0.0\"\ntargets:\n  - name: hello.txt\n    command: echo hi > hello.txt\n",
//! )
//! .expect("manifest");
//! let graph = RecipeGraph::from_manifest(&manifest).expect("graph");
//! let target = graph.get("hello.txt").expect("target");
//! assert_eq!(target.action, Action::Commands(vec!["echo hi > hello.txt".into()]));
//! ```

mod cycle;
mod dot;
mod from_manifest;
mod graph;

pub use dot::Dot;
pub use graph::{Action, IrGenError, RecipeGraph, TargetDef, normalise_name};
