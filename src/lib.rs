//! Kumade core library.
//!
//! Kumade reads a `Kumadefile`, works out which targets are stale by
//! comparing modification times, and runs the actions that rebuild them:
//! shell commands, verified HTTP downloads and symbolic links. The library
//! exposes each stage so the binary stays a thin wrapper around
//! [`runner::run`].

pub mod ast;
pub mod cli;
pub mod hasher;
pub mod ir;
pub mod manifest;
pub mod runner;
pub mod status;
