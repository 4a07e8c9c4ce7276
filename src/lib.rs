//! # gitwatch
//!
//! Watches a remote git branch and runs a command whenever new commits are
//! pulled.
//!
//! The flow is a single control loop: clone the branch once, run the
//! command, then pull at a fixed interval and run the command again after
//! every pull that brought changes. Each invocation can be reported to a
//! webhook. The loop ends on the first clone, worktree or pull error, or when
//! the process is interrupted.
//!
//! - [`core::watcher`] owns the loop.
//! - [`core::manager`] races the loop against interrupt signals.
//! - [`exec`] runs the command, [`notifications`] reports it.
//! - [`git`] is the libgit2 adapter.

pub mod cli;
pub mod config;
pub mod core;
pub mod error;
pub mod exec;
pub mod git;
pub mod log;
pub mod notifications;
