//! Scaffolding pipeline engine.
//!
//! A run takes a tree of [`Action`]s and drives it through fixed phases:
//! load, collect data, execute, write and post-write. Actions never touch
//! the disk directly; they stage files in a shared [`OutputCollection`] that
//! is flushed once, in the write phase, and that keeps a per-file change log
//! with line diffs when change tracking is on.
//!
//! - **[`core`]**: Pure logic (collected data, change log, line diff).
//! - **[`io`]**: Side effects (config file, atomic file writes).
//! - **[`output`]**: The staged output collection and its event bus.
//!
//! The phase modules ([`load`], [`collect`], [`execute`], [`write`],
//! [`post_write`]) are sequenced by [`run`].

pub mod action;
pub mod collect;
pub mod context;
pub mod core;
pub mod execute;
pub mod exit_codes;
pub mod io;
pub mod load;
pub mod logging;
pub mod output;
pub mod post_write;
pub mod run;
pub mod starter;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
pub mod write;

pub use action::Action;
pub use context::Context;
pub use core::data::CollectedData;
pub use io::config::RunOptions;
pub use output::{OutputCollection, OutputEvent, OutputEventKind};
pub use run::{RunOutcome, run, run_in};
pub use write::{WriteFailed, WriteFailurePolicy};
