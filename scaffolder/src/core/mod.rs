//! Deterministic, pure building blocks of the pipeline.
//!
//! Core modules must be free of I/O side effects. They operate on in-memory
//! data structures and return deterministic outputs suitable for tests.

pub mod change_log;
pub mod data;
pub mod diff;
