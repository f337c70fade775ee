//! I/O helpers: configuration files and physical output.

pub mod config;
pub mod output_file;
